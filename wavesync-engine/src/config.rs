//! Engine configuration.
//!
//! Every field has a default, so a TOML file only needs the values it
//! changes:
//!
//! ```toml
//! tick_interval_ms = 16
//!
//! [session]
//! server_url = "http://sdr.example.net:8073/"
//! session_id = "3f2a"
//!
//! [scheduler]
//! mode = "free-running"
//! ```

use std::fs;
use std::path::Path;

use serde::Deserialize;
use wavesync_messages::SyncMode;

use crate::error::ConfigError;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub session: SessionConfig,
    pub scheduler: SchedulerConfig,
    pub range: RangeConfig,
    pub navigation: NavigationConfig,
    pub peak_hold: PeakHoldConfig,
    /// Period of the scheduling loop; one display refresh.
    pub tick_interval_ms: u64,
    /// How often scheduler counters are published.
    pub stats_interval_ms: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            scheduler: SchedulerConfig::default(),
            range: RangeConfig::default(),
            navigation: NavigationConfig::default(),
            peak_hold: PeakHoldConfig::default(),
            tick_interval_ms: 16,
            stats_interval_ms: 5_000.0,
        }
    }
}

impl EngineConfig {
    /// Read and validate a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field, reason| Err(ConfigError::Invalid { field, reason });

        if self.tick_interval_ms == 0 {
            return invalid("tick_interval_ms", "must be greater than zero");
        }
        if self.session.reconnect_base_ms <= 0.0 {
            return invalid("session.reconnect_base_ms", "must be greater than zero");
        }
        if self.session.reconnect_cap_ms < self.session.reconnect_base_ms {
            return invalid(
                "session.reconnect_cap_ms",
                "must not be below reconnect_base_ms",
            );
        }
        if self.scheduler.healthy_depth == 0 {
            return invalid("scheduler.healthy_depth", "must hold at least one frame");
        }
        if self.scheduler.max_frame_age_ms <= 0.0 {
            return invalid("scheduler.max_frame_age_ms", "must be greater than zero");
        }
        if self.navigation.domain_ceiling_hz <= 0.0 {
            return invalid("navigation.domain_ceiling_hz", "must be greater than zero");
        }
        if self.navigation.min_bin_bandwidth_hz <= 0.0 {
            return invalid(
                "navigation.min_bin_bandwidth_hz",
                "must be greater than zero",
            );
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// HTTP base address of the receiver.
    pub server_url: String,
    pub session_id: String,
    pub password: Option<String>,
    pub reconnect_base_ms: f64,
    pub reconnect_cap_ms: f64,
    pub max_reconnect_attempts: u32,
    /// Interval between `get_status` requests while connected.
    pub resync_interval_ms: f64,
    pub ping_interval_ms: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8080/".to_string(),
            session_id: String::new(),
            password: None,
            reconnect_base_ms: 1_000.0,
            reconnect_cap_ms: 30_000.0,
            max_reconnect_attempts: 10,
            resync_interval_ms: 10_000.0,
            ping_interval_ms: 30_000.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub mode: SyncMode,
    /// Queue depth above which the oldest frames are dropped.
    pub healthy_depth: usize,
    pub max_frame_age_ms: f64,
    /// Subtracted from every deadline so frames land slightly early.
    pub safety_margin_ms: f64,
    /// Initial filter-path latency; the host updates it at runtime.
    pub filter_latency_ms: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            mode: SyncMode::Synchronized,
            healthy_depth: 20,
            max_frame_age_ms: 3_000.0,
            safety_margin_ms: 20.0,
            filter_latency_ms: 0.0,
        }
    }
}

/// Smoothing windows and margins for one rendering surface.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct SurfaceRangeConfig {
    pub floor_window_ms: f64,
    /// Long enough to outlast cyclic bursts (e.g. FT8 slots).
    pub ceiling_window_ms: f64,
    pub floor_margin_db: f32,
    pub ceiling_margin_db: f32,
}

impl Default for SurfaceRangeConfig {
    fn default() -> Self {
        Self {
            floor_window_ms: 2_000.0,
            ceiling_window_ms: 20_000.0,
            floor_margin_db: 5.0,
            ceiling_margin_db: 10.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct RangeConfig {
    pub spectrum: SurfaceRangeConfig,
    pub waterfall: SurfaceRangeConfig,
}

impl Default for RangeConfig {
    fn default() -> Self {
        Self {
            spectrum: SurfaceRangeConfig::default(),
            waterfall: SurfaceRangeConfig {
                floor_margin_db: 0.0,
                ceiling_margin_db: 5.0,
                ..SurfaceRangeConfig::default()
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    /// Highest frequency the receiver covers.
    pub domain_ceiling_hz: f64,
    pub min_bin_bandwidth_hz: f64,
    /// Minimum spacing between pan requests during a drag.
    pub pan_throttle_ms: f64,
    /// Smallest drag movement worth a request. Defaults to one bin.
    pub min_pan_step_hz: Option<f64>,
    /// How long a sent pan counts as in flight without an echo.
    pub pan_echo_timeout_ms: f64,
    pub visibility_check_interval_ms: f64,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            domain_ceiling_hz: 30_000_000.0,
            min_bin_bandwidth_hz: 1.0,
            pan_throttle_ms: 100.0,
            min_pan_step_hz: None,
            pan_echo_timeout_ms: 2_000.0,
            visibility_check_interval_ms: 1_000.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct PeakHoldConfig {
    pub decay_db_per_sec: f32,
}

impl Default for PeakHoldConfig {
    fn default() -> Self {
        Self {
            decay_db_per_sec: 10.0,
        }
    }
}
