//! Peak-hold trace for the spectrum display.

use log::debug;

use crate::config::PeakHoldConfig;

/// Value a bin starts from when the frame has nothing usable there.
pub const PEAK_FLOOR_DB: f32 = -200.0;

/// Per-bin running maximum that sags linearly over time.
pub struct PeakHold {
    decay_db_per_sec: f32,
    peaks: Vec<f32>,
    last_update_ms: Option<f64>,
}

impl PeakHold {
    pub fn new(config: &PeakHoldConfig) -> Self {
        Self {
            decay_db_per_sec: config.decay_db_per_sec,
            peaks: Vec::new(),
            last_update_ms: None,
        }
    }

    pub fn peaks(&self) -> &[f32] {
        &self.peaks
    }

    pub fn reset(&mut self) {
        self.peaks.clear();
        self.last_update_ms = None;
    }

    /// `peak = max(current, peak - decay * dt)` per bin.
    ///
    /// A bin-count change or a non-finite held value restarts the whole
    /// trace from this frame: one bad bin would otherwise win every later
    /// comparison.
    pub fn update(&mut self, magnitudes: &[f32], now_ms: f64) -> &[f32] {
        let Some(last_ms) = self.last_update_ms.filter(|_| self.peaks.len() == magnitudes.len())
        else {
            if !self.peaks.is_empty() {
                debug!(
                    "Bin count changed ({} -> {}), restarting peak hold",
                    self.peaks.len(),
                    magnitudes.len()
                );
            }
            self.reinitialize(magnitudes, now_ms);
            return &self.peaks;
        };

        let elapsed_s = ((now_ms - last_ms).max(0.0) / 1000.0) as f32;
        let decay = self.decay_db_per_sec * elapsed_s;
        for (peak, &current) in self.peaks.iter_mut().zip(magnitudes) {
            *peak = current.max(*peak - decay).max(PEAK_FLOOR_DB);
        }
        self.last_update_ms = Some(now_ms);

        if self.peaks.iter().any(|p| !p.is_finite()) {
            debug!("Non-finite peak, restarting peak hold");
            self.reinitialize(magnitudes, now_ms);
        }
        &self.peaks
    }

    fn reinitialize(&mut self, magnitudes: &[f32], now_ms: f64) {
        self.peaks = magnitudes
            .iter()
            .map(|&m| if m.is_finite() { m } else { PEAK_FLOOR_DB })
            .collect();
        self.last_update_ms = Some(now_ms);
    }
}
