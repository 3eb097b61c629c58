use serde::{Deserialize, Serialize};

/// What the display currently covers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewState {
    /// Center of the visible window, in Hz
    pub center_frequency: f64,
    /// Number of bins per frame
    pub bin_count: usize,
    /// Width of one bin, in Hz
    pub bin_bandwidth: f64,
}

impl ViewState {
    pub fn new(center_frequency: f64, bin_count: usize, bin_bandwidth: f64) -> Self {
        Self {
            center_frequency,
            bin_count,
            bin_bandwidth,
        }
    }

    pub fn total_bandwidth(&self) -> f64 {
        self.bin_count as f64 * self.bin_bandwidth
    }

    /// Zoom relative to the fully zoomed-out bin bandwidth. 1.0 is no zoom.
    pub fn zoom_level(&self, initial_bin_bandwidth: f64) -> f64 {
        if self.bin_bandwidth > 0.0 {
            initial_bin_bandwidth / self.bin_bandwidth
        } else {
            1.0
        }
    }

    /// Lowest visible frequency.
    pub fn start_frequency(&self) -> f64 {
        self.center_frequency - self.total_bandwidth() / 2.0
    }

    /// Highest visible frequency.
    pub fn end_frequency(&self) -> f64 {
        self.center_frequency + self.total_bandwidth() / 2.0
    }

    pub fn contains(&self, frequency: f64) -> bool {
        frequency >= self.start_frequency() && frequency <= self.end_frequency()
    }
}

/// Lifecycle of the connection to the receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    /// Admission check or stream handshake in progress.
    Connecting,
    Connected,
    /// Waiting for the reconnect timer.
    BackingOff,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::BackingOff => "backing off",
        };
        f.write_str(label)
    }
}

/// How queued frames are paced against audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncMode {
    /// Release each frame when its audio becomes audible.
    #[default]
    Synchronized,
    /// Show the newest frame every tick, ignoring audio.
    FreeRunning,
}

/// One timestamped snapshot of per-bin magnitudes.
///
/// Magnitudes are in dB and already in ascending frequency order.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrumFrame {
    pub magnitudes: Vec<f32>,
    /// Server production time, in milliseconds on the audio clock
    pub server_timestamp_ms: f64,
    /// Local clock reading when the frame was enqueued
    pub received_at_ms: f64,
    /// Position in arrival order, strictly increasing
    pub receive_order: u64,
    /// Center frequency the server reported for this frame
    pub center_frequency: f64,
}
