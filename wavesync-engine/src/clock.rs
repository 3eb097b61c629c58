//! Time source the scheduler paces frames against.

use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Clock and buffer level supplied by the audio playback subsystem.
///
/// All engine timing is in milliseconds on this clock. Server frame
/// timestamps must be on the same time base for synchronized playback.
pub trait AudioClock {
    /// Monotonic now.
    fn now_ms(&self) -> f64;

    /// How much decoded audio is queued ahead of the speaker.
    fn buffered_ahead_ms(&self) -> f64;
}

/// Wall-clock time in Unix milliseconds that never runs backwards.
///
/// Used when no audio subsystem is attached; reports a fixed buffer level.
pub struct WallClock {
    epoch_at_start_ms: f64,
    started: Instant,
    buffered_ahead_ms: f64,
}

impl WallClock {
    pub fn new(buffered_ahead_ms: f64) -> Self {
        let epoch_at_start_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64() * 1000.0)
            .unwrap_or(0.0);
        Self {
            epoch_at_start_ms,
            started: Instant::now(),
            buffered_ahead_ms,
        }
    }
}

impl Default for WallClock {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl AudioClock for WallClock {
    fn now_ms(&self) -> f64 {
        self.epoch_at_start_ms + self.started.elapsed().as_secs_f64() * 1000.0
    }

    fn buffered_ahead_ms(&self) -> f64 {
        self.buffered_ahead_ms
    }
}
