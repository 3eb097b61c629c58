use crate::{ConnectionState, Decibels, ViewState};

/// Events sent from the engine to the UI.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A frame is due on screen.
    Frame(RenderFrame),
    /// The view the display should use changed (echo, zoom, or drag prediction).
    ViewChanged(ViewState),
    Connection(ConnectionState),
    /// Terminal, user-visible condition. Sent at most once per cause.
    Notice(Notice),
    /// Periodic scheduler counters.
    Stats(SchedulerStats),
}

/// Everything the renderer needs for one line of spectrum.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderFrame {
    /// Magnitudes in dB, ascending frequency
    pub magnitudes: Vec<f32>,
    /// Per-bin peak-hold trace, same length as `magnitudes`
    pub peaks: Vec<f32>,
    /// View the display shows now, drag prediction included
    pub view: Option<ViewState>,
    /// Span the bins were produced for. Differs from `view` while a pan is
    /// in flight or a frame queued before an echo is released after it.
    pub frame_view: Option<ViewState>,
    /// Intensity range for the spectrum trace
    pub spectrum_range: Option<(Decibels, Decibels)>,
    /// Intensity range for the waterfall
    pub waterfall_range: Option<(Decibels, Decibels)>,
    pub server_timestamp_ms: f64,
    pub receive_order: u64,
}

/// Conditions that end automatic connection handling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// The admission check refused the session for good (ban, kick, capacity).
    Denied(String),
    /// Reconnect attempts ran out.
    RetriesExhausted { attempts: u32 },
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Denied(reason) => write!(f, "connection refused: {reason}"),
            Self::RetriesExhausted { attempts } => {
                write!(f, "gave up reconnecting after {attempts} attempts")
            }
        }
    }
}

/// Frame accounting since the engine started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SchedulerStats {
    pub enqueued: u64,
    pub released: u64,
    /// Oldest frames dropped because the queue exceeded its healthy depth
    pub dropped_backpressure: u64,
    /// Frames dropped for exceeding the maximum age
    pub dropped_stale: u64,
    /// Frames skipped in free-running mode because a newer one was shown
    pub superseded: u64,
    pub queue_depth: usize,
}
