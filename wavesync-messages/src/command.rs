use crate::{Hertz, SyncMode};

/// Commands sent from the UI to the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Stop the engine and close the stream.
    Stop,
    /// Run the admission check and open the stream.
    Connect,
    /// Close the stream and suppress every future reconnect.
    Disconnect,
    /// Center the view on a frequency.
    PanTo(Hertz),
    ZoomIn,
    ZoomOut,
    ResetZoom,
    /// Start of a drag gesture on the display.
    DragStart,
    /// Drag moved; the desired center may be fractional (pixel-derived).
    DragTo(f64),
    DragEnd,
    SetSyncMode(SyncMode),
    /// Frequency the audio receiver is tuned to.
    SetTunedFrequency(Hertz),
    /// Latency of the audio filter path, in milliseconds.
    SetFilterLatency(f64),
    /// Subscribe to an auxiliary server stream.
    Subscribe(String),
    Unsubscribe(String),
}
