//! Pan and zoom with optimistic local prediction.
//!
//! The server owns the view. The controller keeps the last confirmed copy,
//! predicts the effect of its own requests so the display reacts at once,
//! and lets every authoritative echo overwrite the prediction.

use log::{debug, info};
use wavesync_messages::{ClientCommand, Hertz, ViewState};

use crate::config::NavigationConfig;

/// Client-side offset applied while a drag is in progress.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DragPrediction {
    pub server_confirmed_frequency: f64,
    /// Zero whenever no drag is active.
    pub predicted_offset: f64,
}

#[derive(Debug, Clone, Copy)]
struct SentPan {
    at_ms: f64,
    frequency: f64,
}

/// Keep a window of `total_bandwidth` centered as close to `center` as the
/// domain `[0, domain_ceiling]` allows.
pub fn clamp_center(center: f64, total_bandwidth: f64, domain_ceiling: f64) -> f64 {
    if total_bandwidth >= domain_ceiling {
        return domain_ceiling / 2.0;
    }
    let half = total_bandwidth / 2.0;
    center.clamp(half, domain_ceiling - half)
}

pub struct ViewController {
    config: NavigationConfig,
    confirmed: Option<ViewState>,
    view: Option<ViewState>,
    /// Bin bandwidth at zoom level 1
    initial_bin_bandwidth: Option<f64>,
    tuned_frequency: Option<f64>,
    prediction: DragPrediction,
    dragging: bool,
    desired_center: f64,
    last_pan: Option<SentPan>,
    awaiting_echo_since: Option<f64>,
}

impl ViewController {
    pub fn new(config: NavigationConfig) -> Self {
        Self {
            config,
            confirmed: None,
            view: None,
            initial_bin_bandwidth: None,
            tuned_frequency: None,
            prediction: DragPrediction::default(),
            dragging: false,
            desired_center: 0.0,
            last_pan: None,
            awaiting_echo_since: None,
        }
    }

    /// Last view the server confirmed.
    pub fn confirmed_view(&self) -> Option<ViewState> {
        self.confirmed
    }

    /// View the display should use right now, prediction included.
    pub fn render_view(&self) -> Option<ViewState> {
        let mut view = self.view?;
        if self.dragging {
            // server_confirmed_frequency + predicted_offset, without the
            // float round trip.
            view.center_frequency = self.desired_center;
        }
        Some(view)
    }

    pub fn prediction(&self) -> DragPrediction {
        self.prediction
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn zoom_level(&self) -> f64 {
        match (self.view, self.initial_bin_bandwidth) {
            (Some(view), Some(initial)) => view.zoom_level(initial),
            _ => 1.0,
        }
    }

    pub fn tuned_frequency(&self) -> Option<f64> {
        self.tuned_frequency
    }

    pub fn set_tuned_frequency(&mut self, frequency: f64) {
        self.tuned_frequency = Some(frequency);
    }

    /// A request is out and its echo has not arrived yet.
    pub fn pan_in_flight(&self, now_ms: f64) -> bool {
        self.dragging
            || self
                .awaiting_echo_since
                .is_some_and(|since| now_ms - since < self.config.pan_echo_timeout_ms)
    }

    /// Authoritative view from the server.
    pub fn apply_config(&mut self, view: ViewState) {
        let initial = self.initial_bin_bandwidth.get_or_insert(view.bin_bandwidth);
        if view.bin_bandwidth > *initial {
            *initial = view.bin_bandwidth;
        }

        self.confirmed = Some(view);
        self.view = Some(view);
        self.awaiting_echo_since = None;
        self.prediction.server_confirmed_frequency = view.center_frequency;
        self.prediction.predicted_offset = 0.0;
        if self.dragging {
            self.desired_center = clamp_center(
                self.desired_center,
                view.total_bandwidth(),
                self.config.domain_ceiling_hz,
            );
            self.prediction.predicted_offset = self.desired_center - view.center_frequency;
        }
    }

    /// Center the view on `frequency`. Only the center goes on the wire.
    pub fn pan_to(&mut self, frequency: f64, now_ms: f64) -> Option<ClientCommand> {
        let mut view = self.view?;
        let center = self.wire_center(frequency, view.total_bandwidth());
        view.center_frequency = center.as_f64();
        self.view = Some(view);
        self.follow_view_while_dragging();
        self.note_sent(center, now_ms);
        Some(ClientCommand::Pan { frequency: center })
    }

    pub fn zoom_in(&mut self, now_ms: f64) -> Option<ClientCommand> {
        let view = self.view?;
        let bin_bandwidth = (view.bin_bandwidth / 2.0).max(self.config.min_bin_bandwidth_hz);
        if bin_bandwidth >= view.bin_bandwidth {
            debug!("Already at maximum zoom");
            return None;
        }
        Some(self.zoom_to(view, bin_bandwidth, now_ms))
    }

    pub fn zoom_out(&mut self, now_ms: f64) -> Option<ClientCommand> {
        let view = self.view?;
        let widest = self.initial_bin_bandwidth.unwrap_or(view.bin_bandwidth);
        let bin_bandwidth = (view.bin_bandwidth * 2.0).min(widest);
        if bin_bandwidth <= view.bin_bandwidth {
            debug!("Already fully zoomed out");
            return None;
        }
        Some(self.zoom_to(view, bin_bandwidth, now_ms))
    }

    pub fn reset_zoom(&mut self, now_ms: f64) -> ClientCommand {
        if let (Some(mut view), Some(initial)) = (self.view, self.initial_bin_bandwidth) {
            view.bin_bandwidth = initial;
            view.center_frequency = clamp_center(
                view.center_frequency,
                view.total_bandwidth(),
                self.config.domain_ceiling_hz,
            );
            self.view = Some(view);
            self.follow_view_while_dragging();
        }
        self.awaiting_echo_since = Some(now_ms);
        ClientCommand::Reset
    }

    pub fn begin_drag(&mut self) {
        let Some(view) = self.view else {
            return;
        };
        let anchor = self.confirmed.unwrap_or(view).center_frequency;
        self.dragging = true;
        self.desired_center = view.center_frequency;
        self.prediction = DragPrediction {
            server_confirmed_frequency: anchor,
            predicted_offset: view.center_frequency - anchor,
        };
        self.last_pan = Some(SentPan {
            at_ms: f64::NEG_INFINITY,
            frequency: view.center_frequency,
        });
    }

    /// Move the drag to `frequency`. Returns a pan request when the throttle
    /// interval has passed and the view moved far enough to matter.
    pub fn drag_to(&mut self, frequency: f64, now_ms: f64) -> Option<ClientCommand> {
        if !self.dragging {
            return None;
        }
        let view = self.view?;
        self.desired_center = clamp_center(
            frequency,
            view.total_bandwidth(),
            self.config.domain_ceiling_hz,
        );
        self.prediction.predicted_offset =
            self.desired_center - self.prediction.server_confirmed_frequency;

        let min_step = self.config.min_pan_step_hz.unwrap_or(view.bin_bandwidth);
        let (due, moved) = match self.last_pan {
            Some(sent) => (
                now_ms - sent.at_ms >= self.config.pan_throttle_ms,
                (self.desired_center - sent.frequency).abs() >= min_step,
            ),
            None => (true, true),
        };
        if !(due && moved) {
            return None;
        }
        let center = self.wire_center(self.desired_center, view.total_bandwidth());
        self.note_sent(center, now_ms);
        Some(ClientCommand::Pan { frequency: center })
    }

    /// Finish the drag: the final position is sent if it differs from the
    /// last request, and the prediction is dropped.
    pub fn end_drag(&mut self, now_ms: f64) -> Option<ClientCommand> {
        if !self.dragging {
            return None;
        }
        self.dragging = false;
        self.prediction.predicted_offset = 0.0;

        let mut view = self.view?;
        let center = self.wire_center(self.desired_center, view.total_bandwidth());
        view.center_frequency = center.as_f64();
        self.view = Some(view);

        let already_sent = self
            .last_pan
            .is_some_and(|sent| sent.frequency == center.as_f64());
        if already_sent {
            return None;
        }
        self.note_sent(center, now_ms);
        Some(ClientCommand::Pan { frequency: center })
    }

    /// Bring the tuned frequency back into a zoomed view that lost it.
    pub fn check_tuned_visible(&mut self, now_ms: f64) -> Option<ClientCommand> {
        if self.pan_in_flight(now_ms) || self.zoom_level() <= 1.0 {
            return None;
        }
        let tuned = self.tuned_frequency?;
        if self.view?.contains(tuned) {
            return None;
        }
        info!("Tuned frequency {tuned:.0} Hz left the view, re-centering");
        self.pan_to(tuned, now_ms)
    }

    fn zoom_to(&mut self, mut view: ViewState, bin_bandwidth: f64, now_ms: f64) -> ClientCommand {
        view.bin_bandwidth = bin_bandwidth;
        let anchor = self.tuned_frequency.unwrap_or(view.center_frequency);
        let center = self.wire_center(anchor, view.total_bandwidth());
        view.center_frequency = center.as_f64();
        self.view = Some(view);
        self.follow_view_while_dragging();
        self.note_sent(center, now_ms);
        debug!("Zoom to {bin_bandwidth} Hz/bin around {center}");
        ClientCommand::Zoom {
            frequency: center,
            bin_bandwidth,
        }
    }

    /// Clamp into the domain and round to whole Hertz without letting the
    /// rounding push the window back out.
    fn wire_center(&self, frequency: f64, total_bandwidth: f64) -> Hertz {
        let ceiling = self.config.domain_ceiling_hz;
        let clamped = clamp_center(frequency, total_bandwidth, ceiling);
        let half = total_bandwidth / 2.0;
        let mut rounded = clamped.round();
        if rounded - half < 0.0 {
            rounded = clamped.ceil();
        }
        if rounded + half > ceiling {
            rounded = clamped.floor();
        }
        Hertz::round_from(rounded)
    }

    /// A pan or zoom issued mid-drag moves the gesture along with it.
    fn follow_view_while_dragging(&mut self) {
        if let (true, Some(view)) = (self.dragging, self.view) {
            self.desired_center = view.center_frequency;
            self.prediction.predicted_offset =
                self.desired_center - self.prediction.server_confirmed_frequency;
        }
    }

    fn note_sent(&mut self, center: Hertz, now_ms: f64) {
        self.last_pan = Some(SentPan {
            at_ms: now_ms,
            frequency: center.as_f64(),
        });
        self.awaiting_echo_since = Some(now_ms);
    }
}
