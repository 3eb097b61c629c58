//! Connection lifecycle as a pure state machine.
//!
//! [`Session`] never touches the network. The transport reports what
//! happened as [`SessionEvent`]s, the session answers with
//! [`SessionAction`]s, and the engine carries those out. Timers are plain
//! deadlines checked by [`Session::poll`] on every tick.

use log::{debug, info, trace, warn};
use wavesync_messages::{
    AdmissionRequest, AdmissionResponse, ClientCommand, ConnectionState, Notice, ServerMessage,
};

use crate::codec::{self, Payload};
use crate::config::SessionConfig;

/// Something the transport observed.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Result of the admission check; `Err` when the request itself failed.
    Admission(Result<AdmissionResponse, String>),
    Opened,
    /// The stream ended, with a human-readable reason.
    Closed(String),
    Message(Payload),
    Error(String),
}

/// Something the engine must do on the session's behalf.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionAction {
    CheckAdmission(AdmissionRequest),
    OpenStream,
    CloseStream,
    Send(ClientCommand),
    Deliver(ServerMessage),
    StateChanged(ConnectionState),
    Notify(Notice),
}

/// The single pending reconnect.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconnectTimer {
    pub due_ms: f64,
    /// Which attempt fires when the timer expires (1-based)
    pub attempt: u32,
}

/// Reconnect delay before attempt `attempt + 1`: `min(base * 2^attempt, cap)`.
pub fn backoff_delay(base_ms: f64, cap_ms: f64, attempt: u32) -> f64 {
    let exponent = attempt.min(i32::MAX as u32) as i32;
    (base_ms * 2f64.powi(exponent)).min(cap_ms)
}

pub struct Session {
    config: SessionConfig,
    state: ConnectionState,
    attempts: u32,
    reconnect_timer: Option<ReconnectTimer>,
    /// Sticky: set by a terminal denial or an explicit disconnect.
    no_retry: bool,
    /// Attempts are only forgiven once the server actually talks to us.
    awaiting_first_message: bool,
    exhausted_notified: bool,
    last_resync_ms: f64,
    last_ping_ms: f64,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            state: ConnectionState::Disconnected,
            attempts: 0,
            reconnect_timer: None,
            no_retry: false,
            awaiting_first_message: false,
            exhausted_notified: false,
            last_resync_ms: 0.0,
            last_ping_ms: 0.0,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn pending_reconnect(&self) -> Option<ReconnectTimer> {
        self.reconnect_timer
    }

    pub fn retry_suppressed(&self) -> bool {
        self.no_retry
    }

    /// User-initiated connect. Starts over with a fresh attempt budget.
    pub fn connect(&mut self) -> Vec<SessionAction> {
        if matches!(
            self.state,
            ConnectionState::Connected | ConnectionState::Connecting
        ) {
            debug!("Connect requested while already {}", self.state);
            return Vec::new();
        }
        self.no_retry = false;
        self.attempts = 0;
        self.reconnect_timer = None;
        self.exhausted_notified = false;
        self.begin_attempt()
    }

    /// User-initiated disconnect. Cancels any pending reconnect for good.
    pub fn disconnect(&mut self) -> Vec<SessionAction> {
        self.no_retry = true;
        self.reconnect_timer = None;
        self.awaiting_first_message = false;
        let mut actions = vec![SessionAction::CloseStream];
        self.set_state(ConnectionState::Disconnected, &mut actions);
        actions
    }

    /// Transition on a transport event.
    pub fn handle(&mut self, event: SessionEvent, now_ms: f64) -> Vec<SessionAction> {
        match event {
            SessionEvent::Admission(Ok(response)) if response.allowed => {
                if self.no_retry || self.state != ConnectionState::Connecting {
                    debug!("Ignoring admission result for an abandoned attempt");
                    return Vec::new();
                }
                debug!("Admission granted, opening stream");
                vec![SessionAction::OpenStream]
            }
            SessionEvent::Admission(Ok(response)) if response.is_terminal_denial() => {
                warn!("Admission denied for good: {}", response.reason);
                self.no_retry = true;
                self.reconnect_timer = None;
                let mut actions = Vec::new();
                self.set_state(ConnectionState::Disconnected, &mut actions);
                actions.push(SessionAction::Notify(Notice::Denied(response.reason)));
                actions
            }
            SessionEvent::Admission(Ok(response)) => {
                warn!("Admission denied: {}", response.reason);
                self.schedule_reconnect(now_ms)
            }
            SessionEvent::Admission(Err(err)) => {
                warn!("Admission check failed: {err}");
                self.schedule_reconnect(now_ms)
            }
            SessionEvent::Opened => {
                if self.no_retry {
                    return vec![SessionAction::CloseStream];
                }
                info!("Stream open (attempt {})", self.attempts);
                self.reconnect_timer = None;
                let mut actions = Vec::new();
                self.set_state(ConnectionState::Connected, &mut actions);
                self.awaiting_first_message = true;
                self.last_resync_ms = now_ms;
                self.last_ping_ms = now_ms;
                actions.push(SessionAction::Send(ClientCommand::GetStatus));
                actions
            }
            SessionEvent::Message(payload) => self.receive(&payload),
            SessionEvent::Closed(reason) => {
                if self.no_retry {
                    debug!("Stream closed after disconnect: {reason}");
                    let mut actions = Vec::new();
                    self.set_state(ConnectionState::Disconnected, &mut actions);
                    return actions;
                }
                warn!("Stream closed: {reason}");
                self.awaiting_first_message = false;
                self.schedule_reconnect(now_ms)
            }
            SessionEvent::Error(err) => {
                warn!("Transport error: {err}");
                Vec::new()
            }
        }
    }

    /// Fire due timers. `pan_in_flight` holds back resync requests so the
    /// echo of an older state cannot fight an ongoing gesture.
    pub fn poll(&mut self, now_ms: f64, pan_in_flight: bool) -> Vec<SessionAction> {
        if let Some(timer) = self.reconnect_timer {
            if now_ms >= timer.due_ms {
                self.reconnect_timer = None;
                if self.no_retry {
                    return Vec::new();
                }
                info!("Reconnecting (attempt {})", timer.attempt);
                return self.begin_attempt();
            }
        }

        let mut actions = Vec::new();
        if self.state != ConnectionState::Connected {
            return actions;
        }
        if !pan_in_flight && now_ms - self.last_resync_ms >= self.config.resync_interval_ms {
            trace!("Requesting resync");
            self.last_resync_ms = now_ms;
            actions.push(SessionAction::Send(ClientCommand::GetStatus));
        }
        if now_ms - self.last_ping_ms >= self.config.ping_interval_ms {
            self.last_ping_ms = now_ms;
            actions.push(SessionAction::Send(ClientCommand::Ping));
        }
        actions
    }

    fn receive(&mut self, payload: &Payload) -> Vec<SessionAction> {
        let message = match codec::decode(payload) {
            Ok(message) => message,
            Err(err) => {
                warn!("Dropping undecodable message: {err}");
                return Vec::new();
            }
        };

        if self.awaiting_first_message {
            self.awaiting_first_message = false;
            if self.attempts > 0 {
                info!("Connection healthy again after {} attempts", self.attempts);
            }
            self.attempts = 0;
        }

        match &message {
            ServerMessage::Error(err) if err.is_rate_limit() => {
                debug!("Server rate limited a request: {}", err.error);
            }
            ServerMessage::Error(err) => {
                warn!("Server error {}: {}", err.status, err.error);
            }
            ServerMessage::Pong => trace!("Pong"),
            ServerMessage::Config(_) | ServerMessage::Spectrum(_) => {}
        }
        vec![SessionAction::Deliver(message)]
    }

    fn begin_attempt(&mut self) -> Vec<SessionAction> {
        let mut actions = Vec::new();
        self.set_state(ConnectionState::Connecting, &mut actions);
        actions.push(SessionAction::CheckAdmission(AdmissionRequest {
            user_session_id: self.config.session_id.clone(),
            password: self.config.password.clone(),
        }));
        actions
    }

    fn schedule_reconnect(&mut self, now_ms: f64) -> Vec<SessionAction> {
        let mut actions = Vec::new();
        if self.no_retry {
            self.set_state(ConnectionState::Disconnected, &mut actions);
            return actions;
        }
        if self.reconnect_timer.is_some() {
            return actions;
        }
        if self.attempts >= self.config.max_reconnect_attempts {
            self.set_state(ConnectionState::Disconnected, &mut actions);
            if !self.exhausted_notified {
                self.exhausted_notified = true;
                warn!("Giving up after {} reconnect attempts", self.attempts);
                actions.push(SessionAction::Notify(Notice::RetriesExhausted {
                    attempts: self.attempts,
                }));
            }
            return actions;
        }

        let delay = backoff_delay(
            self.config.reconnect_base_ms,
            self.config.reconnect_cap_ms,
            self.attempts,
        );
        self.attempts += 1;
        self.reconnect_timer = Some(ReconnectTimer {
            due_ms: now_ms + delay,
            attempt: self.attempts,
        });
        info!(
            "Reconnect attempt {} of {} in {delay:.0} ms",
            self.attempts, self.config.max_reconnect_attempts
        );
        self.set_state(ConnectionState::BackingOff, &mut actions);
        actions
    }

    fn set_state(&mut self, state: ConnectionState, actions: &mut Vec<SessionAction>) {
        if self.state != state {
            debug!("Connection {} -> {}", self.state, state);
            self.state = state;
            actions.push(SessionAction::StateChanged(state));
        }
    }
}
