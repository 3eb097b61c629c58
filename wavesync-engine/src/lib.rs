mod clock;
mod codec;
mod config;
mod error;
mod navigation;
mod peak_hold;
mod range;
mod scheduler;
mod session;
mod transport;

pub use clock::{AudioClock, WallClock};
pub use codec::{Payload, decode, unwrap_fft_order};
pub use config::{
    EngineConfig, NavigationConfig, PeakHoldConfig, RangeConfig, SchedulerConfig, SessionConfig,
    SurfaceRangeConfig,
};
pub use error::{ConfigError, DecodeError, TransportError};
pub use navigation::{DragPrediction, ViewController, clamp_center};
pub use peak_hold::{PEAK_FLOOR_DB, PeakHold};
pub use range::{AutoRange, RangeHistory, finite_extent};
pub use scheduler::FrameScheduler;
pub use session::{ReconnectTimer, Session, SessionAction, SessionEvent, backoff_delay};
pub use transport::{StreamEvent, Transport, WebSocketTransport, parse_admission};

use std::time::{Duration, Instant};

use anyhow::Result;
use flume::{Receiver, Sender, TrySendError};
use log::{debug, error, info, warn};
use wavesync_messages::{
    ClientCommand, Command, ConnectionState, Event, RenderFrame, ServerMessage, SpectrumFrame,
    ViewState,
};

/// The streaming engine.
///
/// Owns the session, frame scheduler, navigation, range and peak-hold state
/// and mutates them from a single thread. UI commands arrive on `cmd_rx`,
/// network events on `net_rx`; results leave as [`Event`]s on `event_tx`.
pub struct Engine<T: Transport = WebSocketTransport, C: AudioClock = WallClock> {
    cmd_rx: Receiver<Command>,
    event_tx: Sender<Event>,
    net_rx: Receiver<StreamEvent>,
    transport: T,
    clock: C,
    config: EngineConfig,
    session: Session,
    scheduler: FrameScheduler,
    navigation: ViewController,
    spectrum_range: AutoRange,
    waterfall_range: AutoRange,
    peak_hold: PeakHold,
    last_visibility_check_ms: f64,
    last_stats_ms: f64,
    should_exit: bool,
}

impl Engine<WebSocketTransport, WallClock> {
    /// Engine talking to a real receiver, timed by the wall clock.
    pub fn connect_to_server(
        cmd_rx: Receiver<Command>,
        event_tx: Sender<Event>,
        config: EngineConfig,
    ) -> Result<Self> {
        let (net_tx, net_rx) = flume::unbounded();
        let transport = WebSocketTransport::new(&config.session, net_tx)?;
        info!("Receiver stream at {}", transport.stream_url());
        Ok(Self::new(
            cmd_rx,
            event_tx,
            net_rx,
            transport,
            WallClock::default(),
            config,
        ))
    }
}

impl<T: Transport, C: AudioClock> Engine<T, C> {
    /// Create a new Engine instance.
    pub fn new(
        cmd_rx: Receiver<Command>,
        event_tx: Sender<Event>,
        net_rx: Receiver<StreamEvent>,
        transport: T,
        clock: C,
        config: EngineConfig,
    ) -> Self {
        debug!("Constructing a new engine");
        Self {
            cmd_rx,
            event_tx,
            net_rx,
            transport,
            clock,
            session: Session::new(config.session.clone()),
            scheduler: FrameScheduler::new(&config.scheduler),
            navigation: ViewController::new(config.navigation.clone()),
            spectrum_range: AutoRange::new(&config.range.spectrum),
            waterfall_range: AutoRange::new(&config.range.waterfall),
            peak_hold: PeakHold::new(&config.peak_hold),
            last_visibility_check_ms: 0.0,
            last_stats_ms: 0.0,
            should_exit: false,
            config,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn scheduler(&self) -> &FrameScheduler {
        &self.scheduler
    }

    pub fn navigation(&self) -> &ViewController {
        &self.navigation
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn should_exit(&self) -> bool {
        self.should_exit
    }

    /// Run the engine (blocking) until `Command::Stop` or the command
    /// channel closes.
    pub fn run(mut self) -> Result<()> {
        let tick_interval = Duration::from_millis(self.config.tick_interval_ms);
        let mut last_tick = Instant::now();

        while !self.should_exit {
            let wait = tick_interval.saturating_sub(last_tick.elapsed());
            match self.cmd_rx.recv_timeout(wait) {
                Ok(cmd) => self.handle_command(cmd),
                Err(flume::RecvTimeoutError::Disconnected) => {
                    debug!("Command channel closed, stopping engine");
                    self.should_exit = true;
                }
                Err(flume::RecvTimeoutError::Timeout) => {}
            }

            self.drain_network();

            if last_tick.elapsed() >= tick_interval {
                last_tick = Instant::now();
                self.tick();
            }
        }

        self.transport.close();
        Ok(())
    }

    /// Apply every network event received so far. Events from superseded
    /// streams are dropped.
    pub fn drain_network(&mut self) {
        while let Ok(StreamEvent { stream, event }) = self.net_rx.try_recv() {
            if stream != self.transport.current_stream() {
                debug!("Ignoring {:?} from superseded stream {stream}", event);
                continue;
            }
            self.handle_session_event(event);
        }
    }

    pub fn handle_command(&mut self, cmd: Command) {
        debug!("Engine received command: {:?}", cmd);
        let now = self.clock.now_ms();

        match cmd {
            Command::Stop => {
                let actions = self.session.disconnect();
                self.apply(actions, now);
                self.should_exit = true;
            }
            Command::Connect => {
                let actions = self.session.connect();
                self.apply(actions, now);
            }
            Command::Disconnect => {
                let actions = self.session.disconnect();
                self.apply(actions, now);
                self.scheduler.clear();
            }
            Command::PanTo(frequency) => {
                let request = self.navigation.pan_to(frequency.as_f64(), now);
                self.request_view_change(request);
            }
            Command::ZoomIn => {
                let request = self.navigation.zoom_in(now);
                self.request_zoom(request);
            }
            Command::ZoomOut => {
                let request = self.navigation.zoom_out(now);
                self.request_zoom(request);
            }
            Command::ResetZoom => {
                let request = self.navigation.reset_zoom(now);
                self.request_zoom(Some(request));
            }
            Command::DragStart => self.navigation.begin_drag(),
            Command::DragTo(frequency) => {
                let request = self.navigation.drag_to(frequency, now);
                self.request_view_change(request);
            }
            Command::DragEnd => {
                let request = self.navigation.end_drag(now);
                self.request_view_change(request);
            }
            Command::SetSyncMode(mode) => self.scheduler.set_mode(mode),
            Command::SetTunedFrequency(frequency) => {
                self.navigation.set_tuned_frequency(frequency.as_f64())
            }
            Command::SetFilterLatency(latency_ms) => self.scheduler.set_filter_latency(latency_ms),
            Command::Subscribe(stream) => self.send(ClientCommand::Subscribe { stream }),
            Command::Unsubscribe(stream) => self.send(ClientCommand::Unsubscribe { stream }),
        }
    }

    pub fn handle_session_event(&mut self, event: SessionEvent) {
        let now = self.clock.now_ms();
        let actions = self.session.handle(event, now);
        self.apply(actions, now);
    }

    /// One pass of the scheduling loop.
    pub fn tick(&mut self) {
        let now = self.clock.now_ms();

        let pan_in_flight = self.navigation.pan_in_flight(now);
        let actions = self.session.poll(now, pan_in_flight);
        self.apply(actions, now);

        if now - self.last_visibility_check_ms >= self.config.navigation.visibility_check_interval_ms
        {
            self.last_visibility_check_ms = now;
            if let Some(request) = self.navigation.check_tuned_visible(now) {
                self.request_view_change(Some(request));
            }
        }

        for frame in self.scheduler.tick(now, self.clock.buffered_ahead_ms()) {
            self.render(frame, now);
        }

        if now - self.last_stats_ms >= self.config.stats_interval_ms {
            self.last_stats_ms = now;
            self.emit(Event::Stats(self.scheduler.stats()));
        }
    }

    fn render(&mut self, frame: SpectrumFrame, now: f64) {
        self.spectrum_range.observe(&frame.magnitudes, now);
        self.waterfall_range.observe(&frame.magnitudes, now);
        let peaks = self.peak_hold.update(&frame.magnitudes, now).to_vec();

        // Geometry of the confirmed view, positioned where this frame was
        // produced. A pan echo may have moved the view since it was queued.
        let frame_view = self.navigation.confirmed_view().map(|confirmed| {
            ViewState::new(
                frame.center_frequency,
                frame.magnitudes.len(),
                confirmed.bin_bandwidth,
            )
        });

        self.emit(Event::Frame(RenderFrame {
            peaks,
            view: self.navigation.render_view(),
            frame_view,
            spectrum_range: self.spectrum_range.display_range(),
            waterfall_range: self.waterfall_range.display_range(),
            server_timestamp_ms: frame.server_timestamp_ms,
            receive_order: frame.receive_order,
            magnitudes: frame.magnitudes,
        }));
    }

    fn apply(&mut self, actions: Vec<SessionAction>, now: f64) {
        for action in actions {
            match action {
                SessionAction::CheckAdmission(request) => self.transport.check_admission(request),
                SessionAction::OpenStream => self.transport.open(),
                SessionAction::CloseStream => self.transport.close(),
                SessionAction::Send(command) => self.send(command),
                SessionAction::Deliver(message) => self.on_server_message(message, now),
                SessionAction::StateChanged(state) => {
                    if state == ConnectionState::Connected {
                        self.peak_hold.reset();
                    }
                    self.emit(Event::Connection(state));
                }
                SessionAction::Notify(notice) => {
                    error!("{notice}");
                    self.emit(Event::Notice(notice));
                }
            }
        }
    }

    fn on_server_message(&mut self, message: ServerMessage, now: f64) {
        match message {
            ServerMessage::Config(echo) => {
                self.navigation.apply_config(echo.view());
                if let Some(view) = self.navigation.render_view() {
                    self.emit(Event::ViewChanged(view));
                }
            }
            ServerMessage::Spectrum(spectrum) => {
                // Frames that do not name their center belong to the last
                // confirmed view.
                let center = if spectrum.frequency > 0.0 {
                    spectrum.frequency
                } else {
                    self.navigation
                        .confirmed_view()
                        .map_or(0.0, |view| view.center_frequency)
                };
                self.scheduler
                    .enqueue(spectrum.data, spectrum.timestamp, center, now);
            }
            ServerMessage::Error(_) | ServerMessage::Pong => {}
        }
    }

    fn request_view_change(&mut self, request: Option<ClientCommand>) {
        if let Some(command) = request {
            self.send(command);
        }
        if let Some(view) = self.navigation.render_view() {
            self.emit(Event::ViewChanged(view));
        }
    }

    /// Zoom remaps every bin, so held peaks no longer line up.
    fn request_zoom(&mut self, request: Option<ClientCommand>) {
        if request.is_some() {
            self.peak_hold.reset();
        }
        self.request_view_change(request);
    }

    fn send(&mut self, command: ClientCommand) {
        if self.session.state() != ConnectionState::Connected {
            debug!("Not connected, dropping {:?}", command);
            return;
        }
        if let Err(err) = self.transport.send(&command) {
            warn!("Failed to send {:?}: {err}", command);
        }
    }

    fn emit(&mut self, event: Event) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => debug!("Event channel full, dropping event"),
            Err(TrySendError::Disconnected(_)) => {
                debug!("Event receiver gone, stopping engine");
                self.should_exit = true;
            }
        }
    }
}
