//! Network side of the session.
//!
//! A [`Transport`] performs I/O on helper threads and reports back only by
//! sending [`StreamEvent`]s into the engine's channel, so nothing here ever
//! blocks the scheduling loop.

use std::io::ErrorKind;
use std::net::TcpStream;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use flume::{Receiver, Sender};
use log::{debug, warn};
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Message, WebSocket};
use url::Url;
use wavesync_messages::{AdmissionRequest, AdmissionResponse, ClientCommand};

use crate::codec::Payload;
use crate::config::SessionConfig;
use crate::error::TransportError;
use crate::session::SessionEvent;

/// How long a socket read waits before the thread checks for outbound
/// commands and the stop flag.
const READ_POLL: Duration = Duration::from_millis(20);

/// A [`SessionEvent`] tagged with the stream it came from.
///
/// Every admission check and every open starts a new stream id; events
/// from superseded ids must be discarded.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamEvent {
    pub stream: u64,
    pub event: SessionEvent,
}

/// Connection plumbing the engine drives.
///
/// Every method returns immediately; outcomes arrive later as
/// [`SessionEvent`]s.
pub trait Transport {
    /// Ask the server whether this session may connect.
    fn check_admission(&mut self, request: AdmissionRequest);

    /// Open the spectrum stream, replacing any previous one.
    fn open(&mut self);

    fn send(&mut self, command: &ClientCommand) -> Result<(), TransportError>;

    /// Close the stream without reporting `Closed`.
    fn close(&mut self);

    /// Id of the attempt whose events are still wanted.
    fn current_stream(&self) -> u64;
}

/// Outcome of an admission reply. The body decides, whatever the HTTP
/// status: refusals are often sent with 403 or 503.
pub fn parse_admission(status: u16, body: &str) -> Result<AdmissionResponse, String> {
    serde_json::from_str::<AdmissionResponse>(body).map_err(|err| {
        if (200..300).contains(&status) {
            format!("malformed admission reply: {err}")
        } else {
            format!("admission check returned HTTP {status}")
        }
    })
}

struct StreamHandle {
    outbound: Sender<String>,
    stop: Arc<AtomicBool>,
}

/// Admission over HTTP, spectrum over a websocket.
pub struct WebSocketTransport {
    admission_url: Url,
    stream_url: Url,
    http: reqwest::blocking::Client,
    net_tx: Sender<StreamEvent>,
    stream: Option<StreamHandle>,
    stream_id: u64,
}

impl WebSocketTransport {
    pub fn new(config: &SessionConfig, net_tx: Sender<StreamEvent>) -> Result<Self, TransportError> {
        let invalid = |reason: String| TransportError::InvalidUrl {
            url: config.server_url.clone(),
            reason,
        };

        let mut base = Url::parse(&config.server_url).map_err(|e| invalid(e.to_string()))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let admission_url = base
            .join("connection")
            .map_err(|e| invalid(e.to_string()))?;

        let mut stream_url = base
            .join("ws/user-spectrum")
            .map_err(|e| invalid(e.to_string()))?;
        let ws_scheme = match base.scheme() {
            "https" | "wss" => "wss",
            _ => "ws",
        };
        stream_url
            .set_scheme(ws_scheme)
            .map_err(|()| invalid(format!("cannot use scheme {ws_scheme}")))?;
        stream_url
            .query_pairs_mut()
            .append_pair("user_session_id", &config.session_id);

        let http = reqwest::blocking::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            admission_url,
            stream_url,
            http,
            net_tx,
            stream: None,
            stream_id: 0,
        })
    }

    pub fn stream_url(&self) -> &Url {
        &self.stream_url
    }

    pub fn admission_url(&self) -> &Url {
        &self.admission_url
    }
}

impl Transport for WebSocketTransport {
    fn check_admission(&mut self, request: AdmissionRequest) {
        self.stream_id += 1;
        let stream = self.stream_id;
        let http = self.http.clone();
        let url = self.admission_url.clone();
        let net_tx = self.net_tx.clone();
        thread::spawn(move || {
            let result = http
                .post(url)
                .json(&request)
                .send()
                .and_then(|response| {
                    let status = response.status().as_u16();
                    response.text().map(|body| (status, body))
                })
                .map_err(|e| e.to_string())
                .and_then(|(status, body)| parse_admission(status, &body));
            let _ = net_tx.send(StreamEvent {
                stream,
                event: SessionEvent::Admission(result),
            });
        });
    }

    fn open(&mut self) {
        self.close();

        let (outbound_tx, outbound_rx) = flume::unbounded();
        let stop = Arc::new(AtomicBool::new(false));
        let url = self.stream_url.clone();
        let reporter = Reporter {
            stream: self.stream_id,
            stop: Arc::clone(&stop),
            net_tx: self.net_tx.clone(),
        };
        thread::spawn(move || run_stream(url, outbound_rx, reporter));

        self.stream = Some(StreamHandle {
            outbound: outbound_tx,
            stop,
        });
    }

    fn send(&mut self, command: &ClientCommand) -> Result<(), TransportError> {
        let stream = self.stream.as_ref().ok_or(TransportError::NotOpen)?;
        let text = serde_json::to_string(command)?;
        stream
            .outbound
            .send(text)
            .map_err(|_| TransportError::NotOpen)
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            stream.stop.store(true, Ordering::Relaxed);
        }
        self.stream_id += 1;
    }

    fn current_stream(&self) -> u64 {
        self.stream_id
    }
}

impl Drop for WebSocketTransport {
    fn drop(&mut self) {
        self.close();
    }
}

/// Event sink of one socket thread. Silent once the stream is stopped.
struct Reporter {
    stream: u64,
    stop: Arc<AtomicBool>,
    net_tx: Sender<StreamEvent>,
}

impl Reporter {
    fn stopped(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    /// False when the event was not delivered and the thread should end.
    fn report(&self, event: SessionEvent) -> bool {
        if self.stopped() {
            return false;
        }
        self.net_tx
            .send(StreamEvent {
                stream: self.stream,
                event,
            })
            .is_ok()
    }
}

/// Socket thread: one stream, from handshake to close.
fn run_stream(url: Url, outbound: Receiver<String>, reporter: Reporter) {
    debug!("Opening {url} (stream {})", reporter.stream);
    let mut socket = match tungstenite::connect(url.as_str()) {
        Ok((socket, _response)) => socket,
        Err(err) => {
            reporter.report(SessionEvent::Closed(format!("connect failed: {err}")));
            return;
        }
    };
    set_read_timeout(&mut socket);
    if !reporter.report(SessionEvent::Opened) {
        let _ = socket.close(None);
        let _ = socket.flush();
        return;
    }

    let reason = 'stream: loop {
        if reporter.stopped() {
            let _ = socket.close(None);
            let _ = socket.flush();
            return;
        }

        for text in outbound.try_iter() {
            if let Err(err) = socket.send(Message::Text(text)) {
                reporter.report(SessionEvent::Error(err.to_string()));
                break 'stream format!("write failed: {err}");
            }
        }

        let payload = match socket.read() {
            Ok(Message::Text(text)) => Payload::Text(text),
            Ok(Message::Binary(bytes)) => Payload::Binary(bytes),
            Ok(Message::Close(frame)) => {
                break 'stream frame
                    .map(|f| format!("server closed ({}): {}", f.code, f.reason))
                    .unwrap_or_else(|| "server closed".to_string());
            }
            Ok(_) => continue,
            Err(tungstenite::Error::Io(err))
                if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
            {
                continue;
            }
            Err(err) => {
                reporter.report(SessionEvent::Error(err.to_string()));
                break 'stream format!("read failed: {err}");
            }
        };
        if !reporter.report(SessionEvent::Message(payload)) {
            let _ = socket.close(None);
            let _ = socket.flush();
            return;
        }
    };

    reporter.report(SessionEvent::Closed(reason));
}

fn set_read_timeout(socket: &mut WebSocket<MaybeTlsStream<TcpStream>>) {
    let tcp = match socket.get_mut() {
        MaybeTlsStream::Plain(stream) => stream,
        MaybeTlsStream::Rustls(stream) => stream.get_mut(),
        _ => {
            warn!("Read timeout unsupported on this stream; writes wait for the next message");
            return;
        }
    };
    if let Err(err) = tcp.set_read_timeout(Some(READ_POLL)) {
        warn!("Could not set socket read timeout: {err}");
    }
}
