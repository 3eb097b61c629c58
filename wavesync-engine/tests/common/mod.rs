#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use serde_json::json;
use wavesync_engine::{AudioClock, Payload, Transport, TransportError};
use wavesync_messages::{AdmissionRequest, ClientCommand};

/// Transport that records what the engine asked of it.
#[derive(Debug, Default)]
pub struct MockTransport {
    pub admissions: Vec<AdmissionRequest>,
    pub opens: usize,
    pub closes: usize,
    pub sent: Vec<ClientCommand>,
    /// Bumped on every admission check, open and close, like the real one.
    pub stream: u64,
}

impl Transport for MockTransport {
    fn check_admission(&mut self, request: AdmissionRequest) {
        self.admissions.push(request);
        self.stream += 1;
    }

    fn open(&mut self) {
        self.opens += 1;
        self.stream += 1;
    }

    fn send(&mut self, command: &ClientCommand) -> Result<(), TransportError> {
        self.sent.push(command.clone());
        Ok(())
    }

    fn close(&mut self) {
        self.closes += 1;
        self.stream += 1;
    }

    fn current_stream(&self) -> u64 {
        self.stream
    }
}

/// Clock the test moves by hand.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now_ms: Arc<Mutex<f64>>,
    buffered_ahead_ms: Arc<Mutex<f64>>,
}

impl ManualClock {
    pub fn set(&self, now_ms: f64) {
        *self.now_ms.lock().unwrap() = now_ms;
    }

    pub fn advance(&self, ms: f64) {
        *self.now_ms.lock().unwrap() += ms;
    }

    pub fn set_buffered_ahead(&self, ms: f64) {
        *self.buffered_ahead_ms.lock().unwrap() = ms;
    }
}

impl AudioClock for ManualClock {
    fn now_ms(&self) -> f64 {
        *self.now_ms.lock().unwrap()
    }

    fn buffered_ahead_ms(&self) -> f64 {
        *self.buffered_ahead_ms.lock().unwrap()
    }
}

pub fn config_message(center: f64, bin_count: usize, bin_bandwidth: f64) -> Payload {
    Payload::Text(
        json!({
            "type": "config",
            "centerFreq": center,
            "binCount": bin_count,
            "binBandwidth": bin_bandwidth,
            "totalBandwidth": bin_count as f64 * bin_bandwidth,
        })
        .to_string(),
    )
}

/// Spectrum message with `data` given in raw FFT order.
pub fn spectrum_message(data: &[f32], timestamp: f64) -> Payload {
    Payload::Text(
        json!({
            "type": "spectrum",
            "data": data,
            "timestamp": timestamp,
            "frequency": 15_000_000,
        })
        .to_string(),
    )
}
