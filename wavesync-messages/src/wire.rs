//! JSON messages exchanged with the receiver.

use serde::{Deserialize, Deserializer, Serialize};

use crate::{Hertz, ViewState};

/// Messages pushed by the server over the spectrum stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Authoritative view echo.
    Config(ConfigEcho),
    Spectrum(SpectrumPayload),
    Error(ServerError),
    Pong,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigEcho {
    pub center_freq: f64,
    pub bin_count: usize,
    pub bin_bandwidth: f64,
    #[serde(default)]
    pub total_bandwidth: f64,
}

impl ConfigEcho {
    pub fn view(&self) -> ViewState {
        ViewState::new(self.center_freq, self.bin_count, self.bin_bandwidth)
    }
}

/// One frame as it arrives, still in raw FFT bin order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectrumPayload {
    /// `null` entries (the server's encoding of -inf) become NaN.
    #[serde(deserialize_with = "nullable_bins")]
    pub data: Vec<f32>,
    pub timestamp: f64,
    #[serde(default)]
    pub frequency: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerError {
    #[serde(default)]
    pub status: u16,
    #[serde(default)]
    pub error: String,
}

impl ServerError {
    pub const TOO_MANY_REQUESTS: u16 = 429;

    /// Rate limiting is reported but never ends the stream.
    pub fn is_rate_limit(&self) -> bool {
        self.status == Self::TOO_MANY_REQUESTS
    }
}

fn nullable_bins<'de, D>(deserializer: D) -> Result<Vec<f32>, D::Error>
where
    D: Deserializer<'de>,
{
    let bins = Vec::<Option<f32>>::deserialize(deserializer)?;
    Ok(bins.into_iter().map(|b| b.unwrap_or(f32::NAN)).collect())
}

/// Commands the client sends over the spectrum stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientCommand {
    /// Move the center only. Bandwidth is left out on purpose: sending it
    /// trips the server's "restore default zoom" safeguard.
    Pan { frequency: Hertz },
    Zoom {
        frequency: Hertz,
        #[serde(rename = "binBandwidth")]
        bin_bandwidth: f64,
    },
    Reset,
    /// Ask the server to re-emit its config.
    GetStatus,
    Ping,
    Subscribe { stream: String },
    Unsubscribe { stream: String },
}

/// Body of the pre-connection admission check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdmissionRequest {
    pub user_session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionResponse {
    pub allowed: bool,
    #[serde(default)]
    pub reason: String,
}

impl AdmissionResponse {
    /// Denials that no amount of retrying will fix.
    pub fn is_terminal_denial(&self) -> bool {
        if self.allowed {
            return false;
        }
        let reason = self.reason.to_ascii_lowercase();
        ["ban", "kick", "capacity", "full"]
            .iter()
            .any(|needle| reason.contains(needle))
    }
}
