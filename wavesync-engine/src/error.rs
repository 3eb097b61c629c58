//! Error types for the engine.

use std::path::PathBuf;
use thiserror::Error;

/// An inbound message that could not be turned into a [`ServerMessage`].
///
/// These are never fatal: the offending message is logged and dropped.
///
/// [`ServerMessage`]: wavesync_messages::ServerMessage
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Binary frame carried the gzip magic but did not inflate
    #[error("failed to decompress message: {0}")]
    Decompress(#[source] std::io::Error),

    /// Not valid JSON, or an unknown message type
    #[error("malformed message: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failures of the network transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The configured server address is unusable
    #[error("invalid server url '{url}': {reason}")]
    InvalidUrl {
        /// The address as configured.
        url: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A command was sent while no stream is open
    #[error("stream is not open")]
    NotOpen,

    /// The command could not be serialized
    #[error("failed to encode command: {0}")]
    Encode(#[from] serde_json::Error),

    /// The HTTP client could not be built
    #[error("failed to build http client: {0}")]
    Http(#[from] reqwest::Error),
}

/// Errors loading an [`EngineConfig`](crate::EngineConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a file
    #[error("failed to read config '{path}': {source}")]
    ReadFile {
        /// Path of the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range
    #[error("invalid value for '{field}': {reason}")]
    Invalid {
        /// Dotted path of the offending field.
        field: &'static str,
        /// Why it was rejected.
        reason: &'static str,
    },
}
