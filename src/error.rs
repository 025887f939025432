//! Error types for the intercom

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum Error {
    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Audio subsystem errors
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Failed to open stream: {0}")]
    StreamError(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Audio thread terminated before the stream started")]
    ThreadExited,

    #[error("Audio callback fault: {0}")]
    Fault(#[from] BridgeError),
}

impl AudioError {
    /// Whether the running stream must be torn down
    pub fn is_fatal(&self) -> bool {
        !matches!(self, AudioError::StreamError(_))
    }
}

/// Packet codec errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Malformed packet: expected {expected} bytes, got {actual}")]
    MalformedPacket { expected: usize, actual: usize },

    #[error("Invalid chunk shape: expected {expected} samples, got {actual}")]
    InvalidShape { expected: usize, actual: usize },
}

/// Network errors
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Socket bind failed on {addr}: {source}")]
    BindFailed {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("Cannot resolve peer address {0}")]
    AddressResolution(String),

    #[error("Socket setup failed: {0}")]
    Socket(#[source] io::Error),

    #[error("Send failed: {0}")]
    SendFailed(#[source] io::Error),

    #[error("Receive failed: {0}")]
    ReceiveFailed(#[source] io::Error),

    #[error("Packet too large: {0} bytes")]
    PacketTooLarge(usize),
}

/// Broken invariants inside the real-time bridge. These are fatal for the
/// running stream.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    #[error("Chunk shape mismatch: expected {expected} samples, capture had {capture}, playback had {playback}")]
    ShapeMismatch {
        expected: usize,
        capture: usize,
        playback: usize,
    },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("Payload of {payload} bytes exceeds the {limit} byte datagram limit")]
    PayloadTooLarge { payload: usize, limit: usize },

    #[error("Cannot read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Cannot parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, Error>;
