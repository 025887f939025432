//! # LAN Intercom
//!
//! Low-latency point-to-point duplex audio over UDP.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                               THIS HOST                              │
//! │                                                                      │
//! │  ┌────────────┐  input callback   ┌──────────────────────────────┐   │
//! │  │ Input Dev  │ ────────────────▶ │ SampleQueue (audio::buffer)  │   │
//! │  └────────────┘                   └──────────────┬───────────────┘   │
//! │                                                  │ one chunk         │
//! │                                                  ▼                   │
//! │  ┌────────────┐  output callback  ┌──────────────────────────────┐   │
//! │  │ Output Dev │ ◀──────────────── │ PlaybackPump (audio::stream) │   │
//! │  └────────────┘                   │   Bridge::process (bridge)   │   │
//! │                                   │   pack ─▶ send               │   │
//! │                                   │   try_receive ─▶ unpack      │   │
//! │                                   │      or silence              │   │
//! │                                   └───────┬──────────────▲───────┘   │
//! │                                           │              │           │
//! │  ┌──────────────────────┐  Counters  ┌────▼──────────────┴───────┐   │
//! │  │ Telemetry (tokio)    │ ◀───────── │ Transport (network)       │   │
//! │  │ one line per second  │            │ send socket / recv socket │   │
//! │  └──────────────────────┘            └────┬──────────────▲───────┘   │
//! └───────────────────────────────────────────┼──────────────┼───────────┘
//!                                             │ raw samples  │ UDP over LAN
//!                                             ▼              │
//!                                          ┌─────────────────┴──┐
//!                                          │     PEER HOST      │
//!                                          └────────────────────┘
//! ```
//!
//! Every datagram is exactly one chunk of interleaved little-endian samples
//! with no header. A missing or malformed datagram plays as silence.

pub mod audio;
pub mod bridge;
pub mod codec;
pub mod config;
pub mod error;
pub mod intercom;
pub mod network;
pub mod telemetry;

pub use error::{Error, Result};

/// Application-wide constants
pub mod constants {
    /// Default sample rate in frames per second
    pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

    /// Default channel count (stereo)
    pub const DEFAULT_CHANNELS: u16 = 2;

    /// Default frames per chunk, i.e. per datagram
    pub const DEFAULT_FRAMES_PER_CHUNK: u32 = 1024;

    /// Default local UDP port
    pub const DEFAULT_LISTENING_PORT: u16 = 4444;

    /// Default peer host
    pub const DEFAULT_DESTINATION_ADDRESS: &str = "localhost";

    /// Default peer UDP port
    pub const DEFAULT_DESTINATION_PORT: u16 = 4444;

    /// Largest datagram payload the transport accepts
    pub const MAX_PAYLOAD_BYTES: usize = 32768;

    /// Default telemetry reporting interval
    pub const DEFAULT_TELEMETRY_INTERVAL_MS: u64 = 1000;

    /// Capture queue capacity, in chunks
    pub const CAPTURE_QUEUE_CHUNKS: usize = 4;

    /// Requested kernel socket buffer size
    pub const SOCKET_BUFFER_BYTES: usize = 256 * 1024;
}
