//! Per-chunk audio bridge
//!
//! [`Bridge::process`] is the body of the real-time callback. Each call:
//!
//! 1. packs the captured chunk and sends it to the peer (best effort),
//! 2. tries to take one datagram from the peer without blocking,
//! 3. writes the decoded datagram to the playback chunk, or silence when
//!    nothing usable arrived.
//!
//! Nothing in here blocks, allocates in steady state, or takes a lock.
//! Network trouble and malformed input never leave this function as
//! errors; the only error is a broken chunk-shape invariant, which the
//! caller must treat as fatal for the stream.

use std::sync::Arc;

use crate::codec::{ChunkShape, PacketDecoder, PacketEncoder, WireSample};
use crate::error::BridgeError;
use crate::network::{Reception, Transport};
use crate::telemetry::Counters;

/// What happened to the playback side during one invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inbound {
    /// A well-formed datagram was decoded into the playback chunk
    Decoded,
    /// Nothing waiting; silence played
    Nothing,
    /// Datagram of the wrong length; silence played
    Malformed,
    /// Socket error on receive; silence played
    Failed,
}

/// Result of one invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Exchange {
    /// Whether the captured chunk left the host
    pub sent: bool,
    pub inbound: Inbound,
}

impl Exchange {
    pub fn played_silence(&self) -> bool {
        self.inbound != Inbound::Decoded
    }
}

pub struct Bridge<T, X = Box<dyn Transport>> {
    shape: ChunkShape,
    encoder: PacketEncoder<T>,
    decoder: PacketDecoder<T>,
    transport: X,
    /// Diagnostics sink when telemetry is on
    counters: Option<Arc<Counters>>,
    // Streak flags so the callback logs transitions, not every chunk
    send_failing: bool,
    receive_failing: bool,
    malformed_streak: bool,
}

impl<T: WireSample, X: Transport> Bridge<T, X> {
    pub fn new(shape: ChunkShape, transport: X) -> Self {
        Self {
            shape,
            encoder: PacketEncoder::new(shape),
            decoder: PacketDecoder::new(shape),
            transport,
            counters: None,
            send_failing: false,
            receive_failing: false,
            malformed_streak: false,
        }
    }

    /// Count malformed datagrams into `counters`
    pub fn with_counters(mut self, counters: Arc<Counters>) -> Self {
        self.counters = Some(counters);
        self
    }

    pub fn shape(&self) -> ChunkShape {
        self.shape
    }

    pub fn transport(&self) -> &X {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut X {
        &mut self.transport
    }

    /// Whether the last receive attempt hit a socket error
    pub fn is_receive_failing(&self) -> bool {
        self.receive_failing
    }

    /// Run one chunk period: send `capture`, fill `playback`.
    ///
    /// Both slices must hold exactly one chunk of interleaved samples.
    /// `playback` is always fully written when this returns `Ok`.
    pub fn process(&mut self, capture: &[T], playback: &mut [T]) -> Result<Exchange, BridgeError> {
        let expected = self.shape.samples();
        if capture.len() != expected || playback.len() != expected {
            return Err(BridgeError::ShapeMismatch {
                expected,
                capture: capture.len(),
                playback: playback.len(),
            });
        }

        let packet = self.encoder.pack(capture);
        let sent = match self.transport.send(packet) {
            Ok(_) => {
                if self.send_failing {
                    self.send_failing = false;
                    tracing::info!("Sending to peer recovered");
                }
                true
            }
            Err(e) => {
                if !self.send_failing {
                    self.send_failing = true;
                    tracing::warn!("Dropping outgoing chunks: {}", e);
                }
                false
            }
        };

        let inbound = match self.transport.try_receive() {
            Ok(Reception::Payload(payload)) => match self.decoder.unpack_into(payload, playback) {
                Ok(()) => {
                    self.malformed_streak = false;
                    Inbound::Decoded
                }
                Err(e) => {
                    if !self.malformed_streak {
                        self.malformed_streak = true;
                        tracing::warn!("Ignoring malformed datagram: {}", e);
                    }
                    if let Some(counters) = &self.counters {
                        counters.record_malformed();
                    }
                    Inbound::Malformed
                }
            },
            Ok(Reception::WouldBlock) => Inbound::Nothing,
            Err(e) => {
                if !self.receive_failing {
                    tracing::warn!("Receive failed: {}", e);
                }
                self.receive_failing = true;
                Inbound::Failed
            }
        };

        if inbound != Inbound::Failed && self.receive_failing {
            self.receive_failing = false;
            tracing::info!("Receiving from peer recovered");
        }
        if inbound != Inbound::Decoded {
            playback.fill(T::SILENCE);
        }

        Ok(Exchange { sent, inbound })
    }
}
