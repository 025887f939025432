//! In-process transport
//!
//! Holds datagrams in a bounded queue instead of a socket. With `loopback`
//! every sent packet comes back on the next receive, which is what the
//! default `localhost:4444 -> 4444` configuration does over UDP. Used by the
//! tests and the benchmark to drive the bridge without a network.

use std::collections::VecDeque;
use std::io;

use bytes::Bytes;

use crate::codec::Packet;
use crate::error::NetworkError;
use crate::network::transport::{Reception, Transport};

/// Queue depth, standing in for a socket receive buffer. Also caps the
/// log of sent packets.
const QUEUE_LIMIT: usize = 64;

#[derive(Debug, Default)]
pub struct MemoryTransport {
    inbox: VecDeque<Bytes>,
    /// Datagram handed out by the last receive
    current: Bytes,
    loopback: bool,
    fail_sends: bool,
    fail_receives: bool,
    sent: Vec<Bytes>,
}

impl MemoryTransport {
    /// Sends are recorded, nothing comes back unless injected
    pub fn new() -> Self {
        Self::default()
    }

    /// Sent packets are delivered to our own inbox
    pub fn loopback() -> Self {
        Self {
            loopback: true,
            ..Self::default()
        }
    }

    /// Queue an inbound datagram as if the peer had sent it
    pub fn inject(&mut self, payload: impl Into<Bytes>) {
        Self::enqueue(&mut self.inbox, payload.into());
    }

    /// Make every following send fail like an exhausted socket buffer
    pub fn fail_sends(&mut self, fail: bool) {
        self.fail_sends = fail;
    }

    /// Make every following receive fail like a socket error
    pub fn fail_receives(&mut self, fail: bool) {
        self.fail_receives = fail;
    }

    /// The first `QUEUE_LIMIT` packets sent, oldest first. Not recorded in
    /// loopback mode.
    pub fn sent(&self) -> &[Bytes] {
        &self.sent
    }

    pub fn pending(&self) -> usize {
        self.inbox.len()
    }

    fn enqueue(inbox: &mut VecDeque<Bytes>, payload: Bytes) {
        if inbox.len() == QUEUE_LIMIT {
            // A full socket buffer drops the newest datagram
            return;
        }
        inbox.push_back(payload);
    }
}

impl Transport for MemoryTransport {
    fn send(&mut self, packet: Packet) -> Result<usize, NetworkError> {
        if self.fail_sends {
            return Err(NetworkError::SendFailed(io::Error::from(io::ErrorKind::WouldBlock)));
        }
        let len = packet.len();
        let bytes = packet.into_bytes();
        if self.loopback {
            Self::enqueue(&mut self.inbox, bytes);
        } else if self.sent.len() < QUEUE_LIMIT {
            self.sent.push(bytes);
        }
        Ok(len)
    }

    fn try_receive(&mut self) -> Result<Reception<'_>, NetworkError> {
        if self.fail_receives {
            return Err(NetworkError::ReceiveFailed(io::Error::from(
                io::ErrorKind::ConnectionRefused,
            )));
        }
        match self.inbox.pop_front() {
            Some(payload) => {
                self.current = payload;
                Ok(Reception::Payload(&self.current))
            }
            None => Ok(Reception::WouldBlock),
        }
    }
}
