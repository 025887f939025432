//! Counting transport decorator
//!
//! Wraps any transport and tallies every packet that goes out or comes in.
//! Chosen at construction time when telemetry is on; the bridge does not
//! know which variant it holds.

use std::sync::Arc;

use crate::codec::Packet;
use crate::error::NetworkError;
use crate::network::transport::{Reception, Transport};
use crate::telemetry::Counters;

pub struct MeteredTransport<X> {
    inner: X,
    counters: Arc<Counters>,
}

impl<X: Transport> MeteredTransport<X> {
    pub fn new(inner: X, counters: Arc<Counters>) -> Self {
        Self { inner, counters }
    }

    pub fn counters(&self) -> &Arc<Counters> {
        &self.counters
    }

    pub fn inner(&self) -> &X {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut X {
        &mut self.inner
    }

    pub fn into_inner(self) -> X {
        self.inner
    }
}

impl<X: Transport> Transport for MeteredTransport<X> {
    fn send(&mut self, packet: Packet) -> Result<usize, NetworkError> {
        let len = packet.len();
        match self.inner.send(packet) {
            Ok(sent) => {
                self.counters.record_sent(len);
                Ok(sent)
            }
            Err(e) => {
                self.counters.record_send_failure();
                Err(e)
            }
        }
    }

    fn try_receive(&mut self) -> Result<Reception<'_>, NetworkError> {
        let reception = self.inner.try_receive();
        match &reception {
            Ok(Reception::Payload(bytes)) => self.counters.record_received(bytes.len()),
            Ok(Reception::WouldBlock) => {}
            Err(_) => self.counters.record_receive_failure(),
        }
        reception
    }
}
