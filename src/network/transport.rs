//! Datagram transport seen by the bridge
//!
//! Both operations return immediately. `send` is fire-and-forget towards
//! the one configured peer; `try_receive` hands back at most one waiting
//! datagram, or `Reception::WouldBlock` when the socket is empty.

use std::io;
use std::net::{Ipv6Addr, SocketAddr, UdpSocket};

use crate::codec::Packet;
use crate::constants::MAX_PAYLOAD_BYTES;
use crate::error::NetworkError;
use crate::network::udp::{create_socket, listening_endpoint, resolve_peer};

/// Outcome of a non-blocking receive
#[derive(Debug, PartialEq, Eq)]
pub enum Reception<'a> {
    /// One datagram, borrowed until the next receive
    Payload(&'a [u8]),
    /// Nothing waiting right now. The normal state, not an error.
    WouldBlock,
}

/// Non-blocking point-to-point datagram transport
pub trait Transport: Send {
    /// Send one packet to the peer. Returns the number of bytes sent.
    fn send(&mut self, packet: Packet) -> Result<usize, NetworkError>;

    /// Take one waiting datagram, if any.
    fn try_receive(&mut self) -> Result<Reception<'_>, NetworkError>;
}

impl<X: Transport + ?Sized> Transport for Box<X> {
    fn send(&mut self, packet: Packet) -> Result<usize, NetworkError> {
        (**self).send(packet)
    }

    fn try_receive(&mut self) -> Result<Reception<'_>, NetworkError> {
        (**self).try_receive()
    }
}

/// Plain UDP transport: one socket listening on `0.0.0.0:<port>`, one
/// socket sending to the peer.
pub struct UdpTransport {
    sending: UdpSocket,
    receiving: UdpSocket,
    local: SocketAddr,
    peer: SocketAddr,
    /// Receive buffer (reused to avoid allocations). One byte longer than
    /// the largest valid payload so a truncated oversized datagram never
    /// reports a valid length.
    recv_buffer: Box<[u8]>,
}

impl UdpTransport {
    /// Bind the listening port and resolve the peer.
    ///
    /// Fails with `NetworkError::BindFailed` when the port is taken.
    pub fn open(local_port: u16, peer_address: &str, peer_port: u16) -> Result<Self, NetworkError> {
        let peer = resolve_peer(peer_address, peer_port)?;
        Self::bind(listening_endpoint(local_port), peer)
    }

    /// Like `open`, with explicit endpoints
    pub fn bind(local: SocketAddr, peer: SocketAddr) -> Result<Self, NetworkError> {
        let receiving = create_socket(local)?;
        let local = receiving.local_addr().map_err(NetworkError::Socket)?;

        let sending_addr = match peer {
            SocketAddr::V4(_) => listening_endpoint(0),
            SocketAddr::V6(_) => SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0)),
        };
        let sending = create_socket(sending_addr)?;

        tracing::info!("UDP transport listening on {}, sending to {}", local, peer);

        Ok(Self {
            sending,
            receiving,
            local,
            peer,
            recv_buffer: vec![0u8; MAX_PAYLOAD_BYTES + 1].into_boxed_slice(),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}

impl Transport for UdpTransport {
    fn send(&mut self, packet: Packet) -> Result<usize, NetworkError> {
        if packet.len() > MAX_PAYLOAD_BYTES {
            return Err(NetworkError::PacketTooLarge(packet.len()));
        }
        self.sending
            .send_to(&packet, self.peer)
            .map_err(NetworkError::SendFailed)
    }

    fn try_receive(&mut self) -> Result<Reception<'_>, NetworkError> {
        match self.receiving.recv_from(&mut self.recv_buffer) {
            Ok((len, _sender)) => Ok(Reception::Payload(&self.recv_buffer[..len])),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(Reception::WouldBlock),
            Err(e) => Err(NetworkError::ReceiveFailed(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use std::time::{Duration, Instant};

    /// Poll until a datagram shows up; loopback delivery is fast but not
    /// synchronous with `send_to`.
    fn receive_within(transport: &mut UdpTransport, timeout: Duration) -> Option<Vec<u8>> {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Reception::Payload(bytes) = transport.try_receive().unwrap() {
                return Some(bytes.to_vec());
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        None
    }

    fn pair() -> (UdpTransport, UdpTransport) {
        let any: SocketAddr = "127.0.0.1:0".parse().unwrap();
        // Reserve a port for A so B can be pointed at it
        let a_probe = create_socket(any).unwrap();
        let a_addr = a_probe.local_addr().unwrap();
        drop(a_probe);

        let b = UdpTransport::bind(any, a_addr).unwrap();
        let a = UdpTransport::bind(a_addr, b.local_addr()).unwrap();
        (a, b)
    }

    #[test]
    fn test_empty_socket_would_block() {
        let mut transport = UdpTransport::bind(
            "127.0.0.1:0".parse().unwrap(),
            "127.0.0.1:9".parse().unwrap(),
        )
        .unwrap();
        assert_eq!(transport.try_receive().unwrap(), Reception::WouldBlock);
        assert_eq!(transport.try_receive().unwrap(), Reception::WouldBlock);
    }

    #[test]
    fn test_send_without_listener_succeeds() {
        let mut transport = UdpTransport::bind(
            "127.0.0.1:0".parse().unwrap(),
            "127.0.0.1:9".parse().unwrap(),
        )
        .unwrap();
        let sent = transport.send(Packet::from(Bytes::from_static(&[1, 0, 2, 0]))).unwrap();
        assert_eq!(sent, 4);
    }

    #[test]
    fn test_datagrams_cross_between_peers() {
        let (mut a, mut b) = pair();

        a.send(Packet::from(Bytes::from_static(&[1, 0, 2, 0, 3, 0, 4, 0]))).unwrap();
        let got = receive_within(&mut b, Duration::from_secs(2)).expect("datagram lost on loopback");
        assert_eq!(got, vec![1, 0, 2, 0, 3, 0, 4, 0]);

        b.send(Packet::from(Bytes::from_static(&[9, 9]))).unwrap();
        let got = receive_within(&mut a, Duration::from_secs(2)).expect("datagram lost on loopback");
        assert_eq!(got, vec![9, 9]);
    }

    #[test]
    fn test_oversized_packet_refused() {
        let mut transport = UdpTransport::bind(
            "127.0.0.1:0".parse().unwrap(),
            "127.0.0.1:9".parse().unwrap(),
        )
        .unwrap();
        let packet = Packet::from(Bytes::from(vec![0u8; MAX_PAYLOAD_BYTES + 1]));
        assert!(matches!(
            transport.send(packet),
            Err(NetworkError::PacketTooLarge(len)) if len == MAX_PAYLOAD_BYTES + 1
        ));
    }

    #[test]
    fn test_open_fails_when_port_taken() {
        let holder = create_socket(listening_endpoint(0)).unwrap();
        let port = holder.local_addr().unwrap().port();
        assert!(matches!(
            UdpTransport::open(port, "localhost", port),
            Err(NetworkError::BindFailed { .. })
        ));
    }

    #[test]
    fn test_oversized_datagram_reports_invalid_length() {
        let mut transport = UdpTransport::bind(
            "127.0.0.1:0".parse().unwrap(),
            "127.0.0.1:9".parse().unwrap(),
        )
        .unwrap();
        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
        sender.send_to(&vec![1u8; 40000], transport.local_addr()).unwrap();

        let got = receive_within(&mut transport, Duration::from_secs(2)).expect("datagram lost on loopback");
        // truncated, but never to a length a full-size chunk could have
        assert_eq!(got.len(), MAX_PAYLOAD_BYTES + 1);
    }
}
