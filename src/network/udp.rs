//! UDP socket construction
//!
//! Sockets are built with socket2 so buffer sizes and blocking mode are set
//! before the first datagram moves, then handed over as std sockets.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, ToSocketAddrs, UdpSocket};

use socket2::{Domain, Protocol, Socket, Type};

use crate::constants::SOCKET_BUFFER_BYTES;
use crate::error::NetworkError;

/// Create a non-blocking UDP socket bound to `addr`.
///
/// Address reuse is left off so that a port already in use fails here.
pub fn create_socket(addr: SocketAddr) -> Result<UdpSocket, NetworkError> {
    let domain = match addr {
        SocketAddr::V4(_) => Domain::IPV4,
        SocketAddr::V6(_) => Domain::IPV6,
    };
    let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP)).map_err(NetworkError::Socket)?;

    // Buffer sizing is advisory; the kernel may clamp it
    if let Err(e) = socket.set_recv_buffer_size(SOCKET_BUFFER_BYTES) {
        tracing::debug!("Could not set receive buffer size: {}", e);
    }
    if let Err(e) = socket.set_send_buffer_size(SOCKET_BUFFER_BYTES) {
        tracing::debug!("Could not set send buffer size: {}", e);
    }

    socket.set_nonblocking(true).map_err(NetworkError::Socket)?;
    socket
        .bind(&addr.into())
        .map_err(|source| NetworkError::BindFailed { addr, source })?;

    Ok(socket.into())
}

/// The listening endpoint for `port` on every IPv4 interface
pub fn listening_endpoint(port: u16) -> SocketAddr {
    SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port))
}

/// Resolve `host:port` once, preferring IPv4 to match the listening socket.
pub fn resolve_peer(host: &str, port: u16) -> Result<SocketAddr, NetworkError> {
    let candidates: Vec<SocketAddr> = (host, port)
        .to_socket_addrs()
        .map_err(|e| NetworkError::AddressResolution(format!("{}:{} ({})", host, port, e)))?
        .collect();

    candidates
        .iter()
        .find(|addr| addr.is_ipv4())
        .or_else(|| candidates.first())
        .copied()
        .ok_or_else(|| NetworkError::AddressResolution(format!("{}:{}", host, port)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_ephemeral_port() {
        let socket = create_socket("127.0.0.1:0".parse().unwrap()).unwrap();
        let local = socket.local_addr().unwrap();
        assert_ne!(local.port(), 0);
    }

    #[test]
    fn test_port_in_use_is_bind_error() {
        let first = create_socket("127.0.0.1:0".parse().unwrap()).unwrap();
        let taken = first.local_addr().unwrap();

        match create_socket(taken) {
            Err(NetworkError::BindFailed { addr, .. }) => assert_eq!(addr, taken),
            other => panic!("expected bind failure, got {:?}", other.map(|s| s.local_addr())),
        }
    }

    #[test]
    fn test_socket_is_non_blocking() {
        let socket = create_socket("127.0.0.1:0".parse().unwrap()).unwrap();
        let mut buf = [0u8; 16];
        let err = socket.recv_from(&mut buf).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::WouldBlock);
    }

    #[test]
    fn test_resolve_localhost_prefers_ipv4() {
        let addr = resolve_peer("localhost", 4444).unwrap();
        assert_eq!(addr.port(), 4444);
        assert!(addr.ip().is_loopback());
    }

    #[test]
    fn test_resolve_literal() {
        let addr = resolve_peer("192.168.1.20", 5000).unwrap();
        assert_eq!(addr, "192.168.1.20:5000".parse().unwrap());
    }
}
