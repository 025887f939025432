//! Network subsystem for UDP audio transport

pub mod memory;
pub mod metered;
pub mod transport;
pub mod udp;

pub use memory::MemoryTransport;
pub use metered::MeteredTransport;
pub use transport::{Reception, Transport, UdpTransport};
pub use udp::{create_socket, resolve_peer};
