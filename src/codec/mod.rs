//! Raw PCM packet codec
//!
//! A packet is the little-endian byte image of one chunk: no header, no
//! sequence number, no checksum. Packing is a reinterpretation; unpacking
//! additionally checks that the datagram is exactly one chunk long.

pub mod chunk;
pub mod decoder;
pub mod encoder;
pub mod sample;

pub use chunk::{Chunk, ChunkShape};
pub use decoder::{unpack, PacketDecoder};
pub use encoder::{pack, Packet, PacketEncoder};
pub use sample::WireSample;
