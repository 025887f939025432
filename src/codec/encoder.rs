//! Chunk to packet encoding
//!
//! The encoder reuses one `BytesMut` for every packet. Once the previous
//! packet has been sent and dropped, `reserve` reclaims the same allocation,
//! so the steady state does not allocate.

use std::ops::Deref;

use bytes::{Bytes, BytesMut};

use crate::codec::{Chunk, ChunkShape, WireSample};

/// One chunk worth of little-endian samples. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet(Bytes);

impl Packet {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_bytes(self) -> Bytes {
        self.0
    }
}

impl Deref for Packet {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Bytes> for Packet {
    fn from(bytes: Bytes) -> Self {
        Self(bytes)
    }
}

/// Packs chunks of a fixed shape
pub struct PacketEncoder<T> {
    shape: ChunkShape,
    /// Encoding buffer (reused to avoid allocations)
    scratch: BytesMut,
    /// Packets built
    packets_encoded: u64,
    /// Total bytes produced
    bytes_produced: u64,
    _sample: std::marker::PhantomData<T>,
}

impl<T: WireSample> PacketEncoder<T> {
    pub fn new(shape: ChunkShape) -> Self {
        Self {
            shape,
            scratch: BytesMut::with_capacity(shape.payload_len(T::WIDTH)),
            packets_encoded: 0,
            bytes_produced: 0,
            _sample: std::marker::PhantomData,
        }
    }

    /// Packet size for this shape
    pub fn payload_len(&self) -> usize {
        self.shape.payload_len(T::WIDTH)
    }

    /// Encode one chunk's interleaved samples.
    ///
    /// `samples` must hold exactly one chunk; the bridge checks this before
    /// calling.
    pub fn pack(&mut self, samples: &[T]) -> Packet {
        debug_assert_eq!(samples.len(), self.shape.samples());

        self.scratch.reserve(self.payload_len());
        for &sample in samples {
            sample.put_le(&mut self.scratch);
        }
        let packet = Packet(self.scratch.split().freeze());

        self.packets_encoded += 1;
        self.bytes_produced += packet.len() as u64;
        packet
    }

    pub fn shape(&self) -> ChunkShape {
        self.shape
    }

    /// Get statistics
    pub fn stats(&self) -> EncoderStats {
        EncoderStats {
            packets_encoded: self.packets_encoded,
            bytes_produced: self.bytes_produced,
        }
    }
}

/// Encoder statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderStats {
    pub packets_encoded: u64,
    pub bytes_produced: u64,
}

/// Encode a single chunk without keeping an encoder around
pub fn pack<T: WireSample>(chunk: &Chunk<T>) -> Packet {
    let mut buf = BytesMut::with_capacity(chunk.shape().payload_len(T::WIDTH));
    for &sample in chunk.samples() {
        sample.put_le(&mut buf);
    }
    Packet(buf.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_is_little_endian() {
        let chunk = Chunk::from_samples(ChunkShape::new(4, 1), vec![1i16, 2, 3, 4]).unwrap();
        let packet = pack(&chunk);
        assert_eq!(&packet[..], &[1, 0, 2, 0, 3, 0, 4, 0]);
    }

    #[test]
    fn test_negative_and_wide_samples() {
        let chunk = Chunk::from_samples(ChunkShape::new(1, 2), vec![-1i32, 0x0102_0304]).unwrap();
        let packet = pack(&chunk);
        assert_eq!(&packet[..], &[0xff, 0xff, 0xff, 0xff, 4, 3, 2, 1]);
    }

    #[test]
    fn test_encoder_length_and_stats() {
        let shape = ChunkShape::new(1024, 2);
        let mut encoder = PacketEncoder::<i16>::new(shape);
        let samples = vec![7i16; shape.samples()];

        for _ in 0..3 {
            let packet = encoder.pack(&samples);
            assert_eq!(packet.len(), 4096);
        }
        let stats = encoder.stats();
        assert_eq!(stats.packets_encoded, 3);
        assert_eq!(stats.bytes_produced, 3 * 4096);
    }

    #[test]
    fn test_packets_stay_immutable_while_encoder_reuses_buffer() {
        let shape = ChunkShape::new(2, 1);
        let mut encoder = PacketEncoder::<i16>::new(shape);
        let first = encoder.pack(&[1, 1]);
        let second = encoder.pack(&[2, 2]);
        assert_eq!(&first[..], &[1, 0, 1, 0]);
        assert_eq!(&second[..], &[2, 0, 2, 0]);
    }
}
