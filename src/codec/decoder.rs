//! Packet to chunk decoding with length validation

use crate::codec::{Chunk, ChunkShape, WireSample};
use crate::error::CodecError;

/// Unpacks packets of a fixed shape into caller-owned buffers
pub struct PacketDecoder<T> {
    shape: ChunkShape,
    /// Packets decoded
    packets_decoded: u64,
    /// Packets rejected for having the wrong length
    packets_rejected: u64,
    _sample: std::marker::PhantomData<T>,
}

impl<T: WireSample> PacketDecoder<T> {
    pub fn new(shape: ChunkShape) -> Self {
        Self {
            shape,
            packets_decoded: 0,
            packets_rejected: 0,
            _sample: std::marker::PhantomData,
        }
    }

    pub fn payload_len(&self) -> usize {
        self.shape.payload_len(T::WIDTH)
    }

    /// Decode `payload` into `out`, which must hold one chunk.
    ///
    /// A payload of any other length than one chunk is rejected and `out` is
    /// left untouched.
    pub fn unpack_into(&mut self, payload: &[u8], out: &mut [T]) -> Result<(), CodecError> {
        debug_assert_eq!(out.len(), self.shape.samples());

        let expected = self.payload_len();
        if payload.len() != expected {
            self.packets_rejected += 1;
            return Err(CodecError::MalformedPacket {
                expected,
                actual: payload.len(),
            });
        }

        let mut cursor = payload;
        for sample in out.iter_mut() {
            *sample = T::get_le(&mut cursor);
        }
        self.packets_decoded += 1;
        Ok(())
    }

    pub fn shape(&self) -> ChunkShape {
        self.shape
    }

    /// Get statistics
    pub fn stats(&self) -> DecoderStats {
        DecoderStats {
            packets_decoded: self.packets_decoded,
            packets_rejected: self.packets_rejected,
        }
    }
}

/// Decoder statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderStats {
    pub packets_decoded: u64,
    pub packets_rejected: u64,
}

/// Decode a packet into a new chunk of `frames` x `channels`
pub fn unpack<T: WireSample>(
    payload: &[u8],
    frames: usize,
    channels: usize,
) -> Result<Chunk<T>, CodecError> {
    let shape = ChunkShape::new(frames, channels);
    let mut chunk = Chunk::silence(shape);
    PacketDecoder::new(shape).unpack_into(payload, chunk.samples_mut())?;
    Ok(chunk)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{pack, PacketEncoder};
    use proptest::prelude::*;

    #[test]
    fn test_unpack_little_endian() {
        let chunk = unpack::<i16>(&[1, 0, 2, 0, 0xff, 0xff, 0, 0x80], 4, 1).unwrap();
        assert_eq!(chunk.samples(), &[1, 2, -1, i16::MIN]);
    }

    #[test]
    fn test_short_payload_rejected() {
        // 6 bytes where 4 frames x 1 channel x 2 bytes = 8 are expected
        let err = unpack::<i16>(&[0; 6], 4, 1).unwrap_err();
        assert_eq!(err, CodecError::MalformedPacket { expected: 8, actual: 6 });
    }

    #[test]
    fn test_rejection_leaves_output_untouched() {
        let mut decoder = PacketDecoder::<i16>::new(ChunkShape::new(2, 1));
        let mut out = [5i16, 6];
        assert!(decoder.unpack_into(&[0; 10], &mut out).is_err());
        assert!(decoder.unpack_into(&[], &mut out).is_err());
        assert_eq!(out, [5, 6]);

        decoder.unpack_into(&[9, 0, 8, 0], &mut out).unwrap();
        assert_eq!(out, [9, 8]);

        let stats = decoder.stats();
        assert_eq!(stats.packets_decoded, 1);
        assert_eq!(stats.packets_rejected, 2);
    }

    #[test]
    fn test_float_samples_survive() {
        let shape = ChunkShape::new(3, 1);
        let mut encoder = PacketEncoder::<f32>::new(shape);
        let packet = encoder.pack(&[0.5, -1.0, f32::MIN_POSITIVE]);
        let chunk = unpack::<f32>(&packet, 3, 1).unwrap();
        assert_eq!(chunk.samples(), &[0.5, -1.0, f32::MIN_POSITIVE]);
    }

    proptest! {
        #[test]
        fn prop_pack_unpack_identity(
            (frames, channels, samples) in (1usize..64, 1usize..8).prop_flat_map(|(f, c)| {
                (Just(f), Just(c), proptest::collection::vec(any::<i16>(), f * c))
            })
        ) {
            let chunk = Chunk::from_samples(ChunkShape::new(frames, channels), samples).unwrap();
            let packet = pack(&chunk);
            prop_assert_eq!(packet.len(), frames * channels * 2);
            let decoded = unpack::<i16>(&packet, frames, channels).unwrap();
            prop_assert_eq!(decoded, chunk);
        }

        #[test]
        fn prop_wrong_length_always_rejected(
            frames in 1usize..32,
            channels in 1usize..4,
            len in 0usize..512,
        ) {
            let expected = frames * channels * 4;
            prop_assume!(len != expected);
            let result = unpack::<i32>(&vec![0u8; len], frames, channels);
            prop_assert_eq!(
                result.unwrap_err(),
                CodecError::MalformedPacket { expected, actual: len }
            );
        }
    }
}
