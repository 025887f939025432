//! Fixed-shape blocks of interleaved samples

use crate::codec::WireSample;
use crate::error::CodecError;

/// Dimensions of every chunk in a run: `frames` rows of `channels` samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkShape {
    pub frames: usize,
    pub channels: usize,
}

impl ChunkShape {
    pub const fn new(frames: usize, channels: usize) -> Self {
        Self { frames, channels }
    }

    /// Total interleaved samples
    pub const fn samples(&self) -> usize {
        self.frames * self.channels
    }

    /// Bytes of a packet carrying one chunk at `width` bytes per sample
    pub const fn payload_len(&self, width: usize) -> usize {
        self.samples() * width
    }
}

/// An owned chunk of interleaved samples. The sample count always equals
/// `shape.samples()`.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk<T> {
    shape: ChunkShape,
    samples: Vec<T>,
}

impl<T: WireSample> Chunk<T> {
    /// All-zero chunk
    pub fn silence(shape: ChunkShape) -> Self {
        Self {
            shape,
            samples: vec![T::SILENCE; shape.samples()],
        }
    }

    pub fn from_samples(shape: ChunkShape, samples: Vec<T>) -> Result<Self, CodecError> {
        if samples.len() != shape.samples() {
            return Err(CodecError::InvalidShape {
                expected: shape.samples(),
                actual: samples.len(),
            });
        }
        Ok(Self { shape, samples })
    }

    pub fn shape(&self) -> ChunkShape {
        self.shape
    }

    pub fn samples(&self) -> &[T] {
        &self.samples
    }

    pub fn samples_mut(&mut self) -> &mut [T] {
        &mut self.samples
    }

    /// One row: the samples of every channel at frame `index`
    pub fn frame(&self, index: usize) -> Option<&[T]> {
        self.samples.chunks_exact(self.shape.channels).nth(index)
    }

    pub fn is_silent(&self) -> bool {
        self.samples.iter().all(|s| *s == T::SILENCE)
    }

    pub fn into_samples(self) -> Vec<T> {
        self.samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silence_has_exact_shape() {
        let shape = ChunkShape::new(4, 1);
        let chunk = Chunk::<i16>::silence(shape);
        assert_eq!(chunk.samples(), &[0, 0, 0, 0]);
        assert!(chunk.is_silent());
        assert_eq!(shape.payload_len(i16::WIDTH), 8);
    }

    #[test]
    fn test_shape_enforced() {
        let shape = ChunkShape::new(2, 2);
        let err = Chunk::from_samples(shape, vec![1i16, 2, 3]).unwrap_err();
        assert_eq!(err, CodecError::InvalidShape { expected: 4, actual: 3 });
    }

    #[test]
    fn test_frame_rows() {
        let chunk = Chunk::from_samples(ChunkShape::new(3, 2), vec![1i32, -1, 2, -2, 3, -3]).unwrap();
        assert_eq!(chunk.frame(1), Some(&[2, -2][..]));
        assert_eq!(chunk.frame(3), None);
        assert!(!chunk.is_silent());
    }
}
