//! Sample types that can travel on the wire

use bytes::{Buf, BufMut};

/// A sample type with a fixed-width little-endian wire representation.
///
/// Implemented for the encodings the intercom supports (`i16`, `i32`,
/// `f32`). The cpal bound lets the same type drive the device streams.
pub trait WireSample: cpal::SizedSample + Copy + Default + PartialEq + Send + Sync + 'static {
    /// Bytes per sample on the wire
    const WIDTH: usize;

    /// The value played when nothing arrived
    const SILENCE: Self;

    fn put_le<B: BufMut>(self, buf: &mut B);

    /// Read one sample. The caller guarantees `WIDTH` bytes remain.
    fn get_le<B: Buf>(buf: &mut B) -> Self;
}

impl WireSample for i16 {
    const WIDTH: usize = 2;
    const SILENCE: Self = 0;

    fn put_le<B: BufMut>(self, buf: &mut B) {
        buf.put_i16_le(self);
    }

    fn get_le<B: Buf>(buf: &mut B) -> Self {
        buf.get_i16_le()
    }
}

impl WireSample for i32 {
    const WIDTH: usize = 4;
    const SILENCE: Self = 0;

    fn put_le<B: BufMut>(self, buf: &mut B) {
        buf.put_i32_le(self);
    }

    fn get_le<B: Buf>(buf: &mut B) -> Self {
        buf.get_i32_le()
    }
}

impl WireSample for f32 {
    const WIDTH: usize = 4;
    const SILENCE: Self = 0.0;

    fn put_le<B: BufMut>(self, buf: &mut B) {
        buf.put_f32_le(self);
    }

    fn get_le<B: Buf>(buf: &mut B) -> Self {
        buf.get_f32_le()
    }
}
