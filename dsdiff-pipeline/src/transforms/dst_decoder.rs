//! The DST decode boundary. Decoding DST frames back to raw DSD bits is out of scope
//! for this crate — `DstDecoderKernel` is the seam an external decoder plugs into.

use crate::buffer::{BufferPool, RefBuffer};
use crate::format::{Capabilities, Format, Kind};
use crate::traits::Transform;
use dsdiff_core::errors::Result;

/// Decodes one compressed DST frame into raw (1-bit-packed) DSD bytes. Implementations
/// live outside this crate; `DstDecodeTransform` only adapts one to the `Transform`
/// trait.
pub trait DstDecoderKernel: Send {
    /// Decodes `frame` (one DST-compressed frame payload) into `out`, returning the
    /// number of raw DSD bytes written.
    fn decode(&mut self, frame: &[u8], out: &mut [u8]) -> Result<usize>;

    /// Number of raw DSD bytes one decoded frame occupies, given `channels`.
    fn output_frame_bytes(&self, channels: u16) -> usize;
}

/// Adapts a [`DstDecoderKernel`] to the pipeline's [`Transform`] trait.
pub struct DstDecodeTransform<K: DstDecoderKernel> {
    kernel: K,
}

impl<K: DstDecoderKernel> DstDecodeTransform<K> {
    pub fn new(kernel: K) -> DstDecodeTransform<K> {
        DstDecodeTransform { kernel }
    }
}

impl<K: DstDecoderKernel> Transform for DstDecodeTransform<K> {
    fn input_capabilities(&self) -> Capabilities {
        Capabilities::ACCEPTS_DST
    }

    fn output_capabilities(&self) -> Capabilities {
        Capabilities::ACCEPTS_DSD
    }

    fn output_format(&self, input: Format) -> Format {
        Format::dsd_raw(input.sample_rate, input.channels)
    }

    fn process(&mut self, input: &RefBuffer, pool: &BufferPool) -> Result<RefBuffer> {
        let out_format = self.output_format(input.format());
        let mut out = pool.acquire(out_format);
        let n = self.kernel.decode(input.as_slice(), out.capacity())?;
        out.set_len(n);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::Format as Fmt;

    struct PassthroughKernel;

    impl DstDecoderKernel for PassthroughKernel {
        fn decode(&mut self, frame: &[u8], out: &mut [u8]) -> Result<usize> {
            out[..frame.len()].copy_from_slice(frame);
            Ok(frame.len())
        }

        fn output_frame_bytes(&self, channels: u16) -> usize {
            channels as usize * 4
        }
    }

    #[test]
    fn transform_adapts_kernel_decode_call() {
        let pool = BufferPool::new(16);
        let input_format = Fmt::dst(2_822_400, 2, 75);
        let mut input = pool.acquire(input_format);
        input.capacity()[..3].copy_from_slice(&[9, 8, 7]);
        input.set_len(3);

        let mut transform = DstDecodeTransform::new(PassthroughKernel);
        let out = transform.process(&input, &pool).unwrap();
        assert_eq!(out.as_slice(), &[9, 8, 7]);
        assert_eq!(out.format().kind, Kind::DsdRaw);
    }
}
