//! DSD-to-PCM decimation. `PcmFilterKernel` is the seam a caller-supplied filter plugs
//! into (a proper multi-stage polyphase decimator is out of scope); `SinglePoleDecimator`
//! is a reference implementation so the pipeline is runnable end-to-end without one.

use crate::buffer::{BufferPool, RefBuffer};
use crate::format::{Capabilities, Format, Kind};
use crate::traits::Transform;
use dsdiff_core::errors::{Error, Result};

/// Converts one channel-interleaved block of 1-bit DSD bytes into PCM samples.
/// Implementations own their own filter state across calls.
pub trait PcmFilterKernel: Send {
    /// The PCM kind this kernel produces.
    fn output_kind(&self) -> Kind;

    /// The integer downsample ratio from the DSD bit rate to the output PCM rate.
    fn decimation(&self) -> u32;

    /// Filters `input` (raw DSD bytes, `channels`-way byte-interleaved) and appends
    /// produced PCM sample bytes to `out`, returning the number of PCM sample bytes
    /// written. `out` is guaranteed to have room for `input.len() * 8` sample bytes in
    /// the PCM kind's width, the worst case before any decimation is applied.
    fn process(&mut self, input: &[u8], channels: u16, out: &mut [u8]) -> Result<usize>;
}

/// A one-pole (RC) low-pass filter run per channel ahead of decimation, matching the
/// cheapest DSD-to-PCM decimator shape: exponential smoothing of the +1/-1 bitstream
/// followed by dropping all but every `decimation`-th sample. Output is `f32` PCM.
pub struct SinglePoleDecimator {
    alpha: f32,
    decimation: u32,
    state: Vec<f32>,
    counters: Vec<u32>,
}

impl SinglePoleDecimator {
    /// `alpha` is the filter's smoothing coefficient in `(0.0, 1.0]`; smaller values
    /// filter more aggressively. `decimation` is the DSD-bit-rate-to-PCM-rate ratio
    /// (64 for DSD64 down to a 44.1kHz-multiple PCM rate, for example).
    pub fn new(channels: u16, alpha: f32, decimation: u32) -> SinglePoleDecimator {
        assert!(alpha > 0.0 && alpha <= 1.0, "alpha must be in (0.0, 1.0]");
        assert!(decimation > 0, "decimation factor must be positive");
        SinglePoleDecimator {
            alpha,
            decimation,
            state: vec![0.0; channels as usize],
            counters: vec![0; channels as usize],
        }
    }
}

impl PcmFilterKernel for SinglePoleDecimator {
    fn output_kind(&self) -> Kind {
        Kind::PcmF32
    }

    fn decimation(&self) -> u32 {
        self.decimation
    }

    fn process(&mut self, input: &[u8], channels: u16, out: &mut [u8]) -> Result<usize> {
        let channels = channels as usize;
        if channels == 0 || self.state.len() != channels {
            return Err(Error::InvalidChannels);
        }
        let mut written = 0usize;
        for (i, &byte) in input.iter().enumerate() {
            let ch = i % channels;
            for bit in (0..8).rev() {
                let sample = if (byte >> bit) & 1 == 1 { 1.0f32 } else { -1.0f32 };
                self.state[ch] += self.alpha * (sample - self.state[ch]);
                self.counters[ch] += 1;
                if self.counters[ch] >= self.decimation {
                    self.counters[ch] = 0;
                    let bytes = self.state[ch].to_le_bytes();
                    if written + 4 > out.len() {
                        return Err(Error::BufferTooSmall);
                    }
                    out[written..written + 4].copy_from_slice(&bytes);
                    written += 4;
                }
            }
        }
        Ok(written)
    }
}

/// Adapts a [`PcmFilterKernel`] to the pipeline's [`Transform`] trait.
pub struct DsdToPcmTransform<K: PcmFilterKernel> {
    kernel: K,
}

impl<K: PcmFilterKernel> DsdToPcmTransform<K> {
    pub fn new(kernel: K) -> DsdToPcmTransform<K> {
        DsdToPcmTransform { kernel }
    }
}

impl<K: PcmFilterKernel> Transform for DsdToPcmTransform<K> {
    fn input_capabilities(&self) -> Capabilities {
        Capabilities::ACCEPTS_DSD
    }

    fn output_capabilities(&self) -> Capabilities {
        Capabilities::ACCEPTS_PCM
    }

    fn output_format(&self, input: Format) -> Format {
        let rate = input.sample_rate / self.kernel.decimation().max(1);
        let kind = self.kernel.output_kind();
        Format::pcm(kind, rate, input.channels, kind.bit_width())
    }

    fn process(&mut self, input: &RefBuffer, pool: &BufferPool) -> Result<RefBuffer> {
        let out_format = self.output_format(input.format());
        let mut out = pool.acquire(out_format);
        let channels = input.format().channels;
        let written = {
            let capacity = out.capacity();
            self.kernel.process(input.as_slice(), channels, capacity)?
        };
        out.set_len(written);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::Format as Fmt;

    #[test]
    fn decimator_produces_one_sample_per_decimation_window() {
        let pool = BufferPool::new(256);
        let input_format = Fmt::dsd_raw(2_822_400, 1);
        let mut input = pool.acquire(input_format);
        // 8 bytes = 64 bits; with decimation 64 and 1 channel, exactly one sample.
        input.capacity()[..8].copy_from_slice(&[0xFF; 8]);
        input.set_len(8);

        let mut transform = DsdToPcmTransform::new(SinglePoleDecimator::new(1, 0.1, 64));
        let out = transform.process(&input, &pool).unwrap();
        assert_eq!(out.len(), 4);
        let sample = f32::from_le_bytes(out.as_slice().try_into().unwrap());
        assert!(sample > 0.0, "all-ones input should settle to a positive sample");
    }

    #[test]
    fn rejects_channel_count_mismatch_with_kernel_state() {
        let pool = BufferPool::new(64);
        let input_format = Fmt::dsd_raw(2_822_400, 2);
        let mut input = pool.acquire(input_format);
        input.capacity()[..2].copy_from_slice(&[0xFF, 0x00]);
        input.set_len(2);

        let mut transform = DsdToPcmTransform::new(SinglePoleDecimator::new(1, 0.5, 8));
        assert!(transform.process(&input, &pool).is_err());
    }
}
