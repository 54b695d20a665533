//! The CLI's one PCM-accepting sink: a headerless interleaved-sample dump. No reader
//! in this system ever needs PCM back, so there's no matching container format to
//! target — this is a host verb, not a library surface, which is why it lives here
//! rather than in `dsdiff` alongside [`dsdiff::DsfSink`].

use dsdiff::{Capabilities, Error, RefBuffer, Result, Sink, TrackInfo};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub struct RawPcmSink {
    writer: BufWriter<File>,
}

impl RawPcmSink {
    pub fn create(path: impl AsRef<Path>) -> Result<RawPcmSink> {
        let file = File::create(path).map_err(Error::FileCreateFailed)?;
        Ok(RawPcmSink { writer: BufWriter::new(file) })
    }
}

impl Sink for RawPcmSink {
    fn capabilities(&self) -> Capabilities {
        Capabilities::ACCEPTS_PCM
    }

    fn begin_track(&mut self, _track: &TrackInfo) -> Result<()> {
        Ok(())
    }

    fn write_frame(&mut self, frame: &RefBuffer) -> Result<()> {
        self.writer.write_all(frame.as_slice()).map_err(Error::WriteFailed)
    }

    fn end_track(&mut self) -> Result<()> {
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush().map_err(Error::WriteFailed)
    }
}

/// Widens a [`PcmFilterKernel`] producing `f32` samples into one producing `f64`
/// samples, for `--fp64`. `SinglePoleDecimator` only ever emits `f32`; rather than
/// teaching it a second output width, this wraps it the way a resampler would wrap an
/// upstream stage.
pub struct WideningPcmKernel<K> {
    inner: K,
    scratch: Vec<u8>,
}

impl<K> WideningPcmKernel<K> {
    pub fn new(inner: K) -> WideningPcmKernel<K> {
        WideningPcmKernel { inner, scratch: Vec::new() }
    }
}

impl<K: dsdiff_pipeline::transforms::dsd_to_pcm::PcmFilterKernel> dsdiff_pipeline::transforms::dsd_to_pcm::PcmFilterKernel
    for WideningPcmKernel<K>
{
    fn output_kind(&self) -> dsdiff::Kind {
        dsdiff::Kind::PcmF64
    }

    fn decimation(&self) -> u32 {
        self.inner.decimation()
    }

    fn process(&mut self, input: &[u8], channels: u16, out: &mut [u8]) -> Result<usize> {
        self.scratch.clear();
        self.scratch.resize(out.len() / 2, 0);
        let written = self.inner.process(input, channels, &mut self.scratch)?;
        let samples = written / 4;
        for i in 0..samples {
            let narrow = f32::from_le_bytes(self.scratch[i * 4..i * 4 + 4].try_into().unwrap());
            out[i * 8..i * 8 + 8].copy_from_slice(&(narrow as f64).to_le_bytes());
        }
        Ok(samples * 8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dsdiff::{Format, Transform};
    use dsdiff_pipeline::buffer::BufferPool;
    use dsdiff_pipeline::transforms::dsd_to_pcm::{DsdToPcmTransform, SinglePoleDecimator};

    #[test]
    fn raw_pcm_sink_appends_frame_bytes_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.pcm");
        let mut sink = RawPcmSink::create(&path).unwrap();

        let pool = BufferPool::new(8);
        let mut buf = pool.acquire(Format::pcm(dsdiff::Kind::PcmF32, 44_100, 1, 32));
        buf.capacity()[..4].copy_from_slice(&[1, 2, 3, 4]);
        buf.set_len(4);
        sink.write_frame(&buf).unwrap();
        sink.finish().unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn widening_kernel_doubles_sample_width() {
        let pool = BufferPool::new(256);
        let input_format = Format::dsd_raw(2_822_400, 1);
        let mut input = pool.acquire(input_format);
        input.capacity()[..8].copy_from_slice(&[0xFF; 8]);
        input.set_len(8);

        let kernel = WideningPcmKernel::new(SinglePoleDecimator::new(1, 0.1, 64));
        let mut transform = DsdToPcmTransform::new(kernel);
        let out = transform.process(&input, &pool).unwrap();
        assert_eq!(out.len(), 8);
        assert_eq!(out.format().kind, dsdiff::Kind::PcmF64);
        let sample = f64::from_le_bytes(out.as_slice().try_into().unwrap());
        assert!(sample > 0.0);
    }
}
