//! A minimal DSF (DSD Stream File) sink. DSF itself is out of scope as a read path —
//! this is the one concrete alternative-container writer the system ships, with a
//! chunk layout of `DSD `/`fmt `/`data` header, format, and data chunks.
//!
//! Unlike the DSDIFF engine, this sink buffers the whole stream in memory and writes
//! the file in one shot on `finish`: DSF's per-channel block interleaving needs the
//! full channel buffers on hand to pad out a partial trailing block, and unlike
//! DSDIFF's finalize protocol there is no placeholder-and-patch precedent to reuse
//! here since this format was never a read/write/modify target.
//!
//! DSF fields are little-endian throughout, the reverse of DSDIFF's big-endian chunks,
//! so this module writes with plain `std::io::Write` rather than `dsdiff_core::io`'s
//! big-endian-only `WriteBytes`.

use dsdiff_core::errors::{Error, Result};
use dsdiff_pipeline::traits::{Sink, TrackInfo};
use dsdiff_pipeline::{Capabilities, Format, Kind, RefBuffer};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// DSF interleaves channels in fixed-size blocks; 4096 bytes/channel/block is the value
/// every DSF encoder in the wild defaults to.
const BLOCK_SIZE_PER_CHANNEL: usize = 4096;

const DSF_MAGIC: [u8; 4] = *b"DSD ";
const DSF_FMT_MAGIC: [u8; 4] = *b"fmt ";
const DSF_DATA_MAGIC: [u8; 4] = *b"data";

pub struct DsfSink {
    path: PathBuf,
    sample_rate: u32,
    channels: u16,
    channel_buffers: Vec<Vec<u8>>,
}

impl DsfSink {
    pub fn create(path: impl AsRef<Path>, format: Format) -> Result<DsfSink> {
        if format.kind != Kind::DsdRaw {
            return Err(Error::RequiresDsd);
        }
        if format.channels == 0 || format.channels > 6 {
            return Err(Error::InvalidChannels);
        }
        Ok(DsfSink {
            path: path.as_ref().to_path_buf(),
            sample_rate: format.sample_rate,
            channels: format.channels,
            channel_buffers: vec![Vec::new(); format.channels as usize],
        })
    }
}

impl Sink for DsfSink {
    fn capabilities(&self) -> Capabilities {
        Capabilities::ACCEPTS_DSD
    }

    fn begin_track(&mut self, _track: &TrackInfo) -> Result<()> {
        // DSF carries no track markers; a track's audio is simply appended.
        Ok(())
    }

    fn write_frame(&mut self, frame: &RefBuffer) -> Result<()> {
        let channels = self.channels as usize;
        for (i, &byte) in frame.as_slice().iter().enumerate() {
            self.channel_buffers[i % channels].push(byte);
        }
        Ok(())
    }

    fn end_track(&mut self) -> Result<()> {
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        let channels = self.channels as usize;
        let sample_count = self.channel_buffers.iter().map(|b| b.len()).max().unwrap_or(0) as u64;
        for buf in &mut self.channel_buffers {
            buf.resize(round_up(buf.len(), BLOCK_SIZE_PER_CHANNEL), 0);
        }
        let blocks = self.channel_buffers.first().map(|b| b.len() / BLOCK_SIZE_PER_CHANNEL).unwrap_or(0);
        let data_size = (channels * blocks * BLOCK_SIZE_PER_CHANNEL) as u64;

        let file = File::create(&self.path)?;
        let mut w = BufWriter::new(file);

        let file_size = 28 + 52 + 12 + data_size;
        write_header(&mut w, file_size)?;
        write_fmt_chunk(&mut w, self.sample_rate, channels as u32, sample_count)?;
        write_data_header(&mut w, data_size)?;

        for block in 0..blocks {
            for buf in &self.channel_buffers {
                let start = block * BLOCK_SIZE_PER_CHANNEL;
                w.write_all(&buf[start..start + BLOCK_SIZE_PER_CHANNEL])?;
            }
        }
        w.flush()?;
        Ok(())
    }
}

fn round_up(len: usize, block: usize) -> usize {
    if block == 0 || len % block == 0 {
        len.max(block)
    }
    else {
        len + (block - len % block)
    }
}

fn write_header(w: &mut impl Write, file_size: u64) -> Result<()> {
    w.write_all(&DSF_MAGIC)?;
    w.write_all(&28u64.to_le_bytes())?;
    w.write_all(&file_size.to_le_bytes())?;
    w.write_all(&0u64.to_le_bytes())?;
    Ok(())
}

fn write_fmt_chunk(w: &mut impl Write, sample_rate: u32, channels: u32, sample_count: u64) -> Result<()> {
    w.write_all(&DSF_FMT_MAGIC)?;
    w.write_all(&52u64.to_le_bytes())?;
    w.write_all(&1u32.to_le_bytes())?; // format version
    w.write_all(&0u32.to_le_bytes())?; // format id: DSD raw
    w.write_all(&channel_type(channels).to_le_bytes())?;
    w.write_all(&channels.to_le_bytes())?;
    w.write_all(&sample_rate.to_le_bytes())?;
    w.write_all(&1u32.to_le_bytes())?; // bits per sample
    w.write_all(&sample_count.to_le_bytes())?;
    w.write_all(&(BLOCK_SIZE_PER_CHANNEL as u32).to_le_bytes())?;
    w.write_all(&0u32.to_le_bytes())?; // reserved
    Ok(())
}

fn channel_type(channels: u32) -> u32 {
    match channels {
        1 => 1,
        2 => 2,
        6 => 7,
        n => n,
    }
}

fn write_data_header(w: &mut impl Write, data_size: u64) -> Result<()> {
    w.write_all(&DSF_DATA_MAGIC)?;
    w.write_all(&(data_size + 12).to_le_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dsdiff_pipeline::buffer::BufferPool;

    #[test]
    fn finish_writes_well_formed_header_and_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.dsf");
        let format = Format::dsd_raw(2_822_400, 2);
        let mut sink = DsfSink::create(&path, format).unwrap();

        let pool = BufferPool::new(8);
        let mut buf = pool.acquire(format);
        buf.capacity()[..4].copy_from_slice(&[1, 2, 3, 4]);
        buf.set_len(4);
        sink.write_frame(&buf).unwrap();
        sink.finish().unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[0..4], b"DSD ");
        assert_eq!(&bytes[28..32], b"fmt ");
        let data_chunk_pos = 28 + 52;
        assert_eq!(&bytes[data_chunk_pos..data_chunk_pos + 4], b"data");
    }

    #[test]
    fn rejects_unsupported_channel_count() {
        let format = Format::dsd_raw(2_822_400, 12);
        let dir = tempfile::tempdir().unwrap();
        assert!(DsfSink::create(dir.path().join("x.dsf"), format).is_err());
    }
}
