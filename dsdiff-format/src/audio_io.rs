//! Sample-level I/O: raw DSD byte reads/writes/seeks, and DST frame reads/writes
//! including the lazily-materialized random-access index.

use crate::handle::{DsdiffHandle, DstIndexEntry, DST_INDEX_GROWTH_STEP};
use crate::tags;
use dsdiff_core::chunk::{skip_chunk, skip_pad, ChunkHeader};
use dsdiff_core::errors::{Error, Result};
use dsdiff_core::io::{OpenMode, ReadBytes, SeekOrigin, WriteBytes};

const MAX_DATA_SIZE: u64 = crate::tags::MAX_DATA_SIZE;

impl DsdiffHandle {
    /// Reads up to `buf.len()` raw DSD bytes, clamped so the read never crosses the
    /// end of sound data. Returns `EndOfData` if the cursor is already there.
    pub fn read_dsd(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.is_dst() {
            return Err(Error::RequiresDsd);
        }
        let end = self.sound.sound_data_end;
        let stream = self.stream_mut()?;
        let remaining = end.saturating_sub(stream.pos());
        if remaining == 0 {
            return Err(Error::EndOfData);
        }
        let n = (buf.len() as u64).min(remaining) as usize;
        stream.read_buf_exact(&mut buf[..n])?;
        Ok(n)
    }

    /// Appends `buf` as raw DSD bytes. Rejected on a DST stream and once the total
    /// sound-data size would exceed the implementation-defined cap.
    pub fn write_dsd(&mut self, buf: &[u8]) -> Result<()> {
        if self.is_dst() {
            return Err(Error::RequiresDsd);
        }
        if self.sound.sound_data_size + buf.len() as u64 > MAX_DATA_SIZE {
            return Err(Error::MaxFileSize);
        }
        let target = self.sound.sound_data_end;
        let stream = self.stream_mut()?;
        stream.seek(SeekOrigin::Set(target))?;
        stream.write_buf(buf)?;
        self.sound.sound_data_end += buf.len() as u64;
        self.sound.sound_data_size += buf.len() as u64;
        self.audio.sample_frame_count =
            self.sound.sound_data_size / self.audio.channel_count.max(1) as u64;
        Ok(())
    }

    /// Skips `frames` sample-frames forward, clamped to the end of sound data.
    pub fn skip_dsd(&mut self, frames: u64) -> Result<()> {
        let bytes = frames * self.audio.channel_count.max(1) as u64;
        let end = self.sound.sound_data_end;
        let stream = self.stream_mut()?;
        let target = (stream.pos() + bytes).min(end);
        stream.seek(SeekOrigin::Set(target))?;
        Ok(())
    }

    /// Seeks to a sample-frame offset. `origin`'s payload is interpreted in
    /// sample-frames, not bytes. Clamps below the start of sound data; in `Read` mode
    /// also clamps above the end; in `Write`/`Modify` mode seeking past the current
    /// end extends the logical sound-data size (the pre-allocated tail the design
    /// describes — the gap is not eagerly zero-filled on disk).
    pub fn seek_dsd(&mut self, frame_offset: i64, origin: SeekOrigin) -> Result<u64> {
        let channels = self.audio.channel_count.max(1) as i64;
        let byte_offset = frame_offset.saturating_mul(channels);
        let start = self.sound.sound_data_start as i64;
        let end = self.sound.sound_data_end as i64;

        let target = match origin {
            SeekOrigin::Set(_) => start + byte_offset,
            SeekOrigin::Cur(_) => self.stream_mut()?.pos() as i64 + byte_offset,
            SeekOrigin::End(_) => end + byte_offset,
        };
        let mut target = target.max(start);
        if self.file.mode == OpenMode::Read {
            target = target.min(end);
        }
        else if target > end {
            self.sound.sound_data_end = target as u64;
            self.sound.sound_data_size = (target - start) as u64;
        }

        let stream = self.stream_mut()?;
        stream.seek(SeekOrigin::Set(target as u64))?;
        Ok(((target - start) / channels.max(1)) as u64)
    }

    /// Writes one DST frame with no CRC. Rejected once the stream has committed to
    /// carrying a CRC per frame (`write_dst_frame_with_crc` was called earlier).
    pub fn write_dst_frame(&mut self, data: &[u8]) -> Result<()> {
        if !self.is_dst() {
            return Err(Error::RequiresDst);
        }
        if self.dst.has_crc {
            return Err(Error::CrcAlreadyPresent);
        }
        let write_at = self.dst.dst_data_end;
        let (payload_start, new_end) = {
            let stream = self.stream_mut()?;
            stream.seek(SeekOrigin::Set(write_at))?;
            let payload_start = write_dstf(stream, data)?;
            (payload_start, stream.pos())
        };
        self.dst.dst_data_end = new_end;
        self.dst.frame_count += 1;
        self.sound.sound_data_size = new_end - self.sound.sound_data_start;
        push_index_entry(&mut self.dst.index, payload_start, data.len() as u32);
        Ok(())
    }

    /// Writes one DST frame followed by its CRC payload. The first call promotes the
    /// stream to carrying a CRC per frame for its remaining lifetime.
    pub fn write_dst_frame_with_crc(&mut self, data: &[u8], crc: &[u8]) -> Result<()> {
        if !self.is_dst() {
            return Err(Error::RequiresDst);
        }
        let write_at = self.dst.dst_data_end;
        let (payload_start, new_end) = {
            let stream = self.stream_mut()?;
            stream.seek(SeekOrigin::Set(write_at))?;
            let payload_start = write_dstf(stream, data)?;
            write_dstc(stream, crc)?;
            (payload_start, stream.pos())
        };
        self.dst.dst_data_end = new_end;
        self.dst.frame_count += 1;
        self.dst.has_crc = true;
        self.dst.crc_size = crc.len() as u32;
        self.sound.sound_data_size = new_end - self.sound.sound_data_start;
        push_index_entry(&mut self.dst.index, payload_start, data.len() as u32);
        Ok(())
    }

    /// Reads one DST frame sequentially. If an `EndOfData` in this function's place
    /// feels surprising: the underlying format's reference implementation rewinds the
    /// cursor to the start of sound data whenever the chunk following a frame isn't
    /// `DSTF`, which this crate deliberately does not reproduce (see the Open Question
    /// recorded in `DESIGN.md`). Instead, a non-`DSTF` header — whether at the start
    /// of this call or in the lookahead after it — surfaces as a clean `EndOfData`,
    /// leaving the cursor wherever it naturally landed so a caller can always recover
    /// via `seek_dst_frame`/`read_dst_frame_at_index`.
    pub fn read_dst_frame(&mut self, buf: &mut [u8]) -> Result<usize> {
        if !self.is_dst() {
            return Err(Error::RequiresDst);
        }
        let end = self.dst.dst_data_end;
        {
            let stream = self.stream_mut()?;
            if stream.pos() >= end {
                return Err(Error::EndOfData);
            }
        }
        let stream = self.stream_mut()?;
        let header = ChunkHeader::read(stream)?;
        if header.tag != tags::DSTF {
            return Err(Error::EndOfData);
        }
        if (header.size as usize) > buf.len() {
            return Err(Error::BufferTooSmall);
        }
        let n = header.size as usize;
        stream.read_buf_exact(&mut buf[..n])?;
        skip_pad(stream, header.size)?;

        if stream.pos() < end {
            let lookahead_pos = stream.pos();
            let next = ChunkHeader::read(stream)?;
            if next.tag == tags::DSTC {
                skip_chunk(stream, next.size)?;
            }
            else {
                stream.seek(SeekOrigin::Set(lookahead_pos))?;
            }
        }
        Ok(n)
    }

    /// Seeks directly to the `index`-th DST frame via the random-access index,
    /// materializing it from the on-disk `DSTI` chunk first if needed.
    pub fn seek_dst_frame(&mut self, index: usize) -> Result<u64> {
        self.ensure_dst_index()?;
        if index >= self.dst.frame_count as usize {
            return Err(Error::TrackIndexInvalid);
        }
        let offset = self.dst.index[index].offset;
        let stream = self.stream_mut()?;
        stream.seek(SeekOrigin::Set(offset))?;
        Ok(offset)
    }

    /// Reads the `index`-th DST frame's payload directly via the random-access index.
    pub fn read_dst_frame_at_index(&mut self, index: usize, buf: &mut [u8]) -> Result<usize> {
        self.ensure_dst_index()?;
        let entry =
            *self.dst.index.get(index).ok_or(Error::TrackIndexInvalid)?;
        if (entry.length as usize) > buf.len() {
            return Err(Error::BufferTooSmall);
        }
        let stream = self.stream_mut()?;
        stream.seek(SeekOrigin::Set(entry.offset))?;
        stream.read_buf_exact(&mut buf[..entry.length as usize])?;
        Ok(entry.length as usize)
    }

    /// The byte offset at which the CRC trailing the `index`-th frame would start, per
    /// the design's offset formula, for callers that recorded a stream with per-frame
    /// CRCs and want to read them back alongside an indexed frame.
    pub fn dst_frame_crc_offset(&mut self, index: usize) -> Result<u64> {
        self.ensure_dst_index()?;
        let entry =
            *self.dst.index.get(index).ok_or(Error::TrackIndexInvalid)?;
        let pad = if entry.length % 2 != 0 { 1 } else { 0 };
        Ok(entry.offset + entry.length as u64 + pad + 12)
    }

    fn ensure_dst_index(&mut self) -> Result<()> {
        if !self.dst.index.is_empty() {
            return Ok(());
        }
        if !self.dst.has_index {
            return Err(Error::NoDstIndex);
        }
        let dsti_pos = self.dst.dsti_pos;
        let dsti_size = self.dst.dsti_size;
        let stream = self.stream_mut()?;
        stream.seek(SeekOrigin::Set(dsti_pos + 12))?;
        let count = (dsti_size / 12) as usize;
        let mut entries = Vec::with_capacity(count);
        for _ in 0..count {
            let offset = stream.read_be_u64()?;
            let length = stream.read_be_u32()?;
            entries.push(DstIndexEntry { offset, length });
        }
        self.dst.index = entries;
        Ok(())
    }
}

fn push_index_entry(index: &mut Vec<DstIndexEntry>, offset: u64, length: u32) {
    if index.len() == index.capacity() {
        index.reserve(DST_INDEX_GROWTH_STEP);
    }
    index.push(DstIndexEntry { offset, length });
}

fn write_dstf(stream: &mut dsdiff_core::io::ByteStream<std::fs::File>, data: &[u8]) -> Result<u64> {
    stream.write_quad_bytes(&tags::DSTF)?;
    stream.write_be_u64(data.len() as u64)?;
    let payload_start = stream.pos();
    stream.write_buf(data)?;
    stream.write_pad_if_odd(data.len() as u64)?;
    Ok(payload_start)
}

fn write_dstc(stream: &mut dsdiff_core::io::ByteStream<std::fs::File>, crc: &[u8]) -> Result<()> {
    stream.write_quad_bytes(&tags::DSTC)?;
    stream.write_be_u64(crc.len() as u64)?;
    stream.write_buf(crc)?;
    stream.write_pad_if_odd(crc.len() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::AudioType;

    #[test]
    fn dst_round_trip_with_index() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dst.dff");
        let mut handle = DsdiffHandle::create(&path, AudioType::Dst, 2, 1, 2_822_400).unwrap();
        let frames: Vec<Vec<u8>> = (0..5).map(|i| vec![i as u8; 500]).collect();
        for frame in &frames {
            handle.write_dst_frame(frame).unwrap();
        }
        handle.finalize().unwrap();
        handle.close().unwrap();

        let mut reopened = DsdiffHandle::open(&path).unwrap();
        assert_eq!(reopened.dst_frame_count(), 5);
        assert!(reopened.has_dst_index());
        let mut buf = vec![0u8; 500];
        for (i, frame) in frames.iter().enumerate() {
            let n = reopened.read_dst_frame_at_index(i, &mut buf).unwrap();
            assert_eq!(&buf[..n], frame.as_slice());
        }
    }

    #[test]
    fn write_dsd_rejects_oversized_stream() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.dff");
        let mut handle = DsdiffHandle::create(&path, AudioType::Dsd, 1, 1, 44_100).unwrap();
        handle.sound.sound_data_size = MAX_DATA_SIZE;
        assert!(matches!(handle.write_dsd(&[0, 1]), Err(Error::MaxFileSize)));
    }

    #[test]
    fn read_dsd_reports_end_of_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.dff");
        let mut handle = DsdiffHandle::create(&path, AudioType::Dsd, 1, 1, 44_100).unwrap();
        let mut buf = [0u8; 4];
        assert!(matches!(handle.read_dsd(&mut buf), Err(Error::EndOfData)));
    }
}
