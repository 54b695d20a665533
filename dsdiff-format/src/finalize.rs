//! The finalize protocol: emit the trailing optional blocks the writability predicate
//! allows, then patch the four header locations whose final value is only known once
//! the whole file has been written.

use crate::create::write_frte;
use crate::handle::{AudioType, DsdiffHandle};
use crate::tags;
use dsdiff_core::chunk::encode_channel_tag;
use dsdiff_core::errors::{Error, Result};
use dsdiff_core::io::{ByteStream, OpenMode, SeekOrigin, WriteBytes};
use std::fs::File;

impl DsdiffHandle {
    /// The writability predicate: `pos == 0` (never placed) or the handle is not in
    /// `Modify` mode, or `pos` lies at or past the end of committed sound data.
    pub(crate) fn is_writable(&self, pos: u64) -> bool {
        if pos == 0 || self.file.mode != OpenMode::Modify {
            return true;
        }
        let end = if self.is_dst() { self.dst.dst_data_end } else { self.sound.sound_data_end };
        pos >= end
    }

    /// Returns `ChunkLocked` when `pos` fails the writability predicate; every setter
    /// that targets a specific cached chunk position calls this before mutating.
    pub(crate) fn verify_write_position(&self, pos: u64) -> Result<()> {
        if self.is_writable(pos) {
            Ok(())
        }
        else {
            Err(Error::ChunkLocked)
        }
    }

    /// Commits the handle to disk: pads the sound data to even length, emits whatever
    /// trailing optional blocks the writability predicate allows, and patches the
    /// FRM8/PROP/CHNL/sound-container headers. Leaves the cursor at the new end of
    /// file so a subsequent `close` truncates there.
    pub fn finalize(&mut self) -> Result<()> {
        if self.file.mode == OpenMode::Read {
            return Err(Error::ModeReadOnly);
        }
        let mut stream = self.stream.take().ok_or(Error::NotOpen)?;
        let result = self.finalize_with(&mut stream);
        self.stream = Some(stream);
        result
    }

    fn finalize_with(&mut self, stream: &mut ByteStream<File>) -> Result<()> {
        let data_end = if self.is_dst() { self.dst.dst_data_end } else { self.sound.sound_data_end };
        stream.seek(SeekOrigin::Set(data_end))?;
        if self.sound.sound_data_size % 2 != 0 {
            stream.write_byte(0)?;
        }

        let has_diin = self.optional.disc_info.emid.is_some()
            || self.optional.disc_info.artist.is_some()
            || self.optional.disc_info.title.is_some()
            || !self.optional.markers.is_empty();
        if has_diin && self.verify_write_position(self.optional.diin_pos).is_ok() {
            self.optional.markers.sort(self.audio.sample_rate.max(1));
            self.optional.diin_pos = write_diin(
                stream,
                self.optional.disc_info.emid.as_deref(),
                self.optional.disc_info.artist.as_deref(),
                self.optional.disc_info.title.as_deref(),
                self.optional.markers.as_slice(),
            )?;
        }

        if self.is_dst() && self.file.mode == OpenMode::Write {
            self.dst.dsti_pos = write_dsti(stream, &self.dst.index)?;
            self.dst.has_index = true;
        }

        if !self.optional.comments.is_empty() && self.verify_write_position(self.optional.comt_pos).is_ok() {
            self.optional.comt_pos = write_comt(stream, &self.optional.comments)?;
        }

        if let Some(blob) = self.optional.file_id3.clone() {
            if self.verify_write_position(self.optional.file_id3_pos).is_ok() {
                self.optional.file_id3_pos = write_id3(stream, &blob)?;
            }
        }

        if self.verify_write_position(self.optional.track_id3_pos).is_ok() {
            for blob in self.optional.track_id3.clone().into_iter().flatten() {
                self.optional.track_id3_pos = write_id3(stream, &blob)?;
            }
        }

        if let Some(manufacturer) = self.optional.manufacturer.clone() {
            if self.verify_write_position(self.optional.manufacturer_pos).is_ok() {
                self.optional.manufacturer_pos = write_manf(stream, &manufacturer.id, &manufacturer.data)?;
            }
        }

        let end = stream.pos();
        self.file.final_size = Some(end);

        stream.seek(SeekOrigin::Set(0))?;
        stream.write_quad_bytes(&tags::FRM8)?;
        stream.write_be_u64(end - 12)?;
        stream.write_quad_bytes(&tags::FORM_DSD)?;
        stream.write_quad_bytes(&tags::FVER)?;
        stream.write_be_u64(4)?;
        stream.write_buf(&[
            self.file.version.0,
            self.file.version.1,
            self.file.version.2,
            self.file.version.3,
        ])?;

        let prop_size = self.sound.sound_header_pos - self.sound.prop_header_pos - 12 - 4;
        stream.seek(SeekOrigin::Set(self.sound.prop_header_pos))?;
        stream.write_quad_bytes(&tags::PROP)?;
        stream.write_be_u64(prop_size)?;
        self.sound.prop_size = prop_size;

        stream.seek(SeekOrigin::Set(self.sound.chnl_pos))?;
        let chnl_size = 2 + self.audio.channel_ids.len() as u64 * 4;
        stream.write_quad_bytes(&tags::CHNL)?;
        stream.write_be_u64(chnl_size)?;
        stream.write_be_u16(self.audio.channel_ids.len() as u16)?;
        for id in &self.audio.channel_ids {
            stream.write_quad_bytes(&encode_channel_tag(*id))?;
        }
        stream.write_pad_if_odd(chnl_size)?;

        if self.optional.has_timecode {
            let normalized = self.optional.timecode.normalize(self.audio.sample_rate.max(1));
            self.optional.timecode = normalized;
            stream.seek(SeekOrigin::Set(self.optional.timecode_pos))?;
            stream.write_quad_bytes(&tags::ABSS)?;
            stream.write_be_u64(8)?;
            stream.write_be_u16(normalized.hours)?;
            stream.write_byte(normalized.minutes)?;
            stream.write_byte(normalized.seconds)?;
            stream.write_be_u32(normalized.samples)?;
        }

        if self.file.mode == OpenMode::Write {
            stream.seek(SeekOrigin::Set(self.sound.sound_header_pos))?;
            match self.audio_type() {
                Some(AudioType::Dsd) => {
                    stream.write_quad_bytes(&tags::DSD)?;
                    stream.write_be_u64(self.sound.sound_data_size)?;
                }
                Some(AudioType::Dst) => {
                    let container_size =
                        self.dst.dst_data_end - self.sound.sound_header_pos - 12;
                    stream.write_quad_bytes(&tags::DST)?;
                    stream.write_be_u64(container_size)?;
                    write_frte(stream, self.dst.frame_count, self.dst.frame_rate)?;
                }
                None => return Err(Error::UnrecognizedAudioType),
            }
        }

        stream.seek(SeekOrigin::Set(end))?;
        Ok(())
    }

    /// Consumes the handle, truncating the underlying file to the current cursor
    /// position (the contract `ByteStream::close` enforces for writers). After this
    /// call the handle is gone; there is no further operation to perform on it.
    pub fn close(mut self) -> Result<()> {
        if let Some(stream) = self.stream.take() {
            stream.close()?;
        }
        Ok(())
    }
}

fn write_diin(
    stream: &mut ByteStream<File>,
    emid: Option<&str>,
    artist: Option<&str>,
    title: Option<&str>,
    markers: &[dsdiff_core::marker::Marker],
) -> Result<u64> {
    let diin_pos = stream.pos();
    stream.write_quad_bytes(&tags::DIIN)?;
    stream.write_be_u64(0)?;
    let content_start = stream.pos();

    if let Some(emid) = emid {
        let bytes = emid.as_bytes();
        stream.write_quad_bytes(&tags::EMID)?;
        stream.write_be_u64(bytes.len() as u64)?;
        stream.write_buf(bytes)?;
        stream.write_pad_if_odd(bytes.len() as u64)?;
    }
    if let Some(artist) = artist {
        write_pstring_chunk(stream, &tags::DIAR, artist)?;
    }
    if let Some(title) = title {
        write_pstring_chunk(stream, &tags::DITI, title)?;
    }
    for marker in markers {
        write_mark(stream, marker)?;
    }

    let end = stream.pos();
    stream.seek(SeekOrigin::Set(diin_pos + 8))?;
    stream.write_be_u64(end - content_start)?;
    stream.seek(SeekOrigin::Set(end))?;
    Ok(diin_pos)
}

fn write_pstring_chunk(stream: &mut ByteStream<File>, tag: &[u8; 4], text: &str) -> Result<()> {
    let name_len = text.len().min(255);
    let size = 1 + name_len as u64 + ((name_len as u64 + 1) % 2);
    stream.write_quad_bytes(tag)?;
    stream.write_be_u64(size)?;
    stream.write_pstring(text)
}

fn write_mark(stream: &mut ByteStream<File>, marker: &dsdiff_core::marker::Marker) -> Result<()> {
    let text_bytes = marker.text.as_bytes();
    let fixed_len = 22u64;
    let size = fixed_len + text_bytes.len() as u64;
    stream.write_quad_bytes(&tags::MARK)?;
    stream.write_be_u64(size)?;
    stream.write_be_u16(marker.timecode.hours)?;
    stream.write_byte(marker.timecode.minutes)?;
    stream.write_byte(marker.timecode.seconds)?;
    stream.write_be_u32(marker.timecode.samples)?;
    stream.write_buf(&(marker.sample_offset as i32).to_be_bytes())?;
    stream.write_be_u16(u16::from(marker.kind))?;
    stream.write_be_u16(marker.channel)?;
    stream.write_be_u16(marker.track_flags)?;
    stream.write_be_u32(text_bytes.len() as u32)?;
    stream.write_buf(text_bytes)?;
    stream.write_pad_if_odd(size)
}

fn write_dsti(
    stream: &mut ByteStream<File>,
    index: &[crate::handle::DstIndexEntry],
) -> Result<u64> {
    let pos = stream.pos();
    let size = index.len() as u64 * 12;
    stream.write_quad_bytes(&tags::DSTI)?;
    stream.write_be_u64(size)?;
    for entry in index {
        stream.write_be_u64(entry.offset)?;
        stream.write_be_u32(entry.length)?;
    }
    stream.write_pad_if_odd(size)?;
    Ok(pos)
}

fn write_comt(stream: &mut ByteStream<File>, comments: &[crate::handle::Comment]) -> Result<u64> {
    let pos = stream.pos();
    let mut size = 2u64;
    for c in comments {
        size += 2 + 1 + 1 + 1 + 1 + 2 + 2 + 4 + c.text.len() as u64;
    }
    stream.write_quad_bytes(&tags::COMT)?;
    stream.write_be_u64(size)?;
    stream.write_be_u16(comments.len() as u16)?;
    for c in comments {
        stream.write_be_u16(c.year)?;
        stream.write_byte(c.month)?;
        stream.write_byte(c.day)?;
        stream.write_byte(c.hour)?;
        stream.write_byte(c.minute)?;
        stream.write_be_u16(c.kind)?;
        stream.write_be_u16(c.reference)?;
        stream.write_be_u32(c.text.len() as u32)?;
        stream.write_buf(c.text.as_bytes())?;
    }
    stream.write_pad_if_odd(size)?;
    Ok(pos)
}

fn write_id3(stream: &mut ByteStream<File>, blob: &[u8]) -> Result<u64> {
    let pos = stream.pos();
    stream.write_quad_bytes(&tags::ID3)?;
    stream.write_be_u64(blob.len() as u64)?;
    stream.write_buf(blob)?;
    stream.write_pad_if_odd(blob.len() as u64)?;
    Ok(pos)
}

fn write_manf(stream: &mut ByteStream<File>, id: &[u8; 4], data: &[u8]) -> Result<u64> {
    let pos = stream.pos();
    let size = 4 + data.len() as u64;
    stream.write_quad_bytes(&tags::MANF)?;
    stream.write_be_u64(size)?;
    stream.write_quad_bytes(id)?;
    stream.write_buf(data)?;
    stream.write_pad_if_odd(size)?;
    Ok(pos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::AudioType as AT;

    #[test]
    fn finalize_then_reopen_preserves_channel_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fin.dff");
        let mut handle = DsdiffHandle::create(&path, AT::Dsd, 2, 1, 44_100).unwrap();
        handle.write_dsd(&[1, 2, 3, 4]).unwrap();
        handle.finalize().unwrap();
        handle.close().unwrap();

        let reopened = DsdiffHandle::open(&path).unwrap();
        assert_eq!(reopened.channel_ids(), &[0u16, 1u16]);
        assert_eq!(reopened.sound_data_size(), 4);
    }

    #[test]
    fn odd_length_sound_data_gets_padded_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("odd.dff");
        let mut handle = DsdiffHandle::create(&path, AT::Dsd, 1, 1, 44_100).unwrap();
        handle.write_dsd(&[1, 2, 3]).unwrap();
        handle.finalize().unwrap();
        handle.close().unwrap();

        let bytes = std::fs::read(&path).unwrap();
        // FRM8(12) + FVER(12+4) + PROP header(12) + "SND "(4) + FS(12+4) + CHNL(12+2+4)
        // + CMPR(12+4+pstring) + DSD header(12) + 3 data bytes + 1 pad byte.
        assert_eq!(bytes.len() % 2, 0);
    }
}
