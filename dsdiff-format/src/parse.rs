//! `DsdiffHandle::open`/`modify`: the top-level FRM8 walk and its nested PROP/DIIN/DST
//! walks. Reads a header, dispatches on its tag, and either consumes or skips the
//! payload before looping again.

use crate::handle::{AudioType, Comment, DsdiffHandle, Manufacturer};
use crate::tags;
use dsdiff_core::chunk::{decode_channel_tag, skip_chunk, skip_pad, ChunkHeader};
use dsdiff_core::errors::{Error, Result};
use dsdiff_core::io::{ByteStream, OpenMode, ReadBytes};
use dsdiff_core::marker::{Marker, MarkerKind, Timecode};
use std::fs::File;
use std::path::Path;

impl DsdiffHandle {
    /// Opens an existing DSDIFF file for reading. The cursor is left at the start of
    /// the sound data.
    pub fn open(path: impl AsRef<Path>) -> Result<DsdiffHandle> {
        Self::parse_internal(path, OpenMode::Read)
    }

    /// Opens an existing DSDIFF file for in-place modification. The cursor is left
    /// past the last committed sample/frame so new audio data appends there.
    pub fn modify(path: impl AsRef<Path>) -> Result<DsdiffHandle> {
        Self::parse_internal(path, OpenMode::Modify)
    }

    fn parse_internal(path: impl AsRef<Path>, mode: OpenMode) -> Result<DsdiffHandle> {
        let mut stream = match mode {
            OpenMode::Read => ByteStream::open_read(path.as_ref())?,
            OpenMode::Modify => ByteStream::open_modify(path.as_ref())?,
            OpenMode::Write => unreachable!("parse_internal is never called with Write"),
        };

        let mut handle = DsdiffHandle::new();
        handle.file.mode = mode;
        handle.path = Some(path.as_ref().to_path_buf());

        parse_frm8(&mut stream, &mut handle)?;

        handle.file.final_size = Some(stream.size()?);

        match mode {
            OpenMode::Read => {
                stream.seek(dsdiff_core::io::SeekOrigin::Set(handle.sound.sound_data_start))?;
            }
            OpenMode::Modify => {
                let resume_at = if handle.is_dst() {
                    handle.dst.dst_data_end
                }
                else {
                    handle.sound.sound_data_end
                };
                stream.seek(dsdiff_core::io::SeekOrigin::Set(resume_at))?;
            }
            OpenMode::Write => unreachable!(),
        }

        handle.stream = Some(stream);
        Ok(handle)
    }
}

fn parse_frm8(stream: &mut ByteStream<File>, handle: &mut DsdiffHandle) -> Result<()> {
    let header = ChunkHeader::read(stream)?;
    if header.tag != tags::FRM8 {
        return Err(Error::InvalidFile("missing FRM8 container"));
    }
    let form = stream.read_quad_bytes()?;
    if form != tags::FORM_DSD {
        return Err(Error::InvalidFile("FRM8 form type is not \"DSD \""));
    }

    let end = header_payload_end(stream.pos(), header.size, 4);

    let mut seen_fver = false;
    let mut seen_prop = false;
    let mut seen_sound = false;
    let mut seen_comt = false;
    let mut seen_diin = false;
    let mut id3_occurrences = 0usize;

    while stream.pos() < end {
        let child = ChunkHeader::read(stream)?;
        match &child.tag {
            t if *t == tags::FRM8 => {
                return Err(Error::InvalidChunk("nested FRM8 is not permitted"));
            }
            t if *t == tags::FVER => {
                if seen_fver {
                    return Err(Error::InvalidChunk("duplicate FVER"));
                }
                parse_fver(stream, handle)?;
                seen_fver = true;
            }
            t if *t == tags::PROP => {
                if seen_prop {
                    return Err(Error::InvalidChunk("duplicate PROP"));
                }
                parse_prop(stream, handle, child.size)?;
                seen_prop = true;
            }
            t if *t == tags::DSD => {
                if seen_sound {
                    return Err(Error::InvalidChunk("multiple sound-data chunks"));
                }
                handle.audio.audio_type = Some(AudioType::Dsd);
                handle.sound.sound_header_pos = stream.pos() - 12;
                handle.sound.sound_data_start = stream.pos();
                handle.sound.sound_data_size = child.size;
                handle.sound.sound_data_end = stream.pos() + child.size;
                handle.audio.sample_frame_count =
                    safe_div(child.size, handle.audio.channel_count.max(1) as u64);
                stream.seek(dsdiff_core::io::SeekOrigin::Set(handle.sound.sound_data_end))?;
                skip_pad(stream, child.size)?;
                seen_sound = true;
            }
            t if *t == tags::DST => {
                if seen_sound {
                    return Err(Error::InvalidChunk("multiple sound-data chunks"));
                }
                parse_dst_container(stream, handle, child.size)?;
                seen_sound = true;
            }
            t if *t == tags::DSTI => {
                parse_dsti(stream, handle, child.size)?;
            }
            t if *t == tags::COMT => {
                if seen_comt {
                    return Err(Error::InvalidChunk("duplicate COMT"));
                }
                handle.optional.comt_pos = stream.pos() - 12;
                parse_comt(stream, handle, child.size)?;
                seen_comt = true;
            }
            t if *t == tags::ID3 => {
                let blob = stream.read_boxed_slice_exact(child.size as usize)?.into_vec();
                skip_pad(stream, child.size)?;
                if id3_occurrences == 0 {
                    handle.optional.file_id3 = Some(blob);
                    handle.optional.file_id3_pos = stream.pos() - child.padded_size() - 12;
                }
                else {
                    handle.optional.track_id3.push(Some(blob));
                    handle.optional.track_id3_pos = stream.pos() - child.padded_size() - 12;
                }
                id3_occurrences += 1;
            }
            t if *t == tags::MANF => {
                let mut id = [0u8; 4];
                stream.read_buf_exact(&mut id)?;
                let remaining = child.size.saturating_sub(4);
                let data = stream.read_boxed_slice_exact(remaining as usize)?.into_vec();
                skip_pad(stream, child.size)?;
                handle.optional.manufacturer_pos = stream.pos() - child.padded_size() - 12;
                handle.optional.manufacturer = Some(Manufacturer { id, data });
            }
            t if *t == tags::DIIN => {
                if seen_diin {
                    return Err(Error::InvalidChunk("duplicate DIIN"));
                }
                handle.optional.diin_pos = stream.pos() - 12;
                parse_diin(stream, handle, child.size)?;
                seen_diin = true;
            }
            _ => {
                skip_chunk(stream, child.size)?;
            }
        }
    }

    if !seen_fver {
        return Err(Error::InvalidFile("missing FVER chunk"));
    }
    if !seen_prop {
        return Err(Error::InvalidFile("missing PROP chunk"));
    }
    if !seen_sound {
        return Err(Error::InvalidFile("missing sound-data chunk"));
    }
    Ok(())
}

fn header_payload_end(pos_after_header: u64, size: u64, extra_form_bytes: u64) -> u64 {
    pos_after_header + (size - extra_form_bytes)
}

fn safe_div(a: u64, b: u64) -> u64 {
    if b == 0 {
        0
    }
    else {
        a / b
    }
}

fn parse_fver(stream: &mut ByteStream<File>, handle: &mut DsdiffHandle) -> Result<()> {
    let mut v = [0u8; 4];
    stream.read_buf_exact(&mut v)?;
    if v[0] != 1 {
        return Err(Error::InvalidVersion);
    }
    handle.file.version = (v[0], v[1], v[2], v[3]);
    Ok(())
}

fn parse_prop(stream: &mut ByteStream<File>, handle: &mut DsdiffHandle, size: u64) -> Result<()> {
    handle.sound.prop_header_pos = stream.pos() - 12;
    handle.sound.prop_size = size;
    let form = stream.read_quad_bytes()?;
    if form != tags::FORM_SND {
        return Err(Error::InvalidFile("PROP form type is not \"SND \""));
    }
    let end = header_payload_end(stream.pos(), size, 4);

    let mut seen_fs = false;
    let mut seen_chnl = false;
    let mut seen_cmpr = false;
    let mut seen_abss = false;
    let mut seen_lsco = false;
    let mut channel_ids = Vec::new();

    while stream.pos() < end {
        let child = ChunkHeader::read(stream)?;
        match &child.tag {
            t if *t == tags::FS => {
                if seen_fs {
                    return Err(Error::InvalidChunk("duplicate FS"));
                }
                handle.audio.sample_rate = stream.read_be_u32()?;
                skip_pad(stream, child.size)?;
                seen_fs = true;
            }
            t if *t == tags::CHNL => {
                if seen_chnl {
                    return Err(Error::InvalidChunk("duplicate CHNL"));
                }
                handle.sound.chnl_pos = stream.pos() - 12;
                let count = stream.read_be_u16()?;
                channel_ids.reserve(count as usize);
                for _ in 0..count {
                    let tag = stream.read_quad_bytes()?;
                    channel_ids.push(decode_channel_tag(&tag));
                }
                skip_pad(stream, child.size)?;
                handle.audio.channel_count = count;
                seen_chnl = true;
            }
            t if *t == tags::CMPR => {
                if seen_cmpr {
                    return Err(Error::InvalidChunk("duplicate CMPR"));
                }
                let tag = stream.read_quad_bytes()?;
                let _name = stream.read_pstring()?;
                handle.audio.audio_type = match &tag {
                    t if *t == *b"DSD " => Some(AudioType::Dsd),
                    t if *t == *b"DST " => Some(AudioType::Dst),
                    _ => return Err(Error::UnsupportedCompression),
                };
                seen_cmpr = true;
            }
            t if *t == tags::ABSS => {
                if seen_abss {
                    return Err(Error::InvalidChunk("duplicate ABSS"));
                }
                handle.optional.timecode_pos = stream.pos() - 12;
                handle.optional.timecode = Timecode {
                    hours: stream.read_be_u16()?,
                    minutes: stream.read_u8()?,
                    seconds: stream.read_u8()?,
                    samples: stream.read_be_u32()?,
                };
                handle.optional.has_timecode = true;
                seen_abss = true;
            }
            t if *t == tags::LSCO => {
                if seen_lsco {
                    return Err(Error::InvalidChunk("duplicate LSCO"));
                }
                handle.optional.ls_config_pos = stream.pos() - 12;
                handle.optional.ls_config = stream.read_be_u16()?;
                handle.optional.has_ls_config = true;
                seen_lsco = true;
            }
            _ => {
                skip_chunk(stream, child.size)?;
            }
        }
    }

    if !(seen_fs && seen_chnl && seen_cmpr) {
        return Err(Error::InvalidFile("PROP is missing FS, CHNL, or CMPR"));
    }
    handle.audio.channel_ids = channel_ids;
    Ok(())
}

fn parse_dst_container(
    stream: &mut ByteStream<File>,
    handle: &mut DsdiffHandle,
    size: u64,
) -> Result<()> {
    handle.audio.audio_type = Some(AudioType::Dst);
    handle.sound.sound_header_pos = stream.pos() - 12;
    let container_end = stream.pos() + size;

    let frte = ChunkHeader::read(stream)?;
    if frte.tag != tags::FRTE {
        return Err(Error::InvalidChunk("DST container does not start with FRTE"));
    }
    handle.dst.frame_count = stream.read_be_u32()?;
    handle.dst.frame_rate = stream.read_be_u16()?;
    skip_pad(stream, frte.size)?;

    handle.sound.sound_data_start = stream.pos();
    handle.sound.sound_data_size = container_end.saturating_sub(stream.pos());
    handle.sound.sound_data_end = container_end;
    handle.dst.dst_data_end = container_end;

    // Individual DSTF/DSTC frames are not walked here; the random-access index (DSTI,
    // parsed separately, or lazily materialized on first indexed read) is the
    // supported way to address them, matching the lazy-index design.
    stream.seek(dsdiff_core::io::SeekOrigin::Set(container_end))?;
    Ok(())
}

fn parse_dsti(stream: &mut ByteStream<File>, handle: &mut DsdiffHandle, size: u64) -> Result<()> {
    handle.dst.dsti_pos = stream.pos() - 12;
    handle.dst.dsti_size = size;
    handle.dst.has_index = true;
    skip_chunk(stream, size)
}

fn parse_comt(stream: &mut ByteStream<File>, handle: &mut DsdiffHandle, size: u64) -> Result<()> {
    let end = stream.pos() + size;
    let count = stream.read_be_u16()?;
    for _ in 0..count {
        let year = stream.read_be_u16()?;
        let month = stream.read_u8()?;
        let day = stream.read_u8()?;
        let hour = stream.read_u8()?;
        let minute = stream.read_u8()?;
        let kind = stream.read_be_u16()?;
        let reference = stream.read_be_u16()?;
        let text_len = stream.read_be_u32()?;
        let text_bytes = stream.read_boxed_slice_exact(text_len as usize)?;
        let text = String::from_utf8_lossy(&text_bytes).into_owned();
        handle.optional.comments.push(Comment { year, month, day, hour, minute, kind, reference, text });
    }
    if stream.pos() != end {
        stream.seek(dsdiff_core::io::SeekOrigin::Set(end))?;
    }
    skip_pad(stream, size)
}

fn parse_diin(stream: &mut ByteStream<File>, handle: &mut DsdiffHandle, size: u64) -> Result<()> {
    let end = header_payload_end(stream.pos(), size, 0);
    while stream.pos() < end {
        let child = ChunkHeader::read(stream)?;
        match &child.tag {
            t if *t == tags::EMID => {
                let bytes = stream.read_boxed_slice_exact(child.size as usize)?;
                skip_pad(stream, child.size)?;
                handle.optional.disc_info.emid = Some(String::from_utf8_lossy(&bytes).into_owned());
            }
            t if *t == tags::DIAR => {
                handle.optional.disc_info.artist = Some(stream.read_pstring()?);
            }
            t if *t == tags::DITI => {
                handle.optional.disc_info.title = Some(stream.read_pstring()?);
            }
            t if *t == tags::MARK => {
                let marker = parse_mark_record(stream)?;
                handle.optional.markers.push(marker);
            }
            _ => {
                skip_chunk(stream, child.size)?;
            }
        }
    }
    Ok(())
}

fn parse_mark_record(stream: &mut ByteStream<File>) -> Result<Marker> {
    let hours = stream.read_be_u16()?;
    let minutes = stream.read_u8()?;
    let seconds = stream.read_u8()?;
    let samples = stream.read_be_u32()?;
    let sample_offset = stream.read_be_i32()? as i64;
    let kind = MarkerKind::from(stream.read_be_u16()?);
    let channel = stream.read_be_u16()?;
    let track_flags = stream.read_be_u16()?;
    let text_len = stream.read_be_u32()?;
    let text_bytes = stream.read_boxed_slice_exact(text_len as usize)?;
    let text = String::from_utf8_lossy(&text_bytes).into_owned();
    if text_len % 2 != 0 {
        stream.read_u8()?;
    }
    Ok(Marker { timecode: Timecode { hours, minutes, seconds, samples }, sample_offset, kind, channel, track_flags, text })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::AudioType as AT;

    #[test]
    fn round_trips_minimal_stereo_dsd_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rt.dff");
        let mut handle = DsdiffHandle::create(&path, AT::Dsd, 2, 1, 2_822_400).unwrap();
        handle.write_dsd(&[0xAA; 8]).unwrap();
        handle.finalize().unwrap();
        handle.close().unwrap();

        let reopened = DsdiffHandle::open(&path).unwrap();
        assert_eq!(reopened.channel_count(), 2);
        assert_eq!(reopened.sample_rate(), 2_822_400);
        assert_eq!(reopened.audio_type(), Some(AT::Dsd));
        assert_eq!(reopened.sound_data_size(), 8);
    }

    #[test]
    fn rejects_file_missing_frm8() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.dff");
        std::fs::write(&path, b"NOTAFRM8HEADERTHATSLONGENOUGH").unwrap();
        assert!(DsdiffHandle::open(&path).is_err());
    }
}
