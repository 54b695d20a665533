//! `DsdiffHandle::create`: the forward, single-pass write that opens a brand new file
//! in `Write` mode and lays down every header up through the start of sound data,
//! leaving the few fields that are only known at the end as zero placeholders for
//! `finalize` to patch.

use crate::channel::default_channel_ids;
use crate::handle::{AudioType, DsdiffHandle, DEFAULT_DST_FRAME_RATE};
use crate::tags;
use dsdiff_core::chunk::{encode_channel_tag, fixed_tag};
use dsdiff_core::errors::{Error, Result};
use dsdiff_core::io::{ByteStream, OpenMode, WriteBytes};
use std::path::Path;

impl DsdiffHandle {
    /// Creates a new DSDIFF file at `path` and writes every header through the start
    /// of sound data. `bits` is accepted only as `1` (the only sample width this
    /// format carries); `channels` must be in `1..=1000`.
    pub fn create(
        path: impl AsRef<Path>,
        audio_type: AudioType,
        channels: u16,
        bits: u8,
        rate: u32,
    ) -> Result<DsdiffHandle> {
        if channels == 0 || channels > 1000 {
            return Err(Error::InvalidChannels);
        }
        if bits != 1 {
            return Err(Error::InvalidArg("bits per sample must be 1"));
        }

        let mut handle = DsdiffHandle::new();
        handle.file.mode = OpenMode::Write;
        handle.audio.channel_count = channels;
        handle.audio.channel_ids = default_channel_ids(channels);
        handle.audio.sample_rate = rate;
        handle.audio.audio_type = Some(audio_type);
        handle.path = Some(path.as_ref().to_path_buf());

        let mut stream = ByteStream::create(path)?;

        // FRM8 header: size patched at finalize once the true end position is known.
        stream.write_quad_bytes(&tags::FRM8)?;
        stream.write_be_u64(0)?;
        stream.write_quad_bytes(&tags::FORM_DSD)?;

        write_fver(&mut stream, handle.file.version)?;

        handle.sound.prop_header_pos = stream.pos();
        stream.write_quad_bytes(&tags::PROP)?;
        stream.write_be_u64(0)?;
        stream.write_quad_bytes(&tags::FORM_SND)?;

        write_fs(&mut stream, rate)?;

        handle.sound.chnl_pos = stream.pos();
        write_chnl(&mut stream, &handle.audio.channel_ids)?;

        write_cmpr(&mut stream, audio_type)?;

        match audio_type {
            AudioType::Dsd => {
                handle.sound.sound_header_pos = stream.pos();
                stream.write_quad_bytes(&tags::DSD)?;
                stream.write_be_u64(0)?;
                handle.sound.sound_data_start = stream.pos();
                handle.sound.sound_data_end = stream.pos();
            }
            AudioType::Dst => {
                handle.sound.sound_header_pos = stream.pos();
                stream.write_quad_bytes(&tags::DST)?;
                stream.write_be_u64(0)?;
                handle.dst.frame_rate = DEFAULT_DST_FRAME_RATE;
                write_frte(&mut stream, 0, handle.dst.frame_rate)?;
                handle.sound.sound_data_start = stream.pos();
                handle.sound.sound_data_end = stream.pos();
                handle.dst.dst_data_end = stream.pos();
            }
        }

        handle.stream = Some(stream);
        Ok(handle)
    }
}

fn write_fver<W: WriteBytes>(stream: &mut W, version: (u8, u8, u8, u8)) -> Result<()> {
    stream.write_quad_bytes(&tags::FVER)?;
    stream.write_be_u64(4)?;
    stream.write_buf(&[version.0, version.1, version.2, version.3])
}

fn write_fs<W: WriteBytes>(stream: &mut W, rate: u32) -> Result<()> {
    stream.write_quad_bytes(&tags::FS)?;
    stream.write_be_u64(4)?;
    stream.write_be_u32(rate)
}

fn write_chnl<W: WriteBytes>(stream: &mut W, ids: &[u16]) -> Result<()> {
    stream.write_quad_bytes(&tags::CHNL)?;
    let size = 2 + ids.len() as u64 * 4;
    stream.write_be_u64(size)?;
    stream.write_be_u16(ids.len() as u16)?;
    for id in ids {
        stream.write_quad_bytes(&encode_channel_tag(*id))?;
    }
    stream.write_pad_if_odd(size)
}

fn write_cmpr<W: WriteBytes>(stream: &mut W, audio_type: AudioType) -> Result<()> {
    let (tag, name) = match audio_type {
        AudioType::Dsd => (fixed_tag("DSD "), tags::CMPR_NAME_DSD),
        AudioType::Dst => (fixed_tag("DST "), tags::CMPR_NAME_DST),
    };
    let name_len = name.len().min(255);
    let pstring_len = 1 + name_len + ((name_len + 1) % 2);
    let size = 4 + pstring_len as u64;
    stream.write_quad_bytes(&tags::CMPR)?;
    stream.write_be_u64(size)?;
    stream.write_quad_bytes(&tag)?;
    stream.write_pstring(name)?;
    Ok(())
}

/// Writes an `FRTE` chunk (frame count, frame rate), used both at `create` time (with
/// `frame_count = 0`) and again by `finalize` once the true count is known.
pub(crate) fn write_frte<W: WriteBytes>(
    stream: &mut W,
    frame_count: u32,
    frame_rate: u16,
) -> Result<()> {
    stream.write_quad_bytes(&tags::FRTE)?;
    stream.write_be_u64(6)?;
    stream.write_be_u32(frame_count)?;
    stream.write_be_u16(frame_rate)?;
    stream.write_pad_if_odd(6)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dsdiff_core::io::ReadBytes;
    use std::io::Cursor;

    fn reopen_bytes(path: &std::path::Path) -> Vec<u8> {
        std::fs::read(path).unwrap()
    }

    #[test]
    fn create_dsd_writes_expected_header_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.dff");
        let handle = DsdiffHandle::create(&path, AudioType::Dsd, 2, 1, 2_822_400).unwrap();
        assert_eq!(handle.channel_count(), 2);
        assert_eq!(handle.sample_rate(), 2_822_400);
        assert!(handle.is_open());
        drop(handle);

        let bytes = reopen_bytes(&path);
        let mut cur = ByteStream::from_inner(Cursor::new(bytes), OpenMode::Read);
        assert_eq!(cur.read_quad_bytes().unwrap(), tags::FRM8);
        let _size = cur.read_be_u64().unwrap();
        assert_eq!(cur.read_quad_bytes().unwrap(), tags::FORM_DSD);
        assert_eq!(cur.read_quad_bytes().unwrap(), tags::FVER);
    }

    #[test]
    fn create_rejects_bad_channel_count() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("b.dff");
        assert!(DsdiffHandle::create(&path, AudioType::Dsd, 0, 1, 44100).is_err());
        assert!(DsdiffHandle::create(&path, AudioType::Dsd, 1001, 1, 44100).is_err());
    }

    #[test]
    fn create_rejects_non_1_bit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.dff");
        assert!(DsdiffHandle::create(&path, AudioType::Dsd, 2, 8, 44100).is_err());
    }

    #[test]
    fn create_dst_writes_frte_with_zero_frame_count() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("d.dff");
        let handle = DsdiffHandle::create(&path, AudioType::Dst, 2, 1, 2_822_400).unwrap();
        assert!(handle.is_dst());
        assert_eq!(handle.dst_frame_count(), 0);
        assert_eq!(handle.dst_frame_rate(), DEFAULT_DST_FRAME_RATE);
    }
}
