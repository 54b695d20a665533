//! Metadata setters: comments, ID3 blobs, manufacturer block, disc info, markers, and
//! the two PROP-resident optional chunks (start timecode, loudspeaker config). Every
//! setter that targets an existing cached position calls `verify_write_position`
//! first, per the writability predicate in `finalize.rs`.

use crate::create::write_frte;
use crate::handle::{AudioType, Comment, DiscInfo, DsdiffHandle, Id3Blob, Manufacturer};
use crate::tags;
use dsdiff_core::errors::{Error, Result};
use dsdiff_core::io::{OpenMode, SeekOrigin, WriteBytes};
use dsdiff_core::marker::{Marker, Timecode};

impl DsdiffHandle {
    /// Sets the start timecode (`ABSS`). Only legal before any audio has been
    /// written, since the chunk must be inserted ahead of the sound container that
    /// `create` already wrote; physically relocates that container's header.
    pub fn set_start_timecode(&mut self, timecode: Timecode) -> Result<()> {
        self.insert_prop_chunk(|stream| {
            stream.write_quad_bytes(&tags::ABSS)?;
            stream.write_be_u64(8)?;
            stream.write_be_u16(timecode.hours)?;
            stream.write_byte(timecode.minutes)?;
            stream.write_byte(timecode.seconds)?;
            stream.write_be_u32(timecode.samples)
        })?;
        self.optional.timecode_pos = self.sound.sound_header_pos_before_last_insert;
        self.optional.has_timecode = true;
        self.optional.timecode = timecode;
        Ok(())
    }

    /// Sets the loudspeaker configuration (`LSCO`). Same placement constraint as
    /// [`set_start_timecode`].
    pub fn set_ls_config(&mut self, config: u16) -> Result<()> {
        self.insert_prop_chunk(|stream| {
            stream.write_quad_bytes(&tags::LSCO)?;
            stream.write_be_u64(2)?;
            stream.write_be_u16(config)
        })?;
        self.optional.ls_config_pos = self.sound.sound_header_pos_before_last_insert;
        self.optional.has_ls_config = true;
        self.optional.ls_config = config;
        Ok(())
    }

    /// Writes `chunk` at the current sound-container header position, then rewrites
    /// the (still-empty) sound container after it, extending every cached position
    /// that refers past the insertion point. Only legal in `Write` mode before any
    /// audio has been committed.
    fn insert_prop_chunk(
        &mut self,
        chunk: impl FnOnce(&mut dsdiff_core::io::ByteStream<std::fs::File>) -> Result<()>,
    ) -> Result<()> {
        if self.file.mode != OpenMode::Write {
            return Err(Error::PostCreateForbidden);
        }
        if self.sound.sound_data_end != self.sound.sound_data_start {
            return Err(Error::PostCreateForbidden);
        }
        let old_header_pos = self.sound.sound_header_pos;
        let audio_type = self.audio_type().ok_or(Error::UnrecognizedAudioType)?;
        let frame_rate = self.dst.frame_rate;

        let stream = self.stream_mut()?;
        stream.seek(SeekOrigin::Set(old_header_pos))?;
        chunk(stream)?;

        let new_header_pos = stream.pos();
        match audio_type {
            AudioType::Dsd => {
                stream.write_quad_bytes(&tags::DSD)?;
                stream.write_be_u64(0)?;
            }
            AudioType::Dst => {
                stream.write_quad_bytes(&tags::DST)?;
                stream.write_be_u64(0)?;
                write_frte(stream, 0, frame_rate)?;
            }
        }
        let new_data_start = stream.pos();

        self.sound.sound_header_pos_before_last_insert = old_header_pos;
        self.sound.sound_header_pos = new_header_pos;
        self.sound.sound_data_start = new_data_start;
        self.sound.sound_data_end = new_data_start;
        self.dst.dst_data_end = new_data_start;
        Ok(())
    }

    /// Appends a comment record, subject to the writability predicate.
    pub fn add_comment(&mut self, comment: Comment) -> Result<()> {
        self.verify_write_position(self.optional.comt_pos)?;
        self.optional.comments.push(comment);
        Ok(())
    }

    /// Sets the file-level ID3 blob, subject to the writability predicate.
    pub fn set_file_id3(&mut self, blob: Id3Blob) -> Result<()> {
        self.verify_write_position(self.optional.file_id3_pos)?;
        self.optional.file_id3 = Some(blob);
        Ok(())
    }

    /// Sets the per-track ID3 blob at `index`, growing the sparse array as needed.
    pub fn set_track_id3(&mut self, index: usize, blob: Id3Blob) -> Result<()> {
        self.verify_write_position(self.optional.track_id3_pos)?;
        if self.optional.track_id3.len() <= index {
            self.optional.track_id3.resize(index + 1, None);
        }
        self.optional.track_id3[index] = Some(blob);
        Ok(())
    }

    /// Clears the per-track ID3 blob at `index`, leaving the slot present but empty.
    pub fn clear_track_id3(&mut self, index: usize) -> Result<()> {
        self.verify_write_position(self.optional.track_id3_pos)?;
        if let Some(slot) = self.optional.track_id3.get_mut(index) {
            *slot = None;
        }
        Ok(())
    }

    /// Sets the manufacturer block, subject to the writability predicate.
    pub fn set_manufacturer(&mut self, id: [u8; 4], data: Vec<u8>) -> Result<()> {
        self.verify_write_position(self.optional.manufacturer_pos)?;
        self.optional.manufacturer = Some(Manufacturer { id, data });
        Ok(())
    }

    /// Sets disc-info fields (EMID/artist/title live together inside `DIIN`, gated by
    /// the same cached position as markers).
    pub fn set_disc_info(&mut self, info: DiscInfo) -> Result<()> {
        self.verify_write_position(self.optional.diin_pos)?;
        self.optional.disc_info = info;
        Ok(())
    }

    /// Appends a marker, subject to the same `DIIN`-scoped writability check as disc
    /// info.
    pub fn add_marker(&mut self, marker: Marker) -> Result<()> {
        self.verify_write_position(self.optional.diin_pos)?;
        self.optional.markers.push(marker);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::AudioType as AT;
    use dsdiff_core::marker::MarkerKind;

    #[test]
    fn start_timecode_round_trips_through_finalize() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tc.dff");
        let mut handle = DsdiffHandle::create(&path, AT::Dsd, 1, 1, 44_100).unwrap();
        handle
            .set_start_timecode(Timecode { hours: 0, minutes: 0, seconds: 59, samples: 44_100 + 500 })
            .unwrap();
        handle.write_dsd(&[1, 2]).unwrap();
        handle.finalize().unwrap();
        handle.close().unwrap();

        let reopened = DsdiffHandle::open(&path).unwrap();
        assert_eq!(reopened.sound_data_size(), 2);
    }

    #[test]
    fn comment_rejected_once_chunk_locked_in_modify_mode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("locked.dff");
        let mut handle = DsdiffHandle::create(&path, AT::Dsd, 1, 1, 44_100).unwrap();
        handle.write_dsd(&[1, 2, 3, 4]).unwrap();
        handle
            .add_comment(Comment {
                year: 2024,
                month: 1,
                day: 1,
                hour: 0,
                minute: 0,
                kind: 0,
                reference: 0,
                text: "hi".into(),
            })
            .unwrap();
        handle.finalize().unwrap();
        handle.close().unwrap();

        let mut reopened = DsdiffHandle::modify(&path).unwrap();
        let result = reopened.add_comment(Comment {
            year: 2024,
            month: 2,
            day: 2,
            hour: 0,
            minute: 0,
            kind: 0,
            reference: 0,
            text: "late".into(),
        });
        assert!(matches!(result, Err(Error::ChunkLocked)));
    }

    #[test]
    fn marker_add_then_sort_orders_by_sample_position() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mark.dff");
        let mut handle = DsdiffHandle::create(&path, AT::Dsd, 1, 1, 44_100).unwrap();
        handle
            .add_marker(Marker {
                timecode: Timecode { hours: 0, minutes: 0, seconds: 2, samples: 0 },
                sample_offset: 0,
                kind: MarkerKind::IndexMarker,
                channel: 0,
                track_flags: 0,
                text: "late".into(),
            })
            .unwrap();
        handle
            .add_marker(Marker {
                timecode: Timecode { hours: 0, minutes: 0, seconds: 1, samples: 0 },
                sample_offset: 0,
                kind: MarkerKind::TrackStart,
                channel: 0,
                track_flags: 0,
                text: "early".into(),
            })
            .unwrap();
        handle.markers_mut().sort(44_100);
        let texts: Vec<&str> = handle.markers().iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["early", "late"]);
    }
}
