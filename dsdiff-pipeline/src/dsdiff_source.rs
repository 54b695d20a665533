//! A [`Source`] wrapping a read-mode `DsdiffHandle`, splitting the single continuous
//! sound stream into tracks at `TrackStart`/`TrackStop` marker pairs when present, or
//! exposing the whole stream as one track otherwise.

use crate::buffer::{BufferPool, RefBuffer};
use crate::format::{Capabilities, Format, FrameFlags};
use crate::traits::{Source, TrackInfo};
use dsdiff_core::errors::{Error, Result};
use dsdiff_core::io::SeekOrigin;
use dsdiff_core::marker::{MarkerKind, MarkerList};
use dsdiff_format::{AudioType, DsdiffHandle};
use std::path::Path;

/// One track's sample-frame span within the underlying stream, `[start, end)`.
#[derive(Debug, Clone, Copy)]
struct Span {
    start: u64,
    end: u64,
}

pub struct DsdiffSource {
    handle: DsdiffHandle,
    tracks: Vec<TrackInfo>,
    spans: Vec<Span>,
    current: Option<usize>,
    frame_counter: u64,
}

impl DsdiffSource {
    pub fn open(path: impl AsRef<Path>) -> Result<DsdiffSource> {
        let handle = DsdiffHandle::open(path)?;
        let (tracks, spans) = build_tracks(&handle);
        Ok(DsdiffSource { handle, tracks, spans, current: None, frame_counter: 0 })
    }
}

fn build_tracks(handle: &DsdiffHandle) -> (Vec<TrackInfo>, Vec<Span>) {
    let format = source_format(handle);
    let total = handle.sample_frame_count();
    let starts = track_starts(handle.markers());

    if starts.is_empty() || handle.is_dst() {
        let track = TrackInfo {
            index: 0,
            format,
            sample_frame_count: Some(total),
            markers: handle.markers().clone(),
        };
        return (vec![track], vec![Span { start: 0, end: total }]);
    }

    let spans: Vec<Span> = starts
        .iter()
        .enumerate()
        .map(|(i, &start)| Span { start, end: starts.get(i + 1).copied().unwrap_or(total) })
        .collect();
    let tracks = spans
        .iter()
        .enumerate()
        .map(|(index, span)| TrackInfo {
            index,
            format,
            sample_frame_count: Some(span.end.saturating_sub(span.start)),
            markers: MarkerList::new(),
        })
        .collect();
    (tracks, spans)
}

/// Absolute sample-frame position of each `TrackStart` marker, ascending, assuming the
/// list has already been sorted by the caller (as `finalize` does before writing).
fn track_starts(markers: &MarkerList) -> Vec<u64> {
    markers
        .iter()
        .filter(|m| m.kind == MarkerKind::TrackStart)
        .map(|m| m.sample_offset.max(0) as u64)
        .collect()
}

fn source_format(handle: &DsdiffHandle) -> Format {
    match handle.audio_type() {
        Some(AudioType::Dst) => {
            Format::dst(handle.sample_rate(), handle.channel_count(), handle.dst_frame_rate())
        }
        _ => Format::dsd_raw(handle.sample_rate(), handle.channel_count()),
    }
}

impl Source for DsdiffSource {
    fn capabilities(&self) -> Capabilities {
        let multi_track = Capabilities::SUPPORTS_MARKERS | Capabilities::SINGLE_FILE_MULTI_TRACK;
        match self.handle.audio_type() {
            Some(AudioType::Dst) => Capabilities::ACCEPTS_DST | multi_track,
            _ => Capabilities::ACCEPTS_DSD | multi_track,
        }
    }

    fn tracks(&self) -> &[TrackInfo] {
        &self.tracks
    }

    fn select_track(&mut self, track_index: usize) -> Result<()> {
        let span = *self.spans.get(track_index).ok_or(Error::TrackIndexInvalid)?;
        if self.handle.is_dst() {
            // DST frames aren't sample-addressable; a track boundary only makes sense
            // at a frame boundary, so non-zero starts are rejected rather than
            // silently rounded.
            if span.start != 0 {
                return Err(Error::TrackIndexInvalid);
            }
            self.handle.seek_dst_frame(0)?;
        }
        else {
            self.handle.seek_dsd(span.start as i64, SeekOrigin::Set(0))?;
        }
        self.current = Some(track_index);
        self.frame_counter = 0;
        Ok(())
    }

    fn read_frame(&mut self, pool: &BufferPool) -> Result<Option<RefBuffer>> {
        let track_index = self.current.ok_or(Error::NotInitialized)?;
        let span = self.spans[track_index];
        let format = source_format(&self.handle);

        if self.handle.is_dst() {
            let mut buf = pool.acquire(format);
            let cap = buf.capacity().len();
            let mut scratch = vec![0u8; cap];
            return match self.handle.read_dst_frame(&mut scratch) {
                Ok(n) => {
                    buf.capacity()[..n].copy_from_slice(&scratch[..n]);
                    buf.set_len(n);
                    let frame_number = self.frame_counter;
                    let mut flags = FrameFlags::empty();
                    if frame_number == 0 {
                        flags |= FrameFlags::TRACK_START;
                    }
                    // DST frame boundaries aren't sample-addressable, and a DST file is
                    // always exposed as a single whole-stream track, so the frame that
                    // fills less than the scratch buffer is the last one.
                    if n < cap {
                        flags |= FrameFlags::TRACK_END | FrameFlags::EOF;
                    }
                    buf.set_meta(frame_number, frame_number, track_index, flags);
                    self.frame_counter += 1;
                    Ok(Some(buf))
                }
                Err(Error::EndOfData) => Ok(None),
                Err(e) => Err(e),
            };
        }

        let channels = format.channels.max(1) as u64;
        let consumed = self.handle.seek_dsd(0, SeekOrigin::Cur(0))?;
        if consumed >= span.end {
            return Ok(None);
        }
        let remaining_bytes = (span.end - consumed) * channels;

        let mut buf = pool.acquire(format);
        let want = (buf.capacity().len() as u64).min(remaining_bytes) as usize;
        match self.handle.read_dsd(&mut buf.capacity()[..want]) {
            Ok(0) => Ok(None),
            Ok(n) => {
                buf.set_len(n);
                let frame_number = self.frame_counter;
                let frames_read = n as u64 / channels;
                let mut flags = FrameFlags::empty();
                if frame_number == 0 {
                    flags |= FrameFlags::TRACK_START;
                }
                if consumed + frames_read >= span.end {
                    flags |= FrameFlags::TRACK_END;
                    if span.end >= self.handle.sample_frame_count() {
                        flags |= FrameFlags::EOF;
                    }
                }
                buf.set_meta(frame_number, consumed, track_index, flags);
                self.frame_counter += 1;
                Ok(Some(buf))
            }
            Err(Error::EndOfData) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dsdiff_format::AudioType as AT;

    #[test]
    fn single_track_source_reports_whole_stream() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("src.dff");
        let mut writer = DsdiffHandle::create(&path, AT::Dsd, 2, 1, 2_822_400).unwrap();
        writer.write_dsd(&[0u8; 200]).unwrap();
        writer.finalize().unwrap();
        writer.close().unwrap();

        let source = DsdiffSource::open(&path).unwrap();
        assert_eq!(source.tracks().len(), 1);
        assert_eq!(source.tracks()[0].sample_frame_count, Some(100));
    }

    #[test]
    fn read_frame_drains_then_reports_done() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("src2.dff");
        let mut writer = DsdiffHandle::create(&path, AT::Dsd, 1, 1, 44_100).unwrap();
        writer.write_dsd(&[1, 2, 3, 4]).unwrap();
        writer.finalize().unwrap();
        writer.close().unwrap();

        let mut source = DsdiffSource::open(&path).unwrap();
        source.select_track(0).unwrap();
        let pool = BufferPool::new(2);
        let first = source.read_frame(&pool).unwrap().expect("first chunk");
        assert_eq!(first.as_slice(), &[1, 2]);
        let second = source.read_frame(&pool).unwrap().expect("second chunk");
        assert_eq!(second.as_slice(), &[3, 4]);
        assert!(source.read_frame(&pool).unwrap().is_none());
    }

    #[test]
    fn read_frame_tags_frame_number_track_and_boundary_flags() {
        use crate::format::FrameFlags;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("src3.dff");
        let mut writer = DsdiffHandle::create(&path, AT::Dsd, 1, 1, 44_100).unwrap();
        writer.write_dsd(&[1, 2, 3, 4]).unwrap();
        writer.finalize().unwrap();
        writer.close().unwrap();

        let mut source = DsdiffSource::open(&path).unwrap();
        source.select_track(0).unwrap();
        let pool = BufferPool::new(2);

        let first = source.read_frame(&pool).unwrap().expect("first chunk");
        assert_eq!(first.frame_number(), 0);
        assert_eq!(first.sample_offset(), 0);
        assert_eq!(first.track(), 0);
        assert!(first.flags().contains(FrameFlags::TRACK_START));
        assert!(!first.flags().contains(FrameFlags::TRACK_END));

        let second = source.read_frame(&pool).unwrap().expect("second chunk");
        assert_eq!(second.frame_number(), 1);
        assert_eq!(second.sample_offset(), 2);
        assert!(!second.flags().contains(FrameFlags::TRACK_START));
        assert!(second.flags().contains(FrameFlags::TRACK_END));
        assert!(second.flags().contains(FrameFlags::EOF));
    }
}
