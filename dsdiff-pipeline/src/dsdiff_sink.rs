//! A [`Sink`] wrapping a write-mode `DsdiffHandle`. One sink instance owns exactly one
//! output file; multi-track sources are folded into it as `TrackStart`/`TrackStop`
//! marker pairs around a single continuous sound stream, since DSDIFF itself has no
//! notion of multiple independent sound containers in one file.

use crate::buffer::RefBuffer;
use crate::format::{Capabilities, Format, Kind};
use crate::traits::{Sink, TrackInfo};
use dsdiff_core::errors::{Error, Result};
use dsdiff_core::marker::{Marker, MarkerKind, Timecode};
use dsdiff_format::{AudioType, DsdiffHandle};
use std::path::Path;

pub struct DsdiffSink {
    handle: DsdiffHandle,
    sample_rate: u32,
    track_start_frame: u64,
}

impl DsdiffSink {
    /// Creates the output file up front; `format` fixes the stream's audio type,
    /// channel count, and sample rate for the lifetime of the sink.
    pub fn create(path: impl AsRef<Path>, format: Format) -> Result<DsdiffSink> {
        let audio_type = match format.kind {
            Kind::DsdRaw => AudioType::Dsd,
            Kind::Dst => AudioType::Dst,
            _ => return Err(Error::RequiresDsd),
        };
        let handle = DsdiffHandle::create(path, audio_type, format.channels, 1, format.sample_rate)?;
        Ok(DsdiffSink { handle, sample_rate: format.sample_rate, track_start_frame: 0 })
    }

    pub fn into_handle(self) -> DsdiffHandle {
        self.handle
    }
}

fn timecode_at(frame: u64, sample_rate: u32) -> Timecode {
    let rate = sample_rate.max(1) as u64;
    let total_seconds = frame / rate;
    let samples = (frame % rate) as u32;
    Timecode {
        hours: (total_seconds / 3600) as u16,
        minutes: ((total_seconds / 60) % 60) as u8,
        seconds: (total_seconds % 60) as u8,
        samples,
    }
}

impl Sink for DsdiffSink {
    fn capabilities(&self) -> Capabilities {
        let multi_track = Capabilities::SUPPORTS_MARKERS | Capabilities::SINGLE_FILE_MULTI_TRACK;
        match self.handle.audio_type() {
            Some(AudioType::Dst) => Capabilities::ACCEPTS_DST | multi_track,
            _ => Capabilities::ACCEPTS_DSD | multi_track,
        }
    }

    fn begin_track(&mut self, track: &TrackInfo) -> Result<()> {
        self.track_start_frame = self.handle.sample_frame_count();
        self.handle.add_marker(Marker {
            timecode: timecode_at(self.track_start_frame, self.sample_rate),
            sample_offset: self.track_start_frame as i64,
            kind: MarkerKind::TrackStart,
            channel: 0,
            track_flags: 0,
            text: format!("track {}", track.index),
        })
    }

    fn write_frame(&mut self, frame: &RefBuffer) -> Result<()> {
        if self.handle.is_dst() {
            self.handle.write_dst_frame(frame.as_slice())
        }
        else {
            self.handle.write_dsd(frame.as_slice())
        }
    }

    fn end_track(&mut self) -> Result<()> {
        let end_frame = self.handle.sample_frame_count();
        self.handle.add_marker(Marker {
            timecode: timecode_at(end_frame, self.sample_rate),
            sample_offset: end_frame as i64,
            kind: MarkerKind::TrackStop,
            channel: 0,
            track_flags: 0,
            text: String::new(),
        })
    }

    fn finish(&mut self) -> Result<()> {
        self.handle.markers_mut().sort(self.sample_rate);
        self.handle.finalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::TrackInfo;
    use dsdiff_core::marker::MarkerList;

    #[test]
    fn sink_writes_track_markers_around_audio() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sink.dff");
        let format = Format::dsd_raw(44_100, 1);
        let mut sink = DsdiffSink::create(&path, format).unwrap();

        let track = TrackInfo { index: 0, format, sample_frame_count: Some(4), markers: MarkerList::new() };
        sink.begin_track(&track).unwrap();

        let pool = crate::buffer::BufferPool::new(8);
        let mut buf = pool.acquire(format);
        buf.capacity()[..4].copy_from_slice(&[1, 2, 3, 4]);
        buf.set_len(4);
        sink.write_frame(&buf).unwrap();
        sink.end_track().unwrap();
        sink.finish().unwrap();

        let handle = sink.into_handle();
        handle.close().unwrap();

        let reopened = DsdiffHandle::open(&path).unwrap();
        assert_eq!(reopened.markers().len(), 2);
    }
}
