//! Fan-out correctness: every sink leg gets exactly one `write_frame` call per frame,
//! carrying the same frame number, sample offset, track index, and boundary flags the
//! source attached to it — even across a transform that allocates a fresh output
//! buffer from a different pool.

use dsdiff_format::{AudioType, DsdiffHandle};
use dsdiff_pipeline::buffer::RefBuffer;
use dsdiff_pipeline::format::{Capabilities, FrameFlags};
use dsdiff_pipeline::transforms::dsd_to_pcm::{DsdToPcmTransform, SinglePoleDecimator};
use dsdiff_pipeline::{DsdiffSource, Pipeline, Sink, TrackInfo};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq)]
struct Seen {
    frame_number: u64,
    sample_offset: u64,
    track: usize,
    flags: FrameFlags,
}

#[derive(Clone, Default)]
struct RecordingSink {
    frames: Arc<Mutex<Vec<Seen>>>,
}

impl Sink for RecordingSink {
    fn capabilities(&self) -> Capabilities {
        Capabilities::ACCEPTS_DSD | Capabilities::ACCEPTS_PCM
    }

    fn begin_track(&mut self, _track: &TrackInfo) -> dsdiff_core::errors::Result<()> {
        Ok(())
    }

    fn write_frame(&mut self, frame: &RefBuffer) -> dsdiff_core::errors::Result<()> {
        self.frames.lock().unwrap().push(Seen {
            frame_number: frame.frame_number(),
            sample_offset: frame.sample_offset(),
            track: frame.track(),
            flags: frame.flags(),
        });
        Ok(())
    }

    fn end_track(&mut self) -> dsdiff_core::errors::Result<()> {
        Ok(())
    }

    fn finish(&mut self) -> dsdiff_core::errors::Result<()> {
        Ok(())
    }
}

fn write_source(path: &std::path::Path, bytes: &[u8]) {
    let mut writer = DsdiffHandle::create(path, AudioType::Dsd, 1, 1, 44_100).unwrap();
    writer.write_dsd(bytes).unwrap();
    writer.finalize().unwrap();
    writer.close().unwrap();
}

#[test]
fn both_legs_see_identical_per_frame_metadata() {
    let dir = tempfile::tempdir().unwrap();
    let src_path = dir.path().join("src.dff");
    write_source(&src_path, &[1, 2, 3, 4, 5, 6]);

    let source = DsdiffSource::open(&src_path).unwrap();
    let mut pipeline = Pipeline::new(Box::new(source));
    pipeline.set_batch_size(16);

    let raw_sink = RecordingSink::default();
    let pcm_sink = RecordingSink::default();
    pipeline.add_sink(None, Box::new(raw_sink.clone())).unwrap();
    pipeline
        .add_sink(Some(Box::new(DsdToPcmTransform::new(SinglePoleDecimator::new(1, 0.5, 8)))), Box::new(pcm_sink.clone()))
        .unwrap();

    pipeline.run(0).unwrap();
    pipeline.finish().unwrap();

    let raw_frames = raw_sink.frames.lock().unwrap().clone();
    let pcm_frames = pcm_sink.frames.lock().unwrap().clone();

    assert_eq!(raw_frames.len(), 1, "6 bytes fit in a single DSD pool slot");
    assert_eq!(raw_frames, pcm_frames, "a transform leg must carry the input frame's metadata to its output");

    let only = raw_frames[0];
    assert_eq!(only.frame_number, 0);
    assert_eq!(only.sample_offset, 0);
    assert_eq!(only.track, 0);
    assert!(only.flags.contains(FrameFlags::TRACK_START));
    assert!(only.flags.contains(FrameFlags::TRACK_END));
    assert!(only.flags.contains(FrameFlags::EOF));
}

#[test]
fn multi_batch_run_tags_ascending_frame_numbers_and_only_the_last_frame_ends_the_track() {
    let dir = tempfile::tempdir().unwrap();
    let src_path = dir.path().join("src2.dff");
    write_source(&src_path, &vec![0xAAu8; dsdiff_pipeline::buffer::DSD_SLOT_BYTES * 3]);

    let source = DsdiffSource::open(&src_path).unwrap();
    let mut pipeline = Pipeline::new(Box::new(source));

    let sink = RecordingSink::default();
    pipeline.add_sink(None, Box::new(sink.clone())).unwrap();

    pipeline.run(0).unwrap();
    pipeline.finish().unwrap();

    let frames = sink.frames.lock().unwrap().clone();
    assert_eq!(frames.len(), 3);
    for (i, frame) in frames.iter().enumerate() {
        assert_eq!(frame.frame_number, i as u64);
        assert_eq!(frame.track, 0);
        assert_eq!(frame.flags.contains(FrameFlags::TRACK_START), i == 0);
        let is_last = i == frames.len() - 1;
        assert_eq!(frame.flags.contains(FrameFlags::TRACK_END), is_last);
        assert_eq!(frame.flags.contains(FrameFlags::EOF), is_last);
    }
    assert!(frames.windows(2).all(|w| w[1].sample_offset > w[0].sample_offset));
}
