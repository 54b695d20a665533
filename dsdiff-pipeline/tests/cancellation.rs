//! Cancellation liveness: a run asked to stop mid-flight returns `Cancelled` promptly
//! and leaves every checked-out buffer back in its pool, via either of the two ways a
//! caller can request cancellation — the progress callback's return value, or setting
//! the external `cancellation_handle()` flag (observed at the top of the next batch).

use dsdiff_core::errors::Error;
use dsdiff_format::{AudioType, DsdiffHandle};
use dsdiff_pipeline::buffer::DSD_SLOT_BYTES;
use dsdiff_pipeline::{DsdiffSink, DsdiffSource, Format, Pipeline};
use std::sync::atomic::Ordering;

fn write_source(path: &std::path::Path) {
    // Five full pool slots' worth of audio: enough for the reader to outrun a single
    // default-sized batch (4 frames) and leave a second batch still pending.
    let mut writer = DsdiffHandle::create(path, AudioType::Dsd, 1, 1, 44_100).unwrap();
    writer.write_dsd(&vec![0xAAu8; DSD_SLOT_BYTES * 5]).unwrap();
    writer.finalize().unwrap();
    writer.close().unwrap();
}

#[test]
fn progress_callback_returning_true_cancels_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let src_path = dir.path().join("src.dff");
    write_source(&src_path);

    let source = DsdiffSource::open(&src_path).unwrap();
    let mut pipeline = Pipeline::new(Box::new(source));

    let out_path = dir.path().join("out.dff");
    let sink = DsdiffSink::create(&out_path, Format::dsd_raw(44_100, 1)).unwrap();
    pipeline.add_sink(None, Box::new(sink)).unwrap();

    pipeline.set_progress_callback(|progress| progress.frames_done > 0);

    let result = pipeline.run(0);
    assert!(matches!(result, Err(Error::Cancelled)), "expected Cancelled, got {result:?}");
    assert_eq!(pipeline.dsd_pool().outstanding_count(), 0, "every checked-out DSD slot should be idle again");
}

#[test]
fn cancellation_handle_cancels_the_run_independently_of_the_callbacks_return_value() {
    let dir = tempfile::tempdir().unwrap();
    let src_path = dir.path().join("src.dff");
    write_source(&src_path);

    let source = DsdiffSource::open(&src_path).unwrap();
    let mut pipeline = Pipeline::new(Box::new(source));

    let out_path = dir.path().join("out.dff");
    let sink = DsdiffSink::create(&out_path, Format::dsd_raw(44_100, 1)).unwrap();
    pipeline.add_sink(None, Box::new(sink)).unwrap();

    let cancel = pipeline.cancellation_handle();
    pipeline.set_progress_callback(move |progress| {
        if progress.frames_done > 0 {
            cancel.store(true, Ordering::SeqCst);
        }
        false
    });

    let result = pipeline.run(0);
    assert!(matches!(result, Err(Error::Cancelled)), "expected Cancelled, got {result:?}");
    assert_eq!(pipeline.dsd_pool().outstanding_count(), 0, "every checked-out DSD slot should be idle again");
}
