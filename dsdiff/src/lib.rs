// dsdiff
// Copyright (c) 2026 The dsdiff-rs Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Facade crate: re-exports the public surface of `dsdiff-core`, `dsdiff-format`, and
//! `dsdiff-pipeline` under one name, and adds the one concrete alternative-container
//! sink the system ships, [`dsf::DsfSink`].

pub mod dsf;

pub use dsdiff_core::errors::{Error, Result};
pub use dsdiff_core::marker::{Marker, MarkerKind, MarkerList, Timecode};
pub use dsdiff_format::{AudioType, Comment, DiscInfo, DsdiffHandle, DstIndexEntry, Id3Blob, Manufacturer};
pub use dsdiff_pipeline::{
    BufferPool, Capabilities, DsdiffSink, DsdiffSource, Format, FrameFlags, Kind, Pipeline, PipelineBuffer,
    Progress, RefBuffer, Sink, Source, Transform, TrackInfo,
};
pub use dsf::DsfSink;

/// Convenience constructor for a [`Pipeline`] reading the given DSDIFF file.
pub fn open_dsdiff_pipeline(path: impl AsRef<std::path::Path>) -> Result<Pipeline> {
    let source = DsdiffSource::open(path)?;
    Ok(Pipeline::new(Box::new(source)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_dsdiff_pipeline_builds_a_runnable_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipe.dff");
        let mut writer = DsdiffHandle::create(&path, AudioType::Dsd, 1, 1, 44_100).unwrap();
        writer.write_dsd(&[1, 2, 3, 4]).unwrap();
        writer.finalize().unwrap();
        writer.close().unwrap();

        let mut pipeline = open_dsdiff_pipeline(&path).unwrap();
        let out_path = dir.path().join("out.dff");
        let sink = DsdiffSink::create(&out_path, Format::dsd_raw(44_100, 1)).unwrap();
        pipeline.add_sink(None, Box::new(sink)).unwrap();
        pipeline.run(0).unwrap();
        pipeline.finish().unwrap();

        let reopened = DsdiffHandle::open(&out_path).unwrap();
        assert_eq!(reopened.sound_data_size(), 4);
    }
}
