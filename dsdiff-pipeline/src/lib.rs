// dsdiff-pipeline
// Copyright (c) 2026 The dsdiff-rs Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A typed source/transform/sink pipeline orchestrator built on top of
//! `dsdiff-format`: a bounded SPSC frame queue decouples reading from processing, and
//! each batch is fanned out one thread per sink.

pub mod buffer;
pub mod dsdiff_sink;
pub mod dsdiff_source;
pub mod format;
pub mod orchestrator;
pub mod queue;
pub mod reader_worker;
pub mod traits;
pub mod transforms;

pub use buffer::{BufferPool, PipelineBuffer, RefBuffer};
pub use dsdiff_sink::DsdiffSink;
pub use dsdiff_source::DsdiffSource;
pub use format::{Capabilities, Format, FrameFlags, Kind};
pub use orchestrator::Pipeline;
pub use queue::FrameQueue;
pub use traits::{Progress, Sink, Source, Transform, TrackInfo};
