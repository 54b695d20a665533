//! The `Source`/`Sink`/`Transform` contracts every pipeline stage implements, plus the
//! track/progress types threaded between them and the orchestrator.

use crate::buffer::RefBuffer;
use crate::format::{Capabilities, Format};
use dsdiff_core::errors::Result;
use dsdiff_core::marker::MarkerList;

/// One selectable unit of audio within a source: a single-track source reports
/// exactly one, a single-file multi-track source (per `SINGLE_FILE_MULTI_TRACK`)
/// reports one per embedded track.
#[derive(Debug, Clone)]
pub struct TrackInfo {
    pub index: usize,
    pub format: Format,
    pub sample_frame_count: Option<u64>,
    pub markers: MarkerList,
}

/// Progress reported by the orchestrator after each batch, in sample frames.
#[derive(Debug, Clone, Copy, Default)]
pub struct Progress {
    pub track_index: usize,
    pub frames_done: u64,
    pub frames_total: Option<u64>,
}

/// A producer of audio frames. Implemented by `dsdiff_source::DsdiffSource` and by any
/// other format this crate is taught to read.
pub trait Source: Send {
    /// The capabilities this source can emit (`ACCEPTS_*` bits describe what it
    /// *produces* here, read by the orchestrator when choosing transforms).
    fn capabilities(&self) -> Capabilities;

    /// Enumerates the tracks available for selection.
    fn tracks(&self) -> &[TrackInfo];

    /// Seeks to the start of `track_index` ahead of a batch read loop.
    fn select_track(&mut self, track_index: usize) -> Result<()>;

    /// Reads the next frame of the selected track into a fresh buffer drawn from
    /// `pool`, or returns `Ok(None)` once the track is exhausted.
    fn read_frame(&mut self, pool: &crate::buffer::BufferPool) -> Result<Option<RefBuffer>>;
}

/// A consumer of audio frames. Implemented by `dsdiff_sink::DsdiffSink` and by any
/// other format this crate is taught to write.
pub trait Sink: Send {
    fn capabilities(&self) -> Capabilities;

    /// Called once per track before its frames start arriving.
    fn begin_track(&mut self, track: &TrackInfo) -> Result<()>;

    /// Consumes one frame.
    fn write_frame(&mut self, frame: &RefBuffer) -> Result<()>;

    /// Called once a track's frames have all been delivered.
    fn end_track(&mut self) -> Result<()>;

    /// Flushes and finalizes any buffered state; called once after the last track.
    fn finish(&mut self) -> Result<()>;
}

/// An in-place or format-converting stage between a source and a sink.
pub trait Transform: Send {
    /// The input kinds this transform accepts and the output kinds it can produce,
    /// reported together since a transform's input/output capability bits are
    /// disjoint halves of the same `Capabilities` value by convention (input bits set
    /// on the value returned from `input_capabilities`, output from
    /// `output_capabilities`).
    fn input_capabilities(&self) -> Capabilities;
    fn output_capabilities(&self) -> Capabilities;

    /// The format this transform produces given an input format, without yet
    /// processing any frames.
    fn output_format(&self, input: Format) -> Format;

    /// Transforms one input frame into one output frame, drawing the output buffer
    /// from `pool`.
    fn process(&mut self, input: &RefBuffer, pool: &crate::buffer::BufferPool) -> Result<RefBuffer>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capabilities_accepts_is_usable_from_trait_consumers() {
        let caps = Capabilities::ACCEPTS_DSD | Capabilities::ACCEPTS_PCM;
        assert!(caps.accepts(crate::format::Kind::DsdRaw));
    }
}
