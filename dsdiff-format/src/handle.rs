//! The in-memory projection of one DSDIFF file: `DsdiffHandle` and the value types
//! grouped under it, mirroring the "grouped by concern" data model.

use dsdiff_core::io::{ByteStream, OpenMode};
use dsdiff_core::marker::{MarkerList, Timecode};
use std::fs::File;

/// The sound encoding carried by a DSDIFF file. DST is decoded, never produced, per
/// the system's non-goals — `Dst` still appears here because a handle may *read* one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioType {
    Dsd,
    Dst,
}

/// A (byte offset, byte length) pair for one compressed DST frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DstIndexEntry {
    pub offset: u64,
    pub length: u32,
}

/// The amount by which the in-memory DST index grows each time it runs out of room,
/// per the design's amortized-growth note.
pub const DST_INDEX_GROWTH_STEP: usize = 1000;

/// `file state`: mode, format version, final size once finalized.
#[derive(Debug, Clone)]
pub(crate) struct FileState {
    pub mode: OpenMode,
    /// Only the major version is validated (must be 1); minor/revision/build are
    /// round-tripped but otherwise unexamined, matching the parser's behavior.
    pub version: (u8, u8, u8, u8),
    pub final_size: Option<u64>,
}

impl Default for FileState {
    fn default() -> Self {
        FileState { mode: OpenMode::Write, version: (1, 5, 0, 0), final_size: None }
    }
}

/// `audio format`: channel layout, sample rate, compression, frame count.
#[derive(Debug, Clone, Default)]
pub(crate) struct AudioFormat {
    pub channel_count: u16,
    pub channel_ids: Vec<u16>,
    pub sample_rate: u32,
    pub audio_type: Option<AudioType>,
    pub sample_frame_count: u64,
}

/// `sound-data positions`: cached byte offsets into the file being built/read.
#[derive(Debug, Clone, Default)]
pub(crate) struct SoundDataPositions {
    pub prop_header_pos: u64,
    pub prop_size: u64,
    pub chnl_pos: u64,
    pub sound_data_size: u64,
    pub sound_header_pos: u64,
    pub sound_data_start: u64,
    pub sound_data_end: u64,
    /// The sound-container header position as it was just before the most recent
    /// `insert_prop_chunk` call (used to place the newly-inserted ABSS/LSCO chunk at
    /// the position it now occupies).
    pub sound_header_pos_before_last_insert: u64,
}

/// One comment record (`COMT`).
#[derive(Debug, Clone)]
pub struct Comment {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub kind: u16,
    pub reference: u16,
    pub text: String,
}

/// Manufacturer block (`MANF`): a 4-byte vendor id plus an opaque blob.
#[derive(Debug, Clone)]
pub struct Manufacturer {
    pub id: [u8; 4],
    pub data: Vec<u8>,
}

/// Disc info carried inside `DIIN`: EMID, artist, title.
#[derive(Debug, Clone, Default)]
pub struct DiscInfo {
    pub emid: Option<String>,
    pub artist: Option<String>,
    pub title: Option<String>,
}

/// An opaque, file- or track-scoped ID3v2 blob. Layout beyond "opaque bytes" is out of
/// scope; we carry it and nothing more.
pub type Id3Blob = Vec<u8>;

/// Every optional block a handle may carry, each tracked with its cached file position
/// (`0` meaning "never placed", per the writability predicate).
#[derive(Debug, Clone, Default)]
pub(crate) struct OptionalBlocks {
    pub has_timecode: bool,
    pub timecode_pos: u64,
    pub timecode: Timecode,

    pub has_ls_config: bool,
    pub ls_config_pos: u64,
    pub ls_config: u16,

    pub comments: Vec<Comment>,
    pub comt_pos: u64,

    pub file_id3: Option<Id3Blob>,
    pub file_id3_pos: u64,

    /// Sparse, index-keyed, `None` slots allowed; grows monotonically as higher track
    /// indices are set, per the design's sparse-array note.
    pub track_id3: Vec<Option<Id3Blob>>,
    pub track_id3_pos: u64,

    pub manufacturer: Option<Manufacturer>,
    pub manufacturer_pos: u64,

    pub disc_info: DiscInfo,
    pub diin_pos: u64,

    pub markers: MarkerList,
}

/// DST-specific state: frame bookkeeping, CRC policy, and the random-access index.
#[derive(Debug, Clone, Default)]
pub(crate) struct DstState {
    pub frame_count: u32,
    pub frame_rate: u16,
    pub has_crc: bool,
    pub crc_size: u32,
    pub dst_data_end: u64,
    pub has_index: bool,
    pub index: Vec<DstIndexEntry>,
    pub dsti_pos: u64,
    pub dsti_size: u64,
}

pub(crate) const DEFAULT_DST_FRAME_RATE: u16 = 75;

/// The in-memory projection of one DSDIFF file. All cached positions are plain
/// integers — there is no back-pointer from a chunk to the handle; instead every
/// operation threads the handle through explicitly.
pub struct DsdiffHandle {
    pub(crate) file: FileState,
    pub(crate) audio: AudioFormat,
    pub(crate) sound: SoundDataPositions,
    pub(crate) optional: OptionalBlocks,
    pub(crate) dst: DstState,
    pub(crate) path: Option<std::path::PathBuf>,
    /// `None` when the handle has not been opened, or after `close()`.
    pub(crate) stream: Option<ByteStream<File>>,
}

impl Default for DsdiffHandle {
    fn default() -> Self {
        DsdiffHandle {
            file: FileState::default(),
            audio: AudioFormat::default(),
            sound: SoundDataPositions::default(),
            optional: OptionalBlocks::default(),
            dst: DstState { frame_rate: DEFAULT_DST_FRAME_RATE, ..DstState::default() },
            path: None,
            stream: None,
        }
    }
}

impl DsdiffHandle {
    /// Allocates an unopened handle with defaults (version 1.5.0.0, DST frame rate 75,
    /// mode Write until `open`/`create`/`modify` is called).
    pub fn new() -> Self {
        DsdiffHandle::default()
    }

    pub fn mode(&self) -> OpenMode {
        self.file.mode
    }

    pub fn channel_count(&self) -> u16 {
        self.audio.channel_count
    }

    pub fn channel_ids(&self) -> &[u16] {
        &self.audio.channel_ids
    }

    pub fn sample_rate(&self) -> u32 {
        self.audio.sample_rate
    }

    pub fn audio_type(&self) -> Option<AudioType> {
        self.audio.audio_type
    }

    pub fn is_dst(&self) -> bool {
        self.audio.audio_type == Some(AudioType::Dst)
    }

    pub fn sample_frame_count(&self) -> u64 {
        self.audio.sample_frame_count
    }

    pub fn sound_data_size(&self) -> u64 {
        self.sound.sound_data_size
    }

    pub fn dst_frame_count(&self) -> u32 {
        self.dst.frame_count
    }

    pub fn dst_frame_rate(&self) -> u16 {
        self.dst.frame_rate
    }

    pub fn has_dst_index(&self) -> bool {
        self.dst.has_index
    }

    pub fn markers(&self) -> &MarkerList {
        &self.optional.markers
    }

    pub fn markers_mut(&mut self) -> &mut MarkerList {
        &mut self.optional.markers
    }

    pub fn comments(&self) -> &[Comment] {
        &self.optional.comments
    }

    pub fn disc_info(&self) -> &DiscInfo {
        &self.optional.disc_info
    }

    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    pub(crate) fn stream_mut(&mut self) -> dsdiff_core::Result<&mut ByteStream<File>> {
        self.stream.as_mut().ok_or(dsdiff_core::Error::NotOpen)
    }
}
