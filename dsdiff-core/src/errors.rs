// This crate's error taxonomy is a flat enum, a hand-rolled `Display`, and a
// `std::error::Error` impl that exposes the wrapped I/O error as `source()`. No
// `thiserror`/`anyhow` dependency is introduced.

use std::fmt;
use std::io;

/// Every error kind this crate (and its sibling `dsdiff-format`/`dsdiff-pipeline` crates)
/// can produce, grouped into the families described by the design's error handling section.
#[derive(Debug)]
pub enum Error {
    // --- (1) invalid argument / configuration ---
    InvalidArg(&'static str),
    InvalidChannels,
    UnrecognizedAudioType,

    // --- (2) state violations ---
    AlreadyOpen,
    NotOpen,
    ModeReadOnly,
    ModeWriteOnly,
    InvalidMode,
    PostCreateForbidden,
    ChunkLocked,
    AlreadyRunning,
    NotInitialized,

    // --- (3) format violations ---
    InvalidFile(&'static str),
    InvalidVersion,
    InvalidChunk(&'static str),
    UnexpectedEof,
    UnsupportedCompression,

    // --- (4) I/O failures ---
    ReadFailed(io::Error),
    WriteFailed(io::Error),
    SeekFailed(io::Error),
    FileNotFound(io::Error),
    FileCreateFailed(io::Error),
    MaxFileSize,
    BufferTooSmall,

    // --- (5) missing optional data ---
    NoChannelInfo,
    NoTimecode,
    NoLsConfig,
    NoComment,
    NoEmid,
    NoArtist,
    NoTitle,
    NoMarker,
    NoManufacturer,
    NoDstIndex,

    // --- (6) feature constraints ---
    RequiresDsd,
    RequiresDst,
    CrcAlreadyPresent,
    TrackIndexInvalid,
    NoTrackId3,
    FlacUnavailable,

    /// End of the sound data region was reached during a read.
    EndOfData,

    /// Cooperative cancellation requested by the caller. Distinguishable from failure.
    Cancelled,

    Other(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidArg(what) => write!(f, "invalid argument: {what}"),
            Error::InvalidChannels => write!(f, "invalid or out-of-range channel configuration"),
            Error::UnrecognizedAudioType => write!(f, "unrecognized audio type"),
            Error::AlreadyOpen => write!(f, "handle is already open"),
            Error::NotOpen => write!(f, "handle is not open"),
            Error::ModeReadOnly => write!(f, "operation requires a writable handle"),
            Error::ModeWriteOnly => write!(f, "operation requires a readable handle"),
            Error::InvalidMode => write!(f, "operation is not valid in the current mode"),
            Error::PostCreateForbidden => {
                write!(f, "operation is forbidden once sound data has been written")
            }
            Error::ChunkLocked => write!(f, "chunk position is locked by existing sound data"),
            Error::AlreadyRunning => write!(f, "pipeline is already running"),
            Error::NotInitialized => write!(f, "pipeline has not been initialized"),
            Error::InvalidFile(desc) => write!(f, "invalid file: {desc}"),
            Error::InvalidVersion => write!(f, "unsupported format version"),
            Error::InvalidChunk(desc) => write!(f, "invalid chunk: {desc}"),
            Error::UnexpectedEof => write!(f, "unexpected end of file"),
            Error::UnsupportedCompression => write!(f, "unsupported compression type"),
            Error::ReadFailed(_) => write!(f, "read failed"),
            Error::WriteFailed(_) => write!(f, "write failed"),
            Error::SeekFailed(_) => write!(f, "seek failed"),
            Error::FileNotFound(_) => write!(f, "file not found"),
            Error::FileCreateFailed(_) => write!(f, "file creation failed"),
            Error::MaxFileSize => write!(f, "maximum file size exceeded"),
            Error::BufferTooSmall => write!(f, "supplied buffer is too small"),
            Error::NoChannelInfo => write!(f, "no channel information present"),
            Error::NoTimecode => write!(f, "no start timecode present"),
            Error::NoLsConfig => write!(f, "no loudspeaker configuration present"),
            Error::NoComment => write!(f, "no comment present"),
            Error::NoEmid => write!(f, "no EMID present"),
            Error::NoArtist => write!(f, "no artist present"),
            Error::NoTitle => write!(f, "no title present"),
            Error::NoMarker => write!(f, "no marker present"),
            Error::NoManufacturer => write!(f, "no manufacturer block present"),
            Error::NoDstIndex => write!(f, "no DST index present"),
            Error::RequiresDsd => write!(f, "operation requires a DSD stream"),
            Error::RequiresDst => write!(f, "operation requires a DST stream"),
            Error::CrcAlreadyPresent => write!(f, "CRC has already been committed for this stream"),
            Error::TrackIndexInvalid => write!(f, "track index is out of range"),
            Error::NoTrackId3 => write!(f, "no per-track ID3 block at this index"),
            Error::FlacUnavailable => write!(f, "FLAC support is unavailable"),
            Error::EndOfData => write!(f, "end of sound data"),
            Error::Cancelled => write!(f, "operation was cancelled"),
            Error::Other(desc) => write!(f, "error: {desc}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::ReadFailed(e)
            | Error::WriteFailed(e)
            | Error::SeekFailed(e)
            | Error::FileNotFound(e)
            | Error::FileCreateFailed(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        match err.kind() {
            io::ErrorKind::UnexpectedEof => Error::UnexpectedEof,
            io::ErrorKind::NotFound => Error::FileNotFound(err),
            _ => Error::ReadFailed(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Convenience constructor for a decode/format error.
pub fn invalid_chunk_error<T>(desc: &'static str) -> Result<T> {
    Err(Error::InvalidChunk(desc))
}

/// Convenience constructor for an invalid-file error.
pub fn invalid_file_error<T>(desc: &'static str) -> Result<T> {
    Err(Error::InvalidFile(desc))
}

/// Convenience constructor for an unsupported-feature error.
pub fn unsupported_error<T>(desc: &'static str) -> Result<T> {
    Err(Error::Other(desc))
}

/// Convenience constructor for an end-of-data error.
pub fn end_of_data_error<T>() -> Result<T> {
    Err(Error::EndOfData)
}
