// dsdiff-format
// Copyright (c) 2026 The dsdiff-rs Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bidirectional DSDIFF container engine: read, write, and in-place modify, with a
//! DST random-access index.

mod audio_io;
mod channel;
mod create;
mod finalize;
mod handle;
mod metadata;
mod parse;
mod tags;

pub use dsdiff_core::marker::{Marker, MarkerKind, MarkerList, Timecode};
pub use handle::{AudioType, Comment, DiscInfo, DsdiffHandle, DstIndexEntry, Id3Blob, Manufacturer};
