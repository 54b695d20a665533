//! Per-chunk-kind encode/decode primitives shared by every chunk the DSDIFF engine
//! reads or writes: the FRM8/chunk header, the channel-id lookup used by `CHNL`, and
//! fixed-length ASCII tag helpers.

use crate::errors::{Error, Result};
use crate::io::{ReadBytes, WriteBytes};

/// A chunk header: a 4-byte ASCII tag plus an 8-byte big-endian payload size. The
/// payload itself, and any pad byte, are handled by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    pub tag: [u8; 4],
    pub size: u64,
}

impl ChunkHeader {
    pub fn read<R: ReadBytes>(reader: &mut R) -> Result<Self> {
        let tag = reader.read_quad_bytes()?;
        let size = reader.read_be_u64()?;
        Ok(ChunkHeader { tag, size })
    }

    pub fn write<W: WriteBytes>(&self, writer: &mut W) -> Result<()> {
        writer.write_quad_bytes(&self.tag)?;
        writer.write_be_u64(self.size)
    }

    /// The number of bytes the payload occupies on disk including its pad byte.
    pub fn padded_size(&self) -> u64 {
        self.size + (self.size % 2)
    }
}

/// Reads one chunk payload's trailing pad byte if `size` is odd. Every chunk known to
/// have a payload (as opposed to only containing nested chunks whose own pads are
/// handled individually) must call this after consuming exactly `size` bytes.
pub fn skip_pad<R: ReadBytes>(reader: &mut R, size: u64) -> Result<()> {
    if size % 2 != 0 {
        reader.read_byte()?;
    }
    Ok(())
}

/// Skips an entire unknown chunk's payload (and pad byte), used when walking a
/// container whose contents are not all required chunks.
pub fn skip_chunk<R: ReadBytes>(reader: &mut R, size: u64) -> Result<()> {
    reader.ignore_bytes(size)?;
    skip_pad(reader, size)
}

/// Canonical stereo/surround channel identifiers recognized by the `CHNL` sub-chunk,
/// in the order the DSDIFF specification lists them.
pub const CHANNEL_NAMES: &[(&str, u16)] = &[
    ("SLFT", 0),
    ("SRGT", 1),
    ("MLFT", 2),
    ("MRGT", 3),
    ("C", 4),
    ("LFE", 5),
    ("LS", 6),
    ("RS", 7),
];

/// Encodes a channel id as its 4-byte on-disk tag: one of the fixed stereo/surround
/// identifiers when `id` names one, or a generic `C<ddd>` tag (zero-padded decimal,
/// space-padded to 4 bytes) for any id in `[0, 999]`.
pub fn encode_channel_tag(id: u16) -> [u8; 4] {
    for (name, named_id) in CHANNEL_NAMES {
        if *named_id == id {
            return fixed_tag(name);
        }
    }
    let digits = format!("C{:03}", id.min(999));
    fixed_tag(&digits)
}

/// Decodes a 4-byte on-disk channel tag back to a channel id. Reverses
/// [`encode_channel_tag`]: recognized names map to their fixed id, and a `C<ddd>` tag
/// maps back to the numeric id it encodes. Any other tag is treated as a custom,
/// unnumbered channel and is assigned id `0xFFFF` so callers can detect it.
pub fn decode_channel_tag(tag: &[u8; 4]) -> u16 {
    let text = tag_to_str(tag);
    for (name, id) in CHANNEL_NAMES {
        if *name == text {
            return *id;
        }
    }
    if let Some(digits) = text.strip_prefix('C') {
        if digits.len() == 3 {
            if let Ok(n) = digits.parse::<u16>() {
                return n;
            }
        }
    }
    0xFFFF
}

/// Renders a 4-byte tag as a trimmed string (trailing spaces/NULs removed), for
/// display and for the custom-channel decode path above.
pub fn tag_to_str(tag: &[u8; 4]) -> String {
    String::from_utf8_lossy(tag).trim_end_matches(['\0', ' ']).to_string()
}

/// Encodes a short ASCII string as a fixed 4-byte tag, space-padded on the right.
pub fn fixed_tag(s: &str) -> [u8; 4] {
    let mut tag = [b' '; 4];
    let bytes = s.as_bytes();
    let len = bytes.len().min(4);
    tag[..len].copy_from_slice(&bytes[..len]);
    tag
}

/// Validates that `tag` consists only of printable ASCII, as the design requires for
/// chunk identifiers.
pub fn validate_tag(tag: &[u8; 4]) -> Result<()> {
    if tag.iter().all(|b| b.is_ascii_graphic() || *b == b' ') {
        Ok(())
    }
    else {
        Err(Error::InvalidChunk("chunk tag is not printable ASCII"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_tag_round_trip_named() {
        for (name, id) in CHANNEL_NAMES {
            let tag = encode_channel_tag(*id);
            assert_eq!(tag_to_str(&tag), *name);
            assert_eq!(decode_channel_tag(&tag), *id);
        }
    }

    #[test]
    fn channel_tag_round_trip_generic() {
        let tag = encode_channel_tag(42);
        assert_eq!(tag_to_str(&tag), "C042");
        assert_eq!(decode_channel_tag(&tag), 42);
    }

    #[test]
    fn unknown_tag_decodes_to_sentinel() {
        assert_eq!(decode_channel_tag(b"FOO "), 0xFFFF);
    }

    #[test]
    fn padded_size_accounts_for_odd_payload() {
        let h = ChunkHeader { tag: *b"FVER", size: 5 };
        assert_eq!(h.padded_size(), 6);
        let h = ChunkHeader { tag: *b"FVER", size: 4 };
        assert_eq!(h.padded_size(), 4);
    }
}
