//! Four-character chunk tag constants for the DSDIFF container format.

pub const FRM8: [u8; 4] = *b"FRM8";
pub const FORM_DSD: [u8; 4] = *b"DSD ";
pub const FVER: [u8; 4] = *b"FVER";
pub const PROP: [u8; 4] = *b"PROP";
pub const FORM_SND: [u8; 4] = *b"SND ";
pub const FS: [u8; 4] = *b"FS  ";
pub const CHNL: [u8; 4] = *b"CHNL";
pub const CMPR: [u8; 4] = *b"CMPR";
pub const ABSS: [u8; 4] = *b"ABSS";
pub const LSCO: [u8; 4] = *b"LSCO";
pub const DSD: [u8; 4] = *b"DSD ";
pub const DST: [u8; 4] = *b"DST ";
pub const FRTE: [u8; 4] = *b"FRTE";
pub const DSTF: [u8; 4] = *b"DSTF";
pub const DSTC: [u8; 4] = *b"DSTC";
pub const DSTI: [u8; 4] = *b"DSTI";
pub const DIIN: [u8; 4] = *b"DIIN";
pub const EMID: [u8; 4] = *b"EMID";
pub const DIAR: [u8; 4] = *b"DIAR";
pub const DITI: [u8; 4] = *b"DITI";
pub const MARK: [u8; 4] = *b"MARK";
pub const COMT: [u8; 4] = *b"COMT";
pub const ID3: [u8; 4] = *b"ID3 ";
pub const MANF: [u8; 4] = *b"MANF";

pub const CMPR_NAME_DSD: &str = "not compressed";
pub const CMPR_NAME_DST: &str = "DST Encoded";

/// Implementation-defined cap on total sound-data size, enforced to prevent
/// pathological file sizes as the design requires. 64 GiB is comfortably above any
/// real DSDIFF file (a multi-hour, multichannel DSD256 recording is still under 2 GiB)
/// while leaving room for very large DST-compressed multitrack masters.
pub const MAX_DATA_SIZE: u64 = 64 * 1024 * 1024 * 1024;
