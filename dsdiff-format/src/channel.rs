//! Channel-id policy: canonical layouts for 2/5/6 channel configurations, validated
//! on `set_channel_ids`; everything else is accepted verbatim.

use crate::handle::DsdiffHandle;
use dsdiff_core::errors::{Error, Result};
use dsdiff_core::io::OpenMode;

const STEREO: u16 = 0; // SLFT
const STEREO_R: u16 = 1; // SRGT
const SURROUND_L: u16 = 2; // MLFT
const SURROUND_R: u16 = 3; // MRGT
const SURROUND_C: u16 = 4; // C
const SURROUND_LFE: u16 = 5; // LFE
const SURROUND_LS: u16 = 6; // LS
const SURROUND_RS: u16 = 7; // RS

const CANONICAL_STEREO: [u16; 2] = [STEREO, STEREO_R];
const CANONICAL_5: [u16; 5] = [SURROUND_L, SURROUND_R, SURROUND_C, SURROUND_LS, SURROUND_RS];
const CANONICAL_6: [u16; 6] =
    [SURROUND_L, SURROUND_R, SURROUND_C, SURROUND_LFE, SURROUND_LS, SURROUND_RS];

fn is_permutation(ids: &[u16], canonical: &[u16]) -> bool {
    ids.len() == canonical.len() && canonical.iter().all(|c| ids.contains(c))
}

/// The default channel layout `create()` assigns for a given channel count: the
/// canonical stereo/5.0/5.1 layout when the count matches one exactly, and a plain
/// ascending custom id sequence otherwise.
pub(crate) fn default_channel_ids(count: u16) -> Vec<u16> {
    match count {
        2 => CANONICAL_STEREO.to_vec(),
        5 => CANONICAL_5.to_vec(),
        6 => CANONICAL_6.to_vec(),
        n => (0..n).map(|i| 100 + i).collect(),
    }
}

/// Validates a candidate channel-id list against the canonical-ordering rule: if the
/// ids are a permutation of a known 2/5/6-channel canonical set, they must appear in
/// exactly that order. Any other id list (custom layouts that do not contain a full
/// canonical set) is accepted verbatim.
pub(crate) fn validate_channel_ids(ids: &[u16]) -> Result<()> {
    if is_permutation(ids, &CANONICAL_STEREO) && ids != CANONICAL_STEREO {
        return Err(Error::InvalidChannels);
    }
    if is_permutation(ids, &CANONICAL_5) && ids != CANONICAL_5 {
        return Err(Error::InvalidChannels);
    }
    if is_permutation(ids, &CANONICAL_6) && ids != CANONICAL_6 {
        return Err(Error::InvalidChannels);
    }
    Ok(())
}

impl DsdiffHandle {
    /// Sets the channel-id list for this handle. Rejects known canonical layouts given
    /// out of order (`InvalidChannels`); a channel *count* change is never legal once a
    /// handle is open in `Modify` mode (the count itself is immutable there), even
    /// though the id labels may change.
    pub fn set_channel_ids(&mut self, ids: &[u16]) -> Result<()> {
        validate_channel_ids(ids)?;
        if self.file.mode == OpenMode::Modify && ids.len() as u16 != self.audio.channel_count {
            return Err(Error::InvalidChannels);
        }
        self.audio.channel_ids = ids.to_vec();
        self.audio.channel_count = ids.len() as u16;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stereo_must_be_in_canonical_order() {
        assert!(validate_channel_ids(&[STEREO_R, STEREO]).is_err());
        assert!(validate_channel_ids(&[STEREO, STEREO_R]).is_ok());
    }

    #[test]
    fn five_one_must_be_in_canonical_order() {
        let shuffled = [SURROUND_R, SURROUND_L, SURROUND_C, SURROUND_LFE, SURROUND_LS, SURROUND_RS];
        assert!(validate_channel_ids(&shuffled).is_err());
        assert!(validate_channel_ids(&CANONICAL_6).is_ok());
    }

    #[test]
    fn custom_layout_without_full_canonical_set_is_accepted() {
        assert!(validate_channel_ids(&[100, 101, 102]).is_ok());
    }

    #[test]
    fn default_layout_matches_known_counts() {
        assert_eq!(default_channel_ids(2), CANONICAL_STEREO.to_vec());
        assert_eq!(default_channel_ids(6), CANONICAL_6.to_vec());
        assert_eq!(default_channel_ids(3), vec![100, 101, 102]);
    }
}
