//! The track-selection mini-language: `"all"`, a comma-separated list of 1-based track
//! numbers, ranges (`"2-5"`), or any combination of the two (`"1,3-5,8"`).

use std::collections::BTreeSet;

/// Parses `spec` against a source with `track_count` tracks, returning 0-based track
/// indices in ascending order with duplicates collapsed.
pub fn parse_track_selection(spec: &str, track_count: usize) -> Result<Vec<usize>, String> {
    let spec = spec.trim();
    if spec.eq_ignore_ascii_case("all") {
        return Ok((0..track_count).collect());
    }

    let mut selected = BTreeSet::new();
    for part in spec.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        match part.split_once('-') {
            Some((lo, hi)) => {
                let lo: usize = lo.trim().parse().map_err(|_| format!("not a track number: '{lo}'"))?;
                let hi: usize = hi.trim().parse().map_err(|_| format!("not a track number: '{hi}'"))?;
                if lo == 0 || hi < lo {
                    return Err(format!("invalid track range: '{part}'"));
                }
                selected.extend(lo..=hi);
            }
            None => {
                let n: usize = part.parse().map_err(|_| format!("not a track number: '{part}'"))?;
                if n == 0 {
                    return Err("track numbers are 1-based".to_string());
                }
                selected.insert(n);
            }
        }
    }

    if selected.is_empty() {
        return Err("track selection is empty".to_string());
    }
    if let Some(&max) = selected.iter().last() {
        if max > track_count {
            return Err(format!("track {max} is out of range (source has {track_count} track(s))"));
        }
    }

    Ok(selected.into_iter().map(|n| n - 1).collect())
}
