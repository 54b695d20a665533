//! The marker list: an ordered collection of `MARK` records with a stable merge sort
//! keyed on absolute sample position, tie-broken by marker kind.

/// Kind of a `MARK` record, as enumerated by the DSDIFF specification's marker types.
/// Only `TrackStart` participates in the sort tie-break; the rest order equally among
/// themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    TrackStart,
    TrackStop,
    ProgramStart,
    ProgramEnd,
    ObstacleMarker,
    IndexMarker,
}

impl MarkerKind {
    fn from_u16(v: u16) -> MarkerKind {
        match v {
            0 => MarkerKind::TrackStart,
            1 => MarkerKind::TrackStop,
            2 => MarkerKind::ProgramStart,
            3 => MarkerKind::ProgramEnd,
            4 => MarkerKind::ObstacleMarker,
            _ => MarkerKind::IndexMarker,
        }
    }

    fn to_u16(self) -> u16 {
        match self {
            MarkerKind::TrackStart => 0,
            MarkerKind::TrackStop => 1,
            MarkerKind::ProgramStart => 2,
            MarkerKind::ProgramEnd => 3,
            MarkerKind::ObstacleMarker => 4,
            MarkerKind::IndexMarker => 5,
        }
    }

    /// The tie-break rank used by the sort: `TrackStart` sorts before everything else.
    fn sort_rank(self) -> u8 {
        if self == MarkerKind::TrackStart {
            0
        }
        else {
            1
        }
    }
}

impl From<u16> for MarkerKind {
    fn from(v: u16) -> Self {
        MarkerKind::from_u16(v)
    }
}

impl From<MarkerKind> for u16 {
    fn from(k: MarkerKind) -> Self {
        k.to_u16()
    }
}

/// A timecode as stored in a `MARK` record: hours/minutes/seconds plus a residual
/// sample count within that second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timecode {
    pub hours: u16,
    pub minutes: u8,
    pub seconds: u8,
    pub samples: u32,
}

impl Timecode {
    /// Computes the absolute sample count this timecode represents at `sample_rate`,
    /// per the design's marker-sort comparison rule.
    pub fn total_samples(&self, sample_rate: u32) -> u64 {
        let seconds_total = self.hours as u64 * 3600 + self.minutes as u64 * 60 + self.seconds as u64;
        seconds_total * sample_rate as u64 + self.samples as u64
    }

    /// Normalizes an overflowed timecode (e.g. `seconds >= 60` after arithmetic),
    /// carrying samples into seconds, seconds into minutes, minutes into hours modulo
    /// 60/60, as the finalize protocol requires for `ABSS`.
    pub fn normalize(mut self, sample_rate: u32) -> Timecode {
        let mut carry_seconds = self.samples / sample_rate.max(1);
        self.samples %= sample_rate.max(1);

        let mut total_seconds = self.seconds as u64 + carry_seconds as u64;
        carry_seconds = 0;
        let carry_minutes = (total_seconds / 60) as u8;
        total_seconds %= 60;
        self.seconds = total_seconds as u8;

        let total_minutes = self.minutes as u16 + carry_minutes as u16;
        let carry_hours = total_minutes / 60;
        self.minutes = (total_minutes % 60) as u8;
        self.hours += carry_hours;
        let _ = carry_seconds;
        self
    }
}

/// One entry of the marker list: timecode, signed sample offset from that timecode,
/// kind, target channel, track-association flags, and free text.
#[derive(Debug, Clone)]
pub struct Marker {
    pub timecode: Timecode,
    pub sample_offset: i64,
    pub kind: MarkerKind,
    pub channel: u16,
    pub track_flags: u16,
    pub text: String,
}

/// An ordered collection of markers, sorted by `sort` using a stable merge sort.
#[derive(Debug, Clone, Default)]
pub struct MarkerList {
    markers: Vec<Marker>,
}

impl MarkerList {
    pub fn new() -> Self {
        MarkerList { markers: Vec::new() }
    }

    pub fn push(&mut self, marker: Marker) {
        self.markers.push(marker);
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Marker> {
        self.markers.iter()
    }

    pub fn as_slice(&self) -> &[Marker] {
        &self.markers
    }

    /// Sorts the list in place by `(total_samples, kind_is_TrackStart ? 0 : 1)`, using
    /// a stable merge sort: the midpoint is found by a slow/fast pointer walk and the
    /// two halves are recursively sorted and merged, giving O(n log n) time and
    /// O(log n) recursion depth. The list is array-backed rather than a doubly-linked
    /// list (the design's own fallback for "short, rarely-sorted" lists), but the
    /// algorithm shape — midpoint split, recurse, stable merge — is the same.
    pub fn sort(&mut self, sample_rate: u32) {
        let keyed: Vec<(u64, u8, usize)> = self
            .markers
            .iter()
            .enumerate()
            .map(|(i, m)| (m.timecode.total_samples(sample_rate), m.kind.sort_rank(), i))
            .collect();

        let mut keys: Vec<(u64, u8, usize)> = keyed;
        merge_sort_keys(&mut keys);

        let mut sorted = Vec::with_capacity(self.markers.len());
        let mut taken: Vec<Option<Marker>> = self.markers.drain(..).map(Some).collect();
        for (_, _, original_index) in keys {
            sorted.push(taken[original_index].take().expect("each index visited once"));
        }
        self.markers = sorted;
    }
}

/// Finds the midpoint of `slice` using the slow/fast pointer technique the design
/// names explicitly, rather than `slice.len() / 2` directly — behaviorally identical,
/// but mirrors the reference algorithm's walk.
fn midpoint<T>(slice: &[T]) -> usize {
    if slice.is_empty() {
        return 0;
    }
    let mut slow = 0usize;
    let mut fast = 0usize;
    while fast + 1 < slice.len() && fast + 2 < slice.len() {
        slow += 1;
        fast += 2;
    }
    slow + 1
}

/// Recursive stable merge sort over `(total_samples, tie_break_rank, original_index)`
/// triples, ascending.
fn merge_sort_keys(keys: &mut Vec<(u64, u8, usize)>) {
    if keys.len() <= 1 {
        return;
    }
    let mid = midpoint(keys);
    let mut right = keys.split_off(mid);
    let mut left = std::mem::take(keys);

    merge_sort_keys(&mut left);
    merge_sort_keys(&mut right);

    *keys = merge(left, right);
}

fn merge(
    left: Vec<(u64, u8, usize)>,
    right: Vec<(u64, u8, usize)>,
) -> Vec<(u64, u8, usize)> {
    let mut out = Vec::with_capacity(left.len() + right.len());
    let mut li = left.into_iter().peekable();
    let mut ri = right.into_iter().peekable();

    loop {
        match (li.peek(), ri.peek()) {
            (Some(l), Some(r)) => {
                // `<=` on the left keeps equal keys in their original relative order
                // (left came first in the split), making the sort stable.
                if (l.0, l.1) <= (r.0, r.1) {
                    out.push(li.next().unwrap());
                }
                else {
                    out.push(ri.next().unwrap());
                }
            }
            (Some(_), None) => out.push(li.next().unwrap()),
            (None, Some(_)) => out.push(ri.next().unwrap()),
            (None, None) => break,
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marker(h: u16, m: u8, s: u8, samples: u32, kind: MarkerKind, text: &str) -> Marker {
        Marker {
            timecode: Timecode { hours: h, minutes: m, seconds: s, samples },
            sample_offset: 0,
            kind,
            channel: 0,
            track_flags: 0,
            text: text.to_string(),
        }
    }

    #[test]
    fn sort_orders_by_absolute_sample_position() {
        let mut list = MarkerList::new();
        list.push(marker(0, 0, 2, 0, MarkerKind::IndexMarker, "b"));
        list.push(marker(0, 0, 1, 0, MarkerKind::IndexMarker, "a"));
        list.push(marker(0, 0, 3, 0, MarkerKind::IndexMarker, "c"));
        list.sort(44_100);
        let texts: Vec<&str> = list.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "b", "c"]);
    }

    #[test]
    fn sort_is_stable_and_track_start_ties_first() {
        let mut list = MarkerList::new();
        list.push(marker(0, 0, 5, 0, MarkerKind::IndexMarker, "idx-1"));
        list.push(marker(0, 0, 5, 0, MarkerKind::TrackStart, "start"));
        list.push(marker(0, 0, 5, 0, MarkerKind::IndexMarker, "idx-2"));
        list.sort(44_100);
        let texts: Vec<&str> = list.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["start", "idx-1", "idx-2"]);
    }

    #[test]
    fn timecode_normalization_carries_samples_into_seconds() {
        let tc = Timecode { hours: 0, minutes: 0, seconds: 59, samples: 44_100 + 500 };
        let normalized = tc.normalize(44_100);
        assert_eq!(normalized, Timecode { hours: 0, minutes: 1, seconds: 0, samples: 500 });
    }

    #[test]
    fn midpoint_matches_half_length_for_even_and_odd() {
        assert_eq!(midpoint(&[0; 4]), 2);
        assert_eq!(midpoint(&[0; 5]), 3);
        assert_eq!(midpoint(&[0; 1]), 1);
        assert_eq!(midpoint::<u8>(&[]), 0);
    }
}
