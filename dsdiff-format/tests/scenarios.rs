//! End-to-end scenarios exercised against the public API only, each writing a real
//! file with `tempfile` and reparsing it.

use dsdiff_core::errors::Error;
use dsdiff_format::{AudioType, Comment, DsdiffHandle};

#[test]
fn minimal_stereo_dsd_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stereo.dff");

    let mut handle = DsdiffHandle::create(&path, AudioType::Dsd, 2, 1, 2_822_400).unwrap();
    let one_second = vec![0xAAu8; 2 * 2_822_400];
    handle.write_dsd(&one_second).unwrap();
    handle.finalize().unwrap();
    handle.close().unwrap();

    let reopened = DsdiffHandle::open(&path).unwrap();
    assert_eq!(reopened.channel_count(), 2);
    assert_eq!(reopened.sample_rate(), 2_822_400);
    assert_eq!(reopened.sample_frame_count(), 2_822_400);
    assert_eq!(reopened.audio_type(), Some(AudioType::Dsd));
    assert!(!reopened.has_dst_index());
}

#[test]
fn dst_frames_are_indexed_and_individually_recoverable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dst.dff");

    let frames: Vec<Vec<u8>> = (0..75).map(|i| vec![i as u8; 500]).collect();
    let mut handle = DsdiffHandle::create(&path, AudioType::Dst, 2, 1, 2_822_400).unwrap();
    for frame in &frames {
        handle.write_dst_frame(frame).unwrap();
    }
    handle.finalize().unwrap();
    handle.close().unwrap();

    let mut reopened = DsdiffHandle::open(&path).unwrap();
    assert_eq!(reopened.dst_frame_count(), 75);
    assert!(reopened.has_dst_index());

    let mut buf = vec![0u8; 500];
    for (i, frame) in frames.iter().enumerate() {
        let n = reopened.read_dst_frame_at_index(i, &mut buf).unwrap();
        assert_eq!(n, 500);
        assert_eq!(&buf[..n], frame.as_slice());
    }
}

#[test]
fn channel_id_ordering_is_enforced_then_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chan.dff");

    let mut handle = DsdiffHandle::create(&path, AudioType::Dsd, 2, 1, 44_100).unwrap();
    // SRGT, SLFT reversed from the canonical stereo order (SLFT, SRGT).
    assert!(handle.set_channel_ids(&[1, 0]).is_err());

    // 5.1: MLFT, MRGT, C, LFE, LS, RS in canonical order.
    handle.set_channel_ids(&[2, 3, 4, 5, 6, 7]).unwrap();
    handle.write_dsd(&[0u8; 12]).unwrap();
    handle.finalize().unwrap();
    handle.close().unwrap();

    let reopened = DsdiffHandle::open(&path).unwrap();
    assert_eq!(reopened.channel_ids(), &[2, 3, 4, 5, 6, 7]);
}

#[test]
fn comment_after_sound_data_is_locked_once_reopened_for_modify() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("locked.dff");

    let mut handle = DsdiffHandle::create(&path, AudioType::Dsd, 1, 1, 44_100).unwrap();
    handle.write_dsd(&[1, 2, 3, 4]).unwrap();
    handle
        .add_comment(Comment {
            year: 2024,
            month: 1,
            day: 1,
            hour: 0,
            minute: 0,
            kind: 0,
            reference: 0,
            text: "first".into(),
        })
        .unwrap();
    handle.finalize().unwrap();
    handle.close().unwrap();

    let mut reopened = DsdiffHandle::modify(&path).unwrap();
    let result = reopened.add_comment(Comment {
        year: 2024,
        month: 2,
        day: 2,
        hour: 0,
        minute: 0,
        kind: 0,
        reference: 0,
        text: "too late".into(),
    });
    assert!(matches!(result, Err(Error::ChunkLocked)));
}
