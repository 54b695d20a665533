//! The background producer thread: selects a track on a [`Source`], then reads frames
//! into a [`FrameQueue`] until the track is exhausted, the queue is cancelled, or a
//! read fails.

use crate::buffer::BufferPool;
use crate::queue::FrameQueue;
use crate::traits::Source;
use dsdiff_core::errors::Result;
use std::sync::Arc;
use std::sync::Mutex;

/// Outcome of a reader worker's run, handed back to the orchestrator once the thread
/// joins.
pub enum ReaderOutcome {
    Done,
    Cancelled,
    Failed(dsdiff_core::errors::Error),
}

/// Runs the read loop for `track_index` to completion on the calling thread. The
/// orchestrator spawns this inside its own `std::thread::scope` so `source` can remain
/// a plain borrow rather than requiring `'static` + ownership transfer.
pub fn run(
    source: &Mutex<Box<dyn Source>>,
    pool: &BufferPool,
    queue: &FrameQueue,
    track_index: usize,
) -> ReaderOutcome {
    if let Err(e) = select(source, track_index) {
        return ReaderOutcome::Failed(e);
    }

    loop {
        if queue.is_cancelled() {
            return ReaderOutcome::Cancelled;
        }
        let frame = {
            let mut guard = source.lock().unwrap();
            guard.read_frame(pool)
        };
        match frame {
            Ok(Some(buf)) => {
                if queue.push(buf).is_err() {
                    return ReaderOutcome::Cancelled;
                }
            }
            Ok(None) => {
                queue.signal_eof();
                return ReaderOutcome::Done;
            }
            Err(e) => {
                queue.signal_eof();
                return ReaderOutcome::Failed(e);
            }
        }
    }
}

fn select(source: &Mutex<Box<dyn Source>>, track_index: usize) -> Result<()> {
    source.lock().unwrap().select_track(track_index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsdiff_source::DsdiffSource;
    use dsdiff_format::{AudioType, DsdiffHandle};

    #[test]
    fn run_drains_a_short_track_and_signals_eof() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reader.dff");
        let mut writer = DsdiffHandle::create(&path, AudioType::Dsd, 1, 1, 44_100).unwrap();
        writer.write_dsd(&[1, 2, 3, 4, 5, 6]).unwrap();
        writer.finalize().unwrap();
        writer.close().unwrap();

        let source: Mutex<Box<dyn Source>> = Mutex::new(Box::new(DsdiffSource::open(&path).unwrap()));
        let pool = Arc::new(BufferPool::new(4));
        let queue = FrameQueue::new(4);

        let outcome = run(&source, &pool, &queue, 0);
        assert!(matches!(outcome, ReaderOutcome::Done));

        let mut total = 0;
        while let Some(frame) = queue.pop() {
            total += frame.len();
        }
        assert_eq!(total, 6);
    }
}
