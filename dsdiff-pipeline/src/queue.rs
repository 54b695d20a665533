//! A bounded single-producer/single-consumer queue of [`RefBuffer`] frames, used to
//! hand decoded/transformed frames from the reader thread to the batch-processing
//! loop without unbounded memory growth.

use crate::buffer::RefBuffer;
use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

struct State {
    frames: VecDeque<RefBuffer>,
    eof: bool,
    cancelled: bool,
}

/// A bounded SPSC queue. `push` blocks while full; `pop` blocks while empty unless
/// `eof` or `cancelled` has been signalled, in which case it returns `None`
/// immediately once drained.
pub struct FrameQueue {
    capacity: usize,
    state: Mutex<State>,
    not_full: Condvar,
    not_empty: Condvar,
}

impl FrameQueue {
    pub fn new(capacity: usize) -> FrameQueue {
        assert!(capacity > 0, "frame queue capacity must be positive");
        FrameQueue {
            capacity,
            state: Mutex::new(State { frames: VecDeque::with_capacity(capacity), eof: false, cancelled: false }),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
        }
    }

    /// Blocks until there is room, then pushes `frame`. Returns the frame back if the
    /// queue was cancelled before room became available.
    pub fn push(&self, frame: RefBuffer) -> Result<(), RefBuffer> {
        let mut state = self.state.lock().unwrap();
        loop {
            if state.cancelled {
                return Err(frame);
            }
            if state.frames.len() < self.capacity {
                state.frames.push_back(frame);
                self.not_empty.notify_one();
                return Ok(());
            }
            state = self.not_full.wait(state).unwrap();
        }
    }

    /// Blocks until a frame is available, EOF is signalled with the queue drained, or
    /// the queue is cancelled. Returns `None` in the latter two cases.
    pub fn pop(&self) -> Option<RefBuffer> {
        let mut state = self.state.lock().unwrap();
        loop {
            if let Some(frame) = state.frames.pop_front() {
                self.not_full.notify_one();
                return Some(frame);
            }
            if state.eof || state.cancelled {
                return None;
            }
            state = self.not_empty.wait(state).unwrap();
        }
    }

    /// Marks the queue as exhausted: no more frames will be pushed. Already-queued
    /// frames are still delivered by `pop` before it starts returning `None`.
    pub fn signal_eof(&self) {
        let mut state = self.state.lock().unwrap();
        state.eof = true;
        self.not_empty.notify_all();
    }

    /// Cooperatively cancels the queue: wakes every blocked `push`/`pop` and makes
    /// them return immediately from then on, discarding any queued frames.
    pub fn cancel(&self) {
        let mut state = self.state.lock().unwrap();
        state.cancelled = true;
        state.frames.clear();
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.lock().unwrap().cancelled
    }

    pub fn len(&self) -> usize {
        self.state.lock().unwrap().frames.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::BufferPool;
    use crate::format::Format;

    #[test]
    fn push_then_pop_round_trips_a_frame() {
        let queue = FrameQueue::new(2);
        let pool = BufferPool::new(8);
        let fmt = Format::dsd_raw(2_822_400, 2);
        queue.push(pool.acquire(fmt)).unwrap();
        assert_eq!(queue.len(), 1);
        assert!(queue.pop().is_some());
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn pop_returns_none_after_eof_with_empty_queue() {
        let queue = FrameQueue::new(2);
        queue.signal_eof();
        assert!(queue.pop().is_none());
    }

    #[test]
    fn pop_drains_queued_frames_before_reporting_eof() {
        let queue = FrameQueue::new(2);
        let pool = BufferPool::new(8);
        let fmt = Format::dsd_raw(2_822_400, 2);
        queue.push(pool.acquire(fmt)).unwrap();
        queue.signal_eof();
        assert!(queue.pop().is_some());
        assert!(queue.pop().is_none());
    }

    #[test]
    fn cancel_unblocks_push_and_discards_frames() {
        let queue = FrameQueue::new(1);
        let pool = BufferPool::new(8);
        let fmt = Format::dsd_raw(2_822_400, 2);
        queue.push(pool.acquire(fmt)).unwrap();
        queue.cancel();
        assert!(queue.push(pool.acquire(fmt)).is_err());
        assert!(queue.pop().is_none());
    }
}
