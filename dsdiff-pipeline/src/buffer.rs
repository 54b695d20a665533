//! A small fixed-slot-size buffer pool and the refcounted handle frames travel in.
//!
//! Every frame queued between a reader and a transform/sink is a [`RefBuffer`]: a
//! `Vec<u8>` checked out of a [`BufferPool`] and returned to it automatically on drop.
//! This keeps steady-state pipeline throughput allocation-free once the pool has
//! warmed up to its working set size.

use crate::format::{Format, FrameFlags};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Maximum payload size, in bytes, for one DSD or DST frame slot: 28224 bytes covers a
/// 6-channel, 1-bit, 44.1kHz-multiple block at the largest block size the container
/// format uses.
pub const DSD_SLOT_BYTES: usize = 28_224;

/// Maximum payload size, in bytes, for one PCM frame slot: four times the DSD/DST slot
/// size, enough headroom for the widest PCM sample format at the same frame count.
pub const PCM_SLOT_BYTES: usize = DSD_SLOT_BYTES * 4;

struct PoolInner {
    slot_bytes: usize,
    free: Mutex<VecDeque<Vec<u8>>>,
    allocated: AtomicUsize,
}

/// A pool of same-sized byte buffers. Buffers are lazily allocated on first use and
/// recycled via [`RefBuffer`]'s `Drop` impl; the pool never shrinks once grown.
#[derive(Clone)]
pub struct BufferPool {
    inner: Arc<PoolInner>,
}

impl BufferPool {
    /// Creates a pool whose slots hold at least `slot_bytes` bytes.
    pub fn new(slot_bytes: usize) -> BufferPool {
        BufferPool {
            inner: Arc::new(PoolInner { slot_bytes, free: Mutex::new(VecDeque::new()), allocated: AtomicUsize::new(0) }),
        }
    }

    /// The pool sized for DSD/DST payloads.
    pub fn dsd() -> BufferPool {
        BufferPool::new(DSD_SLOT_BYTES)
    }

    /// The pool sized for PCM payloads.
    pub fn pcm() -> BufferPool {
        BufferPool::new(PCM_SLOT_BYTES)
    }

    /// Checks out a buffer tagged with `format`, allocating a fresh one if the free
    /// list is empty.
    pub fn acquire(&self, format: Format) -> RefBuffer {
        let data = {
            let mut free = self.inner.free.lock().unwrap();
            free.pop_front().unwrap_or_else(|| {
                self.inner.allocated.fetch_add(1, Ordering::SeqCst);
                vec![0u8; self.inner.slot_bytes]
            })
        };
        RefBuffer {
            pool: self.inner.clone(),
            buffer: Some(PipelineBuffer {
                data,
                format,
                len: 0,
                frame_number: 0,
                sample_offset: 0,
                track: 0,
                flags: FrameFlags::empty(),
            }),
        }
    }

    pub fn slot_bytes(&self) -> usize {
        self.inner.slot_bytes
    }

    /// Number of buffers currently sitting in the free list.
    pub fn free_count(&self) -> usize {
        self.inner.free.lock().unwrap().len()
    }

    /// Number of buffers checked out right now and not yet returned to the free
    /// list. Zero means every buffer this pool has ever allocated is idle — the
    /// property a cancelled or finished run should leave true.
    pub fn outstanding_count(&self) -> usize {
        self.inner.allocated.load(Ordering::SeqCst) - self.free_count()
    }
}

/// One frame's worth of sample data plus the format it was produced under and the
/// position metadata a sink needs to place it: which track it belongs to, its frame
/// number and sample offset within that track, and track/stream boundary flags. `len`
/// is the number of valid bytes at the front of `data`; the remainder is pool backing
/// capacity, not payload.
pub struct PipelineBuffer {
    data: Vec<u8>,
    format: Format,
    len: usize,
    frame_number: u64,
    sample_offset: u64,
    track: usize,
    flags: FrameFlags,
}

impl PipelineBuffer {
    pub fn format(&self) -> Format {
        self.format
    }

    pub fn set_format(&mut self, format: Format) {
        self.format = format;
    }

    /// Zero-based index of this frame within its track, in read order.
    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    /// Sample-frame position of this buffer's first sample within its track.
    pub fn sample_offset(&self) -> u64 {
        self.sample_offset
    }

    /// Index of the track this frame belongs to.
    pub fn track(&self) -> usize {
        self.track
    }

    pub fn flags(&self) -> FrameFlags {
        self.flags
    }

    /// Sets the position metadata a source attaches on read, or a transform carries
    /// forward from the buffer it consumed.
    pub fn set_meta(&mut self, frame_number: u64, sample_offset: u64, track: usize, flags: FrameFlags) {
        self.frame_number = frame_number;
        self.sample_offset = sample_offset;
        self.track = track;
        self.flags = flags;
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data[..self.len]
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data[..self.len]
    }

    /// Full backing capacity, usable as a scratch write target before `set_len`.
    pub fn capacity(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Marks `len` bytes of the backing capacity as valid payload.
    ///
    /// # Panics
    /// Panics if `len` exceeds the backing capacity.
    pub fn set_len(&mut self, len: usize) {
        assert!(len <= self.data.len(), "frame length exceeds pool slot size");
        self.len = len;
    }
}

/// A [`PipelineBuffer`] checked out of a [`BufferPool`]. Returns its backing storage
/// to the pool's free list when dropped.
pub struct RefBuffer {
    pool: Arc<PoolInner>,
    buffer: Option<PipelineBuffer>,
}

impl std::ops::Deref for RefBuffer {
    type Target = PipelineBuffer;

    fn deref(&self) -> &PipelineBuffer {
        self.buffer.as_ref().expect("buffer taken")
    }
}

impl std::ops::DerefMut for RefBuffer {
    fn deref_mut(&mut self) -> &mut PipelineBuffer {
        self.buffer.as_mut().expect("buffer taken")
    }
}

impl Drop for RefBuffer {
    fn drop(&mut self) {
        if let Some(mut buf) = self.buffer.take() {
            buf.len = 0;
            let mut free = self.pool.free.lock().unwrap();
            free.push_back(buf.data);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::Kind;

    #[test]
    fn acquired_buffer_recycles_backing_storage_on_drop() {
        let pool = BufferPool::new(64);
        let fmt = Format::dsd_raw(2_822_400, 2);
        {
            let mut buf = pool.acquire(fmt);
            buf.capacity()[..4].copy_from_slice(&[1, 2, 3, 4]);
            buf.set_len(4);
            assert_eq!(buf.as_slice(), &[1, 2, 3, 4]);
        }
        assert_eq!(pool.inner.free.lock().unwrap().len(), 1);
        let buf2 = pool.acquire(fmt);
        assert_eq!(buf2.len(), 0);
        assert_eq!(pool.inner.free.lock().unwrap().len(), 0);
    }

    #[test]
    fn outstanding_count_tracks_checked_out_buffers() {
        let pool = BufferPool::new(8);
        let fmt = Format::dsd_raw(2_822_400, 2);
        let a = pool.acquire(fmt);
        let b = pool.acquire(fmt);
        assert_eq!(pool.outstanding_count(), 2);
        drop(a);
        assert_eq!(pool.outstanding_count(), 1);
        drop(b);
        assert_eq!(pool.outstanding_count(), 0);
    }

    #[test]
    fn set_len_beyond_capacity_panics() {
        let pool = BufferPool::new(8);
        let mut buf = pool.acquire(Format::pcm(Kind::PcmI16, 44_100, 2, 16));
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| buf.set_len(9)));
        assert!(result.is_err());
    }
}
