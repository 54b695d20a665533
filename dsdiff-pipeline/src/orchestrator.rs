//! `Pipeline`: wires one [`Source`] to one or more `(Transform?, Sink)` legs, reads
//! ahead on a background thread through a bounded [`FrameQueue`], and processes each
//! batch of frames with one thread per sink so slow sinks don't serialize behind each
//! other. Cancellation is cooperative: an atomic flag plus the queue's own condvars.

use crate::buffer::BufferPool;
use crate::format::Capabilities;
use crate::queue::FrameQueue;
use crate::reader_worker::{self, ReaderOutcome};
use crate::traits::{Progress, Sink, Source, Transform};
use dsdiff_core::errors::{Error, Result};
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// The default depth of the frame queue between the reader thread and the batch loop.
const DEFAULT_QUEUE_DEPTH: usize = 8;

/// The default number of frames drained from the queue per processing batch.
const DEFAULT_BATCH_SIZE: usize = 4;

struct SinkLeg {
    transform: Option<Box<dyn Transform>>,
    sink: Box<dyn Sink>,
}

/// A pipeline under construction or ready to run. Holds exactly one source and one or
/// more sink legs; each leg may have its own transform ahead of its sink. Two pools
/// back every buffer the pipeline hands out: `dsd_pool` for the source's own DSD/DST
/// frames, `pcm_pool` for whatever a DSD→PCM transform produces — matching the
/// two-pool resource model rather than forcing every buffer through one undersized or
/// oversized pool.
pub struct Pipeline {
    source: Mutex<Box<dyn Source>>,
    legs: Vec<SinkLeg>,
    dsd_pool: BufferPool,
    pcm_pool: BufferPool,
    queue_depth: usize,
    batch_size: usize,
    cancelled: Arc<AtomicBool>,
    progress: Option<Box<dyn FnMut(Progress) -> bool + Send>>,
}

impl Pipeline {
    /// Builds a pipeline around `source`, with its own pair of buffer pools sized per
    /// the DSD/DST and PCM slot conventions.
    pub fn new(source: Box<dyn Source>) -> Pipeline {
        Pipeline {
            source: Mutex::new(source),
            legs: Vec::new(),
            dsd_pool: BufferPool::dsd(),
            pcm_pool: BufferPool::pcm(),
            queue_depth: DEFAULT_QUEUE_DEPTH,
            batch_size: DEFAULT_BATCH_SIZE,
            cancelled: Arc::new(AtomicBool::new(false)),
            progress: None,
        }
    }

    pub fn set_queue_depth(&mut self, depth: usize) {
        self.queue_depth = depth.max(1);
    }

    pub fn set_batch_size(&mut self, size: usize) {
        self.batch_size = size.max(1);
    }

    /// Registers a progress callback invoked after each batch. Returning `true`
    /// requests cancellation of the run in progress, checked at the top of the next
    /// batch iteration — the same effect as storing `true` through
    /// [`cancellation_handle`](Pipeline::cancellation_handle), but reachable directly
    /// from inside the callback for callers (e.g. across an FFI boundary) that have no
    /// other way to reach the same atomic flag.
    pub fn set_progress_callback(&mut self, cb: impl FnMut(Progress) -> bool + Send + 'static) {
        self.progress = Some(Box::new(cb));
    }

    /// A handle the caller can use to request cancellation from another thread (e.g.
    /// a CLI's Ctrl-C handler).
    pub fn cancellation_handle(&self) -> Arc<AtomicBool> {
        self.cancelled.clone()
    }

    /// The pool backing DSD/DST frames read from the source. Exposed so tests (and
    /// diagnostics) can confirm every checked-out slot comes back after a run.
    pub fn dsd_pool(&self) -> &BufferPool {
        &self.dsd_pool
    }

    /// The pool backing PCM frames produced by a DSD→PCM transform.
    pub fn pcm_pool(&self) -> &BufferPool {
        &self.pcm_pool
    }

    /// Adds a sink leg, with an optional transform ahead of it. Rejects legs whose
    /// declared capabilities can't actually accept what the source (or the
    /// transform's output) produces.
    pub fn add_sink(&mut self, transform: Option<Box<dyn Transform>>, sink: Box<dyn Sink>) -> Result<()> {
        let produced: Capabilities = self.source.lock().unwrap().capabilities();
        let feeds_sink = match &transform {
            Some(t) => t.output_capabilities(),
            None => produced,
        };
        if let Some(t) = &transform {
            if (t.input_capabilities() & produced).is_empty() {
                return Err(Error::InvalidArg("transform does not accept the source's output kind"));
            }
        }
        if (sink.capabilities() & feeds_sink).is_empty() {
            return Err(Error::InvalidArg("sink does not accept the feeding stage's output kind"));
        }
        self.legs.push(SinkLeg { transform, sink });
        Ok(())
    }

    /// Runs one track through every sink leg to completion.
    pub fn run(&mut self, track_index: usize) -> Result<()> {
        if self.legs.is_empty() {
            return Err(Error::NotInitialized);
        }
        // A stale cancellation from a prior run must not poison this one.
        self.cancelled.store(false, Ordering::SeqCst);

        let track = {
            let mut source = self.source.lock().unwrap();
            source.select_track(track_index)?;
            source.tracks().get(track_index).cloned().ok_or(Error::TrackIndexInvalid)?
        };
        info!("starting track {} ({} frames known)", track_index, track.sample_frame_count.unwrap_or(0));

        for leg in &mut self.legs {
            leg.sink.begin_track(&track)?;
        }

        let queue = FrameQueue::new(self.queue_depth);
        let dsd_pool = &self.dsd_pool;
        let pcm_pool = &self.pcm_pool;
        let source = &self.source;
        let cancelled = &self.cancelled;
        let batch_size = self.batch_size;
        let mut progress_cb = self.progress.take();
        let mut frames_done: u64 = 0;

        let result = std::thread::scope(|scope| -> Result<()> {
            let reader_handle =
                scope.spawn(move || reader_worker::run(source, dsd_pool, &queue, track_index));

            let mut run_error: Option<Error> = None;
            loop {
                if cancelled.load(Ordering::SeqCst) {
                    queue.cancel();
                    run_error = Some(Error::Cancelled);
                    break;
                }
                let mut batch = Vec::with_capacity(batch_size);
                for _ in 0..batch_size {
                    match queue.pop() {
                        Some(frame) => batch.push(frame),
                        None => break,
                    }
                }
                if batch.is_empty() {
                    break;
                }

                let batch_frames: u64 = batch
                    .iter()
                    .map(|f| (f.len() as u64) / f.format().channels.max(1) as u64)
                    .sum();

                let legs = &mut self.legs;
                let batch_ref = &batch;
                let leg_errors: Vec<Option<Error>> = std::thread::scope(|inner| {
                    let handles: Vec<_> = legs
                        .iter_mut()
                        .map(|leg| {
                            inner.spawn(move || {
                                for frame in batch_ref.iter() {
                                    let outcome = match &mut leg.transform {
                                        Some(t) => {
                                            let produces_pcm =
                                                t.output_capabilities().contains(Capabilities::ACCEPTS_PCM);
                                            let out_pool = if produces_pcm { pcm_pool } else { dsd_pool };
                                            t.process(frame, out_pool).and_then(|mut out| {
                                                out.set_meta(frame.frame_number(), frame.sample_offset(), frame.track(), frame.flags());
                                                leg.sink.write_frame(&out)
                                            })
                                        }
                                        None => leg.sink.write_frame(frame),
                                    };
                                    if let Err(e) = outcome {
                                        return Some(e);
                                    }
                                }
                                None
                            })
                        })
                        .collect();
                    handles.into_iter().map(|h| h.join().unwrap_or(Some(Error::Other("sink thread panicked")))).collect()
                });

                if let Some(e) = leg_errors.into_iter().flatten().next() {
                    run_error = Some(e);
                    queue.cancel();
                    break;
                }

                frames_done += batch_frames;
                let mut requested_cancel = false;
                if let Some(cb) = progress_cb.as_mut() {
                    requested_cancel = cb(Progress { track_index, frames_done, frames_total: track.sample_frame_count });
                }
                debug!("track {} progress: {} frames", track_index, frames_done);
                if requested_cancel {
                    queue.cancel();
                    run_error = Some(Error::Cancelled);
                    break;
                }
            }

            match reader_handle.join() {
                Ok(ReaderOutcome::Done) => {}
                Ok(ReaderOutcome::Cancelled) => {
                    if run_error.is_none() {
                        run_error = Some(Error::Cancelled);
                    }
                }
                Ok(ReaderOutcome::Failed(e)) => {
                    if run_error.is_none() {
                        run_error = Some(e);
                    }
                }
                Err(_) => {
                    warn!("reader thread panicked for track {}", track_index);
                    if run_error.is_none() {
                        run_error = Some(Error::Other("reader thread panicked"));
                    }
                }
            }

            match run_error {
                Some(e) => Err(e),
                None => Ok(()),
            }
        });

        self.progress = progress_cb;

        if let Err(e) = &result {
            warn!("track {} aborted: {e}", track_index);
            return Err(match e {
                Error::Cancelled => Error::Cancelled,
                _ => Error::Other("pipeline run failed"),
            });
        }

        for leg in &mut self.legs {
            leg.sink.end_track()?;
        }
        Ok(())
    }

    /// Finalizes every sink leg. Must be called after the last `run`.
    pub fn finish(&mut self) -> Result<()> {
        for leg in &mut self.legs {
            leg.sink.finish()?;
        }
        Ok(())
    }
}
