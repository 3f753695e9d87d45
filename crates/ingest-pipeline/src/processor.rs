//! The multi-stage ingestion pipeline.
//!
//! Frames flow raw queue -> decomposition workers -> processed queue ->
//! conversion workers -> outbound queue, where a downstream consumer
//! removes requests with `take`/`poll` and streams them to the service.
//!
//! # Back-pressure
//!
//! Producers park in `add_frames` while the *processed* queue is at
//! capacity, but the `queue_ready` broadcast that releases them is driven
//! by *outbound*-queue removals. This asymmetry is deliberate and load-
//! bearing: an outbound removal is how the pipeline observes that the
//! downstream consumer has room. Both edges are covered by tests below.
//!
//! # Shutdown
//!
//! `shutdown` is cooperative: workers observe the state flip within one
//! poll interval and drain the raw and processed queues before exiting;
//! queued outbound requests remain takeable afterwards. `shutdown_now`
//! aborts the workers and clears all three queues.

use crate::config::ProcessorConfig;
use crate::convert::RequestConverter;
use crate::error::IngestError;
use crate::metrics::ProcessorMetrics;
use crate::queue::SignalQueue;
use crate::request::{IngestDataRequest, ProviderUid};
use crate::state::{PipelineState, StateCell};
use ingest_frame::{FrameBinner, IngestionFrame};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// State shared between the processor handle and its workers.
struct PipelineShared {
    raw: SignalQueue<IngestionFrame>,
    processed: SignalQueue<IngestionFrame>,
    outbound: SignalQueue<IngestDataRequest>,
    /// Frames currently inside a worker (removed from a queue, not yet
    /// pushed to the next one).
    pending: AtomicUsize,
    state: StateCell,
    /// Signalled from outbound removals while below capacity.
    queue_ready: Notify,
    /// Signalled when every queue is empty and no work is pending.
    queue_empty: Notify,
    decompose_enabled: AtomicBool,
    converter: RequestConverter,
    back_pressure_enabled: bool,
    queue_capacity: usize,
    poll_interval: Duration,
    metrics: Arc<ProcessorMetrics>,
}

impl PipelineShared {
    /// True while more messages may still be produced or remain queued.
    fn is_supplying(&self) -> bool {
        if self.state.get() == PipelineState::HardTerminated {
            return false;
        }
        self.state.is_active()
            || self.pending.load(Ordering::Acquire) > 0
            || !self.raw.is_empty()
            || !self.processed.is_empty()
            || !self.outbound.is_empty()
    }

    fn all_drained(&self) -> bool {
        self.pending.load(Ordering::Acquire) == 0
            && self.raw.is_empty()
            && self.processed.is_empty()
            && self.outbound.is_empty()
    }

    /// Reserves a pending slot, then removes the head of `queue`. The slot
    /// is released again when nothing was queued, so `pending` covers every
    /// frame from removal until its output lands on the next queue.
    fn reserve_pop<T>(&self, queue: &SignalQueue<T>) -> Option<T> {
        self.pending.fetch_add(1, Ordering::AcqRel);
        match queue.try_pop() {
            Some(item) => Some(item),
            None => {
                self.dec_pending();
                None
            }
        }
    }

    /// Saturating decrement: hard shutdown resets the counter to zero while
    /// a cancelled worker may still be releasing its slot.
    fn dec_pending(&self) {
        let _ = self
            .pending
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |p| {
                Some(p.saturating_sub(1))
            });
    }

    fn release_pending(&self) {
        self.dec_pending();
        if self.all_drained() {
            self.queue_empty.notify_waiters();
        }
    }

    /// Signalling after any outbound removal.
    fn signal_after_removal(&self) {
        if self.outbound.len() < self.queue_capacity {
            self.queue_ready.notify_waiters();
        }
        if self.all_drained() {
            self.queue_empty.notify_waiters();
        }
    }

    fn decompose_stage_open(&self) -> bool {
        self.state.is_active()
            || self.pending.load(Ordering::Acquire) > 0
            || !self.raw.is_empty()
    }

    fn convert_stage_open(&self) -> bool {
        self.state.is_active()
            || self.pending.load(Ordering::Acquire) > 0
            || !self.raw.is_empty()
            || !self.processed.is_empty()
    }
}

/// Decomposition worker: raw queue in, processed queue out.
///
/// Splits by column first; any failure there falls back to a row split.
/// A frame failing both axes is logged and abandoned.
async fn decomposition_worker(shared: Arc<PipelineShared>, binner: FrameBinner, worker: usize) {
    let poll = shared.poll_interval;
    loop {
        let Some(mut frame) = shared.reserve_pop(&shared.raw) else {
            if !shared.decompose_stage_open() {
                break;
            }
            shared.raw.wait_data(poll).await;
            continue;
        };

        if shared.decompose_enabled.load(Ordering::Relaxed) {
            match binner.bin_horizontally(&mut frame) {
                Ok(bins) => {
                    ProcessorMetrics::add(&shared.metrics.frames_decomposed, bins.len() as u64);
                    shared.processed.push_all(bins);
                }
                Err(err) => {
                    debug!(worker, error = %err, "column decomposition failed, retrying by row");
                    match binner.bin_vertically(&mut frame) {
                        Ok(bins) => {
                            ProcessorMetrics::add(
                                &shared.metrics.frames_decomposed,
                                bins.len() as u64,
                            );
                            shared.processed.push_all(bins);
                        }
                        Err(err) => {
                            warn!(worker, error = %err, "frame abandoned: failed both decomposition axes");
                            ProcessorMetrics::add(&shared.metrics.frames_failed, 1);
                        }
                    }
                }
            }
        } else {
            shared.processed.push(frame);
        }
        shared.release_pending();
    }
    debug!(worker, "decomposition worker exited");
}

/// Conversion worker: processed queue in, outbound queue out.
///
/// Request ids are allocated here, inside the worker, never on the
/// producer thread.
async fn conversion_worker(shared: Arc<PipelineShared>, worker: usize) {
    let poll = shared.poll_interval;
    loop {
        let Some(frame) = shared.reserve_pop(&shared.processed) else {
            if !shared.convert_stage_open() {
                break;
            }
            shared.processed.wait_data(poll).await;
            continue;
        };

        match shared.converter.create(frame) {
            Ok(request) => {
                ProcessorMetrics::add(&shared.metrics.requests_converted, 1);
                shared.outbound.push(request);
            }
            Err(err) => {
                warn!(worker, error = %err, "frame dropped during conversion");
                ProcessorMetrics::add(&shared.metrics.frames_failed, 1);
            }
        }
        shared.release_pending();
    }
    debug!(worker, "conversion worker exited");
}

/// High-throughput ingestion pipeline with configurable concurrency, frame
/// decomposition, and producer back-pressure.
///
/// Created inactive; [`activate`](Self::activate) spawns the worker pools
/// exactly once. Must be used from within a Tokio runtime.
///
/// # Frame ownership
///
/// A frame handed to `add_frames` belongs to the pipeline: decomposition
/// mutates it in place. Callers that need the original must clone before
/// enqueueing.
pub struct IngestionFrameProcessor {
    shared: Arc<PipelineShared>,
    /// Both worker pools; drained on shutdown.
    workers: Mutex<Vec<JoinHandle<()>>>,
    config: ProcessorConfig,
}

impl IngestionFrameProcessor {
    /// Creates an inactive processor converting for `provider`.
    pub fn new(provider: ProviderUid, config: ProcessorConfig) -> Self {
        let shared = Arc::new(PipelineShared {
            raw: SignalQueue::new(),
            processed: SignalQueue::new(),
            outbound: SignalQueue::new(),
            pending: AtomicUsize::new(0),
            state: StateCell::new(),
            queue_ready: Notify::new(),
            queue_empty: Notify::new(),
            decompose_enabled: AtomicBool::new(config.decomposition.enabled),
            converter: RequestConverter::new(provider),
            back_pressure_enabled: config.back_pressure.enabled,
            queue_capacity: config.back_pressure.queue_capacity,
            poll_interval: config.poll_interval,
            metrics: Arc::new(ProcessorMetrics::new()),
        });
        Self {
            shared,
            workers: Mutex::new(Vec::new()),
            config,
        }
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    pub fn provider(&self) -> &ProviderUid {
        self.shared.converter.provider()
    }

    pub fn state(&self) -> PipelineState {
        self.shared.state.get()
    }

    pub fn metrics(&self) -> &Arc<ProcessorMetrics> {
        &self.shared.metrics
    }

    /// True while the consumer may still obtain messages: the processor is
    /// active, work is in flight, or requests remain queued.
    pub fn is_supplying(&self) -> bool {
        self.shared.is_supplying()
    }

    /// Toggles decomposition for frames dequeued after this call. The bin
    /// size budget itself is fixed once active.
    pub fn set_frame_decomposition_enabled(&self, enabled: bool) {
        self.shared.decompose_enabled.store(enabled, Ordering::Relaxed);
    }

    /// Spawns the worker pools. Idempotent: returns `false` if the
    /// processor was already activated.
    pub fn activate(&self) -> bool {
        if !self
            .shared
            .state
            .transition(PipelineState::Created, PipelineState::Active)
        {
            return false;
        }
        let per_stage = self.config.workers_per_stage();
        let binner = FrameBinner::new(self.config.decomposition.max_bin_size);
        let mut workers = self.workers.lock().unwrap();
        for worker in 0..per_stage {
            workers.push(tokio::spawn(decomposition_worker(
                Arc::clone(&self.shared),
                binner,
                worker,
            )));
            workers.push(tokio::spawn(conversion_worker(
                Arc::clone(&self.shared),
                worker,
            )));
        }
        debug!(workers = per_stage, "pipeline activated");
        true
    }

    /// Enqueues one frame. See [`add_frames`](Self::add_frames).
    pub async fn add_frame(&self, frame: IngestionFrame) -> Result<(), IngestError> {
        self.add_frames(vec![frame]).await
    }

    /// Enqueues frames onto the raw queue, parking while the processed
    /// queue is at capacity when back-pressure is enabled.
    ///
    /// The frames belong to the pipeline afterwards. Fails with
    /// [`IngestError::Inactive`] unless the processor is active, and with
    /// [`IngestError::Interrupted`] when a park is cancelled by hard
    /// shutdown.
    pub async fn add_frames(&self, frames: Vec<IngestionFrame>) -> Result<(), IngestError> {
        if frames.is_empty() {
            return Ok(());
        }
        let mut parked = false;
        loop {
            match self.shared.state.get() {
                PipelineState::Active => {}
                PipelineState::HardTerminated if parked => return Err(IngestError::Interrupted),
                _ => return Err(IngestError::Inactive),
            }
            if !self.shared.back_pressure_enabled {
                break;
            }
            let notified = self.shared.queue_ready.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.shared.processed.len() < self.shared.queue_capacity {
                break;
            }
            ProcessorMetrics::add(&self.shared.metrics.backpressure_waits, 1);
            parked = true;
            notified.await;
        }

        let count = frames.len() as u64;
        self.shared.raw.push_all(frames);
        ProcessorMetrics::add(&self.shared.metrics.frames_submitted, count);
        Ok(())
    }

    /// Parks until the processed queue is below capacity; returns
    /// immediately when it already is or back-pressure is disabled.
    pub async fn await_queue_ready(&self) -> Result<(), IngestError> {
        let mut parked = false;
        loop {
            match self.shared.state.get() {
                PipelineState::Active => {}
                PipelineState::HardTerminated if parked => return Err(IngestError::Interrupted),
                _ => return Err(IngestError::Inactive),
            }
            if !self.shared.back_pressure_enabled {
                return Ok(());
            }
            let notified = self.shared.queue_ready.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.shared.processed.len() < self.shared.queue_capacity {
                return Ok(());
            }
            parked = true;
            notified.await;
        }
    }

    /// Parks until all three queues are empty and no work is pending;
    /// returns immediately when the pipeline is already drained.
    pub async fn await_request_queue_empty(&self) -> Result<(), IngestError> {
        loop {
            let notified = self.shared.queue_empty.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.shared.all_drained() {
                return Ok(());
            }
            notified.await;
        }
    }

    /// Blocking removal from the outbound queue.
    ///
    /// Returns queued requests even after soft shutdown; fails with
    /// [`IngestError::Inactive`] once the pipeline is inactive with nothing
    /// in flight and nothing queued.
    pub async fn take(&self) -> Result<IngestDataRequest, IngestError> {
        loop {
            let popped = match self.shared.outbound.try_pop() {
                Some(request) => Some(request),
                None => {
                    if !self.shared.is_supplying() {
                        return Err(IngestError::Inactive);
                    }
                    self.shared
                        .outbound
                        .pop_timeout(self.shared.poll_interval)
                        .await
                }
            };
            if let Some(request) = popped {
                ProcessorMetrics::add(&self.shared.metrics.requests_taken, 1);
                self.shared.signal_after_removal();
                return Ok(request);
            }
        }
    }

    /// Non-blocking removal. `Ok(None)` means nothing is queued right now
    /// but the pipeline may still supply.
    pub fn try_poll(&self) -> Result<Option<IngestDataRequest>, IngestError> {
        if let Some(request) = self.shared.outbound.try_pop() {
            ProcessorMetrics::add(&self.shared.metrics.requests_taken, 1);
            self.shared.signal_after_removal();
            return Ok(Some(request));
        }
        if !self.shared.is_supplying() {
            return Err(IngestError::Inactive);
        }
        Ok(None)
    }

    /// Time-bounded removal. `Ok(None)` reports an elapsed timeout; the
    /// caller distinguishes a drained pipeline via
    /// [`is_supplying`](Self::is_supplying).
    pub async fn poll_timeout(
        &self,
        timeout: Duration,
    ) -> Result<Option<IngestDataRequest>, IngestError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            match self.try_poll()? {
                Some(request) => return Ok(Some(request)),
                None => {
                    let remaining = deadline - tokio::time::Instant::now();
                    if remaining.is_zero() {
                        return Ok(None);
                    }
                    self.shared
                        .outbound
                        .wait_data(remaining.min(self.shared.poll_interval))
                        .await;
                }
            }
        }
    }

    /// Soft shutdown: refuses new frames, lets the workers drain the raw
    /// and processed queues, and joins both pools.
    ///
    /// Returns `Ok(false)` when the pools did not terminate within the
    /// configured timeout. Outbound requests remain takeable either way.
    pub async fn shutdown(&self) -> Result<bool, IngestError> {
        if self
            .shared
            .state
            .transition(PipelineState::Created, PipelineState::Terminated)
        {
            return Ok(true);
        }
        if self
            .shared
            .state
            .transition(PipelineState::Active, PipelineState::SoftShutdown)
        {
            // Wake idle workers and parked producers so they observe the
            // state flip without waiting out a poll interval.
            self.shared.raw.wake_all();
            self.shared.processed.wake_all();
            self.shared.queue_ready.notify_waiters();
        }
        if self.shared.state.get() != PipelineState::SoftShutdown {
            return Ok(true);
        }

        let handles: Vec<JoinHandle<()>> = std::mem::take(&mut *self.workers.lock().unwrap());
        let join_all = async {
            for handle in handles {
                let _ = handle.await;
            }
        };
        match tokio::time::timeout(self.config.shutdown_timeout, join_all).await {
            Ok(()) => {
                self.shared
                    .state
                    .transition(PipelineState::SoftShutdown, PipelineState::Terminated);
                // Wake consumers so a parked `take` observes the terminal
                // state once the outbound queue drains.
                self.shared.outbound.wake_all();
                if self.shared.all_drained() {
                    self.shared.queue_empty.notify_waiters();
                }
                debug!("pipeline terminated");
                Ok(true)
            }
            Err(_) => {
                warn!(timeout = ?self.config.shutdown_timeout, "worker pools did not terminate in time");
                Ok(false)
            }
        }
    }

    /// Hard shutdown: cancels the workers, clears all three queues, and
    /// returns immediately. In-flight work is discarded.
    pub fn shutdown_now(&self) {
        self.shared.state.set(PipelineState::HardTerminated);
        for handle in self.workers.lock().unwrap().drain(..) {
            handle.abort();
        }
        // Closing discards late pushes from workers that have not yet hit
        // their cancellation point.
        let dropped = self.shared.raw.close()
            + self.shared.processed.close()
            + self.shared.outbound.close();
        self.shared.pending.store(0, Ordering::Release);
        // Every waiter re-observes state and finds the pipeline terminal.
        self.shared.raw.wake_all();
        self.shared.processed.wake_all();
        self.shared.outbound.wake_all();
        self.shared.queue_ready.notify_waiters();
        self.shared.queue_empty.notify_waiters();
        debug!(dropped, "pipeline hard-terminated");
    }
}
