//! Pipeline throughput counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Statistical counters for the frame processor.
///
/// All counters use `Ordering::Relaxed`: nothing in the pipeline's control
/// flow reads them, so eventual visibility is enough and the hot paths stay
/// free of memory barriers.
#[derive(Debug, Default)]
pub struct ProcessorMetrics {
    /// Frames accepted by `add_frames`.
    pub frames_submitted: AtomicU64,
    /// Sub-frames produced by the decomposition stage.
    pub frames_decomposed: AtomicU64,
    /// Frames abandoned after a worker-level failure.
    pub frames_failed: AtomicU64,
    /// Requests produced by the conversion stage.
    pub requests_converted: AtomicU64,
    /// Requests removed by the consumer.
    pub requests_taken: AtomicU64,
    /// Times a producer parked on the back-pressure gate.
    pub backpressure_waits: AtomicU64,
}

impl ProcessorMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames_submitted(&self) -> u64 {
        self.frames_submitted.load(Ordering::Relaxed)
    }

    pub fn frames_decomposed(&self) -> u64 {
        self.frames_decomposed.load(Ordering::Relaxed)
    }

    pub fn frames_failed(&self) -> u64 {
        self.frames_failed.load(Ordering::Relaxed)
    }

    pub fn requests_converted(&self) -> u64 {
        self.requests_converted.load(Ordering::Relaxed)
    }

    pub fn requests_taken(&self) -> u64 {
        self.requests_taken.load(Ordering::Relaxed)
    }

    pub fn backpressure_waits(&self) -> u64 {
        self.backpressure_waits.load(Ordering::Relaxed)
    }

    pub(crate) fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }
}
