//! Pipeline lifecycle state.

use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle of the frame processor.
///
/// `Created -> Active -> SoftShutdown -> Terminated`, with the side arc
/// `Active -> HardTerminated`. Activation happens exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PipelineState {
    /// Configuration mutable; no workers; all queues empty.
    Created = 0,
    /// Workers running; configuration locked.
    Active = 1,
    /// Producers refused; workers draining in-flight work.
    SoftShutdown = 2,
    /// Workers joined after a drain.
    Terminated = 3,
    /// Workers cancelled; queues cleared.
    HardTerminated = 4,
}

impl PipelineState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Created,
            1 => Self::Active,
            2 => Self::SoftShutdown,
            3 => Self::Terminated,
            _ => Self::HardTerminated,
        }
    }
}

/// Atomic cell holding the pipeline state.
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub fn new() -> Self {
        Self(AtomicU8::new(PipelineState::Created as u8))
    }

    pub fn get(&self) -> PipelineState {
        PipelineState::from_u8(self.0.load(Ordering::Acquire))
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.get() == PipelineState::Active
    }

    pub fn set(&self, to: PipelineState) {
        self.0.store(to as u8, Ordering::Release);
    }

    /// Moves `from -> to`; returns `false` if the state was not `from`.
    pub fn transition(&self, from: PipelineState, to: PipelineState) -> bool {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}
