//! Derived binning parameters.

use crate::error::FrameError;
use crate::frame::IngestionFrame;

/// The arithmetic of one decomposition: how many bins a frame needs and how
/// large each may be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinParameters {
    /// Total payload bytes of the source frame.
    pub frame_size: u64,
    /// The allocation budget per bin.
    pub max_bin_size: u64,
    /// Number of bins: `ceil(frame_size / max_bin_size)`, at least 1.
    pub bin_count: u64,
    /// Target payload per bin: `floor(frame_size / bin_count)`.
    pub bin_size: u64,
}

impl BinParameters {
    /// Derives parameters for splitting `frame_size` bytes under
    /// `max_bin_size`.
    pub fn derive(frame_size: u64, max_bin_size: u64) -> Result<Self, FrameError> {
        if max_bin_size == 0 {
            return Err(FrameError::ZeroBinSize);
        }
        let bin_count = frame_size.div_ceil(max_bin_size).max(1);
        Ok(Self {
            frame_size,
            max_bin_size,
            bin_count,
            bin_size: frame_size / bin_count,
        })
    }

    /// Derives parameters for one frame.
    pub fn for_frame(frame: &IngestionFrame, max_bin_size: u64) -> Result<Self, FrameError> {
        Self::derive(frame.allocation_size_frame(), max_bin_size)
    }

    /// Whether the frame is over budget and must be decomposed.
    #[inline]
    pub fn requires_binning(&self) -> bool {
        self.frame_size > self.max_bin_size
    }
}
