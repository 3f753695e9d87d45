//! Error types for frame construction and decomposition.

use thiserror::Error;

/// Errors raised by frame construction, conversion, and binning.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// The frame carries no column data.
    #[error("frame has no data")]
    Empty,

    /// A column's value count disagrees with the frame's row count.
    #[error("column `{name}` has {actual} values, expected {expected}")]
    LengthMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    /// The frame has column data but no timestamps covering it.
    #[error("frame has no timestamps for {rows} rows")]
    MissingTimestamps { rows: usize },

    /// A single column is wider than the bin budget allows.
    #[error("column `{name}` occupies {size} bytes, over the bin size of {bin_size}")]
    ColumnExceedsBin {
        name: String,
        size: u64,
        bin_size: u64,
    },

    /// A single row is wider than the bin budget allows.
    #[error("a row occupies {size} bytes, over the bin size of {bin_size}")]
    RowExceedsBin { size: u64, bin_size: u64 },

    /// Decomposition finished without draining the source frame.
    #[error("decomposition left {remaining} columns or rows in the source")]
    IncompleteDecomposition { remaining: usize },

    /// A bin budget of zero bytes was requested.
    #[error("bin size must be positive")]
    ZeroBinSize,
}

impl FrameError {
    /// Returns `true` if the source frame is still intact after this error.
    ///
    /// Fail-fast errors are raised before any extraction, so the caller may
    /// retry with a different decomposition axis. `IncompleteDecomposition`
    /// is raised after partial extraction and the source must be abandoned.
    #[inline]
    pub fn frame_intact(&self) -> bool {
        !matches!(self, Self::IncompleteDecomposition { .. })
    }
}
