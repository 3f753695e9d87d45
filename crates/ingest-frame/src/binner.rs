//! Size-budgeted frame decomposition.
//!
//! The binner splits one frame into an ordered sequence of frames, each
//! within an allocation budget, draining the source in the process. Two
//! axes are supported: horizontal (by column) and vertical (by row).
//!
//! Horizontal bins arrive in ascending source-column order; vertical bins
//! in ascending timestamp order (head first). Callers pick the axis —
//! column-shaped frames split naturally by column, but a frame with one
//! oversized column can only split by row.

use crate::error::FrameError;
use crate::frame::IngestionFrame;
use crate::params::BinParameters;

/// Decomposes frames into bins of at most `max_bin_size` payload bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameBinner {
    max_bin_size: u64,
}

impl FrameBinner {
    pub fn new(max_bin_size: u64) -> Self {
        Self { max_bin_size }
    }

    pub fn max_bin_size(&self) -> u64 {
        self.max_bin_size
    }

    /// Derives the binning arithmetic for `frame` under this budget.
    pub fn params(&self, frame: &IngestionFrame) -> Result<BinParameters, FrameError> {
        BinParameters::for_frame(frame, self.max_bin_size)
    }

    /// Splits `frame` by column into bins within budget, draining the
    /// source.
    ///
    /// A frame already within budget is moved out unchanged as a singleton.
    /// Fails fast with [`FrameError::ColumnExceedsBin`] before any
    /// extraction when the widest column alone overflows a bin; the source
    /// is left intact in that case.
    pub fn bin_horizontally(
        &self,
        frame: &mut IngestionFrame,
    ) -> Result<Vec<IngestionFrame>, FrameError> {
        let params = self.params(frame)?;
        if !params.requires_binning() {
            return Ok(vec![frame.take()]);
        }

        if let Some((name, size)) = frame.widest_column() {
            if size > params.bin_size {
                return Err(FrameError::ColumnExceedsBin {
                    name: name.to_string(),
                    size,
                    bin_size: params.bin_size,
                });
            }
        }

        let cols_per_bin = frame.column_count().div_ceil(params.bin_count as usize);
        let mut bins = Vec::with_capacity(params.bin_count as usize);
        for _ in 0..params.bin_count {
            if !frame.has_data() {
                break;
            }
            bins.push(frame.remove_columns_by_index(cols_per_bin));
        }

        if frame.has_data() {
            return Err(FrameError::IncompleteDecomposition {
                remaining: frame.column_count(),
            });
        }
        Ok(bins)
    }

    /// Splits `frame` by row into bins within budget, draining the source.
    ///
    /// A frame already within budget is moved out unchanged as a singleton.
    /// Fails fast with [`FrameError::RowExceedsBin`] before any extraction
    /// when the widest row alone overflows a bin.
    pub fn bin_vertically(
        &self,
        frame: &mut IngestionFrame,
    ) -> Result<Vec<IngestionFrame>, FrameError> {
        let params = self.params(frame)?;
        if !params.requires_binning() {
            return Ok(vec![frame.take()]);
        }

        let row_size = frame.allocation_size_row();
        if row_size > params.bin_size {
            return Err(FrameError::RowExceedsBin {
                size: row_size,
                bin_size: params.bin_size,
            });
        }

        let rows_per_bin = frame.row_count().div_ceil(params.bin_count as usize);
        let mut bins = Vec::with_capacity(params.bin_count as usize);
        for _ in 0..params.bin_count {
            if !frame.has_data() {
                break;
            }
            bins.push(frame.remove_rows_at_head(rows_per_bin));
        }

        if frame.has_data() {
            return Err(FrameError::IncompleteDecomposition {
                remaining: frame.row_count(),
            });
        }
        Ok(bins)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{ColumnValues, DataColumn};
    use crate::timestamps::{FrameTimestamps, SamplingClock};

    /// `cols` columns of `rows` doubles each: 8 bytes per value.
    fn uniform_frame(cols: usize, rows: usize) -> IngestionFrame {
        let columns = (0..cols)
            .map(|i| DataColumn::doubles(format!("col-{i}"), vec![i as f64; rows]))
            .collect();
        IngestionFrame::new(
            FrameTimestamps::Clock(SamplingClock::new(0, 1_000, rows)),
            columns,
        )
        .unwrap()
    }

    #[test]
    fn pass_through_returns_frame_unchanged() {
        let binner = FrameBinner::new(4_194_304);
        // 1,000 bytes of payload, far under budget.
        let original = uniform_frame(5, 25);
        assert_eq!(original.allocation_size_frame(), 1_000);

        let mut frame = original.clone();
        let bins = binner.bin_horizontally(&mut frame).unwrap();
        assert_eq!(bins, vec![original.clone()]);

        let mut frame = original.clone();
        let bins = binner.bin_vertically(&mut frame).unwrap();
        assert_eq!(bins, vec![original]);
    }

    #[test]
    fn horizontal_split_groups_columns_in_order() {
        // 8 equal columns, 10,240 bytes total, 4,096-byte budget:
        // bin_count = 3, cols_per_bin = 3 -> groupings [0,1,2] [3,4,5] [6,7].
        let mut frame = uniform_frame(8, 160);
        assert_eq!(frame.allocation_size_frame(), 10_240);

        let binner = FrameBinner::new(4_096);
        let bins = binner.bin_horizontally(&mut frame).unwrap();

        assert_eq!(bins.len(), 3);
        let names: Vec<Vec<&str>> = bins
            .iter()
            .map(|b| b.columns().iter().map(|c| c.name.as_str()).collect())
            .collect();
        assert_eq!(names[0], ["col-0", "col-1", "col-2"]);
        assert_eq!(names[1], ["col-3", "col-4", "col-5"]);
        assert_eq!(names[2], ["col-6", "col-7"]);
        for bin in &bins {
            assert!(bin.allocation_size_frame() <= 4_096);
            assert_eq!(bin.row_count(), 160);
        }
        assert!(!frame.has_data());
    }

    #[test]
    fn vertical_split_partitions_rows_in_time_order() {
        // 1,000 rows of 10 bytes each (one 10-byte string per row),
        // 4,000-byte budget: bin_count = 3, rows_per_bin = 334.
        let values: Vec<String> = (0..1_000).map(|i| format!("{i:010}")).collect();
        let mut frame = IngestionFrame::new(
            FrameTimestamps::Clock(SamplingClock::new(0, 1, 1_000)),
            vec![DataColumn::strings("s", values)],
        )
        .unwrap();
        assert_eq!(frame.allocation_size_frame(), 10_000);

        let binner = FrameBinner::new(4_000);
        let bins = binner.bin_vertically(&mut frame).unwrap();

        assert_eq!(bins.len(), 3);
        assert_eq!(bins[0].row_count(), 334);
        assert_eq!(bins[1].row_count(), 334);
        assert_eq!(bins[2].row_count(), 332);
        assert_eq!(bins[0].timestamps().first(), Some(0));
        assert_eq!(bins[1].timestamps().first(), Some(334));
        assert_eq!(bins[2].timestamps().first(), Some(668));
        assert!(!frame.has_data());
    }

    #[test]
    fn vertical_concatenation_reconstructs_timestamps() {
        let instants: Vec<i64> = (0..100).map(|i| i * 7).collect();
        let mut frame = IngestionFrame::new(
            FrameTimestamps::List(instants.clone()),
            vec![DataColumn::longs("v", (0..100).collect())],
        )
        .unwrap();

        let binner = FrameBinner::new(300);
        let bins = binner.bin_vertically(&mut frame).unwrap();
        assert!(bins.len() > 1);

        let mut rebuilt = Vec::new();
        for bin in &bins {
            match bin.timestamps() {
                FrameTimestamps::List(list) => rebuilt.extend_from_slice(list),
                FrameTimestamps::Clock(_) => panic!("representation changed"),
            }
        }
        assert_eq!(rebuilt, instants);
    }

    #[test]
    fn oversized_column_fails_fast_and_leaves_frame_intact() {
        // A single 5,120-byte column under a 4,096-byte budget cannot be
        // split by column.
        let mut frame = uniform_frame(1, 640);
        assert_eq!(frame.allocation_size_frame(), 5_120);
        let snapshot = frame.clone();

        let binner = FrameBinner::new(4_096);
        let err = binner.bin_horizontally(&mut frame).unwrap_err();
        assert!(matches!(err, FrameError::ColumnExceedsBin { .. }));
        assert!(err.frame_intact());
        assert_eq!(frame, snapshot);

        // The same frame splits fine by row.
        let bins = binner.bin_vertically(&mut frame).unwrap();
        assert_eq!(bins.len(), 2);
        for bin in &bins {
            assert!(bin.allocation_size_frame() <= 4_096);
        }
    }

    #[test]
    fn oversized_row_fails_fast() {
        // One row of 5,000 bytes in a 9,000-byte frame under a 4,096-byte
        // budget: bin_count = 3, bin_size = 3,000, and the widest row
        // exceeds it.
        let mut frame = IngestionFrame::new(
            FrameTimestamps::List(vec![0, 1]),
            vec![DataColumn::strings(
                "s",
                vec!["x".repeat(5_000), "y".repeat(4_000)],
            )],
        )
        .unwrap();

        let binner = FrameBinner::new(4_096);
        let err = binner.bin_vertically(&mut frame).unwrap_err();
        assert!(matches!(
            err,
            FrameError::RowExceedsBin {
                size: 5_000,
                bin_size: 3_000
            }
        ));
        assert!(frame.has_data());
    }

    #[test]
    fn horizontal_preserves_column_contents() {
        let mut frame = uniform_frame(6, 100);
        let binner = FrameBinner::new(2_000);
        let bins = binner.bin_horizontally(&mut frame).unwrap();

        let all: Vec<&DataColumn> = bins.iter().flat_map(|b| b.columns()).collect();
        assert_eq!(all.len(), 6);
        for (i, column) in all.iter().enumerate() {
            assert_eq!(column.name, format!("col-{i}"));
            assert_eq!(column.values, ColumnValues::Double(vec![i as f64; 100]));
        }
    }

    #[test]
    fn zero_budget_is_rejected() {
        let binner = FrameBinner::new(0);
        let mut frame = uniform_frame(1, 1);
        assert_eq!(
            binner.bin_horizontally(&mut frame).unwrap_err(),
            FrameError::ZeroBinSize
        );
    }
}
