//! The ingestion frame: a columnar table of samples with aligned timestamps.
//!
//! # Allocation semantics
//!
//! All `allocation_size_*` figures count the in-memory payload bytes of the
//! column data: bool 1, i32/f32 4, i64/f64 8, string its UTF-8 byte length.
//! Timestamps and metadata are excluded; decomposition duplicates them
//! across bins, so budgeting them would double-count.
//!
//! # Ownership
//!
//! The extraction operations (`remove_columns_by_index`,
//! `remove_rows_at_head`) mutate the source frame. Callers that need the
//! original after handing a frame to a binner or pipeline must clone first.

use crate::error::FrameError;
use crate::timestamps::{FrameTimestamps, TimeDomain};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Typed value storage for one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnValues {
    Bool(Vec<bool>),
    Int(Vec<i32>),
    Long(Vec<i64>),
    Float(Vec<f32>),
    Double(Vec<f64>),
    Text(Vec<String>),
}

impl ColumnValues {
    /// Number of values in the column.
    pub fn len(&self) -> usize {
        match self {
            Self::Bool(v) => v.len(),
            Self::Int(v) => v.len(),
            Self::Long(v) => v.len(),
            Self::Float(v) => v.len(),
            Self::Double(v) => v.len(),
            Self::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Type name for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Long(_) => "long",
            Self::Float(_) => "float",
            Self::Double(_) => "double",
            Self::Text(_) => "string",
        }
    }

    /// Payload bytes of the value at `index`.
    pub(crate) fn value_size(&self, index: usize) -> u64 {
        match self {
            Self::Bool(_) => 1,
            Self::Int(_) | Self::Float(_) => 4,
            Self::Long(_) | Self::Double(_) => 8,
            Self::Text(v) => v.get(index).map_or(0, |s| s.len() as u64),
        }
    }

    /// Total payload bytes of the column.
    pub fn payload_size(&self) -> u64 {
        match self {
            Self::Bool(v) => v.len() as u64,
            Self::Int(v) => 4 * v.len() as u64,
            Self::Long(v) => 8 * v.len() as u64,
            Self::Float(v) => 4 * v.len() as u64,
            Self::Double(v) => 8 * v.len() as u64,
            Self::Text(v) => v.iter().map(|s| s.len() as u64).sum(),
        }
    }

    /// Splits off the first `n` values, leaving the remainder in `self`.
    pub(crate) fn split_head(&mut self, n: usize) -> ColumnValues {
        fn head<T>(values: &mut Vec<T>, n: usize) -> Vec<T> {
            let n = n.min(values.len());
            let rest = values.split_off(n);
            std::mem::replace(values, rest)
        }
        match self {
            Self::Bool(v) => Self::Bool(head(v, n)),
            Self::Int(v) => Self::Int(head(v, n)),
            Self::Long(v) => Self::Long(head(v, n)),
            Self::Float(v) => Self::Float(head(v, n)),
            Self::Double(v) => Self::Double(head(v, n)),
            Self::Text(v) => Self::Text(head(v, n)),
        }
    }
}

/// One named, typed column of a frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataColumn {
    pub name: String,
    pub values: ColumnValues,
}

impl DataColumn {
    pub fn new(name: impl Into<String>, values: ColumnValues) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// Convenience constructor for a double-typed column.
    pub fn doubles(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self::new(name, ColumnValues::Double(values))
    }

    /// Convenience constructor for a long-typed column.
    pub fn longs(name: impl Into<String>, values: Vec<i64>) -> Self {
        Self::new(name, ColumnValues::Long(values))
    }

    /// Convenience constructor for a string-typed column.
    pub fn strings(name: impl Into<String>, values: Vec<String>) -> Self {
        Self::new(name, ColumnValues::Text(values))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Payload bytes of the whole column.
    pub fn allocation_size(&self) -> u64 {
        self.values.payload_size()
    }
}

/// The contents drained out of a frame, ready for conversion to a request.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameContents {
    pub timestamps: FrameTimestamps,
    pub columns: Vec<DataColumn>,
    pub attributes: BTreeMap<String, String>,
    pub snapshot_id: Option<String>,
    pub snapshot_domain: Option<TimeDomain>,
    pub label: Option<String>,
}

/// A columnar table of samples with aligned timestamps and optional
/// metadata — the unit of ingestion.
///
/// All columns share the same length, which equals the timestamp count.
/// Construction validates this; the extraction operations preserve it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IngestionFrame {
    timestamps: FrameTimestamps,
    columns: Vec<DataColumn>,
    attributes: BTreeMap<String, String>,
    snapshot_id: Option<String>,
    snapshot_domain: Option<TimeDomain>,
    label: Option<String>,
}

impl IngestionFrame {
    /// Creates a frame, validating that every column matches the timestamp
    /// count.
    pub fn new(
        timestamps: FrameTimestamps,
        columns: Vec<DataColumn>,
    ) -> Result<Self, FrameError> {
        let rows = timestamps.len();
        for column in &columns {
            if column.len() != rows {
                return Err(FrameError::LengthMismatch {
                    name: column.name.clone(),
                    expected: rows,
                    actual: column.len(),
                });
            }
        }
        if rows > 0 && columns.is_empty() {
            return Err(FrameError::Empty);
        }
        if rows == 0 && !columns.is_empty() {
            return Err(FrameError::MissingTimestamps {
                rows: columns[0].len(),
            });
        }
        Ok(Self {
            timestamps,
            columns,
            ..Self::default()
        })
    }

    // --- metadata ---

    pub fn timestamps(&self) -> &FrameTimestamps {
        &self.timestamps
    }

    pub fn columns(&self) -> &[DataColumn] {
        &self.columns
    }

    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    /// Adds one free-form attribute.
    pub fn insert_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(key.into(), value.into());
    }

    pub fn snapshot_id(&self) -> Option<&str> {
        self.snapshot_id.as_deref()
    }

    pub fn snapshot_domain(&self) -> Option<TimeDomain> {
        self.snapshot_domain
    }

    /// Tags the frame with a snapshot identifier and its time domain.
    pub fn set_snapshot(&mut self, id: impl Into<String>, domain: TimeDomain) {
        self.snapshot_id = Some(id.into());
        self.snapshot_domain = Some(domain);
    }

    pub fn set_snapshot_id(&mut self, id: impl Into<String>) {
        self.snapshot_id = Some(id.into());
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Caller-assigned frame label, carried through decomposition.
    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = Some(label.into());
    }

    // --- capabilities ---

    pub fn row_count(&self) -> usize {
        self.timestamps.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn has_data(&self) -> bool {
        !self.columns.is_empty() && self.row_count() > 0
    }

    /// Total payload bytes of all columns.
    pub fn allocation_size_frame(&self) -> u64 {
        self.columns.iter().map(DataColumn::allocation_size).sum()
    }

    /// Payload bytes of the widest column.
    pub fn allocation_size_column(&self) -> u64 {
        self.widest_column().map_or(0, |(_, size)| size)
    }

    /// Payload bytes of the widest row.
    pub fn allocation_size_row(&self) -> u64 {
        (0..self.row_count())
            .map(|row| {
                self.columns
                    .iter()
                    .map(|c| c.values.value_size(row))
                    .sum::<u64>()
            })
            .max()
            .unwrap_or(0)
    }

    /// Name and payload size of the widest column.
    pub(crate) fn widest_column(&self) -> Option<(&str, u64)> {
        self.columns
            .iter()
            .map(|c| (c.name.as_str(), c.allocation_size()))
            .max_by_key(|&(_, size)| size)
    }

    // --- extraction (mutating) ---

    /// Extracts the first `n` columns into a new frame, leaving the source
    /// with the rest.
    ///
    /// The extracted frame shares the timestamp representation and carries a
    /// copy of the metadata. `n` is clamped to the available column count.
    pub fn remove_columns_by_index(&mut self, n: usize) -> IngestionFrame {
        let n = n.min(self.columns.len());
        let rest = self.columns.split_off(n);
        let taken = std::mem::replace(&mut self.columns, rest);
        IngestionFrame {
            timestamps: self.timestamps.clone(),
            columns: taken,
            attributes: self.attributes.clone(),
            snapshot_id: self.snapshot_id.clone(),
            snapshot_domain: self.snapshot_domain,
            label: self.label.clone(),
        }
    }

    /// Extracts the first `n` rows into a new frame, leaving the source with
    /// the rest.
    ///
    /// Timestamps split at the cut: a sampling clock becomes two clocks, a
    /// list is divided. Metadata is copied. `n` is clamped to the row count.
    pub fn remove_rows_at_head(&mut self, n: usize) -> IngestionFrame {
        let head_timestamps = self.timestamps.split_head(n);
        let taken = self
            .columns
            .iter_mut()
            .map(|c| DataColumn::new(c.name.clone(), c.values.split_head(n)))
            .collect();
        // A fully drained source keeps its (now empty) columns; has_data()
        // reports false once the row count reaches zero.
        IngestionFrame {
            timestamps: head_timestamps,
            columns: taken,
            attributes: self.attributes.clone(),
            snapshot_id: self.snapshot_id.clone(),
            snapshot_domain: self.snapshot_domain,
            label: self.label.clone(),
        }
    }

    /// Replaces `self` with an empty frame and returns the original.
    pub fn take(&mut self) -> IngestionFrame {
        std::mem::take(self)
    }

    /// Drains the frame into its constituent parts.
    pub fn into_contents(self) -> FrameContents {
        FrameContents {
            timestamps: self.timestamps,
            columns: self.columns,
            attributes: self.attributes,
            snapshot_id: self.snapshot_id,
            snapshot_domain: self.snapshot_domain,
            label: self.label,
        }
    }
}
