//! Error types for geosheet exports

use thiserror::Error;

/// Result type alias for export operations
pub type Result<T> = std::result::Result<T, ExportError>;

/// Main error type for all export operations.
///
/// Every variant aborts the whole export; nothing is retried internally
/// because record sources are single-pass.
#[derive(Error, Debug)]
pub enum ExportError {
    /// No usable column list could be derived from the record source
    #[error("Failed to resolve schema at column {position}: {reason}")]
    SchemaResolution { position: usize, reason: String },

    /// The requested output kind is not one of the supported workbook formats
    #[error("Unsupported output format: {0}")]
    UnsupportedFormat(String),

    /// The resolved column list is wider than the format allows
    #[error("{columns} columns exceed the format limit of {max}")]
    ColumnCapacityExceeded { columns: usize, max: usize },

    /// Appending a row would exceed the format's row limit
    #[error("Row {row} exceeds the format limit of {max} rows")]
    RowCapacityExceeded { row: u64, max: u32 },

    /// A text cell is longer than the format allows
    #[error("Cell at row {row}, column {column} holds {len} characters, limit is {max}")]
    CellCapacityExceeded {
        row: u32,
        column: usize,
        len: usize,
        max: usize,
    },

    /// The record source failed while producing records or attributes
    #[error("Record source error: {0}")]
    Source(#[from] SourceError),

    /// IO error wrapper (staging files and the output sink)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The zip or compound-file container failed to serialize
    #[error("Failed to write container: {0}")]
    Container(String),

    /// A session operation was called out of order
    #[error("Export session is {actual}, expected {expected}")]
    InvalidState {
        expected: &'static str,
        actual: &'static str,
    },

    /// Export options failed validation
    #[error("Invalid export options: {0}")]
    InvalidOptions(String),
}

impl ExportError {
    /// True for structural format limit violations
    pub fn is_capacity(&self) -> bool {
        matches!(
            self,
            ExportError::ColumnCapacityExceeded { .. }
                | ExportError::RowCapacityExceeded { .. }
                | ExportError::CellCapacityExceeded { .. }
        )
    }

    /// True for lower-level failures reading the source or writing output
    pub fn is_encoding(&self) -> bool {
        matches!(
            self,
            ExportError::Source(_) | ExportError::Io(_) | ExportError::Container(_)
        )
    }

    pub(crate) fn container<E: std::fmt::Display>(err: E) -> Self {
        ExportError::Container(err.to_string())
    }
}

/// Errors raised by a [`RecordSource`](crate::source::RecordSource) implementation
#[derive(Error, Debug)]
pub enum SourceError {
    /// The backing store failed to deliver the next record
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// An attribute index could not be read from a record
    #[error("Attribute {index} could not be read: {reason}")]
    Attribute { index: usize, reason: String },

    /// Any other source-specific failure
    #[error("{0}")]
    Other(String),
}
