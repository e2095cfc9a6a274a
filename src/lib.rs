//! # geosheet
//!
//! Streaming export of feature records (attributes plus geometries) into
//! spreadsheet workbooks.
//!
//! ## Features
//!
//! - **Two formats**: legacy binary `.xls` (65 536 × 256) and zipped-XML `.xlsx` (1 048 576 × 16 384)
//! - **Bounded memory**: only the most recent rows stay in memory; older rows are staged on disk
//! - **Schema discovery**: declared schema first, first-record introspection as fallback
//! - **Geometry as WKT**: geometries are written as well-known text
//! - **No silent truncation**: exceeding a format limit is an error
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use geosheet::{encode, AttributeValue, InMemorySource, MIME_XLSX};
//! use geo_types::Point;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut source = InMemorySource::with_schema(["id", "name", "geom"]);
//! source.push(vec![1i64.into(), "a".into(), Point::new(0.0, 0.0).into()]);
//! source.push(vec![AttributeValue::Null, "b".into(), AttributeValue::Null]);
//!
//! let file = std::fs::File::create("features.xlsx")?;
//! let summary = encode(source, file, MIME_XLSX)?;
//! println!("{} rows written", summary.data_rows);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod container;
pub mod encoder;
pub mod error;
pub mod profile;
pub mod schema;
pub mod source;
pub mod types;
pub mod width;
pub mod window;
pub mod wkt;
pub mod writer;

pub use config::ExportOptions;
pub use encoder::encode_value;
pub use error::{ExportError, Result, SourceError};
pub use profile::{FormatKind, FormatProfile, MIME_XLS, MIME_XLSX};
pub use schema::SchemaStrategy;
pub use source::{InMemoryRecord, InMemorySource, Record, RecordSource, SchemaLookup};
pub use types::{AttributeValue, CellStyle, CellValue, Column, Row, StyledCell};
pub use writer::{ExportSession, ExportSummary, Exporter, SessionState};

use std::io::Write;

/// Export every record of `source` to `sink` as the workbook kind named by
/// `media_type` (a media type or the `xls` / `xlsx` extension).
///
/// Uses [`ExportOptions::default`]. An unrecognized `media_type` fails before
/// the source is touched or anything is allocated.
pub fn encode<S, W>(source: S, sink: W, media_type: &str) -> Result<ExportSummary>
where
    S: RecordSource,
    W: Write,
{
    let kind = FormatKind::from_media_type(media_type)?;
    Exporter::default().encode(source, sink, kind)
}
