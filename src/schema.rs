//! Column discovery with a declared-schema path and a first-record fallback

use crate::error::{ExportError, Result, SourceError};
use crate::source::{Record, RecordSource, SchemaLookup};
use crate::types::{AttributeDescriptor, Column};

/// Which strategy produced the column list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum SchemaStrategy {
    /// The source's declared schema
    Declared,
    /// Introspection of the first record
    FirstRecord,
}

/// Column list plus the record stream it was resolved from.
///
/// When the columns came from the first record, that record is replayed
/// before the rest of the stream, so it is never lost.
pub struct ResolvedSource<S: RecordSource> {
    pub columns: Vec<Column>,
    pub strategy: SchemaStrategy,
    first: Option<S::Record>,
    rest: S::Records,
}

impl<S: RecordSource> ResolvedSource<S> {
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }
}

impl<S: RecordSource> Iterator for ResolvedSource<S> {
    type Item = std::result::Result<S::Record, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(record) = self.first.take() {
            return Some(Ok(record));
        }
        self.rest.next()
    }
}

/// Resolve the ordered column list of a record source.
///
/// Fails without touching any output when no name can be found for a position.
pub fn resolve<S: RecordSource>(source: S) -> Result<ResolvedSource<S>> {
    let declared = match source.schema() {
        SchemaLookup::Declared(descriptors) => match columns_from(&descriptors) {
            Ok(columns) => Some(columns),
            Err(position) => {
                log::debug!(
                    "declared schema has no name at column {}, introspecting first record",
                    position
                );
                None
            }
        },
        SchemaLookup::Unavailable => {
            log::debug!("declared schema unavailable, introspecting first record");
            None
        }
    };

    let mut records = source.into_records();

    if let Some(columns) = declared {
        return Ok(ResolvedSource {
            columns,
            strategy: SchemaStrategy::Declared,
            first: None,
            rest: records,
        });
    }

    let first = match records.next() {
        Some(record) => record?,
        None => {
            // Nothing declared and nothing to look at: an empty sheet
            log::debug!("record source is empty and has no declared schema");
            return Ok(ResolvedSource {
                columns: Vec::new(),
                strategy: SchemaStrategy::FirstRecord,
                first: None,
                rest: records,
            });
        }
    };

    let descriptors = first
        .descriptors()
        .ok_or_else(|| ExportError::SchemaResolution {
            position: 0,
            reason: "first record cannot describe its attributes".to_string(),
        })?;

    let columns = columns_from(&descriptors).map_err(|position| ExportError::SchemaResolution {
        position,
        reason: "attribute has no name".to_string(),
    })?;

    Ok(ResolvedSource {
        columns,
        strategy: SchemaStrategy::FirstRecord,
        first: Some(first),
        rest: records,
    })
}

/// Columns named by each descriptor's local name; `Err` carries the first unnamed position
fn columns_from(descriptors: &[AttributeDescriptor]) -> std::result::Result<Vec<Column>, usize> {
    descriptors
        .iter()
        .enumerate()
        .map(|(index, d)| match &d.name {
            Some(name) => Ok(Column::new(index, name.local_part())),
            None => Err(index),
        })
        .collect()
}
