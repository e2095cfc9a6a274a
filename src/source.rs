//! Record source capability consumed by the exporter
//!
//! A source offers two things: an optional declared schema, and a lazy,
//! single-pass sequence of records with per-index attribute access.

use crate::error::SourceError;
use crate::types::{AttributeDescriptor, AttributeValue, QualifiedName};
use std::sync::Arc;

/// Outcome of asking a source for its declared schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaLookup {
    /// Attribute descriptors in declared order
    Declared(Vec<AttributeDescriptor>),
    /// The source cannot describe itself up front
    Unavailable,
}

/// A single feature record
pub trait Record {
    /// Value at `index`.
    ///
    /// `Ok(None)` means the record has no attribute at that position; an
    /// `Err` means the attribute exists but could not be read.
    fn attribute(&self, index: usize) -> Result<Option<&AttributeValue>, SourceError>;

    /// Introspected attribute descriptors in natural order, if the record can describe itself
    fn descriptors(&self) -> Option<Vec<AttributeDescriptor>>;
}

/// Forward-only provider of records
pub trait RecordSource {
    type Record: Record;
    type Records: Iterator<Item = Result<Self::Record, SourceError>>;

    /// Declared schema, or [`SchemaLookup::Unavailable`]
    fn schema(&self) -> SchemaLookup;

    /// Consume the source into its record sequence (not restartable)
    fn into_records(self) -> Self::Records;
}

/// Record held fully in memory
#[derive(Debug, Clone)]
pub struct InMemoryRecord {
    descriptors: Option<Arc<Vec<AttributeDescriptor>>>,
    values: Vec<AttributeValue>,
}

impl InMemoryRecord {
    /// Record without self-description
    pub fn new(values: Vec<AttributeValue>) -> Self {
        InMemoryRecord {
            descriptors: None,
            values,
        }
    }

    /// Record that can describe its own attributes
    pub fn named<I, N>(attributes: I) -> Self
    where
        I: IntoIterator<Item = (N, AttributeValue)>,
        N: Into<QualifiedName>,
    {
        let (descriptors, values): (Vec<_>, Vec<_>) = attributes
            .into_iter()
            .map(|(name, value)| (AttributeDescriptor::named(name), value))
            .unzip();
        InMemoryRecord {
            descriptors: Some(Arc::new(descriptors)),
            values,
        }
    }

    pub fn values(&self) -> &[AttributeValue] {
        &self.values
    }
}

impl Record for InMemoryRecord {
    fn attribute(&self, index: usize) -> Result<Option<&AttributeValue>, SourceError> {
        Ok(self.values.get(index))
    }

    fn descriptors(&self) -> Option<Vec<AttributeDescriptor>> {
        self.descriptors.as_ref().map(|d| d.as_ref().clone())
    }
}

/// Record source backed by a `Vec`
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    declared: Option<Arc<Vec<AttributeDescriptor>>>,
    records: Vec<InMemoryRecord>,
}

impl InMemorySource {
    /// Source with a declared schema
    pub fn with_schema<I, N>(names: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<QualifiedName>,
    {
        let descriptors = names.into_iter().map(AttributeDescriptor::named).collect();
        InMemorySource {
            declared: Some(Arc::new(descriptors)),
            records: Vec::new(),
        }
    }

    /// Source whose schema has to be discovered from its records
    pub fn without_schema() -> Self {
        InMemorySource::default()
    }

    /// Append a row of values described by the declared schema
    pub fn push(&mut self, values: Vec<AttributeValue>) {
        self.records.push(InMemoryRecord {
            descriptors: self.declared.clone(),
            values,
        });
    }

    /// Append a prepared record
    pub fn push_record(&mut self, record: InMemoryRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

type RecordResult = Result<InMemoryRecord, SourceError>;

impl RecordSource for InMemorySource {
    type Record = InMemoryRecord;
    type Records = std::iter::Map<std::vec::IntoIter<InMemoryRecord>, fn(InMemoryRecord) -> RecordResult>;

    fn schema(&self) -> SchemaLookup {
        match &self.declared {
            Some(descriptors) => SchemaLookup::Declared(descriptors.as_ref().clone()),
            None => SchemaLookup::Unavailable,
        }
    }

    fn into_records(self) -> Self::Records {
        self.records.into_iter().map(Ok as fn(InMemoryRecord) -> RecordResult)
    }
}
