//! Streaming sheet writer: the export session state machine
//!
//! An [`ExportSession`] turns records into rows, keeps the most recent rows in
//! a bounded [`RowWindow`], hands older rows to the container's staging file,
//! and serializes the finished workbook to the sink in one pass.

use crate::config::ExportOptions;
use crate::container::{self, SheetContainer};
use crate::encoder::encode_value;
use crate::error::{ExportError, Result};
use crate::profile::{FormatKind, FormatProfile};
use crate::schema::{self, SchemaStrategy};
use crate::source::{Record, RecordSource};
use crate::types::{CellStyle, CellValue, Column, Row, StyledCell};
use crate::width::{self, ColumnWidthTracker};
use crate::window::RowWindow;
use std::io::Write;

/// Lifecycle of an export session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Initialized,
    SchemaResolved,
    HeaderWritten,
    EncodingRows,
    Finalized,
    Serialized,
    /// Terminal; no further writes are attempted
    Failed,
}

impl SessionState {
    pub fn name(self) -> &'static str {
        match self {
            SessionState::Initialized => "initialized",
            SessionState::SchemaResolved => "schema-resolved",
            SessionState::HeaderWritten => "header-written",
            SessionState::EncodingRows => "encoding-rows",
            SessionState::Finalized => "finalized",
            SessionState::Serialized => "serialized",
            SessionState::Failed => "failed",
        }
    }
}

/// Outcome of a successful export
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ExportSummary {
    pub format: FormatKind,
    /// Resolved column names, in order
    pub columns: Vec<String>,
    /// Rows written after the header
    pub data_rows: u64,
    pub schema_strategy: SchemaStrategy,
    /// Most rows held in the write window at once
    pub peak_window_rows: usize,
    pub autosized_columns: usize,
    pub bytes_written: u64,
}

/// A single export in progress.
///
/// Drive it with [`set_schema`](Self::set_schema),
/// [`write_header`](Self::write_header), any number of
/// [`append_record`](Self::append_record) calls and finally
/// [`finish`](Self::finish). Any error moves the session to
/// [`SessionState::Failed`].
///
/// # Examples
///
/// ```no_run
/// use geosheet::{ExportOptions, ExportSession, FormatKind, InMemoryRecord, SchemaStrategy};
/// use geosheet::types::Column;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut out = Vec::new();
/// let mut session = ExportSession::open(&mut out, FormatKind::ZippedXml, ExportOptions::default())?;
/// session.set_schema(vec![Column::new(0, "id")], SchemaStrategy::Declared)?;
/// session.write_header()?;
/// session.append_record(&InMemoryRecord::new(vec![1i64.into()]))?;
/// let summary = session.finish()?;
/// assert_eq!(summary.data_rows, 1);
/// # Ok(())
/// # }
/// ```
pub struct ExportSession<W: Write> {
    profile: &'static FormatProfile,
    options: ExportOptions,
    state: SessionState,
    columns: Vec<Column>,
    strategy: SchemaStrategy,
    container: Option<Box<dyn SheetContainer>>,
    window: RowWindow,
    widths: ColumnWidthTracker,
    next_row: u32,
    sink: W,
}

impl<W: Write> ExportSession<W> {
    /// Start a session writing `kind` to `sink`
    pub fn open(sink: W, kind: FormatKind, options: ExportOptions) -> Result<Self> {
        options.validate()?;
        let profile = kind.profile();
        let container = container::open(profile, &options)?;
        log::debug!(
            "export session opened: {} (window {} rows)",
            kind,
            options.window_rows
        );

        Ok(ExportSession {
            profile,
            window: RowWindow::new(options.window_rows),
            options,
            state: SessionState::Initialized,
            columns: Vec::new(),
            strategy: SchemaStrategy::Declared,
            container: Some(container),
            widths: ColumnWidthTracker::new(0, 0),
            next_row: 0,
            sink,
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn profile(&self) -> &'static FormatProfile {
        self.profile
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Rows currently held in the write window
    pub fn buffered_rows(&self) -> usize {
        self.window.len()
    }

    /// Fix the column list for the rest of the session
    pub fn set_schema(&mut self, columns: Vec<Column>, strategy: SchemaStrategy) -> Result<()> {
        self.require_state(&[SessionState::Initialized], "initialized")?;
        let tracked = if self.options.autosize {
            self.profile.autosize_cap
        } else {
            0
        };
        self.widths = ColumnWidthTracker::new(columns.len(), tracked);
        self.columns = columns;
        self.strategy = strategy;
        self.transition(SessionState::SchemaResolved);
        Ok(())
    }

    /// Write the header row at position 0
    pub fn write_header(&mut self) -> Result<()> {
        self.require_state(&[SessionState::SchemaResolved], "schema-resolved")?;
        if self.columns.len() > self.profile.max_columns {
            return self.fail(ExportError::ColumnCapacityExceeded {
                columns: self.columns.len(),
                max: self.profile.max_columns,
            });
        }
        let header = Row::header(&self.columns);
        let result = self.push_row(header);
        self.settle(result)?;
        self.transition(SessionState::HeaderWritten);
        Ok(())
    }

    /// Encode one record into the next row position
    pub fn append_record<R: Record + ?Sized>(&mut self, record: &R) -> Result<()> {
        self.require_state(
            &[SessionState::HeaderWritten, SessionState::EncodingRows],
            "header-written",
        )?;
        if self.state == SessionState::HeaderWritten {
            self.transition(SessionState::EncodingRows);
        }
        let result = self.encode_row(record).and_then(|row| self.push_row(row));
        self.settle(result)
    }

    /// Flush the window, size columns and serialize the workbook to the sink
    pub fn finish(mut self) -> Result<ExportSummary> {
        self.require_state(
            &[SessionState::HeaderWritten, SessionState::EncodingRows],
            "header-written",
        )?;
        let result = self.finalize();
        let mut container = self.settle(result)?;
        self.transition(SessionState::Finalized);

        let autosized = if self.options.autosize {
            width::finalize(&self.widths, container.as_mut())
        } else {
            0
        };

        let result = container.finish(&mut self.sink);
        let bytes_written = self.settle(result)?;
        self.transition(SessionState::Serialized);

        Ok(ExportSummary {
            format: self.profile.kind,
            columns: self.columns.iter().map(|c| c.name.clone()).collect(),
            data_rows: u64::from(self.next_row.saturating_sub(1)),
            schema_strategy: self.strategy,
            peak_window_rows: self.window.peak(),
            autosized_columns: autosized,
            bytes_written,
        })
    }

    fn encode_row<R: Record + ?Sized>(&self, record: &R) -> Result<Row> {
        let index = self.next_row;
        if index >= self.profile.max_rows {
            return Err(ExportError::RowCapacityExceeded {
                row: u64::from(index),
                max: self.profile.max_rows,
            });
        }

        let mut cells = Vec::with_capacity(self.columns.len());
        for column in &self.columns {
            let value = record.attribute(column.index)?;
            let value = encode_value(value, column);
            let style = match value {
                CellValue::Temporal(_) if self.profile.supports_cell_style => CellStyle::DateTime,
                _ => CellStyle::Default,
            };
            cells.push(StyledCell::new(value, style));
        }
        Ok(Row::new(index, cells))
    }

    /// Track widths, enforce the text limit, and push into the window
    fn push_row(&mut self, row: Row) -> Result<()> {
        for (column, cell) in row.cells.iter().enumerate() {
            if let Some(text) = cell.value.as_text() {
                let len = text.encode_utf16().count();
                if len > self.profile.max_cell_text {
                    return Err(ExportError::CellCapacityExceeded {
                        row: row.index,
                        column,
                        len,
                        max: self.profile.max_cell_text,
                    });
                }
            }
        }
        self.widths.observe(&row);
        self.next_row = row.index + 1;

        if let Some(evicted) = self.window.push(row) {
            self.container_mut()?.write_row(&evicted)?;
        }
        Ok(())
    }

    fn finalize(&mut self) -> Result<Box<dyn SheetContainer>> {
        let mut container = self
            .container
            .take()
            .ok_or(ExportError::InvalidState {
                expected: "header-written",
                actual: self.state.name(),
            })?;
        for row in self.window.drain() {
            container.write_row(&row)?;
        }
        log::debug!(
            "window drained after {} rows (peak {})",
            self.next_row,
            self.window.peak()
        );
        Ok(container)
    }

    fn container_mut(&mut self) -> Result<&mut Box<dyn SheetContainer>> {
        let actual = self.state.name();
        self.container.as_mut().ok_or(ExportError::InvalidState {
            expected: "header-written",
            actual,
        })
    }

    fn require_state(&self, allowed: &[SessionState], expected: &'static str) -> Result<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(ExportError::InvalidState {
                expected,
                actual: self.state.name(),
            })
        }
    }

    fn transition(&mut self, next: SessionState) {
        log::debug!("export session {} -> {}", self.state.name(), next.name());
        self.state = next;
    }

    fn fail<T>(&mut self, err: ExportError) -> Result<T> {
        self.settle(Err(err))
    }

    /// Record a failed step; the session refuses further writes afterwards
    fn settle<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            log::debug!("export session failed in {}: {}", self.state.name(), e);
            self.state = SessionState::Failed;
            self.container = None;
        }
        result
    }
}

/// Runs complete exports with a fixed set of options
#[derive(Debug, Clone, Default)]
pub struct Exporter {
    options: ExportOptions,
}

impl Exporter {
    pub fn new(options: ExportOptions) -> Self {
        Exporter { options }
    }

    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    /// Export every record of `source` to `sink` as a `kind` workbook.
    ///
    /// The schema is resolved before any staging resource is created, so a
    /// source without a usable column list leaves no trace.
    pub fn encode<S, W>(&self, source: S, sink: W, kind: FormatKind) -> Result<ExportSummary>
    where
        S: RecordSource,
        W: Write,
    {
        self.options.validate()?;
        let mut records = schema::resolve(source)?;
        log::debug!(
            "resolved {} columns ({:?})",
            records.column_count(),
            records.strategy
        );

        let mut session = ExportSession::open(sink, kind, self.options.clone())?;
        session.set_schema(std::mem::take(&mut records.columns), records.strategy)?;
        session.write_header()?;
        for record in records {
            match record {
                Ok(record) => session.append_record(&record)?,
                Err(e) => return session.fail(e.into()),
            }
        }
        session.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::InMemorySource;
    use crate::types::AttributeValue;

    fn session(kind: FormatKind, window: usize) -> ExportSession<Vec<u8>> {
        let options = ExportOptions::default().with_window_rows(window);
        ExportSession::open(Vec::new(), kind, options).unwrap()
    }

    fn columns(names: &[&str]) -> Vec<Column> {
        names
            .iter()
            .enumerate()
            .map(|(i, n)| Column::new(i, *n))
            .collect()
    }

    #[test]
    fn test_state_transitions() {
        let mut s = session(FormatKind::ZippedXml, 10);
        assert_eq!(s.state(), SessionState::Initialized);
        s.set_schema(columns(&["a"]), SchemaStrategy::Declared).unwrap();
        assert_eq!(s.state(), SessionState::SchemaResolved);
        s.write_header().unwrap();
        assert_eq!(s.state(), SessionState::HeaderWritten);
        s.append_record(&crate::source::InMemoryRecord::new(vec![1i64.into()]))
            .unwrap();
        assert_eq!(s.state(), SessionState::EncodingRows);
        let summary = s.finish().unwrap();
        assert_eq!(summary.data_rows, 1);
        assert_eq!(summary.columns, vec!["a".to_string()]);
        assert!(summary.bytes_written > 0);
    }

    #[test]
    fn test_out_of_order_calls() {
        let mut s = session(FormatKind::ZippedXml, 10);
        let err = s.write_header().unwrap_err();
        assert!(matches!(err, ExportError::InvalidState { .. }));

        let record = crate::source::InMemoryRecord::new(vec![]);
        assert!(matches!(
            s.append_record(&record),
            Err(ExportError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_window_bounds_buffered_rows() {
        let mut s = session(FormatKind::ZippedXml, 4);
        s.set_schema(columns(&["n"]), SchemaStrategy::Declared).unwrap();
        s.write_header().unwrap();
        for i in 0..50i64 {
            s.append_record(&crate::source::InMemoryRecord::new(vec![i.into()]))
                .unwrap();
            assert!(s.buffered_rows() <= 4);
        }
        let summary = s.finish().unwrap();
        assert_eq!(summary.peak_window_rows, 4);
        assert_eq!(summary.data_rows, 50);
    }

    #[test]
    fn test_column_capacity_at_header() {
        let mut s = session(FormatKind::Legacy, 10);
        let names: Vec<String> = (0..257).map(|i| format!("c{}", i)).collect();
        let cols = names
            .iter()
            .enumerate()
            .map(|(i, n)| Column::new(i, n.as_str()))
            .collect();
        s.set_schema(cols, SchemaStrategy::Declared).unwrap();
        let err = s.write_header().unwrap_err();
        assert!(matches!(
            err,
            ExportError::ColumnCapacityExceeded { columns: 257, max: 256 }
        ));
        assert_eq!(s.state(), SessionState::Failed);
        assert!(s.finish().is_err());
    }

    #[test]
    fn test_cell_text_limit() {
        let mut s = session(FormatKind::ZippedXml, 10);
        s.set_schema(columns(&["t"]), SchemaStrategy::Declared).unwrap();
        s.write_header().unwrap();
        let long = AttributeValue::Text("x".repeat(32_768));
        let err = s
            .append_record(&crate::source::InMemoryRecord::new(vec![long]))
            .unwrap_err();
        assert!(matches!(
            err,
            ExportError::CellCapacityExceeded { row: 1, column: 0, len: 32_768, .. }
        ));
        assert_eq!(s.state(), SessionState::Failed);
    }

    #[test]
    fn test_temporal_style_follows_profile() {
        let when = chrono::NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(8, 30, 0)
            .unwrap();
        let record = crate::source::InMemoryRecord::new(vec![when.into()]);

        let mut s = session(FormatKind::ZippedXml, 10);
        s.set_schema(columns(&["t"]), SchemaStrategy::Declared).unwrap();
        let row = s.encode_row(&record).unwrap();
        assert_eq!(row.cells[0].style, CellStyle::DateTime);

        let mut s = session(FormatKind::Legacy, 10);
        s.set_schema(columns(&["t"]), SchemaStrategy::Declared).unwrap();
        let row = s.encode_row(&record).unwrap();
        assert_eq!(row.cells[0].style, CellStyle::DateTime);

        let text = crate::source::InMemoryRecord::new(vec!["2024-05-01".into()]);
        let row = s.encode_row(&text).unwrap();
        assert_eq!(row.cells[0].style, CellStyle::Default);
    }

    #[test]
    fn test_exporter_empty_source() {
        let source = InMemorySource::without_schema();
        let summary = Exporter::default()
            .encode(source, Vec::new(), FormatKind::Legacy)
            .unwrap();
        assert!(summary.columns.is_empty());
        assert_eq!(summary.data_rows, 0);
        assert_eq!(summary.schema_strategy, SchemaStrategy::FirstRecord);
    }

    #[test]
    fn test_invalid_options_rejected() {
        let exporter = Exporter::new(ExportOptions::default().with_sheet_name(""));
        let err = exporter
            .encode(InMemorySource::without_schema(), Vec::new(), FormatKind::ZippedXml)
            .unwrap_err();
        assert!(matches!(err, ExportError::InvalidOptions(_)));
    }
}
