//! Best-effort column auto-fit over a capped number of leading columns

use crate::container::SheetContainer;
use crate::types::Row;

const MIN_WIDTH: usize = 8;
const MAX_WIDTH: usize = 255;
const PADDING: usize = 2;

/// Auto-fitted width of one column, in characters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnWidth {
    pub column: usize,
    pub width: f64,
}

/// Tracks the widest content seen in each leading column as rows pass by
#[derive(Debug, Clone)]
pub struct ColumnWidthTracker {
    max_chars: Vec<usize>,
}

impl ColumnWidthTracker {
    /// Track `min(column_count, cap)` columns
    pub fn new(column_count: usize, cap: usize) -> Self {
        ColumnWidthTracker {
            max_chars: vec![0; column_count.min(cap)],
        }
    }

    pub fn observe(&mut self, row: &Row) {
        for (max, cell) in self.max_chars.iter_mut().zip(row.cells.iter()) {
            *max = (*max).max(cell.value.display_width());
        }
    }

    pub fn tracked_columns(&self) -> usize {
        self.max_chars.len()
    }

    pub fn widths(&self) -> Vec<ColumnWidth> {
        self.max_chars
            .iter()
            .enumerate()
            .map(|(column, chars)| ColumnWidth {
                column,
                width: (chars + PADDING).clamp(MIN_WIDTH, MAX_WIDTH) as f64,
            })
            .collect()
    }
}

/// Ask the container to apply the tracked widths.
///
/// Never fails: a container that cannot size columns leaves defaults in place.
/// Returns the number of columns sized.
pub fn finalize(tracker: &ColumnWidthTracker, container: &mut dyn SheetContainer) -> usize {
    let widths = tracker.widths();
    if widths.is_empty() {
        return 0;
    }
    match container.set_column_widths(&widths) {
        Ok(()) => widths.len(),
        Err(e) => {
            log::warn!("column auto-fit skipped: {}", e);
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ExportError, Result};
    use crate::types::{CellValue, StyledCell};
    use std::io::Write;

    fn text_row(index: u32, values: &[&str]) -> Row {
        Row::new(
            index,
            values
                .iter()
                .map(|v| StyledCell::from(CellValue::Text(v.to_string())))
                .collect(),
        )
    }

    struct RejectingContainer;

    impl SheetContainer for RejectingContainer {
        fn write_row(&mut self, _row: &Row) -> Result<()> {
            Ok(())
        }

        fn set_column_widths(&mut self, _widths: &[ColumnWidth]) -> Result<()> {
            Err(ExportError::Container("widths are frozen".to_string()))
        }

        fn finish(self: Box<Self>, _sink: &mut dyn Write) -> Result<u64> {
            Ok(0)
        }
    }

    #[test]
    fn test_widths_follow_widest_cell() {
        let mut tracker = ColumnWidthTracker::new(3, 2);
        tracker.observe(&text_row(0, &["id", "a_rather_long_header", "ignored"]));
        tracker.observe(&text_row(1, &["123456789012", "x", "ignored"]));

        let widths = tracker.widths();
        assert_eq!(tracker.tracked_columns(), 2);
        assert_eq!(widths[0].width, 14.0);
        assert_eq!(widths[1].width, 22.0);
    }

    #[test]
    fn test_width_clamps() {
        let mut tracker = ColumnWidthTracker::new(2, 25);
        let long = "x".repeat(1000);
        tracker.observe(&text_row(0, &["", long.as_str()]));
        let widths = tracker.widths();
        assert_eq!(widths[0].width, MIN_WIDTH as f64);
        assert_eq!(widths[1].width, MAX_WIDTH as f64);
    }

    #[test]
    fn test_rejection_is_not_an_error() {
        let mut tracker = ColumnWidthTracker::new(1, 25);
        tracker.observe(&text_row(0, &["id"]));
        let mut container = RejectingContainer;
        assert_eq!(finalize(&tracker, &mut container), 0);
    }
}
