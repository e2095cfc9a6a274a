//! Bounded write window of most recent rows

use crate::types::Row;
use std::collections::VecDeque;

/// Holds at most `capacity` rows; older rows are handed back for flushing.
#[derive(Debug)]
pub struct RowWindow {
    rows: VecDeque<Row>,
    capacity: usize,
    peak: usize,
}

impl RowWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        RowWindow {
            rows: VecDeque::with_capacity(capacity),
            capacity,
            peak: 0,
        }
    }

    /// Add the newest row, returning the oldest one if the window was full
    pub fn push(&mut self, row: Row) -> Option<Row> {
        debug_assert!(self.rows.back().map_or(true, |last| last.index < row.index));
        let evicted = if self.rows.len() == self.capacity {
            self.rows.pop_front()
        } else {
            None
        };
        self.rows.push_back(row);
        self.peak = self.peak.max(self.rows.len());
        evicted
    }

    /// Remove every remaining row, oldest first
    pub fn drain(&mut self) -> impl Iterator<Item = Row> + '_ {
        self.rows.drain(..)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Largest number of rows held at once
    pub fn peak(&self) -> usize {
        self.peak
    }
}
