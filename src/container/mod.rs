//! Workbook containers that stage flushed rows and serialize the final file
//!
//! Both containers receive rows in strictly increasing order, stage them in an
//! append-only temporary file, and package everything in one pass on `finish`.

pub mod biff;
pub mod shared_strings;
pub mod xls;
pub mod xlsx;
pub mod xml_writer;

use crate::config::ExportOptions;
use crate::error::Result;
use crate::profile::{ContainerKind, FormatProfile};
use crate::types::Row;
use crate::width::ColumnWidth;
use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use std::fs::File;
use std::io::{self, Seek, SeekFrom, Write};

pub use xls::XlsContainer;
pub use xlsx::XlsxContainer;

/// Sink-side half of an export: staged rows in, serialized workbook out
pub trait SheetContainer {
    /// Stage one row; rows arrive in increasing `row.index` order
    fn write_row(&mut self, row: &Row) -> Result<()>;

    /// Apply auto-fitted widths. Containers that cannot size columns return an error.
    fn set_column_widths(&mut self, widths: &[ColumnWidth]) -> Result<()>;

    /// Package the workbook and copy it to `sink`, returning the bytes written
    fn finish(self: Box<Self>, sink: &mut dyn Write) -> Result<u64>;
}

/// Open the container matching `profile`
pub fn open(profile: &FormatProfile, options: &ExportOptions) -> Result<Box<dyn SheetContainer>> {
    Ok(match profile.container {
        ContainerKind::BinaryBlock => Box::new(XlsContainer::new(options)?),
        ContainerKind::ZipPackage => Box::new(XlsxContainer::new(options)?),
    })
}

/// Serial day number in the 1900 date system.
///
/// Serial 1 is 1900-01-01 and serial 60 is the nonexistent 1900-02-29, so
/// every date from 1900-03-01 on is shifted by one. Returns `None` for
/// instants outside 1900-01-01..=9999-12-31.
pub fn excel_serial(dt: &NaiveDateTime) -> Option<f64> {
    let date = dt.date();
    if date.year() < 1900 || date.year() > 9999 {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 31)?;
    let leap_slot = NaiveDate::from_ymd_opt(1900, 3, 1)?;

    let mut days = (date - epoch).num_days();
    if date >= leap_slot {
        days += 1;
    }
    let time = dt.time();
    let seconds =
        time.num_seconds_from_midnight() as f64 + f64::from(time.nanosecond()) / 1_000_000_000.0;
    Some(days as f64 + seconds / 86_400.0)
}

/// Rewind a staging file so it can be copied out
pub(crate) fn rewind(mut file: File) -> io::Result<File> {
    file.seek(SeekFrom::Start(0))?;
    Ok(file)
}
