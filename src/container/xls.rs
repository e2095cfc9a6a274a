//! Legacy binary workbook (`.xls`) container
//!
//! Cells are staged as BIFF8 records and strings in a disk-backed shared
//! string table. On `finish` the globals substream is streamed around that
//! table, followed by the sheet substream, as the `Workbook` stream of a
//! version 3 compound file.

use super::biff::{self, push_record, write_record};
use super::shared_strings::SharedStrings;
use super::{excel_serial, rewind, SheetContainer};
use crate::config::ExportOptions;
use crate::error::{ExportError, Result};
use crate::types::{CellStyle, CellValue, Row};
use crate::width::ColumnWidth;
use std::fs::File;
use std::io::{self, BufWriter, Seek, SeekFrom, Write};

const LEGACY_MAX_ROWS: u32 = 65_536;

/// Number format id of the date/time format
const DATE_TIME_FORMAT_ID: u16 = 164;
const STYLE_XF_COUNT: u16 = 15;
const XF_GENERAL: u16 = STYLE_XF_COUNT;
const XF_DATE_TIME: u16 = STYLE_XF_COUNT + 1;

/// Readers expect the workbook stream to live outside the mini stream
const MIN_STREAM_SIZE: u64 = 4096;

pub struct XlsContainer {
    staging: BufWriter<File>,
    strings: SharedStrings,
    options: ExportOptions,
    widths: Vec<ColumnWidth>,
    last_row: Option<u32>,
    max_col: usize,
    staged_bytes: usize,
}

impl XlsContainer {
    pub fn new(options: &ExportOptions) -> Result<Self> {
        let staging = options.staging_file()?;
        Ok(XlsContainer {
            staging: BufWriter::with_capacity(64 * 1024, staging),
            strings: SharedStrings::new(options.staging_file()?),
            options: options.clone(),
            widths: Vec::new(),
            last_row: None,
            max_col: 0,
            staged_bytes: 0,
        })
    }

    fn stage(&mut self, id: u16, data: &[u8]) -> io::Result<()> {
        write_record(&mut self.staging, id, data)?;
        self.staged_bytes += 4 + data.len();
        Ok(())
    }

    /// Globals substream records up to the shared string table
    fn globals_head(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(1024);
        push_record(&mut out, biff::RECORD_BOF, &biff::bof(biff::BOF_GLOBALS));
        push_record(
            &mut out,
            biff::RECORD_CODEPAGE,
            &biff::codepage(biff::CODEPAGE_UTF16),
        );
        push_record(&mut out, biff::RECORD_WINDOW1, &biff::window1());
        let font = biff::font("Arial");
        for _ in 0..4 {
            push_record(&mut out, biff::RECORD_FONT, &font);
        }
        push_record(
            &mut out,
            biff::RECORD_FORMAT,
            &biff::format(DATE_TIME_FORMAT_ID, "yyyy-mm-dd hh:mm:ss"),
        );
        for _ in 0..STYLE_XF_COUNT {
            push_record(&mut out, biff::RECORD_XF, &biff::xf(0, 0, true));
        }
        push_record(&mut out, biff::RECORD_XF, &biff::xf(0, 0, false));
        push_record(
            &mut out,
            biff::RECORD_XF,
            &biff::xf(0, DATE_TIME_FORMAT_ID, false),
        );
        push_record(&mut out, biff::RECORD_STYLE, &biff::style_normal());
        push_record(
            &mut out,
            biff::RECORD_BOUNDSHEET,
            &biff::boundsheet(&self.options.sheet_name),
        );
        out
    }

    fn sheet_head(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(64 + self.widths.len() * 16);
        push_record(&mut out, biff::RECORD_BOF, &biff::bof(biff::BOF_WORKSHEET));
        push_record(&mut out, biff::RECORD_DEFCOLWIDTH, &biff::defcolwidth(8));
        for width in &self.widths {
            push_record(
                &mut out,
                biff::RECORD_COLINFO,
                &biff::colinfo(width.column as u16, width.width, XF_GENERAL),
            );
        }
        let rows = self.last_row.map_or(0, |last| last + 1);
        push_record(
            &mut out,
            biff::RECORD_DIMENSIONS,
            &biff::dimensions(rows, self.max_col as u16),
        );
        out
    }

    fn sheet_tail() -> Vec<u8> {
        let mut out = Vec::with_capacity(32);
        push_record(&mut out, biff::RECORD_WINDOW2, &biff::window2());
        push_record(&mut out, biff::RECORD_EOF, &[]);
        out
    }
}

impl SheetContainer for XlsContainer {
    fn write_row(&mut self, row: &Row) -> Result<()> {
        let r = u16::try_from(row.index).map_err(|_| ExportError::RowCapacityExceeded {
            row: u64::from(row.index),
            max: LEGACY_MAX_ROWS,
        })?;
        if row.cells.len() > 256 {
            return Err(ExportError::ColumnCapacityExceeded {
                columns: row.cells.len(),
                max: 256,
            });
        }

        for (col, cell) in row.cells.iter().enumerate() {
            let c = col as u16;
            let xf = match cell.style {
                CellStyle::Default => XF_GENERAL,
                CellStyle::DateTime => XF_DATE_TIME,
            };
            match &cell.value {
                CellValue::Null => {}
                CellValue::Number(n) if n.is_finite() => {
                    self.stage(biff::RECORD_NUMBER, &biff::number(r, c, xf, *n))?;
                }
                CellValue::Number(_) => {
                    self.stage(
                        biff::RECORD_BOOLERR,
                        &biff::error_cell(r, c, xf, biff::ERROR_NUM),
                    )?;
                }
                CellValue::Temporal(dt) => match excel_serial(dt) {
                    Some(serial) => {
                        self.stage(biff::RECORD_NUMBER, &biff::number(r, c, xf, serial))?;
                    }
                    None => {
                        let text = dt.format("%Y-%m-%d %H:%M:%S").to_string();
                        let index = self.strings.add_string(&text)?;
                        self.stage(
                            biff::RECORD_LABELSST,
                            &biff::label_sst(r, c, XF_GENERAL, index),
                        )?;
                    }
                },
                CellValue::Text(s) | CellValue::GeometryText(s) => {
                    let index = self.strings.add_string(s)?;
                    self.stage(
                        biff::RECORD_LABELSST,
                        &biff::label_sst(r, c, xf, index),
                    )?;
                }
            }
        }
        self.last_row = Some(row.index);
        self.max_col = self.max_col.max(row.cells.len());
        Ok(())
    }

    fn set_column_widths(&mut self, widths: &[ColumnWidth]) -> Result<()> {
        self.widths = widths.to_vec();
        Ok(())
    }

    fn finish(self: Box<Self>, sink: &mut dyn Write) -> Result<u64> {
        let mut this = *self;
        this.staging.flush()?;

        let mut globals = this.globals_head();
        let sst_len = this.strings.biff_len()?;
        let head = this.sheet_head();
        let tail = Self::sheet_tail();

        // BOUNDSHEET payload starts 4 bytes into its record; the sheet BOF follows the globals EOF
        let globals_len = globals.len() as u64 + sst_len + 4;
        let sheet_offset = u32::try_from(globals_len)
            .map_err(|_| ExportError::Container("workbook globals too large".into()))?;
        let boundsheet_at = find_record(&globals, biff::RECORD_BOUNDSHEET)
            .ok_or_else(|| ExportError::Container("missing sheet entry".into()))?;
        globals[boundsheet_at + 4..boundsheet_at + 8].copy_from_slice(&sheet_offset.to_le_bytes());

        let total = globals_len + (head.len() + this.staged_bytes + tail.len()) as u64;
        let staged = this.staging.into_inner().map_err(|e| e.into_error())?;
        let mut staged = rewind(staged)?;

        let file = this.options.staging_file()?;
        let mut compound = cfb::CompoundFile::create_with_version(cfb::Version::V3, file)?;
        {
            let mut stream = compound.create_stream("/Workbook")?;
            stream.write_all(&globals)?;
            this.strings.write_biff(&mut stream)?;
            write_record(&mut stream, biff::RECORD_EOF, &[])?;
            stream.write_all(&head)?;
            io::copy(&mut staged, &mut stream)?;
            stream.write_all(&tail)?;
            if total < MIN_STREAM_SIZE {
                stream.write_all(&vec![0u8; (MIN_STREAM_SIZE - total) as usize])?;
            }
            stream.flush()?;
        }
        compound.flush()?;

        let mut packaged = compound.into_inner();
        packaged.seek(SeekFrom::Start(0))?;
        let bytes = io::copy(&mut packaged, sink)?;
        sink.flush()?;
        log::debug!(
            "xls workbook written: {} bytes, {} shared strings",
            bytes,
            this.strings.count()
        );
        Ok(bytes)
    }
}

/// Byte offset of the first record with `id`
fn find_record(data: &[u8], id: u16) -> Option<usize> {
    let mut pos = 0;
    while pos + 4 <= data.len() {
        let rec = u16::from_le_bytes([data[pos], data[pos + 1]]);
        if rec == id {
            return Some(pos);
        }
        let len = u16::from_le_bytes([data[pos + 2], data[pos + 3]]) as usize;
        pos += 4 + len;
    }
    None
}
