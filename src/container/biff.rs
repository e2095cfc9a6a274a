//! BIFF8 record builders for the legacy workbook stream

use std::io::{self, Write};

pub const RECORD_BOF: u16 = 0x0809;
pub const RECORD_EOF: u16 = 0x000A;
pub const RECORD_CODEPAGE: u16 = 0x0042;
pub const RECORD_WINDOW1: u16 = 0x003D;
pub const RECORD_FONT: u16 = 0x0031;
pub const RECORD_FORMAT: u16 = 0x041E;
pub const RECORD_XF: u16 = 0x00E0;
pub const RECORD_STYLE: u16 = 0x0293;
pub const RECORD_BOUNDSHEET: u16 = 0x0085;
pub const RECORD_SST: u16 = 0x00FC;
pub const RECORD_CONTINUE: u16 = 0x003C;
pub const RECORD_DEFCOLWIDTH: u16 = 0x0055;
pub const RECORD_COLINFO: u16 = 0x007D;
pub const RECORD_DIMENSIONS: u16 = 0x0200;
pub const RECORD_NUMBER: u16 = 0x0203;
pub const RECORD_LABELSST: u16 = 0x00FD;
pub const RECORD_BOOLERR: u16 = 0x0205;
pub const RECORD_WINDOW2: u16 = 0x023E;

/// Largest record payload; longer data spills into CONTINUE records
pub const MAX_RECORD_DATA: usize = 8224;

pub const BOF_GLOBALS: u16 = 0x0005;
pub const BOF_WORKSHEET: u16 = 0x0010;

/// UTF-16LE code page
pub const CODEPAGE_UTF16: u16 = 1200;

/// `#NUM!` error code
pub const ERROR_NUM: u8 = 0x24;

pub fn push_record(out: &mut Vec<u8>, id: u16, data: &[u8]) {
    out.extend_from_slice(&id.to_le_bytes());
    out.extend_from_slice(&(data.len() as u16).to_le_bytes());
    out.extend_from_slice(data);
}

pub fn write_record<W: Write + ?Sized>(writer: &mut W, id: u16, data: &[u8]) -> io::Result<()> {
    writer.write_all(&id.to_le_bytes())?;
    writer.write_all(&(data.len() as u16).to_le_bytes())?;
    writer.write_all(data)
}

pub fn bof(substream: u16) -> [u8; 16] {
    let mut out = [0u8; 16];
    out[0..2].copy_from_slice(&0x0600u16.to_le_bytes());
    out[2..4].copy_from_slice(&substream.to_le_bytes());
    out[4..6].copy_from_slice(&0x0DBBu16.to_le_bytes());
    out[6..8].copy_from_slice(&0x07CCu16.to_le_bytes());
    out
}

pub fn window1() -> [u8; 18] {
    let mut out = [0u8; 18];
    out[4..6].copy_from_slice(&0x3A5Cu16.to_le_bytes()); // width
    out[6..8].copy_from_slice(&0x23BEu16.to_le_bytes()); // height
    out[8..10].copy_from_slice(&0x0038u16.to_le_bytes()); // scroll bars and tabs
    out[14..16].copy_from_slice(&1u16.to_le_bytes()); // selected tabs
    out[16..18].copy_from_slice(&600u16.to_le_bytes()); // tab ratio
    out
}

pub fn window2() -> [u8; 18] {
    let mut out = [0u8; 18];
    out[0..2].copy_from_slice(&0x02B6u16.to_le_bytes());
    out[6..8].copy_from_slice(&0x0040u16.to_le_bytes()); // gridline colour
    out
}

/// Short unicode string: u8 length, flags, UTF-16LE characters
fn push_short_string(out: &mut Vec<u8>, text: &str) {
    let units: Vec<u16> = text.encode_utf16().take(u8::MAX as usize).collect();
    out.push(units.len() as u8);
    out.push(0x01);
    for unit in units {
        out.extend_from_slice(&unit.to_le_bytes());
    }
}

/// Unicode string with u16 length
fn push_long_string(out: &mut Vec<u8>, text: &str) {
    let units: Vec<u16> = text.encode_utf16().take(u16::MAX as usize).collect();
    out.extend_from_slice(&(units.len() as u16).to_le_bytes());
    out.push(0x01);
    for unit in units {
        out.extend_from_slice(&unit.to_le_bytes());
    }
}

pub fn font(name: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(16 + name.len() * 2);
    out.extend_from_slice(&200u16.to_le_bytes()); // 10pt in twips
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&0x7FFFu16.to_le_bytes()); // automatic colour
    out.extend_from_slice(&400u16.to_le_bytes()); // normal weight
    out.extend_from_slice(&[0, 0, 0, 0, 0, 0]); // escapement, underline, family, charset, reserved
    push_short_string(&mut out, name);
    out
}

pub fn format(id: u16, code: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(5 + code.len() * 2);
    out.extend_from_slice(&id.to_le_bytes());
    push_long_string(&mut out, code);
    out
}

/// Extended format record. Style XFs have no parent; cell XFs inherit from style XF 0.
pub fn xf(font: u16, number_format: u16, style: bool) -> [u8; 20] {
    let mut out = [0u8; 20];
    out[0..2].copy_from_slice(&font.to_le_bytes());
    out[2..4].copy_from_slice(&number_format.to_le_bytes());
    let protection: u16 = if style { 0xFFF5 } else { 0x0001 };
    out[4..6].copy_from_slice(&protection.to_le_bytes());
    out[6] = 0x20; // bottom aligned
    out[9] = if style { 0xF8 } else { 0x04 }; // used-attribute flags
    out[18..20].copy_from_slice(&0x20C0u16.to_le_bytes()); // default pattern colours
    out
}

/// Built-in "Normal" style bound to XF 0
pub fn style_normal() -> [u8; 4] {
    [0x00, 0x80, 0x00, 0xFF]
}

/// Sheet entry; the stream offset in bytes 0..4 is patched once known
pub fn boundsheet(name: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(8 + name.len() * 2);
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&[0x00, 0x00]); // visible worksheet
    push_short_string(&mut out, name);
    out
}

pub fn codepage(code: u16) -> [u8; 2] {
    code.to_le_bytes()
}

pub fn defcolwidth(chars: u16) -> [u8; 2] {
    chars.to_le_bytes()
}

/// Width of a single column, in characters
pub fn colinfo(column: u16, width_chars: f64, xf: u16) -> [u8; 12] {
    let width = (width_chars * 256.0).round().clamp(0.0, f64::from(u16::MAX)) as u16;
    let mut out = [0u8; 12];
    out[0..2].copy_from_slice(&column.to_le_bytes());
    out[2..4].copy_from_slice(&column.to_le_bytes());
    out[4..6].copy_from_slice(&width.to_le_bytes());
    out[6..8].copy_from_slice(&xf.to_le_bytes());
    out[8..10].copy_from_slice(&0x0006u16.to_le_bytes()); // custom width, user set
    out
}

/// Used range: first row, last row + 1, first column, last column + 1
pub fn dimensions(rows: u32, columns: u16) -> [u8; 14] {
    let mut out = [0u8; 14];
    out[4..8].copy_from_slice(&rows.to_le_bytes());
    out[10..12].copy_from_slice(&columns.to_le_bytes());
    out
}

pub fn number(row: u16, column: u16, xf: u16, value: f64) -> [u8; 14] {
    let mut out = [0u8; 14];
    out[0..2].copy_from_slice(&row.to_le_bytes());
    out[2..4].copy_from_slice(&column.to_le_bytes());
    out[4..6].copy_from_slice(&xf.to_le_bytes());
    out[6..14].copy_from_slice(&value.to_le_bytes());
    out
}

pub fn label_sst(row: u16, column: u16, xf: u16, sst_index: u32) -> [u8; 10] {
    let mut out = [0u8; 10];
    out[0..2].copy_from_slice(&row.to_le_bytes());
    out[2..4].copy_from_slice(&column.to_le_bytes());
    out[4..6].copy_from_slice(&xf.to_le_bytes());
    out[6..10].copy_from_slice(&sst_index.to_le_bytes());
    out
}

pub fn error_cell(row: u16, column: u16, xf: u16, code: u8) -> [u8; 8] {
    let mut out = [0u8; 8];
    out[0..2].copy_from_slice(&row.to_le_bytes());
    out[2..4].copy_from_slice(&column.to_le_bytes());
    out[4..6].copy_from_slice(&xf.to_le_bytes());
    out[6] = code;
    out[7] = 0x01;
    out
}
