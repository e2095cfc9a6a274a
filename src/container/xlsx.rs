//! Zipped-XML workbook (`.xlsx`) container
//!
//! Rows are rendered to `<row>` XML as they arrive and appended to a staging
//! file. `finish` writes the package through the streaming zip writer: static
//! parts first, then `sheet1.xml` assembled from the dimension and column
//! header, the staged rows, and the closing tags.

use super::xml_writer::{escape_into, XmlWriter};
use super::{excel_serial, rewind, SheetContainer};
use crate::config::ExportOptions;
use crate::error::{ExportError, Result};
use crate::types::{push_column_letter, CellStyle, CellValue, Row};
use crate::width::ColumnWidth;
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};

const SHEET_PART: &str = "xl/worksheets/sheet1.xml";
const MAIN_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// Index into `cellXfs` of the date/time style
const DATE_TIME_XF: u32 = 1;

pub struct XlsxContainer {
    staging: BufWriter<File>,
    options: ExportOptions,
    widths: Vec<ColumnWidth>,
    xml_buffer: Vec<u8>,
    last_row: Option<u32>,
    max_col: usize,
}

impl XlsxContainer {
    pub fn new(options: &ExportOptions) -> Result<Self> {
        let staging = options.staging_file()?;
        Ok(XlsxContainer {
            staging: BufWriter::with_capacity(64 * 1024, staging),
            options: options.clone(),
            widths: Vec::new(),
            xml_buffer: Vec::with_capacity(4096),
            last_row: None,
            max_col: 0,
        })
    }

    fn push_cell_ref(&mut self, col: usize, row_number: u32) {
        let mut num = itoa::Buffer::new();
        self.xml_buffer.extend_from_slice(b"<c r=\"");
        push_column_letter(&mut self.xml_buffer, col as u32 + 1);
        self.xml_buffer
            .extend_from_slice(num.format(row_number).as_bytes());
        self.xml_buffer.push(b'"');
    }

    fn push_inline_text(&mut self, text: &str) {
        self.xml_buffer
            .extend_from_slice(b" t=\"inlineStr\"><is><t xml:space=\"preserve\">");
        escape_into(&mut self.xml_buffer, text);
        self.xml_buffer.extend_from_slice(b"</t></is></c>");
    }

    fn push_number(&mut self, n: f64) -> io::Result<()> {
        self.xml_buffer.extend_from_slice(b"><v>");
        write!(self.xml_buffer, "{}", n)?;
        self.xml_buffer.extend_from_slice(b"</v></c>");
        Ok(())
    }

    /// `<dimension>` and `<cols>`, which must precede `<sheetData>`
    fn sheet_head(&self) -> Result<Vec<u8>> {
        let mut xml = XmlWriter::new(Vec::with_capacity(1024));
        xml.declaration()?;
        xml.start_element("worksheet")?;
        xml.attribute("xmlns", MAIN_NS)?;
        xml.attribute("xmlns:r", REL_NS)?;
        xml.close_start_tag()?;

        let mut range = Vec::with_capacity(16);
        range.extend_from_slice(b"A1");
        if let (Some(last), true) = (self.last_row, self.max_col > 0) {
            let mut num = itoa::Buffer::new();
            range.push(b':');
            push_column_letter(&mut range, self.max_col as u32);
            range.extend_from_slice(num.format(last + 1).as_bytes());
        }
        xml.write_str("<dimension ref=\"")?;
        xml.write_raw(&range)?;
        xml.write_str("\"/>")?;

        if !self.widths.is_empty() {
            xml.write_str("<cols>")?;
            for width in &self.widths {
                let col = width.column as i64 + 1;
                xml.start_element("col")?;
                xml.attribute_int("min", col)?;
                xml.attribute_int("max", col)?;
                xml.attribute("width", &width.width.to_string())?;
                xml.attribute_int("customWidth", 1)?;
                xml.attribute_int("bestFit", 1)?;
                xml.close_empty()?;
            }
            xml.write_str("</cols>")?;
        }
        xml.write_str("<sheetData>")?;
        xml.into_inner()
    }

    fn workbook_xml(&self) -> Result<Vec<u8>> {
        let mut xml = XmlWriter::new(Vec::with_capacity(512));
        xml.declaration()?;
        xml.start_element("workbook")?;
        xml.attribute("xmlns", MAIN_NS)?;
        xml.attribute("xmlns:r", REL_NS)?;
        xml.close_start_tag()?;
        xml.write_str("<sheets>")?;
        xml.start_element("sheet")?;
        xml.attribute("name", &self.options.sheet_name)?;
        xml.attribute_int("sheetId", 1)?;
        xml.attribute("r:id", "rId1")?;
        xml.close_empty()?;
        xml.write_str("</sheets>")?;
        xml.end_element("workbook")?;
        xml.into_inner()
    }
}

impl SheetContainer for XlsxContainer {
    fn write_row(&mut self, row: &Row) -> Result<()> {
        let row_number = row.index + 1;
        let mut num = itoa::Buffer::new();

        self.xml_buffer.clear();
        self.xml_buffer.extend_from_slice(b"<row r=\"");
        self.xml_buffer
            .extend_from_slice(num.format(row_number).as_bytes());
        self.xml_buffer.extend_from_slice(b"\">");

        for (col, cell) in row.cells.iter().enumerate() {
            match &cell.value {
                CellValue::Null => continue,
                CellValue::Number(n) if n.is_finite() => {
                    self.push_cell_ref(col, row_number);
                    self.push_number(*n)?;
                }
                CellValue::Number(_) => {
                    self.push_cell_ref(col, row_number);
                    self.xml_buffer
                        .extend_from_slice(b" t=\"e\"><v>#NUM!</v></c>");
                }
                CellValue::Temporal(dt) => {
                    self.push_cell_ref(col, row_number);
                    match excel_serial(dt) {
                        Some(serial) => {
                            if cell.style == CellStyle::DateTime {
                                self.xml_buffer.extend_from_slice(b" s=\"");
                                self.xml_buffer
                                    .extend_from_slice(num.format(DATE_TIME_XF).as_bytes());
                                self.xml_buffer.push(b'"');
                            }
                            self.push_number(serial)?;
                        }
                        None => {
                            let text = dt.format("%Y-%m-%d %H:%M:%S").to_string();
                            self.push_inline_text(&text);
                        }
                    }
                }
                CellValue::Text(s) | CellValue::GeometryText(s) => {
                    self.push_cell_ref(col, row_number);
                    self.push_inline_text(s);
                }
            }
        }
        self.xml_buffer.extend_from_slice(b"</row>");

        self.staging.write_all(&self.xml_buffer)?;
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
        let head = this.sheet_head()?;
        let workbook = this.workbook_xml()?;
        let staged = this.staging.into_inner().map_err(|e| e.into_error())?;
        let mut staged = rewind(staged)?;

        let dir = this.options.staging_dir()?;
        let path = dir.path().join("workbook.xlsx");
        let path_str = path
            .to_str()
            .ok_or_else(|| ExportError::Container("staging path is not valid UTF-8".into()))?;

        let mut zip = s_zip::StreamingZipWriter::with_compression(
            path_str,
            this.options.compression_level,
        )
        .map_err(ExportError::container)?;

        let core = core_xml();
        let parts: [(&str, &[u8]); 7] = [
            ("[Content_Types].xml", CONTENT_TYPES.as_bytes()),
            ("_rels/.rels", ROOT_RELS.as_bytes()),
            ("docProps/app.xml", APP_XML.as_bytes()),
            ("docProps/core.xml", core.as_bytes()),
            ("xl/workbook.xml", &workbook),
            ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS.as_bytes()),
            ("xl/styles.xml", STYLES_XML.as_bytes()),
        ];
        for (name, data) in parts {
            zip.start_entry(name).map_err(ExportError::container)?;
            zip.write_data(data).map_err(ExportError::container)?;
        }

        zip.start_entry(SHEET_PART).map_err(ExportError::container)?;
        zip.write_data(&head).map_err(ExportError::container)?;
        let mut chunk = vec![0u8; 64 * 1024];
        loop {
            let n = staged.read(&mut chunk)?;
            if n == 0 {
                break;
            }
            zip.write_data(&chunk[..n]).map_err(ExportError::container)?;
        }
        zip.write_data(b"</sheetData></worksheet>")
            .map_err(ExportError::container)?;
        zip.finish().map_err(ExportError::container)?;

        let mut packaged = File::open(&path)?;
        let bytes = io::copy(&mut packaged, sink)?;
        sink.flush()?;
        log::debug!("xlsx package written: {} bytes", bytes);
        Ok(bytes)
    }
}

fn core_xml() -> String {
    let now = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:dcmitype="http://purl.org/dc/dcmitype/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"><dc:creator>geosheet</dc:creator><dcterms:created xsi:type="dcterms:W3CDTF">{now}</dcterms:created><dcterms:modified xsi:type="dcterms:W3CDTF">{now}</dcterms:modified></cp:coreProperties>"#
    )
}

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/><Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/><Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/><Override PartName="/docProps/app.xml" ContentType="application/vnd.openxmlformats-officedocument.extended-properties+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/><Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties" Target="docProps/app.xml"/></Relationships>"#;

const APP_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties" xmlns:vt="http://schemas.openxmlformats.org/officeDocument/2006/docPropsVTypes"><Application>geosheet</Application></Properties>"#;

const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#;

const STYLES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><numFmts count="1"><numFmt numFmtId="164" formatCode="yyyy-mm-dd hh:mm:ss"/></numFmts><fonts count="1"><font><sz val="11"/><name val="Calibri"/><family val="2"/></font></fonts><fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills><borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs count="2"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="164" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/></cellXfs><cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles></styleSheet>"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StyledCell;
    use chrono::NaiveDate;

    fn staged_xml(container: XlsxContainer) -> String {
        let file = container.staging.into_inner().unwrap();
        let mut file = rewind(file).unwrap();
        let mut out = String::new();
        file.read_to_string(&mut out).unwrap();
        out
    }

    #[test]
    fn test_row_xml() {
        let mut container = XlsxContainer::new(&ExportOptions::default()).unwrap();
        let when = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let row = Row::new(
            1,
            vec![
                StyledCell::from(CellValue::Number(1.5)),
                StyledCell::from(CellValue::Null),
                StyledCell::from(CellValue::Text("a<b".into())),
                StyledCell::new(CellValue::Temporal(when), CellStyle::DateTime),
                StyledCell::from(CellValue::Number(f64::NAN)),
            ],
        );
        container.write_row(&row).unwrap();
        assert_eq!(container.last_row, Some(1));
        assert_eq!(container.max_col, 5);

        let xml = staged_xml(container);
        assert_eq!(
            xml,
            "<row r=\"2\"><c r=\"A2\"><v>1.5</v></c>\
             <c r=\"C2\" t=\"inlineStr\"><is><t xml:space=\"preserve\">a&lt;b</t></is></c>\
             <c r=\"D2\" s=\"1\"><v>45292.5</v></c>\
             <c r=\"E2\" t=\"e\"><v>#NUM!</v></c></row>"
        );
    }

    #[test]
    fn test_pre_1900_temporal_as_text() {
        let mut container = XlsxContainer::new(&ExportOptions::default()).unwrap();
        let when = NaiveDate::from_ymd_opt(1850, 6, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let row = Row::new(
            0,
            vec![StyledCell::new(CellValue::Temporal(when), CellStyle::DateTime)],
        );
        container.write_row(&row).unwrap();
        let xml = staged_xml(container);
        assert!(xml.contains("<t xml:space=\"preserve\">1850-06-01 00:00:00</t>"));
    }

    #[test]
    fn test_sheet_head() {
        let mut container = XlsxContainer::new(&ExportOptions::default()).unwrap();
        let empty = String::from_utf8(container.sheet_head().unwrap()).unwrap();
        assert!(empty.contains("<dimension ref=\"A1\"/>"));
        assert!(!empty.contains("<cols>"));

        container.last_row = Some(2);
        container.max_col = 3;
        container
            .set_column_widths(&[ColumnWidth {
                column: 1,
                width: 14.0,
            }])
            .unwrap();
        let head = String::from_utf8(container.sheet_head().unwrap()).unwrap();
        assert!(head.contains("<dimension ref=\"A1:C3\"/>"));
        assert!(head.contains(
            "<col min=\"2\" max=\"2\" width=\"14\" customWidth=\"1\" bestFit=\"1\"/>"
        ));
        assert!(head.ends_with("<sheetData>"));
    }

    #[test]
    fn test_sheet_name_escaped() {
        let options = ExportOptions::default().with_sheet_name("a&b");
        let container = XlsxContainer::new(&options).unwrap();
        let xml = String::from_utf8(container.workbook_xml().unwrap()).unwrap();
        assert!(xml.contains("name=\"a&amp;b\""));
    }
}
