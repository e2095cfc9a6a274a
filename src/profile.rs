//! Format profiles: capacity and container rules per output kind

use crate::error::{ExportError, Result};
use std::fmt;
use std::str::FromStr;

/// Media type of the legacy binary workbook
pub const MIME_XLS: &str = "application/vnd.ms-excel";
/// Media type of the zipped SpreadsheetML workbook
pub const MIME_XLSX: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Requested output kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FormatKind {
    /// BIFF8 workbook inside an OLE2 compound file (`.xls`)
    Legacy,
    /// SpreadsheetML parts inside a zip package (`.xlsx`)
    ZippedXml,
}

/// Physical shape of the output container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    /// One fixed-layout binary stream
    BinaryBlock,
    /// Zip package of XML parts
    ZipPackage,
}

/// Capacity and styling rules governing one export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatProfile {
    pub kind: FormatKind,
    /// Maximum rows per sheet, header included
    pub max_rows: u32,
    pub max_columns: usize,
    pub container: ContainerKind,
    /// Whether temporal cells carry the date/time number format
    pub supports_cell_style: bool,
    /// Number of leading columns the width pass looks at
    pub autosize_cap: usize,
    /// Longest text a cell may hold, in UTF-16 code units
    pub max_cell_text: usize,
    pub media_type: &'static str,
    pub extension: &'static str,
}

pub static LEGACY_PROFILE: FormatProfile = FormatProfile {
    kind: FormatKind::Legacy,
    max_rows: 65_536,
    max_columns: 256,
    container: ContainerKind::BinaryBlock,
    supports_cell_style: true,
    autosize_cap: 50,
    max_cell_text: 32_767,
    media_type: MIME_XLS,
    extension: "xls",
};

pub static ZIPPED_XML_PROFILE: FormatProfile = FormatProfile {
    kind: FormatKind::ZippedXml,
    max_rows: 1_048_576,
    max_columns: 16_384,
    container: ContainerKind::ZipPackage,
    supports_cell_style: true,
    autosize_cap: 25,
    max_cell_text: 32_767,
    media_type: MIME_XLSX,
    extension: "xlsx",
};

impl FormatKind {
    /// The static profile for this kind
    pub fn profile(self) -> &'static FormatProfile {
        match self {
            FormatKind::Legacy => &LEGACY_PROFILE,
            FormatKind::ZippedXml => &ZIPPED_XML_PROFILE,
        }
    }

    pub fn media_type(self) -> &'static str {
        self.profile().media_type
    }

    pub fn extension(self) -> &'static str {
        self.profile().extension
    }

    /// Look up a kind by media type (parameters ignored) or file extension
    pub fn from_media_type(requested: &str) -> Result<Self> {
        let essence = requested
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .trim_start_matches('.')
            .to_ascii_lowercase();

        [FormatKind::Legacy, FormatKind::ZippedXml]
            .into_iter()
            .find(|kind| essence == kind.media_type() || essence == kind.extension())
            .ok_or_else(|| ExportError::UnsupportedFormat(requested.to_string()))
    }
}

impl FromStr for FormatKind {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self> {
        FormatKind::from_media_type(s)
    }
}

impl fmt::Display for FormatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.media_type())
    }
}

/// Select the profile for a requested media type or extension
pub fn select(requested: &str) -> Result<&'static FormatProfile> {
    FormatKind::from_media_type(requested).map(FormatKind::profile)
}
