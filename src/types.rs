//! Type definitions for records, columns and cells

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use std::fmt;
use std::sync::Arc;

/// Fixed display format applied to temporal cells
pub const DATE_TIME_FORMAT: &str = "yyyy-mm-dd hh:mm:ss";

/// Namespace-aware attribute name as reported by a record source
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QualifiedName {
    /// Namespace URI or prefix, if any
    pub namespace: Option<String>,
    /// Unqualified (local) part
    pub local: String,
}

impl QualifiedName {
    /// Create an unqualified name
    pub fn local(local: impl Into<String>) -> Self {
        QualifiedName {
            namespace: None,
            local: local.into(),
        }
    }

    /// Create a name inside a namespace
    pub fn qualified(namespace: impl Into<String>, local: impl Into<String>) -> Self {
        QualifiedName {
            namespace: Some(namespace.into()),
            local: local.into(),
        }
    }

    /// Parse `{uri}local`, `prefix:local` or a bare `local`
    pub fn parse(raw: &str) -> Self {
        if let Some(rest) = raw.strip_prefix('{') {
            if let Some((ns, local)) = rest.split_once('}') {
                return QualifiedName::qualified(ns, local);
            }
        }
        match raw.rsplit_once(':') {
            Some((ns, local)) if !ns.is_empty() && !local.is_empty() => {
                QualifiedName::qualified(ns, local)
            }
            _ => QualifiedName::local(raw),
        }
    }

    /// The unqualified name used as a column header
    pub fn local_part(&self) -> &str {
        &self.local
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}:{}", ns, self.local),
            None => f.write_str(&self.local),
        }
    }
}

impl From<&str> for QualifiedName {
    fn from(s: &str) -> Self {
        QualifiedName::parse(s)
    }
}

/// Attribute descriptor from a declared or introspected schema.
///
/// `name` is `None` when the source cannot name the attribute at this position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeDescriptor {
    pub name: Option<QualifiedName>,
}

impl AttributeDescriptor {
    pub fn named(name: impl Into<QualifiedName>) -> Self {
        AttributeDescriptor {
            name: Some(name.into()),
        }
    }

    pub fn unnamed() -> Self {
        AttributeDescriptor { name: None }
    }
}

/// One output column, positional and stable for a whole export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    /// Position in the record (0-based)
    pub index: usize,
    /// Header text
    pub name: String,
}

impl Column {
    pub fn new(index: usize, name: impl Into<String>) -> Self {
        Column {
            index,
            name: name.into(),
        }
    }

    /// Spreadsheet letter for this column (0 -> A, 25 -> Z, 26 -> AA)
    pub fn letter(&self) -> String {
        let mut buf = Vec::with_capacity(3);
        push_column_letter(&mut buf, self.index as u32 + 1);
        String::from_utf8(buf).unwrap_or_default()
    }
}

/// Append the letters of a 1-based column number
pub(crate) fn push_column_letter(buffer: &mut Vec<u8>, mut n: u32) {
    if n == 0 {
        return;
    }
    let mut tmp = [0u8; 7];
    let mut len = 0;
    while n > 0 {
        let rem = (n - 1) % 26;
        tmp[len] = b'A' + rem as u8;
        len += 1;
        n = (n - 1) / 26;
    }
    for i in (0..len).rev() {
        buffer.push(tmp[i]);
    }
}

/// Run-time attribute value delivered by a record
#[derive(Clone)]
pub enum AttributeValue {
    /// Explicit null
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    BigInt(i128),
    Float(f64),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    /// Timestamp carrying its own offset; the wall-clock time is exported as-is
    Timestamp(DateTime<FixedOffset>),
    Geometry(geo_types::Geometry<f64>),
    Text(String),
    Binary(Vec<u8>),
    /// Opaque host value exported through its `Display` impl
    Other(Arc<dyn fmt::Display + Send + Sync>),
}

impl fmt::Debug for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Null => f.write_str("Null"),
            AttributeValue::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            AttributeValue::Int(i) => f.debug_tuple("Int").field(i).finish(),
            AttributeValue::UInt(u) => f.debug_tuple("UInt").field(u).finish(),
            AttributeValue::BigInt(i) => f.debug_tuple("BigInt").field(i).finish(),
            AttributeValue::Float(x) => f.debug_tuple("Float").field(x).finish(),
            AttributeValue::Date(d) => f.debug_tuple("Date").field(d).finish(),
            AttributeValue::Time(t) => f.debug_tuple("Time").field(t).finish(),
            AttributeValue::DateTime(dt) => f.debug_tuple("DateTime").field(dt).finish(),
            AttributeValue::Timestamp(ts) => f.debug_tuple("Timestamp").field(ts).finish(),
            AttributeValue::Geometry(g) => f.debug_tuple("Geometry").field(g).finish(),
            AttributeValue::Text(s) => f.debug_tuple("Text").field(s).finish(),
            AttributeValue::Binary(b) => f.debug_tuple("Binary").field(&b.len()).finish(),
            AttributeValue::Other(o) => f.debug_tuple("Other").field(&o.to_string()).finish(),
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Null => Ok(()),
            AttributeValue::Bool(b) => write!(f, "{}", b),
            AttributeValue::Int(i) => write!(f, "{}", i),
            AttributeValue::UInt(u) => write!(f, "{}", u),
            AttributeValue::BigInt(i) => write!(f, "{}", i),
            AttributeValue::Float(x) => write!(f, "{}", x),
            AttributeValue::Date(d) => write!(f, "{}", d),
            AttributeValue::Time(t) => write!(f, "{}", t),
            AttributeValue::DateTime(dt) => write!(f, "{}", dt),
            AttributeValue::Timestamp(ts) => write!(f, "{}", ts),
            AttributeValue::Geometry(g) => write!(f, "{}", crate::wkt::Wkt(g)),
            AttributeValue::Text(s) => f.write_str(s),
            AttributeValue::Binary(bytes) => {
                for b in bytes {
                    write!(f, "{:02x}", b)?;
                }
                Ok(())
            }
            AttributeValue::Other(o) => write!(f, "{}", o),
        }
    }
}

macro_rules! attribute_from {
    ($($t:ty => $variant:ident as $target:ty),* $(,)?) => {
        $(
            impl From<$t> for AttributeValue {
                fn from(v: $t) -> Self {
                    AttributeValue::$variant(<$target>::from(v))
                }
            }
        )*
    };
}

attribute_from! {
    i8 => Int as i64,
    i16 => Int as i64,
    i32 => Int as i64,
    i64 => Int as i64,
    u8 => UInt as u64,
    u16 => UInt as u64,
    u32 => UInt as u64,
    u64 => UInt as u64,
    i128 => BigInt as i128,
    f32 => Float as f64,
    f64 => Float as f64,
    bool => Bool as bool,
    String => Text as String,
    NaiveDate => Date as NaiveDate,
    NaiveTime => Time as NaiveTime,
    NaiveDateTime => DateTime as NaiveDateTime,
    Vec<u8> => Binary as Vec<u8>,
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        AttributeValue::Text(s.to_string())
    }
}

impl From<DateTime<FixedOffset>> for AttributeValue {
    fn from(ts: DateTime<FixedOffset>) -> Self {
        AttributeValue::Timestamp(ts)
    }
}

impl From<geo_types::Geometry<f64>> for AttributeValue {
    fn from(g: geo_types::Geometry<f64>) -> Self {
        AttributeValue::Geometry(g)
    }
}

impl From<geo_types::Point<f64>> for AttributeValue {
    fn from(p: geo_types::Point<f64>) -> Self {
        AttributeValue::Geometry(p.into())
    }
}

impl From<geo_types::LineString<f64>> for AttributeValue {
    fn from(ls: geo_types::LineString<f64>) -> Self {
        AttributeValue::Geometry(ls.into())
    }
}

impl From<geo_types::Polygon<f64>> for AttributeValue {
    fn from(p: geo_types::Polygon<f64>) -> Self {
        AttributeValue::Geometry(p.into())
    }
}

impl<T: Into<AttributeValue>> From<Option<T>> for AttributeValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(AttributeValue::Null)
    }
}

/// Content of a single output cell
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// Blank cell
    Null,
    /// Numeric value, always double precision
    Number(f64),
    /// Wall-clock instant shown with [`DATE_TIME_FORMAT`]
    Temporal(NaiveDateTime),
    Text(String),
    /// Well-known-text rendering of a geometry
    GeometryText(String),
}

impl CellValue {
    /// Convert cell value to its display string
    pub fn as_string(&self) -> String {
        match self {
            CellValue::Null => String::new(),
            CellValue::Number(n) => n.to_string(),
            CellValue::Temporal(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            CellValue::Text(s) | CellValue::GeometryText(s) => s.clone(),
        }
    }

    /// Check if cell is blank
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Text payload of `Text` and `GeometryText` cells
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) | CellValue::GeometryText(s) => Some(s),
            _ => None,
        }
    }

    /// Width in characters the cell occupies when displayed
    pub fn display_width(&self) -> usize {
        match self {
            CellValue::Null => 0,
            CellValue::Temporal(_) => DATE_TIME_FORMAT.len(),
            CellValue::Number(n) => n.to_string().len(),
            CellValue::Text(s) | CellValue::GeometryText(s) => s.chars().count(),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_string())
    }
}

/// Cell style presets; the fixed date/time format is the only styling applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CellStyle {
    /// General format
    #[default]
    Default,
    /// `yyyy-mm-dd hh:mm:ss`
    DateTime,
}

/// Styled cell value (combines value with formatting)
#[derive(Debug, Clone, PartialEq)]
pub struct StyledCell {
    pub value: CellValue,
    pub style: CellStyle,
}

impl StyledCell {
    pub fn new(value: CellValue, style: CellStyle) -> Self {
        StyledCell { value, style }
    }
}

impl From<CellValue> for StyledCell {
    fn from(value: CellValue) -> Self {
        StyledCell {
            value,
            style: CellStyle::Default,
        }
    }
}

/// One output row; `cells` is always as long as the column list
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// Row position in the sheet (0 is the header)
    pub index: u32,
    pub cells: Vec<StyledCell>,
}

impl Row {
    pub fn new(index: u32, cells: Vec<StyledCell>) -> Self {
        Row { index, cells }
    }

    /// Header row built from column names
    pub fn header(columns: &[Column]) -> Self {
        let cells = columns
            .iter()
            .map(|c| StyledCell::from(CellValue::Text(c.name.clone())))
            .collect();
        Row { index: 0, cells }
    }

    /// Get cell value at column index
    pub fn get(&self, col: usize) -> Option<&CellValue> {
        self.cells.get(col).map(|c| &c.value)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn values(&self) -> impl Iterator<Item = &CellValue> {
        self.cells.iter().map(|c| &c.value)
    }
}
