//! Export options and their environment overrides

use crate::error::{ExportError, Result};
use std::path::PathBuf;

/// Rows kept mutable in memory before older rows are flushed to staging
pub const DEFAULT_WINDOW_ROWS: usize = 100;
pub const DEFAULT_SHEET_NAME: &str = "data";
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;

const ENV_WINDOW_ROWS: &str = "GEOSHEET_WINDOW_ROWS";
const ENV_TEMP_DIR: &str = "GEOSHEET_TEMP_DIR";
const ENV_COMPRESSION: &str = "GEOSHEET_COMPRESSION";

/// Ambient settings of an export. None of them change the encoded data.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExportOptions {
    /// Size of the bounded write window
    pub window_rows: usize,
    /// Name of the single output sheet
    pub sheet_name: String,
    /// Run the column auto-fit pass
    pub autosize: bool,
    /// Deflate level for the zip package (0-9)
    pub compression_level: u32,
    /// Directory for staging files; system temp dir when `None`
    pub temp_dir: Option<PathBuf>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        ExportOptions {
            window_rows: DEFAULT_WINDOW_ROWS,
            sheet_name: DEFAULT_SHEET_NAME.to_string(),
            autosize: true,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            temp_dir: None,
        }
    }
}

impl ExportOptions {
    /// Defaults overridden by `GEOSHEET_*` environment variables.
    ///
    /// Unset or unparsable variables keep the default.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Self {
        let mut options = ExportOptions::default();
        if let Some(rows) = lookup(ENV_WINDOW_ROWS).and_then(|s| s.trim().parse::<usize>().ok()) {
            options.window_rows = rows.max(1);
        }
        if let Some(level) = lookup(ENV_COMPRESSION).and_then(|s| s.trim().parse::<u32>().ok()) {
            options.compression_level = level.min(9);
        }
        if let Some(dir) = lookup(ENV_TEMP_DIR).filter(|s| !s.trim().is_empty()) {
            options.temp_dir = Some(PathBuf::from(dir));
        }
        options
    }

    pub fn with_window_rows(mut self, rows: usize) -> Self {
        self.window_rows = rows;
        self
    }

    pub fn with_sheet_name(mut self, name: impl Into<String>) -> Self {
        self.sheet_name = name.into();
        self
    }

    pub fn with_autosize(mut self, autosize: bool) -> Self {
        self.autosize = autosize;
        self
    }

    pub fn with_compression_level(mut self, level: u32) -> Self {
        self.compression_level = level;
        self
    }

    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    /// Check limits that both workbook formats impose
    pub fn validate(&self) -> Result<()> {
        if self.window_rows == 0 {
            return Err(ExportError::InvalidOptions(
                "window_rows must be at least 1".to_string(),
            ));
        }
        if self.compression_level > 9 {
            return Err(ExportError::InvalidOptions(format!(
                "compression_level {} is above 9",
                self.compression_level
            )));
        }
        let name = &self.sheet_name;
        if name.is_empty() || name.chars().count() > 31 {
            return Err(ExportError::InvalidOptions(format!(
                "sheet name '{}' must be 1 to 31 characters",
                name
            )));
        }
        if let Some(c) = name.chars().find(|c| matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\')) {
            return Err(ExportError::InvalidOptions(format!(
                "sheet name '{}' contains '{}'",
                name, c
            )));
        }
        Ok(())
    }

    pub(crate) fn staging_file(&self) -> std::io::Result<std::fs::File> {
        match &self.temp_dir {
            Some(dir) => tempfile::tempfile_in(dir),
            None => tempfile::tempfile(),
        }
    }

    pub(crate) fn staging_dir(&self) -> std::io::Result<tempfile::TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("geosheet-");
        match &self.temp_dir {
            Some(dir) => builder.tempdir_in(dir),
            None => builder.tempdir(),
        }
    }
}
