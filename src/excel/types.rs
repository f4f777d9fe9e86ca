use serde::{Deserialize, Serialize};

/// Information about a sheet in a workbook
#[cfg(test)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetInfo {
    pub name: String,
    pub index: u32,
}

/// Represents a cell value with type information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum CellValue {
    Empty,
    String(String),
    Number(f64),
    Boolean(bool),
    DateTime(String), // "YYYY-MM-DD HH:MM:SS" or "HH:MM:SS" for pure times
    Error(String),
}

impl Default for CellValue {
    fn default() -> Self {
        CellValue::Empty
    }
}

impl CellValue {
    /// Untyped text form of the cell. `None` means the cell is missing,
    /// which is distinct from a present-but-empty string.
    pub fn into_text(self) -> Option<String> {
        match self {
            CellValue::Empty => None,
            CellValue::String(s) => Some(s),
            CellValue::Number(n) => Some(format_number(n)),
            CellValue::Boolean(b) => Some(if b { "TRUE" } else { "FALSE" }.to_string()),
            CellValue::DateTime(dt) => Some(dt),
            CellValue::Error(e) => Some(format!("#{}", e)),
        }
    }
}

/// Integral floats render without a fractional part ("15", not "15.0")
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// Semantic type of a field, used to pick display formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    DateTime,
    Date,
    Duration,
}

/// Schema for a single required field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSchema {
    pub name: String,
    pub kind: FieldKind,
    /// Key fields decide whether a row carries real data
    #[serde(default)]
    pub key: bool,
}

impl FieldSchema {
    pub fn text(name: &str) -> Self {
        FieldSchema { name: name.to_string(), kind: FieldKind::Text, key: false }
    }

    pub fn key(name: &str) -> Self {
        FieldSchema { name: name.to_string(), kind: FieldKind::Text, key: true }
    }

    pub fn with_kind(name: &str, kind: FieldKind) -> Self {
        FieldSchema { name: name.to_string(), kind, key: false }
    }
}

/// A column handed to the presentation layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: String,
    pub kind: FieldKind,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        ColumnSpec { name: name.into(), kind }
    }
}

/// First sheet of a workbook, as untyped text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    /// Header row, trimmed of surrounding whitespace
    pub headers: Vec<String>,
    /// Data rows; each is padded to `headers.len()`
    pub rows: Vec<Vec<Option<String>>>,
}

impl RawTable {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }
}

/// Excel-specific errors
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExcelError {
    pub message: String,
    pub error_type: ExcelErrorType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExcelErrorType {
    FileNotFound,
    InvalidFormat,
    SheetNotFound,
    ReadError,
    WriteError,
    BackupError,
}

impl std::fmt::Display for ExcelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ExcelError {}

impl ExcelError {
    pub fn new(message: impl Into<String>, error_type: ExcelErrorType) -> Self {
        ExcelError {
            message: message.into(),
            error_type,
        }
    }

    pub fn file_not_found(path: &str) -> Self {
        ExcelError::new(format!("File not found: {}", path), ExcelErrorType::FileNotFound)
    }

    pub fn invalid_format(message: impl Into<String>) -> Self {
        ExcelError::new(message, ExcelErrorType::InvalidFormat)
    }

    pub fn sheet_not_found(sheet: &str) -> Self {
        ExcelError::new(format!("Sheet not found: {}", sheet), ExcelErrorType::SheetNotFound)
    }

    pub fn read_error(message: impl Into<String>) -> Self {
        ExcelError::new(message, ExcelErrorType::ReadError)
    }

    pub fn write_error(message: impl Into<String>) -> Self {
        ExcelError::new(message, ExcelErrorType::WriteError)
    }

    pub fn backup_error(message: impl Into<String>) -> Self {
        ExcelError::new(message, ExcelErrorType::BackupError)
    }
}
