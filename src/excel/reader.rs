use calamine::{open_workbook_auto, Data, Range, Reader, Sheets};
use glob::Pattern;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use super::types::*;

/// Extensions recognized as child workbooks
pub const CHILD_EXTENSIONS: [&str; 2] = ["xlsx", "xlsm"];

/// Lists and reads tabular files for the ingestor
pub trait WorkbookStore {
    /// Candidate child files in `dir`, sorted by path
    fn list_children(&self, dir: &Path) -> Result<Vec<PathBuf>, ExcelError>;

    /// First sheet of `path` as text, header row first
    fn read_table(&self, path: &Path) -> Result<RawTable, ExcelError>;
}

/// Workbook store backed by the local filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct FsStore;

impl WorkbookStore for FsStore {
    fn list_children(&self, dir: &Path) -> Result<Vec<PathBuf>, ExcelError> {
        list_workbooks(dir)
    }

    fn read_table(&self, path: &Path) -> Result<RawTable, ExcelError> {
        read_table(path, None)
    }
}

/// Find `*.xlsx` and `*.xlsm` files directly inside `dir`
pub fn list_workbooks(dir: &Path) -> Result<Vec<PathBuf>, ExcelError> {
    if !dir.is_dir() {
        return Err(ExcelError::file_not_found(&dir.display().to_string()));
    }

    let escaped = Pattern::escape(&dir.to_string_lossy());
    let mut files = Vec::new();

    for ext in CHILD_EXTENSIONS {
        let pattern = format!("{}/*.{}", escaped, ext);
        let entries = glob::glob(&pattern)
            .map_err(|e| ExcelError::read_error(format!("Invalid pattern '{}': {}", pattern, e)))?;

        for entry in entries {
            let path = entry
                .map_err(|e| ExcelError::read_error(format!("Failed to list {}: {}", dir.display(), e)))?;
            if path.is_file() {
                files.push(path);
            }
        }
    }

    files.sort();
    Ok(files)
}

/// Read one sheet (the first one when `sheet` is `None`) as untyped text
pub fn read_table(path: &Path, sheet: Option<&str>) -> Result<RawTable, ExcelError> {
    if !path.exists() {
        return Err(ExcelError::file_not_found(&path.display().to_string()));
    }

    let mut workbook: Sheets<_> = open_workbook_auto(path)
        .map_err(|e| ExcelError::read_error(format!("Failed to open workbook: {}", e)))?;

    let range = match sheet {
        Some(name) => workbook
            .worksheet_range(name)
            .map_err(|e| ExcelError::read_error(format!("Failed to read sheet '{}': {}", name, e)))?,
        None => workbook
            .worksheet_range_at(0)
            .ok_or_else(|| ExcelError::sheet_not_found("#0"))?
            .map_err(|e| ExcelError::read_error(format!("Failed to read first sheet: {}", e)))?,
    };

    Ok(range_to_table(&range))
}

/// Split a range into a trimmed header row and padded text rows
fn range_to_table(range: &Range<Data>) -> RawTable {
    let mut rows = range.rows();

    let headers: Vec<String> = match rows.next() {
        Some(header) => header
            .iter()
            .map(|cell| {
                convert_cell_value(Some(cell))
                    .into_text()
                    .map(|h| h.trim().to_string())
                    .unwrap_or_default()
            })
            .collect(),
        None => return RawTable::default(),
    };

    let width = headers.len();
    let rows = rows
        .map(|row| {
            let mut values: Vec<Option<String>> = row
                .iter()
                .map(|cell| convert_cell_value(Some(cell)).into_text())
                .collect();
            values.resize(width, None);
            values
        })
        .collect();

    RawTable { headers, rows }
}

/// Convert calamine Data to our CellValue
fn convert_cell_value(cell: Option<&Data>) -> CellValue {
    match cell {
        None => CellValue::Empty,
        Some(data) => match data {
            Data::Empty => CellValue::Empty,
            Data::String(s) => CellValue::String(s.clone()),
            Data::Float(f) => CellValue::Number(*f),
            Data::Int(i) => CellValue::Number(*i as f64),
            Data::Bool(b) => CellValue::Boolean(*b),
            Data::DateTime(dt) => CellValue::DateTime(format_excel_datetime(dt.as_f64())),
            Data::DateTimeIso(s) => CellValue::DateTime(s.clone()),
            Data::DurationIso(s) => CellValue::String(s.clone()),
            Data::Error(e) => CellValue::Error(format!("{:?}", e)),
        },
    }
}

/// Format an Excel serial (days since 1899-12-30). Serials below one day are
/// pure times and render as `HH:MM:SS`.
fn format_excel_datetime(value: f64) -> String {
    let days = value.floor() as i64;
    let total_seconds = (value.fract() * 86400.0).round() as u32;

    // rounding can carry a fraction up to a full day
    let (days, total_seconds) = if total_seconds >= 86400 {
        (days + 1, total_seconds - 86400)
    } else {
        (days, total_seconds)
    };

    let time = chrono::NaiveTime::from_num_seconds_from_midnight_opt(total_seconds, 0)
        .unwrap_or_default();

    if days == 0 {
        return time.format("%H:%M:%S").to_string();
    }

    let date = chrono::TimeDelta::try_days(days).and_then(|delta| excel_epoch().checked_add_signed(delta));
    match date {
        Some(date) => chrono::NaiveDateTime::new(date, time)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
        // outside chrono's calendar; keep the raw serial
        None => format_number(value),
    }
}

/// Excel epoch is December 30, 1899
pub fn excel_epoch() -> chrono::NaiveDate {
    chrono::NaiveDate::from_ymd_opt(1899, 12, 30).unwrap_or_default()
}

/// Convert column index (0-based) to Excel column letter (A, B, ..., Z, AA, AB, ...)
pub fn column_index_to_letter(index: u32) -> String {
    let mut result = String::new();
    let mut n = index + 1;

    while n > 0 {
        n -= 1;
        let c = (b'A' + (n % 26) as u8) as char;
        result.insert(0, c);
        n /= 26;
    }

    result
}

/// Get list of sheets in a workbook, in workbook order
#[cfg(test)]
pub(crate) fn get_sheets(path: &Path) -> Result<Vec<SheetInfo>, ExcelError> {
    let workbook: Sheets<_> = open_workbook_auto(path)
        .map_err(|e| ExcelError::read_error(format!("Failed to open workbook: {}", e)))?;

    Ok(workbook
        .sheet_names()
        .iter()
        .enumerate()
        .map(|(index, name)| SheetInfo {
            name: name.clone(),
            index: index as u32,
        })
        .collect())
}

/// Compute SHA-256 checksum of a file
pub fn compute_checksum(path: &Path) -> Result<String, ExcelError> {
    let mut file = File::open(path)
        .map_err(|e| ExcelError::read_error(format!("Failed to open file for checksum: {}", e)))?;

    let mut hasher = Sha256::new();
    let mut buffer = [0; 8192];

    loop {
        let bytes_read = file.read(&mut buffer)
            .map_err(|e| ExcelError::read_error(format!("Failed to read file for checksum: {}", e)))?;

        if bytes_read == 0 {
            break;
        }

        hasher.update(&buffer[..bytes_read]);
    }

    let result = hasher.finalize();
    Ok(format!("{:x}", result))
}
