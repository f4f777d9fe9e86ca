use chrono::NaiveDate;
use glob::Pattern;
use std::fs;
use std::path::{Path, PathBuf};
use umya_spreadsheet::{new_file_empty_worksheet, reader, writer, Spreadsheet, Worksheet};

use super::reader::excel_epoch;
use super::types::{ColumnSpec, ExcelError, FieldKind};

/// Where a consolidated workbook is saved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// The master file; saving rotates the backup first
    Primary(PathBuf),
    /// A side-by-side copy named `{prefix}{stamp}.xlsx` in `dir`
    Preview { dir: PathBuf, prefix: String, stamp: String },
}

impl OutputTarget {
    pub fn path(&self) -> PathBuf {
        match self {
            OutputTarget::Primary(path) => path.clone(),
            OutputTarget::Preview { dir, prefix, stamp } => dir.join(format!("{}{}.xlsx", prefix, stamp)),
        }
    }

    pub fn is_preview(&self) -> bool {
        matches!(self, OutputTarget::Preview { .. })
    }
}

/// Copy `path` into the single backup slot, then remove the original.
///
/// Returns `Ok(false)` when there is nothing to back up. An earlier backup is
/// overwritten; only the immediately prior version is kept.
pub fn rotate_backup(path: &Path, backup_path: &Path) -> Result<bool, ExcelError> {
    if !path.exists() {
        return Ok(false);
    }

    if let Some(parent) = backup_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| {
                ExcelError::backup_error(format!("Failed to create backup folder {}: {}", parent.display(), e))
            })?;
            tracing::info!(dir = %parent.display(), "backup folder created");
        }
    }

    if backup_path.exists() {
        fs::remove_file(backup_path)
            .map_err(|e| ExcelError::backup_error(format!("Failed to remove previous backup: {}", e)))?;
        tracing::debug!("previous backup removed");
    }

    fs::copy(path, backup_path)
        .map_err(|e| ExcelError::backup_error(format!("Failed to create backup: {}", e)))?;
    tracing::info!(backup = %backup_path.display(), "backup created");

    // only remove the original once the copy exists
    fs::remove_file(path)
        .map_err(|e| ExcelError::backup_error(format!("Failed to remove {}: {}", path.display(), e)))?;
    tracing::info!(path = %path.display(), "previous output removed");

    Ok(true)
}

/// Reuse the workbook at `path` if it is still there, otherwise start empty
pub fn open_container(path: &Path) -> Result<Spreadsheet, ExcelError> {
    if path.exists() {
        reader::xlsx::read(path)
            .map_err(|e| ExcelError::read_error(format!("Failed to open workbook: {}", e)))
    } else {
        Ok(new_file_empty_worksheet())
    }
}

/// Delete the sheet called `name` if present and create it again, empty
pub fn replace_sheet<'a>(book: &'a mut Spreadsheet, name: &str) -> Result<&'a mut Worksheet, ExcelError> {
    if book.get_sheet_by_name(name).is_some() {
        book.remove_sheet_by_name(name)
            .map_err(|e| ExcelError::write_error(format!("Failed to remove sheet '{}': {}", name, e)))?;
    }

    book.new_sheet(name)
        .map_err(|e| ExcelError::write_error(format!("Failed to create sheet '{}': {}", name, e)))
}

/// Relocate the sheet called `name` to the first position
pub fn move_sheet_first(book: &mut Spreadsheet, name: &str) -> Result<(), ExcelError> {
    let sheets = book.get_sheet_collection_mut();
    let pos = sheets
        .iter()
        .position(|s| s.get_name() == name)
        .ok_or_else(|| ExcelError::sheet_not_found(name))?;

    sheets[..=pos].rotate_right(1);
    Ok(())
}

/// Write a header row and data rows starting at A1.
///
/// Values are written as text so the child files' contents survive as-is;
/// `Date` columns holding `YYYY-MM-DD` become date serials.
pub fn write_table(sheet: &mut Worksheet, columns: &[ColumnSpec], rows: &[Vec<Option<String>>]) {
    for (col_idx, column) in columns.iter().enumerate() {
        sheet
            .get_cell_mut((col_idx as u32 + 1, 1))
            .set_value_string(column.name.as_str());
    }

    for (row_idx, row) in rows.iter().enumerate() {
        let row_num = row_idx as u32 + 2;

        for (col_idx, column) in columns.iter().enumerate() {
            let value = match row.get(col_idx).and_then(|v| v.as_deref()) {
                Some(v) if !v.is_empty() => v,
                _ => continue,
            };

            let cell = sheet.get_cell_mut((col_idx as u32 + 1, row_num));
            match (column.kind, date_serial(value)) {
                (FieldKind::Date, Some(serial)) => {
                    cell.set_value_number(serial);
                }
                _ => {
                    cell.set_value_string(value);
                }
            }
        }
    }
}

/// Set a text cell by 1-based column and row
pub fn set_text(sheet: &mut Worksheet, col: u32, row: u32, value: &str) {
    sheet.get_cell_mut((col, row)).set_value_string(value);
}

/// Set a numeric cell by 1-based column and row
pub fn set_number(sheet: &mut Worksheet, col: u32, row: u32, value: f64) {
    sheet.get_cell_mut((col, row)).set_value_number(value);
}

fn date_serial(value: &str) -> Option<f64> {
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()?;
    Some((date - excel_epoch()).num_days() as f64)
}

/// Write `book` to `path` via a sibling temp file and a rename, so the target
/// is either the previous file or the complete new one.
pub fn save_atomic(book: &Spreadsheet, path: &Path) -> Result<(), ExcelError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| ExcelError::write_error(format!("Failed to create {}: {}", parent.display(), e)))?;
        }
    }

    let tmp_path = temp_path(path)?;
    if let Err(e) = writer::xlsx::write(book, &tmp_path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(ExcelError::write_error(format!("Failed to save workbook: {}", e)));
    }

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        ExcelError::write_error(format!("Failed to move workbook into place: {}", e))
    })
}

fn temp_path(path: &Path) -> Result<PathBuf, ExcelError> {
    let file_name = path
        .file_name()
        .ok_or_else(|| ExcelError::invalid_format(format!("Invalid output path: {}", path.display())))?;
    Ok(path.with_file_name(format!("{}.tmp", file_name.to_string_lossy())))
}

/// Best-effort status marker in cell A1 of the first sheet of an existing
/// workbook. Any failure is ignored.
pub fn write_status(path: &Path, message: &str) {
    if !path.exists() {
        return;
    }

    let mut book = match reader::xlsx::read(path) {
        Ok(book) => book,
        Err(e) => {
            tracing::debug!(error = %e, "status marker skipped");
            return;
        }
    };

    if let Some(sheet) = book.get_sheet_collection_mut().get_mut(0) {
        sheet.get_cell_mut("A1").set_value_string(message);
    }

    if let Err(e) = save_atomic(&book, path) {
        tracing::debug!(error = %e, "status marker not saved");
    }
}

/// Delete earlier preview files (`{prefix}*.xlsx`) in `dir`. Files that
/// cannot be removed are logged and left in place.
pub fn cleanup_previews(dir: &Path, prefix: &str) -> Vec<PathBuf> {
    let pattern = format!(
        "{}/{}*.xlsx",
        Pattern::escape(&dir.to_string_lossy()),
        Pattern::escape(prefix)
    );

    let entries = match glob::glob(&pattern) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(error = %e, "invalid preview pattern");
            return Vec::new();
        }
    };

    let mut removed = Vec::new();
    for path in entries.flatten() {
        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::info!(path = %path.display(), "old preview removed");
                removed.push(path);
            }
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "could not remove old preview"),
        }
    }
    removed
}
