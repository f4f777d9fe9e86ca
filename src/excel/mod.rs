//! Excel module for reading, validating, writing and styling workbooks.
//!
//! This module provides:
//! - A workbook store that lists child files and reads them as text
//! - Required-column checks and the key-field row filter
//! - Sheet replacement, backup rotation and atomic saves
//! - The presentation layer applied to produced sheets

pub mod types;
pub mod reader;
pub mod validator;
pub mod writer;
pub mod style;

// Re-export commonly used types and functions
pub use types::*;
pub use reader::{compute_checksum, list_workbooks, read_table, FsStore, WorkbookStore};
pub use validator::{check_required_columns, has_meaningful_value, is_non_empty_row, SchemaCheck};
pub use writer::{
    cleanup_previews, move_sheet_first, open_container, replace_sheet, rotate_backup, save_atomic,
    write_status, write_table, OutputTarget,
};
pub use style::{MetricsLayout, PlainPresentation, Presentation, StandardPresentation};
