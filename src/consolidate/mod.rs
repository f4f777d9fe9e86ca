//! Consolidation of per-person attendance workbooks into one master workbook.
//!
//! - `filename`: child file naming convention
//! - `ingest`: discovery, validation and row filtering of child files
//! - `metrics`: KPIs and breakdowns over the combined rows
//! - `sheets`: rendering of the main, metrics and per-person sheets
//! - `pipeline`: the run state machine tying the above together
//! - `report`: the plain-text run log

pub mod types;
pub mod filename;
pub mod ingest;
pub mod metrics;
pub mod sheets;
pub mod pipeline;
pub mod report;

pub use types::{person_sheet_name, AttendanceSchema, CombinedTable, Row, MAIN_SHEET, METRICS_SHEET};
pub use filename::{parse_child_name, ParsedName, EXPECTED_PATTERN};
pub use ingest::{ingest_children, ChildFile, IngestReport, SkipReason, Verdict};
pub use metrics::{compute_metrics, MetricsSnapshot};
pub use pipeline::{ConsolidateError, Consolidator, RunOutcome, RunState};
pub use report::{render_error_log, render_run_log, write_log};
