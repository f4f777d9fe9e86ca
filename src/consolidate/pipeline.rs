use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use umya_spreadsheet::Spreadsheet;

use super::ingest::{ingest_children, IngestReport};
use super::metrics::{compute_metrics, MetricsSnapshot};
use super::sheets::{render_main_sheet, render_metrics_sheet, render_person_sheet};
use super::types::{person_sheet_name, unique_sheet_name, AttendanceSchema, MAIN_SHEET, METRICS_SHEET};
use crate::excel::{
    cleanup_previews, compute_checksum, move_sheet_first, open_container, replace_sheet, rotate_backup,
    save_atomic, ExcelError, OutputTarget, Presentation, WorkbookStore,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Loading,
    BuildingMainSheet,
    BuildingMetricsSheet,
    BuildingPersonSheets,
    Done,
    Failed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Loading => "loading",
            RunState::BuildingMainSheet => "building main sheet",
            RunState::BuildingMetricsSheet => "building metrics sheet",
            RunState::BuildingPersonSheets => "building person sheets",
            RunState::Done => "done",
            RunState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Fatal errors: the run stops and no new output is written
#[derive(Debug, Error)]
pub enum ConsolidateError {
    #[error("directory not found: {}", .0.display())]
    MissingDirectory(PathBuf),
    #[error("failed to load child files: {0}")]
    Ingest(#[source] ExcelError),
    #[error("failed while {state}: {source}")]
    Build {
        state: RunState,
        #[source]
        source: ExcelError,
    },
    #[error("failed to save {}: {source}", .path.display())]
    Save {
        path: PathBuf,
        #[source]
        source: ExcelError,
    },
}

/// What a finished run produced
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub report: IngestReport,
    pub metrics: MetricsSnapshot,
    pub output: PathBuf,
    /// Set when the previous output was moved into the backup slot
    pub backup: Option<PathBuf>,
    /// Sheet names in workbook order
    pub sheets: Vec<String>,
    pub checksum: String,
}

/// Runs ingest, metrics and workbook construction in strict sequence
pub struct Consolidator<'a, S: WorkbookStore> {
    store: &'a S,
    presentation: &'a dyn Presentation,
    schema: &'a AttendanceSchema,
    children_dir: PathBuf,
    backup_path: PathBuf,
    state: RunState,
    history: Vec<RunState>,
}

impl<'a, S: WorkbookStore> Consolidator<'a, S> {
    pub fn new(
        store: &'a S,
        presentation: &'a dyn Presentation,
        schema: &'a AttendanceSchema,
        children_dir: impl Into<PathBuf>,
        backup_path: impl Into<PathBuf>,
    ) -> Self {
        Consolidator {
            store,
            presentation,
            schema,
            children_dir: children_dir.into(),
            backup_path: backup_path.into(),
            state: RunState::Loading,
            history: vec![RunState::Loading],
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Every state entered so far, in order
    pub fn history(&self) -> &[RunState] {
        &self.history
    }

    fn enter(&mut self, state: RunState) {
        debug!(from = %self.state, to = %state, "state transition");
        self.state = state;
        self.history.push(state);
    }

    fn fail(&mut self, err: ConsolidateError) -> ConsolidateError {
        error!(state = %self.state, error = %err, "consolidation failed");
        self.enter(RunState::Failed);
        err
    }

    /// Ingest and compute metrics without touching any output
    pub fn inspect(&mut self) -> Result<(IngestReport, MetricsSnapshot), ConsolidateError> {
        if !self.children_dir.is_dir() {
            let err = ConsolidateError::MissingDirectory(self.children_dir.clone());
            return Err(self.fail(err));
        }

        let report = match ingest_children(self.store, &self.children_dir, self.schema) {
            Ok(report) => report,
            Err(e) => return Err(self.fail(ConsolidateError::Ingest(e))),
        };
        let metrics = compute_metrics(&report.table, self.schema);
        info!(
            rows = report.table.len(),
            files = report.files.len(),
            accepted = report.accepted_count(),
            "child files loaded"
        );

        Ok((report, metrics))
    }

    /// Full run: ingest, back up the previous output, build every sheet in
    /// memory, then save to `target`.
    pub fn run(&mut self, target: &OutputTarget) -> Result<RunOutcome, ConsolidateError> {
        let (report, metrics) = self.inspect()?;
        let output = target.path();

        let backup = match target {
            OutputTarget::Primary(path) => self.backup_previous(path),
            OutputTarget::Preview { dir, prefix, .. } => {
                cleanup_previews(dir, prefix);
                None
            }
        };

        let mut book = match open_container(&output) {
            Ok(book) => book,
            Err(e) => {
                let err = ConsolidateError::Build { state: self.state, source: e };
                return Err(self.fail(err));
            }
        };

        if let Err(source) = self.build(&mut book, &report, &metrics) {
            let err = ConsolidateError::Build { state: self.state, source };
            return Err(self.fail(err));
        }

        if let Err(source) = save_atomic(&book, &output) {
            let err = ConsolidateError::Save { path: output.clone(), source };
            return Err(self.fail(err));
        }

        let checksum = match compute_checksum(&output) {
            Ok(checksum) => checksum,
            Err(source) => {
                let err = ConsolidateError::Save { path: output.clone(), source };
                return Err(self.fail(err));
            }
        };

        let sheets = book
            .get_sheet_collection()
            .iter()
            .map(|s| s.get_name().to_string())
            .collect();

        self.enter(RunState::Done);
        info!(path = %output.display(), rows = report.table.len(), checksum = %checksum, "workbook saved");

        Ok(RunOutcome {
            report,
            metrics,
            output,
            backup,
            sheets,
            checksum,
        })
    }

    /// Move the previous output into the backup slot. Failure only warns; the
    /// original then stays in place and is reused as the container.
    fn backup_previous(&self, path: &Path) -> Option<PathBuf> {
        match rotate_backup(path, &self.backup_path) {
            Ok(true) => Some(self.backup_path.clone()),
            Ok(false) => None,
            Err(e) => {
                warn!(error = %e, "backup failed, continuing without removing the previous output");
                None
            }
        }
    }

    fn build(
        &mut self,
        book: &mut Spreadsheet,
        report: &IngestReport,
        metrics: &MetricsSnapshot,
    ) -> Result<(), ExcelError> {
        let table = &report.table;

        self.enter(RunState::BuildingMainSheet);
        let sheet = replace_sheet(book, MAIN_SHEET)?;
        render_main_sheet(sheet, table, self.schema, self.presentation);

        self.enter(RunState::BuildingMetricsSheet);
        let sheet = replace_sheet(book, METRICS_SHEET)?;
        render_metrics_sheet(sheet, metrics, self.presentation);

        self.enter(RunState::BuildingPersonSheets);
        let mut taken: HashSet<String> = [MAIN_SHEET, METRICS_SHEET].iter().map(|n| n.to_lowercase()).collect();
        for person in table.persons() {
            let name = unique_sheet_name(&person, &mut taken);
            if name != person_sheet_name(&person) {
                warn!(person = %person, sheet = %name, "sheet name already in use, suffixed");
            }
            let sheet = replace_sheet(book, &name)?;
            let rows = render_person_sheet(sheet, table, &person, self.schema, self.presentation);
            debug!(sheet = %name, rows, "person sheet built");
        }

        move_sheet_first(book, MAIN_SHEET)
    }
}
