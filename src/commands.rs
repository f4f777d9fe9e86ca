use chrono::Local;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::{ConfigError, Settings};
use crate::consolidate::{
    render_error_log, render_run_log, write_log, ConsolidateError, Consolidator, IngestReport, MetricsSnapshot,
    RunOutcome,
};
use crate::excel::{write_status, FsStore, OutputTarget, PlainPresentation, Presentation, StandardPresentation};

#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Consolidate(#[from] ConsolidateError),
}

/// Presentation picked by the `--plain` flag
pub fn presentation(plain: bool) -> &'static dyn Presentation {
    if plain {
        &PlainPresentation
    } else {
        &StandardPresentation
    }
}

/// Consolidate into the primary output, rotating the backup first
pub fn run_consolidate(settings: &Settings, presentation: &dyn Presentation) -> Result<RunOutcome, CommandError> {
    let target = OutputTarget::Primary(settings.output_path());
    execute(settings, presentation, &target)
}

/// Consolidate into a timestamped preview file beside the primary output
pub fn run_preview(settings: &Settings, presentation: &dyn Presentation) -> Result<RunOutcome, CommandError> {
    let target = OutputTarget::Preview {
        dir: settings.preview_dir(),
        prefix: settings.preview_prefix.clone(),
        stamp: Local::now().format("%Y%m%d_%H%M%S").to_string(),
    };
    execute(settings, presentation, &target)
}

/// Ingest and compute metrics only; nothing is written
pub fn run_check(settings: &Settings) -> Result<(IngestReport, MetricsSnapshot), CommandError> {
    let mut consolidator = Consolidator::new(
        &FsStore,
        &PlainPresentation,
        &settings.schema,
        settings.children_path(),
        settings.backup_path(),
    );
    let (report, metrics) = consolidator.inspect()?;

    print_files(&report);
    print_metrics(&metrics);
    Ok((report, metrics))
}

fn execute(
    settings: &Settings,
    presentation: &dyn Presentation,
    target: &OutputTarget,
) -> Result<RunOutcome, CommandError> {
    let mut consolidator = Consolidator::new(
        &FsStore,
        presentation,
        &settings.schema,
        settings.children_path(),
        settings.backup_path(),
    );

    match consolidator.run(target) {
        Ok(outcome) => {
            let log = render_run_log(Local::now(), target.is_preview(), &outcome.report, Some(&outcome.checksum));
            save_log(&settings.log_path(), &log);

            print_files(&outcome.report);
            println!(
                "Planilha gerada: {} ({} registros, {} abas)",
                outcome.output.display(),
                outcome.report.table.len(),
                outcome.sheets.len()
            );
            if let Some(backup) = &outcome.backup {
                println!("Backup: {}", backup.display());
            }
            Ok(outcome)
        }
        Err(e) => {
            report_failure(settings, target, &e);
            Err(e.into())
        }
    }
}

/// Error log plus a status marker on the primary output if it still exists.
/// Previews never touch the primary output.
fn report_failure(settings: &Settings, target: &OutputTarget, err: &ConsolidateError) {
    let message = format!("❌ Erro na atualização: {}", err);
    error!(error = %err, "run aborted");

    if let OutputTarget::Primary(path) = target {
        write_status(path, &message);
    }
    save_log(&settings.log_path(), &render_error_log(Local::now(), err));
}

fn save_log(path: &Path, contents: &str) {
    match write_log(path, contents) {
        Ok(()) => info!(path = %path.display(), "run log written"),
        Err(e) => warn!(path = %path.display(), error = %e, "could not write run log"),
    }
}

fn print_files(report: &IngestReport) {
    for line in report.log_lines() {
        println!("{}", line);
    }
}

fn print_metrics(metrics: &MetricsSnapshot) {
    println!("Atendimentos Totais: {}", metrics.total);
    println!("Finalizados: {} ({:.1}%)", metrics.completed, metrics.completion_rate);
    println!(
        "Tempo Total: {:.1} min, Tempo Médio: {:.1} min",
        metrics.duration_total, metrics.duration_mean
    );
    for (sector, count) in &metrics.by_sector {
        println!("  {}: {}", sector, count);
    }
}
