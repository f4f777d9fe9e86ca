//! Plain-text run log, overwritten on every run.

use chrono::{DateTime, Local};
use std::fmt::Display;
use std::fs;
use std::io;
use std::path::Path;

use super::ingest::IngestReport;

const RULE_WIDTH: usize = 50;
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Text of a successful (or preview) run
pub fn render_run_log(
    at: DateTime<Local>,
    preview: bool,
    report: &IngestReport,
    checksum: Option<&str>,
) -> String {
    let mut out = format!("Execução em {}", at.format(TIMESTAMP_FORMAT));
    if preview {
        out.push_str(" (MODO TEMPORÁRIO)");
    }
    out.push('\n');
    out.push_str(&format!("Total de registros: {}\n", report.table.len()));
    out.push_str(&format!(
        "Arquivos processados: OK={}, ignorados={}\n",
        report.accepted_count(),
        report.skipped_count()
    ));
    if let Some(checksum) = checksum {
        out.push_str(&format!("SHA-256: {}\n", checksum));
    }
    out.push_str(&"-".repeat(RULE_WIDTH));
    out.push('\n');
    out.push_str(&report.log_lines().join("\n"));
    out
}

/// Text of a run that aborted
pub fn render_error_log(at: DateTime<Local>, error: &dyn Display) -> String {
    format!(
        "ERRO em {}\n❌ Erro na atualização: {}\nDetalhes: {}",
        at.format(TIMESTAMP_FORMAT),
        error,
        error
    )
}

pub fn write_log(path: &Path, contents: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, contents)
}
