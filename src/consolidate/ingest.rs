use chrono::NaiveDate;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::filename::{parse_child_name, EXPECTED_PATTERN};
use super::types::{AttendanceSchema, CombinedTable, Row};
use crate::excel::{check_required_columns, is_non_empty_row, ExcelError, WorkbookStore};

/// Why a child file contributed no rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    InvalidName,
    MissingColumns(Vec<String>),
    NoValidData,
    ReadError(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accepted { useful_rows: usize },
    Rejected(SkipReason),
}

/// One discovered source file and what happened to it
#[derive(Debug, Clone, PartialEq)]
pub struct ChildFile {
    pub path: PathBuf,
    pub file_name: String,
    pub person: Option<String>,
    pub date: Option<NaiveDate>,
    pub raw_row_count: usize,
    pub verdict: Verdict,
}

impl ChildFile {
    pub fn is_accepted(&self) -> bool {
        matches!(self.verdict, Verdict::Accepted { .. })
    }
}

impl fmt::Display for ChildFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.verdict {
            Verdict::Accepted { useful_rows } => write!(
                f,
                "✅ OK: {} ({} linhas úteis de {} total)",
                self.file_name, useful_rows, self.raw_row_count
            ),
            Verdict::Rejected(SkipReason::InvalidName) => write!(
                f,
                "❌ Nome inválido: {} (padrão: {})",
                self.file_name, EXPECTED_PATTERN
            ),
            Verdict::Rejected(SkipReason::MissingColumns(missing)) => write!(
                f,
                "❌ Colunas faltando em {}: {}",
                self.file_name,
                missing.join(", ")
            ),
            Verdict::Rejected(SkipReason::NoValidData) => {
                write!(f, "⚠️ Arquivo sem dados válidos: {}", self.file_name)
            }
            Verdict::Rejected(SkipReason::ReadError(message)) => {
                write!(f, "❌ Erro lendo {}: {}", self.file_name, message)
            }
        }
    }
}

/// Combined rows plus one outcome per discovered file, in discovery order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestReport {
    pub table: CombinedTable,
    pub files: Vec<ChildFile>,
}

impl IngestReport {
    pub fn log_lines(&self) -> Vec<String> {
        self.files.iter().map(|f| f.to_string()).collect()
    }

    pub fn accepted_count(&self) -> usize {
        self.files.iter().filter(|f| f.is_accepted()).count()
    }

    pub fn skipped_count(&self) -> usize {
        self.files.len() - self.accepted_count()
    }
}

/// Load every child file in `dir`.
///
/// Only a failure to list the directory is an error. Per-file problems are
/// recorded in the report and the remaining files are still processed.
pub fn ingest_children<S: WorkbookStore>(
    store: &S,
    dir: &Path,
    schema: &AttendanceSchema,
) -> Result<IngestReport, ExcelError> {
    let paths = store.list_children(dir)?;
    info!(dir = %dir.display(), files = paths.len(), "scanning child files");

    let mut report = IngestReport {
        table: CombinedTable::new(schema),
        files: Vec::with_capacity(paths.len()),
    };

    for path in paths {
        let (child, rows) = ingest_file(store, &path, schema);

        match &child.verdict {
            Verdict::Accepted { useful_rows } => {
                info!(file = %child.file_name, rows = useful_rows, total = child.raw_row_count, "file loaded")
            }
            Verdict::Rejected(reason) => warn!(file = %child.file_name, reason = ?reason, "file skipped"),
        }

        report.table.rows.extend(rows);
        report.files.push(child);
    }

    Ok(report)
}

fn ingest_file<S: WorkbookStore>(store: &S, path: &Path, schema: &AttendanceSchema) -> (ChildFile, Vec<Row>) {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());

    let mut child = ChildFile {
        path: path.to_path_buf(),
        file_name: file_name.clone(),
        person: None,
        date: None,
        raw_row_count: 0,
        verdict: Verdict::Rejected(SkipReason::InvalidName),
    };

    let parsed = match parse_child_name(path) {
        Some(parsed) => parsed,
        None => return (child, Vec::new()),
    };
    child.person = Some(parsed.person.clone());
    child.date = parsed.date;

    let table = match store.read_table(path) {
        Ok(table) => table,
        Err(e) => {
            child.verdict = Verdict::Rejected(SkipReason::ReadError(e.to_string()));
            return (child, Vec::new());
        }
    };
    child.raw_row_count = table.rows.len();

    let check = check_required_columns(&table, &schema.fields);
    if !check.is_valid() {
        child.verdict = Verdict::Rejected(SkipReason::MissingColumns(check.missing));
        return (child, Vec::new());
    }

    let key_indices = schema.key_indices();
    let rows: Vec<Row> = table
        .rows
        .into_iter()
        .map(|raw| {
            check
                .column_map
                .iter()
                .map(|idx| idx.and_then(|i| raw.get(i).cloned().flatten()))
                .collect::<Vec<_>>()
        })
        .filter(|values| is_non_empty_row(values, &key_indices))
        .map(|values| Row {
            values,
            person: parsed.person.clone(),
            source_date: parsed.date,
            source_file: file_name.clone(),
        })
        .collect();

    debug!(file = %file_name, kept = rows.len(), dropped = child.raw_row_count - rows.len(), "row filter applied");

    child.verdict = if rows.is_empty() {
        Verdict::Rejected(SkipReason::NoValidData)
    } else {
        Verdict::Accepted { useful_rows: rows.len() }
    };

    (child, rows)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::excel::RawTable;
    use std::collections::HashMap;

    /// In-memory store: file name -> table, or an error message
    #[derive(Default)]
    pub(crate) struct MemoryStore {
        pub files: Vec<(String, Result<RawTable, String>)>,
    }

    impl MemoryStore {
        pub fn with(mut self, name: &str, table: RawTable) -> Self {
            self.files.push((name.to_string(), Ok(table)));
            self
        }

        pub fn broken(mut self, name: &str, message: &str) -> Self {
            self.files.push((name.to_string(), Err(message.to_string())));
            self
        }
    }

    impl WorkbookStore for MemoryStore {
        fn list_children(&self, dir: &Path) -> Result<Vec<PathBuf>, ExcelError> {
            let mut paths: Vec<PathBuf> = self.files.iter().map(|(n, _)| dir.join(n)).collect();
            paths.sort();
            Ok(paths)
        }

        fn read_table(&self, path: &Path) -> Result<RawTable, ExcelError> {
            let name = path.file_name().unwrap().to_string_lossy().to_string();
            let by_name: HashMap<_, _> = self.files.iter().map(|(n, t)| (n.clone(), t)).collect();
            match by_name.get(&name) {
                Some(Ok(table)) => Ok(table.clone()),
                Some(Err(message)) => Err(ExcelError::read_error(message.clone())),
                None => Err(ExcelError::file_not_found(&name)),
            }
        }
    }

    /// A table with every required column; each row sets CLIENTE and SETOR
    pub(crate) fn attendance_table(rows: &[(&str, &str)]) -> RawTable {
        let schema = AttendanceSchema::default();
        let headers = schema.field_names();
        let cliente = schema.field_index("CLIENTE").unwrap();
        let setor = schema.field_index("SETOR").unwrap();

        let rows = rows
            .iter()
            .map(|(c, s)| {
                let mut row = vec![None; headers.len()];
                row[cliente] = Some(c.to_string());
                row[setor] = Some(s.to_string());
                row
            })
            .collect();

        RawTable { headers, rows }
    }

    #[test]
    fn test_scenario_valid_and_invalid_files() {
        let store = MemoryStore::default()
            .with(
                "ANA_SILVA - ATENDIMENTOS - 01-02-24.xlsx",
                attendance_table(&[("ACME", "TI"), ("", "TI"), ("Beta", "RH"), ("Gama", "TI")]),
            )
            .with("BOB_JONES.xlsx", attendance_table(&[("X", "Y")]));
        let schema = AttendanceSchema::default();

        let report = ingest_children(&store, Path::new("filhas"), &schema).unwrap();

        assert_eq!(report.table.len(), 3);
        assert!(report.table.rows.iter().all(|r| r.person == "ANA"));
        assert_eq!(report.table.rows[0].source_date, NaiveDate::from_ymd_opt(2024, 2, 1));
        assert_eq!(report.files.len(), 2);
        assert_eq!(report.accepted_count(), 1);

        let lines = report.log_lines();
        assert_eq!(
            lines[0],
            "✅ OK: ANA_SILVA - ATENDIMENTOS - 01-02-24.xlsx (3 linhas úteis de 4 total)"
        );
        assert!(lines[1].starts_with("❌ Nome inválido: BOB_JONES.xlsx"));
    }

    #[test]
    fn test_extra_column_is_ignored() {
        let mut table = attendance_table(&[("ACME", "TI")]);
        table.headers.insert(0, "EXTRA".to_string());
        for row in &mut table.rows {
            row.insert(0, Some("ignored".to_string()));
        }
        let store = MemoryStore::default().with("ANA_SILVA - ATENDIMENTOS - 01-02-24.xlsx", table);

        let report = ingest_children(&store, Path::new("filhas"), &AttendanceSchema::default()).unwrap();

        assert_eq!(report.table.len(), 1);
        assert_eq!(report.table.rows[0].values.len(), 11);
        assert_eq!(report.table.rows[0].get(3), Some("ACME"));
    }

    #[test]
    fn test_missing_column_is_named_in_log() {
        let mut table = attendance_table(&[("ACME", "TI")]);
        let idx = table.column_index("OBSERVAÇÕES").unwrap();
        table.headers.remove(idx);
        for row in &mut table.rows {
            row.remove(idx);
        }
        let store = MemoryStore::default().with("ANA_SILVA - ATENDIMENTOS - 01-02-24.xlsx", table);

        let report = ingest_children(&store, Path::new("filhas"), &AttendanceSchema::default()).unwrap();

        assert!(report.table.is_empty());
        assert_eq!(
            report.files[0].verdict,
            Verdict::Rejected(SkipReason::MissingColumns(vec!["OBSERVAÇÕES".to_string()]))
        );
        assert!(report.log_lines()[0].contains("OBSERVAÇÕES"));
    }

    #[test]
    fn test_file_without_valid_rows_is_excluded() {
        let table = attendance_table(&[("", "TI"), ("   ", "RH")]);
        let store = MemoryStore::default()
            .with("ANA_SILVA - ATENDIMENTOS - 01-02-24.xlsx", table)
            .with("BIA_COSTA - ATENDIMENTOS - 01-02-24.xlsx", attendance_table(&[("ACME", "TI")]));

        let report = ingest_children(&store, Path::new("filhas"), &AttendanceSchema::default()).unwrap();

        assert_eq!(report.table.len(), 1);
        assert_eq!(report.table.rows[0].person, "BIA");
        assert_eq!(report.files[0].verdict, Verdict::Rejected(SkipReason::NoValidData));
        assert!(report.log_lines()[0].contains("sem dados válidos"));
    }

    #[test]
    fn test_read_error_does_not_stop_the_run() {
        let store = MemoryStore::default()
            .broken("ANA_SILVA - ATENDIMENTOS - 01-02-24.xlsx", "corrupt zip")
            .with("BIA_COSTA - ATENDIMENTOS - 01-02-24.xlsx", attendance_table(&[("ACME", "TI")]));

        let report = ingest_children(&store, Path::new("filhas"), &AttendanceSchema::default()).unwrap();

        assert_eq!(report.table.len(), 1);
        assert_eq!(report.skipped_count(), 1);
        assert!(report.log_lines()[0].contains("corrupt zip"));
    }

    #[test]
    fn test_rows_keep_discovery_then_row_order() {
        let store = MemoryStore::default()
            .with("BIA_COSTA - ATENDIMENTOS - 01-02-24.xlsx", attendance_table(&[("b1", "TI"), ("b2", "TI")]))
            .with("ANA_SILVA - ATENDIMENTOS - 01-02-24.xlsx", attendance_table(&[("a1", "TI"), ("a2", "TI")]));

        let report = ingest_children(&store, Path::new("filhas"), &AttendanceSchema::default()).unwrap();

        let clients: Vec<_> = report.table.rows.iter().map(|r| r.get(3).unwrap()).collect();
        assert_eq!(clients, vec!["a1", "a2", "b1", "b2"]);
    }
}
