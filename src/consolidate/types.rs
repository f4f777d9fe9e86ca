use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::excel::{ColumnSpec, FieldKind, FieldSchema};

pub const MAIN_SHEET: &str = "COMPILE GERAL";
pub const METRICS_SHEET: &str = "MÉTRICAS";

/// Tag columns appended to every ingested row
pub const TAG_PERSON: &str = "PRIMEIRO_NOME";
pub const TAG_DATE: &str = "DATA_ARQUIVO";
pub const TAG_FILE: &str = "ARQUIVO";

/// Excel limits sheet names to 31 characters
const MAX_SHEET_NAME: usize = 31;

/// The column contract of a child file and the role each field plays.
///
/// Completion and duration parsing are deliberately lenient: a completion
/// value counts only if it matches one of `truthy_tokens` (case-insensitive),
/// and an unparsable duration counts as zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceSchema {
    pub fields: Vec<FieldSchema>,
    pub completion_field: String,
    pub duration_field: String,
    pub sector_field: String,
    pub truthy_tokens: Vec<String>,
}

impl Default for AttendanceSchema {
    fn default() -> Self {
        AttendanceSchema {
            fields: vec![
                FieldSchema::with_kind("INICIAR", FieldKind::DateTime),
                FieldSchema::key("RESPONSÁVEL"),
                FieldSchema::key("OPERAÇÃO"),
                FieldSchema::key("CLIENTE"),
                FieldSchema::key("SOLICITAÇÃO"),
                FieldSchema::text("SETOR"),
                FieldSchema::text("OBSERVAÇÕES"),
                FieldSchema::with_kind("FINALIZAR", FieldKind::DateTime),
                FieldSchema::with_kind("TIME SPENT", FieldKind::Duration),
                FieldSchema::with_kind("TRATATIVA SETOR", FieldKind::DateTime),
                FieldSchema::with_kind("TIME SPENT - SETOR", FieldKind::Duration),
            ],
            completion_field: "FINALIZAR".to_string(),
            duration_field: "TIME SPENT".to_string(),
            sector_field: "SETOR".to_string(),
            truthy_tokens: ["sim", "yes", "true", "1"].iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl AttendanceSchema {
    /// Every role must name one of the fields
    pub fn validate(&self) -> Result<(), String> {
        if self.fields.is_empty() {
            return Err("schema has no fields".to_string());
        }
        for (role, name) in [
            ("completion_field", &self.completion_field),
            ("duration_field", &self.duration_field),
            ("sector_field", &self.sector_field),
        ] {
            if self.field_index(name).is_none() {
                return Err(format!("{} '{}' is not a schema field", role, name));
            }
        }
        Ok(())
    }

    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Positions of the key fields within `fields`
    pub fn key_indices(&self) -> Vec<usize> {
        self.fields
            .iter()
            .enumerate()
            .filter(|(_, f)| f.key)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn is_truthy(&self, value: Option<&str>) -> bool {
        let value = match value {
            Some(v) => v.trim().to_lowercase(),
            None => return false,
        };
        self.truthy_tokens.iter().any(|t| t.to_lowercase() == value)
    }

    /// Columns of a person sheet: the required fields only
    pub fn source_columns(&self) -> Vec<ColumnSpec> {
        self.fields
            .iter()
            .map(|f| ColumnSpec::new(f.name.clone(), f.kind))
            .collect()
    }

    /// Columns of the main sheet: required fields followed by the tags
    pub fn main_columns(&self) -> Vec<ColumnSpec> {
        let mut columns = self.source_columns();
        columns.push(ColumnSpec::new(TAG_PERSON, FieldKind::Text));
        columns.push(ColumnSpec::new(TAG_DATE, FieldKind::Date));
        columns.push(ColumnSpec::new(TAG_FILE, FieldKind::Text));
        columns
    }
}

/// Numeric duration, treating missing, unparsable and non-finite values as zero
pub fn parse_duration(value: Option<&str>) -> f64 {
    value
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|n| n.is_finite())
        .unwrap_or(0.0)
}

/// `ANA` -> `Ana`, capped to Excel's sheet-name length
pub fn person_sheet_name(person: &str) -> String {
    let mut out = String::with_capacity(person.len());
    let mut at_word_start = true;

    for c in person.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }

    out.chars().take(MAX_SHEET_NAME).collect()
}

/// Person sheet name that does not clash with anything in `taken`.
///
/// Excel compares sheet names case-insensitively, so `taken` holds
/// lower-cased names. A clash gets a ` (2)`, ` (3)`, ... suffix, cutting the
/// base so the result stays within 31 characters. The chosen name is added to
/// `taken`.
pub fn unique_sheet_name(person: &str, taken: &mut HashSet<String>) -> String {
    let base = person_sheet_name(person);
    let mut name = base.clone();
    let mut n = 2;

    while taken.contains(&name.to_lowercase()) {
        let suffix = format!(" ({})", n);
        let keep = MAX_SHEET_NAME - suffix.chars().count();
        name = base.chars().take(keep).chain(suffix.chars()).collect();
        n += 1;
    }

    taken.insert(name.to_lowercase());
    name
}

/// One ingested row: the required fields in schema order plus the tags
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub values: Vec<Option<String>>,
    pub person: String,
    pub source_date: Option<NaiveDate>,
    pub source_file: String,
}

impl Row {
    pub fn get(&self, index: usize) -> Option<&str> {
        self.values.get(index).and_then(|v| v.as_deref())
    }

    /// Values as laid out on the main sheet
    pub fn main_values(&self) -> Vec<Option<String>> {
        let mut values = self.values.clone();
        values.push(Some(self.person.clone()));
        values.push(self.source_date.map(|d| d.format("%Y-%m-%d").to_string()));
        values.push(Some(self.source_file.clone()));
        values
    }
}

/// All accepted rows, in file discovery order then row order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CombinedTable {
    pub fields: Vec<String>,
    pub rows: Vec<Row>,
}

impl CombinedTable {
    pub fn new(schema: &AttendanceSchema) -> Self {
        CombinedTable {
            fields: schema.field_names(),
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct person tags, sorted
    pub fn persons(&self) -> Vec<String> {
        let mut persons: Vec<String> = self.rows.iter().map(|r| r.person.clone()).collect();
        persons.sort();
        persons.dedup();
        persons
    }

    pub fn rows_for<'a>(&'a self, person: &'a str) -> impl Iterator<Item = &'a Row> + 'a {
        self.rows.iter().filter(move |r| r.person == person)
    }
}
