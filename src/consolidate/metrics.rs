use serde::Serialize;
use std::collections::HashMap;

use super::types::{parse_duration, AttendanceSchema, CombinedTable};
use crate::excel::has_meaningful_value;

/// Label used for rows whose sector is blank
pub const BLANK_LABEL: &str = "(vazio)";

/// Derived, read-only view over a combined table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub total: usize,
    pub completed: usize,
    /// Percentage in 0..=100
    pub completion_rate: f64,
    pub duration_total: f64,
    pub duration_mean: f64,
    pub by_sector: Vec<(String, usize)>,
    pub by_person: Vec<(String, usize)>,
}

pub fn compute_metrics(table: &CombinedTable, schema: &AttendanceSchema) -> MetricsSnapshot {
    let total = table.len();
    let completion_idx = schema.field_index(&schema.completion_field);
    let duration_idx = schema.field_index(&schema.duration_field);
    let sector_idx = schema.field_index(&schema.sector_field);

    let completed = table
        .rows
        .iter()
        .filter(|row| schema.is_truthy(completion_idx.and_then(|i| row.get(i))))
        .count();

    let duration_total: f64 = table
        .rows
        .iter()
        .map(|row| parse_duration(duration_idx.and_then(|i| row.get(i))))
        .sum();

    let (completion_rate, duration_mean) = if total == 0 {
        (0.0, 0.0)
    } else {
        (
            completed as f64 / total as f64 * 100.0,
            duration_total / total as f64,
        )
    };

    let by_sector = count_by(table.rows.iter().map(|row| {
        let value = sector_idx.and_then(|i| row.get(i));
        if has_meaningful_value(value) {
            value.unwrap_or_default().to_string()
        } else {
            BLANK_LABEL.to_string()
        }
    }));
    let by_person = count_by(table.rows.iter().map(|row| row.person.clone()));

    MetricsSnapshot {
        total,
        completed,
        completion_rate,
        duration_total,
        duration_mean,
        by_sector,
        by_person,
    }
}

/// Frequency table: descending count, ties in first-seen order
fn count_by<I: Iterator<Item = String>>(labels: I) -> Vec<(String, usize)> {
    let mut order: Vec<(String, usize)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for label in labels {
        match index.get(&label) {
            Some(&i) => order[i].1 += 1,
            None => {
                index.insert(label.clone(), order.len());
                order.push((label, 1));
            }
        }
    }

    // stable sort keeps first-seen order among equal counts
    order.sort_by(|a, b| b.1.cmp(&a.1));
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consolidate::types::Row;
    use std::collections::HashSet;

    fn row(person: &str, sector: Option<&str>, done: Option<&str>, minutes: Option<&str>) -> Row {
        let schema = AttendanceSchema::default();
        let mut values = vec![None; schema.fields.len()];
        values[schema.field_index("CLIENTE").unwrap()] = Some("ACME".to_string());
        values[schema.field_index("SETOR").unwrap()] = sector.map(String::from);
        values[schema.field_index("FINALIZAR").unwrap()] = done.map(String::from);
        values[schema.field_index("TIME SPENT").unwrap()] = minutes.map(String::from);
        Row {
            values,
            person: person.to_string(),
            source_date: None,
            source_file: "f.xlsx".to_string(),
        }
    }

    fn table(rows: Vec<Row>) -> CombinedTable {
        CombinedTable {
            fields: AttendanceSchema::default().field_names(),
            rows,
        }
    }

    fn as_set(pairs: &[(String, usize)]) -> HashSet<(String, usize)> {
        pairs.iter().cloned().collect()
    }

    #[test]
    fn test_empty_table() {
        let m = compute_metrics(&table(Vec::new()), &AttendanceSchema::default());
        assert_eq!(m.total, 0);
        assert_eq!(m.completed, 0);
        assert_eq!(m.completion_rate, 0.0);
        assert_eq!(m.duration_mean, 0.0);
        assert!(m.by_sector.is_empty());
        assert!(m.by_person.is_empty());
    }

    #[test]
    fn test_kpis() {
        let rows = vec![
            row("ANA", Some("TI"), Some("Sim"), Some("10")),
            row("ANA", Some("RH"), Some("não"), Some("abc")),
            row("BIA", Some("TI"), None, Some("20")),
            row("BIA", Some("  "), Some("TRUE"), None),
        ];
        let m = compute_metrics(&table(rows), &AttendanceSchema::default());

        assert_eq!(m.total, 4);
        assert_eq!(m.completed, 2);
        assert!(m.completed <= m.total);
        assert_eq!(m.completion_rate, 50.0);
        assert_eq!(m.duration_total, 30.0);
        assert_eq!(m.duration_mean, 7.5);
        assert_eq!(
            as_set(&m.by_sector),
            as_set(&[
                ("TI".to_string(), 2),
                ("RH".to_string(), 1),
                (BLANK_LABEL.to_string(), 1)
            ])
        );
        assert_eq!(
            as_set(&m.by_person),
            as_set(&[("ANA".to_string(), 2), ("BIA".to_string(), 2)])
        );
    }

    #[test]
    fn test_aggregates_ignore_row_order() {
        let mut rows = vec![
            row("ANA", Some("TI"), Some("sim"), Some("1.5")),
            row("BIA", Some("RH"), None, Some("2.25")),
            row("CAIO", Some("TI"), Some("1"), Some("4")),
        ];
        let schema = AttendanceSchema::default();
        let forward = compute_metrics(&table(rows.clone()), &schema);
        rows.reverse();
        let backward = compute_metrics(&table(rows), &schema);

        assert_eq!(forward.duration_total, backward.duration_total);
        assert_eq!(forward.duration_mean, backward.duration_mean);
        assert_eq!(forward.completed, backward.completed);
        assert_eq!(as_set(&forward.by_sector), as_set(&backward.by_sector));
    }

    #[test]
    fn test_count_by_sorts_by_count() {
        let counts = count_by(["a", "b", "b", "c", "b", "c"].iter().map(|s| s.to_string()));
        assert_eq!(
            counts,
            vec![("b".to_string(), 3), ("c".to_string(), 2), ("a".to_string(), 1)]
        );
    }
}
