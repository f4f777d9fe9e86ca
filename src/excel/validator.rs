use super::types::*;

/// Result of matching a table's header row against the required fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaCheck {
    /// For each required field, the index of its column in the table
    pub column_map: Vec<Option<usize>>,
    /// Required fields absent from the header row, in schema order
    pub missing: Vec<String>,
}

impl SchemaCheck {
    pub fn is_valid(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Match required fields to header names. Headers are compared exactly
/// (they are already trimmed on load); extra columns are ignored.
pub fn check_required_columns(table: &RawTable, fields: &[FieldSchema]) -> SchemaCheck {
    let mut column_map = Vec::with_capacity(fields.len());
    let mut missing = Vec::new();

    for field in fields {
        let idx = table.column_index(&field.name);
        if idx.is_none() {
            missing.push(field.name.clone());
        }
        column_map.push(idx);
    }

    SchemaCheck { column_map, missing }
}

/// A value counts as data if it is present and not only whitespace
pub fn has_meaningful_value(value: Option<&str>) -> bool {
    value.map(|v| !v.trim().is_empty()).unwrap_or(false)
}

/// Row filter: keep the row if any key column holds data. With no key
/// columns at all every row is kept.
pub fn is_non_empty_row(row: &[Option<String>], key_columns: &[usize]) -> bool {
    if key_columns.is_empty() {
        return true;
    }

    key_columns
        .iter()
        .any(|&idx| has_meaningful_value(row.get(idx).and_then(|v| v.as_deref())))
}
