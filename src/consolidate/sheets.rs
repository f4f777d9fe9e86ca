//! Rendering of the three kinds of output sheet onto umya worksheets.

use umya_spreadsheet::Worksheet;

use super::metrics::MetricsSnapshot;
use super::types::{AttendanceSchema, CombinedTable};
use crate::excel::writer::{set_number, set_text};
use crate::excel::{write_table, MetricsLayout, Presentation};

pub const METRICS_TITLE: &str = "MÉTRICAS GERAIS";
pub const SECTOR_TABLE_TITLE: &str = "ATENDIMENTOS POR SETOR";
pub const PERSON_TABLE_TITLE: &str = "ATENDIMENTOS POR RESPONSÁVEL";

/// First row of the first breakdown table
const BREAKDOWN_START_ROW: u32 = 10;

/// Every combined row, schema fields plus tag columns
pub fn render_main_sheet(
    sheet: &mut Worksheet,
    table: &CombinedTable,
    schema: &AttendanceSchema,
    presentation: &dyn Presentation,
) {
    let columns = schema.main_columns();
    let rows: Vec<Vec<Option<String>>> = table.rows.iter().map(|r| r.main_values()).collect();

    write_table(sheet, &columns, &rows);
    presentation.style_table(sheet, &columns, &rows);
}

/// One person's rows with the original fields only
pub fn render_person_sheet(
    sheet: &mut Worksheet,
    table: &CombinedTable,
    person: &str,
    schema: &AttendanceSchema,
    presentation: &dyn Presentation,
) -> usize {
    let columns = schema.source_columns();
    let rows: Vec<Vec<Option<String>>> = table.rows_for(person).map(|r| r.values.clone()).collect();

    write_table(sheet, &columns, &rows);
    presentation.style_table(sheet, &columns, &rows);
    rows.len()
}

/// KPIs at the top, then the two breakdown tables when there is data
pub fn render_metrics_sheet(
    sheet: &mut Worksheet,
    metrics: &MetricsSnapshot,
    presentation: &dyn Presentation,
) -> MetricsLayout {
    let mut layout = MetricsLayout::default();

    set_text(sheet, 1, 1, METRICS_TITLE);
    sheet.add_merge_cells("A1:B1");
    layout.title_rows.push(1);

    set_text(sheet, 1, 3, "Indicador");
    set_text(sheet, 2, 3, "Valor");
    layout.header_rows.push(3);

    let mut row = 4;
    set_text(sheet, 1, row, "Atendimentos Totais");
    set_number(sheet, 2, row, metrics.total as f64);
    row += 1;
    set_text(sheet, 1, row, "Finalizados");
    set_number(sheet, 2, row, metrics.completed as f64);
    row += 1;
    set_text(sheet, 1, row, "% Finalizados");
    set_text(sheet, 2, row, &format!("{:.1}%", metrics.completion_rate));
    row += 1;
    set_text(sheet, 1, row, "Tempo Total (minutos)");
    set_text(sheet, 2, row, &format!("{:.1}", metrics.duration_total));
    row += 1;
    set_text(sheet, 1, row, "Tempo Médio (minutos)");
    set_text(sheet, 2, row, &format!("{:.1}", metrics.duration_mean));
    layout.body_rows.extend(4..=row);

    if metrics.total > 0 {
        let next = write_breakdown(
            sheet,
            &mut layout,
            BREAKDOWN_START_ROW,
            SECTOR_TABLE_TITLE,
            ("Setor", "Qtd. Atendimentos"),
            &metrics.by_sector,
        );
        write_breakdown(
            sheet,
            &mut layout,
            next + 1,
            PERSON_TABLE_TITLE,
            ("Responsável", "Qtd. Atendimentos"),
            &metrics.by_person,
        );
    }

    presentation.style_metrics(sheet, &layout);
    layout
}

/// Title row, header row, then one row per label. Returns the row after the
/// table plus one blank row.
fn write_breakdown(
    sheet: &mut Worksheet,
    layout: &mut MetricsLayout,
    start: u32,
    title: &str,
    headers: (&str, &str),
    counts: &[(String, usize)],
) -> u32 {
    set_text(sheet, 1, start, title);
    sheet.add_merge_cells(format!("A{}:B{}", start, start));
    layout.title_rows.push(start);

    set_text(sheet, 1, start + 1, headers.0);
    set_text(sheet, 2, start + 1, headers.1);
    layout.header_rows.push(start + 1);

    let mut row = start + 2;
    for (label, count) in counts {
        set_text(sheet, 1, row, label);
        set_number(sheet, 2, row, *count as f64);
        layout.body_rows.push(row);
        row += 1;
    }

    row + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::excel::PlainPresentation;
    use umya_spreadsheet::new_file_empty_worksheet;

    fn snapshot(total: usize) -> MetricsSnapshot {
        MetricsSnapshot {
            total,
            completed: 1,
            completion_rate: 12.5,
            duration_total: 30.0,
            duration_mean: 3.75,
            by_sector: vec![("TI".to_string(), 5), ("RH".to_string(), 3)],
            by_person: vec![("ANA".to_string(), 8)],
        }
    }

    #[test]
    fn test_metrics_layout() {
        let mut book = new_file_empty_worksheet();
        let sheet = book.new_sheet("M").unwrap();

        let layout = render_metrics_sheet(sheet, &snapshot(8), &PlainPresentation);

        assert_eq!(layout.title_rows, vec![1, 10, 16]);
        assert_eq!(layout.header_rows, vec![3, 11, 17]);
        assert_eq!(sheet.get_value("A10"), SECTOR_TABLE_TITLE);
        assert_eq!(sheet.get_value("A12"), "TI");
        assert_eq!(sheet.get_value("A16"), PERSON_TABLE_TITLE);
        assert_eq!(sheet.get_value("A18"), "ANA");
        assert_eq!(sheet.get_value("B6"), "12.5%");
        assert_eq!(sheet.get_value("B8"), "3.8");
    }

    #[test]
    fn test_metrics_without_data_has_no_breakdowns() {
        let mut book = new_file_empty_worksheet();
        let sheet = book.new_sheet("M").unwrap();

        let mut empty = snapshot(0);
        empty.completed = 0;
        let layout = render_metrics_sheet(sheet, &empty, &PlainPresentation);

        assert_eq!(layout.title_rows, vec![1]);
        assert_eq!(layout.body_rows, vec![4, 5, 6, 7, 8]);
    }
}
