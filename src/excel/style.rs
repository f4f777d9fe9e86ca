//! Presentation layer: visual styling of produced sheets.
//!
//! The writer fills cell values; a [`Presentation`] decorates them afterwards
//! from the final column list and each column's [`FieldKind`].

use umya_spreadsheet::{Border, HorizontalAlignmentValues, Style, VerticalAlignmentValues, Worksheet};

use super::reader::column_index_to_letter;
use super::types::{ColumnSpec, FieldKind};

const ACCENT: &str = "FFED7D31";
const WHITE: &str = "FFFFFFFF";
const MAX_COLUMN_WIDTH: usize = 50;

/// Row positions on the metrics sheet, 1-based
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsLayout {
    pub title_rows: Vec<u32>,
    pub header_rows: Vec<u32>,
    pub body_rows: Vec<u32>,
}

pub trait Presentation {
    /// Style a header-plus-rows sheet. `rows` are the values written below the header.
    fn style_table(&self, sheet: &mut Worksheet, columns: &[ColumnSpec], rows: &[Vec<Option<String>>]);

    /// Style the two-column metrics sheet
    fn style_metrics(&self, sheet: &mut Worksheet, layout: &MetricsLayout);
}

/// Orange header, thin orange borders, auto widths and field-specific formats
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardPresentation;

/// Leaves every cell unstyled
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainPresentation;

impl Presentation for PlainPresentation {
    fn style_table(&self, _sheet: &mut Worksheet, _columns: &[ColumnSpec], _rows: &[Vec<Option<String>>]) {}

    fn style_metrics(&self, _sheet: &mut Worksheet, _layout: &MetricsLayout) {}
}

impl Presentation for StandardPresentation {
    fn style_table(&self, sheet: &mut Worksheet, columns: &[ColumnSpec], rows: &[Vec<Option<String>>]) {
        for (col_idx, column) in columns.iter().enumerate() {
            let col_num = col_idx as u32 + 1;

            apply_header(sheet.get_style_mut((col_num, 1)));

            let mut max_len = column.name.chars().count();

            for (row_idx, row) in rows.iter().enumerate() {
                let row_num = row_idx as u32 + 2;
                let value = row.get(col_idx).and_then(|v| v.as_deref());

                if let Some(v) = value {
                    max_len = max_len.max(v.chars().count());
                }

                let style = sheet.get_style_mut((col_num, row_num));
                apply_border(style);
                apply_body_alignment(style, column.kind, value);
                if let Some(code) = number_format(column.kind) {
                    style.get_number_format_mut().set_format_code(code);
                }
            }

            let letter = column_index_to_letter(col_idx as u32);
            sheet
                .get_column_dimension_mut(&letter)
                .set_width(column_width(max_len));
        }
    }

    fn style_metrics(&self, sheet: &mut Worksheet, layout: &MetricsLayout) {
        for &row in &layout.title_rows {
            let style = sheet.get_style_mut((1, row));
            apply_header(style);
            style.get_font_mut().set_size(if row == 1 { 14.0 } else { 12.0 });
            apply_border(sheet.get_style_mut((2, row)));
        }

        for &row in &layout.header_rows {
            for col in 1..=2 {
                apply_header(sheet.get_style_mut((col, row)));
            }
        }

        for &row in &layout.body_rows {
            let label = sheet.get_style_mut((1, row));
            apply_border(label);
            set_alignment(label, HorizontalAlignmentValues::Left, VerticalAlignmentValues::Center);

            let value = sheet.get_style_mut((2, row));
            apply_border(value);
            set_alignment(value, HorizontalAlignmentValues::Center, VerticalAlignmentValues::Center);
        }

        sheet.get_column_dimension_mut("A").set_width(35.0);
        sheet.get_column_dimension_mut("B").set_width(20.0);
    }
}

/// Display format for a field kind; text has none
pub fn number_format(kind: FieldKind) -> Option<&'static str> {
    match kind {
        FieldKind::Text => None,
        FieldKind::DateTime => Some("DD/MM/YYYY HH:MM"),
        FieldKind::Date => Some("DD/MM/YYYY"),
        FieldKind::Duration => Some("HH:MM:SS"),
    }
}

/// Multi-line or long (more than five words) values wrap
pub fn needs_wrap(value: &str) -> bool {
    value.contains('\n') || value.split_whitespace().count() > 5
}

fn column_width(max_len: usize) -> f64 {
    (max_len + 2).min(MAX_COLUMN_WIDTH) as f64
}

fn apply_header(style: &mut Style) {
    let font = style.get_font_mut();
    font.set_bold(true);
    font.get_color_mut().set_argb(WHITE);
    style.set_background_color(ACCENT);
    set_alignment(style, HorizontalAlignmentValues::Center, VerticalAlignmentValues::Center);
    apply_border(style);
}

fn apply_border(style: &mut Style) {
    let borders = style.get_borders_mut();
    thin_accent(borders.get_left_mut());
    thin_accent(borders.get_right_mut());
    thin_accent(borders.get_top_mut());
    thin_accent(borders.get_bottom_mut());
}

fn thin_accent(side: &mut Border) {
    side.set_border_style(Border::BORDER_THIN);
    side.get_color_mut().set_argb(ACCENT);
}

fn apply_body_alignment(style: &mut Style, kind: FieldKind, value: Option<&str>) {
    let horizontal = match kind {
        FieldKind::Text => HorizontalAlignmentValues::Left,
        _ => HorizontalAlignmentValues::Center,
    };

    if value.map(needs_wrap).unwrap_or(false) {
        set_alignment(style, horizontal, VerticalAlignmentValues::Top);
        style.get_alignment_mut().set_wrap_text(true);
    } else {
        set_alignment(style, horizontal, VerticalAlignmentValues::Center);
    }
}

fn set_alignment(style: &mut Style, horizontal: HorizontalAlignmentValues, vertical: VerticalAlignmentValues) {
    let alignment = style.get_alignment_mut();
    alignment.set_horizontal(horizontal);
    alignment.set_vertical(vertical);
}
