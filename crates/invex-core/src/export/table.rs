//! Plain-text table rendering.

use super::{ExportColumn, ExportRow};

const MAX_CELL_WIDTH: usize = 32;

fn cell(value: &str) -> String {
    let flat = value.replace(['\n', '\r'], " ");
    if flat.chars().count() > MAX_CELL_WIDTH {
        let cut: String = flat.chars().take(MAX_CELL_WIDTH - 3).collect();
        format!("{}...", cut)
    } else {
        flat
    }
}

fn pad_line<'a>(values: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    values
        .zip(widths)
        .map(|(v, w)| format!("{:<width$}", v, width = *w))
        .collect::<Vec<_>>()
        .join(" | ")
        .trim_end()
        .to_string()
}

/// Render rows under the export column headers, padded to column width.
pub fn render_table(rows: &[ExportRow]) -> String {
    let headers = ExportColumn::names();
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|r| r.values().iter().map(|v| cell(v)).collect())
        .collect();

    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| {
            cells
                .iter()
                .filter_map(|row| row.get(i))
                .map(|c| c.chars().count())
                .fold(h.len(), usize::max)
        })
        .collect();

    let mut out = String::new();
    out.push_str(&pad_line(headers.iter().copied(), &widths));
    out.push('\n');
    out.push_str(
        &widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-"),
    );
    out.push('\n');
    for row in &cells {
        out.push_str(&pad_line(row.iter().map(String::as_str), &widths));
        out.push('\n');
    }
    out
}
