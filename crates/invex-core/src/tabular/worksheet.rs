//! Worksheet loading.

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use tracing::debug;

use crate::error::{InvexError, Result};

/// Cell values of one sheet as display strings, in row/column order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Worksheet {
    pub name: String,
    pub rows: Vec<Vec<String>>,
}

impl Worksheet {
    pub fn new(name: impl Into<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }

    /// Open a workbook (xlsx, xlsm, xls, ods) and take its first sheet with data.
    pub fn load(path: &Path) -> Result<Self> {
        let mut workbook = open_workbook_auto(path)
            .map_err(|e| InvexError::Spreadsheet(format!("{}: {}", path.display(), e)))?;

        for name in workbook.sheet_names() {
            let range = workbook
                .worksheet_range(&name)
                .map_err(|e| InvexError::Spreadsheet(format!("sheet '{}': {}", name, e)))?;

            let rows: Vec<Vec<String>> = range
                .rows()
                .map(|row| row.iter().map(cell_to_string).collect())
                .collect();

            let sheet = Self::new(name, rows);
            if !sheet.is_empty() {
                debug!("Using sheet '{}' with {} rows", sheet.name, sheet.rows.len());
                return Ok(sheet);
            }
        }

        Err(InvexError::Spreadsheet(format!(
            "{}: workbook has no non-empty sheet",
            path.display()
        )))
    }

    /// True when no cell holds text.
    pub fn is_empty(&self) -> bool {
        self.rows
            .iter()
            .all(|row| row.iter().all(|c| c.trim().is_empty()))
    }

    /// Rows as text lines, cells separated by two spaces.
    pub fn to_text(&self) -> String {
        rows_to_text(&self.rows)
    }
}

pub(crate) fn rows_to_text(rows: &[Vec<String>]) -> String {
    rows.iter()
        .map(|row| {
            row.iter()
                .map(|c| c.trim())
                .filter(|c| !c.is_empty())
                .collect::<Vec<_>>()
                .join("  ")
        })
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => format_float(*f),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(ndt) if ndt.time() == chrono::NaiveTime::MIN => ndt.date().format("%Y-%m-%d").to_string(),
            Some(ndt) => ndt.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => format_float(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
    }
}

/// Whole numbers without a trailing ".0".
fn format_float(f: f64) -> String {
    if f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{}", f as i64)
    } else {
        let s = format!("{:.6}", f);
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_float() {
        assert_eq!(format_float(45.0), "45");
        assert_eq!(format_float(10.5), "10.5");
        assert_eq!(format_float(0.1 + 0.2), "0.3");
    }

    #[test]
    fn test_to_text_skips_empty_cells_and_rows() {
        let sheet = Worksheet::new(
            "Sheet1",
            vec![
                vec!["Invoice No".into(), "".into(), "A-17".into()],
                vec!["".into(), "".into()],
                vec!["Total".into(), "45".into()],
            ],
        );
        assert_eq!(sheet.to_text(), "Invoice No  A-17\nTotal  45");
        assert!(!sheet.is_empty());
    }

    #[test]
    fn test_load_xlsx() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("invoice.xlsx");
        crate::tabular::fixtures::write_xlsx(
            &path,
            "Invoice",
            &[
                &["Description", "Qty", "Price", "Amount"],
                &["Printer paper", "10", "4.5", "45"],
                &["Stapler & staples", "2", "12.25", "24.5"],
            ],
        );

        let sheet = Worksheet::load(&path).unwrap();
        assert_eq!(sheet.name, "Invoice");
        assert_eq!(sheet.rows.len(), 3);
        assert_eq!(sheet.rows[1], vec!["Printer paper", "10", "4.5", "45"]);
        assert_eq!(sheet.rows[2][0], "Stapler & staples");
    }

    #[test]
    fn test_load_missing_file() {
        let err = Worksheet::load(Path::new("/nonexistent/book.xlsx")).unwrap_err();
        assert!(matches!(err, InvexError::Spreadsheet(_)));
    }
}
