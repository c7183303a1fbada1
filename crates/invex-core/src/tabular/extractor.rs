//! Worksheet to record mapping.

use std::time::Instant;

use tracing::{debug, info};

use crate::error::{ExtractionWarning, Stage};
use crate::invoice::rules::line_items::{
    classify_header, ends_table, item_from_cells, numeric_value, ColumnRole,
};
use crate::invoice::{missing_field_warnings, ExtractionResult, HeuristicParser, InvoiceParser};
use crate::models::config::ExtractionConfig;

use super::worksheet::{rows_to_text, Worksheet};

/// Maps worksheet cells to an [`ExtractedRecord`](crate::ExtractedRecord).
#[derive(Debug, Clone, Default)]
pub struct TabularExtractor {
    parser: HeuristicParser,
}

impl TabularExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self {
            parser: HeuristicParser::from_config(config),
        }
    }

    pub fn extract(&self, sheet: &Worksheet) -> ExtractionResult {
        let start = Instant::now();
        info!("Extracting from worksheet '{}' ({} rows)", sheet.name, sheet.rows.len());

        let Some((header_idx, roles)) = find_header_row(&sheet.rows) else {
            // No item table: read the whole sheet as text
            debug!("No header row in '{}', falling back to text", sheet.name);
            let mut result = self.parser.parse(&sheet.to_text());
            result.warnings.push(ExtractionWarning::new(
                Stage::Extract,
                "line_items",
                format!("no item header row in sheet '{}'", sheet.name),
            ));
            result.processing_time_ms = start.elapsed().as_millis() as u64;
            return result;
        };

        let total_idx = sheet.rows[header_idx + 1..]
            .iter()
            .position(|row| is_total_row(row, &roles))
            .map(|i| header_idx + 1 + i)
            .unwrap_or(sheet.rows.len());

        let mut items = Vec::new();
        let mut last_was_item = false;
        for row in &sheet.rows[header_idx + 1..total_idx] {
            if row.iter().all(|c| c.trim().is_empty()) {
                last_was_item = false;
                continue;
            }
            match item_from_cells(row, &roles) {
                Some(item) => {
                    items.push(item);
                    last_was_item = true;
                }
                None => {
                    // A wrapped description spilling into the next row
                    let extra = description_text(row, &roles);
                    if let (true, Some(prev), false) = (last_was_item, items.last_mut(), extra.is_empty()) {
                        prev.description = Some(match prev.description.take() {
                            Some(d) => format!("{} {}", d, extra),
                            None => extra,
                        });
                    }
                }
            }
        }

        // Header fields come from above the table and from the totals block
        let mut outside = rows_to_text(&sheet.rows[..header_idx]);
        let bottom = rows_to_text(&sheet.rows[total_idx..]);
        if !bottom.is_empty() {
            outside.push('\n');
            outside.push_str(&bottom);
        }

        let mut record = self.parser.parse_header_fields(&outside);
        record.headers = sheet.rows[header_idx]
            .iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
        record.line_items = items;

        debug!("Mapped {} line items from '{}'", record.line_items.len(), sheet.name);

        let warnings = missing_field_warnings(&record);
        ExtractionResult {
            record,
            warnings,
            processing_time_ms: start.elapsed().as_millis() as u64,
        }
    }
}

/// First row naming a description column and at least one numeric column.
fn find_header_row(rows: &[Vec<String>]) -> Option<(usize, Vec<ColumnRole>)> {
    rows.iter().enumerate().find_map(|(idx, row)| {
        let roles: Vec<ColumnRole> = row
            .iter()
            .map(|cell| classify_header(cell).unwrap_or(ColumnRole::Other))
            .collect();
        let has_description = roles.contains(&ColumnRole::Description);
        let has_numeric = roles.iter().any(ColumnRole::is_numeric);
        let has_values = row.iter().any(|c| c.chars().any(|ch| ch.is_ascii_digit()));
        (has_description && has_numeric && !has_values).then_some((idx, roles))
    })
}

fn is_total_row(row: &[String], roles: &[ColumnRole]) -> bool {
    let numeric_columns = roles.iter().filter(|r| r.is_numeric()).count();
    let numbers = row.iter().filter(|c| numeric_value(c).is_some()).count();
    row.iter()
        .map(|c| c.trim())
        .find(|c| !c.is_empty())
        .is_some_and(|first| ends_table(first, numbers, numeric_columns))
}

fn description_text(row: &[String], roles: &[ColumnRole]) -> String {
    row.iter()
        .zip(roles)
        .filter(|(_, role)| **role == ColumnRole::Description)
        .map(|(cell, _)| cell.trim())
        .filter(|c| !c.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    fn dec(s: &str) -> Option<Decimal> {
        Some(Decimal::from_str(s).unwrap())
    }

    fn sample_sheet() -> Worksheet {
        Worksheet::new(
            "Invoice",
            vec![
                row(&["Contoso Supplies Inc", "", "", ""]),
                row(&["Invoice #", "CS-88", "", ""]),
                row(&["Invoice Date", "2024-02-01", "", ""]),
                row(&["", "", "", ""]),
                row(&["Description", "Qty", "Price", "Amount"]),
                row(&["Printer paper", "10", "4.5", "45"]),
                row(&["Stapler", "2", "12.25", "24.5"]),
                row(&["", "", "", ""]),
                row(&["Subtotal", "", "", "69.5"]),
                row(&["Tax", "", "", "6.95"]),
                row(&["Total", "", "", "76.45"]),
            ],
        )
    }

    #[test]
    fn test_items_in_sheet_order() {
        let result = TabularExtractor::new().extract(&sample_sheet());
        let items = &result.record.line_items;

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].description.as_deref(), Some("Printer paper"));
        assert_eq!(items[0].quantity, dec("10"));
        assert_eq!(items[0].unit_price, dec("4.5"));
        assert_eq!(items[0].amount, dec("45"));
        assert_eq!(items[1].description.as_deref(), Some("Stapler"));
        assert_eq!(result.record.headers, vec!["Description", "Qty", "Price", "Amount"]);
    }

    #[test]
    fn test_header_fields_from_regions() {
        let record = TabularExtractor::new().extract(&sample_sheet()).record;

        assert_eq!(record.invoice_number.as_deref(), Some("CS-88"));
        assert_eq!(record.date, NaiveDate::from_ymd_opt(2024, 2, 1));
        assert_eq!(record.vendor.as_deref(), Some("Contoso Supplies Inc"));
        assert_eq!(record.subtotal, dec("69.5"));
        assert_eq!(record.tax, dec("6.95"));
        assert_eq!(record.total, dec("76.45"));
    }

    #[test]
    fn test_fuzzy_header_and_wrapped_description() {
        let sheet = Worksheet::new(
            "Sheet1",
            vec![
                row(&["#", "ITEM DESCRIPTON", "Quantity", "Line Total"]),
                row(&["1", "Cable, 2m", "3", "9.00"]),
                row(&["", "shielded", "", ""]),
                row(&["2", "Adapter", "1", "4.00"]),
            ],
        );
        let result = TabularExtractor::new().extract(&sheet);
        let items = &result.record.line_items;

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].description.as_deref(), Some("Cable, 2m shielded"));
        assert_eq!(items[0].quantity, dec("3"));
        assert_eq!(items[0].unit_price, None);
        assert_eq!(items[1].amount, dec("4.00"));
    }

    #[test]
    fn test_rows_starting_with_summary_words_are_items() {
        let sheet = Worksheet::new(
            "Sheet1",
            vec![
                row(&["Description", "Qty", "Price", "Amount"]),
                row(&["Consulting", "4", "90", "360"]),
                row(&["Shipping", "1", "25", "25"]),
                row(&["Tax preparation", "1", "120", "120"]),
                row(&["Tax", "", "", "50.5"]),
                row(&["Total", "", "", "555.5"]),
            ],
        );
        let record = TabularExtractor::new().extract(&sheet).record;
        let descriptions: Vec<_> = record.line_items.iter().map(|i| i.description.as_deref()).collect();

        assert_eq!(
            descriptions,
            vec![Some("Consulting"), Some("Shipping"), Some("Tax preparation")]
        );
        assert_eq!(record.tax, dec("50.5"));
        assert_eq!(record.total, dec("555.5"));
    }

    #[test]
    fn test_sheet_without_header_reads_as_text() {
        let sheet = Worksheet::new(
            "Sheet1",
            vec![row(&["Invoice No: 55"]), row(&["Total", "12.00"])],
        );
        let result = TabularExtractor::new().extract(&sheet);
        assert_eq!(result.record.invoice_number.as_deref(), Some("55"));
        assert_eq!(result.record.total, dec("12.00"));
        assert!(result.warnings.iter().any(|w| w.subject == "line_items"));
    }

    #[test]
    fn test_extract_is_deterministic() {
        let extractor = TabularExtractor::new();
        let a = extractor.extract(&sample_sheet()).record;
        let b = extractor.extract(&sample_sheet()).record;
        assert_eq!(a, b);
    }
}
