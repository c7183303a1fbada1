//! Rule-based invoice parser.

use std::time::Instant;

use tracing::{debug, info};

use crate::error::{ExtractionWarning, Stage};
use crate::models::config::ExtractionConfig;
use crate::models::record::{ExtractedRecord, InvoiceField};

use super::rules::{
    dates::extract_invoice_date, line_items::extract_line_items, AmountExtractor, AmountKind,
    CurrencyExtractor, ExtractionMatch, FieldExtractor, InvoiceNumberExtractor, VendorExtractor,
};

/// Result of invoice extraction.
#[derive(Debug, Clone, Default)]
pub struct ExtractionResult {
    /// Extracted fields. Absent fields are `None`.
    pub record: ExtractedRecord,
    /// Fields and rows that could not be located.
    pub warnings: Vec<ExtractionWarning>,
    /// Processing time in milliseconds.
    pub processing_time_ms: u64,
}

/// Trait for invoice parsing.
///
/// Parsing never fails: a field that cannot be found stays absent and
/// produces a warning.
pub trait InvoiceParser {
    /// Parse invoice fields from text.
    fn parse(&self, text: &str) -> ExtractionResult;
}

/// Heuristic parser built on the labeled patterns in [`rules`](super::rules).
#[derive(Debug, Clone)]
pub struct HeuristicParser {
    /// Minimum confidence for accepting a candidate.
    min_confidence: f32,
    /// Day-first reading of ambiguous numeric dates.
    day_first: bool,
    /// Leading lines searched for an unlabeled vendor name.
    vendor_scan_lines: usize,
}

impl HeuristicParser {
    /// Create a parser with default settings.
    pub fn new() -> Self {
        Self::from_config(&ExtractionConfig::default())
    }

    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self {
            min_confidence: config.min_confidence,
            day_first: config.day_first,
            vendor_scan_lines: config.vendor_scan_lines,
        }
    }

    /// Set minimum confidence threshold.
    pub fn with_min_confidence(mut self, confidence: f32) -> Self {
        self.min_confidence = confidence;
        self
    }

    pub fn with_day_first(mut self, day_first: bool) -> Self {
        self.day_first = day_first;
        self
    }

    pub fn with_vendor_scan_lines(mut self, lines: usize) -> Self {
        self.vendor_scan_lines = lines;
        self
    }

    /// First candidate at or above the confidence threshold.
    fn first_plausible<T>(&self, candidates: Vec<ExtractionMatch<T>>) -> Option<T> {
        candidates
            .into_iter()
            .find(|m| m.confidence >= self.min_confidence)
            .map(|m| {
                debug!("Accepted '{}' ({:.2})", m.source, m.confidence);
                m.value
            })
    }

    /// Header-level fields only: everything except line items.
    pub fn parse_header_fields(&self, text: &str) -> ExtractedRecord {
        let mut record = ExtractedRecord::empty();
        if text.trim().is_empty() {
            return record;
        }

        record.invoice_number = self.first_plausible(InvoiceNumberExtractor::new().extract_all(text));
        record.date = self.first_plausible(extract_invoice_date(text, self.day_first));
        record.vendor = self.first_plausible(
            VendorExtractor::new()
                .with_scan_lines(self.vendor_scan_lines)
                .extract_all(text),
        );
        record.subtotal = self.first_plausible(AmountExtractor::new(AmountKind::Subtotal).extract_all(text));
        record.tax = self.first_plausible(AmountExtractor::new(AmountKind::Tax).extract_all(text));
        record.total = self.first_plausible(AmountExtractor::new(AmountKind::Total).extract_all(text));
        record.currency = self.first_plausible(CurrencyExtractor::new().extract_all(text));

        record
    }
}

impl Default for HeuristicParser {
    fn default() -> Self {
        Self::new()
    }
}

impl InvoiceParser for HeuristicParser {
    fn parse(&self, text: &str) -> ExtractionResult {
        let start = Instant::now();
        info!("Parsing invoice from {} characters of text", text.len());

        let mut record = self.parse_header_fields(text);

        if let Some(table) = extract_line_items(text) {
            debug!(
                "Found item table with {} columns and {} rows",
                table.headers.len(),
                table.items.len()
            );
            record.headers = table.headers;
            record.line_items = table.items.into_iter().filter(|i| !i.is_empty()).collect();
        }

        let warnings = missing_field_warnings(&record);

        debug!(
            "Extracted {} of {} fields, {} line items",
            InvoiceField::ALL.len() - warnings.len(),
            InvoiceField::ALL.len(),
            record.line_items.len()
        );

        ExtractionResult {
            record,
            warnings,
            processing_time_ms: start.elapsed().as_millis() as u64,
        }
    }
}

/// One warning per absent header field.
pub(crate) fn missing_field_warnings(record: &ExtractedRecord) -> Vec<ExtractionWarning> {
    record
        .missing_fields()
        .into_iter()
        .map(|f| ExtractionWarning::new(Stage::Extract, f.name(), "not found"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn dec(s: &str) -> Option<Decimal> {
        Some(Decimal::from_str(s).unwrap())
    }

    #[test]
    fn test_parse_minimal_invoice() {
        let text = "Invoice #INV-1001\nDate: 2024-01-15\nThanks for your order\nTotal: $245.00";
        let result = HeuristicParser::new().parse(text);

        assert_eq!(result.record.invoice_number.as_deref(), Some("INV-1001"));
        assert_eq!(result.record.date, NaiveDate::from_ymd_opt(2024, 1, 15));
        assert_eq!(result.record.total, dec("245.00"));
        assert_eq!(result.record.currency.as_deref(), Some("USD"));
        assert!(result.record.line_items.is_empty());
        assert_eq!(result.record.get(InvoiceField::Total).as_deref(), Some("245.00"));
    }

    #[test]
    fn test_parse_full_invoice() {
        let text = "\
Northwind Traders Ltd
12 Harbour Road, Bristol

INVOICE
Invoice No: NW-2024-0042
Invoice Date: 03/04/2024
Due Date: 03/05/2024

Description          Qty    Unit Price    Amount
Oak desk               1        350.00    350.00
Office chair           2         85.50    171.00

Subtotal                                  521.00
VAT 20%                                   104.20
Total Due                             GBP 625.20
";
        let result = HeuristicParser::new().parse(text);
        let record = result.record;

        assert_eq!(record.vendor.as_deref(), Some("Northwind Traders Ltd"));
        assert_eq!(record.invoice_number.as_deref(), Some("NW-2024-0042"));
        assert_eq!(record.date, NaiveDate::from_ymd_opt(2024, 4, 3));
        assert_eq!(record.subtotal, dec("521.00"));
        assert_eq!(record.tax, dec("104.20"));
        assert_eq!(record.total, dec("625.20"));
        assert_eq!(record.currency.as_deref(), Some("GBP"));
        assert_eq!(record.headers, vec!["Description", "Qty", "Unit Price", "Amount"]);
        assert_eq!(record.line_items.len(), 2);
        assert_eq!(record.line_items[1].description.as_deref(), Some("Office chair"));
        assert_eq!(record.line_items[1].amount, dec("171.00"));
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_month_first_config() {
        let text = "Invoice Date: 03/04/2024";
        let parser = HeuristicParser::new().with_day_first(false);
        assert_eq!(parser.parse(text).record.date, NaiveDate::from_ymd_opt(2024, 3, 4));
    }

    #[test]
    fn test_empty_text_yields_empty_record() {
        let result = HeuristicParser::new().parse("   \n ");
        assert!(result.record.is_empty());
        assert_eq!(result.warnings.len(), 7);
        assert!(result.warnings.iter().all(|w| w.stage == Stage::Extract));
    }

    #[test]
    fn test_confidence_threshold() {
        // A bare reference number is only a 0.6 candidate
        let text = "Ref No: 7781";
        assert_eq!(
            HeuristicParser::new().parse(text).record.invoice_number.as_deref(),
            Some("7781")
        );
        let strict = HeuristicParser::new().with_min_confidence(0.9);
        assert_eq!(strict.parse(text).record.invoice_number, None);
    }

    #[test]
    fn test_parse_is_deterministic() {
        let text = "ACME Inc\nInvoice 77\nDate 1 March 2024\nItem Qty Price Amount\nBolt 10 0.50 5.00\nTotal 5.00";
        let parser = HeuristicParser::new();
        let first = serde_json::to_string(&parser.parse(text).record).unwrap();
        let second = serde_json::to_string(&parser.parse(text).record).unwrap();
        assert_eq!(first, second);
    }
}
