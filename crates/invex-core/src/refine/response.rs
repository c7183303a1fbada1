//! Decoding of the model's answer into a candidate record.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{ExtractionWarning, Stage};
use crate::invoice::rules::{parse_amount, parse_date, symbol_to_code};
use crate::models::record::{ExtractedRecord, LineItem};
use rust_decimal::Decimal;

/// Wire shape of a refinement response.
///
/// Scalars are kept as raw JSON so a number where a string was asked for,
/// or a stray object, is judged per field instead of failing the whole answer.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RefinedInvoice {
    pub invoice_number: Value,
    pub date: Value,
    pub vendor: Value,
    pub subtotal: Value,
    pub tax: Value,
    pub total: Value,
    pub currency: Value,
    pub line_items: Vec<RefinedLineItem>,
    pub headers: Vec<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RefinedLineItem {
    pub description: Value,
    pub quantity: Value,
    pub unit_price: Value,
    pub amount: Value,
}

impl RefinedInvoice {
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// Convert to a record. Malformed values become absent fields plus a warning.
    pub fn into_record(self, day_first: bool) -> (ExtractedRecord, Vec<ExtractionWarning>) {
        let mut warnings = Vec::new();
        let mut check = Checker {
            warnings: &mut warnings,
        };

        let record = ExtractedRecord {
            invoice_number: check.text("invoice_number", &self.invoice_number),
            date: check
                .text("date", &self.date)
                .and_then(|s| check.parsed("date", &s, |s| parse_date(s, day_first))),
            vendor: check.text("vendor", &self.vendor),
            subtotal: check.amount("subtotal", &self.subtotal),
            tax: check.amount("tax", &self.tax),
            total: check.amount("total", &self.total),
            currency: check
                .text("currency", &self.currency)
                .and_then(|s| check.parsed("currency", &s, normalize_currency)),
            line_items: self
                .line_items
                .iter()
                .enumerate()
                .map(|(i, item)| check.line_item(i, item))
                .filter(|item| !item.is_empty())
                .collect(),
            headers: self
                .headers
                .iter()
                .filter_map(|h| h.as_str())
                .map(|h| h.trim().to_string())
                .filter(|h| !h.is_empty())
                .collect(),
        };

        (record, warnings)
    }
}

struct Checker<'a> {
    warnings: &'a mut Vec<ExtractionWarning>,
}

impl Checker<'_> {
    fn malformed(&mut self, subject: &str, value: &Value) {
        self.warnings.push(ExtractionWarning::new(
            Stage::Refine,
            subject,
            format!("ignored malformed value {}", value),
        ));
    }

    /// Non-empty string, or a number written as text.
    fn text(&mut self, subject: &str, value: &Value) -> Option<String> {
        match value {
            Value::Null => None,
            Value::String(s) => {
                let s = s.trim();
                (!s.is_empty() && !s.eq_ignore_ascii_case("null")).then(|| s.to_string())
            }
            Value::Number(n) => Some(n.to_string()),
            other => {
                self.malformed(subject, other);
                None
            }
        }
    }

    fn parsed<T>(&mut self, subject: &str, s: &str, parse: impl Fn(&str) -> Option<T>) -> Option<T> {
        let parsed = parse(s);
        if parsed.is_none() {
            self.malformed(subject, &Value::String(s.to_string()));
        }
        parsed
    }

    fn amount(&mut self, subject: &str, value: &Value) -> Option<Decimal> {
        let s = self.text(subject, value)?;
        self.parsed(subject, &s, parse_amount)
    }

    fn line_item(&mut self, index: usize, item: &RefinedLineItem) -> LineItem {
        let subject = |field: &str| format!("line_items[{}].{}", index, field);
        LineItem {
            description: self.text(&subject("description"), &item.description),
            quantity: self.amount(&subject("quantity"), &item.quantity),
            unit_price: self.amount(&subject("unit_price"), &item.unit_price),
            amount: self.amount(&subject("amount"), &item.amount),
        }
    }
}

/// Three-letter code, or a symbol mapped to one.
fn normalize_currency(s: &str) -> Option<String> {
    if s.len() == 3 && s.chars().all(|c| c.is_ascii_alphabetic()) {
        return Some(s.to_ascii_uppercase());
    }
    symbol_to_code(s).map(str::to_string)
}
