//! Rule-based field extractors.

pub mod amounts;
pub mod currency;
pub mod dates;
pub mod invoice_number;
pub mod line_items;
pub mod patterns;
pub mod vendor;

pub use amounts::{parse_amount, AmountExtractor, AmountKind};
pub use currency::{symbol_to_code, CurrencyExtractor};
pub use dates::{extract_invoice_date, parse_date, DateExtractor};
pub use invoice_number::InvoiceNumberExtractor;
pub use line_items::{classify_header, extract_line_items, ColumnRole, LineItemTable, TableHeader};
pub use vendor::VendorExtractor;

/// Trait for field extractors.
pub trait FieldExtractor {
    /// The type of value this extractor produces.
    type Output;

    /// Extract the field from text.
    fn extract(&self, text: &str) -> Option<Self::Output>;

    /// Extract all occurrences of the field, best candidate first.
    fn extract_all(&self, text: &str) -> Vec<Self::Output>;
}

/// A candidate value with its confidence.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionMatch<T> {
    /// Extracted value.
    pub value: T,
    /// Confidence score (0.0 - 1.0).
    pub confidence: f32,
    /// Byte span in the source text.
    pub position: Option<(usize, usize)>,
    /// Text that was matched.
    pub source: String,
}

impl<T> ExtractionMatch<T> {
    pub fn new(value: T, confidence: f32, source: impl Into<String>) -> Self {
        Self {
            value,
            confidence,
            position: None,
            source: source.into(),
        }
    }

    pub fn with_position(mut self, start: usize, end: usize) -> Self {
        self.position = Some((start, end));
        self
    }
}
