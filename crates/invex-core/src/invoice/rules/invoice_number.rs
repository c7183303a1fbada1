//! Invoice number extraction.

use super::patterns::{INVOICE_NUMBER, INVOICE_NUMBER_STANDALONE, REFERENCE_NUMBER};
use super::{ExtractionMatch, FieldExtractor};

/// Invoice number extractor.
pub struct InvoiceNumberExtractor;

impl InvoiceNumberExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for InvoiceNumberExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for InvoiceNumberExtractor {
    type Output = ExtractionMatch<String>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        self.extract_all(text).into_iter().next()
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        let mut results = Vec::new();

        let rules = [
            (&*INVOICE_NUMBER, 0.95f32),
            (&*INVOICE_NUMBER_STANDALONE, 0.7),
            (&*REFERENCE_NUMBER, 0.6),
        ];

        for (pattern, confidence) in rules {
            for caps in pattern.captures_iter(text) {
                let (Some(full), Some(value)) = (caps.get(0), caps.get(1)) else {
                    continue;
                };
                let candidate = clean_number(value.as_str());
                // "Invoice Date", "Invoice To" and similar labels are not numbers
                if !candidate.chars().any(|c| c.is_ascii_digit()) {
                    continue;
                }
                results.push(
                    ExtractionMatch::new(candidate, confidence, full.as_str())
                        .with_position(full.start(), full.end()),
                );
            }
        }

        results
    }
}

fn clean_number(s: &str) -> String {
    s.trim()
        .trim_end_matches(['.', '-', '/', '_'])
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first(text: &str) -> Option<String> {
        InvoiceNumberExtractor::new().extract(text).map(|m| m.value)
    }

    #[test]
    fn test_labeled_numbers() {
        assert_eq!(first("Invoice #INV-1001"), Some("INV-1001".to_string()));
        assert_eq!(first("Invoice No. 2024/17."), Some("2024/17".to_string()));
        assert_eq!(first("TAX INVOICE\nInvoice Number: 000451"), Some("000451".to_string()));
    }

    #[test]
    fn test_skips_label_words() {
        let text = "Invoice Date: 2024-01-15\nInvoice To: Acme\nInv # A-77";
        assert_eq!(first(text), Some("A-77".to_string()));
    }

    #[test]
    fn test_standalone_and_reference() {
        assert_eq!(first("Our ref INV2024-88 applies"), Some("INV2024-88".to_string()));
        assert_eq!(first("Reference No: R-5512"), Some("R-5512".to_string()));
        assert_eq!(first("Nothing to see"), None);
    }
}
