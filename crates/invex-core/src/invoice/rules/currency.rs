//! Currency detection.

use super::patterns::{CURRENCY_CODE, CURRENCY_LABEL, CURRENCY_SYMBOL};
use super::{ExtractionMatch, FieldExtractor};

/// Currency extractor producing ISO 4217 codes.
pub struct CurrencyExtractor;

impl CurrencyExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CurrencyExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for CurrencyExtractor {
    type Output = ExtractionMatch<String>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        self.extract_all(text).into_iter().next()
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        let mut results = Vec::new();

        for caps in CURRENCY_LABEL.captures_iter(text) {
            let code = caps[1].to_uppercase();
            if CURRENCY_CODE.is_match(&code) {
                results.push(ExtractionMatch::new(code, 0.95, &caps[0]));
            }
        }

        for caps in CURRENCY_CODE.captures_iter(text) {
            results.push(ExtractionMatch::new(caps[1].to_string(), 0.9, &caps[0]));
        }

        for caps in CURRENCY_SYMBOL.captures_iter(text) {
            if let Some(code) = symbol_to_code(&caps[1]) {
                results.push(ExtractionMatch::new(code.to_string(), 0.7, &caps[0]));
            }
        }

        results
    }
}

/// Map a currency symbol to its most likely code.
pub fn symbol_to_code(symbol: &str) -> Option<&'static str> {
    let code = match symbol.trim_end_matches('.') {
        "$" | "US$" => "USD",
        "C$" | "CA$" => "CAD",
        "A$" | "AU$" => "AUD",
        "NZ$" => "NZD",
        "€" => "EUR",
        "£" => "GBP",
        "₹" | "Rs" => "INR",
        "¥" => "JPY",
        _ => return None,
    };
    Some(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first(text: &str) -> Option<String> {
        CurrencyExtractor::new().extract(text).map(|m| m.value)
    }

    #[test]
    fn test_symbol() {
        assert_eq!(first("Total: $245.00"), Some("USD".to_string()));
        assert_eq!(first("Total: €12,50"), Some("EUR".to_string()));
        assert_eq!(first("Amount Rs. 500"), Some("INR".to_string()));
    }

    #[test]
    fn test_code_beats_symbol() {
        assert_eq!(first("Total: $245.00 CAD"), Some("CAD".to_string()));
    }

    #[test]
    fn test_label_beats_code() {
        assert_eq!(first("Prices in USD\nCurrency: gbp"), Some("GBP".to_string()));
    }

    #[test]
    fn test_none() {
        assert_eq!(first("Total: 245.00"), None);
    }
}
