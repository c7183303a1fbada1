//! Vendor (seller) name extraction.

use super::patterns::{COMPANY_SUFFIX, NOT_VENDOR, VENDOR_LABEL};
use super::{ExtractionMatch, FieldExtractor};

/// Vendor extractor.
///
/// A labeled "Vendor:/From:/Supplier:" line wins. Otherwise the first
/// name-like line near the top of the document is taken, with more trust
/// when it carries a company suffix.
pub struct VendorExtractor {
    scan_lines: usize,
}

impl VendorExtractor {
    pub fn new() -> Self {
        Self { scan_lines: 6 }
    }

    /// Number of leading non-empty lines searched for an unlabeled name.
    pub fn with_scan_lines(mut self, lines: usize) -> Self {
        self.scan_lines = lines;
        self
    }
}

impl Default for VendorExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for VendorExtractor {
    type Output = ExtractionMatch<String>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        self.extract_all(text).into_iter().next()
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        let mut results = Vec::new();

        for caps in VENDOR_LABEL.captures_iter(text) {
            let Some(full) = caps.get(0) else { continue };
            let inline = caps.get(1).map(|m| m.as_str().trim()).unwrap_or("");
            let value = if inline.is_empty() {
                text[full.end()..]
                    .lines()
                    .map(str::trim)
                    .find(|l| !l.is_empty())
                    .unwrap_or("")
            } else {
                inline
            };
            if let Some(name) = clean_name(value) {
                results.push(ExtractionMatch::new(name, 0.9, full.as_str()));
            }
        }

        let top = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .take(self.scan_lines);
        for line in top {
            if !looks_like_name(line) {
                continue;
            }
            if let Some(name) = clean_name(line) {
                let confidence = if COMPANY_SUFFIX.is_match(&name) { 0.75 } else { 0.55 };
                results.push(ExtractionMatch::new(name, confidence, line));
                break;
            }
        }

        results
    }
}

fn looks_like_name(line: &str) -> bool {
    let letters = line.chars().filter(|c| c.is_alphabetic()).count();
    let digits = line.chars().filter(|c| c.is_ascii_digit()).count();
    letters >= 2
        && digits * 2 < letters
        && !line.starts_with(|c: char| c.is_ascii_digit())
        && !NOT_VENDOR.is_match(line)
}

/// Trim a candidate to its first column and reject leftovers that are not names.
fn clean_name(value: &str) -> Option<String> {
    let first_column = value
        .split(['|', '\t'])
        .next()
        .unwrap_or("")
        .split("  ")
        .next()
        .unwrap_or("")
        .trim()
        .trim_matches(|c: char| c == ',' || c == ':' || c == '-');
    let letters = first_column.chars().filter(|c| c.is_alphabetic()).count();
    if letters < 2 || first_column.len() > 100 {
        return None;
    }
    Some(first_column.to_string())
}
