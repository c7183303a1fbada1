//! Amount extraction: totals, subtotal and tax.

use rust_decimal::Decimal;
use std::str::FromStr;

use regex::Regex;

use super::patterns::{
    AMOUNT_TOKEN, NON_MONEY_TOTAL, SUBTOTAL, TAX, TAX_ID, TAX_QUALIFIER, TOTAL_PLAIN,
    TOTAL_STRONG,
};
use super::{ExtractionMatch, FieldExtractor};

/// Which labeled amount to look for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountKind {
    Total,
    Subtotal,
    Tax,
}

/// Labeled amount extractor.
pub struct AmountExtractor {
    kind: AmountKind,
}

impl AmountExtractor {
    pub fn new(kind: AmountKind) -> Self {
        Self { kind }
    }

    /// Rules for this kind, in priority order, with their confidence.
    fn rules(&self) -> Vec<(&'static Regex, f32)> {
        match self.kind {
            AmountKind::Total => vec![(&*TOTAL_STRONG, 0.95), (&*TOTAL_PLAIN, 0.8)],
            AmountKind::Subtotal => vec![(&*SUBTOTAL, 0.9)],
            AmountKind::Tax => vec![(&*TAX, 0.85)],
        }
    }

    /// Whether a line labeled for this kind actually belongs to another one.
    fn excluded(&self, line: &str) -> bool {
        match self.kind {
            AmountKind::Total => {
                SUBTOTAL.is_match(line)
                    || NON_MONEY_TOTAL.is_match(line)
                    || (TAX.is_match(line) && !TAX_QUALIFIER.is_match(line))
            }
            AmountKind::Subtotal => false,
            AmountKind::Tax => {
                TAX_ID.is_match(line)
                    || TAX_QUALIFIER.is_match(line)
                    || SUBTOTAL.is_match(line)
                    // "Tax preparation  3  50.00  150.00" is an item row
                    || amounts_in(line).len() >= 3
            }
        }
    }
}

impl FieldExtractor for AmountExtractor {
    type Output = ExtractionMatch<Decimal>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        self.extract_all(text).into_iter().next()
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        let mut results = Vec::new();

        for (pattern, confidence) in self.rules() {
            for caps in pattern.captures_iter(text) {
                let Some(full) = caps.get(0) else { continue };
                let line = line_around(text, full.start());
                if self.excluded(line) {
                    continue;
                }

                let rest = caps.get(1).map(|m| m.as_str()).unwrap_or("");
                let found = last_amount(rest)
                    .map(|a| (a, confidence))
                    .or_else(|| {
                        // "Total" alone on its line, amount on the next one
                        if has_letters(rest) {
                            return None;
                        }
                        next_line_amount(text, full.end()).map(|a| (a, confidence - 0.1))
                    });

                if let Some((amount, conf)) = found {
                    results.push(
                        ExtractionMatch::new(amount, conf, line.trim())
                            .with_position(full.start(), full.end()),
                    );
                }
            }
        }

        results
    }
}

/// Full line containing the byte offset.
fn line_around(text: &str, offset: usize) -> &str {
    let start = text[..offset].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let end = text[offset..].find('\n').map(|i| offset + i).unwrap_or(text.len());
    &text[start..end]
}

fn has_letters(s: &str) -> bool {
    s.chars().any(|c| c.is_alphabetic())
}

/// Last amount on a line that is not a percentage.
pub fn last_amount(s: &str) -> Option<Decimal> {
    amounts_in(s).into_iter().last()
}

/// All non-percentage amounts in a string, in order.
pub fn amounts_in(s: &str) -> Vec<Decimal> {
    AMOUNT_TOKEN
        .find_iter(s)
        .filter(|m| !s[m.end()..].trim_start().starts_with('%'))
        .filter_map(|m| {
            let negative = is_negative(&s[..m.start()]);
            parse_amount(m.as_str()).map(|v| if negative { -v } else { v })
        })
        .collect()
}

/// Whether the text right before an amount makes it negative.
///
/// The sign has to touch the number or its currency symbol: "-245.00" and
/// "-$245.00" are negative, "Total - 245.00" and "INV-1001" are not.
fn is_negative(before: &str) -> bool {
    let before = before.trim_end_matches(['$', '€', '£', '₹', '¥']);
    if before.ends_with('(') {
        return true;
    }
    before
        .strip_suffix('-')
        .is_some_and(|rest| !rest.ends_with(|c: char| c.is_alphanumeric()))
}

/// The next non-empty line, when it holds nothing but an amount.
fn next_line_amount(text: &str, offset: usize) -> Option<Decimal> {
    let after = &text[offset..];
    let after = &after[after.find('\n')? + 1..];
    let line = after.lines().find(|l| !l.trim().is_empty())?;
    if has_letters(&strip_currency(line)) {
        return None;
    }
    last_amount(line)
}

fn strip_currency(s: &str) -> String {
    let mut out = s.to_string();
    for token in ["US$", "USD", "EUR", "GBP", "INR", "CAD", "AUD", "Rs.", "Rs"] {
        out = out.replace(token, "");
    }
    out
}

/// Parse a formatted amount ("$1,234.56", "1.234,56", "1 234,56", "(12.00)").
///
/// When both separators appear the later one is the decimal point. A lone
/// comma followed by exactly three digits is a thousands separator.
pub fn parse_amount(s: &str) -> Option<Decimal> {
    let trimmed = s.trim();
    let negative = trimmed.starts_with('-') || (trimmed.starts_with('(') && trimmed.ends_with(')'));

    let cleaned: String = trimmed
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .collect();
    let cleaned = cleaned.trim_matches(|c| c == ',' || c == '.');
    if cleaned.is_empty() {
        return None;
    }

    let commas = cleaned.matches(',').count();
    let dots = cleaned.matches('.').count();

    let normalized = match (commas, dots) {
        (0, 0) => cleaned.to_string(),
        (_, 0) => {
            let tail = cleaned.rsplit(',').next().unwrap_or("");
            if commas == 1 && tail.len() != 3 {
                cleaned.replace(',', ".")
            } else {
                cleaned.replace(',', "")
            }
        }
        (0, _) => {
            if dots > 1 {
                cleaned.replace('.', "")
            } else {
                cleaned.to_string()
            }
        }
        _ => {
            let comma_pos = cleaned.rfind(',');
            let dot_pos = cleaned.rfind('.');
            if comma_pos > dot_pos {
                cleaned.replace('.', "").replace(',', ".")
            } else {
                cleaned.replace(',', "")
            }
        }
    };

    let value = Decimal::from_str(&normalized).ok()?;
    Some(if negative { -value } else { value })
}
