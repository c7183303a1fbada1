//! Date extraction.

use chrono::NaiveDate;

use super::patterns::{
    DATE_DAY_MONTH_NAME, DATE_ISO, DATE_LABEL, DATE_MONTH_NAME_DAY, DATE_NUMERIC,
    INVOICE_DATE_LABEL, NON_ISSUE_DATE_LINE,
};
use super::{ExtractionMatch, FieldExtractor};

/// Finds every date in a piece of text, in reading order.
pub struct DateExtractor {
    day_first: bool,
}

impl DateExtractor {
    pub fn new() -> Self {
        Self { day_first: true }
    }

    /// How to read ambiguous numeric dates such as 01/02/2024.
    pub fn with_day_first(mut self, day_first: bool) -> Self {
        self.day_first = day_first;
        self
    }
}

impl Default for DateExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for DateExtractor {
    type Output = ExtractionMatch<NaiveDate>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        self.extract_all(text).into_iter().next()
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        let mut results: Vec<Self::Output> = Vec::new();
        let mut taken: Vec<(usize, usize)> = Vec::new();

        let mut push = |date: NaiveDate, confidence: f32, m: regex::Match<'_>| {
            let overlaps = taken.iter().any(|&(s, e)| m.start() < e && s < m.end());
            if !overlaps {
                taken.push((m.start(), m.end()));
                results.push(
                    ExtractionMatch::new(date, confidence, m.as_str())
                        .with_position(m.start(), m.end()),
                );
            }
        };

        // YYYY-MM-DD first so 2024-01-15 is never read as 24-01-15
        for caps in DATE_ISO.captures_iter(text) {
            let (Ok(y), Ok(m), Ok(d)) = (caps[1].parse(), caps[2].parse(), caps[3].parse()) else {
                continue;
            };
            if let (Some(date), Some(full)) = (NaiveDate::from_ymd_opt(y, m, d), caps.get(0)) {
                push(date, 0.95, full);
            }
        }

        for caps in DATE_DAY_MONTH_NAME.captures_iter(text) {
            let (Ok(d), Some(m), Ok(y)) = (caps[1].parse(), month_number(&caps[2]), caps[3].parse())
            else {
                continue;
            };
            if let (Some(date), Some(full)) = (NaiveDate::from_ymd_opt(y, m, d), caps.get(0)) {
                push(date, 0.95, full);
            }
        }

        for caps in DATE_MONTH_NAME_DAY.captures_iter(text) {
            let (Some(m), Ok(d), Ok(y)) = (month_number(&caps[1]), caps[2].parse(), caps[3].parse())
            else {
                continue;
            };
            if let (Some(date), Some(full)) = (NaiveDate::from_ymd_opt(y, m, d), caps.get(0)) {
                push(date, 0.95, full);
            }
        }

        for caps in DATE_NUMERIC.captures_iter(text) {
            let (Ok(a), Ok(b)) = (caps[1].parse::<u32>(), caps[2].parse::<u32>()) else {
                continue;
            };
            let year = parse_year(&caps[3]);
            let Some(full) = caps.get(0) else { continue };
            if let Some((date, confidence)) = resolve_numeric(a, b, year, self.day_first) {
                push(date, confidence, full);
            }
        }

        results.sort_by_key(|r| r.position.map(|p| p.0).unwrap_or(usize::MAX));
        results
    }
}

/// Read `a/b/year` as day/month or month/day.
///
/// A component above 12 settles the order; otherwise `day_first` decides and
/// the guess gets a lower confidence.
fn resolve_numeric(a: u32, b: u32, year: i32, day_first: bool) -> Option<(NaiveDate, f32)> {
    if a > 12 {
        return NaiveDate::from_ymd_opt(year, b, a).map(|d| (d, 0.9));
    }
    if b > 12 {
        return NaiveDate::from_ymd_opt(year, a, b).map(|d| (d, 0.9));
    }
    let (day, month) = if day_first { (a, b) } else { (b, a) };
    NaiveDate::from_ymd_opt(year, month, day).map(|d| (d, 0.75))
}

/// The invoice's own date.
///
/// Tried in order: an "Invoice/Issue date" label, a line starting with
/// "Date", then the first date in the text that is not on a due, delivery
/// or order line. Labeled values may sit on the following line.
pub fn extract_invoice_date(text: &str, day_first: bool) -> Vec<ExtractionMatch<NaiveDate>> {
    let extractor = DateExtractor::new().with_day_first(day_first);
    let mut results = Vec::new();

    for (label, confidence) in [(&*INVOICE_DATE_LABEL, 0.95f32), (&*DATE_LABEL, 0.9)] {
        for caps in label.captures_iter(text) {
            let Some(full) = caps.get(0) else { continue };
            let rest = caps.get(1).map(|m| m.as_str()).unwrap_or("");

            let found = extractor.extract(rest).or_else(|| {
                if rest.trim().is_empty() {
                    next_non_empty_line(text, full.end()).and_then(|l| extractor.extract(l))
                } else {
                    None
                }
            });

            if let Some(date) = found {
                results.push(
                    ExtractionMatch::new(date.value, confidence.min(date.confidence + 0.1), full.as_str().trim())
                        .with_position(full.start(), full.end()),
                );
            }
        }
    }

    for date in extractor.extract_all(text) {
        let start = date.position.map(|p| p.0).unwrap_or(0);
        if !NON_ISSUE_DATE_LINE.is_match(line_before(text, start)) {
            results.push(ExtractionMatch { confidence: date.confidence * 0.7, ..date });
            break;
        }
    }

    results
}

fn next_non_empty_line(text: &str, offset: usize) -> Option<&str> {
    let after = &text[offset..];
    let after = &after[after.find('\n')? + 1..];
    after.lines().find(|l| !l.trim().is_empty())
}

/// Start of the line up to the byte offset.
fn line_before(text: &str, offset: usize) -> &str {
    let start = text[..offset].rfind('\n').map(|i| i + 1).unwrap_or(0);
    &text[start..offset]
}

/// Parse a single date string.
pub fn parse_date(s: &str, day_first: bool) -> Option<NaiveDate> {
    DateExtractor::new()
        .with_day_first(day_first)
        .extract(s)
        .map(|m| m.value)
}

fn parse_year(s: &str) -> i32 {
    let year: i32 = s.parse().unwrap_or(0);
    if s.len() <= 2 {
        // Two-digit year: 00-69 is 2000s, 70-99 is 1900s
        if year < 70 { 2000 + year } else { 1900 + year }
    } else {
        year
    }
}

fn month_number(name: &str) -> Option<u32> {
    let prefix: String = name.chars().take(3).collect::<String>().to_lowercase();
    let month = match prefix.as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}
