//! Line-item table detection in running text.
//!
//! A table starts at a header row naming a description column and numeric
//! columns (quantity, unit price, amount or their synonyms) and runs until a
//! terminal line such as "Subtotal" or "Total". Rows are split on `|`, tabs
//! or runs of spaces; when that does not line up with the header, numbers are
//! read from the right end of the row.

use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;

use super::amounts::parse_amount;
use super::patterns::{AMOUNT_TOKEN, COLUMN_GAP, SUMMARY_LABEL, TABLE_TERMINAL};
use crate::models::record::LineItem;

lazy_static! {
    // "Payment terms: 30 days" style lines end a table
    static ref LABEL_VALUE: Regex = Regex::new(r"^[ \t]*[A-Za-z][A-Za-z .]{1,30}:[ \t]").unwrap();
}

/// Meaning of a table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnRole {
    Description,
    Quantity,
    UnitPrice,
    Amount,
    /// Row numbers, codes, tax rates and anything else not exported.
    Other,
}

impl ColumnRole {
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Quantity | Self::UnitPrice | Self::Amount)
    }
}

const QUANTITY_WORDS: &[&str] = &[
    "qty", "qnty", "quantity", "quantities", "units", "hours", "hrs", "pcs", "nos", "count",
];
const AMOUNT_WORDS: &[&str] = &[
    "amount", "amt", "total", "subtotal", "linetotal", "value", "sum", "extended", "net",
];
const PRICE_WORDS: &[&str] = &["price", "rate", "cost", "mrp", "each", "fee", "tariff"];
const ID_WORDS: &[&str] = &[
    "no", "#", "code", "sku", "id", "hsn", "sac", "batch", "ref", "sl", "sr", "sno", "serial",
    "vat", "tax", "gst", "unit", "uom",
];
const DESCRIPTION_WORDS: &[&str] = &[
    "description", "desc", "item", "items", "product", "products", "service", "services",
    "particulars", "particular", "details", "detail", "article", "name", "goods", "activity",
];

/// Words that combine with the next header word into one column name.
const HEADER_PREFIXES: &[&str] = &["unit", "line", "per", "s", "sl", "sr"];

fn header_words(cell: &str) -> Vec<String> {
    cell.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '#'))
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

fn any_in(words: &[String], vocab: &[&str]) -> bool {
    words.iter().any(|w| vocab.contains(&w.as_str()))
}

/// Classify a header cell, tolerating case, punctuation and one-letter typos.
pub fn classify_header(cell: &str) -> Option<ColumnRole> {
    let words = header_words(cell);
    if words.is_empty() {
        return None;
    }

    if any_in(&words, QUANTITY_WORDS) {
        return Some(ColumnRole::Quantity);
    }
    if any_in(&words, AMOUNT_WORDS) {
        return Some(ColumnRole::Amount);
    }
    if any_in(&words, PRICE_WORDS) {
        return Some(ColumnRole::UnitPrice);
    }
    if any_in(&words, ID_WORDS) {
        return Some(ColumnRole::Other);
    }
    if any_in(&words, DESCRIPTION_WORDS) {
        return Some(ColumnRole::Description);
    }

    // OCR and typing slips: "Descripton", "Quantiy", "Amout"
    let vocabularies = [
        (QUANTITY_WORDS, ColumnRole::Quantity),
        (AMOUNT_WORDS, ColumnRole::Amount),
        (PRICE_WORDS, ColumnRole::UnitPrice),
        (DESCRIPTION_WORDS, ColumnRole::Description),
    ];
    for word in words.iter().filter(|w| w.chars().count() >= 5) {
        for (vocab, role) in vocabularies {
            let close = vocab
                .iter()
                .filter(|v| v.len() >= 5)
                .any(|v| edit_distance(word, v) <= 1);
            if close {
                return Some(role);
            }
        }
    }

    None
}

fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.iter().enumerate() {
        let mut row = vec![i + 1; b.len() + 1];
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            row[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(row[j] + 1);
        }
        prev = row;
    }
    prev[b.len()]
}

/// A detected table header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableHeader {
    /// Column names as printed.
    pub cells: Vec<String>,
    pub roles: Vec<ColumnRole>,
}

impl TableHeader {
    /// Build from already-split cells. Unknown cells become `Other`.
    pub fn from_cells(cells: Vec<String>) -> Option<Self> {
        let roles: Vec<ColumnRole> = cells
            .iter()
            .map(|c| classify_header(c).unwrap_or(ColumnRole::Other))
            .collect();
        let header = Self { cells, roles };
        header.is_plausible().then_some(header)
    }

    /// Build from a single-spaced line by grouping words into column names.
    fn from_words(line: &str) -> Option<Self> {
        let words: Vec<&str> = line.split_whitespace().collect();
        let mut cells: Vec<String> = Vec::new();
        let mut roles: Vec<ColumnRole> = Vec::new();
        let mut unknown = 0;

        let mut i = 0;
        while i < words.len() {
            if let Some(next) = words.get(i + 1) {
                let combined = format!("{} {}", words[i], next);
                if merges(words[i], next, &combined) {
                    roles.push(classify_header(&combined).unwrap_or(ColumnRole::Other));
                    cells.push(combined);
                    i += 2;
                    continue;
                }
            }

            match classify_header(words[i]) {
                Some(role) => {
                    cells.push(words[i].to_string());
                    roles.push(role);
                }
                None => {
                    // "(USD)" and similar belong to the previous column
                    unknown += 1;
                    match cells.last_mut() {
                        Some(last) => {
                            last.push(' ');
                            last.push_str(words[i]);
                        }
                        None => {
                            cells.push(words[i].to_string());
                            roles.push(ColumnRole::Other);
                        }
                    }
                }
            }
            i += 1;
        }

        if unknown * 3 > words.len() {
            return None;
        }
        let header = Self { cells, roles };
        header.is_plausible().then_some(header)
    }

    /// Detect a header in one text line.
    pub fn detect(line: &str) -> Option<Self> {
        if line.chars().any(|c| c.is_ascii_digit()) {
            return None;
        }
        let cells = split_columns(line);
        if cells.len() >= 2 {
            if let Some(header) = Self::from_cells(cells) {
                return Some(header);
            }
        }
        Self::from_words(line)
    }

    fn is_plausible(&self) -> bool {
        let has_description = self.roles.contains(&ColumnRole::Description);
        let mut numeric: Vec<ColumnRole> = self.roles.iter().copied().filter(|r| r.is_numeric()).collect();
        numeric.dedup();
        let distinct = [ColumnRole::Quantity, ColumnRole::UnitPrice, ColumnRole::Amount]
            .iter()
            .filter(|r| numeric.contains(r))
            .count();
        has_description && (distinct >= 2 || (distinct == 1 && self.roles.len() == 2))
    }

    fn numeric_roles(&self) -> Vec<ColumnRole> {
        self.roles.iter().copied().filter(|r| r.is_numeric()).collect()
    }
}

/// Whether a row starting with `label` ends the item table.
///
/// Total-style labels always do. Summary labels such as "Shipping" or "Tax"
/// only do on a row holding fewer numbers than the table has numeric
/// columns: "Shipping 1 45.00 45.00" is an item, "Shipping 45.00" is not.
pub fn ends_table(label: &str, numbers: usize, numeric_columns: usize) -> bool {
    TABLE_TERMINAL.is_match(label) || (SUMMARY_LABEL.is_match(label) && numbers < numeric_columns)
}

/// Numbers on a text row, percentages excluded.
fn count_numbers(line: &str) -> usize {
    line.split(|c: char| c.is_whitespace() || c == '|')
        .filter(|t| !t.is_empty() && !t.ends_with('%'))
        .filter(|t| numeric_value(t).is_some())
        .count()
}

fn merges(first: &str, second: &str, combined: &str) -> bool {
    let Some(role) = classify_header(combined) else {
        return false;
    };
    let first_lower = first.to_lowercase();
    if matches!(first_lower.as_str(), "total" | "net" | "gross") {
        return true;
    }
    let first_role = classify_header(first);
    Some(role) == classify_header(second)
        && (first_role.is_none()
            || first_role == Some(ColumnRole::Other)
            || first_role == Some(role)
            || HEADER_PREFIXES.contains(&first_lower.as_str()))
}

/// Split a row into cells on `|`, tabs, or runs of two or more spaces.
///
/// `|` and tab delimited rows keep blank cells so later values stay under
/// their own column. A run of spaces cannot mark a blank cell.
pub fn split_columns(line: &str) -> Vec<String> {
    let trimmed = line.trim();
    if trimmed.contains('|') {
        let inner = trimmed.strip_prefix('|').unwrap_or(trimmed);
        let inner = inner.strip_suffix('|').unwrap_or(inner);
        return inner.split('|').map(|c| c.trim().to_string()).collect();
    }
    if trimmed.contains('\t') {
        return trimmed.split('\t').map(|c| c.trim().to_string()).collect();
    }
    COLUMN_GAP
        .split(trimmed)
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect()
}

/// A numeric cell or token. Currency symbols and codes are ignored.
pub(crate) fn numeric_value(token: &str) -> Option<Decimal> {
    let stripped = token
        .trim()
        .trim_start_matches(['$', '€', '£', '₹', '¥'])
        .trim_end_matches(['$', '€', '£']);
    let stripped = stripped
        .strip_suffix("USD")
        .or_else(|| stripped.strip_suffix("EUR"))
        .unwrap_or(stripped)
        .trim();
    let m = AMOUNT_TOKEN.find(stripped)?;
    let core = stripped.trim_start_matches(['-', '(']).trim_end_matches(')');
    if m.as_str() != core {
        return None;
    }
    parse_amount(stripped)
}

fn is_currency_token(token: &str) -> bool {
    matches!(token, "$" | "€" | "£" | "₹" | "USD" | "EUR" | "GBP" | "INR" | "Rs" | "Rs.")
}

/// Map cells to a line item using column roles.
///
/// Returns `None` when no numeric column holds a number, which marks the
/// row as a wrapped description rather than an item.
pub fn item_from_cells(cells: &[String], roles: &[ColumnRole]) -> Option<LineItem> {
    let mut item = LineItem::default();
    let mut descriptions: Vec<&str> = Vec::new();

    for (cell, role) in cells.iter().zip(roles) {
        let cell = cell.trim();
        if cell.is_empty() {
            continue;
        }
        match role {
            ColumnRole::Description => descriptions.push(cell),
            ColumnRole::Quantity => item.quantity = item.quantity.or(numeric_value(cell)),
            ColumnRole::UnitPrice => item.unit_price = item.unit_price.or(numeric_value(cell)),
            ColumnRole::Amount => item.amount = item.amount.or(numeric_value(cell)),
            ColumnRole::Other => {}
        }
    }

    if item.quantity.is_none() && item.unit_price.is_none() && item.amount.is_none() {
        return None;
    }
    if !descriptions.is_empty() {
        item.description = Some(descriptions.join(" "));
    }
    Some(item)
}

enum Row {
    Item(LineItem),
    Continuation(String),
}

fn parse_row(line: &str, header: &TableHeader) -> Row {
    let cells = split_columns(line);
    if cells.len() >= 2 && cells.len() == header.roles.len() {
        return match item_from_cells(&cells, &header.roles) {
            Some(item) => Row::Item(item),
            None => Row::Continuation(
                cells.iter().filter(|c| !c.is_empty()).map(String::as_str).collect::<Vec<_>>().join(" "),
            ),
        };
    }

    // Read numbers off the right end of the row
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let mut numbers: Vec<Decimal> = Vec::new();
    let mut cut = tokens.len();
    while cut > 0 {
        let token = tokens[cut - 1];
        if token.ends_with('%') || is_currency_token(token) {
            cut -= 1;
            continue;
        }
        match numeric_value(token) {
            Some(value) => {
                numbers.push(value);
                cut -= 1;
            }
            None => break,
        }
    }
    numbers.reverse();

    let roles = header.numeric_roles();
    if numbers.is_empty() || roles.is_empty() {
        return Row::Continuation(line.trim().to_string());
    }

    // Surplus numbers on the left belong to the description ("Model 2000")
    let surplus = numbers.len().saturating_sub(roles.len());
    let mut description_tokens: Vec<&str> = tokens[..cut].to_vec();
    if surplus > 0 {
        let mut kept = 0;
        let mut idx = cut;
        while kept < surplus && idx < tokens.len() {
            let token = tokens[idx];
            if numeric_value(token).is_some() {
                kept += 1;
            }
            description_tokens.push(token);
            idx += 1;
        }
    }
    let numbers = &numbers[surplus..];

    if header.roles.first() == Some(&ColumnRole::Other) && description_tokens.len() > 1 {
        let first = description_tokens[0].trim_end_matches(['.', ')']);
        if first.chars().all(|c| c.is_ascii_digit()) {
            description_tokens.remove(0);
        }
    }

    let mut item = LineItem::default();
    let assigned = &roles[roles.len() - numbers.len()..];
    for (role, value) in assigned.iter().zip(numbers) {
        match role {
            ColumnRole::Quantity => item.quantity = Some(*value),
            ColumnRole::UnitPrice => item.unit_price = Some(*value),
            ColumnRole::Amount => item.amount = Some(*value),
            _ => {}
        }
    }
    let description = description_tokens.join(" ");
    if !description.is_empty() {
        item.description = Some(description);
    }
    Row::Item(item)
}

/// A table found in text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineItemTable {
    pub headers: Vec<String>,
    pub items: Vec<LineItem>,
}

/// Find the first item table in the text.
pub fn extract_line_items(text: &str) -> Option<LineItemTable> {
    let lines: Vec<&str> = text.lines().collect();
    let (start, header) = lines
        .iter()
        .enumerate()
        .find_map(|(i, l)| TableHeader::detect(l).map(|h| (i, h)))?;

    let mut table = LineItemTable {
        headers: header.cells.clone(),
        items: Vec::new(),
    };
    let numeric_columns = header.numeric_roles().len();
    let mut last_was_item = false;

    for line in &lines[start + 1..] {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            last_was_item = false;
            continue;
        }
        if ends_table(trimmed, count_numbers(trimmed), numeric_columns) || LABEL_VALUE.is_match(trimmed) {
            break;
        }
        if trimmed.chars().all(|c| matches!(c, '-' | '=' | '_' | '|' | '+' | ' ')) {
            continue;
        }

        match parse_row(trimmed, &header) {
            Row::Item(item) => {
                table.items.push(item);
                last_was_item = true;
            }
            Row::Continuation(extra) => {
                if !last_was_item {
                    continue;
                }
                if let Some(prev) = table.items.last_mut() {
                    prev.description = Some(match prev.description.take() {
                        Some(d) => format!("{} {}", d, extra),
                        None => extra,
                    });
                }
            }
        }
    }

    Some(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    fn dec(s: &str) -> Option<Decimal> {
        Some(Decimal::from_str(s).unwrap())
    }

    #[test]
    fn test_classify_header() {
        assert_eq!(classify_header("Description"), Some(ColumnRole::Description));
        assert_eq!(classify_header("QTY"), Some(ColumnRole::Quantity));
        assert_eq!(classify_header("Unit Price"), Some(ColumnRole::UnitPrice));
        assert_eq!(classify_header("Line Total"), Some(ColumnRole::Amount));
        assert_eq!(classify_header("S.No"), Some(ColumnRole::Other));
        assert_eq!(classify_header("Descripton"), Some(ColumnRole::Description));
        assert_eq!(classify_header("Remarks"), None);
    }

    #[test]
    fn test_detect_header_single_spaced() {
        let header = TableHeader::detect("Description Qty Unit Price Amount").unwrap();
        assert_eq!(header.cells, vec!["Description", "Qty", "Unit Price", "Amount"]);
        assert_eq!(
            header.roles,
            vec![
                ColumnRole::Description,
                ColumnRole::Quantity,
                ColumnRole::UnitPrice,
                ColumnRole::Amount
            ]
        );
    }

    #[test]
    fn test_not_a_header() {
        assert!(TableHeader::detect("Invoice #INV-1001").is_none());
        assert!(TableHeader::detect("Please pay the total amount within 30 days").is_none());
        assert!(TableHeader::detect("Thank you for your business").is_none());
    }

    #[test]
    fn test_aligned_table() {
        let text = "\
Acme Corp
Description      Qty   Unit Price   Amount
Widget A           2        10.00    20.00
Service B          1         5.50     5.50
Subtotal                             25.50
Total                                25.50";

        let table = extract_line_items(text).unwrap();
        assert_eq!(table.headers, vec!["Description", "Qty", "Unit Price", "Amount"]);
        assert_eq!(table.items.len(), 2);
        assert_eq!(table.items[0].description.as_deref(), Some("Widget A"));
        assert_eq!(table.items[0].quantity, dec("2"));
        assert_eq!(table.items[0].unit_price, dec("10.00"));
        assert_eq!(table.items[0].amount, dec("20.00"));
        assert_eq!(table.items[1].description.as_deref(), Some("Service B"));
    }

    #[test]
    fn test_single_spaced_rows_with_wrap() {
        let text = "\
Item Qty Rate Total
Blue widget 2 $10.00 $20.00
large size
Setup fee 1 15.00 15.00
Total 35.00";

        let table = extract_line_items(text).unwrap();
        assert_eq!(table.items.len(), 2);
        assert_eq!(table.items[0].description.as_deref(), Some("Blue widget large size"));
        assert_eq!(table.items[0].amount, dec("20.00"));
        assert_eq!(table.items[1].quantity, dec("1"));
    }

    #[test]
    fn test_pipe_table_with_row_numbers() {
        let text = "\
| # | Product | Qty | Price | Amount |
| 1 | Paper, A4 | 10 | 4.50 | 45.00 |
| 2 | Toner | 1 | 60.00 | 60.00 |
| Total | | | | 105.00 |";

        let table = extract_line_items(text).unwrap();
        assert_eq!(table.items.len(), 2);
        assert_eq!(table.items[0].description.as_deref(), Some("Paper, A4"));
        assert_eq!(table.items[1].unit_price, dec("60.00"));
    }

    #[test]
    fn test_blank_cells_keep_columns() {
        assert_eq!(split_columns("| a | | c |"), vec!["a", "", "c"]);
        assert_eq!(split_columns("a\t\tc"), vec!["a", "", "c"]);
        assert_eq!(split_columns("a    b"), vec!["a", "b"]);

        let text = "\
| Description | Qty | Price | Amount |
| Consulting | | 95.00 | 190.00 |
| Paper | 2 | 4.50 | 9.00 |";
        let table = extract_line_items(text).unwrap();
        assert_eq!(table.items.len(), 2);
        assert_eq!(table.items[0].quantity, None);
        assert_eq!(table.items[0].unit_price, dec("95.00"));
        assert_eq!(table.items[0].amount, dec("190.00"));

        let text = "Description\tQty\tPrice\tAmount\nStapler\t2\t\t6.00";
        let table = extract_line_items(text).unwrap();
        assert_eq!(table.items[0].quantity, dec("2"));
        assert_eq!(table.items[0].unit_price, None);
        assert_eq!(table.items[0].amount, dec("6.00"));
    }

    #[test]
    fn test_missing_numbers_align_right() {
        let text = "Description  Qty  Price  Amount\nConsulting hours 120.00";
        let table = extract_line_items(text).unwrap();
        assert_eq!(table.items[0].amount, dec("120.00"));
        assert_eq!(table.items[0].quantity, None);
        assert_eq!(table.items[0].description.as_deref(), Some("Consulting hours"));
    }

    #[test]
    fn test_no_table() {
        assert_eq!(extract_line_items("Invoice #1\nTotal: 5.00"), None);
    }

    #[test]
    fn test_items_starting_with_summary_words() {
        let text = "\
Description          Qty    Unit Price    Amount
Widget                 2        100.00    200.00
Shipping               1         45.00     45.00
Tax preparation        3         50.00    150.00
Shipping                                   12.00
Total                                     407.00";

        let table = extract_line_items(text).unwrap();
        let descriptions: Vec<_> = table.items.iter().map(|i| i.description.as_deref()).collect();
        assert_eq!(descriptions, vec![Some("Widget"), Some("Shipping"), Some("Tax preparation")]);
        assert_eq!(table.items[1].amount, dec("45.00"));
        assert_eq!(table.items[2].quantity, dec("3"));
    }

    #[test]
    fn test_summary_line_ends_table() {
        let text = "Description  Qty  Price  Amount\nBolt  10  0.50  5.00\nVAT 20%  1.00\nNuts  1  1.00  1.00";
        let table = extract_line_items(text).unwrap();
        assert_eq!(table.items.len(), 1);
        assert!(ends_table("Grand Total", 3, 3));
        assert!(!ends_table("Discount voucher", 3, 3));
    }

    #[test]
    fn test_table_stops_at_label_line() {
        let text = "Description Qty Amount\nBolts 4 2.00\nPayment terms: 30 days";
        let table = extract_line_items(text).unwrap();
        assert_eq!(table.items.len(), 1);
    }
}
