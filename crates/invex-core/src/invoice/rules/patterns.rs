//! Common regex patterns for invoice field extraction.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Amount token: 1,234.56 / 1.234,56 / 1 234,56 (nbsp) / 245 / 245.5
    pub static ref AMOUNT_TOKEN: Regex = Regex::new(
        r"\d{1,3}(?:[,.\u{00a0}']\d{3})+(?:[.,]\d{1,2})?|\d+(?:[.,]\d{1,2})?"
    ).unwrap();

    // Invoice number, labeled: "Invoice #INV-1001", "Invoice No.: 42", "Bill Number 7/24"
    pub static ref INVOICE_NUMBER: Regex = Regex::new(
        r"(?i)\b(?:invoice|inv|bill)\b\.?[ \t]*(?:no\b\.?|number\b|num\b\.?|nr\b\.?|id\b|#)?[ \t]*[:#.]?[ \t]*#?[ \t]*([A-Za-z0-9][A-Za-z0-9/\-_.]*)"
    ).unwrap();

    // Invoice number, bare token: "INV-2024-001", "INV/77"
    pub static ref INVOICE_NUMBER_STANDALONE: Regex = Regex::new(
        r"\b(INV[-/]?\d[A-Za-z0-9\-/]*)\b"
    ).unwrap();

    // Document reference used by some vendors in place of an invoice number
    pub static ref REFERENCE_NUMBER: Regex = Regex::new(
        r"(?i)\b(?:ref(?:erence)?|document|doc)\b\.?[ \t]*(?:no\b\.?|number\b|#)[ \t]*[:#]?[ \t]*([A-Za-z0-9][A-Za-z0-9/\-_.]*)"
    ).unwrap();

    // Dates
    pub static ref DATE_ISO: Regex = Regex::new(
        r"\b(\d{4})[-/.](\d{1,2})[-/.](\d{1,2})\b"
    ).unwrap();

    pub static ref DATE_NUMERIC: Regex = Regex::new(
        r"\b(\d{1,2})[-/.](\d{1,2})[-/.](\d{4}|\d{2})\b"
    ).unwrap();

    pub static ref DATE_DAY_MONTH_NAME: Regex = Regex::new(
        r"(?i)\b(\d{1,2})(?:st|nd|rd|th)?[ \t\-]+(?:of[ \t]+)?(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?,?[ \t\-]+(\d{4})\b"
    ).unwrap();

    pub static ref DATE_MONTH_NAME_DAY: Regex = Regex::new(
        r"(?i)\b(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?[ \t]+(\d{1,2})(?:st|nd|rd|th)?,?[ \t]+(\d{4})\b"
    ).unwrap();

    // Labeled dates; group 1 is the rest of the line
    pub static ref INVOICE_DATE_LABEL: Regex = Regex::new(
        r"(?im)\b(?:invoice|issue|issued|billing|bill|document)[ \t]+date\b[ \t]*[:\-]?(.*)$"
    ).unwrap();

    pub static ref DATE_LABEL: Regex = Regex::new(
        r"(?im)^[ \t]*(?:date|dated)\b[ \t]*[:\-]?(.*)$"
    ).unwrap();

    pub static ref NON_ISSUE_DATE_LINE: Regex = Regex::new(
        r"(?i)\b(?:due|expir\w*|delivery|ship(?:ped|ping)?|order|valid|period|service)\b"
    ).unwrap();

    // Totals; group 1 is what follows the label on the same line
    pub static ref TOTAL_STRONG: Regex = Regex::new(
        r"(?im)\b(?:grand[ \t]+total|total[ \t]+amount[ \t]+due|amount[ \t]+due|balance[ \t]+due|total[ \t]+due|invoice[ \t]+total|total[ \t]+payable|amount[ \t]+payable|total[ \t]+amount)\b(.*)$"
    ).unwrap();

    pub static ref TOTAL_PLAIN: Regex = Regex::new(
        r"(?im)\btotal\b(.*)$"
    ).unwrap();

    pub static ref SUBTOTAL: Regex = Regex::new(
        r"(?im)\b(?:sub[ \t\-]?total|net[ \t]+(?:total|amount)|total[ \t]+(?:net|before[ \t]+(?:tax|vat)|excl(?:uding|\.)?(?:[ \t]+(?:tax|vat))?))\b\.?(.*)$"
    ).unwrap();

    pub static ref TAX: Regex = Regex::new(
        r"(?im)\b(?:sales[ \t]+tax|tax[ \t]+amount|total[ \t]+tax|tax|vat|gst|hst|igst|cgst|sgst)\b(.*)$"
    ).unwrap();

    // Tax registration numbers are not tax amounts
    pub static ref TAX_ID: Regex = Regex::new(
        r"(?i)\b(?:tax|vat|gst|hst)[ \t]*(?:id|no\b\.?|number|reg\w*|#|in)\b"
    ).unwrap();

    // "Total incl. VAT" is a total, "Total excl. VAT" a subtotal
    pub static ref TAX_QUALIFIER: Regex = Regex::new(
        r"(?i)\b(?:incl(?:uding|\.)?|inc\.|after|with|excl(?:uding|\.)?|ex\.|before|plus)[ \t]+(?:tax|vat|gst)\b|\b(?:tax|vat|gst)[ \t]+(?:incl|excl)"
    ).unwrap();

    // Line-count style totals that are not money
    pub static ref NON_MONEY_TOTAL: Regex = Regex::new(
        r"(?i)\btotal[ \t]+(?:qty|quantity|items?|units|pages?|hours|weight)\b"
    ).unwrap();

    // Currency
    pub static ref CURRENCY_LABEL: Regex = Regex::new(
        r"(?i)\bcurrency\b[ \t]*[:\-]?[ \t]*([A-Za-z]{3})\b"
    ).unwrap();

    pub static ref CURRENCY_CODE: Regex = Regex::new(
        r"\b(USD|EUR|GBP|INR|CAD|AUD|NZD|JPY|CNY|CHF|SEK|NOK|DKK|PLN|CZK|SGD|HKD|ZAR|MXN|BRL|AED|SAR)\b"
    ).unwrap();

    pub static ref CURRENCY_SYMBOL: Regex = Regex::new(
        r"(US\$|C\$|CA\$|A\$|AU\$|NZ\$|\$|€|£|₹|¥|\bRs\.?)[ \t]*\d"
    ).unwrap();

    // Vendor
    pub static ref VENDOR_LABEL: Regex = Regex::new(
        r"(?im)^[ \t]*(?:vendor|supplier|seller|from|sold[ \t]+by|billed[ \t]+by|issued[ \t]+by|company|payee|merchant)[ \t]*[:\-][ \t]*(.*)$"
    ).unwrap();

    pub static ref COMPANY_SUFFIX: Regex = Regex::new(
        r"(?i)\b(?:inc|llc|l\.l\.c|ltd|limited|gmbh|corp|corporation|co|company|plc|s\.a|pvt|llp|ag|bv|pty|srl|sas)\b\.?"
    ).unwrap();

    // Lines that are never a vendor name
    pub static ref NOT_VENDOR: Regex = Regex::new(
        r"(?i)\b(?:invoice|bill[ \t]+to|ship[ \t]+to|sold[ \t]+to|date|page|tax|phone|tel|fax|email|e-mail|total|amount|due|customer|account|order|po\b|receipt|statement|quotation)\b|@|www\.|https?://"
    ).unwrap();

    // Line-item table boundaries: always the end of the table
    pub static ref TABLE_TERMINAL: Regex = Regex::new(
        r"(?i)^[ \t|]*(?:sub[ \t\-]?total|grand[ \t]+total|total|amount[ \t]+due|balance[ \t]+due|net[ \t]+(?:total|amount)|thank)\b"
    ).unwrap();

    // Summary labels that also start ordinary item descriptions
    // ("Shipping", "Tax preparation"); only a terminal on a summary-shaped line
    pub static ref SUMMARY_LABEL: Regex = Regex::new(
        r"(?i)^[ \t|]*(?:tax|vat|gst|shipping|freight|discount|balance)\b"
    ).unwrap();

    pub static ref COLUMN_GAP: Regex = Regex::new(
        r"[ \t]{2,}|\t"
    ).unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invoice_number_variants() {
        let caps = INVOICE_NUMBER.captures("Invoice #INV-1001").unwrap();
        assert_eq!(&caps[1], "INV-1001");

        let caps = INVOICE_NUMBER.captures("Invoice No.: 2024/17").unwrap();
        assert_eq!(&caps[1], "2024/17");

        let caps = INVOICE_NUMBER.captures("INVOICE NUMBER 55812").unwrap();
        assert_eq!(&caps[1], "55812");
    }

    #[test]
    fn test_tax_id_excluded() {
        assert!(TAX_ID.is_match("VAT No. GB123456789"));
        assert!(TAX_ID.is_match("Tax ID: 12-3456789"));
        assert!(!TAX_ID.is_match("Tax (10%): 22.50"));
    }

    #[test]
    fn test_terminal_lines() {
        assert!(TABLE_TERMINAL.is_match("Subtotal 220.00"));
        assert!(TABLE_TERMINAL.is_match("  TOTAL: $245.00"));
        assert!(!TABLE_TERMINAL.is_match("Widget total care kit  2  10.00  20.00"));
        assert!(!TABLE_TERMINAL.is_match("Shipping  1  45.00  45.00"));
        assert!(SUMMARY_LABEL.is_match("Shipping  1  45.00  45.00"));
        assert!(SUMMARY_LABEL.is_match("VAT 20%   20.00"));
    }
}
