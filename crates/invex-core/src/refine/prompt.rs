//! Instruction text and response schema sent to the model.

use serde_json::{json, Value};

pub const EXTRACTION_PROMPT: &str = r#"You extract structured data from invoices.

Read the invoice content that follows (extracted text, and page images when present) and return:
- invoice_number, date, vendor, subtotal, tax, total and currency of the invoice
- every line item of the itemized table, in document order, with description, quantity, unit_price and amount
- headers: the column headers of the item table exactly as printed

RULES:
1. Copy values from the document. Never invent or compute a value that is not printed.
2. Use null for anything that is not present.
3. Dates as YYYY-MM-DD. Currency as an ISO 4217 code such as USD or EUR.
4. Amounts as plain numbers without currency symbols or thousands separators, e.g. 1234.50.
5. Include every item row, including rows that continue onto later pages."#;

/// Prompt for one document, with column headers found by the heuristic pass.
pub fn build_prompt(known_headers: &[String]) -> String {
    let mut prompt = String::from(EXTRACTION_PROMPT);
    if !known_headers.is_empty() {
        prompt.push_str("\n\nThe item table appears to use these column headers: ");
        prompt.push_str(&known_headers.join(", "));
        prompt.push_str(". Use the exact headers you see if they differ.");
    }
    prompt
}

/// Response schema in the Gemini OpenAPI-subset dialect.
pub fn response_schema() -> Value {
    let text = || json!({ "type": "STRING", "nullable": true });

    json!({
        "type": "OBJECT",
        "properties": {
            "invoice_number": text(),
            "date": text(),
            "vendor": text(),
            "subtotal": text(),
            "tax": text(),
            "total": text(),
            "currency": text(),
            "line_items": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "description": text(),
                        "quantity": text(),
                        "unit_price": text(),
                        "amount": text()
                    }
                }
            },
            "headers": {
                "type": "ARRAY",
                "items": { "type": "STRING" }
            }
        },
        "required": ["line_items"]
    })
}
