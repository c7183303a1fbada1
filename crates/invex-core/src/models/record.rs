//! The structured record every processed invoice produces.

use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Header-level fields of an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvoiceField {
    InvoiceNumber,
    Date,
    Vendor,
    Subtotal,
    Tax,
    Total,
    Currency,
}

impl InvoiceField {
    /// All header fields in export order.
    pub const ALL: [InvoiceField; 7] = [
        InvoiceField::InvoiceNumber,
        InvoiceField::Date,
        InvoiceField::Vendor,
        InvoiceField::Subtotal,
        InvoiceField::Tax,
        InvoiceField::Total,
        InvoiceField::Currency,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            InvoiceField::InvoiceNumber => "invoice_number",
            InvoiceField::Date => "date",
            InvoiceField::Vendor => "vendor",
            InvoiceField::Subtotal => "subtotal",
            InvoiceField::Tax => "tax",
            InvoiceField::Total => "total",
            InvoiceField::Currency => "currency",
        }
    }
}

impl fmt::Display for InvoiceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One row of itemized charges.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub description: Option<String>,
    pub quantity: Option<Decimal>,
    pub unit_price: Option<Decimal>,
    pub amount: Option<Decimal>,
}

impl LineItem {
    pub fn is_empty(&self) -> bool {
        self.description.is_none()
            && self.quantity.is_none()
            && self.unit_price.is_none()
            && self.amount.is_none()
    }
}

/// Structured invoice data. Absent fields are `None`, never an error.
///
/// Serializes every field, with `null` for absent values, so records from
/// different files always share one shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedRecord {
    pub invoice_number: Option<String>,
    pub date: Option<NaiveDate>,
    pub vendor: Option<String>,
    pub subtotal: Option<Decimal>,
    pub tax: Option<Decimal>,
    pub total: Option<Decimal>,
    pub currency: Option<String>,
    #[serde(default)]
    pub line_items: Vec<LineItem>,
    /// Column headers of the item table, as printed on the document.
    #[serde(default)]
    pub headers: Vec<String>,
}

impl ExtractedRecord {
    /// A record with every field absent.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        InvoiceField::ALL.iter().all(|f| !self.has(*f)) && self.line_items.is_empty()
    }

    /// Whether a header field is present.
    pub fn has(&self, field: InvoiceField) -> bool {
        match field {
            InvoiceField::InvoiceNumber => self.invoice_number.is_some(),
            InvoiceField::Date => self.date.is_some(),
            InvoiceField::Vendor => self.vendor.is_some(),
            InvoiceField::Subtotal => self.subtotal.is_some(),
            InvoiceField::Tax => self.tax.is_some(),
            InvoiceField::Total => self.total.is_some(),
            InvoiceField::Currency => self.currency.is_some(),
        }
    }

    /// Display value of a header field; dates are ISO-8601.
    pub fn get(&self, field: InvoiceField) -> Option<String> {
        match field {
            InvoiceField::InvoiceNumber => self.invoice_number.clone(),
            InvoiceField::Date => self.date.map(|d| d.format("%Y-%m-%d").to_string()),
            InvoiceField::Vendor => self.vendor.clone(),
            InvoiceField::Subtotal => self.subtotal.map(|d| d.to_string()),
            InvoiceField::Tax => self.tax.map(|d| d.to_string()),
            InvoiceField::Total => self.total.map(|d| d.to_string()),
            InvoiceField::Currency => self.currency.clone(),
        }
    }

    /// Keys of the serialized record, in order.
    pub fn field_names() -> Vec<&'static str> {
        let mut names: Vec<&'static str> = InvoiceField::ALL.iter().map(|f| f.name()).collect();
        names.extend(["line_items", "headers"]);
        names
    }

    /// Header fields that are absent.
    pub fn missing_fields(&self) -> Vec<InvoiceField> {
        InvoiceField::ALL
            .into_iter()
            .filter(|f| !self.has(*f))
            .collect()
    }
}
