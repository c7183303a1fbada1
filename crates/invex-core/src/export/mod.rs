//! Flattening records to rows and serializing them.

mod table;

use serde::Serialize;
use tracing::debug;

use crate::error::{InvexError, Result};
use crate::models::record::{ExtractedRecord, InvoiceField, LineItem};

pub use table::render_table;

/// Columns of the exported table, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportColumn {
    InvoiceNumber,
    Date,
    Vendor,
    Description,
    Quantity,
    UnitPrice,
    Amount,
    Subtotal,
    Tax,
    Total,
    Currency,
}

impl ExportColumn {
    pub const ALL: [ExportColumn; 11] = [
        ExportColumn::InvoiceNumber,
        ExportColumn::Date,
        ExportColumn::Vendor,
        ExportColumn::Description,
        ExportColumn::Quantity,
        ExportColumn::UnitPrice,
        ExportColumn::Amount,
        ExportColumn::Subtotal,
        ExportColumn::Tax,
        ExportColumn::Total,
        ExportColumn::Currency,
    ];

    /// CSV header name.
    pub fn name(&self) -> &'static str {
        match self {
            ExportColumn::InvoiceNumber => "invoice_number",
            ExportColumn::Date => "date",
            ExportColumn::Vendor => "vendor",
            ExportColumn::Description => "description",
            ExportColumn::Quantity => "quantity",
            ExportColumn::UnitPrice => "unit_price",
            ExportColumn::Amount => "amount",
            ExportColumn::Subtotal => "subtotal",
            ExportColumn::Tax => "tax",
            ExportColumn::Total => "total",
            ExportColumn::Currency => "currency",
        }
    }

    /// Header field shown in this column, if it is not a line-item column.
    fn header_field(&self) -> Option<InvoiceField> {
        match self {
            ExportColumn::InvoiceNumber => Some(InvoiceField::InvoiceNumber),
            ExportColumn::Date => Some(InvoiceField::Date),
            ExportColumn::Vendor => Some(InvoiceField::Vendor),
            ExportColumn::Subtotal => Some(InvoiceField::Subtotal),
            ExportColumn::Tax => Some(InvoiceField::Tax),
            ExportColumn::Total => Some(InvoiceField::Total),
            ExportColumn::Currency => Some(InvoiceField::Currency),
            _ => None,
        }
    }

    fn item_value(&self, item: &LineItem) -> Option<String> {
        match self {
            ExportColumn::Description => item.description.clone(),
            ExportColumn::Quantity => item.quantity.map(|d| d.to_string()),
            ExportColumn::UnitPrice => item.unit_price.map(|d| d.to_string()),
            ExportColumn::Amount => item.amount.map(|d| d.to_string()),
            _ => None,
        }
    }

    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(|c| c.name()).collect()
    }
}

/// One flattened row. Always holds a value per column; absent values are empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportRow {
    values: Vec<String>,
}

impl ExportRow {
    fn build(record: &ExtractedRecord, item: Option<&LineItem>) -> Self {
        let values = ExportColumn::ALL
            .iter()
            .map(|col| match col.header_field() {
                Some(field) => record.get(field),
                None => item.and_then(|i| col.item_value(i)),
            })
            .map(Option::unwrap_or_default)
            .collect();
        Self { values }
    }

    pub fn get(&self, column: ExportColumn) -> &str {
        ExportColumn::ALL
            .iter()
            .position(|c| *c == column)
            .and_then(|i| self.values.get(i))
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }
}

/// Rows of a record: one per line item, or a single summary row.
pub fn flatten(record: &ExtractedRecord) -> Vec<ExportRow> {
    if record.line_items.is_empty() {
        vec![ExportRow::build(record, None)]
    } else {
        record
            .line_items
            .iter()
            .map(|item| ExportRow::build(record, Some(item)))
            .collect()
    }
}

/// Tabular and serialized forms of one or more records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportResult {
    pub rows: Vec<ExportRow>,
    pub csv: String,
    /// Object for a single record, array for several.
    pub json: Option<String>,
}

impl ExportResult {
    pub fn from_record(record: &ExtractedRecord, include_json: bool) -> Result<Self> {
        let rows = flatten(record);
        let csv = write_csv(&rows)?;
        let json = if include_json {
            Some(serde_json::to_string_pretty(record).map_err(|e| InvexError::Export(e.to_string()))?)
        } else {
            None
        };
        Ok(Self { rows, csv, json })
    }

    /// Aligned rows from many records, as in a batch summary.
    pub fn from_records(records: &[ExtractedRecord], include_json: bool) -> Result<Self> {
        let rows: Vec<ExportRow> = records.iter().flat_map(flatten).collect();
        let csv = write_csv(&rows)?;
        let json = if include_json {
            Some(serde_json::to_string_pretty(records).map_err(|e| InvexError::Export(e.to_string()))?)
        } else {
            None
        };
        debug!("Exported {} records as {} rows", records.len(), rows.len());
        Ok(Self { rows, csv, json })
    }

    /// Plain-text table for the console.
    pub fn table(&self) -> String {
        render_table(&self.rows)
    }
}

/// CSV text with a header row.
pub fn write_csv(rows: &[ExportRow]) -> Result<String> {
    let export_err = |e: &dyn std::fmt::Display| InvexError::Export(e.to_string());

    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(ExportColumn::names()).map_err(|e| export_err(&e))?;
    for row in rows {
        wtr.write_record(row.values()).map_err(|e| export_err(&e))?;
    }

    let bytes = wtr.into_inner().map_err(|e| export_err(&e))?;
    String::from_utf8(bytes).map_err(|e| export_err(&e))
}
