//! Spreadsheet invoices.
//!
//! Worksheets skip the PDF and OCR steps: cells are mapped to the record
//! through the item table's header row, and the regions above the header and
//! below the totals are read with the same patterns as page text.

mod extractor;
mod worksheet;

#[cfg(test)]
pub(crate) mod fixtures;

pub use extractor::TabularExtractor;
pub use worksheet::Worksheet;
