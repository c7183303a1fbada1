//! Invoice field extraction module.

mod parser;
pub mod rules;

pub use parser::{ExtractionResult, HeuristicParser, InvoiceParser};
pub(crate) use parser::missing_field_warnings;
