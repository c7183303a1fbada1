//! Core library for invoice extraction.
//!
//! This crate provides:
//! - Format normalization (PDF pass-through, Word/text to PDF, spreadsheets)
//! - Per-page text reading with an OCR fallback for sparse pages
//! - Rule-based field extraction (invoice number, dates, totals, line items)
//! - Worksheet extraction for spreadsheet invoices
//! - Optional refinement through a remote structured-output model
//! - Flattening to rows and CSV/JSON export

pub mod error;
pub mod export;
pub mod invoice;
pub mod models;
pub mod normalize;
pub mod ocr;
pub mod pdf;
pub mod pipeline;
pub mod refine;
pub mod tabular;
mod tool;

pub use error::{ExtractionWarning, InvexError, Result, Stage};
pub use export::{ExportColumn, ExportResult, ExportRow};
pub use invoice::{ExtractionResult, HeuristicParser, InvoiceParser};
pub use models::config::{InvexConfig, LlmProvider, PipelineOptions};
pub use models::document::{DocumentFormat, InvoiceDocument, NormalizedContent, PageContent};
pub use models::record::{ExtractedRecord, InvoiceField, LineItem};
pub use pipeline::{InvoicePipeline, ProcessOutcome};
pub use refine::{MergePolicy, RefinementStatus, RefinementUnavailable, Refiner};
pub use tabular::{TabularExtractor, Worksheet};
