//! Error types for the invex-core library.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// Pipeline stage an error or warning belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Normalize,
    Read,
    Extract,
    Refine,
    Export,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Normalize => "normalize",
            Stage::Read => "read",
            Stage::Extract => "extract",
            Stage::Refine => "refine",
            Stage::Export => "export",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main error type for the invex library.
///
/// Every variant is fatal for the file being processed and for nothing else:
/// the pipeline turns it into an empty record plus a failure note.
#[derive(Error, Debug)]
pub enum InvexError {
    /// Input path does not exist.
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Unrecognized extension, or content that contradicts it.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Word/text to PDF conversion failed.
    #[error("conversion failed: {0}")]
    Conversion(#[from] ConversionError),

    /// PDF processing error.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// OCR processing error.
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// Workbook could not be opened or has no usable sheet.
    #[error("spreadsheet error: {0}")]
    Spreadsheet(String),

    /// Serialization of the result failed.
    #[error("export error: {0}")]
    Export(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl InvexError {
    /// Stage that produced the error.
    pub fn stage(&self) -> Stage {
        match self {
            InvexError::NotFound(_)
            | InvexError::UnsupportedFormat(_)
            | InvexError::Conversion(_)
            | InvexError::Spreadsheet(_)
            | InvexError::Io(_)
            | InvexError::Config(_) => Stage::Normalize,
            InvexError::Pdf(_) | InvexError::Ocr(_) => Stage::Read,
            InvexError::Export(_) => Stage::Export,
        }
    }

    /// Whether the input itself could not be opened or understood.
    ///
    /// Front-ends use this to pick a non-zero exit status.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            InvexError::NotFound(_)
                | InvexError::UnsupportedFormat(_)
                | InvexError::Conversion(_)
                | InvexError::Spreadsheet(_)
                | InvexError::Pdf(PdfError::Parse(_) | PdfError::Encrypted | PdfError::NoPages)
        )
    }
}

/// Errors from the external document converter.
#[derive(Error, Debug)]
pub enum ConversionError {
    /// Converter binary is not installed.
    #[error("{tool} not found (install it or set its path in the configuration)")]
    ToolNotFound { tool: String },

    /// Converter exited unsuccessfully.
    #[error("{tool} failed with {status}: {stderr}")]
    Failed {
        tool: String,
        status: String,
        stderr: String,
    },

    /// Converter exceeded its deadline.
    #[error("{tool} timed out after {secs}s")]
    Timeout { tool: String, secs: u64 },

    /// Converter reported success but wrote nothing.
    #[error("{tool} produced no output")]
    MissingOutput { tool: String },

    /// In-process text rendering failed.
    #[error("failed to render text: {0}")]
    Render(String),

    /// I/O error around the conversion.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to PDF processing.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// Failed to extract text from PDF.
    #[error("failed to extract text: {0}")]
    TextExtraction(String),

    /// Failed to extract images from PDF.
    #[error("failed to extract images: {0}")]
    ImageExtraction(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,

    /// Invalid page number requested.
    #[error("invalid page number: {0}")]
    InvalidPage(u32),
}

/// Errors related to rasterization and OCR.
#[derive(Error, Debug)]
pub enum OcrError {
    /// External binary is not installed.
    #[error("{tool} not found (install it or set its path in the configuration)")]
    ToolNotFound { tool: String },

    /// External binary exited unsuccessfully.
    #[error("{tool} failed: {stderr}")]
    Failed { tool: String, stderr: String },

    /// External binary exceeded its deadline.
    #[error("{tool} timed out after {secs}s")]
    Timeout { tool: String, secs: u64 },

    /// No image could be produced for the page.
    #[error("could not render page {0}")]
    Render(u32),

    /// Image encoding failed.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A non-fatal problem noticed while processing one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractionWarning {
    pub stage: Stage,
    /// Field name, page label, or other thing the warning is about.
    pub subject: String,
    pub message: String,
}

impl ExtractionWarning {
    pub fn new(stage: Stage, subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            stage,
            subject: subject.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ExtractionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.stage, self.subject, self.message)
    }
}

/// Result type for the invex library.
pub type Result<T> = std::result::Result<T, InvexError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_of_errors() {
        assert_eq!(
            InvexError::UnsupportedFormat("x".into()).stage(),
            Stage::Normalize
        );
        assert_eq!(InvexError::Pdf(PdfError::NoPages).stage(), Stage::Read);
        assert_eq!(
            InvexError::Conversion(ConversionError::MissingOutput {
                tool: "libreoffice".into()
            })
            .stage(),
            Stage::Normalize
        );
    }

    #[test]
    fn test_input_errors() {
        assert!(InvexError::NotFound(PathBuf::from("a.pdf")).is_input_error());
        assert!(InvexError::Pdf(PdfError::Parse("bad".into())).is_input_error());
        assert!(!InvexError::Export("csv".into()).is_input_error());
        assert!(!InvexError::Pdf(PdfError::InvalidPage(3)).is_input_error());
    }

    #[test]
    fn test_warning_display() {
        let w = ExtractionWarning::new(Stage::Read, "page 2", "OCR failed");
        assert_eq!(w.to_string(), "[read] page 2: OCR failed");
    }
}
