//! Input document and per-page content types.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::tabular::Worksheet;

/// Supported input formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Docx,
    Doc,
    Xlsx,
    Xls,
    Ods,
    Text,
}

impl DocumentFormat {
    /// Map a file extension (case-insensitive, without the dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "doc" => Some(Self::Doc),
            "xlsx" | "xlsm" => Some(Self::Xlsx),
            "xls" => Some(Self::Xls),
            "ods" => Some(Self::Ods),
            "txt" | "text" => Some(Self::Text),
            _ => None,
        }
    }

    /// Extension of the path, mapped.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Read directly as a worksheet, no PDF step.
    pub fn is_spreadsheet(&self) -> bool {
        matches!(self, Self::Xlsx | Self::Xls | Self::Ods)
    }

    /// Word-processing formats handled by the office converter.
    pub fn is_word(&self) -> bool {
        matches!(self, Self::Docx | Self::Doc)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Doc => "doc",
            Self::Xlsx => "xlsx",
            Self::Xls => "xls",
            Self::Ods => "ods",
            Self::Text => "txt",
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The normalized representation handed to extraction.
#[derive(Debug, Clone)]
pub enum NormalizedContent {
    /// PDF bytes, either the original file or a conversion result.
    Pdf(Vec<u8>),
    /// First non-empty worksheet of a spreadsheet.
    Worksheet(Worksheet),
}

/// An input file after normalization. Immutable once built.
#[derive(Debug, Clone)]
pub struct InvoiceDocument {
    pub path: PathBuf,
    pub format: DocumentFormat,
    pub content: NormalizedContent,
}

impl InvoiceDocument {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Where a page's text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TextSource {
    /// Text layer embedded in the PDF.
    Embedded,
    /// Optical recognition of the rendered page.
    Ocr,
    /// Nothing usable was found.
    None,
}

/// A page rendered to PNG.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Text (and optionally an image) of one page.
#[derive(Debug, Clone)]
pub struct PageContent {
    /// Page number (1-indexed).
    pub number: u32,
    pub text: String,
    pub source: TextSource,
    /// Set only for pages that went through OCR.
    pub image: Option<RenderedPage>,
}

impl PageContent {
    /// Join page texts in page order.
    pub fn join_text(pages: &[PageContent]) -> String {
        pages
            .iter()
            .map(|p| p.text.trim_end())
            .filter(|t| !t.trim().is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
