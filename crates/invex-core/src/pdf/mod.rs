//! PDF page reading.

mod page_reader;
mod rasterizer;
mod reader;

pub use page_reader::{PageReadResult, PageReader};
pub use rasterizer::{PageRasterizer, PopplerRasterizer};
pub use reader::PdfReader;
pub(crate) use reader::encode_png;

use crate::error::PdfError;

/// Result type for PDF operations.
pub type Result<T> = std::result::Result<T, PdfError>;
