//! Optical character recognition for pages without a usable text layer.

mod tesseract;

pub use tesseract::TesseractEngine;

use async_trait::async_trait;

use crate::error::OcrError;

/// Recognizes text in a rendered page image.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Text found in a PNG image. An image without text yields an empty string.
    async fn recognize(&self, png: &[u8]) -> Result<String, OcrError>;

    /// Engine name for logs and messages.
    fn name(&self) -> &str;
}
