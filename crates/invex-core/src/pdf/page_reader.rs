//! Per-page text with an OCR fallback for sparse pages.

use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;
use tracing::{debug, info, warn};

use super::rasterizer::PageRasterizer;
use super::reader::{encode_png, PdfReader};
use super::Result;
use crate::error::{ExtractionWarning, OcrError, PdfError, Stage};
use crate::models::config::PdfConfig;
use crate::models::document::{PageContent, RenderedPage, TextSource};
use crate::ocr::OcrEngine;

/// Pages of one document plus the problems met while reading them.
#[derive(Debug, Clone, Default)]
pub struct PageReadResult {
    pub pages: Vec<PageContent>,
    pub warnings: Vec<ExtractionWarning>,
}

/// Reads every page's embedded text, OCR'ing pages whose text is sparse.
///
/// A page whose rendering or OCR fails keeps whatever embedded text it had
/// (often none) and adds a warning; the other pages are unaffected.
#[derive(Clone)]
pub struct PageReader {
    config: PdfConfig,
    render_dpi: u32,
    rasterizer: Arc<dyn PageRasterizer>,
    ocr: Arc<dyn OcrEngine>,
}

/// Scratch directory holding the PDF for the rasterizer. Removed on drop.
struct Scratch {
    _dir: TempDir,
    root: PathBuf,
    pdf_path: PathBuf,
}

impl PageReader {
    pub fn new(config: PdfConfig, rasterizer: Arc<dyn PageRasterizer>, ocr: Arc<dyn OcrEngine>) -> Self {
        Self {
            render_dpi: config.render_dpi,
            config,
            rasterizer,
            ocr,
        }
    }

    pub async fn read(&self, pdf: &[u8]) -> Result<PageReadResult> {
        let data = pdf.to_vec();
        let (reader, texts) = tokio::task::spawn_blocking(move || -> Result<_> {
            let reader = PdfReader::load(&data)?;
            let texts = reader.page_texts();
            Ok((reader, texts))
        })
        .await
        .map_err(|e| PdfError::TextExtraction(e.to_string()))??;

        let mut result = PageReadResult::default();
        let texts = texts.unwrap_or_else(|e| {
            warn!("Embedded text unavailable: {}", e);
            result
                .warnings
                .push(ExtractionWarning::new(Stage::Read, "document", e.to_string()));
            Vec::new()
        });

        let mut page_count = reader.page_count();
        if self.config.max_pages > 0 {
            page_count = page_count.min(self.config.max_pages as u32);
        }
        info!("Reading {} pages", page_count);

        let mut scratch: Option<Scratch> = None;
        for number in 1..=page_count {
            let embedded = texts.get(number as usize - 1).cloned().unwrap_or_default();
            let embedded_len = visible_chars(&embedded);

            if embedded_len >= self.config.min_text_length {
                debug!("Page {}: {} characters of embedded text", number, embedded_len);
                result.pages.push(PageContent {
                    number,
                    text: embedded,
                    source: TextSource::Embedded,
                    image: None,
                });
                continue;
            }

            debug!("Page {} is sparse ({} characters), running OCR", number, embedded_len);
            let page = match self.ocr_page(&reader, number, &mut scratch).await {
                Ok((ocr_text, image)) => {
                    let (text, source) = pick_text(embedded, ocr_text);
                    PageContent {
                        number,
                        text,
                        source,
                        image: Some(image),
                    }
                }
                Err(e) => {
                    warn!("OCR failed on page {}: {}", number, e);
                    result.warnings.push(ExtractionWarning::new(
                        Stage::Read,
                        format!("page {}", number),
                        format!("OCR failed: {}", e),
                    ));
                    let (text, source) = pick_text(embedded, String::new());
                    PageContent {
                        number,
                        text,
                        source,
                        image: None,
                    }
                }
            };
            result.pages.push(page);
        }

        Ok(result)
    }

    async fn ocr_page(
        &self,
        reader: &PdfReader,
        page: u32,
        scratch: &mut Option<Scratch>,
    ) -> std::result::Result<(String, RenderedPage), OcrError> {
        let png = self.render_page(reader, page, scratch).await?;
        let text = self.ocr.recognize(&png).await?;

        let decoded = image::load_from_memory(&png)?;
        let image = RenderedPage {
            width: decoded.width(),
            height: decoded.height(),
            png,
        };
        Ok((text, image))
    }

    /// Rasterize the page, falling back to the largest image drawn on it.
    async fn render_page(
        &self,
        reader: &PdfReader,
        page: u32,
        scratch: &mut Option<Scratch>,
    ) -> std::result::Result<Vec<u8>, OcrError> {
        let scratch = match scratch {
            Some(s) => s,
            None => {
                let dir = TempDir::new()?;
                let root = dir.path().to_path_buf();
                let pdf_path = root.join("input.pdf");
                tokio::fs::write(&pdf_path, reader.raw_data()).await?;
                scratch.insert(Scratch {
                    _dir: dir,
                    root,
                    pdf_path,
                })
            }
        };

        match self
            .rasterizer
            .render(&scratch.pdf_path, page, self.render_dpi, &scratch.root)
            .await
        {
            Ok(png) => Ok(png),
            Err(e) => {
                debug!("Rasterizer failed on page {}: {}; trying embedded image", page, e);
                match reader.page_image(page) {
                    Ok(Some(img)) => Ok(encode_png(&img)?),
                    _ => Err(e),
                }
            }
        }
    }
}

/// Prefer OCR output unless the embedded text was longer.
fn pick_text(embedded: String, ocr: String) -> (String, TextSource) {
    let ocr_len = visible_chars(&ocr);
    let embedded_len = visible_chars(&embedded);
    if ocr_len > 0 && ocr_len >= embedded_len {
        (ocr, TextSource::Ocr)
    } else if embedded_len > 0 {
        (embedded, TextSource::Embedded)
    } else {
        (String::new(), TextSource::None)
    }
}

fn visible_chars(text: &str) -> usize {
    text.chars().filter(|c| !c.is_whitespace()).count()
}
