//! Format normalization.
//!
//! Every input becomes either PDF bytes or a worksheet:
//! - PDF: passed through unchanged
//! - Word (doc, docx): converted by an external office suite
//! - Text: rendered in-process
//! - Spreadsheets (xlsx, xls, ods): loaded as a worksheet, no PDF step

mod converter;
mod detect;
mod text_pdf;

pub use converter::{DocumentConverter, OfficeConverter};
pub use text_pdf::TextPdfWriter;

use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;
use tracing::{debug, info};

use crate::error::{ConversionError, InvexError, Result};
use crate::models::config::ConverterConfig;
use crate::models::document::{DocumentFormat, InvoiceDocument, NormalizedContent};
use crate::tabular::Worksheet;

/// Turns an input file into an [`InvoiceDocument`].
#[derive(Clone)]
pub struct FormatNormalizer {
    converter: Arc<dyn DocumentConverter>,
    text_writer: TextPdfWriter,
}

impl FormatNormalizer {
    pub fn new(converter: Arc<dyn DocumentConverter>, text_writer: TextPdfWriter) -> Self {
        Self {
            converter,
            text_writer,
        }
    }

    /// LibreOffice conversion and the configured text layout.
    pub fn from_config(config: &ConverterConfig) -> Self {
        Self::new(
            Arc::new(OfficeConverter::from_config(config)),
            TextPdfWriter::from_config(config),
        )
    }

    pub async fn normalize(&self, path: &Path) -> Result<InvoiceDocument> {
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Err(InvexError::NotFound(path.to_path_buf()));
        }

        let bytes = tokio::fs::read(path).await?;
        let format = DocumentFormat::detect(path, &bytes)?;
        info!("Normalizing {} as {}", path.display(), format);

        let content = match format {
            DocumentFormat::Pdf => NormalizedContent::Pdf(bytes),
            DocumentFormat::Text => {
                let text = detect::decode_text(&bytes);
                NormalizedContent::Pdf(self.text_writer.render(&text)?)
            }
            DocumentFormat::Docx | DocumentFormat::Doc => {
                NormalizedContent::Pdf(self.convert(path).await?)
            }
            DocumentFormat::Xlsx | DocumentFormat::Xls | DocumentFormat::Ods => {
                let owned = path.to_path_buf();
                let sheet = tokio::task::spawn_blocking(move || Worksheet::load(&owned))
                    .await
                    .map_err(|e| InvexError::Spreadsheet(e.to_string()))??;
                NormalizedContent::Worksheet(sheet)
            }
        };

        Ok(InvoiceDocument {
            path: path.to_path_buf(),
            format,
            content,
        })
    }

    /// Run the converter in a scratch directory removed on every exit path.
    async fn convert(&self, path: &Path) -> Result<Vec<u8>> {
        let workdir = TempDir::new().map_err(ConversionError::Io)?;
        let pdf_path = self.converter.to_pdf(path, workdir.path()).await?;
        let pdf = tokio::fs::read(&pdf_path).await.map_err(ConversionError::Io)?;
        debug!("{} produced {} bytes of PDF", self.converter.name(), pdf.len());
        Ok(pdf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Mutex;

    /// Writes a fixed PDF, or fails, and remembers the working directory.
    struct FakeConverter {
        output: Option<Vec<u8>>,
        seen_workdir: Mutex<Option<PathBuf>>,
    }

    #[async_trait::async_trait]
    impl DocumentConverter for FakeConverter {
        async fn to_pdf(
            &self,
            input: &Path,
            workdir: &Path,
        ) -> std::result::Result<std::path::PathBuf, ConversionError> {
            *self.seen_workdir.lock().unwrap() = Some(workdir.to_path_buf());
            match &self.output {
                Some(pdf) => {
                    let out = workdir.join(input.file_stem().unwrap()).with_extension("pdf");
                    std::fs::write(&out, pdf)?;
                    Ok(out)
                }
                None => Err(ConversionError::Failed {
                    tool: "fake".into(),
                    status: "exit status: 1".into(),
                    stderr: "source file could not be loaded".into(),
                }),
            }
        }

        fn name(&self) -> &str {
            "fake"
        }
    }

    fn normalizer(output: Option<Vec<u8>>) -> (FormatNormalizer, Arc<FakeConverter>) {
        let fake = Arc::new(FakeConverter {
            output,
            seen_workdir: Mutex::new(None),
        });
        (FormatNormalizer::new(fake.clone(), TextPdfWriter::new()), fake)
    }

    #[tokio::test]
    async fn test_pdf_passes_through() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("in.pdf");
        let pdf = TextPdfWriter::new().render("Invoice 1").unwrap();
        std::fs::write(&path, &pdf).unwrap();

        let (normalizer, _) = normalizer(None);
        let doc = normalizer.normalize(&path).await.unwrap();
        assert_eq!(doc.format, DocumentFormat::Pdf);
        assert!(matches!(doc.content, NormalizedContent::Pdf(ref b) if *b == pdf));
    }

    #[tokio::test]
    async fn test_text_rendered_to_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("invoice.txt");
        std::fs::write(&path, "Invoice #INV-1001\nTotal: $245.00\n").unwrap();

        let (normalizer, _) = normalizer(None);
        let doc = normalizer.normalize(&path).await.unwrap();
        assert_eq!(doc.format, DocumentFormat::Text);
        assert!(matches!(doc.content, NormalizedContent::Pdf(ref b) if b.starts_with(b"%PDF")));
    }

    #[tokio::test]
    async fn test_utf16_text_rendered_to_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.txt");
        let mut bytes = vec![0xFF, 0xFE];
        bytes.extend("Invoice #INV-77\nTotal: $12.00\n".encode_utf16().flat_map(u16::to_le_bytes));
        std::fs::write(&path, &bytes).unwrap();

        let (normalizer, _) = normalizer(None);
        let doc = normalizer.normalize(&path).await.unwrap();
        assert_eq!(doc.format, DocumentFormat::Text);
        assert!(matches!(doc.content, NormalizedContent::Pdf(ref b) if b.starts_with(b"%PDF")));
    }

    #[tokio::test]
    async fn test_word_conversion_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("invoice.docx");
        std::fs::write(&path, b"PK\x03\x04word").unwrap();

        let (normalizer, fake) = normalizer(Some(b"%PDF-1.4 converted".to_vec()));
        let doc = normalizer.normalize(&path).await.unwrap();
        assert!(matches!(doc.content, NormalizedContent::Pdf(ref b) if b.starts_with(b"%PDF-1.4")));

        let workdir = fake.seen_workdir.lock().unwrap().clone().unwrap();
        assert!(!workdir.exists());
    }

    #[tokio::test]
    async fn test_failed_conversion_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.doc");
        std::fs::write(&path, [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1]).unwrap();

        let (normalizer, fake) = normalizer(None);
        let err = normalizer.normalize(&path).await.unwrap_err();
        assert!(matches!(err, InvexError::Conversion(ConversionError::Failed { .. })));
        assert!(err.is_input_error());

        let workdir = fake.seen_workdir.lock().unwrap().clone().unwrap();
        assert!(!workdir.exists());
    }

    #[tokio::test]
    async fn test_missing_and_unsupported() {
        let (normalizer, _) = normalizer(None);
        let err = normalizer.normalize(Path::new("/no/such/invoice.pdf")).await.unwrap_err();
        assert!(matches!(err, InvexError::NotFound(_)));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("invoice.pages");
        std::fs::write(&path, b"data").unwrap();
        let err = normalizer.normalize(&path).await.unwrap_err();
        assert!(matches!(err, InvexError::UnsupportedFormat(_)));
    }

    #[tokio::test]
    async fn test_corrupt_spreadsheet() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.xlsx");
        std::fs::write(&path, b"PK\x03\x04not really a zip").unwrap();

        let (normalizer, _) = normalizer(None);
        let err = normalizer.normalize(&path).await.unwrap_err();
        assert!(matches!(err, InvexError::Spreadsheet(_)));
    }
}
