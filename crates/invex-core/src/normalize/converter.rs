//! Word document to PDF conversion through an external office suite.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::ConversionError;
use crate::models::config::ConverterConfig;
use crate::tool::{run_tool, stderr_excerpt, ToolError};

/// Converts a document to PDF inside a caller-owned working directory.
#[async_trait]
pub trait DocumentConverter: Send + Sync {
    /// Convert `input`, writing the PDF into `workdir`; returns the PDF path.
    async fn to_pdf(&self, input: &Path, workdir: &Path) -> Result<PathBuf, ConversionError>;

    /// Tool name for messages.
    fn name(&self) -> &str;
}

/// LibreOffice in headless mode.
#[derive(Debug, Clone)]
pub struct OfficeConverter {
    binary: String,
    timeout: Duration,
}

impl OfficeConverter {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            timeout: Duration::from_secs(120),
        }
    }

    pub fn from_config(config: &ConverterConfig) -> Self {
        Self::new(config.office_binary.clone()).with_timeout(Duration::from_secs(config.timeout_secs))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl DocumentConverter for OfficeConverter {
    async fn to_pdf(&self, input: &Path, workdir: &Path) -> Result<PathBuf, ConversionError> {
        info!("Converting {} to PDF with {}", input.display(), self.binary);

        let args = [
            OsStr::new("--headless"),
            OsStr::new("--convert-to"),
            OsStr::new("pdf"),
            OsStr::new("--outdir"),
            workdir.as_os_str(),
            input.as_os_str(),
        ];
        let output = run_tool(&self.binary, args, self.timeout)
            .await
            .map_err(|e| match e {
                ToolError::NotFound => ConversionError::ToolNotFound {
                    tool: self.binary.clone(),
                },
                ToolError::Timeout => ConversionError::Timeout {
                    tool: self.binary.clone(),
                    secs: self.timeout.as_secs(),
                },
                ToolError::Io(e) => ConversionError::Io(e),
            })?;

        if !output.status.success() {
            return Err(ConversionError::Failed {
                tool: self.binary.clone(),
                status: output.status.to_string(),
                stderr: stderr_excerpt(&output),
            });
        }

        let stem = input.file_stem().unwrap_or_default();
        let pdf_path = workdir.join(stem).with_extension("pdf");
        if !pdf_path.exists() {
            // Corrupt inputs can exit 0 without writing anything
            return Err(ConversionError::MissingOutput {
                tool: self.binary.clone(),
            });
        }

        debug!("Converted to {}", pdf_path.display());
        Ok(pdf_path)
    }

    fn name(&self) -> &str {
        &self.binary
    }
}
