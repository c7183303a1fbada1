//! Tesseract OCR through its command-line interface.

use std::ffi::OsStr;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tracing::debug;

use super::OcrEngine;
use crate::error::OcrError;
use crate::models::config::OcrConfig;
use crate::tool::{run_tool, stderr_excerpt, ToolError};

/// Runs `tesseract <image> stdout -l <language>`.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    binary: String,
    language: String,
    timeout: Duration,
}

impl TesseractEngine {
    pub fn new() -> Self {
        Self::from_config(&OcrConfig::default())
    }

    pub fn from_config(config: &OcrConfig) -> Self {
        Self {
            binary: config.tesseract_binary.clone(),
            language: config.language.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }
}

impl Default for TesseractEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OcrEngine for TesseractEngine {
    async fn recognize(&self, png: &[u8]) -> Result<String, OcrError> {
        let workdir = TempDir::new()?;
        let image_path = workdir.path().join("page.png");
        tokio::fs::write(&image_path, png).await?;

        let args = [
            image_path.as_os_str(),
            OsStr::new("stdout"),
            OsStr::new("-l"),
            OsStr::new(&self.language),
        ];
        let output = run_tool(&self.binary, args, self.timeout)
            .await
            .map_err(|e| match e {
                ToolError::NotFound => OcrError::ToolNotFound {
                    tool: self.binary.clone(),
                },
                ToolError::Timeout => OcrError::Timeout {
                    tool: self.binary.clone(),
                    secs: self.timeout.as_secs(),
                },
                ToolError::Io(e) => OcrError::Io(e),
            })?;

        if !output.status.success() {
            return Err(OcrError::Failed {
                tool: self.binary.clone(),
                stderr: stderr_excerpt(&output),
            });
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!("{} recognized {} characters", self.binary, text.len());
        Ok(text)
    }

    fn name(&self) -> &str {
        "tesseract"
    }
}
