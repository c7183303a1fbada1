//! Rendering PDF pages to images.

use std::ffi::OsString;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::OcrError;
use crate::models::config::OcrConfig;
use crate::tool::{run_tool, stderr_excerpt, ToolError};

/// Renders one page of a PDF file to PNG.
#[async_trait]
pub trait PageRasterizer: Send + Sync {
    /// PNG bytes of `page` (1-indexed) at `dpi`. `workdir` holds scratch files.
    async fn render(&self, pdf: &Path, page: u32, dpi: u32, workdir: &Path) -> Result<Vec<u8>, OcrError>;
}

/// Poppler's `pdftoppm`.
#[derive(Debug, Clone)]
pub struct PopplerRasterizer {
    binary: String,
    timeout: Duration,
}

impl PopplerRasterizer {
    pub fn new() -> Self {
        Self::from_config(&OcrConfig::default())
    }

    pub fn from_config(config: &OcrConfig) -> Self {
        Self {
            binary: config.rasterizer_binary.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

impl Default for PopplerRasterizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PageRasterizer for PopplerRasterizer {
    async fn render(&self, pdf: &Path, page: u32, dpi: u32, workdir: &Path) -> Result<Vec<u8>, OcrError> {
        let prefix = workdir.join(format!("page-{}", page));
        let page_arg = page.to_string();
        let args: Vec<OsString> = vec![
            "-png".into(),
            "-r".into(),
            dpi.to_string().into(),
            "-f".into(),
            page_arg.clone().into(),
            "-l".into(),
            page_arg.into(),
            "-singlefile".into(),
            pdf.as_os_str().to_os_string(),
            prefix.as_os_str().to_os_string(),
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

        // -singlefile writes <prefix>.png
        let png_path = prefix.with_extension("png");
        let png = tokio::fs::read(&png_path).await.map_err(|_| OcrError::Render(page))?;
        debug!("Rendered page {} at {} dpi ({} bytes)", page, dpi, png.len());
        Ok(png)
    }
}
