//! Configuration structures for the extraction pipeline.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::refine::MergePolicy;

/// Main configuration for the invex pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InvexConfig {
    /// PDF reading configuration.
    pub pdf: PdfConfig,

    /// Rasterizer and OCR configuration.
    pub ocr: OcrConfig,

    /// Document converter configuration.
    pub converter: ConverterConfig,

    /// Field extraction configuration.
    pub extraction: ExtractionConfig,

    /// Remote model configuration.
    pub llm: LlmConfig,

    /// Output configuration.
    pub export: ExportConfig,
}

/// PDF processing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    /// Non-whitespace characters below which a page counts as sparse and is OCR'd.
    pub min_text_length: usize,

    /// DPI for rendering pages to images.
    pub render_dpi: u32,

    /// Maximum pages to read (0 = unlimited).
    pub max_pages: usize,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            min_text_length: 20,
            render_dpi: 200,
            max_pages: 0,
        }
    }
}

/// Rasterizer and OCR engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Tesseract binary name or path.
    pub tesseract_binary: String,

    /// Poppler `pdftoppm` binary name or path.
    pub rasterizer_binary: String,

    /// Tesseract language code.
    pub language: String,

    /// Per-call timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            tesseract_binary: "tesseract".to_string(),
            rasterizer_binary: "pdftoppm".to_string(),
            language: "eng".to_string(),
            timeout_secs: 60,
        }
    }
}

/// Word/text to PDF conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    /// LibreOffice binary name or path.
    pub office_binary: String,

    /// Conversion timeout in seconds.
    pub timeout_secs: u64,

    /// Font size for rendered text files, in points.
    pub font_size: f32,

    /// Baseline-to-baseline distance for rendered text files, in points.
    pub line_height: f32,

    /// Page margin for rendered text files, in points.
    pub margin: f32,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            office_binary: "libreoffice".to_string(),
            timeout_secs: 120,
            font_size: 8.0,
            line_height: 10.0,
            margin: 10.0,
        }
    }
}

/// Invoice extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Minimum confidence to accept an extracted field.
    pub min_confidence: f32,

    /// Read ambiguous numeric dates like 01/02/2024 as day-first.
    pub day_first: bool,

    /// Lines at the top of the document searched for an unlabeled vendor name.
    pub vendor_scan_lines: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.5,
            day_first: true,
            vendor_scan_lines: 6,
        }
    }
}

/// Remote model vendors refinement can talk to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    Gemini,
}

/// Remote model configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Whether refinement may run at all.
    pub enabled: bool,

    /// Which vendor API the endpoint speaks.
    pub provider: LlmProvider,

    /// API root.
    pub endpoint: String,

    /// Model identifier.
    pub model: String,

    /// Credential. Read from the environment, never written back.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Deadline for the whole refinement call, in seconds.
    pub timeout_secs: u64,

    /// Generation temperature.
    pub temperature: f32,

    /// Maximum tokens in the response.
    pub max_output_tokens: u32,

    /// Maximum characters of document text sent to the model.
    pub max_content_chars: usize,

    /// Attach images of OCR'd pages to the request.
    pub send_page_images: bool,

    /// Longer side, in pixels, images are downscaled to before sending.
    pub max_image_dimension: u32,

    /// How refined and heuristic values are combined.
    pub merge_policy: MergePolicy,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            provider: LlmProvider::default(),
            endpoint: invex_llm::DEFAULT_ENDPOINT.to_string(),
            model: invex_llm::DEFAULT_MODEL.to_string(),
            api_key: None,
            timeout_secs: 60,
            temperature: 0.1,
            max_output_tokens: 8192,
            max_content_chars: 30_000,
            send_page_images: true,
            max_image_dimension: 1600,
            merge_policy: MergePolicy::default(),
        }
    }
}

impl LlmConfig {
    /// Apply environment variable overrides.
    ///
    /// Supported env vars:
    /// - `GEMINI_API_KEY`, falling back to `GOOGLE_API_KEY`: credential
    /// - `INVEX_LLM_MODEL`: model name
    /// - `INVEX_LLM_ENDPOINT`: API root
    /// - `INVEX_LLM_ENABLED`: "true" or "false"
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Same as [`with_env_overrides`](Self::with_env_overrides) with an explicit lookup.
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("GEMINI_API_KEY").or_else(|| non_empty("GOOGLE_API_KEY")) {
            self.api_key = Some(key);
        }
        if let Some(model) = non_empty("INVEX_LLM_MODEL") {
            self.model = model;
        }
        if let Some(endpoint) = non_empty("INVEX_LLM_ENDPOINT") {
            self.endpoint = endpoint;
        }
        if let Some(enabled) = non_empty("INVEX_LLM_ENABLED") {
            self.enabled = matches!(enabled.to_lowercase().as_str(), "1" | "true" | "yes");
        }
        self
    }

    /// Whether a credential is present.
    pub fn has_credential(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

/// Output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Write a JSON file next to the CSV.
    pub write_json: bool,

    /// Directory for output files; defaults to the input's directory.
    pub output_dir: Option<PathBuf>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            write_json: true,
            output_dir: None,
        }
    }
}

/// Per-run switches resolved once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Run the refiner. True only with a credential, config permission and no opt-out.
    pub llm_enabled: bool,

    /// Produce JSON text in the export result.
    pub include_json: bool,
}

impl PipelineOptions {
    /// Resolve from configuration and front-end opt-outs.
    pub fn resolve(config: &InvexConfig, no_llm: bool, no_json: bool) -> Self {
        Self {
            llm_enabled: !no_llm && config.llm.enabled && config.llm.has_credential(),
            include_json: !no_json && config.export.write_json,
        }
    }
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            llm_enabled: false,
            include_json: true,
        }
    }
}

impl InvexConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }

    /// Apply environment overrides to every section that has them.
    pub fn with_env_overrides(mut self) -> Self {
        self.llm = self.llm.with_env_overrides();
        self
    }
}
