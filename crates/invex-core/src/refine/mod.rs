//! Optional second extraction pass through a remote structured-output model.
//!
//! Refinement never fails the pipeline: every problem ends up as a
//! [`RefinementStatus::Unavailable`] and the heuristic record is kept.

mod merge;
mod prompt;
mod response;

use std::sync::Arc;
use std::time::{Duration, Instant};

use image::imageops::FilterType;
use invex_llm::{GeminiBackend, GenerationRequest, LlmError, StructuredBackend};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::error::ExtractionWarning;
use crate::models::config::{LlmConfig, LlmProvider};
use crate::models::document::{PageContent, TextSource};
use crate::models::record::ExtractedRecord;
use crate::pdf::encode_png;

pub use merge::{merge_records, MergePolicy};
pub use prompt::{build_prompt, response_schema, EXTRACTION_PROMPT};
pub use response::{RefinedInvoice, RefinedLineItem};

/// Why refinement did not contribute.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum RefinementUnavailable {
    #[error("refinement disabled")]
    Disabled,

    #[error("no API credential configured")]
    MissingCredential,

    #[error("model call timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    #[error("rate limited by provider")]
    RateLimited,

    #[error("provider returned status {0}")]
    Api(u16),

    #[error("malformed response: {0}")]
    Malformed(String),
}

impl From<LlmError> for RefinementUnavailable {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::MissingCredential => Self::MissingCredential,
            LlmError::Connection(msg) => Self::Network(msg),
            LlmError::Timeout => Self::Timeout,
            LlmError::RateLimited => Self::RateLimited,
            LlmError::Api { status, .. } => Self::Api(status),
            LlmError::Parse(msg) => Self::Malformed(msg),
            LlmError::EmptyResponse => Self::Malformed("empty response".to_string()),
        }
    }
}

/// Outcome of the refinement pass for one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RefinementStatus {
    /// The model answered; `fields` took their value from it.
    Applied { fields: Vec<String> },
    /// The heuristic record was used unmodified.
    Unavailable { reason: RefinementUnavailable },
}

impl RefinementStatus {
    pub fn unavailable(reason: RefinementUnavailable) -> Self {
        Self::Unavailable { reason }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

/// Result of [`Refiner::refine`].
#[derive(Debug, Clone)]
pub struct Refinement {
    /// Merged record, or the heuristic one when unavailable.
    pub record: ExtractedRecord,
    pub status: RefinementStatus,
    /// Malformed values the model returned.
    pub warnings: Vec<ExtractionWarning>,
}

/// Sends document content to a [`StructuredBackend`] and merges the answer.
#[derive(Clone)]
pub struct Refiner {
    backend: Arc<dyn StructuredBackend>,
    config: LlmConfig,
    day_first: bool,
}

impl Refiner {
    pub fn new(backend: Arc<dyn StructuredBackend>, config: LlmConfig) -> Self {
        Self {
            backend,
            config,
            day_first: true,
        }
    }

    /// Build the backend for the configured provider.
    pub fn from_config(config: &LlmConfig) -> Result<Self, RefinementUnavailable> {
        if !config.enabled {
            return Err(RefinementUnavailable::Disabled);
        }
        let api_key = config
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(RefinementUnavailable::MissingCredential)?;

        let backend: Arc<dyn StructuredBackend> = match config.provider {
            LlmProvider::Gemini => Arc::new(
                GeminiBackend::new(api_key, Duration::from_secs(config.timeout_secs))?
                    .with_endpoint(config.endpoint.as_str())
                    .with_model(config.model.as_str())
                    .with_temperature(config.temperature)
                    .with_max_output_tokens(config.max_output_tokens),
            ),
        };

        Ok(Self::new(backend, config.clone()))
    }

    pub fn with_day_first(mut self, day_first: bool) -> Self {
        self.day_first = day_first;
        self
    }

    pub fn model_name(&self) -> &str {
        self.backend.model_name()
    }

    /// Assemble the request: prompt, truncated text, images of OCR'd pages.
    pub fn build_request(&self, heuristic: &ExtractedRecord, text: &str, pages: &[PageContent]) -> GenerationRequest {
        let mut request = GenerationRequest::new(build_prompt(&heuristic.headers))
            .with_schema(response_schema());

        let text = truncate_chars(text, self.config.max_content_chars);
        if !text.trim().is_empty() {
            request = request.with_text(text);
        }

        if self.config.send_page_images {
            for page in pages.iter().filter(|p| p.source == TextSource::Ocr) {
                let Some(image) = &page.image else { continue };
                match downscale_png(&image.png, self.config.max_image_dimension) {
                    Ok(png) => request = request.with_png(png),
                    Err(e) => debug!("Skipping image of page {}: {}", page.number, e),
                }
            }
        }

        request
    }

    /// Run one refinement attempt under the configured deadline.
    pub async fn refine(&self, heuristic: &ExtractedRecord, text: &str, pages: &[PageContent]) -> Refinement {
        let unavailable = |reason: RefinementUnavailable| {
            warn!("Refinement unavailable: {}", reason);
            Refinement {
                record: heuristic.clone(),
                status: RefinementStatus::unavailable(reason),
                warnings: Vec::new(),
            }
        };

        let request = self.build_request(heuristic, text, pages);
        if request.parts.is_empty() {
            return unavailable(RefinementUnavailable::Malformed("no content to send".to_string()));
        }

        info!(
            "Refining with {} ({} images)",
            self.backend.model_name(),
            request.image_count()
        );
        let start = Instant::now();
        let deadline = Duration::from_secs(self.config.timeout_secs);

        let value = match tokio::time::timeout(deadline, self.backend.generate(&request)).await {
            Err(_) => return unavailable(RefinementUnavailable::Timeout),
            Ok(Err(e)) => return unavailable(e.into()),
            Ok(Ok(value)) => value,
        };
        debug!("Model answered in {}ms", start.elapsed().as_millis());

        let refined = match RefinedInvoice::from_value(value) {
            Ok(r) => r,
            Err(e) => return unavailable(RefinementUnavailable::Malformed(e.to_string())),
        };
        let (candidate, warnings) = refined.into_record(self.day_first);
        let (record, taken) = merge_records(heuristic, &candidate, self.config.merge_policy);

        debug!("Refinement supplied {:?}", taken);
        Refinement {
            record,
            status: RefinementStatus::Applied {
                fields: taken.into_iter().map(str::to_string).collect(),
            },
            warnings,
        }
    }
}

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Shrink so the longer side is at most `max_dimension` pixels.
fn downscale_png(png: &[u8], max_dimension: u32) -> Result<Vec<u8>, image::ImageError> {
    let image = image::load_from_memory(png)?;
    if max_dimension == 0 || image.width().max(image.height()) <= max_dimension {
        return Ok(png.to_vec());
    }
    let resized = image.resize(max_dimension, max_dimension, FilterType::Triangle);
    encode_png(&resized)
}
