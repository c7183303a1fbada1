//! Generation backend implementations.

pub mod gemini;

use async_trait::async_trait;
use serde_json::Value;

use crate::{GenerationRequest, Result};

/// Trait for structured-output generation backends.
///
/// Implementations send one request and return the decoded JSON document
/// the model produced. They make a single attempt; callers decide what a
/// failure means.
#[async_trait]
pub trait StructuredBackend: Send + Sync {
    /// Run one generation request.
    async fn generate(&self, request: &GenerationRequest) -> Result<Value>;

    /// Model identifier used for logging.
    fn model_name(&self) -> &str;
}
