//! Structured-output generation layer for invex.
//!
//! This crate provides a unified interface for asking a remote generative
//! model to answer with JSON that follows a schema:
//! - `StructuredBackend` is the seam the rest of the workspace codes against
//! - `GeminiBackend` talks to the Gemini `generateContent` endpoint

mod backend;
mod error;
mod request;

pub use backend::StructuredBackend;
pub use backend::gemini::{GeminiBackend, DEFAULT_ENDPOINT, DEFAULT_MODEL};
pub use error::LlmError;
pub use request::{GenerationRequest, Part};

/// Result type for generation operations.
pub type Result<T> = std::result::Result<T, LlmError>;
