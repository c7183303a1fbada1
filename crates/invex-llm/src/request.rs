//! Provider-neutral request description.

use serde_json::Value;

/// One piece of request content.
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    /// Plain text appended after the prompt.
    Text(String),
    /// Raw image bytes sent inline.
    InlineImage { mime_type: String, data: Vec<u8> },
}

/// A structured generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// Instruction text, always sent first.
    pub prompt: String,
    /// Additional content in order.
    pub parts: Vec<Part>,
    /// JSON schema the response must follow, in the provider's dialect.
    pub schema: Option<Value>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            parts: Vec::new(),
            schema: None,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.parts.push(Part::Text(text.into()));
        self
    }

    pub fn with_png(mut self, data: Vec<u8>) -> Self {
        self.parts.push(Part::InlineImage {
            mime_type: "image/png".to_string(),
            data,
        });
        self
    }

    pub fn with_schema(mut self, schema: Value) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Number of inline images attached.
    pub fn image_count(&self) -> usize {
        self.parts
            .iter()
            .filter(|p| matches!(p, Part::InlineImage { .. }))
            .count()
    }
}
