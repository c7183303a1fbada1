//! Gemini `generateContent` backend.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use tracing::{debug, warn};

use super::StructuredBackend;
use crate::{GenerationRequest, LlmError, Part, Result};

/// Public API root.
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Gemini backend over HTTPS.
pub struct GeminiBackend {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
    temperature: f32,
    max_output_tokens: u32,
}

impl GeminiBackend {
    /// Create a backend with the given key and a request timeout.
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(LlmError::MissingCredential);
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::Connection(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key,
            temperature: 0.1,
            max_output_tokens: 8192,
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_output_tokens(mut self, tokens: u32) -> Self {
        self.max_output_tokens = tokens;
        self
    }

    fn url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        )
    }
}

/// Build the JSON body for a `generateContent` call.
pub fn build_request_body(
    request: &GenerationRequest,
    temperature: f32,
    max_output_tokens: u32,
) -> Value {
    let mut parts = vec![json!({ "text": request.prompt })];
    for part in &request.parts {
        match part {
            Part::Text(text) => parts.push(json!({ "text": text })),
            Part::InlineImage { mime_type, data } => parts.push(json!({
                "inlineData": {
                    "mimeType": mime_type,
                    "data": BASE64.encode(data),
                }
            })),
        }
    }

    let mut generation_config = json!({
        "temperature": temperature,
        "maxOutputTokens": max_output_tokens,
        "responseMimeType": "application/json",
    });
    if let Some(schema) = &request.schema {
        generation_config["responseSchema"] = schema.clone();
    }

    json!({
        "contents": [{ "role": "user", "parts": parts }],
        "generationConfig": generation_config,
    })
}

/// Pull the JSON document out of a `generateContent` response.
pub fn parse_response(body: &Value) -> Result<Value> {
    let parts = body
        .pointer("/candidates/0/content/parts")
        .and_then(Value::as_array)
        .ok_or(LlmError::EmptyResponse)?;

    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(Value::as_str))
        .collect();

    let text = strip_code_fence(text.trim());
    if text.is_empty() {
        return Err(LlmError::EmptyResponse);
    }

    serde_json::from_str(text).map_err(|e| LlmError::Parse(e.to_string()))
}

/// Models sometimes wrap JSON in a markdown fence even in JSON mode.
fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[async_trait]
impl StructuredBackend for GeminiBackend {
    async fn generate(&self, request: &GenerationRequest) -> Result<Value> {
        let body = build_request_body(request, self.temperature, self.max_output_tokens);
        debug!(
            "Sending generateContent to {} ({} chars prompt, {} images)",
            self.model,
            request.prompt.len(),
            request.image_count()
        );

        let resp = self
            .client
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            warn!("Gemini quota exhausted for {}", self.model);
            return Err(LlmError::RateLimited);
        }
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                body: text.chars().take(500).collect(),
            });
        }

        let value: Value = resp.json().await?;
        parse_response(&value)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_request_body_layout() {
        let request = GenerationRequest::new("Extract fields")
            .with_text("Invoice #1")
            .with_png(vec![1, 2, 3])
            .with_schema(json!({ "type": "OBJECT" }));

        let body = build_request_body(&request, 0.1, 1024);

        let parts = body["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0]["text"], "Extract fields");
        assert_eq!(parts[1]["text"], "Invoice #1");
        assert_eq!(parts[2]["inlineData"]["mimeType"], "image/png");
        assert_eq!(parts[2]["inlineData"]["data"], "AQID");
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(body["generationConfig"]["responseSchema"]["type"], "OBJECT");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 1024);
    }

    #[test]
    fn test_request_body_without_schema() {
        let body = build_request_body(&GenerationRequest::new("hi"), 0.1, 10);
        assert!(body["generationConfig"].get("responseSchema").is_none());
    }

    #[test]
    fn test_parse_response() {
        let body = json!({
            "candidates": [{
                "content": { "parts": [{ "text": "{\"invoice_number\": \"A-1\"}" }] }
            }]
        });
        let value = parse_response(&body).unwrap();
        assert_eq!(value["invoice_number"], "A-1");
    }

    #[test]
    fn test_parse_response_fenced() {
        let body = json!({
            "candidates": [{
                "content": { "parts": [{ "text": "```json\n{\"total\": \"9.50\"}\n```" }] }
            }]
        });
        let value = parse_response(&body).unwrap();
        assert_eq!(value["total"], "9.50");
    }

    #[test]
    fn test_parse_response_empty() {
        let body = json!({ "candidates": [{ "finishReason": "SAFETY" }] });
        assert!(matches!(parse_response(&body), Err(LlmError::EmptyResponse)));

        let body = json!({ "candidates": [{ "content": { "parts": [{ "text": "  " }] } }] });
        assert!(matches!(parse_response(&body), Err(LlmError::EmptyResponse)));
    }

    #[test]
    fn test_parse_response_not_json() {
        let body = json!({
            "candidates": [{ "content": { "parts": [{ "text": "sorry, no" }] } }]
        });
        assert!(matches!(parse_response(&body), Err(LlmError::Parse(_))));
    }

    #[test]
    fn test_missing_credential() {
        let result = GeminiBackend::new("  ", Duration::from_secs(1));
        assert!(matches!(result, Err(LlmError::MissingCredential)));
    }

    #[test]
    fn test_url() {
        let backend = GeminiBackend::new("key", Duration::from_secs(1))
            .unwrap()
            .with_endpoint("http://localhost:9999/v1beta/")
            .with_model("gemini-test");
        assert_eq!(
            backend.url(),
            "http://localhost:9999/v1beta/models/gemini-test:generateContent"
        );
        assert_eq!(backend.model_name(), "gemini-test");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint() {
        let backend = GeminiBackend::new("key", Duration::from_secs(2))
            .unwrap()
            .with_endpoint("http://127.0.0.1:1/v1beta");
        let result = backend.generate(&GenerationRequest::new("hi")).await;
        assert!(matches!(
            result,
            Err(LlmError::Connection(_)) | Err(LlmError::Timeout)
        ));
    }
}
