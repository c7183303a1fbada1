//! Error types for the generation layer.

use thiserror::Error;

/// Errors that can occur while talking to a remote model.
#[derive(Error, Debug)]
pub enum LlmError {
    /// No API credential was supplied.
    #[error("no API credential configured")]
    MissingCredential,

    /// The request could not be sent or the connection dropped.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The request exceeded its deadline.
    #[error("request timed out")]
    Timeout,

    /// The provider rejected the request because of quota or rate limits.
    #[error("rate limited by provider")]
    RateLimited,

    /// The provider answered with a non-success status.
    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    /// The response body could not be decoded.
    #[error("failed to parse response: {0}")]
    Parse(String),

    /// The response contained no candidate text.
    #[error("model returned no content")]
    EmptyResponse,
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout
        } else if err.is_decode() {
            LlmError::Parse(err.to_string())
        } else {
            LlmError::Connection(err.to_string())
        }
    }
}
