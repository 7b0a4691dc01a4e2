//! Error types for the chat completion client.

use thiserror::Error;

/// Errors that can occur when calling the chat completion API.
#[derive(Debug, Error)]
pub enum ChatError {
    /// No chat deployment is configured.
    #[error("OpenAI client is not configured.")]
    Unconfigured,

    /// The configured credentials cannot be used to build a client.
    #[error("invalid chat configuration: {0}")]
    InvalidConfig(String),

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API returned an error.
    #[error("API error ({code}): {message}")]
    Api {
        /// Error code from the API.
        code: String,
        /// Error message.
        message: String,
    },

    /// Rate limited by the API.
    #[error("rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Authentication failed.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Failed to parse response.
    #[error("parse error: {0}")]
    Parse(String),

    /// The response carried no message content.
    #[error("response contained no message")]
    EmptyResponse,
}

/// Error envelope returned by the API.
#[derive(Debug, serde::Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiError,
}

/// Nested error details.
#[derive(Debug, serde::Deserialize)]
pub struct ApiError {
    /// Error code. Some errors omit it.
    #[serde(default)]
    pub code: Option<String>,
    /// Error message.
    pub message: String,
}
