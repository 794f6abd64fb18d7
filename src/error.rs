use thiserror::Error;

/// Error types that can occur when talking to the generation endpoints or
/// preparing a request for them.
#[derive(Debug, Error)]
pub enum ChatError {
    /// HTTP request/response errors
    #[error("HTTP error: {0}")]
    HttpError(String),
    /// Authentication and authorization errors
    #[error("Auth error: {0}")]
    AuthError(String),
    /// Invalid request parameters or format
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    /// Errors returned by the generation endpoint
    #[error("Provider error: {0}")]
    ProviderError(String),
    /// Response parsing or format error
    #[error("Response format error: {message}. Raw response: {raw_response}")]
    ResponseFormatError {
        message: String,
        raw_response: String,
    },
    /// Request did not complete within the configured deadline
    #[error("Request timed out")]
    Timeout,
    /// JSON serialization/deserialization errors
    #[error("JSON parse error: {0}")]
    JsonError(String),
    /// Generic error
    #[error("Generic error: {0}")]
    Generic(String),
}

impl ChatError {
    /// Whether this error came out of the timeout path.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ChatError::Timeout)
    }
}

/// Converts reqwest HTTP errors into ChatErrors
impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return ChatError::Timeout;
        }
        ChatError::HttpError(err.to_string())
    }
}

impl From<serde_json::Error> for ChatError {
    fn from(err: serde_json::Error) -> Self {
        ChatError::JsonError(format!(
            "{} at line {} column {}",
            err,
            err.line(),
            err.column()
        ))
    }
}
