use thiserror::Error;

/// LLM provider errors
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Configuration Error: {0}")]
    ConfigError(String),

    #[error("Request Error: {0}")]
    RequestError(String),

    #[error("Response Error: {0}")]
    ResponseError(String),

    #[error("Parsing Error: {0}")]
    ParsingError(String),

    #[error("HTTP Error: {status_code} - {message}")]
    HttpError { status_code: u16, message: String },

    /// The first content block was not the kind the caller asked for
    #[error("Unexpected content block: expected text, got {0}")]
    UnexpectedContent(String),

    #[error("Timed out after {0} seconds")]
    Timeout(u64),
}

/// Result type for LLM operations
pub type LlmResult<T> = Result<T, LlmError>;

/// Local-search provider errors, one variant per failure class
#[derive(Error, Debug)]
pub enum LocalSearchError {
    /// Client id/secret absent; detected before any request is issued
    #[error("Local search credentials not configured")]
    NotConfigured,

    #[error("Local search authentication failed (401): {0}")]
    Unauthorized(String),

    #[error("Local search rate limit exceeded (429): {0}")]
    RateLimited(String),

    #[error("Local search returned status {status_code}: {message}")]
    Status { status_code: u16, message: String },

    /// No response was received
    #[error("Local search network error: {0}")]
    Network(String),

    /// The request could not be built or sent
    #[error("Local search request error: {0}")]
    Request(String),

    #[error("Failed to decode local search response: {0}")]
    Decode(String),

    #[error("Local search timed out after {0} seconds")]
    Timeout(u64),
}

impl LocalSearchError {
    /// Short label for the failure class, used as a structured log field
    pub fn classification(&self) -> &'static str {
        match self {
            LocalSearchError::NotConfigured => "not_configured",
            LocalSearchError::Unauthorized(_) => "unauthorized",
            LocalSearchError::RateLimited(_) => "rate_limited",
            LocalSearchError::Status { .. } => "status",
            LocalSearchError::Network(_) => "network",
            LocalSearchError::Request(_) => "request",
            LocalSearchError::Decode(_) => "decode",
            LocalSearchError::Timeout(_) => "timeout",
        }
    }
}

/// Result type for local-search operations
pub type LocalSearchResult<T> = Result<T, LocalSearchError>;
