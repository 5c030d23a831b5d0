//! Error types for the scraper and evaluator
//!
//! This module defines custom error types used throughout the application.

use thiserror::Error;

/// Errors that can occur during HTTP fetching operations
#[derive(Error, Debug)]
pub enum FetchError {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimit,

    /// Server error with status code
    #[error("Server error: {0}")]
    ServerError(u16),

    /// Client error with status code (not retried)
    #[error("Client error: {0}")]
    ClientError(u16),

    /// Request timeout
    #[error("Request timeout")]
    Timeout,

    /// Content decoding error
    #[error("Decoding error: {0}")]
    Decode(String),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl FetchError {
    /// Whether another attempt may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimit | Self::ServerError(_) | Self::Timeout => true,
            Self::Http(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            Self::ClientError(_) | Self::Decode(_) | Self::InvalidUrl(_) => false,
        }
    }
}

/// Errors that can occur during parsing operations
#[derive(Error, Debug)]
pub enum ParseError {
    /// No episode reference in the work page
    #[error("No episode found for work {0}")]
    EpisodeNotFound(String),

    /// Episode page had no body paragraphs
    #[error("No content found in {0}")]
    ContentNotFound(String),
}

/// General crawler errors
#[derive(Error, Debug)]
pub enum CrawlerError {
    /// Fetch error
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Ranking page had no entries
    #[error("No works found in ranking")]
    NoWorksFound,
}

/// Errors from the LLM chat endpoint
#[derive(Error, Debug)]
pub enum LlmError {
    /// No API key configured
    #[error("LLM API key not configured")]
    MissingApiKey,

    /// HTTP request error
    #[error("LLM request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status from the endpoint
    #[error("LLM API error: {status} - {body}")]
    Status { status: u16, body: String },

    /// Response had no choices
    #[error("LLM response contained no choices")]
    EmptyResponse,
}

impl LlmError {
    /// Whether another attempt may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            Self::Status { status, .. } => matches!(status, 429 | 500 | 502 | 503 | 504),
            Self::MissingApiKey | Self::EmptyResponse => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_retryable() {
        assert!(FetchError::ServerError(503).is_retryable());
        assert!(FetchError::Timeout.is_retryable());
        assert!(!FetchError::ClientError(404).is_retryable());
        assert!(!FetchError::Decode("x".into()).is_retryable());
    }

    #[test]
    fn test_llm_error_retryable() {
        let err = LlmError::Status {
            status: 429,
            body: String::new(),
        };
        assert!(err.is_retryable());

        let err = LlmError::Status {
            status: 401,
            body: String::new(),
        };
        assert!(!err.is_retryable());
        assert!(!LlmError::MissingApiKey.is_retryable());
    }
}
