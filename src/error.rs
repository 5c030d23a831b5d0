//! Unified error handling for the kakuhyo crate
//!
//! This module provides a unified error type that consolidates all domain-specific
//! errors into a single `Error` enum, while maintaining the ability to use
//! domain-specific errors when needed.
//!
//! # Architecture
//!
//! - [`KakuhyoErrorTrait`] - Common interface implemented by all error types
//! - [`ErrorCategory`] - Classification of errors for handling strategies
//! - [`Error`] - Unified error enum wrapping all domain-specific errors
//!
//! # Usage
//!
//! ```rust,ignore
//! use kakuhyo::error::{Error, KakuhyoErrorTrait};
//!
//! fn handle_error(err: Error) {
//!     if err.is_recoverable() {
//!         println!("Will retry next run: {err}");
//!     } else {
//!         eprintln!("Fatal error: {err}");
//!     }
//! }
//! ```

use std::io;
use thiserror::Error;

// Re-export domain-specific errors for convenience
pub use crate::utils::error::{CrawlerError, FetchError, LlmError, ParseError};

/// Common trait for all kakuhyo error types
pub trait KakuhyoErrorTrait: std::error::Error {
    /// Check if this error is recoverable (a later attempt may succeed)
    fn is_recoverable(&self) -> bool;

    /// Get the error category for handling strategies
    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Network-related errors (HTTP, timeout, rate limit)
    Network,
    /// Parsing and data extraction errors
    Parsing,
    /// Storage and I/O errors
    Storage,
    /// LLM endpoint errors
    Llm,
    /// Configuration and validation errors
    Config,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Short lowercase label for log fields
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Parsing => "parsing",
            Self::Storage => "storage",
            Self::Llm => "llm",
            Self::Config => "config",
            Self::Other => "other",
        }
    }
}

/// Unified error type for the kakuhyo crate
#[derive(Error, Debug)]
pub enum Error {
    /// Crawler-related errors (fetch, parse, crawl)
    #[error("Crawler error: {0}")]
    Crawler(#[from] CrawlerError),

    /// Fetch-specific errors
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Parse-specific errors
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// LLM endpoint errors
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// Database errors
    #[error("Database error: {0}")]
    Database(#[source] rusqlite::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Prompt template errors
    #[error("Template error: {0}")]
    Template(#[from] handlebars::RenderError),

    /// Generic error with context
    #[error("{context}")]
    Other {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl KakuhyoErrorTrait for Error {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Crawler(CrawlerError::Fetch(e)) | Self::Fetch(e) => e.is_retryable(),
            Self::Crawler(_) | Self::Parse(_) => false,
            Self::Llm(e) => e.is_retryable(),
            Self::Database(_) => false,
            Self::Io(_) => true, // I/O errors are often transient
            Self::Json(_) | Self::Template(_) => false,
            Self::Other { .. } => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Crawler(CrawlerError::Parse(_)) | Self::Parse(_) => ErrorCategory::Parsing,
            Self::Crawler(_) | Self::Fetch(_) => ErrorCategory::Network,
            Self::Llm(LlmError::MissingApiKey) => ErrorCategory::Config,
            Self::Llm(_) => ErrorCategory::Llm,
            Self::Database(_) | Self::Io(_) => ErrorCategory::Storage,
            Self::Json(_) | Self::Template(_) => ErrorCategory::Parsing,
            Self::Other { .. } => ErrorCategory::Other,
        }
    }
}

impl Error {
    /// Create a generic error with context and source
    pub fn with_source(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Other {
            context: context.into(),
            source: Some(Box::new(source)),
        }
    }
}

// Conversion from rusqlite::Error
impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database(err)
    }
}

// Repository and command layers use anyhow
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other {
            context: format!("{err:#}"),
            source: None,
        }
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
