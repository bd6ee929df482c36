//! Error types for gitmeter
//!
//! Provides a unified error type and the upstream API error variants

use std::time::Duration;
use thiserror::Error;

/// Result type alias using GitmeterError
pub type Result<T> = std::result::Result<T, GitmeterError>;

/// Unified error type for gitmeter operations
#[derive(Debug, Error)]
pub enum GitmeterError {
    // Upstream API errors
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    // Target pattern errors, detected before any network call
    #[error("Invalid repository pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    // Billing/runner scope errors
    #[error("Invalid scope: {0}")]
    InvalidScope(String),

    // Metric registry errors
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    // Two collectors describing the same metric name
    #[error("Metric {0} is described by more than one collector")]
    DuplicateMetric(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Errors returned by a single upstream API call
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("unexpected status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("failed to decode response from {url}: {reason}")]
    Decode { url: String, reason: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid request: {0}")]
    Request(String),
}

impl ApiError {
    /// Whether the upstream answered 404
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::Status { status: 404, .. })
    }
}

impl From<config::ConfigError> for GitmeterError {
    fn from(err: config::ConfigError) -> Self {
        GitmeterError::Config(err.to_string())
    }
}
