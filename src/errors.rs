//! Error types for quakewatch.
//!
//! Uses `thiserror` for library-style error definitions.

use thiserror::Error;

/// Errors that can occur in quakewatch operations.
#[derive(Error, Debug)]
pub enum QuakeWatchError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed
    #[error("Failed to parse JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// API returned an error status
    #[error("USGS API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// Invalid response structure
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Feed fetch failed on both the primary and the fallback attempt
    #[error("Feed fetch failed after fallback attempt: {0}")]
    Fetch(String),

    /// Location resolution failed (callers degrade to a fallback coordinate)
    #[error("Geolocation failed: {0}")]
    Geolocation(String),

    /// A single alert-channel delivery failed (never fatal for the batch)
    #[error("Alert dispatch failed: {0}")]
    Dispatch(String),

    /// A user-supplied configuration scalar is out of bounds
    #[error("Invalid value for `{field}`: {message}")]
    Config {
        field: &'static str,
        message: String,
    },

    /// Subscriber store I/O failed
    #[error("Subscriber store error: {0}")]
    Store(String),
}
