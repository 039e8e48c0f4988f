//! Error types for the vokabel_core library.

use crate::content::ContentError;
use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for vokabel_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Review state handed to the scheduler is malformed (negative interval,
    /// negative repetitions, non-positive ease). Always a caller bug.
    #[error("Invalid review state: {0}")]
    InvalidState(String),

    /// Card or record does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Persistent deck could not be read or written
    #[error("Store error: {0}")]
    Store(String),

    /// Content oracle returned nothing usable
    #[error("Content error: {0}")]
    Content(#[from] ContentError),
}
