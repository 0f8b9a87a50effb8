//! Safepost error types

use thiserror::Error;

/// Safepost error type
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Detection rule error
    #[error("Rule error: {0}")]
    Rule(String),

    /// Settings collaborator error
    #[error("Settings error: {0}")]
    Settings(String),

    /// Stats collaborator error
    #[error("Stats error: {0}")]
    Stats(String),

    /// Overlay rendering error
    #[error("Render error: {0}")]
    Render(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for safepost operations
pub type Result<T> = std::result::Result<T, Error>;
