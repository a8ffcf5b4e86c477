//! Error types for the Retell variant-generation pipeline.

use thiserror::Error;

/// Storage-related errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sled::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Provider completion failures, classified once at the adapter boundary.
///
/// Callers branch on the variant, never on message text. `RateLimited` is the
/// only transient kind; everything else a provider can do wrong is `Provider`.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("Provider rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("Provider error: {0}")]
    Provider(String),
}

/// Pipeline and configuration errors
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Unknown tier: {0}")]
    UnknownTier(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Ingest error: {0}")]
    Ingest(String),
}

impl From<config::ConfigError> for PipelineError {
    fn from(err: config::ConfigError) -> Self {
        PipelineError::Config(err.to_string())
    }
}
