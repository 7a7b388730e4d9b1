//! Error type shared by the engine, persistence and configuration layers.

use thiserror::Error;

/// Top-level error type for reticle operations
#[derive(Debug, Error)]
pub enum ReticleError {
    /// A flow was started without the settings it cannot run without
    #[error("configuration missing: {0}")]
    ConfigurationMissing(String),

    /// A submission broke a record invariant
    #[error("validation error: {0}")]
    Validation(String),

    #[error("unknown game profile: {0}")]
    UnknownGameProfile(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, ReticleError>;
