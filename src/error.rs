//! Error types for the spin correlation measurement core.

use thiserror::Error;

/// Errors raised by the persisted output container.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt container: {0}")]
    Corrupt(String),

    #[error("Observable group not found: {0}")]
    GroupNotFound(String),
}

/// Errors raised by the measurement core.
#[derive(Debug, Error)]
pub enum MeasureError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Invalid frequency mesh: {0}")]
    Grid(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown scheduler stack: {0}")]
    UnknownStack(usize),
}

impl From<config::ConfigError> for MeasureError {
    fn from(err: config::ConfigError) -> Self {
        MeasureError::Config(err.to_string())
    }
}
