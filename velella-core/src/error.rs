//! Structured error types for the Velella ecosystem.

use thiserror::Error;

/// Unified error type for all Velella operations.
#[derive(Debug, Error)]
pub enum VelellaError {
    /// Invalid configuration (incompatible option combinations, bad thresholds)
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Invalid input (shape mismatch, bad arguments, out-of-range values)
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Degenerate analysis (no feature set survives filtering)
    #[error("degenerate analysis: {0}")]
    Degenerate(String),

    /// Catch-all for other errors
    #[error("{0}")]
    Other(String),
}

/// Convenience alias used throughout the Velella ecosystem.
pub type Result<T> = std::result::Result<T, VelellaError>;
