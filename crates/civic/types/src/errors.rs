//! Errors shared across the governance crates

use thiserror::Error;

/// Configuration validation failures
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("min_candidates ({min}) exceeds max_candidates ({max})")]
    CandidateBounds { min: usize, max: usize },

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("{field} must lie within [0, 1], got {value}")]
    OutOfUnitRange { field: &'static str, value: f64 },
}

/// Result of configuration validation
pub type ConfigResult<T> = Result<T, ConfigError>;
