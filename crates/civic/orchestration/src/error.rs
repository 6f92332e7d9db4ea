//! Error types for orchestration

use civic_storage::StorageError;
use civic_types::ConfigError;
use thiserror::Error;

/// Errors that can occur while setting up an orchestration run
#[derive(Error, Debug, Clone)]
pub enum OrchestrationError {
    #[error(transparent)]
    InvalidConfig(#[from] ConfigError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result type for orchestration operations
pub type OrchestrationResult<T> = Result<T, OrchestrationError>;
