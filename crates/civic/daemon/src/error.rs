//! Error types for civic-daemon

use civic_runtime::EngineError;
use civic_storage::StorageError;
use civic_textgen::TextGenError;
use thiserror::Error;

/// Daemon-level errors
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Engine construction error
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// Text generator construction error
    #[error("Text generation error: {0}")]
    TextGen(#[from] TextGenError),

    /// Population seed could not be loaded
    #[error("Seed error: {0}")]
    Seed(String),

    /// Report serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for daemon operations
pub type DaemonResult<T> = Result<T, DaemonError>;
