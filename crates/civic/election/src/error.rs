//! Error types for election operations

use civic_storage::StorageError;
use civic_types::ConfigError;
use thiserror::Error;

/// Errors that can occur while running an election
#[derive(Error, Debug, Clone)]
pub enum ElectionError {
    /// No agent passed the eligibility policy
    #[error("no eligible agents")]
    NoEligibleAgents,

    /// Candidate selection produced an empty slate
    #[error("no candidates available")]
    NoCandidates,

    /// Fewer delegates than specializations; the minimum-one rule cannot hold
    #[error("{total} delegates cannot cover {specializations} specializations")]
    InsufficientDelegates {
        /// Configured delegate total
        total: u32,
        /// Represented specializations
        specializations: usize,
    },

    /// Configuration rejected
    #[error(transparent)]
    InvalidConfig(#[from] ConfigError),

    /// Persistence boundary failure
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl ElectionError {
    /// Precondition failures abort a run before any write is attempted
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::NoEligibleAgents | Self::NoCandidates | Self::InsufficientDelegates { .. }
        )
    }
}

/// Result type for election operations
pub type ElectionResult<T> = Result<T, ElectionError>;
