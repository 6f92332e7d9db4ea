//! Structured status shared by the election and orchestration runs

use serde::{Deserialize, Serialize};

/// A sub-step that was skipped because it failed. Runs aggregate these and
/// report them to the driver instead of dropping them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepFailure {
    /// Which sub-step failed, e.g. `insert_state_result:tax`
    pub step: String,
    /// Human-readable failure detail
    pub detail: String,
}

impl StepFailure {
    pub fn new(step: impl Into<String>, detail: impl ToString) -> Self {
        Self {
            step: step.into(),
            detail: detail.to_string(),
        }
    }
}

impl std::fmt::Display for StepFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.step, self.detail)
    }
}
