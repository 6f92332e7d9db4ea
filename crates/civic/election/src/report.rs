//! Tick status objects handed back to the driver

use chrono::{DateTime, Utc};
use civic_types::{AgentId, ElectionId, StepFailure};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// The single step a tick performed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TickAction {
    /// First election created
    Created,
    /// Candidate slate and campaign text refreshed during the primary
    CampaignRefreshed,
    /// Primary ended, election is now active in its general phase
    AdvancedToGeneral,
    /// Periodic debate digest emitted during the general phase
    DebateUpdated,
    /// Results persisted, ranks updated, election closed
    Closed { winner: AgentId, delegates: u32 },
    /// General phase is over but the close could not complete this tick
    CloseDeferred,
    /// Term elapsed and a fresh election was created
    NextCycleStarted,
    /// Nothing due
    Idle,
    /// Precondition failed; no writes attempted
    Aborted { reason: String },
}

/// Outcome of one `run_election_tick`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickReport {
    pub at: DateTime<Utc>,
    pub election_id: Option<ElectionId>,
    pub action: TickAction,
    pub failures: Vec<StepFailure>,
}

impl TickReport {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self {
            at,
            election_id: None,
            action: TickAction::Idle,
            failures: Vec::new(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Record a skipped sub-step
    pub(crate) fn fail(&mut self, step: impl Into<String>, err: impl Display) {
        let failure = StepFailure::new(step, err);
        tracing::warn!(
            election_id = ?self.election_id.as_ref().map(|id| id.as_str()),
            step = %failure.step,
            error = %failure.detail,
            "Election sub-step skipped"
        );
        self.failures.push(failure);
    }

    pub(crate) fn finish(mut self, action: TickAction) -> Self {
        self.action = action;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failures_are_kept_in_order() {
        let mut report = TickReport::new(Utc::now());
        report.fail("replace_candidates", "store unavailable");
        report.fail("insert_campaign_update", "store unavailable");
        assert!(!report.is_clean());
        assert_eq!(report.failures[0].step, "replace_candidates");
        assert_eq!(report.failures[1].step, "insert_campaign_update");
    }

    #[test]
    fn action_serializes_with_a_kind_tag() {
        let action = TickAction::Closed {
            winner: "a1".into(),
            delegates: 60,
        };
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["kind"], "closed");
        assert_eq!(json["winner"], "a1");
        assert_eq!(json["delegates"], 60);
    }
}
