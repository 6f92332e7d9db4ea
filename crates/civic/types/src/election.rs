//! Election records
//!
//! An election moves forward only: `Scheduled/Primary` then
//! `Active/General` then `Closed`. [`ElectionStage`] folds status and phase
//! into one ordered value so that transitions can be checked in one place.

use crate::{AgentId, ElectionId, Specialization};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Lifecycle status of an election
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElectionStatus {
    Scheduled,
    Active,
    Closed,
}

/// Campaign phase of an election
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElectionPhase {
    Primary,
    General,
}

/// Combined status/phase, totally ordered by lifecycle position
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElectionStage {
    /// `Scheduled` + `Primary`
    Primary,
    /// `Active` + `General`
    General,
    /// `Closed`, winner determined
    Closed,
}

impl ElectionStage {
    pub fn status(self) -> ElectionStatus {
        match self {
            ElectionStage::Primary => ElectionStatus::Scheduled,
            ElectionStage::General => ElectionStatus::Active,
            ElectionStage::Closed => ElectionStatus::Closed,
        }
    }

    pub fn phase(self) -> ElectionPhase {
        match self {
            ElectionStage::Primary => ElectionPhase::Primary,
            ElectionStage::General | ElectionStage::Closed => ElectionPhase::General,
        }
    }

    /// Only single forward steps are legal
    pub fn can_advance_to(self, next: ElectionStage) -> bool {
        matches!(
            (self, next),
            (ElectionStage::Primary, ElectionStage::General)
                | (ElectionStage::General, ElectionStage::Closed)
        )
    }
}

impl std::fmt::Display for ElectionStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ElectionStage::Primary => "scheduled/primary",
            ElectionStage::General => "active/general",
            ElectionStage::Closed => "closed",
        };
        f.write_str(label)
    }
}

/// Phase deadlines. `None` means unknown, which never counts as elapsed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionSchedule {
    pub primary_end: Option<DateTime<Utc>>,
    pub general_end: Option<DateTime<Utc>>,
    pub term_end: Option<DateTime<Utc>>,
}

/// Outcome recorded on an election when it closes
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ElectionResults {
    pub winner_agent_id: AgentId,
    pub winner_delegates: u32,
    /// Delegates aggregated per candidate across all specializations
    pub delegate_totals: BTreeMap<AgentId, u32>,
    pub closed_at: DateTime<Utc>,
}

/// An election cycle
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Election {
    pub id: ElectionId,
    pub status: ElectionStatus,
    pub phase: ElectionPhase,
    pub total_delegates: u32,
    pub start_at: DateTime<Utc>,
    /// Equals `schedule.general_end`; kept for readers of the flat record
    pub end_at: Option<DateTime<Utc>>,
    pub schedule: ElectionSchedule,
    pub last_campaign_refresh: Option<DateTime<Utc>>,
    pub last_debate_update: Option<DateTime<Utc>>,
    /// Delegates per specialization, fixed by the first close attempt
    #[serde(default)]
    pub apportionment: Option<BTreeMap<Specialization, u32>>,
    pub results: Option<ElectionResults>,
}

impl Election {
    /// A freshly scheduled election in its primary phase
    pub fn scheduled(
        id: ElectionId,
        total_delegates: u32,
        start_at: DateTime<Utc>,
        schedule: ElectionSchedule,
    ) -> Self {
        Self {
            id,
            status: ElectionStatus::Scheduled,
            phase: ElectionPhase::Primary,
            total_delegates,
            start_at,
            end_at: schedule.general_end,
            schedule,
            last_campaign_refresh: None,
            last_debate_update: None,
            apportionment: None,
            results: None,
        }
    }

    /// Current lifecycle position. A closed status dominates the phase.
    pub fn stage(&self) -> ElectionStage {
        match (self.status, self.phase) {
            (ElectionStatus::Closed, _) => ElectionStage::Closed,
            (ElectionStatus::Active, _) | (_, ElectionPhase::General) => ElectionStage::General,
            (ElectionStatus::Scheduled, ElectionPhase::Primary) => ElectionStage::Primary,
        }
    }

    /// Whether the election is still in flight (scheduled or active)
    pub fn is_in_flight(&self) -> bool {
        self.status != ElectionStatus::Closed
    }

    /// Apply a stage transition after checking it is a single forward step
    pub fn advance(&mut self, to: ElectionStage) -> bool {
        if !self.stage().can_advance_to(to) {
            return false;
        }
        self.status = to.status();
        self.phase = to.phase();
        true
    }

    /// Apply the non-stage fields of a patch
    pub fn apply(&mut self, patch: ElectionPatch) {
        if let Some(at) = patch.last_campaign_refresh {
            self.last_campaign_refresh = Some(at);
        }
        if let Some(at) = patch.last_debate_update {
            self.last_debate_update = Some(at);
        }
        if self.apportionment.is_none() {
            self.apportionment = patch.apportionment;
        }
        if let Some(results) = patch.results {
            self.results = Some(results);
        }
    }
}

/// Partial update of an election's non-lifecycle fields
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ElectionPatch {
    pub last_campaign_refresh: Option<DateTime<Utc>>,
    pub last_debate_update: Option<DateTime<Utc>>,
    /// Ignored once the election already carries an apportionment
    pub apportionment: Option<BTreeMap<Specialization, u32>>,
    pub results: Option<ElectionResults>,
}

impl ElectionPatch {
    pub fn campaign_refreshed(at: DateTime<Utc>) -> Self {
        Self {
            last_campaign_refresh: Some(at),
            ..Default::default()
        }
    }

    pub fn debate_updated(at: DateTime<Utc>) -> Self {
        Self {
            last_debate_update: Some(at),
            ..Default::default()
        }
    }

    pub fn with_apportionment(apportionment: BTreeMap<Specialization, u32>) -> Self {
        Self {
            apportionment: Some(apportionment),
            ..Default::default()
        }
    }

    pub fn with_results(results: ElectionResults) -> Self {
        Self {
            results: Some(results),
            ..Default::default()
        }
    }
}

/// Snapshot of an eligible agent nominated for an election
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub election_id: ElectionId,
    pub agent_id: AgentId,
    pub specialization: Specialization,
    pub merit_score: f64,
    pub manifesto: String,
    pub nominated_at: DateTime<Utc>,
}

/// Per-specialization outcome of an election
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StateResult {
    pub election_id: ElectionId,
    pub specialization: Specialization,
    pub delegates: u32,
    pub winner_agent_id: AgentId,
    pub vote_totals: BTreeMap<AgentId, u32>,
}

/// Kind of agent-facing campaign text
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignUpdateKind {
    /// Slate refresh during the primary
    Manifesto,
    /// Debate digest during the general
    Debate,
}

/// Agent-facing campaign text published during an election
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CampaignUpdate {
    pub election_id: ElectionId,
    pub kind: CampaignUpdateKind,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn election() -> Election {
        Election::scheduled(
            ElectionId::new("e1"),
            10,
            Utc::now(),
            ElectionSchedule::default(),
        )
    }

    #[test]
    fn stages_only_advance_one_step_forward() {
        assert!(ElectionStage::Primary.can_advance_to(ElectionStage::General));
        assert!(ElectionStage::General.can_advance_to(ElectionStage::Closed));
        assert!(!ElectionStage::Primary.can_advance_to(ElectionStage::Closed));
        assert!(!ElectionStage::Closed.can_advance_to(ElectionStage::General));
        assert!(!ElectionStage::General.can_advance_to(ElectionStage::Primary));
        assert!(!ElectionStage::General.can_advance_to(ElectionStage::General));
    }

    #[test]
    fn advance_updates_status_and_phase_together() {
        let mut e = election();
        assert_eq!(e.stage(), ElectionStage::Primary);
        assert!(e.advance(ElectionStage::General));
        assert_eq!(e.status, ElectionStatus::Active);
        assert_eq!(e.phase, ElectionPhase::General);
        assert!(!e.advance(ElectionStage::Primary));
        assert!(e.advance(ElectionStage::Closed));
        assert_eq!(e.stage(), ElectionStage::Closed);
        assert!(!e.is_in_flight());
    }

    #[test]
    fn stage_ordering_matches_lifecycle() {
        assert!(ElectionStage::Primary < ElectionStage::General);
        assert!(ElectionStage::General < ElectionStage::Closed);
    }

    #[test]
    fn patch_only_touches_present_fields() {
        let mut e = election();
        let at = Utc::now();
        e.apply(ElectionPatch::campaign_refreshed(at));
        e.apply(ElectionPatch::default());
        assert_eq!(e.last_campaign_refresh, Some(at));
        assert_eq!(e.last_debate_update, None);
    }

    #[test]
    fn apportionment_is_recorded_once() {
        let mut e = election();
        let first = BTreeMap::from([(Specialization::new("tax"), 10)]);
        let second = BTreeMap::from([(Specialization::new("tax"), 4), ("legal".into(), 6)]);

        e.apply(ElectionPatch::with_apportionment(first.clone()));
        e.apply(ElectionPatch::with_apportionment(second));
        e.apply(ElectionPatch::default());
        assert_eq!(e.apportionment, Some(first));
    }
}
