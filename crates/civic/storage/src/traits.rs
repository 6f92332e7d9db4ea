use crate::StorageResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use civic_types::{
    Agent, AgentId, CampaignUpdate, Candidate, CellSummary, CrossCheckRecord, Election,
    ElectionId, ElectionPatch, ElectionStage, EligibilityPolicy, Post, StateResult, SummaryId,
};

/// Read contract of the population registry, plus post-election rank mutation.
#[async_trait]
pub trait PopulationStore: Send + Sync {
    /// Every agent known to the registry, unfiltered.
    async fn list_agents(&self) -> StorageResult<Vec<Agent>>;

    /// Agents eligible under `policy` (sentinel, suspended, rejected and
    /// below-trust-floor agents removed).
    async fn eligible_agents(&self, policy: &EligibilityPolicy) -> StorageResult<Vec<Agent>> {
        Ok(policy.filter_eligible(self.list_agents().await?))
    }

    /// Raise an agent to the top rank.
    async fn promote_rank(&self, agent_id: &AgentId) -> StorageResult<()>;

    /// Drop the given agents from the top rank.
    async fn demote_rank(&self, agent_ids: &[AgentId]) -> StorageResult<()>;

    /// Posts created at or after `since`, newest first.
    async fn list_recent_posts(&self, since: DateTime<Utc>) -> StorageResult<Vec<Post>>;
}

/// Storage interface for election lifecycle records.
#[async_trait]
pub trait ElectionStore: Send + Sync {
    /// Insert a newly scheduled election and return its id.
    async fn create_election(&self, election: Election) -> StorageResult<ElectionId>;

    /// The most recently created election, if any.
    async fn get_latest_election(&self) -> StorageResult<Option<Election>>;

    /// Move an election from `expected_from` to `to`. Rejects stale or
    /// non-forward transitions.
    async fn transition_election(
        &self,
        election_id: &ElectionId,
        expected_from: ElectionStage,
        to: ElectionStage,
        at: DateTime<Utc>,
    ) -> StorageResult<()>;

    /// Update non-lifecycle fields.
    async fn update_election(
        &self,
        election_id: &ElectionId,
        patch: ElectionPatch,
    ) -> StorageResult<()>;

    /// Replace the candidate slate of an election.
    async fn replace_candidates(
        &self,
        election_id: &ElectionId,
        candidates: Vec<Candidate>,
    ) -> StorageResult<()>;

    async fn list_candidates(&self, election_id: &ElectionId) -> StorageResult<Vec<Candidate>>;

    /// Insert per-specialization results. A specialization already recorded
    /// for the election is a conflict.
    async fn insert_state_results(&self, results: Vec<StateResult>) -> StorageResult<()>;

    async fn list_state_results(&self, election_id: &ElectionId)
        -> StorageResult<Vec<StateResult>>;

    async fn insert_campaign_update(&self, update: CampaignUpdate) -> StorageResult<()>;
}

/// Storage interface for orchestration outputs.
#[async_trait]
pub trait OrchestrationStore: Send + Sync {
    async fn insert_cell_summary(&self, summary: CellSummary) -> StorageResult<SummaryId>;

    async fn insert_conflict_report(&self, report: CrossCheckRecord) -> StorageResult<()>;

    async fn insert_verification(&self, record: CrossCheckRecord) -> StorageResult<()>;

    /// Conflict reports and verifications for a topic, oldest first.
    async fn list_cross_checks(&self, topic: &str) -> StorageResult<Vec<CrossCheckRecord>>;
}

/// Unified storage bundle used by the governance engine.
pub trait CivicStorage: PopulationStore + ElectionStore + OrchestrationStore + Send + Sync {}

impl<T> CivicStorage for T where T: PopulationStore + ElectionStore + OrchestrationStore + Send + Sync
{}
