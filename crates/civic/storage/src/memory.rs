//! In-memory reference implementation of the civic storage traits.
//!
//! This adapter is deterministic and test-friendly. It also supports fault
//! injection so callers can exercise partial-write recovery without a real
//! backend. Production deployments should use a durable backend.

use crate::traits::{ElectionStore, OrchestrationStore, PopulationStore};
use crate::{StorageError, StorageResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use civic_types::{
    Agent, AgentId, CampaignUpdate, Candidate, CellSummary, Classification, CrossCheckRecord,
    Election, ElectionId, ElectionPatch, ElectionStage, Post, Rank, StateResult, SummaryId,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, RwLock};

/// Operation names accepted by [`InMemoryCivicStorage::inject_failures`].
pub mod ops {
    pub const CREATE_ELECTION: &str = "create_election";
    pub const TRANSITION_ELECTION: &str = "transition_election";
    pub const UPDATE_ELECTION: &str = "update_election";
    pub const REPLACE_CANDIDATES: &str = "replace_candidates";
    pub const INSERT_STATE_RESULT: &str = "insert_state_result";
    pub const INSERT_CAMPAIGN_UPDATE: &str = "insert_campaign_update";
    pub const PROMOTE_RANK: &str = "promote_rank";
    pub const DEMOTE_RANK: &str = "demote_rank";
    pub const INSERT_CELL_SUMMARY: &str = "insert_cell_summary";
    pub const INSERT_CROSS_CHECK: &str = "insert_cross_check";
    pub const LIST_RECENT_POSTS: &str = "list_recent_posts";
}

/// In-memory civic storage adapter.
#[derive(Default)]
pub struct InMemoryCivicStorage {
    agents: RwLock<Vec<Agent>>,
    posts: RwLock<Vec<Post>>,
    elections: RwLock<Vec<Election>>,
    candidates: RwLock<HashMap<ElectionId, Vec<Candidate>>>,
    state_results: RwLock<Vec<StateResult>>,
    campaign_updates: RwLock<Vec<CampaignUpdate>>,
    summaries: RwLock<Vec<CellSummary>>,
    cross_checks: RwLock<Vec<CrossCheckRecord>>,
    faults: Mutex<HashMap<&'static str, usize>>,
    writes: AtomicU64,
}

impl InMemoryCivicStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with agents
    pub fn with_agents(agents: Vec<Agent>) -> Self {
        let store = Self::new();
        store.add_agents(agents);
        store
    }

    pub fn add_agents(&self, agents: Vec<Agent>) {
        if let Ok(mut guard) = self.agents.write() {
            guard.extend(agents);
        }
    }

    pub fn add_posts(&self, posts: Vec<Post>) {
        if let Ok(mut guard) = self.posts.write() {
            guard.extend(posts);
        }
    }

    /// Make the next `count` calls of `operation` fail with
    /// [`StorageError::Unavailable`].
    pub fn inject_failures(&self, operation: &'static str, count: usize) {
        if let Ok(mut guard) = self.faults.lock() {
            guard.insert(operation, count);
        }
    }

    /// Number of successful writes since creation.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn agent(&self, id: &AgentId) -> Option<Agent> {
        self.agents
            .read()
            .ok()
            .and_then(|guard| guard.iter().find(|a| &a.id == id).cloned())
    }

    pub fn elections(&self) -> Vec<Election> {
        self.elections.read().map(|g| g.clone()).unwrap_or_default()
    }

    pub fn campaign_updates(&self) -> Vec<CampaignUpdate> {
        self.campaign_updates
            .read()
            .map(|g| g.clone())
            .unwrap_or_default()
    }

    pub fn summaries(&self) -> Vec<CellSummary> {
        self.summaries.read().map(|g| g.clone()).unwrap_or_default()
    }

    pub fn cross_checks(&self) -> Vec<CrossCheckRecord> {
        self.cross_checks.read().map(|g| g.clone()).unwrap_or_default()
    }

    fn check_fault(&self, operation: &'static str) -> StorageResult<()> {
        let mut guard = self
            .faults
            .lock()
            .map_err(|_| StorageError::Backend("fault lock poisoned".to_string()))?;
        match guard.get_mut(operation) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                Err(StorageError::Unavailable(format!(
                    "injected failure for {operation}"
                )))
            }
            _ => Ok(()),
        }
    }

    fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }

    fn set_rank(&self, ids: &[AgentId], rank: Rank) -> StorageResult<()> {
        let mut guard = self
            .agents
            .write()
            .map_err(|_| StorageError::Backend("agents lock poisoned".to_string()))?;
        for id in ids {
            let agent = guard
                .iter_mut()
                .find(|a| &a.id == id)
                .ok_or_else(|| StorageError::NotFound(format!("agent {id} not found")))?;
            agent.rank = rank;
        }
        Ok(())
    }

    fn insert_cross_check(&self, record: CrossCheckRecord) -> StorageResult<()> {
        self.check_fault(ops::INSERT_CROSS_CHECK)?;
        let mut guard = self
            .cross_checks
            .write()
            .map_err(|_| StorageError::Backend("cross-check lock poisoned".to_string()))?;
        if guard.iter().any(|r| r.id == record.id) {
            return Err(StorageError::Conflict(format!(
                "cross-check {} already exists",
                record.id
            )));
        }
        guard.push(record);
        self.record_write();
        Ok(())
    }
}

#[async_trait]
impl PopulationStore for InMemoryCivicStorage {
    async fn list_agents(&self) -> StorageResult<Vec<Agent>> {
        let guard = self
            .agents
            .read()
            .map_err(|_| StorageError::Backend("agents lock poisoned".to_string()))?;
        Ok(guard.clone())
    }

    async fn promote_rank(&self, agent_id: &AgentId) -> StorageResult<()> {
        self.check_fault(ops::PROMOTE_RANK)?;
        self.set_rank(std::slice::from_ref(agent_id), Rank::TOP)?;
        self.record_write();
        Ok(())
    }

    async fn demote_rank(&self, agent_ids: &[AgentId]) -> StorageResult<()> {
        if agent_ids.is_empty() {
            return Ok(());
        }
        self.check_fault(ops::DEMOTE_RANK)?;
        self.set_rank(agent_ids, Rank::DEMOTED)?;
        self.record_write();
        Ok(())
    }

    async fn list_recent_posts(&self, since: DateTime<Utc>) -> StorageResult<Vec<Post>> {
        self.check_fault(ops::LIST_RECENT_POSTS)?;
        let guard = self
            .posts
            .read()
            .map_err(|_| StorageError::Backend("posts lock poisoned".to_string()))?;
        let mut posts = guard
            .iter()
            .filter(|p| p.created_at >= since)
            .cloned()
            .collect::<Vec<_>>();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(posts)
    }
}

#[async_trait]
impl ElectionStore for InMemoryCivicStorage {
    async fn create_election(&self, election: Election) -> StorageResult<ElectionId> {
        self.check_fault(ops::CREATE_ELECTION)?;
        let mut guard = self
            .elections
            .write()
            .map_err(|_| StorageError::Backend("elections lock poisoned".to_string()))?;

        if let Some(in_flight) = guard.iter().find(|e| e.is_in_flight()) {
            return Err(StorageError::Conflict(format!(
                "election {} is still in flight",
                in_flight.id
            )));
        }
        if guard.iter().any(|e| e.id == election.id) {
            return Err(StorageError::Conflict(format!(
                "election {} already exists",
                election.id
            )));
        }

        let id = election.id.clone();
        guard.push(election);
        self.record_write();
        Ok(id)
    }

    async fn get_latest_election(&self) -> StorageResult<Option<Election>> {
        let guard = self
            .elections
            .read()
            .map_err(|_| StorageError::Backend("elections lock poisoned".to_string()))?;
        Ok(guard.last().cloned())
    }

    async fn transition_election(
        &self,
        election_id: &ElectionId,
        expected_from: ElectionStage,
        to: ElectionStage,
        _at: DateTime<Utc>,
    ) -> StorageResult<()> {
        self.check_fault(ops::TRANSITION_ELECTION)?;
        let mut guard = self
            .elections
            .write()
            .map_err(|_| StorageError::Backend("elections lock poisoned".to_string()))?;
        let election = guard
            .iter_mut()
            .find(|e| &e.id == election_id)
            .ok_or_else(|| StorageError::NotFound(format!("election {election_id} not found")))?;

        if election.stage() != expected_from {
            return Err(StorageError::InvariantViolation(format!(
                "invalid election transition: expected {}, found {}",
                expected_from,
                election.stage()
            )));
        }
        if !election.advance(to) {
            return Err(StorageError::InvariantViolation(format!(
                "election {election_id} cannot move from {expected_from} to {to}"
            )));
        }
        self.record_write();
        Ok(())
    }

    async fn update_election(
        &self,
        election_id: &ElectionId,
        patch: ElectionPatch,
    ) -> StorageResult<()> {
        self.check_fault(ops::UPDATE_ELECTION)?;
        let mut guard = self
            .elections
            .write()
            .map_err(|_| StorageError::Backend("elections lock poisoned".to_string()))?;
        let election = guard
            .iter_mut()
            .find(|e| &e.id == election_id)
            .ok_or_else(|| StorageError::NotFound(format!("election {election_id} not found")))?;
        election.apply(patch);
        self.record_write();
        Ok(())
    }

    async fn replace_candidates(
        &self,
        election_id: &ElectionId,
        candidates: Vec<Candidate>,
    ) -> StorageResult<()> {
        self.check_fault(ops::REPLACE_CANDIDATES)?;
        if candidates.iter().any(|c| &c.election_id != election_id) {
            return Err(StorageError::InvalidInput(format!(
                "candidate slate contains entries for another election than {election_id}"
            )));
        }
        let mut guard = self
            .candidates
            .write()
            .map_err(|_| StorageError::Backend("candidates lock poisoned".to_string()))?;
        guard.insert(election_id.clone(), candidates);
        self.record_write();
        Ok(())
    }

    async fn list_candidates(&self, election_id: &ElectionId) -> StorageResult<Vec<Candidate>> {
        let guard = self
            .candidates
            .read()
            .map_err(|_| StorageError::Backend("candidates lock poisoned".to_string()))?;
        Ok(guard.get(election_id).cloned().unwrap_or_default())
    }

    async fn insert_state_results(&self, results: Vec<StateResult>) -> StorageResult<()> {
        let mut guard = self
            .state_results
            .write()
            .map_err(|_| StorageError::Backend("state results lock poisoned".to_string()))?;
        for result in results {
            self.check_fault(ops::INSERT_STATE_RESULT)?;
            if guard.iter().any(|r| {
                r.election_id == result.election_id && r.specialization == result.specialization
            }) {
                return Err(StorageError::Conflict(format!(
                    "state result for {} in {} already recorded",
                    result.specialization, result.election_id
                )));
            }
            guard.push(result);
            self.record_write();
        }
        Ok(())
    }

    async fn list_state_results(
        &self,
        election_id: &ElectionId,
    ) -> StorageResult<Vec<StateResult>> {
        let guard = self
            .state_results
            .read()
            .map_err(|_| StorageError::Backend("state results lock poisoned".to_string()))?;
        Ok(guard
            .iter()
            .filter(|r| &r.election_id == election_id)
            .cloned()
            .collect())
    }

    async fn insert_campaign_update(&self, update: CampaignUpdate) -> StorageResult<()> {
        self.check_fault(ops::INSERT_CAMPAIGN_UPDATE)?;
        let mut guard = self
            .campaign_updates
            .write()
            .map_err(|_| StorageError::Backend("campaign lock poisoned".to_string()))?;
        guard.push(update);
        self.record_write();
        Ok(())
    }
}

#[async_trait]
impl OrchestrationStore for InMemoryCivicStorage {
    async fn insert_cell_summary(&self, summary: CellSummary) -> StorageResult<SummaryId> {
        self.check_fault(ops::INSERT_CELL_SUMMARY)?;
        let mut guard = self
            .summaries
            .write()
            .map_err(|_| StorageError::Backend("summaries lock poisoned".to_string()))?;
        if guard.iter().any(|s| s.id == summary.id) {
            return Err(StorageError::Conflict(format!(
                "summary {} already exists",
                summary.id
            )));
        }
        let id = summary.id.clone();
        guard.push(summary);
        self.record_write();
        Ok(id)
    }

    async fn insert_conflict_report(&self, report: CrossCheckRecord) -> StorageResult<()> {
        if report.classification != Classification::Conflict {
            return Err(StorageError::InvalidInput(
                "conflict report must be classified as conflict".to_string(),
            ));
        }
        self.insert_cross_check(report)
    }

    async fn insert_verification(&self, record: CrossCheckRecord) -> StorageResult<()> {
        if record.classification != Classification::Verified {
            return Err(StorageError::InvalidInput(
                "verification must be classified as verified".to_string(),
            ));
        }
        self.insert_cross_check(record)
    }

    async fn list_cross_checks(&self, topic: &str) -> StorageResult<Vec<CrossCheckRecord>> {
        let guard = self
            .cross_checks
            .read()
            .map_err(|_| StorageError::Backend("cross-check lock poisoned".to_string()))?;
        Ok(guard.iter().filter(|r| r.topic == topic).cloned().collect())
    }
}
