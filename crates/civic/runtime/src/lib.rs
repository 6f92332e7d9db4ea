//! Governance Engine
//!
//! Single entry point for the external driver. Both calls are complete,
//! idempotent reconciliation steps over the shared store:
//!
//! - [`GovernanceEngine::run_election_tick`]
//! - [`GovernanceEngine::run_orchestration`]
//!
//! ```ignore
//! let engine = GovernanceEngine::new(store, generator, GovernanceConfig::default())?;
//! let tick = engine.run_election_tick(Utc::now()).await;
//! let run = engine.run_orchestration(5, 15).await;
//! ```

#![deny(unsafe_code)]

use chrono::{DateTime, Utc};
use civic_election::{ElectionController, ElectionError, TickReport};
use civic_orchestration::{OrchestrationError, OrchestrationReport, Orchestrator};
use civic_storage::{CivicStorage, RetryPolicy};
use civic_textgen::TextGenerator;
use civic_types::{ConfigError, GovernanceConfig};
use std::sync::Arc;
use thiserror::Error;

pub use civic_election::TickAction;

/// Engine construction errors
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("election engine: {0}")]
    Election(#[from] ElectionError),

    #[error("orchestration engine: {0}")]
    Orchestration(#[from] OrchestrationError),
}

/// Result type for engine construction
pub type EngineResult<T> = Result<T, EngineError>;

/// Election controller and orchestrator over one store
pub struct GovernanceEngine {
    config: GovernanceConfig,
    elections: ElectionController,
    orchestrator: Orchestrator,
}

impl GovernanceEngine {
    pub fn new(
        store: Arc<dyn CivicStorage>,
        generator: Arc<dyn TextGenerator>,
        config: GovernanceConfig,
    ) -> EngineResult<Self> {
        config.validate()?;
        let elections = ElectionController::new(
            store.clone(),
            generator,
            config.election.clone(),
            config.eligibility.clone(),
        )?;
        let orchestrator = Orchestrator::new(
            store,
            config.orchestration.clone(),
            config.eligibility.clone(),
        )?;

        tracing::info!(
            total_delegates = config.election.total_delegates,
            cell_size = config.orchestration.cell_size,
            trust_floor = config.eligibility.trust_floor,
            "Governance engine initialized"
        );

        Ok(Self {
            config,
            elections,
            orchestrator,
        })
    }

    /// Apply one retry policy to every storage call
    pub fn with_retry(self, retry: RetryPolicy) -> Self {
        Self {
            config: self.config,
            elections: self.elections.with_retry(retry),
            orchestrator: self.orchestrator.with_retry(retry),
        }
    }

    pub fn config(&self) -> &GovernanceConfig {
        &self.config
    }

    /// Advance the election lifecycle by at most one step
    pub async fn run_election_tick(&self, now: DateTime<Utc>) -> TickReport {
        self.elections.tick(now).await
    }

    /// Run orchestration now with the given topic limit and cell size
    pub async fn run_orchestration(&self, max_topics: usize, cell_size: usize) -> OrchestrationReport {
        self.run_orchestration_at(Utc::now(), max_topics, cell_size)
            .await
    }

    /// Run orchestration as of `now`
    pub async fn run_orchestration_at(
        &self,
        now: DateTime<Utc>,
        max_topics: usize,
        cell_size: usize,
    ) -> OrchestrationReport {
        self.orchestrator.run_with(now, max_topics, cell_size).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use civic_storage::InMemoryCivicStorage;
    use civic_textgen::TemplateGenerator;

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = GovernanceConfig::default();
        config.election.min_candidates = 20;
        let result = GovernanceEngine::new(
            Arc::new(InMemoryCivicStorage::new()),
            Arc::new(TemplateGenerator),
            config,
        );
        assert!(matches!(result, Err(EngineError::Config(_))));
    }

    #[tokio::test]
    async fn empty_store_aborts_election_and_runs_empty_orchestration() {
        let engine = GovernanceEngine::new(
            Arc::new(InMemoryCivicStorage::new()),
            Arc::new(TemplateGenerator),
            GovernanceConfig::default(),
        )
        .unwrap();

        let tick = engine.run_election_tick(Utc::now()).await;
        assert!(matches!(tick.action, TickAction::Aborted { .. }));

        let run = engine.run_orchestration(5, 15).await;
        assert_eq!(run.cells, 0);
        assert_eq!(run.summaries, 0);
    }
}
