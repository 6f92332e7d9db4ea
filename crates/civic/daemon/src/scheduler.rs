//! Periodic driver for the governance engine

use crate::config::SchedulerConfig;
use chrono::Utc;
use civic_election::TickReport;
use civic_orchestration::OrchestrationReport;
use civic_runtime::{GovernanceEngine, TickAction};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tokio::time::{interval, MissedTickBehavior};

/// Reports of a single election tick plus orchestration run
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub election: TickReport,
    pub orchestration: OrchestrationReport,
}

/// How many passes a scheduler ran before stopping
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub election_ticks: u64,
    pub orchestration_runs: u64,
}

/// Drives election ticks and orchestration runs on fixed intervals
pub struct Scheduler {
    engine: Arc<GovernanceEngine>,
    config: SchedulerConfig,
}

impl Scheduler {
    pub fn new(engine: Arc<GovernanceEngine>, config: SchedulerConfig) -> Self {
        Self { engine, config }
    }

    /// One election tick and one orchestration run
    pub async fn run_once(&self) -> CycleReport {
        CycleReport {
            election: self.election_tick().await,
            orchestration: self.orchestration_run().await,
        }
    }

    /// Run both loops until `shutdown` resolves
    pub async fn run_until<F>(&self, shutdown: F) -> SchedulerStats
    where
        F: Future<Output = ()>,
    {
        let mut stats = SchedulerStats::default();
        let mut elections = interval(self.config.election_interval());
        let mut orchestration = interval(self.config.orchestration_interval());
        elections.set_missed_tick_behavior(MissedTickBehavior::Delay);
        orchestration.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        tracing::info!(
            election_interval_secs = self.config.election_interval_secs,
            orchestration_interval_secs = self.config.orchestration_interval_secs,
            "Scheduler started"
        );

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = elections.tick() => {
                    self.election_tick().await;
                    stats.election_ticks += 1;
                }
                _ = orchestration.tick() => {
                    self.orchestration_run().await;
                    stats.orchestration_runs += 1;
                }
            }
        }

        tracing::info!(
            election_ticks = stats.election_ticks,
            orchestration_runs = stats.orchestration_runs,
            "Scheduler stopped"
        );
        stats
    }

    async fn election_tick(&self) -> TickReport {
        let report = self.engine.run_election_tick(Utc::now()).await;
        let election_id = report.election_id.as_ref().map(|id| id.to_string());
        match &report.action {
            TickAction::Aborted { reason } => {
                tracing::error!(election_id = ?election_id, reason = %reason, "Election tick aborted");
            }
            action if !report.is_clean() => {
                tracing::warn!(
                    election_id = ?election_id,
                    action = ?action,
                    failures = report.failures.len(),
                    "Election tick completed with failures"
                );
            }
            TickAction::Idle => {
                tracing::debug!(election_id = ?election_id, "Election tick idle");
            }
            action => {
                tracing::info!(election_id = ?election_id, action = ?action, "Election tick completed");
            }
        }
        report
    }

    async fn orchestration_run(&self) -> OrchestrationReport {
        let orchestration = &self.engine.config().orchestration;
        let report = self
            .engine
            .run_orchestration(orchestration.max_topics, orchestration.cell_size)
            .await;
        if !report.is_clean() {
            tracing::warn!(
                failures = report.failures.len(),
                summaries = report.summaries,
                "Orchestration run completed with failures"
            );
        }
        report
    }
}

/// Resolves on Ctrl-C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, shutting down");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use civic_storage::InMemoryCivicStorage;
    use civic_textgen::TemplateGenerator;
    use civic_types::{Agent, GovernanceConfig};
    use std::time::Duration;

    fn engine() -> Arc<GovernanceEngine> {
        let agents = (0..12)
            .map(|i| Agent::new(format!("agent-{i}").as_str(), ["tax", "legal"][i % 2], 60.0))
            .collect();
        let store = Arc::new(InMemoryCivicStorage::with_agents(agents));
        Arc::new(
            GovernanceEngine::new(store, Arc::new(TemplateGenerator), GovernanceConfig::default())
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn run_once_creates_an_election_and_runs_orchestration() {
        let scheduler = Scheduler::new(engine(), SchedulerConfig::default());
        let report = scheduler.run_once().await;

        assert_eq!(report.election.action, TickAction::Created);
        assert_eq!(report.orchestration.cells, 2);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["election"]["action"]["kind"], "created");
    }

    #[tokio::test(start_paused = true)]
    async fn loops_tick_on_their_intervals_until_shutdown() {
        let config = SchedulerConfig {
            election_interval_secs: 60,
            orchestration_interval_secs: 600,
            ..SchedulerConfig::default()
        };
        let scheduler = Scheduler::new(engine(), config);

        let stats = scheduler
            .run_until(tokio::time::sleep(Duration::from_secs(150)))
            .await;

        assert_eq!(stats.election_ticks, 3);
        assert_eq!(stats.orchestration_runs, 1);
    }
}
