//! One orchestration run: cells, trending topics, paired summaries and
//! cross-checks. Store failures skip the affected topic and are reported;
//! the remaining topics still run.
//!
//! Record ids are derived from the run's inputs, so a redelivered run finds
//! its rows already stored and reports the same counts without writing twice.

use crate::cells::{build_cells, cell_pair};
use crate::conflict::cross_check;
use crate::consensus::summarize;
use crate::error::OrchestrationResult;
use crate::topics::trending_topics;
use chrono::{DateTime, Utc};
use civic_storage::{retry, CivicStorage, RetryPolicy, StorageError};
use civic_types::{
    CellSummary, Classification, EligibilityPolicy, OrchestrationConfig, Post, StepFailure,
};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of one `run_orchestration`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestrationReport {
    pub at: DateTime<Utc>,
    pub cells: usize,
    pub topics: usize,
    pub summaries: usize,
    pub verified: usize,
    pub conflicts: usize,
    pub failures: Vec<StepFailure>,
}

impl OrchestrationReport {
    fn new(at: DateTime<Utc>) -> Self {
        Self {
            at,
            cells: 0,
            topics: 0,
            summaries: 0,
            verified: 0,
            conflicts: 0,
            failures: Vec::new(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn fail(&mut self, step: impl Into<String>, err: impl Display) {
        let failure = StepFailure::new(step, err);
        warn!(step = %failure.step, error = %failure.detail, "Orchestration sub-step skipped");
        self.failures.push(failure);
    }
}

/// Runs orchestration passes against a store
pub struct Orchestrator {
    store: Arc<dyn CivicStorage>,
    config: OrchestrationConfig,
    policy: EligibilityPolicy,
    retry: RetryPolicy,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn CivicStorage>,
        config: OrchestrationConfig,
        policy: EligibilityPolicy,
    ) -> OrchestrationResult<Self> {
        config.validate()?;
        Ok(Self {
            store,
            config,
            policy,
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn config(&self) -> &OrchestrationConfig {
        &self.config
    }

    /// Run with the configured topic limit and cell size
    pub async fn run(&self, now: DateTime<Utc>) -> OrchestrationReport {
        self.run_with(now, self.config.max_topics, self.config.cell_size)
            .await
    }

    /// Run with explicit topic limit and cell size
    pub async fn run_with(
        &self,
        now: DateTime<Utc>,
        max_topics: usize,
        cell_size: usize,
    ) -> OrchestrationReport {
        let mut report = OrchestrationReport::new(now);
        let store = &self.store;

        let agents = match retry(&self.retry, "list_agents", || store.list_agents()).await {
            Ok(agents) => agents,
            Err(err) => {
                report.fail("list_agents", err);
                return report;
            }
        };
        let cells = build_cells(&agents, &self.policy, cell_size);
        report.cells = cells.len();

        let since = now - self.config.window();
        let posts: Vec<Post> =
            match retry(&self.retry, "list_recent_posts", || store.list_recent_posts(since)).await
            {
                Ok(posts) => posts
                    .into_iter()
                    .filter(|p| !self.policy.exclusion.excludes_id(&p.author_id))
                    .collect(),
                Err(err) => {
                    report.fail("list_recent_posts", err);
                    return report;
                }
            };

        let topics = trending_topics(&posts, max_topics);
        report.topics = topics.len();
        if topics.is_empty() {
            info!(cells = report.cells, "No trending topics in window");
            return report;
        }

        for (index, topic) in topics.iter().enumerate() {
            let Some((a, b)) = cell_pair(index, cells.len()) else {
                report.fail(format!("summarize:{}", topic.topic), "no active cells");
                continue;
            };

            let first = summarize(&cells[a], &topic.topic, &posts, &self.config, now);
            let second = summarize(&cells[b], &topic.topic, &posts, &self.config, now);

            let Some(first) = self.persist_summary(&mut report, first).await else {
                continue;
            };
            let Some(second) = self.persist_summary(&mut report, second).await else {
                continue;
            };

            let record = cross_check(&first, &second, self.config.conflict_threshold, now);
            debug!(
                topic = %topic.topic,
                cell_a = %first.cell_name,
                cell_b = %second.cell_name,
                conflict_score = record.conflict_score,
                "Summaries cross-checked"
            );

            let classification = record.classification;
            let stored = match classification {
                Classification::Conflict => {
                    retry(&self.retry, "insert_conflict_report", || {
                        store.insert_conflict_report(record.clone())
                    })
                    .await
                }
                Classification::Verified => {
                    retry(&self.retry, "insert_verification", || {
                        store.insert_verification(record.clone())
                    })
                    .await
                }
            };
            let stored = match stored {
                Err(StorageError::Conflict(_)) => {
                    debug!(id = %record.id, "Cross-check already stored");
                    Ok(())
                }
                other => other,
            };
            match stored {
                Ok(()) if classification == Classification::Conflict => report.conflicts += 1,
                Ok(()) => report.verified += 1,
                Err(err) => report.fail(format!("cross_check:{}", topic.topic), err),
            }
        }

        info!(
            cells = report.cells,
            topics = report.topics,
            summaries = report.summaries,
            verified = report.verified,
            conflicts = report.conflicts,
            failures = report.failures.len(),
            "Orchestration run complete"
        );
        report
    }

    async fn persist_summary(
        &self,
        report: &mut OrchestrationReport,
        summary: CellSummary,
    ) -> Option<CellSummary> {
        let store = &self.store;
        match retry(&self.retry, "insert_cell_summary", || {
            store.insert_cell_summary(summary.clone())
        })
        .await
        {
            Ok(_) => {
                report.summaries += 1;
                Some(summary)
            }
            Err(StorageError::Conflict(_)) => {
                debug!(id = %summary.id, "Cell summary already stored");
                report.summaries += 1;
                Some(summary)
            }
            Err(err) => {
                report.fail(
                    format!("insert_cell_summary:{}:{}", summary.topic, summary.cell_name),
                    err,
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use civic_storage::memory::ops;
    use civic_storage::InMemoryCivicStorage;
    use civic_types::{Agent, ExclusionRule};

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn agents() -> Vec<Agent> {
        let mut agents: Vec<Agent> = (0..20)
            .map(|i| Agent::new(format!("tax-{i:02}").as_str(), "tax", 50.0))
            .collect();
        agents.extend((0..5).map(|i| Agent::new(format!("legal-{i}").as_str(), "legal", 50.0)));
        agents.push(Agent::new("supreme", "tax", 100.0));
        agents
    }

    fn post(id: &str, author: &str, topic: &str, score: f64, age_hours: i64) -> Post {
        Post {
            id: id.into(),
            author_id: author.into(),
            topic: topic.to_string(),
            content: format!("{topic} discussion from {author}"),
            consensus_score: score,
            created_at: now() - Duration::hours(age_hours),
        }
    }

    fn orchestrator(store: Arc<InMemoryCivicStorage>) -> Orchestrator {
        Orchestrator::new(
            store,
            OrchestrationConfig::default(),
            EligibilityPolicy::new(0, ExclusionRule::sentinel("supreme")),
        )
        .unwrap()
        .with_retry(RetryPolicy::none())
    }

    #[tokio::test]
    async fn empty_window_builds_cells_without_summaries() {
        let store = Arc::new(InMemoryCivicStorage::with_agents(agents()));
        store.add_posts(vec![post("old", "tax-01", "vat", 0.9, 48)]);

        let report = orchestrator(store.clone()).run(now()).await;
        assert_eq!(report.cells, 3);
        assert_eq!(report.topics, 0);
        assert_eq!(report.summaries, 0);
        assert!(report.is_clean());
        assert!(store.summaries().is_empty());
    }

    #[tokio::test]
    async fn each_topic_gets_two_summaries_from_different_cells() {
        let store = Arc::new(InMemoryCivicStorage::with_agents(agents()));
        store.add_posts(vec![
            post("p1", "tax-01", "skat_dk", 0.9, 1),
            post("p2", "tax-16", "skat_dk", 0.2, 2),
            post("p3", "legal-1", "skat_dk", 0.5, 3),
            post("p4", "legal-2", "zoning", 0.7, 1),
        ]);

        let report = orchestrator(store.clone()).run(now()).await;
        assert_eq!(report.topics, 2);
        assert_eq!(report.summaries, 4);
        assert_eq!(report.verified + report.conflicts, 2);
        assert!(report.is_clean());

        let summaries = store.summaries();
        let skat: Vec<_> = summaries.iter().filter(|s| s.topic == "skat_dk").collect();
        assert_eq!(skat.len(), 2);
        assert_ne!(skat[0].cell_name, skat[1].cell_name);
        assert_eq!(store.cross_checks().len(), 2);
    }

    #[tokio::test]
    async fn excluded_authors_do_not_create_topics() {
        let store = Arc::new(InMemoryCivicStorage::with_agents(agents()));
        store.add_posts(vec![post("p1", "supreme", "decree", 1.0, 1)]);

        let report = orchestrator(store).run(now()).await;
        assert_eq!(report.topics, 0);
    }

    #[tokio::test]
    async fn summary_write_failure_skips_only_that_topic() {
        let store = Arc::new(InMemoryCivicStorage::with_agents(agents()));
        store.add_posts(vec![
            post("p1", "tax-01", "skat_dk", 0.9, 1),
            post("p2", "tax-02", "skat_dk", 0.8, 1),
            post("p3", "legal-1", "zoning", 0.7, 1),
        ]);
        store.inject_failures(ops::INSERT_CELL_SUMMARY, 1);

        let report = orchestrator(store.clone()).run(now()).await;
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].step.starts_with("insert_cell_summary:skat_dk"));
        assert_eq!(report.verified + report.conflicts, 1);
        assert_eq!(store.cross_checks()[0].topic, "zoning");
    }

    #[tokio::test]
    async fn unreadable_posts_are_reported() {
        let store = Arc::new(InMemoryCivicStorage::with_agents(agents()));
        store.inject_failures(ops::LIST_RECENT_POSTS, 1);

        let report = orchestrator(store).run(now()).await;
        assert_eq!(report.cells, 3);
        assert_eq!(report.failures[0].step, "list_recent_posts");
    }

    #[tokio::test]
    async fn repeated_run_with_the_same_clock_writes_nothing_new() {
        let store = Arc::new(InMemoryCivicStorage::with_agents(agents()));
        store.add_posts(vec![post("p1", "tax-01", "skat_dk", 0.9, 1)]);
        let orchestrator = orchestrator(store.clone());

        let first = orchestrator.run(now()).await;
        assert_eq!((store.summaries().len(), store.cross_checks().len()), (2, 1));
        let writes = store.write_count();

        let second = orchestrator.run(now()).await;
        assert_eq!((store.summaries().len(), store.cross_checks().len()), (2, 1));
        assert_eq!(store.write_count(), writes);
        assert!(second.is_clean());
        assert_eq!(second, first);
    }

    #[tokio::test]
    async fn later_window_stores_fresh_summaries() {
        let store = Arc::new(InMemoryCivicStorage::with_agents(agents()));
        store.add_posts(vec![post("p1", "tax-01", "skat_dk", 0.9, 1)]);
        let orchestrator = orchestrator(store.clone());

        orchestrator.run(now()).await;
        orchestrator.run(now() + Duration::minutes(30)).await;
        assert_eq!(store.summaries().len(), 4);
        assert_eq!(store.cross_checks().len(), 2);
    }

    #[tokio::test]
    async fn explicit_cell_size_overrides_config() {
        let store = Arc::new(InMemoryCivicStorage::with_agents(agents()));
        let report = orchestrator(store).run_with(now(), 5, 5).await;
        assert_eq!(report.cells, 5);
    }
}
