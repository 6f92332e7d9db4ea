//! End-to-end: a full election cycle and an orchestration run over one store.

use chrono::{DateTime, Duration, Utc};
use civic_runtime::{GovernanceEngine, TickAction};
use civic_storage::{ElectionStore, InMemoryCivicStorage, RetryPolicy};
use civic_textgen::TemplateGenerator;
use civic_types::{
    Agent, ExclusionRule, GovernanceConfig, Post, Rank, VettingStatus,
};
use std::sync::Arc;

fn t0() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-05-01T09:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

fn population() -> Vec<Agent> {
    let mut agents = Vec::new();
    for (spec, count) in [("tax", 50), ("health", 30), ("legal", 20)] {
        for i in 0..count {
            let merit = 30.0 + ((i * 7) % 70) as f64;
            agents.push(Agent::new(format!("{spec}-{i:02}").as_str(), spec, merit).with_trust(10));
        }
    }
    agents.push(Agent::new("supreme", "tax", 100.0).with_rank(Rank::Leader));
    agents.push(Agent::new("banned", "tax", 99.0).with_vetting(VettingStatus::Rejected));
    agents.push(Agent::new("distrusted", "health", 99.0).with_trust(-5));
    agents
}

fn engine(store: Arc<InMemoryCivicStorage>) -> GovernanceEngine {
    let mut config = GovernanceConfig::default();
    config.eligibility.exclusion = ExclusionRule::sentinel("supreme");
    GovernanceEngine::new(store, Arc::new(TemplateGenerator), config)
        .unwrap()
        .with_retry(RetryPolicy::immediate(3))
}

#[tokio::test]
async fn proportional_population_closes_with_exact_apportionment() {
    let store = Arc::new(InMemoryCivicStorage::with_agents(population()));
    let engine = engine(store.clone());

    assert_eq!(engine.run_election_tick(t0()).await.action, TickAction::Created);
    assert_eq!(
        engine.run_election_tick(t0() + Duration::days(7)).await.action,
        TickAction::AdvancedToGeneral
    );
    let report = engine.run_election_tick(t0() + Duration::days(14)).await;
    let TickAction::Closed { winner, .. } = report.action.clone() else {
        panic!("expected close, got {:?}", report.action);
    };
    assert!(report.is_clean());
    assert!(!["supreme", "banned", "distrusted"].contains(&winner.as_str()));

    let election = store.get_latest_election().await.unwrap().unwrap();
    let mut results = store.list_state_results(&election.id).await.unwrap();
    results.sort_by(|a, b| a.specialization.cmp(&b.specialization));
    let delegates: Vec<(String, u32)> = results
        .iter()
        .map(|r| (r.specialization.to_string(), r.delegates))
        .collect();
    assert_eq!(
        delegates,
        vec![
            ("health".to_string(), 30),
            ("legal".to_string(), 20),
            ("tax".to_string(), 50)
        ]
    );
}

#[tokio::test]
async fn transient_store_failures_are_absorbed_by_retry() {
    let store = Arc::new(InMemoryCivicStorage::with_agents(population()));
    let engine = engine(store.clone());

    store.inject_failures(civic_storage::memory::ops::CREATE_ELECTION, 2);
    let report = engine.run_election_tick(t0()).await;
    assert_eq!(report.action, TickAction::Created);
    assert!(report.is_clean());
}

#[tokio::test]
async fn orchestration_cross_checks_trending_topics() {
    let store = Arc::new(InMemoryCivicStorage::with_agents(population()));
    let now = Utc::now();
    store.add_posts(
        (0..12)
            .map(|i| Post {
                id: format!("post-{i}").into(),
                author_id: format!("tax-{:02}", i * 4).into(),
                topic: if i % 3 == 0 { "pensions" } else { "skat_dk" }.to_string(),
                content: format!("Position statement number {i} on the proposal."),
                consensus_score: 0.4 + (i as f64) * 0.05,
                created_at: now - Duration::hours(i),
            })
            .collect(),
    );
    let engine = engine(store.clone());

    let report = engine.run_orchestration(5, 15).await;
    assert_eq!(report.cells, 2 + 4 + 2);
    assert_eq!(report.topics, 2);
    assert_eq!(report.summaries, 4);
    assert_eq!(report.verified + report.conflicts, 2);
    assert!(report.is_clean());
    assert_eq!(store.cross_checks().len(), 2);
}

#[tokio::test]
async fn redelivered_orchestration_run_is_absorbed() {
    let store = Arc::new(InMemoryCivicStorage::with_agents(population()));
    let now = t0();
    store.add_posts(
        (0..4)
            .map(|i| Post {
                id: format!("post-{i}").into(),
                author_id: format!("tax-{:02}", i * 7).into(),
                topic: "skat_dk".to_string(),
                content: format!("Statement {i} on the levy."),
                consensus_score: 0.5,
                created_at: now - Duration::hours(i),
            })
            .collect(),
    );
    let engine = engine(store.clone());

    let first = engine.run_orchestration_at(now, 5, 15).await;
    let writes = store.write_count();
    let second = engine.run_orchestration_at(now, 5, 15).await;

    assert_eq!(second, first);
    assert_eq!(store.write_count(), writes);
    assert_eq!(store.summaries().len(), 2);
    assert_eq!(store.cross_checks().len(), 1);
}
