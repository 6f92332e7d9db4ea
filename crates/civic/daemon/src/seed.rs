//! Population seed files for the in-memory store
//!
//! ```json
//! { "agents": [ { "id": "a1", "specialization": "tax", "merit_score": 72.0 } ],
//!   "posts":  [ { "id": "p1", "author_id": "a1", "topic": "vat", "content": "...",
//!                 "consensus_score": 0.6, "created_at": "2026-01-01T00:00:00Z" } ] }
//! ```

use anyhow::{ensure, Context};
use civic_storage::InMemoryCivicStorage;
use civic_types::{Agent, Post};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Agents and posts to preload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PopulationSeed {
    #[serde(default)]
    pub agents: Vec<Agent>,
    #[serde(default)]
    pub posts: Vec<Post>,
}

impl PopulationSeed {
    /// Parse and sanity-check a seed document
    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        let seed: PopulationSeed =
            serde_json::from_str(raw).context("seed is not a valid population document")?;

        let mut ids = HashSet::new();
        for agent in &seed.agents {
            ensure!(ids.insert(&agent.id), "duplicate agent id {}", agent.id);
            ensure!(
                agent.has_valid_merit(),
                "agent {} has merit score {} outside [0, 100]",
                agent.id,
                agent.merit_score
            );
        }
        for post in &seed.posts {
            ensure!(
                (0.0..=1.0).contains(&post.consensus_score),
                "post {} has consensus score {} outside [0, 1]",
                post.id,
                post.consensus_score
            );
        }
        Ok(seed)
    }

    /// Read a seed file from disk
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read seed file {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("invalid seed file {}", path.display()))
    }

    /// Load the seed into an in-memory store
    pub fn apply(self, store: &InMemoryCivicStorage) {
        tracing::info!(
            agents = self.agents.len(),
            posts = self.posts.len(),
            "Seeding in-memory store"
        );
        store.add_agents(self.agents);
        store.add_posts(self.posts);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use civic_storage::PopulationStore;

    const SEED: &str = r#"{
        "agents": [
            { "id": "a1", "specialization": "tax", "merit_score": 72.0 },
            { "id": "a2", "name": "Bo", "specialization": "legal", "merit_score": 55.0, "trust_score": 3 }
        ],
        "posts": [
            { "id": "p1", "author_id": "a1", "topic": "vat", "content": "Lower it.",
              "consensus_score": 0.6, "created_at": "2026-01-01T00:00:00Z" }
        ]
    }"#;

    #[tokio::test]
    async fn seed_populates_the_store() {
        let store = InMemoryCivicStorage::new();
        PopulationSeed::from_json(SEED).unwrap().apply(&store);

        let agents = store.list_agents().await.unwrap();
        assert_eq!(agents.len(), 2);
        assert_eq!(agents[1].trust_score, Some(3));
        assert!(agents[0].is_active);
    }

    #[test]
    fn duplicate_agents_are_rejected() {
        let raw = r#"{ "agents": [
            { "id": "a1", "specialization": "tax", "merit_score": 1 },
            { "id": "a1", "specialization": "tax", "merit_score": 2 }
        ] }"#;
        let err = PopulationSeed::from_json(raw).unwrap_err();
        assert!(err.to_string().contains("duplicate agent id a1"));
    }

    #[test]
    fn out_of_range_merit_is_rejected() {
        let raw = r#"{ "agents": [
            { "id": "a1", "specialization": "tax", "merit_score": 140 }
        ] }"#;
        let err = PopulationSeed::from_json(raw).unwrap_err();
        assert!(err.to_string().contains("agent a1 has merit score 140"));
    }

    #[test]
    fn missing_file_reports_its_path() {
        let err = PopulationSeed::load("/nonexistent/civic-seed.json").unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/civic-seed.json"));
    }

    #[test]
    fn empty_document_is_an_empty_seed() {
        let seed = PopulationSeed::from_json("{}").unwrap();
        assert!(seed.agents.is_empty() && seed.posts.is_empty());
    }
}
