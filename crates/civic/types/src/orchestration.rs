//! Orchestration records: posts, cells, summaries and cross-checks

use crate::{AgentId, CrossCheckId, PostId, Specialization, SummaryId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An agent-generated post, as read from the content store
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub author_id: AgentId,
    pub topic: String,
    pub content: String,
    /// Agreement proxy bounded to [0, 1]
    pub consensus_score: f64,
    pub created_at: DateTime<Utc>,
}

/// A fixed-size group of same-specialization agents.
///
/// Recomputed on every orchestration run and only referenced by summaries.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub cell_name: String,
    pub specialization: Specialization,
    pub member_ids: Vec<AgentId>,
}

impl Cell {
    pub fn contains(&self, agent_id: &AgentId) -> bool {
        self.member_ids.contains(agent_id)
    }

    pub fn len(&self) -> usize {
        self.member_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.member_ids.is_empty()
    }
}

/// A summary of one topic produced by one cell
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CellSummary {
    pub id: SummaryId,
    pub cell_name: String,
    pub specialization: Specialization,
    pub topic: String,
    pub summary_text: String,
    pub source_post_ids: Vec<PostId>,
    /// Mean consensus score of the source posts, in [0, 1]
    pub avg_consensus: f64,
    /// Quality proxy of the summary, in [0, 1]
    pub quality_score: f64,
    pub created_at: DateTime<Utc>,
}

/// Outcome of comparing two independent summaries of the same topic
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// The summaries agree within the threshold
    Verified,
    /// The summaries diverge at or beyond the threshold
    Conflict,
}

/// A persisted conflict report or verification record
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CrossCheckRecord {
    pub id: CrossCheckId,
    pub topic: String,
    pub summary_a_id: SummaryId,
    pub summary_b_id: SummaryId,
    pub conflict_score: f64,
    pub classification: Classification,
    pub checked_at: DateTime<Utc>,
}
