//! Agent records as supplied by the population registry

use crate::{AgentId, Specialization};
use serde::{Deserialize, Serialize};

/// Standing of an agent in the governance hierarchy
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Rank {
    /// Ordinary population member
    #[default]
    Member,
    /// Former office holder or delegate
    Delegate,
    /// Top rank, held by the winner of the latest election
    Leader,
}

impl Rank {
    /// The rank awarded to an election winner
    pub const TOP: Rank = Rank::Leader;

    /// The rank prior top-rank holders fall back to
    pub const DEMOTED: Rank = Rank::Delegate;
}

/// Registry vetting outcome for an agent
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VettingStatus {
    Pending,
    Approved,
    Rejected,
}

/// An agent in the population.
///
/// Owned by the population registry. The governance engine only reads agents,
/// except for rank mutation after an election closes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    /// Human-readable name; empty means "use the id"
    #[serde(default)]
    pub name: String,
    pub specialization: Specialization,
    /// Fitness proxy bounded to [0, 100]
    pub merit_score: f64,
    /// Absent trust never excludes an agent
    #[serde(default)]
    pub trust_score: Option<i64>,
    #[serde(default)]
    pub rank: Rank,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_suspended: bool,
    /// Absent vetting never excludes an agent
    #[serde(default)]
    pub vetting_status: Option<VettingStatus>,
}

fn default_true() -> bool {
    true
}

impl Agent {
    /// Create an active, unsuspended agent with no trust or vetting data
    pub fn new(
        id: impl Into<AgentId>,
        specialization: impl Into<Specialization>,
        merit_score: f64,
    ) -> Self {
        let id = id.into();
        Self {
            name: id.to_string(),
            id,
            specialization: specialization.into(),
            merit_score: Self::bound_merit(merit_score),
            trust_score: None,
            rank: Rank::Member,
            is_active: true,
            is_suspended: false,
            vetting_status: None,
        }
    }

    /// Clamp a raw merit value into [0, 100]. Non-finite input reads as 0.
    pub fn bound_merit(score: f64) -> f64 {
        if score.is_nan() {
            0.0
        } else {
            score.clamp(0.0, 100.0)
        }
    }

    pub fn has_valid_merit(&self) -> bool {
        (0.0..=100.0).contains(&self.merit_score)
    }

    /// Name for human-readable text, falling back to the id
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            self.id.as_str()
        } else {
            &self.name
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_trust(mut self, trust: i64) -> Self {
        self.trust_score = Some(trust);
        self
    }

    pub fn with_rank(mut self, rank: Rank) -> Self {
        self.rank = rank;
        self
    }

    pub fn with_vetting(mut self, status: VettingStatus) -> Self {
        self.vetting_status = Some(status);
        self
    }

    pub fn suspended(mut self) -> Self {
        self.is_suspended = true;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }
}
