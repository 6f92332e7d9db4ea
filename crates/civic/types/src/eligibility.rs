//! Eligibility and exclusion rules
//!
//! The sentinel identity that must never take part in elections or
//! orchestration is expressed as an [`ExclusionRule`] value that callers pass
//! in explicitly. Nothing in the engine hard-codes it.

use crate::{Agent, AgentId, VettingStatus};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Identities unconditionally excluded from every governance computation
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusionRule {
    /// Excluded agent ids
    #[serde(default)]
    pub agent_ids: BTreeSet<AgentId>,
    /// Excluded display names (case-insensitive)
    #[serde(default)]
    pub names: BTreeSet<String>,
}

impl ExclusionRule {
    /// A rule that excludes nobody
    pub fn none() -> Self {
        Self::default()
    }

    /// A rule excluding a single sentinel identity
    pub fn sentinel(id: impl Into<AgentId>) -> Self {
        Self::none().with_agent(id)
    }

    pub fn with_agent(mut self, id: impl Into<AgentId>) -> Self {
        self.agent_ids.insert(id.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.names.insert(name.into().to_lowercase());
        self
    }

    /// Whether this agent is excluded
    pub fn excludes(&self, agent: &Agent) -> bool {
        self.excludes_id(&agent.id) || self.names.contains(&agent.name.to_lowercase())
    }

    /// Whether this id is excluded (name-based exclusions need the full record)
    pub fn excludes_id(&self, id: &AgentId) -> bool {
        self.agent_ids.contains(id)
    }
}

/// Gate deciding which agents may take part in elections and orchestration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EligibilityPolicy {
    /// Agents with a known trust score below this floor are excluded
    #[serde(default)]
    pub trust_floor: i64,
    /// Sentinel exclusions
    #[serde(default)]
    pub exclusion: ExclusionRule,
}

impl Default for EligibilityPolicy {
    fn default() -> Self {
        Self {
            trust_floor: 0,
            exclusion: ExclusionRule::none(),
        }
    }
}

impl EligibilityPolicy {
    pub fn new(trust_floor: i64, exclusion: ExclusionRule) -> Self {
        Self {
            trust_floor,
            exclusion,
        }
    }

    /// Election eligibility: not excluded, not suspended, not rejected, and
    /// trust at or above the floor when a trust score is known.
    pub fn is_eligible(&self, agent: &Agent) -> bool {
        if self.exclusion.excludes(agent) || agent.is_suspended {
            return false;
        }
        if agent.vetting_status == Some(VettingStatus::Rejected) {
            return false;
        }
        agent
            .trust_score
            .map(|trust| trust >= self.trust_floor)
            .unwrap_or(true)
    }

    /// Orchestration membership additionally requires an active agent
    pub fn is_cell_member(&self, agent: &Agent) -> bool {
        agent.is_active && self.is_eligible(agent)
    }

    /// Filter a population down to eligible agents
    pub fn filter_eligible(&self, agents: Vec<Agent>) -> Vec<Agent> {
        agents.into_iter().filter(|a| self.is_eligible(a)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> EligibilityPolicy {
        EligibilityPolicy::new(10, ExclusionRule::sentinel("supreme").with_name("The Overseer"))
    }

    #[test]
    fn sentinel_is_always_excluded() {
        let sentinel = Agent::new("supreme", "tax", 100.0).with_trust(1_000);
        assert!(!policy().is_eligible(&sentinel));

        let by_name = Agent::new("other", "tax", 100.0).with_name("the overseer");
        assert!(!policy().is_eligible(&by_name));
    }

    #[test]
    fn absent_trust_never_excludes() {
        let agent = Agent::new("a", "tax", 50.0);
        assert!(policy().is_eligible(&agent));
    }

    #[test]
    fn low_trust_suspension_and_rejection_exclude() {
        assert!(!policy().is_eligible(&Agent::new("a", "tax", 50.0).with_trust(9)));
        assert!(policy().is_eligible(&Agent::new("a", "tax", 50.0).with_trust(10)));
        assert!(!policy().is_eligible(&Agent::new("a", "tax", 50.0).suspended()));
        assert!(!policy().is_eligible(
            &Agent::new("a", "tax", 50.0).with_vetting(VettingStatus::Rejected)
        ));
        assert!(policy().is_eligible(
            &Agent::new("a", "tax", 50.0).with_vetting(VettingStatus::Pending)
        ));
    }

    #[test]
    fn inactive_agents_vote_but_do_not_join_cells() {
        let agent = Agent::new("a", "tax", 50.0).inactive();
        assert!(policy().is_eligible(&agent));
        assert!(!policy().is_cell_member(&agent));
    }
}
