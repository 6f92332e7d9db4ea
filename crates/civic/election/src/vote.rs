//! Vote Simulator
//!
//! Each voter in a specialization group casts one weighted draw over the
//! candidate slate. The generator is seeded from the election id and the
//! group, never from process-global state, so a re-run with identical inputs
//! reproduces identical totals and winner.

use crate::error::{ElectionError, ElectionResult};
use civic_types::{Agent, AgentId, Candidate, ElectionId, Specialization};
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Lower bound on any candidate's weight
pub const MIN_WEIGHT: f64 = 0.05;

/// Added when the candidate shares the voting group's specialization
pub const HOME_BONUS: f64 = 0.15;

/// `max(MIN_WEIGHT, merit/100 + HOME_BONUS if home group)`
pub fn candidate_weight(candidate: &Candidate, group: &Specialization) -> f64 {
    let bonus = if &candidate.specialization == group {
        HOME_BONUS
    } else {
        0.0
    };
    (candidate.merit_score / 100.0 + bonus).max(MIN_WEIGHT)
}

/// Deterministic per-group seed derived from the election id
pub fn group_seed(election_id: &ElectionId, group: &Specialization) -> u64 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(election_id.as_str().as_bytes());
    hasher.update(&[0x1f]);
    hasher.update(group.as_str().as_bytes());
    let digest = hasher.finalize();
    let mut seed = [0u8; 8];
    seed.copy_from_slice(&digest.as_bytes()[..8]);
    u64::from_le_bytes(seed)
}

/// Outcome of one group's vote
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupVote {
    pub specialization: Specialization,
    pub winner_agent_id: AgentId,
    /// Every slate candidate, zero when unvoted
    pub vote_totals: BTreeMap<AgentId, u32>,
}

/// Simulates group votes for one election over a fixed slate
#[derive(Debug, Clone)]
pub struct VoteSimulator {
    election_id: ElectionId,
    slate: Vec<Candidate>,
}

impl VoteSimulator {
    pub fn new(election_id: ElectionId, slate: Vec<Candidate>) -> ElectionResult<Self> {
        if slate.is_empty() {
            return Err(ElectionError::NoCandidates);
        }
        Ok(Self { election_id, slate })
    }

    pub fn slate(&self) -> &[Candidate] {
        &self.slate
    }

    /// Run the vote for `group`. Only voters of that specialization cast a
    /// ballot; they draw in ascending id order.
    pub fn simulate_group(
        &self,
        group: &Specialization,
        voters: &[Agent],
    ) -> ElectionResult<GroupVote> {
        let weights: Vec<f64> = self
            .slate
            .iter()
            .map(|c| candidate_weight(c, group))
            .collect();
        let dist = WeightedIndex::new(&weights).map_err(|_| ElectionError::NoCandidates)?;
        let mut rng = StdRng::seed_from_u64(group_seed(&self.election_id, group));

        let mut ballots: Vec<&AgentId> = voters
            .iter()
            .filter(|v| &v.specialization == group)
            .map(|v| &v.id)
            .collect();
        ballots.sort();

        let mut counts = vec![0u32; self.slate.len()];
        for _ in &ballots {
            counts[dist.sample(&mut rng)] += 1;
        }

        let winner = self.pick_winner(&counts);
        let vote_totals = self
            .slate
            .iter()
            .zip(&counts)
            .map(|(c, n)| (c.agent_id.clone(), *n))
            .collect();

        tracing::debug!(
            election_id = %self.election_id,
            specialization = %group,
            voters = ballots.len(),
            winner = %winner.agent_id,
            "Group vote simulated"
        );

        Ok(GroupVote {
            specialization: group.clone(),
            winner_agent_id: winner.agent_id.clone(),
            vote_totals,
        })
    }

    // Most votes, then merit, then lowest id.
    fn pick_winner(&self, counts: &[u32]) -> &Candidate {
        let mut best = 0;
        for i in 1..self.slate.len() {
            let (c, b) = (&self.slate[i], &self.slate[best]);
            let ordering = counts[i]
                .cmp(&counts[best])
                .then_with(|| {
                    c.merit_score
                        .partial_cmp(&b.merit_score)
                        .unwrap_or(Ordering::Equal)
                })
                .then_with(|| b.agent_id.cmp(&c.agent_id));
            if ordering == Ordering::Greater {
                best = i;
            }
        }
        &self.slate[best]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn candidate(id: &str, spec: &str, merit: f64) -> Candidate {
        Candidate {
            election_id: ElectionId::new("E1"),
            agent_id: id.into(),
            specialization: spec.into(),
            merit_score: merit,
            manifesto: String::new(),
            nominated_at: Utc::now(),
        }
    }

    fn voters(spec: &str, count: usize) -> Vec<Agent> {
        (0..count)
            .map(|i| Agent::new(format!("{spec}-voter-{i:03}").as_str(), spec, 50.0))
            .collect()
    }

    fn slate() -> Vec<Candidate> {
        vec![
            candidate("c1", "tax", 80.0),
            candidate("c2", "health", 60.0),
            candidate("c3", "legal", 40.0),
        ]
    }

    #[test]
    fn weight_adds_home_bonus_and_respects_floor() {
        let tax = Specialization::new("tax");
        assert!((candidate_weight(&candidate("a", "tax", 80.0), &tax) - 0.95).abs() < 1e-12);
        assert!((candidate_weight(&candidate("b", "legal", 40.0), &tax) - 0.40).abs() < 1e-12);
        assert_eq!(candidate_weight(&candidate("c", "legal", 0.0), &tax), MIN_WEIGHT);
    }

    #[test]
    fn seed_depends_on_election_and_group() {
        let e1 = ElectionId::new("E1");
        let e2 = ElectionId::new("E2");
        let tax = Specialization::new("tax");
        let legal = Specialization::new("legal");
        assert_eq!(group_seed(&e1, &tax), group_seed(&e1, &tax));
        assert_ne!(group_seed(&e1, &tax), group_seed(&e2, &tax));
        assert_ne!(group_seed(&e1, &tax), group_seed(&e1, &legal));
    }

    #[test]
    fn same_seed_and_inputs_reproduce_identical_totals() {
        let sim = VoteSimulator::new(ElectionId::new("E1"), slate()).unwrap();
        let group = voters("tax", 5);
        let first = sim.simulate_group(&"tax".into(), &group).unwrap();
        let second = sim.simulate_group(&"tax".into(), &group).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.vote_totals.values().sum::<u32>(), 5);
        assert_eq!(first.vote_totals.len(), 3);
    }

    #[test]
    fn voter_order_does_not_change_the_outcome() {
        let sim = VoteSimulator::new(ElectionId::new("E1"), slate()).unwrap();
        let group = voters("tax", 12);
        let mut reversed = group.clone();
        reversed.reverse();
        assert_eq!(
            sim.simulate_group(&"tax".into(), &group).unwrap(),
            sim.simulate_group(&"tax".into(), &reversed).unwrap()
        );
    }

    #[test]
    fn weighted_draws_favor_the_strongest_home_candidate() {
        let sim = VoteSimulator::new(ElectionId::new("E1"), slate()).unwrap();
        let outcome = sim.simulate_group(&"tax".into(), &voters("tax", 500)).unwrap();
        assert_eq!(outcome.winner_agent_id.as_str(), "c1");
        let c1 = outcome.vote_totals[&AgentId::new("c1")];
        let c3 = outcome.vote_totals[&AgentId::new("c3")];
        assert!(c1 > c3);
    }

    #[test]
    fn empty_group_falls_back_to_merit() {
        let sim = VoteSimulator::new(ElectionId::new("E1"), slate()).unwrap();
        let outcome = sim.simulate_group(&"tax".into(), &[]).unwrap();
        assert_eq!(outcome.winner_agent_id.as_str(), "c1");
        assert!(outcome.vote_totals.values().all(|v| *v == 0));
    }

    #[test]
    fn vote_ties_break_on_merit_then_lowest_id() {
        let sim = VoteSimulator::new(
            ElectionId::new("E1"),
            vec![
                candidate("b", "tax", 70.0),
                candidate("a", "tax", 70.0),
                candidate("c", "tax", 60.0),
            ],
        )
        .unwrap();
        assert_eq!(sim.pick_winner(&[1, 1, 1]).agent_id.as_str(), "a");
        assert_eq!(sim.pick_winner(&[0, 0, 2]).agent_id.as_str(), "c");
    }

    #[test]
    fn empty_slate_is_rejected() {
        assert!(matches!(
            VoteSimulator::new(ElectionId::new("E1"), vec![]),
            Err(ElectionError::NoCandidates)
        ));
    }
}
