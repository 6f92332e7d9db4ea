//! Candidate Selector

use crate::error::{ElectionError, ElectionResult};
use chrono::{DateTime, Utc};
use civic_textgen::{generate_or_template, TextGenerator};
use civic_types::{Agent, Candidate, ElectionConfig, ElectionId};
use std::cmp::Ordering;

/// Slate bounds and merit qualification
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidateRules {
    pub min_candidates: usize,
    pub max_candidates: usize,
    pub merit_floor: f64,
}

impl CandidateRules {
    pub fn from_config(config: &ElectionConfig) -> Self {
        Self {
            min_candidates: config.min_candidates,
            max_candidates: config.max_candidates,
            merit_floor: config.candidate_merit_floor,
        }
    }
}

impl Default for CandidateRules {
    fn default() -> Self {
        Self::from_config(&ElectionConfig::default())
    }
}

fn by_merit(a: &Agent, b: &Agent) -> Ordering {
    b.merit_score
        .partial_cmp(&a.merit_score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.id.cmp(&b.id))
}

/// Select the candidate slate from already-eligible agents.
///
/// Agents at or above the merit floor are ranked by merit (ties by id) and
/// the top `max_candidates` taken. When fewer than `min_candidates` qualify,
/// the cut widens to the top `min_candidates` of the whole eligible list.
pub fn select_candidates(eligible: &[Agent], rules: &CandidateRules) -> ElectionResult<Vec<Agent>> {
    if eligible.is_empty() {
        return Err(ElectionError::NoEligibleAgents);
    }

    let mut ranked: Vec<&Agent> = eligible.iter().collect();
    ranked.sort_by(|a, b| by_merit(a, b));

    let qualified = ranked
        .iter()
        .filter(|a| a.merit_score >= rules.merit_floor)
        .count();

    let minimum = rules.min_candidates.max(1);
    let take = if qualified >= minimum {
        qualified.min(rules.max_candidates)
    } else {
        tracing::debug!(
            qualified = qualified,
            min_candidates = minimum,
            "Widening candidate cut below the merit floor"
        );
        minimum
    };

    let slate: Vec<Agent> = ranked.into_iter().take(take).cloned().collect();
    if slate.is_empty() {
        return Err(ElectionError::NoCandidates);
    }
    Ok(slate)
}

fn manifesto_template(agent: &Agent) -> String {
    format!(
        "{} stands for the {} specialization with a merit score of {:.1}.",
        agent.display_name(),
        agent.specialization,
        agent.merit_score
    )
}

/// Turn selected agents into candidate rows, each with a manifesto snapshot.
pub async fn build_slate(
    election_id: &ElectionId,
    selected: &[Agent],
    generator: &dyn TextGenerator,
    now: DateTime<Utc>,
) -> Vec<Candidate> {
    let mut slate = Vec::with_capacity(selected.len());
    for agent in selected {
        let prompt = format!(
            "Write a two-sentence campaign manifesto for {}, a {} specialist with merit {:.0}/100.",
            agent.display_name(),
            agent.specialization,
            agent.merit_score
        );
        let manifesto = generate_or_template(generator, &prompt, || manifesto_template(agent)).await;
        slate.push(Candidate {
            election_id: election_id.clone(),
            agent_id: agent.id.clone(),
            specialization: agent.specialization.clone(),
            merit_score: agent.merit_score,
            manifesto,
            nominated_at: now,
        });
    }
    slate
}

#[cfg(test)]
mod tests {
    use super::*;
    use civic_textgen::TemplateGenerator;

    fn agents(merits: &[f64]) -> Vec<Agent> {
        merits
            .iter()
            .enumerate()
            .map(|(i, m)| Agent::new(format!("agent-{i:02}").as_str(), "tax", *m))
            .collect()
    }

    fn rules(min: usize, max: usize) -> CandidateRules {
        CandidateRules {
            min_candidates: min,
            max_candidates: max,
            merit_floor: 50.0,
        }
    }

    #[test]
    fn takes_top_merit_up_to_max() {
        let pool = agents(&[55.0, 90.0, 70.0, 60.0, 80.0]);
        let slate = select_candidates(&pool, &rules(2, 3)).unwrap();
        let merits: Vec<f64> = slate.iter().map(|a| a.merit_score).collect();
        assert_eq!(merits, vec![90.0, 80.0, 70.0]);
    }

    #[test]
    fn equal_merit_breaks_ties_by_id() {
        let pool = agents(&[70.0, 70.0, 70.0]);
        let slate = select_candidates(&pool, &rules(1, 2)).unwrap();
        assert_eq!(slate[0].id.as_str(), "agent-00");
        assert_eq!(slate[1].id.as_str(), "agent-01");
    }

    #[test]
    fn widens_below_merit_floor_to_reach_minimum() {
        let pool = agents(&[90.0, 20.0, 30.0, 10.0]);
        let slate = select_candidates(&pool, &rules(3, 10)).unwrap();
        let merits: Vec<f64> = slate.iter().map(|a| a.merit_score).collect();
        assert_eq!(merits, vec![90.0, 30.0, 20.0]);
    }

    #[test]
    fn small_population_yields_whatever_exists() {
        let pool = agents(&[10.0]);
        let slate = select_candidates(&pool, &rules(3, 10)).unwrap();
        assert_eq!(slate.len(), 1);
    }

    #[test]
    fn empty_population_is_a_precondition_failure() {
        assert!(matches!(
            select_candidates(&[], &rules(3, 10)),
            Err(ElectionError::NoEligibleAgents)
        ));
    }

    #[tokio::test]
    async fn slate_snapshots_specialization_and_merit() {
        let pool = agents(&[80.0, 60.0]);
        let id = ElectionId::new("E1");
        let now = Utc::now();
        let slate = build_slate(&id, &pool, &TemplateGenerator, now).await;

        assert_eq!(slate.len(), 2);
        assert_eq!(slate[0].election_id, id);
        assert_eq!(slate[0].merit_score, 80.0);
        assert_eq!(slate[0].specialization.as_str(), "tax");
        assert!(slate[0].manifesto.contains("agent-00"));
        assert_eq!(slate[1].nominated_at, now);
    }
}
