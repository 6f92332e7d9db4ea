//! Apportionment Calculator
//!
//! `delegates[s] = max(1, round(count[s] / N * total))`, followed by a
//! correction pass that walks specializations in descending population order,
//! adding a delegate while under the total and removing one (never below one)
//! while over, until the sum is exact.

use crate::error::{ElectionError, ElectionResult};
use civic_types::{Agent, Specialization};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Delegate allocation per specialization
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Apportionment {
    delegates: BTreeMap<Specialization, u32>,
    population: BTreeMap<Specialization, usize>,
}

impl Apportionment {
    pub fn delegates(&self, specialization: &Specialization) -> Option<u32> {
        self.delegates.get(specialization).copied()
    }

    pub fn population(&self, specialization: &Specialization) -> usize {
        self.population.get(specialization).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u32 {
        self.delegates.values().sum()
    }

    pub fn len(&self) -> usize {
        self.delegates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.delegates.is_empty()
    }

    /// Specializations in lexical order with their delegates
    pub fn iter(&self) -> impl Iterator<Item = (&Specialization, u32)> {
        self.delegates.iter().map(|(s, d)| (s, *d))
    }

    pub fn into_map(self) -> BTreeMap<Specialization, u32> {
        self.delegates
    }
}

/// Apportion `total_delegates` across the specializations of `agents`.
///
/// Fails when `agents` is empty or when there are fewer delegates than
/// specializations.
pub fn apportion(agents: &[Agent], total_delegates: u32) -> ElectionResult<Apportionment> {
    let mut population: BTreeMap<Specialization, usize> = BTreeMap::new();
    for agent in agents {
        *population.entry(agent.specialization.clone()).or_default() += 1;
    }

    if population.is_empty() {
        return Err(ElectionError::NoEligibleAgents);
    }
    if (total_delegates as usize) < population.len() {
        return Err(ElectionError::InsufficientDelegates {
            total: total_delegates,
            specializations: population.len(),
        });
    }

    let n = agents.len() as f64;
    let mut delegates: BTreeMap<Specialization, u32> = population
        .iter()
        .map(|(spec, count)| {
            let share = (*count as f64 / n * f64::from(total_delegates)).round() as u32;
            (spec.clone(), share.max(1))
        })
        .collect();

    // Largest population first, lexical order among equals.
    let mut order: Vec<&Specialization> = population.keys().collect();
    order.sort_by(|a, b| population[*b].cmp(&population[*a]).then_with(|| a.cmp(b)));

    let target = u64::from(total_delegates);
    let mut sum: u64 = delegates.values().map(|d| u64::from(*d)).sum();
    let mut cursor = 0usize;
    let mut idle_steps = 0usize;

    while sum != target {
        let spec = order[cursor % order.len()];
        cursor += 1;
        let Some(slot) = delegates.get_mut(spec) else {
            continue;
        };

        if sum < target {
            *slot += 1;
            sum += 1;
            idle_steps = 0;
        } else if *slot > 1 {
            *slot -= 1;
            sum -= 1;
            idle_steps = 0;
        } else {
            idle_steps += 1;
            if idle_steps >= order.len() {
                // Every group sits at the floor; unreachable when
                // total_delegates >= specializations.
                return Err(ElectionError::InsufficientDelegates {
                    total: total_delegates,
                    specializations: order.len(),
                });
            }
        }
    }

    Ok(Apportionment {
        delegates,
        population,
    })
}
