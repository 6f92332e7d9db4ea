//! Cell Builder

use civic_types::{Agent, AgentId, Cell, EligibilityPolicy, Specialization};
use std::collections::BTreeMap;

/// Partition active, eligible agents into cells of at most `cell_size`.
///
/// Specializations are visited in lexical order and members sorted by id, so
/// a specialization with `k` members yields `ceil(k / cell_size)` cells named
/// `<specialization>-cell-<n>` (1-based).
pub fn build_cells(agents: &[Agent], policy: &EligibilityPolicy, cell_size: usize) -> Vec<Cell> {
    let cell_size = cell_size.max(1);
    let mut groups: BTreeMap<&Specialization, Vec<&AgentId>> = BTreeMap::new();
    for agent in agents.iter().filter(|a| policy.is_cell_member(a)) {
        groups.entry(&agent.specialization).or_default().push(&agent.id);
    }

    let mut cells = Vec::new();
    for (specialization, mut members) in groups {
        members.sort();
        members.dedup();
        for (n, chunk) in members.chunks(cell_size).enumerate() {
            cells.push(Cell {
                cell_name: format!("{}-cell-{}", specialization, n + 1),
                specialization: specialization.clone(),
                member_ids: chunk.iter().map(|id| (*id).clone()).collect(),
            });
        }
    }
    cells
}

/// Indices of the two cells that summarise topic `index` out of `cells`.
/// The pair only repeats a cell when there is exactly one.
pub fn cell_pair(index: usize, cells: usize) -> Option<(usize, usize)> {
    if cells == 0 {
        return None;
    }
    Some((index % cells, (index + 1) % cells))
}

#[cfg(test)]
mod tests {
    use super::*;
    use civic_types::ExclusionRule;

    fn population(spec: &str, count: usize) -> Vec<Agent> {
        (0..count)
            .map(|i| Agent::new(format!("{spec}-{i:02}").as_str(), spec, 50.0))
            .collect()
    }

    #[test]
    fn chunks_each_specialization_by_cell_size() {
        let mut agents = population("tax", 31);
        agents.extend(population("health", 15));
        let cells = build_cells(&agents, &EligibilityPolicy::default(), 15);

        let names: Vec<&str> = cells.iter().map(|c| c.cell_name.as_str()).collect();
        assert_eq!(
            names,
            vec!["health-cell-1", "tax-cell-1", "tax-cell-2", "tax-cell-3"]
        );
        assert_eq!(cells[1].len(), 15);
        assert_eq!(cells[3].len(), 1);
        assert_eq!(cells[3].member_ids[0].as_str(), "tax-30");
    }

    #[test]
    fn inactive_suspended_and_excluded_agents_are_left_out() {
        let agents = vec![
            Agent::new("a", "tax", 50.0),
            Agent::new("b", "tax", 50.0).inactive(),
            Agent::new("c", "tax", 50.0).suspended(),
            Agent::new("supreme", "tax", 100.0),
        ];
        let policy = EligibilityPolicy::new(0, ExclusionRule::sentinel("supreme"));
        let cells = build_cells(&agents, &policy, 15);

        assert_eq!(cells.len(), 1);
        assert_eq!(cells[0].member_ids, vec![AgentId::new("a")]);
    }

    #[test]
    fn pair_uses_neighbouring_cells() {
        assert_eq!(cell_pair(0, 3), Some((0, 1)));
        assert_eq!(cell_pair(2, 3), Some((2, 0)));
        assert_eq!(cell_pair(4, 1), Some((0, 0)));
        assert_eq!(cell_pair(0, 0), None);
    }
}
