//! Governance configuration
//!
//! Every field carries a serde default so partial configuration files layer
//! cleanly over the built-in values.

use crate::{ConfigError, ConfigResult, EligibilityPolicy};
use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Top-level engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GovernanceConfig {
    #[serde(default)]
    pub election: ElectionConfig,

    #[serde(default)]
    pub orchestration: OrchestrationConfig,

    #[serde(default)]
    pub eligibility: EligibilityPolicy,
}

impl GovernanceConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        self.election.validate()?;
        self.orchestration.validate()
    }
}

/// Election cycle configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElectionConfig {
    /// Delegates apportioned across specializations per election
    #[serde(default = "default_total_delegates")]
    pub total_delegates: u32,

    #[serde(default = "default_max_candidates")]
    pub max_candidates: usize,

    #[serde(default = "default_min_candidates")]
    pub min_candidates: usize,

    /// Merit an agent needs to qualify for the slate before widening
    #[serde(default = "default_candidate_merit_floor")]
    pub candidate_merit_floor: f64,

    #[serde(default = "default_primary_days")]
    pub primary_duration_days: i64,

    #[serde(default = "default_general_days")]
    pub general_duration_days: i64,

    /// Time from election start until the next cycle may begin
    #[serde(default = "default_term_days")]
    pub term_length_days: i64,

    /// Minimum spacing of campaign refreshes and debate updates
    #[serde(default = "default_refresh_hours")]
    pub refresh_interval_hours: i64,
}

impl Default for ElectionConfig {
    fn default() -> Self {
        Self {
            total_delegates: default_total_delegates(),
            max_candidates: default_max_candidates(),
            min_candidates: default_min_candidates(),
            candidate_merit_floor: default_candidate_merit_floor(),
            primary_duration_days: default_primary_days(),
            general_duration_days: default_general_days(),
            term_length_days: default_term_days(),
            refresh_interval_hours: default_refresh_hours(),
        }
    }
}

impl ElectionConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.min_candidates > self.max_candidates {
            return Err(ConfigError::CandidateBounds {
                min: self.min_candidates,
                max: self.max_candidates,
            });
        }
        if self.max_candidates == 0 {
            return Err(ConfigError::Zero {
                field: "max_candidates",
            });
        }
        if self.total_delegates == 0 {
            return Err(ConfigError::Zero {
                field: "total_delegates",
            });
        }
        Ok(())
    }

    pub fn primary_duration(&self) -> Duration {
        Duration::days(self.primary_duration_days)
    }

    pub fn general_duration(&self) -> Duration {
        Duration::days(self.general_duration_days)
    }

    pub fn term_length(&self) -> Duration {
        Duration::days(self.term_length_days)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::hours(self.refresh_interval_hours)
    }
}

/// Orchestration run configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestrationConfig {
    #[serde(default = "default_cell_size")]
    pub cell_size: usize,

    #[serde(default = "default_max_topics")]
    pub max_topics: usize,

    /// Trailing window for trending topics
    #[serde(default = "default_window_hours")]
    pub window_hours: i64,

    #[serde(default = "default_posts_per_summary")]
    pub posts_per_summary: usize,

    /// Upper bound on each excerpt, in characters
    #[serde(default = "default_excerpt_chars")]
    pub excerpt_chars: usize,

    /// Scores at or above this are conflicts
    #[serde(default = "default_conflict_threshold")]
    pub conflict_threshold: f64,
}

impl Default for OrchestrationConfig {
    fn default() -> Self {
        Self {
            cell_size: default_cell_size(),
            max_topics: default_max_topics(),
            window_hours: default_window_hours(),
            posts_per_summary: default_posts_per_summary(),
            excerpt_chars: default_excerpt_chars(),
            conflict_threshold: default_conflict_threshold(),
        }
    }
}

impl OrchestrationConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.cell_size == 0 {
            return Err(ConfigError::Zero { field: "cell_size" });
        }
        if self.posts_per_summary == 0 {
            return Err(ConfigError::Zero {
                field: "posts_per_summary",
            });
        }
        if self.excerpt_chars == 0 {
            return Err(ConfigError::Zero {
                field: "excerpt_chars",
            });
        }
        if !(0.0..=1.0).contains(&self.conflict_threshold) {
            return Err(ConfigError::OutOfUnitRange {
                field: "conflict_threshold",
                value: self.conflict_threshold,
            });
        }
        Ok(())
    }

    pub fn window(&self) -> Duration {
        Duration::hours(self.window_hours)
    }
}

// Default value helpers
fn default_total_delegates() -> u32 {
    100
}

fn default_max_candidates() -> usize {
    10
}

fn default_min_candidates() -> usize {
    3
}

fn default_candidate_merit_floor() -> f64 {
    50.0
}

fn default_primary_days() -> i64 {
    7
}

fn default_general_days() -> i64 {
    7
}

fn default_term_days() -> i64 {
    30
}

fn default_refresh_hours() -> i64 {
    24
}

fn default_cell_size() -> usize {
    15
}

fn default_max_topics() -> usize {
    5
}

fn default_window_hours() -> i64 {
    24
}

fn default_posts_per_summary() -> usize {
    3
}

fn default_excerpt_chars() -> usize {
    200
}

fn default_conflict_threshold() -> f64 {
    0.35
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = GovernanceConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.orchestration.cell_size, 15);
        assert_eq!(config.orchestration.max_topics, 5);
        assert_eq!(config.orchestration.conflict_threshold, 0.35);
        assert_eq!(config.election.refresh_interval(), Duration::days(1));
    }

    #[test]
    fn inverted_candidate_bounds_are_rejected() {
        let config = ElectionConfig {
            min_candidates: 5,
            max_candidates: 2,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::CandidateBounds { min: 5, max: 2 })
        );
    }

    #[test]
    fn threshold_outside_unit_range_is_rejected() {
        let config = OrchestrationConfig {
            conflict_threshold: 1.5,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfUnitRange { .. })
        ));
    }

    #[test]
    fn partial_documents_fill_in_defaults() {
        let config: GovernanceConfig =
            serde_json::from_str(r#"{"election":{"total_delegates":538}}"#).unwrap();
        assert_eq!(config.election.total_delegates, 538);
        assert_eq!(config.election.max_candidates, 10);
        assert_eq!(config.orchestration, OrchestrationConfig::default());
    }
}
