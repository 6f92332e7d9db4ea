//! Configuration for civic-daemon

use civic_storage::RetryPolicy;
use civic_textgen::TextGenConfig;
use civic_types::GovernanceConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main daemon configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Election, orchestration and eligibility settings
    #[serde(default)]
    pub governance: GovernanceConfig,

    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Scheduler configuration
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Text generation backend
    #[serde(default)]
    pub textgen: TextGenConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Storage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    /// In-memory storage (for development/testing)
    #[default]
    Memory,

    /// PostgreSQL storage
    Postgres {
        /// Connection URL
        url: String,

        /// Maximum connections in pool
        #[serde(default = "default_pool_size")]
        max_connections: u32,

        /// Connection timeout in seconds
        #[serde(default = "default_connection_timeout")]
        connect_timeout_secs: u64,
    },
}

/// Scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Election tick interval in seconds
    #[serde(default = "default_election_interval")]
    pub election_interval_secs: u64,

    /// Orchestration run interval in seconds
    #[serde(default = "default_orchestration_interval")]
    pub orchestration_interval_secs: u64,

    /// Retry applied to every storage call
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            election_interval_secs: default_election_interval(),
            orchestration_interval_secs: default_orchestration_interval(),
            retry: RetryConfig::default(),
        }
    }
}

impl SchedulerConfig {
    pub fn election_interval(&self) -> Duration {
        Duration::from_secs(self.election_interval_secs.max(1))
    }

    pub fn orchestration_interval(&self) -> Duration {
        Duration::from_secs(self.orchestration_interval_secs.max(1))
    }
}

/// Storage retry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_backoff_factor")]
    pub factor: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            factor: default_backoff_factor(),
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            base_delay: Duration::from_millis(self.base_delay_ms),
            factor: self.factor.max(1),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// Default value helpers
fn default_pool_size() -> u32 {
    10
}

fn default_connection_timeout() -> u64 {
    5
}

fn default_election_interval() -> u64 {
    3600
}

fn default_orchestration_interval() -> u64 {
    86400
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    200
}

fn default_backoff_factor() -> u32 {
    2
}

fn default_log_level() -> String {
    "info".to_string()
}

impl DaemonConfig {
    /// Load configuration: defaults, then an optional file, then `CIVIC_*`
    /// environment variables (`__` separates nested keys, e.g.
    /// `CIVIC_SCHEDULER__ELECTION_INTERVAL_SECS`).
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&DaemonConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("CIVIC")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DaemonConfig::default();
        assert!(matches!(config.storage, StorageConfig::Memory));
        assert_eq!(config.governance.election.total_delegates, 100);
        assert_eq!(config.governance.orchestration.cell_size, 15);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_scheduler_defaults() {
        let config = SchedulerConfig::default();
        assert_eq!(config.election_interval(), Duration::from_secs(3600));
        assert_eq!(config.orchestration_interval(), Duration::from_secs(86400));
        let policy = config.retry.policy();
        assert_eq!(policy, RetryPolicy::default());
    }

    #[test]
    fn test_partial_json_layers_over_defaults() {
        let config: DaemonConfig = serde_json::from_str(
            r#"{
                "governance": { "election": { "total_delegates": 40 } },
                "storage": { "type": "postgres", "url": "postgres://localhost/civic" }
            }"#,
        )
        .unwrap();
        assert_eq!(config.governance.election.total_delegates, 40);
        assert_eq!(config.governance.election.max_candidates, 10);
        match config.storage {
            StorageConfig::Postgres {
                max_connections,
                connect_timeout_secs,
                ..
            } => {
                assert_eq!(max_connections, 10);
                assert_eq!(connect_timeout_secs, 5);
            }
            StorageConfig::Memory => panic!("expected postgres"),
        }
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let config = DaemonConfig::load(None).unwrap();
        assert_eq!(config.scheduler.election_interval_secs, 3600);
        assert_eq!(config.governance.orchestration.max_topics, 5);
    }
}
