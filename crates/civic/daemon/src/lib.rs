//! Civic Daemon library
//!
//! Components of the `civicd` binary:
//! - Layered configuration
//! - Storage backend selection and population seeding
//! - Periodic scheduler for election ticks and orchestration runs

pub mod config;
pub mod error;
pub mod scheduler;
pub mod seed;
pub mod storage;

pub use config::DaemonConfig;
pub use error::{DaemonError, DaemonResult};
pub use scheduler::{CycleReport, Scheduler, SchedulerStats};
pub use seed::PopulationSeed;
pub use storage::open_storage;
