//! Orchestration Engine
//!
//! Partitions the active population into fixed-size cells, has two different
//! cells summarise each trending topic independently, and cross-checks every
//! pair of summaries for agreement.
//!
//! # Components
//!
//! - [`build_cells`]: chunks active, eligible agents per specialization.
//! - [`trending_topics`]: top topics by post volume in the trailing window.
//! - [`summarize`]: top posts by consensus, bounded excerpts, numeric proxies.
//! - [`conflict_score`] / [`classify`]: symmetric divergence and its verdict.
//! - [`Orchestrator`]: one complete run, persisting summaries and cross-checks.

#![deny(unsafe_code)]

mod cells;
mod conflict;
mod consensus;
mod error;
mod keys;
mod runner;
mod topics;

pub use cells::{build_cells, cell_pair};
pub use conflict::{classify, conflict_score, cross_check};
pub use consensus::{excerpt, quality_score, select_posts, summarize};
pub use error::{OrchestrationError, OrchestrationResult};
pub use keys::{cross_check_id, summary_id};
pub use runner::{OrchestrationReport, Orchestrator};
pub use topics::{trending_topics, TopicVolume};
