//! Election Cycle Engine
//!
//! Runs periodic delegate-based elections over an agent population.
//!
//! # Components
//!
//! - [`apportion`]: converts per-specialization population counts into an
//!   exact-total delegate allocation with at least one delegate each.
//! - [`select_candidates`]: merit-ranked candidate slate within
//!   `min_candidates..=max_candidates`.
//! - [`VoteSimulator`]: weighted vote per specialization, seeded from the
//!   election id so every re-run reproduces the same totals and winner.
//! - [`ElectionController`]: time-driven state machine
//!   `Primary -> General -> Closed -> next cycle`, one idempotent step per tick.

#![deny(unsafe_code)]

mod apportionment;
mod candidates;
mod controller;
mod error;
mod report;
mod vote;

pub use apportionment::{apportion, Apportionment};
pub use candidates::{build_slate, select_candidates, CandidateRules};
pub use controller::ElectionController;
pub use error::{ElectionError, ElectionResult};
pub use report::{TickAction, TickReport};
pub use vote::{candidate_weight, group_seed, GroupVote, VoteSimulator, HOME_BONUS, MIN_WEIGHT};
