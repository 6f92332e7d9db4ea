//! Civic Governance Domain Types
//!
//! This crate defines the records shared by the election cycle and the
//! orchestration engine of a simulated agent civilization.
//!
//! # Key Concepts
//!
//! - **Specialization**: the grouping key for delegate apportionment and
//!   cell formation (the "state" of a delegate election).
//! - **Election**: a forward-only lifecycle `Primary -> General -> Closed`.
//! - **Delegates**: apportioned per specialization, awarded to the winner of
//!   each specialization's simulated vote.
//! - **Cells**: fixed-size same-specialization groups producing independent
//!   summaries that are cross-checked for conflict.
//! - **Exclusion**: an explicit rule value, never a hidden constant, that keeps
//!   sentinel identities out of every computation.
//!
//! # Architecture
//!
//! This is a pure types crate with no runtime dependencies. All records
//! implement `Clone`, `Debug`, `Serialize`, `Deserialize`. IDs use the
//! newtype pattern and implement `Display` and `new()`.

#![deny(unsafe_code)]

mod agent;
mod config;
mod election;
mod eligibility;
mod errors;
mod ids;
mod orchestration;
mod status;
pub mod time;

pub use agent::*;
pub use config::*;
pub use election::*;
pub use eligibility::*;
pub use errors::*;
pub use ids::*;
pub use orchestration::*;
pub use status::*;
