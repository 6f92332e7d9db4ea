//! Civic governance storage abstractions.
//!
//! This crate defines the persistence contract the governance engine reads
//! and writes through:
//! - population reads (agents, recent posts) and rank mutation
//! - election lifecycle rows, candidate slates, per-specialization results
//! - cell summaries, conflict reports and verification records
//!
//! Design stance:
//! - No multi-row atomicity is assumed. Every write stands alone and callers
//!   resume from persisted election state after a partial failure.
//! - Transient backend failures are retried a small, fixed number of times at
//!   this boundary (see [`retry`]), never inside engine logic.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]
#![warn(rust_2018_idioms)]

mod error;
pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod retry;
mod traits;

pub use error::{StorageError, StorageResult};
pub use memory::InMemoryCivicStorage;
pub use retry::{retry, RetryPolicy};
pub use traits::{CivicStorage, ElectionStore, OrchestrationStore, PopulationStore};
