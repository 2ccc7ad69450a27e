//! Sync barrier module
//!
//! Blocks a scenario between a ledger mutation and its read-model assertions until the indexer
//! has processed the height at which the mutation was confirmed.
//!
//! - `barrier`: the bounded polling state machine, its progress source and sleeper seams.
//! - `types`: targets, per-poll attempt state, tuning and errors.

/// Bounded polling state machine
pub mod barrier;
/// Barrier targets, reports and errors
mod types;

pub use barrier::{BarrierState, ProgressSource, Sleeper, SyncBarrier, TokioSleeper};
pub use types::*;
