use crate::indexer::IndexerError;
use crate::ledger::{Confirmation, LedgerError};

use std::fmt;
use std::time::Duration;

/// The ledger height a scenario needs the indexer to have processed.
///
/// Taken by value: one barrier invocation consumes one target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SyncTarget(pub u64);

impl SyncTarget {
    pub fn height(self) -> u64 {
        self.0
    }
}

impl From<&Confirmation> for SyncTarget {
    fn from(confirmation: &Confirmation) -> Self {
        SyncTarget(confirmation.height)
    }
}

impl fmt::Display for SyncTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One poll's worth of state inside a single barrier call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncAttempt {
    /// Polls that saw the indexer below target so far.
    pub attempt_number: u32,
    pub observed_height: u64,
    /// Time spent sleeping between polls.
    pub elapsed: Duration,
}

/// Barrier tuning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BarrierConfig {
    /// Upper bound on polls per barrier call.
    pub max_attempts: u32,
    pub poll_interval: Duration,
    /// Stop at once when the indexer reports indexing errors.
    pub fail_on_indexing_errors: bool,
}

impl Default for BarrierConfig {
    fn default() -> Self {
        Self {
            max_attempts: 20,
            poll_interval: Duration::from_secs(1),
            fail_on_indexing_errors: true,
        }
    }
}

impl BarrierConfig {
    /// Longest a single barrier call can spend sleeping before it gives up.
    pub fn worst_case_wait(&self) -> Duration {
        self.poll_interval * self.max_attempts.saturating_sub(1)
    }
}

/// What a satisfied barrier call observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    pub target: SyncTarget,
    pub observed_height: u64,
    /// Number of polls made, including the satisfying one.
    pub polls: u32,
    pub elapsed: Duration,
}

/// Errors that abort the scenario waiting on the barrier
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(
        "indexer did not reach height {target} after {attempts} attempts ({}s), last observed height {last_observed}",
        .elapsed.as_secs()
    )]
    Timeout {
        target: SyncTarget,
        last_observed: u64,
        attempts: u32,
        elapsed: Duration,
    },

    /// The progress query exhausted its own retry budget.
    #[error("indexer unreachable while waiting for height {target}: {source}")]
    Transport {
        target: SyncTarget,
        #[source]
        source: IndexerError,
    },

    #[error("indexer reports indexing errors at height {observed_height} (target {target})")]
    IndexerFailed {
        target: SyncTarget,
        observed_height: u64,
    },

    #[error("progress query failed: {0}")]
    Indexer(#[source] IndexerError),

    #[error("ledger height query failed: {0}")]
    Ledger(#[from] LedgerError),
}
