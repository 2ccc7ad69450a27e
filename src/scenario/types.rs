use crate::config::ConfigError;
use crate::indexer::{IndexerError, KeyError};
use crate::ledger::LedgerError;
use crate::sync::SyncError;

use std::fmt::Debug;
use std::time::Duration;

/// Errors that abort the current scenario.
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error("assertion failed: {what}: expected {expected}, got {actual}")]
    Assertion {
        what: String,
        expected: String,
        actual: String,
    },

    #[error("read model: {0}")]
    Indexer(#[from] IndexerError),

    #[error("sync: {0}")]
    Sync(#[from] SyncError),

    #[error("ledger: {0}")]
    Ledger(#[from] LedgerError),

    #[error("entity key: {0}")]
    Key(#[from] KeyError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("timed out after {}s", .0.as_secs_f64())]
    Timeout(Duration),

    #[error("panicked: {0}")]
    Panicked(String),
}

impl ScenarioError {
    pub fn is_assertion(&self) -> bool {
        matches!(self, ScenarioError::Assertion { .. })
    }
}

/// Outcome of a scenario's cleanup step.
#[derive(Debug, thiserror::Error)]
pub enum CleanupError {
    /// An expected end state, such as nothing left to revert. Logged, never reported.
    #[error("benign: {0}")]
    Benign(String),

    #[error("cleanup failed: {0}")]
    Failed(#[source] ScenarioError),
}

impl From<ScenarioError> for CleanupError {
    fn from(err: ScenarioError) -> Self {
        CleanupError::Failed(err)
    }
}

macro_rules! cleanup_failure_from {
    ($($source:ty),*) => {
        $(
            impl From<$source> for CleanupError {
                fn from(err: $source) -> Self {
                    CleanupError::Failed(err.into())
                }
            }
        )*
    };
}

cleanup_failure_from!(IndexerError, SyncError, LedgerError, KeyError, ConfigError);

/// Errors that abort the suite before any scenario executes.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("scenario `{scenario}` requires contract `{contract}`, which is not configured")]
    MissingContract { scenario: String, contract: String },

    #[error("failed to build read-model client: {0}")]
    Indexer(#[from] IndexerError),

    #[error("failed to build ledger client: {0}")]
    Ledger(#[from] LedgerError),
}

/// Fail with both values rendered when `expected != actual`.
pub fn ensure_eq<T>(what: &str, expected: T, actual: T) -> Result<(), ScenarioError>
where
    T: PartialEq + Debug,
{
    if expected == actual {
        Ok(())
    } else {
        Err(ScenarioError::Assertion {
            what: what.to_string(),
            expected: format!("{:?}", expected),
            actual: format!("{:?}", actual),
        })
    }
}

pub fn ensure(what: &str, condition: bool) -> Result<(), ScenarioError> {
    ensure_eq(what, true, condition)
}

/// Unwrap an entity that must exist at this point.
pub fn ensure_some<T>(what: &str, value: Option<T>) -> Result<T, ScenarioError> {
    value.ok_or_else(|| ScenarioError::Assertion {
        what: what.to_string(),
        expected: "an entity".to_string(),
        actual: "None".to_string(),
    })
}
