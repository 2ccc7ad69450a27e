//! The sync barrier: bounded polling until the indexer has processed a target height.
//!
//! The barrier is an explicit state machine. [`BarrierState::advance`] is a pure transition
//! over one poll's observation; [`SyncBarrier`] only performs the I/O and the cooperative
//! sleeps between polls, through an injectable [`Sleeper`].
//!
//! Targets should be the confirmed height of the mutation under test. [`SyncBarrier::wait_for_ledger_head`]
//! targets whatever height the ledger reports when polling starts, which is only sound while
//! scenarios never run concurrently against the same ledger/indexer pair.

use super::types::*;
use crate::indexer::{IndexerError, IndexerProgress, ReadModelClient};
use crate::ledger::LedgerHeightProbe;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Anything that can report the indexer's processed height.
#[async_trait]
pub trait ProgressSource: Send + Sync {
	async fn progress(&self) -> Result<IndexerProgress, IndexerError>;
}

#[async_trait]
impl ProgressSource for ReadModelClient {
	async fn progress(&self) -> Result<IndexerProgress, IndexerError> {
		self.meta().await
	}
}

/// Cooperative suspension between polls.
#[async_trait]
pub trait Sleeper: Send + Sync {
	async fn sleep(&self, duration: Duration);
}

/// Suspends on the tokio timer, yielding to the runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
	async fn sleep(&self, duration: Duration) {
		tokio::time::sleep(duration).await;
	}
}

/// States of one barrier call. Everything except `Probing` is terminal.
#[derive(Debug)]
pub enum BarrierState {
	Probing(SyncAttempt),
	Satisfied(SyncReport),
	TimedOut(SyncAttempt),
	/// The progress query failed below the GraphQL layer after its own retries.
	TransportFailed {
		attempt: SyncAttempt,
		error: IndexerError,
	},
	/// The indexer reported indexing errors and will not catch up.
	IndexerFailed(SyncAttempt),
	/// The progress query itself was rejected.
	QueryFailed {
		attempt: SyncAttempt,
		error: IndexerError,
	},
}

impl BarrierState {
	pub fn start() -> Self {
		BarrierState::Probing(SyncAttempt::default())
	}

	pub fn is_terminal(&self) -> bool {
		!matches!(self, BarrierState::Probing(_))
	}

	/// Apply one poll's result. Terminal states are returned unchanged.
	pub fn advance(
		self,
		target: SyncTarget,
		observation: Result<IndexerProgress, IndexerError>,
		config: &BarrierConfig,
	) -> Self {
		let attempt = match self {
			BarrierState::Probing(attempt) => attempt,
			terminal => return terminal,
		};

		let progress = match observation {
			Ok(progress) => progress,
			Err(error) if error.is_transport() => {
				return BarrierState::TransportFailed { attempt, error };
			}
			Err(error) => return BarrierState::QueryFailed { attempt, error },
		};

		let observed = SyncAttempt {
			observed_height: progress.processed_height,
			..attempt
		};

		if progress.processed_height >= target.height() {
			return BarrierState::Satisfied(SyncReport {
				target,
				observed_height: progress.processed_height,
				polls: observed.attempt_number + 1,
				elapsed: observed.elapsed,
			});
		}

		if progress.has_indexing_errors && config.fail_on_indexing_errors {
			return BarrierState::IndexerFailed(observed);
		}

		let next = SyncAttempt {
			attempt_number: observed.attempt_number + 1,
			..observed
		};
		if next.attempt_number >= config.max_attempts {
			BarrierState::TimedOut(next)
		} else {
			BarrierState::Probing(next)
		}
	}

	/// The barrier call's result. A call that stopped while still probing never succeeded.
	pub fn into_outcome(self, target: SyncTarget) -> Result<SyncReport, SyncError> {
		match self {
			BarrierState::Satisfied(report) => Ok(report),
			BarrierState::Probing(attempt) | BarrierState::TimedOut(attempt) => {
				Err(SyncError::Timeout {
					target,
					last_observed: attempt.observed_height,
					attempts: attempt.attempt_number,
					elapsed: attempt.elapsed,
				})
			}
			BarrierState::TransportFailed { error, .. } => Err(SyncError::Transport {
				target,
				source: error,
			}),
			BarrierState::IndexerFailed(attempt) => Err(SyncError::IndexerFailed {
				target,
				observed_height: attempt.observed_height,
			}),
			BarrierState::QueryFailed { error, .. } => Err(SyncError::Indexer(error)),
		}
	}
}

/// Blocks a scenario until the indexer has caught up with a target height.
#[derive(Clone)]
pub struct SyncBarrier {
	source: Arc<dyn ProgressSource>,
	sleeper: Arc<dyn Sleeper>,
	config: BarrierConfig,
}

impl SyncBarrier {
	pub fn new(source: Arc<dyn ProgressSource>, config: BarrierConfig) -> Self {
		Self {
			source,
			sleeper: Arc::new(TokioSleeper),
			config,
		}
	}

	pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
		self.sleeper = sleeper;
		self
	}

	pub fn config(&self) -> &BarrierConfig {
		&self.config
	}

	/// Wait until the indexer reports a processed height at or above `target`.
	///
	/// # Errors
	/// `SyncError::Timeout` once the attempt bound is reached, `SyncError::Transport` when the
	/// indexer cannot be reached, `SyncError::IndexerFailed` when it reports indexing errors.
	pub async fn wait_until(&self, target: SyncTarget) -> Result<SyncReport, SyncError> {
		debug!("Waiting for indexer to reach height {}", target);
		let mut state = BarrierState::start();

		loop {
			let observation = self.source.progress().await;
			state = state.advance(target, observation, &self.config);

			match state {
				BarrierState::Probing(mut attempt) => {
					debug!(
						"Indexer at height {}, target {} (attempt {}/{})",
						attempt.observed_height,
						target,
						attempt.attempt_number,
						self.config.max_attempts
					);
					self.sleeper.sleep(self.config.poll_interval).await;
					attempt.elapsed += self.config.poll_interval;
					state = BarrierState::Probing(attempt);
				}
				terminal => {
					let outcome = terminal.into_outcome(target);
					match &outcome {
						Ok(report) => info!(
							"Indexer reached height {} (target {}) after {} poll(s)",
							report.observed_height, target, report.polls
						),
						Err(e @ SyncError::Timeout { .. }) => error!("{}", e),
						Err(e) => warn!("Sync barrier failed: {}", e),
					}
					return outcome;
				}
			}
		}
	}

	/// Wait for whatever height the ledger reports right now.
	///
	/// Only sound while scenarios run one at a time against this ledger/indexer pair: a
	/// concurrent writer's height would otherwise be mistaken for this scenario's.
	pub async fn wait_for_ledger_head<P>(&self, ledger: &P) -> Result<SyncReport, SyncError>
	where
		P: LedgerHeightProbe + ?Sized,
	{
		let height = ledger.current_height().await?;
		self.wait_until(SyncTarget(height)).await
	}
}
