use super::types::{ScenarioError, SetupError};
use crate::config::{Accounts, HarnessConfig};
use crate::indexer::{Address, ReadModelClient, ReadModelQueries};
use crate::ledger::{Confirmation, Ledger, LedgerRpcClient, TransactionRequest};
use crate::sync::{Sleeper, SyncBarrier, SyncReport, SyncTarget};

use std::sync::Arc;
use tracing::{debug, info};

/// The long-lived collaborators every scenario shares.
///
/// Built once at startup and handed to the runner; scenarios reach it only through their
/// [`ScenarioContext`].
pub struct Environment {
	config: HarnessConfig,
	ledger: Arc<dyn Ledger>,
	queries: ReadModelQueries,
	barrier: SyncBarrier,
}

impl Environment {
	pub fn new(config: HarnessConfig, ledger: Arc<dyn Ledger>, client: ReadModelClient) -> Self {
		let barrier = SyncBarrier::new(Arc::new(client.clone()), config.barrier_config());
		Self {
			config,
			ledger,
			queries: ReadModelQueries::new(client),
			barrier,
		}
	}

	/// Connect to the ledger and indexer named in the configuration.
	pub fn from_config(config: HarnessConfig) -> Result<Self, SetupError> {
		let client = ReadModelClient::new(
			config.indexer.url.clone(),
			config.request_timeout(),
			config.retry_policy()?,
		)?;
		let ledger = LedgerRpcClient::new(
			config.ledger.rpc_url.clone(),
			config.ledger_request_timeout(),
			config.confirmation_timeout(),
		)?;
		info!(
			"Using indexer at {} and ledger at {}",
			config.indexer.url, config.ledger.rpc_url
		);
		Ok(Self::new(config, Arc::new(ledger), client))
	}

	/// Replace the barrier's sleeper, e.g. to run against a paused clock.
	pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
		self.barrier = self.barrier.with_sleeper(sleeper);
		self
	}

	pub fn config(&self) -> &HarnessConfig {
		&self.config
	}
}

/// What a scenario can do: submit mutations, wait for them to be indexed, then read.
pub struct ScenarioContext {
	env: Arc<Environment>,
	scenario: String,
}

impl ScenarioContext {
	pub fn new(env: Arc<Environment>, scenario: impl Into<String>) -> Self {
		Self {
			env,
			scenario: scenario.into(),
		}
	}

	pub fn scenario(&self) -> &str {
		&self.scenario
	}

	pub fn config(&self) -> &HarnessConfig {
		&self.env.config
	}

	pub fn accounts(&self) -> &Accounts {
		&self.env.config.ledger.accounts
	}

	pub fn project_number(&self) -> u64 {
		self.env.config.fixtures.project_number
	}

	pub fn contract(&self, name: &str) -> Result<&Address, ScenarioError> {
		Ok(self.env.config.require_contract(name)?)
	}

	pub fn ledger(&self) -> &dyn Ledger {
		self.env.ledger.as_ref()
	}

	/// Submit a mutation and wait for it to be confirmed.
	pub async fn submit(&self, tx: TransactionRequest) -> Result<Confirmation, ScenarioError> {
		debug!("[{}] Submitting transaction to {}", self.scenario, tx.to);
		let confirmation = self.env.ledger.submit_and_confirm(tx).await?;
		debug!(
			"[{}] Confirmed {} at height {}",
			self.scenario, confirmation.tx_hash, confirmation.height
		);
		Ok(confirmation)
	}

	/// Wait until the indexer has processed the height `confirmation` was included at.
	pub async fn sync(&self, confirmation: &Confirmation) -> Result<Synced<'_>, ScenarioError> {
		let report = self
			.env
			.barrier
			.wait_until(SyncTarget::from(confirmation))
			.await?;
		Ok(Synced {
			queries: &self.env.queries,
			report,
		})
	}

	/// Wait for the ledger's current head. Used by snapshots, which have no mutation to target.
	pub async fn sync_to_head(&self) -> Result<Synced<'_>, ScenarioError> {
		let report = self
			.env
			.barrier
			.wait_for_ledger_head(self.env.ledger.as_ref())
			.await?;
		Ok(Synced {
			queries: &self.env.queries,
			report,
		})
	}
}

/// Proof that the indexer has caught up with a target height.
///
/// The read-model queries are only reachable through this guard, so a scenario cannot read
/// before the barrier for its mutation has been satisfied.
pub struct Synced<'a> {
	queries: &'a ReadModelQueries,
	report: SyncReport,
}

impl Synced<'_> {
	pub fn queries(&self) -> &ReadModelQueries {
		self.queries
	}

	pub fn report(&self) -> &SyncReport {
		&self.report
	}
}
