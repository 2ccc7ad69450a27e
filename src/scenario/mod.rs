//! Scenario protocol
//!
//! A scenario records the fixture state it will disturb, performs ledger mutations, waits for
//! the indexer to process them and asserts on the read model. Its cleanup step always runs
//! afterwards, whatever happened in the body.
//!
//! - `context`: the shared [`Environment`] and the per-scenario [`ScenarioContext`].
//! - `runner`: sequential execution with per-scenario timeouts and outcome precedence.
//! - `types`: scenario, cleanup and setup errors plus the assertion helpers.

/// Environment handle and per-scenario context
mod context;
/// Sequential scenario runner and suite report
mod runner;
/// Scenario errors and assertion helpers
mod types;

pub use context::{Environment, ScenarioContext, Synced};
pub use runner::{ScenarioResult, ScenarioRunner, ScenarioStatus, SuiteReport};
pub use types::*;

use async_trait::async_trait;
use std::time::Duration;

#[async_trait]
pub trait Scenario: Send {
	fn name(&self) -> &str;

	/// Wall-clock bound on snapshot plus run, and separately on cleanup. Must exceed the
	/// barrier's worst-case polling time for every sync the scenario performs.
	fn timeout(&self) -> Duration;

	/// Logical contract names that must be present in the configuration.
	fn required_contracts(&self) -> &'static [&'static str];

	/// Record whatever fixture state cleanup needs to restore.
	async fn snapshot(&mut self, _ctx: &ScenarioContext) -> Result<(), ScenarioError> {
		Ok(())
	}

	async fn run(&mut self, ctx: &ScenarioContext) -> Result<(), ScenarioError>;

	async fn cleanup(&mut self, ctx: &ScenarioContext) -> Result<(), CleanupError>;
}
