use super::context::{Environment, ScenarioContext};
use super::types::*;
use super::Scenario;

use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

pub enum ScenarioStatus {
	Passed,
	/// The body failed. Reported even when cleanup failed too.
	Failed(ScenarioError),
	Panicked(String),
	/// The body passed but cleanup did not.
	CleanupFailed(ScenarioError),
}

pub struct ScenarioResult {
	pub name: String,
	pub status: ScenarioStatus,
	pub elapsed: Duration,
}

impl ScenarioResult {
	pub fn success(&self) -> bool {
		matches!(self.status, ScenarioStatus::Passed)
	}

	pub fn print(&self) {
		const GREEN: &str = "\x1b[1;32m";
		const RED: &str = "\x1b[1;31m";
		const NC: &str = "\x1b[0m";

		let secs = self.elapsed.as_secs_f64();
		match &self.status {
			ScenarioStatus::Passed => {
				println!("* {GREEN}Scenario {} succeeded{NC} ({secs:.1}s)", self.name);
			}
			ScenarioStatus::Failed(e) => {
				println!("* {RED}Scenario {} failed{NC} ({secs:.1}s)", self.name);
				println!("    {}", e);
			}
			ScenarioStatus::Panicked(msg) => {
				println!("* {RED}Scenario {} panicked{NC} ({secs:.1}s)", self.name);
				println!("    {}", msg);
			}
			ScenarioStatus::CleanupFailed(e) => {
				println!("* {RED}Scenario {} passed but cleanup failed{NC} ({secs:.1}s)", self.name);
				println!("    {}", e);
			}
		}
	}
}

pub struct SuiteReport {
	pub results: Vec<ScenarioResult>,
}

impl SuiteReport {
	pub fn success(&self) -> bool {
		self.results.iter().all(ScenarioResult::success)
	}

	pub fn passed(&self) -> usize {
		self.results.iter().filter(|r| r.success()).count()
	}

	pub fn failed(&self) -> usize {
		self.results.len() - self.passed()
	}

	pub fn result(&self, name: &str) -> Option<&ScenarioResult> {
		self.results.iter().find(|r| r.name == name)
	}

	pub fn print(&self) {
		println!();
		for result in &self.results {
			result.print();
		}
		println!(
			"\n{} scenario(s): {} passed, {} failed",
			self.results.len(),
			self.passed(),
			self.failed()
		);
	}
}

/// Runs scenarios one after another against a shared [`Environment`].
pub struct ScenarioRunner {
	env: Arc<Environment>,
	scenarios: Vec<Box<dyn Scenario>>,
}

impl ScenarioRunner {
	pub fn new(env: Arc<Environment>) -> Self {
		Self {
			env,
			scenarios: Vec::new(),
		}
	}

	pub fn with_scenario(mut self, scenario: impl Scenario + 'static) -> Self {
		self.scenarios.push(Box::new(scenario));
		self
	}

	pub fn push(&mut self, scenario: Box<dyn Scenario>) {
		self.scenarios.push(scenario);
	}

	/// Check every scenario's contracts are configured before anything runs.
	pub fn validate(&self) -> Result<(), SetupError> {
		for scenario in &self.scenarios {
			for contract in scenario.required_contracts() {
				if self.env.config().require_contract(contract).is_err() {
					return Err(SetupError::MissingContract {
						scenario: scenario.name().to_string(),
						contract: contract.to_string(),
					});
				}
			}
		}
		Ok(())
	}

	/// Run every scenario in declaration order.
	///
	/// # Errors
	/// A `SetupError` when validation fails, in which case no scenario has run. Scenario failures
	/// are recorded in the report instead.
	pub async fn run(mut self) -> Result<SuiteReport, SetupError> {
		self.validate()?;
		info!("Running {} scenario(s)", self.scenarios.len());

		let mut results = Vec::with_capacity(self.scenarios.len());
		for scenario in self.scenarios.iter_mut() {
			results.push(run_scenario(&self.env, scenario.as_mut()).await);
		}
		Ok(SuiteReport { results })
	}
}

async fn run_scenario(env: &Arc<Environment>, scenario: &mut dyn Scenario) -> ScenarioResult {
	let name = scenario.name().to_string();
	let timeout = scenario.timeout();
	let ctx = ScenarioContext::new(env.clone(), name.clone());
	let started = Instant::now();

	info!("[{}] Starting (timeout {}s)", name, timeout.as_secs());
	let body = guarded(timeout, async {
		debug!("[{}] Taking snapshot", name);
		scenario.snapshot(&ctx).await?;
		debug!("[{}] Running", name);
		scenario.run(&ctx).await
	})
	.await;

	debug!("[{}] Cleaning up", name);
	let cleanup = guarded(timeout, scenario.cleanup(&ctx)).await;

	let status = match body {
		Err(e) => {
			if let Err(CleanupError::Failed(cleanup_err)) = &cleanup {
				warn!("[{}] Cleanup also failed: {}", name, cleanup_err);
			}
			match e {
				ScenarioError::Panicked(msg) => ScenarioStatus::Panicked(msg),
				e => ScenarioStatus::Failed(e),
			}
		}
		Ok(()) => match cleanup {
			Ok(()) => ScenarioStatus::Passed,
			Err(CleanupError::Benign(reason)) => {
				debug!("[{}] Ignoring cleanup outcome: {}", name, reason);
				ScenarioStatus::Passed
			}
			Err(CleanupError::Failed(e)) => ScenarioStatus::CleanupFailed(e),
		},
	};

	let elapsed = started.elapsed();
	match &status {
		ScenarioStatus::Passed => info!("[{}] Passed in {:.1}s", name, elapsed.as_secs_f64()),
		ScenarioStatus::Failed(e) | ScenarioStatus::CleanupFailed(e) => {
			error!("[{}] {}", name, e)
		}
		ScenarioStatus::Panicked(msg) => error!("[{}] Panicked: {}", name, msg),
	}

	ScenarioResult {
		name,
		status,
		elapsed,
	}
}

/// Run a scenario step under a wall-clock bound, turning panics into errors.
async fn guarded<F, E>(timeout: Duration, step: F) -> Result<(), E>
where
	F: Future<Output = Result<(), E>>,
	E: From<ScenarioError>,
{
	match tokio::time::timeout(timeout, AssertUnwindSafe(step).catch_unwind()).await {
		Err(_) => Err(ScenarioError::Timeout(timeout).into()),
		Ok(Err(payload)) => Err(ScenarioError::Panicked(panic_message(payload.as_ref())).into()),
		Ok(Ok(result)) => result,
	}
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
	if let Some(msg) = payload.downcast_ref::<&str>() {
		msg.to_string()
	} else if let Some(msg) = payload.downcast_ref::<String>() {
		msg.clone()
	} else {
		"non-string panic payload".to_string()
	}
}
