use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use subgraph_sync_harness::config::HarnessConfig;
use subgraph_sync_harness::scenario::{
	Environment, Scenario, ScenarioRunner, SetupError, SuiteReport,
};
use subgraph_sync_harness::scenarios;

#[derive(Debug, Parser)]
#[clap(name = "subgraph-sync-harness")]
#[clap(author, version, about, long_about = None)]
struct Cli {
	/// Configuration file; `harness.toml` in the working directory is used when absent.
	#[arg(short, long)]
	config: Option<PathBuf>,

	/// Run only the named scenarios.
	#[arg(long = "only")]
	only: Vec<String>,
}

fn init_tracing() -> Result<(), tracing_subscriber::filter::ParseError> {
	let filter = EnvFilter::from_default_env()
		.add_directive("subgraph_sync_harness=debug".parse()?)
		.add_directive(tracing::Level::INFO.into());

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_target(false)
		.with_thread_ids(false)
		.with_thread_names(false)
		.with_file(false)
		.with_line_number(false)
		.with_timer(tracing_subscriber::fmt::time::time())
		.init();
	Ok(())
}

async fn run(cli: Cli) -> Result<SuiteReport, SetupError> {
	let config = HarnessConfig::load(cli.config.as_deref())?;
	let env = Arc::new(Environment::from_config(config)?);

	let mut runner = ScenarioRunner::new(env.clone());
	for scenario in scenarios::all(env.config()) {
		if cli.only.is_empty() || cli.only.iter().any(|name| name == scenario.name()) {
			runner.push(scenario);
		}
	}
	runner.run().await
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
	let cli = Cli::parse();

	if let Err(e) = init_tracing() {
		eprintln!("invalid log filter: {}", e);
		return ExitCode::FAILURE;
	}

	info!("Starting subgraph sync harness");
	match run(cli).await {
		Ok(report) => {
			report.print();
			if report.success() {
				ExitCode::SUCCESS
			} else {
				ExitCode::FAILURE
			}
		}
		Err(e) => {
			error!("Setup failed, no scenario was run: {}", e);
			ExitCode::from(2)
		}
	}
}
