//! Harness configuration
//!
//! Loaded once at startup from a TOML file layered with `HARNESS_` environment overrides
//! (`HARNESS_INDEXER__URL`, `HARNESS_CONTRACTS__MINTER_RAM`, ...) and passed down explicitly.

use crate::indexer::entities::bigint;
use crate::indexer::{Address, RetryPolicy};
use crate::sync::BarrierConfig;

use serde::Deserialize;
use std::collections::BTreeMap;
use std::num::NonZeroU32;
use std::path::Path;
use std::time::Duration;

const DEFAULT_FILE: &str = "harness.toml";
const ENV_PREFIX: &str = "HARNESS";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("failed to load configuration: {0}")]
	Load(#[from] ::config::ConfigError),

	#[error("contract `{0}` is not configured (set contracts.{0})")]
	MissingContract(String),

	#[error("invalid configuration: {0}")]
	Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct HarnessConfig {
	pub indexer: IndexerSettings,
	pub ledger: LedgerSettings,
	#[serde(default)]
	pub sync: SyncSettings,
	#[serde(default)]
	pub fixtures: FixtureSettings,
	/// Deployed contract addresses keyed by logical name.
	#[serde(default)]
	pub contracts: BTreeMap<String, Address>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IndexerSettings {
	pub url: String,
	#[serde(default = "default_request_timeout_secs")]
	pub request_timeout_secs: u64,
	#[serde(default)]
	pub retry: RetrySettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
	pub max_attempts: u32,
	pub initial_interval_ms: u64,
	pub max_interval_ms: u64,
}

impl Default for RetrySettings {
	fn default() -> Self {
		Self {
			max_attempts: 3,
			initial_interval_ms: 250,
			max_interval_ms: 2_000,
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
pub struct LedgerSettings {
	pub rpc_url: String,
	/// Per JSON-RPC call. Receipt polling is bounded separately by `confirmation_timeout_secs`.
	#[serde(default = "default_request_timeout_secs")]
	pub request_timeout_secs: u64,
	#[serde(default = "default_confirmation_timeout_secs")]
	pub confirmation_timeout_secs: u64,
	pub accounts: Accounts,
}

/// Unlocked ledger accounts the scenarios act as.
#[derive(Debug, Clone, Deserialize)]
pub struct Accounts {
	pub deployer: Address,
	pub artist: Address,
	pub bidder_a: Address,
	pub bidder_b: Address,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
	pub max_attempts: u32,
	pub poll_interval_ms: u64,
	pub fail_on_indexing_errors: bool,
}

impl Default for SyncSettings {
	fn default() -> Self {
		let barrier = BarrierConfig::default();
		Self {
			max_attempts: barrier.max_attempts,
			poll_interval_ms: barrier.poll_interval.as_millis() as u64,
			fail_on_indexing_errors: barrier.fail_on_indexing_errors,
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
pub struct FixtureSettings {
	/// Project on the core contract the scenarios mutate.
	#[serde(default)]
	pub project_number: u64,
	/// Price the scenarios configure on the set-price minter. Wei amounts are decimal strings
	/// or TOML integers up to `i64::MAX`.
	#[serde(default = "default_set_price_wei", deserialize_with = "bigint::deserialize")]
	pub set_price_wei: u128,
	/// Ranked auction slot both competing bids target.
	#[serde(default = "default_bid_slot")]
	pub bid_slot: u16,
	/// Bid value of `bid_slot` on the fixture auction.
	#[serde(
		default = "default_bid_slot_price_wei",
		deserialize_with = "bigint::deserialize"
	)]
	pub bid_slot_price_wei: u128,
}

impl Default for FixtureSettings {
	fn default() -> Self {
		Self {
			project_number: 0,
			set_price_wei: default_set_price_wei(),
			bid_slot: default_bid_slot(),
			bid_slot_price_wei: default_bid_slot_price_wei(),
		}
	}
}

fn default_set_price_wei() -> u128 {
	10_000_000_000_000_000
}

fn default_bid_slot() -> u16 {
	10
}

fn default_bid_slot_price_wei() -> u128 {
	1_100_000_000_000_000_000
}

fn default_request_timeout_secs() -> u64 {
	30
}

fn default_confirmation_timeout_secs() -> u64 {
	60
}

impl HarnessConfig {
	/// Load the configuration.
	///
	/// An explicit file is mandatory when given and replaces `harness.toml`; otherwise
	/// `harness.toml` in the working directory is read if present. Environment variables
	/// override either.
	pub fn load(explicit_file: Option<&Path>) -> Result<Self, ConfigError> {
		Self::load_from(explicit_file, DEFAULT_FILE)
	}

	fn load_from(explicit_file: Option<&Path>, default_file: &str) -> Result<Self, ConfigError> {
		let mut s = ::config::Config::builder();

		s = match explicit_file {
			Some(explicit) => {
				let path = explicit
					.to_str()
					.ok_or_else(|| ConfigError::Invalid(format!("non UTF-8 path {:?}", explicit)))?;
				s.add_source(::config::File::with_name(path).required(true))
			}
			None => s.add_source(::config::File::with_name(default_file).required(false)),
		};

		s = s.add_source(
			::config::Environment::with_prefix(ENV_PREFIX)
				.prefix_separator("_")
				.separator("__"),
		);

		Self::build(s)
	}

	/// Parse a TOML document without consulting the filesystem or environment.
	pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
		let s = ::config::Config::builder()
			.add_source(::config::File::from_str(toml, ::config::FileFormat::Toml));
		Self::build(s)
	}

	fn build(
		builder: ::config::ConfigBuilder<::config::builder::DefaultState>,
	) -> Result<Self, ConfigError> {
		let config: Self = builder.build()?.try_deserialize()?;
		config.validate()?;
		Ok(config)
	}

	fn validate(&self) -> Result<(), ConfigError> {
		if self.sync.max_attempts == 0 {
			return Err(ConfigError::Invalid("sync.max_attempts must be at least 1".into()));
		}
		if self.sync.poll_interval_ms == 0 {
			return Err(ConfigError::Invalid("sync.poll_interval_ms must be positive".into()));
		}
		if self.indexer.retry.max_attempts == 0 {
			return Err(ConfigError::Invalid(
				"indexer.retry.max_attempts must be at least 1".into(),
			));
		}
		Ok(())
	}

	/// Address of a deployed contract by logical name.
	pub fn require_contract(&self, name: &str) -> Result<&Address, ConfigError> {
		self.contracts
			.get(name)
			.ok_or_else(|| ConfigError::MissingContract(name.to_string()))
	}

	pub fn barrier_config(&self) -> BarrierConfig {
		BarrierConfig {
			max_attempts: self.sync.max_attempts,
			poll_interval: Duration::from_millis(self.sync.poll_interval_ms),
			fail_on_indexing_errors: self.sync.fail_on_indexing_errors,
		}
	}

	pub fn retry_policy(&self) -> Result<RetryPolicy, ConfigError> {
		let retry = &self.indexer.retry;
		let max_attempts = NonZeroU32::new(retry.max_attempts).ok_or_else(|| {
			ConfigError::Invalid("indexer.retry.max_attempts must be at least 1".into())
		})?;
		Ok(RetryPolicy {
			max_attempts,
			initial_interval: Duration::from_millis(retry.initial_interval_ms),
			max_interval: Duration::from_millis(retry.max_interval_ms),
			..RetryPolicy::default()
		})
	}

	pub fn request_timeout(&self) -> Duration {
		Duration::from_secs(self.indexer.request_timeout_secs)
	}

	pub fn ledger_request_timeout(&self) -> Duration {
		Duration::from_secs(self.ledger.request_timeout_secs)
	}

	pub fn confirmation_timeout(&self) -> Duration {
		Duration::from_secs(self.ledger.confirmation_timeout_secs)
	}
}
