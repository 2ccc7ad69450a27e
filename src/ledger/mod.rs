//! Ledger collaborator
//!
//! The harness needs two things from the ledger: its current confirmed height, and a way to
//! submit a mutation and learn the height and timestamp it was confirmed at. Both are traits so
//! scenarios and the sync barrier can run against fakes.

/// Calldata encoding for static argument types
pub mod abi;
/// Contract entry point wrappers
pub mod actions;
/// JSON-RPC implementation of the ledger traits
mod client;
/// Ledger data types and errors
mod types;

pub use client::LedgerRpcClient;
pub use types::{Confirmation, LedgerError, TransactionRequest};

use async_trait::async_trait;

/// Reports the ledger's current confirmed height.
#[async_trait]
pub trait LedgerHeightProbe: Send + Sync {
	/// A single request; failures are not retried here.
	async fn current_height(&self) -> Result<u64, LedgerError>;
}

/// Submits mutations and waits for their inclusion.
#[async_trait]
pub trait Ledger: LedgerHeightProbe {
	async fn submit_and_confirm(&self, tx: TransactionRequest)
	-> Result<Confirmation, LedgerError>;
}
