//!
//! JSON-RPC ledger client.
//!
//! Submits transactions from accounts unlocked on a development node and waits for their
//! inclusion, returning the confirming height and block timestamp. The height query makes a
//! single request; retrying it is the caller's responsibility.

use super::types::*;
use super::{Ledger, LedgerHeightProbe};
use async_trait::async_trait;
use backoff::{ExponentialBackoffBuilder, future::retry};
use chrono::DateTime;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Ledger client speaking Ethereum JSON-RPC over HTTP
#[derive(Clone, Debug)]
pub struct LedgerRpcClient {
	http_client: Client,
	rpc_url: String,
	/// Upper bound on waiting for a submitted transaction's receipt.
	confirmation_timeout: Duration,
	next_id: Arc<AtomicU64>,
}

impl LedgerRpcClient {
	/// Create a new ledger client.
	///
	/// # Arguments
	/// * `rpc_url` - The node's HTTP JSON-RPC endpoint.
	/// * `request_timeout` - Per-request timeout.
	/// * `confirmation_timeout` - How long `submit_and_confirm` waits for inclusion.
	pub fn new(
		rpc_url: impl Into<String>,
		request_timeout: Duration,
		confirmation_timeout: Duration,
	) -> Result<Self, LedgerError> {
		let http_client = Client::builder()
			.timeout(request_timeout)
			.build()
			.map_err(|e| LedgerError::Client(e.to_string()))?;

		Ok(Self {
			http_client,
			rpc_url: rpc_url.into(),
			confirmation_timeout,
			next_id: Arc::new(AtomicU64::new(1)),
		})
	}

	async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, LedgerError> {
		self.call_optional(method, params)
			.await?
			.ok_or_else(|| LedgerError::Decode(format!("{method} returned null")))
	}

	async fn call_optional<T: DeserializeOwned>(
		&self,
		method: &str,
		params: Value,
	) -> Result<Option<T>, LedgerError> {
		let request = RpcRequest {
			jsonrpc: "2.0",
			id: self.next_id.fetch_add(1, Ordering::Relaxed),
			method,
			params,
		};

		let response: RpcResponse<T> = self
			.http_client
			.post(&self.rpc_url)
			.json(&request)
			.send()
			.await?
			.error_for_status()?
			.json()
			.await?;

		if let Some(error) = response.error {
			// Nodes report reverts as RPC errors at submission time
			if error.message.to_lowercase().contains("revert") {
				return Err(LedgerError::Reverted {
					tx_hash: None,
					reason: error.message,
				});
			}
			return Err(LedgerError::Rpc {
				code: error.code,
				message: error.message,
			});
		}

		Ok(response.result)
	}

	async fn wait_for_receipt(&self, tx_hash: &str) -> Result<RpcReceipt, LedgerError> {
		let backoff = ExponentialBackoffBuilder::new()
			.with_initial_interval(Duration::from_millis(100))
			.with_max_interval(Duration::from_secs(1))
			.with_max_elapsed_time(Some(self.confirmation_timeout))
			.build();

		let waited = self.confirmation_timeout;
		retry(backoff, move || async move {
			match self
				.call_optional::<RpcReceipt>("eth_getTransactionReceipt", json!([tx_hash]))
				.await
			{
				Ok(Some(receipt)) => Ok(receipt),
				Ok(None) => {
					debug!("Transaction {} not yet included", tx_hash);
					Err(backoff::Error::transient(LedgerError::ConfirmationTimeout {
						tx_hash: tx_hash.to_string(),
						waited,
					}))
				}
				Err(e) => Err(backoff::Error::permanent(e)),
			}
		})
		.await
	}
}

#[async_trait]
impl LedgerHeightProbe for LedgerRpcClient {
	async fn current_height(&self) -> Result<u64, LedgerError> {
		let raw: String = self.call("eth_blockNumber", json!([])).await?;
		parse_quantity(&raw)
	}
}

#[async_trait]
impl Ledger for LedgerRpcClient {
	async fn submit_and_confirm(
		&self,
		tx: TransactionRequest,
	) -> Result<Confirmation, LedgerError> {
		let params = json!([{
			"from": tx.from.as_str(),
			"to": tx.to.as_str(),
			"data": format!("0x{}", hex::encode(&tx.data)),
			"value": format!("0x{:x}", tx.value),
		}]);

		let tx_hash: String = self.call("eth_sendTransaction", params).await?;
		debug!("Submitted transaction {} to {}", tx_hash, tx.to);

		let receipt = self.wait_for_receipt(&tx_hash).await?;

		if receipt.status.as_deref() == Some("0x0") {
			warn!("Transaction {} reverted", receipt.transaction_hash);
			return Err(LedgerError::Reverted {
				tx_hash: Some(receipt.transaction_hash),
				reason: "receipt status 0x0".to_string(),
			});
		}

		let height = parse_quantity(&receipt.block_number)?;
		let block: RpcBlock = self
			.call("eth_getBlockByNumber", json!([receipt.block_number, false]))
			.await?;
		let seconds = parse_quantity(&block.timestamp)?;
		let timestamp = i64::try_from(seconds)
			.ok()
			.and_then(|secs| DateTime::from_timestamp(secs, 0))
			.ok_or_else(|| LedgerError::Decode(format!("block timestamp {seconds} out of range")))?;

		info!(
			"Transaction {} included in block {} at {}",
			receipt.transaction_hash, height, timestamp
		);

		Ok(Confirmation {
			tx_hash: receipt.transaction_hash,
			height,
			timestamp,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::indexer::Address;
	use wiremock::matchers as m;
	use wiremock::{Mock, MockBuilder, MockServer, ResponseTemplate};

	const FROM: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";
	const TO: &str = "0x5fbdb2315678afecb367f032d93f642f64180aa3";
	const TX: &str = "0x00000000000000000000000000000000000000000000000000000000000000aa";

	async fn make_client() -> (MockServer, LedgerRpcClient) {
		let server = MockServer::start().await;
		let client = LedgerRpcClient::new(
			server.uri(),
			Duration::from_secs(5),
			Duration::from_secs(2),
		)
		.unwrap();
		(server, client)
	}

	fn rpc(method: &str) -> MockBuilder {
		Mock::given(m::method("POST")).and(m::body_partial_json(json!({ "method": method })))
	}

	fn result(value: Value) -> ResponseTemplate {
		ResponseTemplate::new(200).set_body_json(json!({ "jsonrpc": "2.0", "id": 1, "result": value }))
	}

	fn request() -> TransactionRequest {
		TransactionRequest::new(Address::parse(FROM).unwrap(), Address::parse(TO).unwrap())
			.with_data(vec![0xde, 0xad])
	}

	#[tokio::test]
	async fn current_height_parses_block_number() {
		let (server, client) = make_client().await;

		rpc("eth_blockNumber")
			.respond_with(result(json!("0x2a")))
			.expect(1)
			.mount(&server)
			.await;

		assert_eq!(client.current_height().await.unwrap(), 42);
	}

	#[tokio::test]
	async fn height_query_does_not_retry() {
		let (server, client) = make_client().await;

		rpc("eth_blockNumber")
			.respond_with(ResponseTemplate::new(503))
			.expect(1)
			.mount(&server)
			.await;

		assert!(matches!(
			client.current_height().await,
			Err(LedgerError::Transport(_))
		));
	}

	#[tokio::test]
	async fn submit_waits_for_inclusion() {
		let (server, client) = make_client().await;

		rpc("eth_sendTransaction")
			.and(m::body_partial_json(json!({ "params": [{ "data": "0xdead", "value": "0x0" }] })))
			.respond_with(result(json!(TX)))
			.expect(1)
			.mount(&server)
			.await;

		// pending on the first poll
		rpc("eth_getTransactionReceipt")
			.respond_with(result(Value::Null))
			.up_to_n_times(1)
			.mount(&server)
			.await;
		rpc("eth_getTransactionReceipt")
			.respond_with(result(json!({
				"transactionHash": TX,
				"blockNumber": "0x10",
				"status": "0x1"
			})))
			.mount(&server)
			.await;

		rpc("eth_getBlockByNumber")
			.and(m::body_partial_json(json!({ "params": ["0x10", false] })))
			.respond_with(result(json!({ "timestamp": "0x6553f100" })))
			.expect(1)
			.mount(&server)
			.await;

		let confirmation = client.submit_and_confirm(request()).await.unwrap();

		assert_eq!(confirmation.height, 16);
		assert_eq!(confirmation.tx_hash, TX);
		assert_eq!(confirmation.timestamp.timestamp(), 0x6553f100);
	}

	#[tokio::test]
	async fn failed_receipt_is_a_revert() {
		let (server, client) = make_client().await;

		rpc("eth_sendTransaction")
			.respond_with(result(json!(TX)))
			.mount(&server)
			.await;
		rpc("eth_getTransactionReceipt")
			.respond_with(result(json!({
				"transactionHash": TX,
				"blockNumber": "0x11",
				"status": "0x0"
			})))
			.mount(&server)
			.await;

		let err = client.submit_and_confirm(request()).await.unwrap_err();
		assert!(err.is_revert());
	}

	#[tokio::test]
	async fn submission_revert_is_classified() {
		let (server, client) = make_client().await;

		rpc("eth_sendTransaction")
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({
				"jsonrpc": "2.0",
				"id": 1,
				"error": { "code": 3, "message": "execution reverted: Only Artist" }
			})))
			.mount(&server)
			.await;

		let err = client.submit_and_confirm(request()).await.unwrap_err();
		assert!(matches!(err, LedgerError::Reverted { tx_hash: None, .. }));
	}

	#[tokio::test]
	async fn never_included_times_out() {
		let server = MockServer::start().await;
		let client = LedgerRpcClient::new(
			server.uri(),
			Duration::from_secs(5),
			Duration::from_millis(300),
		)
		.unwrap();

		rpc("eth_sendTransaction")
			.respond_with(result(json!(TX)))
			.mount(&server)
			.await;
		rpc("eth_getTransactionReceipt")
			.respond_with(result(Value::Null))
			.mount(&server)
			.await;

		let err = client.submit_and_confirm(request()).await.unwrap_err();
		assert!(matches!(err, LedgerError::ConfirmationTimeout { .. }));
	}
}
