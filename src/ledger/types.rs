use crate::indexer::Address;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Where and when a submitted transaction landed on the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    pub tx_hash: String,
    /// The block height the transaction was included in.
    pub height: u64,
    pub timestamp: DateTime<Utc>,
}

/// A state-changing call against a deployed contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRequest {
    /// An account unlocked on the dev node.
    pub from: Address,
    pub to: Address,
    pub data: Vec<u8>,
    /// Attached value in wei.
    pub value: u128,
}

impl TransactionRequest {
    pub fn new(from: Address, to: Address) -> Self {
        Self {
            from,
            to,
            data: Vec::new(),
            value: 0,
        }
    }

    /// Sets the ABI encoded calldata
    pub fn with_data(mut self, data: Vec<u8>) -> Self {
        self.data = data;
        self
    }

    /// Sets the attached value
    pub fn with_value(mut self, value: u128) -> Self {
        self.value = value;
        self
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct RpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'a str,
    pub params: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RpcResponse<T> {
    pub result: Option<T>,
    pub error: Option<RpcErrorObject>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RpcErrorObject {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RpcReceipt {
    pub transaction_hash: String,
    pub block_number: String,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RpcBlock {
    pub timestamp: String,
}

/// Parse a `0x`-prefixed hex quantity.
pub(crate) fn parse_quantity(raw: &str) -> Result<u64, LedgerError> {
    let digits = raw
        .strip_prefix("0x")
        .ok_or_else(|| LedgerError::Decode(format!("quantity `{raw}` is missing its 0x prefix")))?;
    u64::from_str_radix(digits, 16)
        .map_err(|e| LedgerError::Decode(format!("invalid quantity `{raw}`: {e}")))
}

/// Errors raised by the ledger collaborator
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// The node could not be reached. A different failure class than a lagging indexer.
    #[error("ledger transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("JSON-RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("transaction reverted{}: {reason}", .tx_hash.as_ref().map(|h| format!(" ({h})")).unwrap_or_default())]
    Reverted {
        tx_hash: Option<String>,
        reason: String,
    },

    #[error("transaction {tx_hash} not confirmed after {}s", .waited.as_secs())]
    ConfirmationTimeout { tx_hash: String, waited: Duration },

    #[error("unexpected ledger response: {0}")]
    Decode(String),

    /// Call arguments did not match the function's declared inputs.
    #[error("cannot encode call: {0}")]
    Encode(String),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

impl LedgerError {
    pub fn is_revert(&self) -> bool {
        matches!(self, LedgerError::Reverted { .. })
    }
}
