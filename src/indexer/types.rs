//! Wire types and errors for the subgraph GraphQL endpoint

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A GraphQL request body as accepted by graph-node style endpoints.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQlRequest<'a> {
    pub query: &'a str,
    pub variables: Value,
    pub operation_name: &'a str,
}

/// The `{ data, errors }` envelope every response arrives in.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphQlErrorMessage>,
}

/// A single entry of the GraphQL `errors` array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphQlErrorMessage {
    pub message: String,
}

/// Indexing progress as reported by the reserved `_meta` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexerProgress {
    /// The highest ledger height the indexer has fully processed.
    pub processed_height: u64,
    /// Hash of the processed block, when the indexer reports one.
    pub block_hash: Option<String>,
    /// Whether the deployment hit a mapping error. A failed deployment stops advancing.
    pub has_indexing_errors: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct MetaData {
    #[serde(rename = "_meta")]
    pub meta: Option<Meta>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Meta {
    pub block: MetaBlock,
    #[serde(default)]
    pub has_indexing_errors: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct MetaBlock {
    pub number: u64,
    pub hash: Option<String>,
}

impl From<Meta> for IndexerProgress {
    fn from(meta: Meta) -> Self {
        Self {
            processed_height: meta.block.number,
            block_hash: meta.block.hash.map(|h| h.to_lowercase()),
            has_indexing_errors: meta.has_indexing_errors,
        }
    }
}

/// Failures of a single request that never reached an application-level answer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("server responded with HTTP {0}")]
    Status(reqwest::StatusCode),
}

/// Error types for read-model queries
#[derive(Debug, thiserror::Error)]
pub enum IndexerError {
    /// Network or server-side failure. Retried by the client per its policy.
    #[error("transport error after {attempts} attempt(s): {source}")]
    Transport {
        attempts: u32,
        #[source]
        source: TransportError,
    },

    /// The endpoint rejected the request itself. Never retried.
    #[error("HTTP error: {0}")]
    Http(reqwest::StatusCode),

    /// The query was executed and the indexer answered with errors. Never retried.
    #[error("GraphQL errors: {}", format_messages(.0))]
    Query(Vec<GraphQlErrorMessage>),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("No data returned")]
    NoData,

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

impl IndexerError {
    pub(crate) fn transport(source: impl Into<TransportError>) -> Self {
        IndexerError::Transport {
            attempts: 1,
            source: source.into(),
        }
    }

    /// Whether the failure happened below the GraphQL layer.
    pub fn is_transport(&self) -> bool {
        matches!(self, IndexerError::Transport { .. })
    }
}

fn format_messages(errors: &[GraphQlErrorMessage]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meta_response_decodes_into_progress() {
        let raw = r#"{
            "data": {
                "_meta": {
                    "block": { "number": 1234, "hash": "0xABCDEF" },
                    "hasIndexingErrors": false
                }
            }
        }"#;
        let response: GraphQlResponse<MetaData> = serde_json::from_str(raw).unwrap();
        let progress: IndexerProgress = response.data.unwrap().meta.unwrap().into();

        assert_eq!(progress.processed_height, 1234);
        assert_eq!(progress.block_hash.as_deref(), Some("0xabcdef"));
        assert!(!progress.has_indexing_errors);
    }

    #[test]
    fn query_error_display_joins_messages() {
        let err = IndexerError::Query(vec![
            GraphQlErrorMessage {
                message: "Type `Query` has no field `mintr`".to_string(),
            },
            GraphQlErrorMessage {
                message: "second".to_string(),
            },
        ]);
        assert_eq!(
            err.to_string(),
            "GraphQL errors: Type `Query` has no field `mintr`; second"
        );
        assert!(!err.is_transport());
    }
}
