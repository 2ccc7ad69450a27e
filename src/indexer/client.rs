//!
//! GraphQL client for the subgraph read model.
//!
//! Every call goes to the live endpoint: requests carry no-cache headers and nothing is
//! memoized, since the same entity is expected to change over the life of a run. Transport
//! failures are retried with exponential backoff up to a bounded number of attempts;
//! application-level errors surface on the first attempt.

use super::types::*;
use backoff::{ExponentialBackoffBuilder, future::retry};
use reqwest::{
	Client, StatusCode,
	header::{CACHE_CONTROL, PRAGMA},
};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::fmt;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

const META_QUERY: &str = r#"
    query HarnessMeta {
        _meta {
            block {
                number
                hash
            }
            hasIndexingErrors
        }
    }
"#;

/// Decides whether a failed attempt should be retried.
pub type RetryPredicate = Arc<dyn Fn(&IndexerError) -> bool + Send + Sync>;

/// The default predicate: retry transport failures, never query errors.
pub fn retry_transport_errors(err: &IndexerError) -> bool {
	err.is_transport()
}

/// Transport-level retry policy of the read-model client.
#[derive(Clone)]
pub struct RetryPolicy {
	/// Total number of attempts per query, including the first one.
	pub max_attempts: NonZeroU32,
	pub retry_predicate: RetryPredicate,
	pub initial_interval: Duration,
	pub max_interval: Duration,
}

impl RetryPolicy {
	/// A policy that makes exactly one attempt.
	pub fn no_retry() -> Self {
		Self {
			max_attempts: NonZeroU32::MIN,
			..Self::default()
		}
	}

	pub fn with_predicate(
		mut self,
		predicate: impl Fn(&IndexerError) -> bool + Send + Sync + 'static,
	) -> Self {
		self.retry_predicate = Arc::new(predicate);
		self
	}
}

impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			max_attempts: NonZeroU32::new(3).unwrap_or(NonZeroU32::MIN),
			retry_predicate: Arc::new(retry_transport_errors),
			initial_interval: Duration::from_millis(250),
			max_interval: Duration::from_secs(2),
		}
	}
}

impl fmt::Debug for RetryPolicy {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RetryPolicy")
			.field("max_attempts", &self.max_attempts)
			.field("initial_interval", &self.initial_interval)
			.field("max_interval", &self.max_interval)
			.finish_non_exhaustive()
	}
}

/// Read-model GraphQL client
#[derive(Clone, Debug)]
pub struct ReadModelClient {
	/// The underlying HTTP client. Only its connection pool outlives a call.
	http_client: Client,
	/// The GraphQL HTTP endpoint of the subgraph.
	indexer_url: String,
	retry: RetryPolicy,
}

impl ReadModelClient {
	/// Create a new read-model client.
	///
	/// # Arguments
	/// * `indexer_url` - The HTTP endpoint for GraphQL queries.
	/// * `request_timeout` - Per-request timeout; an elapsed timeout counts as a transport error.
	/// * `retry` - Transport retry policy.
	pub fn new(
		indexer_url: impl Into<String>,
		request_timeout: Duration,
		retry: RetryPolicy,
	) -> Result<Self, IndexerError> {
		let http_client = Client::builder()
			.timeout(request_timeout)
			.build()
			.map_err(|e| IndexerError::Client(e.to_string()))?;

		Ok(Self {
			http_client,
			indexer_url: indexer_url.into(),
			retry,
		})
	}

	pub fn url(&self) -> &str {
		&self.indexer_url
	}

	/// Run a named, parameterized query and decode its `data` object into `T`.
	///
	/// # Errors
	/// `IndexerError::Transport` once the retry budget is spent, or the first
	/// non-retryable error the endpoint produced.
	pub async fn query<T: DeserializeOwned + Send>(
		&self,
		operation_name: &str,
		query: &str,
		variables: Value,
	) -> Result<T, IndexerError> {
		let request = GraphQlRequest {
			query,
			variables,
			operation_name,
		};
		let max_attempts = self.retry.max_attempts.get();
		let attempts = AtomicU32::new(0);

		let backoff = ExponentialBackoffBuilder::new()
			.with_initial_interval(self.retry.initial_interval)
			.with_max_interval(self.retry.max_interval)
			.with_max_elapsed_time(None)
			.build();

		let request = &request;
		let attempts_ref = &attempts;
		let result = retry(backoff, move || async move {
			let attempt = attempts_ref.fetch_add(1, Ordering::SeqCst) + 1;
			debug!("Query {} attempt {}/{}", operation_name, attempt, max_attempts);

			match self.execute_once::<T>(request).await {
				Ok(data) => Ok(data),
				Err(err) if attempt < max_attempts && (self.retry.retry_predicate)(&err) => {
					warn!(
						"Query {} failed on attempt {}/{}, retrying: {}",
						operation_name, attempt, max_attempts, err
					);
					Err(backoff::Error::transient(err))
				}
				Err(err) => Err(backoff::Error::permanent(err)),
			}
		})
		.await;

		result.map_err(|err| match err {
			IndexerError::Transport { source, .. } => IndexerError::Transport {
				attempts: attempts.load(Ordering::SeqCst),
				source,
			},
			other => other,
		})
	}

	/// Fetch the indexer's own progress from the reserved `_meta` field.
	pub async fn meta(&self) -> Result<IndexerProgress, IndexerError> {
		let data: MetaData = self.query("HarnessMeta", META_QUERY, json!({})).await?;
		data.meta.map(Into::into).ok_or(IndexerError::NoData)
	}

	async fn execute_once<T: DeserializeOwned + Send>(
		&self,
		request: &GraphQlRequest<'_>,
	) -> Result<T, IndexerError> {
		let response = self
			.http_client
			.post(&self.indexer_url)
			.header(CACHE_CONTROL, "no-cache")
			.header(PRAGMA, "no-cache")
			.json(request)
			.send()
			.await
			.map_err(IndexerError::transport)?;

		let status = response.status();
		if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
			return Err(IndexerError::transport(TransportError::Status(status)));
		}

		let body = response.bytes().await.map_err(IndexerError::transport)?;

		if !status.is_success() {
			// Malformed queries come back as 4xx with a regular errors array
			if let Ok(parsed) = serde_json::from_slice::<GraphQlResponse<Value>>(&body) {
				if !parsed.errors.is_empty() {
					return Err(IndexerError::Query(parsed.errors));
				}
			}
			return Err(IndexerError::Http(status));
		}

		let parsed: GraphQlResponse<T> = serde_json::from_slice(&body)?;
		if !parsed.errors.is_empty() {
			return Err(IndexerError::Query(parsed.errors));
		}

		parsed.data.ok_or(IndexerError::NoData)
	}
}
