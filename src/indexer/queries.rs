//!
//! Typed read-model accessors.
//!
//! One accessor per entity kind. A missing entity is `Ok(None)`, never an error, so callers can
//! assert deletion or absence without confusing it with a failed query. Every call is a fresh
//! request through [`ReadModelClient`].

use super::client::ReadModelClient;
use super::entities::*;
use super::keys::{self, Address, EntityKey};
use super::types::IndexerError;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::debug;

const BIDS_QUERY: &str = r#"
    query BidsForProject($project: String!, $bidder: String) {
        bids(
            where: { project: $project, bidder: $bidder }
            orderBy: timestamp
            orderDirection: asc
            first: 1000
        ) {
            id project { id } minter { id } bidder { id } value slotIndex isRemoved settled timestamp updatedAt
        }
    }
"#;

const BIDS_QUERY_ALL_BIDDERS: &str = r#"
    query BidsForProject($project: String!) {
        bids(
            where: { project: $project }
            orderBy: timestamp
            orderDirection: asc
            first: 1000
        ) {
            id project { id } minter { id } bidder { id } value slotIndex isRemoved settled timestamp updatedAt
        }
    }
"#;

#[derive(Deserialize)]
struct BidsData {
	bids: Vec<Bid>,
}

/// The query layer over the subgraph.
#[derive(Clone, Debug)]
pub struct ReadModelQueries {
	client: ReadModelClient,
}

impl ReadModelQueries {
	pub fn new(client: ReadModelClient) -> Self {
		Self { client }
	}

	pub fn client(&self) -> &ReadModelClient {
		&self.client
	}

	/// Fetch a single entity by key.
	///
	/// # Returns
	/// `Ok(None)` when the indexer answers `null` for the key.
	pub async fn entity<T: Entity>(&self, key: &EntityKey) -> Result<Option<T>, IndexerError> {
		let query = format!(
			"query {op}($id: ID!) {{ {field}(id: $id) {{ {selection} }} }}",
			op = T::OPERATION,
			field = T::FIELD,
			selection = T::SELECTION,
		);

		let mut data: Map<String, Value> = self
			.client
			.query(T::OPERATION, &query, json!({ "id": key.as_str() }))
			.await?;

		match data.remove(T::FIELD) {
			None => Err(IndexerError::NoData),
			Some(Value::Null) => {
				debug!("{} {} not found", T::OPERATION, key);
				Ok(None)
			}
			Some(value) => Ok(Some(serde_json::from_value(value)?)),
		}
	}

	pub async fn minter(&self, minter: &Address) -> Result<Option<Minter>, IndexerError> {
		self.entity(&minter.into()).await
	}

	pub async fn minter_filter(
		&self,
		minter_filter: &Address,
	) -> Result<Option<MinterFilter>, IndexerError> {
		self.entity(&minter_filter.into()).await
	}

	pub async fn project(
		&self,
		core: &Address,
		project_number: u64,
	) -> Result<Option<Project>, IndexerError> {
		self.entity(&keys::project(core, project_number)).await
	}

	pub async fn project_minter_configuration(
		&self,
		key: &EntityKey,
	) -> Result<Option<ProjectMinterConfiguration>, IndexerError> {
		self.entity(key).await
	}

	pub async fn receipt(&self, key: &EntityKey) -> Result<Option<Receipt>, IndexerError> {
		self.entity(key).await
	}

	pub async fn bid(&self, key: &EntityKey) -> Result<Option<Bid>, IndexerError> {
		self.entity(key).await
	}

	pub async fn core_registry(
		&self,
		core_registry: &Address,
	) -> Result<Option<CoreRegistry>, IndexerError> {
		self.entity(&core_registry.into()).await
	}

	pub async fn split_atomic_factory(
		&self,
		factory: &Address,
	) -> Result<Option<SplitAtomicFactory>, IndexerError> {
		self.entity(&factory.into()).await
	}

	pub async fn pmp_project_config(
		&self,
		key: &EntityKey,
	) -> Result<Option<PmpProjectConfig>, IndexerError> {
		self.entity(key).await
	}

	pub async fn pmp_token_config(
		&self,
		key: &EntityKey,
	) -> Result<Option<PmpTokenConfig>, IndexerError> {
		self.entity(key).await
	}

	/// All bids on a project in placement order, optionally narrowed to one bidder.
	pub async fn bids_for_project(
		&self,
		project: &EntityKey,
		bidder: Option<&Address>,
	) -> Result<Vec<Bid>, IndexerError> {
		let data: BidsData = match bidder {
			Some(bidder) => {
				self.client
					.query(
						"BidsForProject",
						BIDS_QUERY,
						json!({ "project": project.as_str(), "bidder": bidder.as_str() }),
					)
					.await?
			}
			None => {
				self.client
					.query(
						"BidsForProject",
						BIDS_QUERY_ALL_BIDDERS,
						json!({ "project": project.as_str() }),
					)
					.await?
			}
		};
		Ok(data.bids)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::indexer::client::RetryPolicy;
	use std::time::Duration;
	use wiremock::matchers as m;
	use wiremock::{Mock, MockServer, ResponseTemplate};

	const CORE: &str = "0x5fbdb2315678afecb367f032d93f642f64180aa3";
	const MINTER: &str = "0xe7f1725e7734ce288f8367e1bb143e90bb3f0512";

	async fn make_queries() -> (MockServer, ReadModelQueries) {
		let server = MockServer::start().await;
		let client =
			ReadModelClient::new(server.uri(), Duration::from_secs(5), RetryPolicy::no_retry())
				.unwrap();
		(server, ReadModelQueries::new(client))
	}

	fn config_row(price: Option<&str>) -> Value {
		json!({
			"id": format!("{MINTER}-{CORE}-0"),
			"project": { "id": format!("{CORE}-0") },
			"minter": { "id": MINTER },
			"priceIsConfigured": price.is_some(),
			"basePrice": price,
			"currencySymbol": "ETH",
			"currencyAddress": "0x0000000000000000000000000000000000000000",
			"purchaseToDisabled": false,
			"extraMinterDetails": "{}",
			"maxInvocations": null
		})
	}

	#[tokio::test]
	async fn missing_entity_is_none_not_an_error() {
		let (server, queries) = make_queries().await;

		Mock::given(m::method("POST"))
			.and(m::body_partial_json(json!({ "operationName": "Receipt" })))
			.respond_with(
				ResponseTemplate::new(200).set_body_json(json!({ "data": { "receipt": null } })),
			)
			.expect(1)
			.mount(&server)
			.await;

		let key = EntityKey::from_canonical("0xdead-0xbeef-0-0xcafe");
		assert_eq!(queries.receipt(&key).await.unwrap(), None);
	}

	#[tokio::test]
	async fn mixed_case_addresses_query_the_canonical_key() {
		let (server, queries) = make_queries().await;

		Mock::given(m::method("POST"))
			.and(m::body_partial_json(json!({
				"operationName": "ProjectMinterConfiguration",
				"variables": { "id": format!("{MINTER}-{CORE}-0") }
			})))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({
				"data": { "projectMinterConfiguration": config_row(Some("1000000000000000000")) }
			})))
			.expect(2)
			.mount(&server)
			.await;

		let core_upper = Address::parse("0x5FBDB2315678AFECB367F032D93F642F64180AA3").unwrap();
		let core_lower = Address::parse(CORE).unwrap();
		let minter = Address::parse(MINTER).unwrap();

		let a = queries
			.project_minter_configuration(&keys::minter_config(&minter, &core_upper, 0))
			.await
			.unwrap()
			.unwrap();
		let b = queries
			.project_minter_configuration(&keys::minter_config(&minter, &core_lower, 0))
			.await
			.unwrap()
			.unwrap();

		assert_eq!(a, b);
		assert_eq!(a.base_price, Some(1_000_000_000_000_000_000));
	}

	#[tokio::test]
	async fn accessors_are_never_memoized() {
		let (server, queries) = make_queries().await;
		let minter = Address::parse(MINTER).unwrap();
		let minter_row = |allowlisted: bool| {
			json!({ "data": { "minter": {
				"id": MINTER,
				"type": "MinterSetPriceV5",
				"minterFilter": { "id": "0x9fe46736679d2d9a65f0992f2272de9f3c7fa6e0" },
				"isGloballyAllowlistedOnMinterFilter": allowlisted,
				"extraMinterDetails": "{}",
				"updatedAt": "1"
			}}})
		};

		Mock::given(m::method("POST"))
			.respond_with(ResponseTemplate::new(200).set_body_json(minter_row(true)))
			.up_to_n_times(1)
			.expect(1)
			.mount(&server)
			.await;
		Mock::given(m::method("POST"))
			.respond_with(ResponseTemplate::new(200).set_body_json(minter_row(false)))
			.expect(1)
			.mount(&server)
			.await;

		let first = queries.minter(&minter).await.unwrap().unwrap();
		let second = queries.minter(&minter).await.unwrap().unwrap();

		assert!(first.is_globally_allowlisted_on_minter_filter);
		assert!(!second.is_globally_allowlisted_on_minter_filter);
	}

	#[tokio::test]
	async fn query_failure_is_distinct_from_absence() {
		let (server, queries) = make_queries().await;

		Mock::given(m::method("POST"))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({
				"errors": [{ "message": "indexing_error" }]
			})))
			.mount(&server)
			.await;

		let core = Address::parse(CORE).unwrap();
		assert!(matches!(
			queries.project(&core, 0).await,
			Err(IndexerError::Query(_))
		));
	}

	#[tokio::test]
	async fn bids_for_project_filters_by_bidder() {
		let (server, queries) = make_queries().await;
		let bidder = Address::parse("0x70997970c51812dc3a010c7d01b50e0d17dc79c8").unwrap();

		Mock::given(m::method("POST"))
			.and(m::body_partial_json(json!({
				"variables": { "project": format!("{CORE}-0"), "bidder": bidder.as_str() }
			})))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": { "bids": [{
				"id": format!("{MINTER}-{CORE}-0-1"),
				"project": { "id": format!("{CORE}-0") },
				"minter": { "id": MINTER },
				"bidder": { "id": bidder.as_str() },
				"value": "0",
				"slotIndex": null,
				"isRemoved": true,
				"settled": false,
				"timestamp": "1700000000",
				"updatedAt": "1700000010"
			}]}})))
			.expect(1)
			.mount(&server)
			.await;

		let core = Address::parse(CORE).unwrap();
		let bids = queries
			.bids_for_project(&keys::project(&core, 0), Some(&bidder))
			.await
			.unwrap();

		assert_eq!(bids.len(), 1);
		assert_eq!(bids[0].bidder.id, bidder);
		assert_eq!(bids[0].value, 0);
		assert_eq!(bids[0].slot_index, None);
	}
}
