//! Read-model integration module for the subgraph
//!
//! This module provides the GraphQL client, the composite entity keys and the typed query layer
//! used to read the entities the indexer derives from ledger events. The harness only ever reads
//! from the indexer.

/// GraphQL client with transport retries
mod client;
/// Typed entity projections
pub mod entities;
/// Composite entity key construction
pub mod keys;
/// Typed per-entity accessors
mod queries;
/// Wire types and errors
mod types;

pub use client::{ReadModelClient, RetryPolicy, RetryPredicate, retry_transport_errors};
pub use keys::{Address, EntityKey, KeyError};
pub use queries::ReadModelQueries;
pub use types::*;
