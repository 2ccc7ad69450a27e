//! Verifies that a subgraph read model reflects ledger mutations once the indexer has caught up.
//!
//! Scenarios mutate contracts on the ledger, wait on the [`sync::SyncBarrier`] for the height
//! their mutation was confirmed at, then assert on the entities returned by
//! [`indexer::ReadModelQueries`].

pub mod config;
pub mod indexer;
pub mod ledger;
pub mod scenario;
pub mod scenarios;
pub mod sync;
pub mod utils;
