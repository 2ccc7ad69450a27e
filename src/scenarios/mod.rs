//! Built-in end-to-end scenarios
//!
//! Each one drives a minter on the fixture project and checks the read model reflects exactly
//! what was confirmed on the ledger.

/// Bid displacement on a ranked auction minter
pub mod ranked_auction;
/// Price configuration and reset on a fixed-price minter
pub mod set_price;

pub use ranked_auction::RankedAuctionBidDisplacement;
pub use set_price::SetPriceLifecycle;

use crate::config::HarnessConfig;
use crate::scenario::Scenario;
use std::time::Duration;

/// Headroom for the read-model queries themselves.
const QUERY_SLACK: Duration = Duration::from_secs(30);

/// Enough wall-clock time for `syncs` barrier calls and `mutations` confirmations.
pub(crate) fn time_budget(config: &HarnessConfig, syncs: u32, mutations: u32) -> Duration {
    config.barrier_config().worst_case_wait() * syncs
        + config.confirmation_timeout() * mutations
        + QUERY_SLACK
}

/// Every built-in scenario, in the order they run.
pub fn all(config: &HarnessConfig) -> Vec<Box<dyn Scenario>> {
    vec![
        Box::new(SetPriceLifecycle::from_config(config)),
        Box::new(RankedAuctionBidDisplacement::from_config(config)),
    ]
}
