use super::time_budget;
use crate::config::HarnessConfig;
use crate::indexer::entities::Bid;
use crate::indexer::{Address, EntityKey, keys};
use crate::ledger::actions::RankedAuctionMinter;
use crate::scenario::{
    CleanupError, Scenario, ScenarioContext, ScenarioError, Synced, ensure_eq, ensure_some,
};
use crate::utils::format_eth;

use async_trait::async_trait;
use std::collections::HashSet;
use std::time::Duration;
use tracing::info;

/// Two bidders bid the same slot on a full ranked auction; the second bid displaces the first.
///
/// The fixture project must have an auction in progress with exactly one token, so that any
/// accepted bid pushes the lowest standing bid out.
pub struct RankedAuctionBidDisplacement {
    slot: u16,
    slot_price_wei: u128,
    timeout: Duration,
    /// Bid ids present before the run, so the new bids can be told apart.
    known_bids: HashSet<String>,
}

impl RankedAuctionBidDisplacement {
    pub const NAME: &'static str = "ranked-auction-bid-displacement";

    pub fn new(slot: u16, slot_price_wei: u128, timeout: Duration) -> Self {
        Self {
            slot,
            slot_price_wei,
            timeout,
            known_bids: HashSet::new(),
        }
    }

    pub fn from_config(config: &HarnessConfig) -> Self {
        Self::new(
            config.fixtures.bid_slot,
            config.fixtures.bid_slot_price_wei,
            time_budget(config, 2, 2),
        )
    }

    /// The most recent bid by `bidder` that did not exist before the run.
    async fn new_bid(
        &self,
        synced: &Synced<'_>,
        project: &EntityKey,
        bidder: &Address,
    ) -> Result<Bid, ScenarioError> {
        let bids = synced.queries().bids_for_project(project, Some(bidder)).await?;
        ensure_some(
            &format!("new bid by {}", bidder),
            bids.into_iter()
                .rev()
                .find(|bid| !self.known_bids.contains(&bid.id)),
        )
    }
}

#[async_trait]
impl Scenario for RankedAuctionBidDisplacement {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn required_contracts(&self) -> &'static [&'static str] {
        &["core", "minter_ram"]
    }

    async fn snapshot(&mut self, ctx: &ScenarioContext) -> Result<(), ScenarioError> {
        let project = keys::project(ctx.contract("core")?, ctx.project_number());
        let synced = ctx.sync_to_head().await?;
        self.known_bids = synced
            .queries()
            .bids_for_project(&project, None)
            .await?
            .into_iter()
            .map(|bid| bid.id)
            .collect();
        Ok(())
    }

    async fn run(&mut self, ctx: &ScenarioContext) -> Result<(), ScenarioError> {
        let core = ctx.contract("core")?.clone();
        let minter = RankedAuctionMinter::new(ctx.contract("minter_ram")?.clone());
        let n = ctx.project_number();
        let project = keys::project(&core, n);
        let accounts = ctx.accounts();

        info!(
            "[{}] Placing two bids of {} on slot {}",
            ctx.scenario(),
            format_eth(self.slot_price_wei),
            self.slot
        );
        let (slot, value) = (self.slot, self.slot_price_wei);
        let first = minter.create_bid(&accounts.bidder_a, n, &core, slot, value)?;
        let second = minter.create_bid(&accounts.bidder_b, n, &core, slot, value)?;
        ctx.submit(first).await?;
        let last = ctx.submit(second).await?;

        let synced = ctx.sync(&last).await?;

        let displaced = self.new_bid(&synced, &project, &accounts.bidder_a).await?;
        ensure_eq("displaced bid value", 0, displaced.value)?;
        ensure_eq("displaced bid slot", None, displaced.slot_index)?;

        let standing = self.new_bid(&synced, &project, &accounts.bidder_b).await?;
        ensure_eq("standing bid slot", Some(u128::from(self.slot)), standing.slot_index)?;
        ensure_eq("standing bid value", self.slot_price_wei, standing.value)?;

        Ok(())
    }

    async fn cleanup(&mut self, _ctx: &ScenarioContext) -> Result<(), CleanupError> {
        Err(CleanupError::Benign("placed bids cannot be withdrawn".into()))
    }
}
