use super::time_budget;
use crate::config::HarnessConfig;
use crate::indexer::{Address, EntityKey, keys};
use crate::ledger::actions::SetPriceMinter;
use crate::scenario::{
    CleanupError, Scenario, ScenarioContext, ScenarioError, ensure, ensure_eq, ensure_some,
};
use crate::utils::format_eth;

use async_trait::async_trait;
use std::time::Duration;
use tracing::info;

/// Configure a price on the set-price minter, then reset it, checking the project's minter
/// configuration after each step.
pub struct SetPriceLifecycle {
    price_wei: u128,
    timeout: Duration,
    /// Price configured before the scenario ran, restored by cleanup.
    previous_price: Option<u128>,
    reset_confirmed: bool,
}

struct Fixture {
    core: Address,
    minter: SetPriceMinter,
    artist: Address,
    project_number: u64,
}

impl Fixture {
    fn new(ctx: &ScenarioContext) -> Result<Self, ScenarioError> {
        Ok(Self {
            core: ctx.contract("core")?.clone(),
            minter: SetPriceMinter::new(ctx.contract("minter_set_price")?.clone()),
            artist: ctx.accounts().artist.clone(),
            project_number: ctx.project_number(),
        })
    }

    fn config_key(&self) -> EntityKey {
        keys::minter_config(&self.minter.address, &self.core, self.project_number)
    }
}

impl SetPriceLifecycle {
    pub const NAME: &'static str = "set-price-lifecycle";

    pub fn new(price_wei: u128, timeout: Duration) -> Self {
        Self {
            price_wei,
            timeout,
            previous_price: None,
            reset_confirmed: false,
        }
    }

    pub fn from_config(config: &HarnessConfig) -> Self {
        Self::new(
            config.fixtures.set_price_wei,
            time_budget(config, 3, 3),
        )
    }
}

#[async_trait]
impl Scenario for SetPriceLifecycle {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn required_contracts(&self) -> &'static [&'static str] {
        &["core", "minter_set_price"]
    }

    async fn snapshot(&mut self, ctx: &ScenarioContext) -> Result<(), ScenarioError> {
        let fixture = Fixture::new(ctx)?;
        let synced = ctx.sync_to_head().await?;
        self.previous_price = synced
            .queries()
            .project_minter_configuration(&fixture.config_key())
            .await?
            .filter(|config| config.price_is_configured)
            .and_then(|config| config.base_price);

        if let Some(price) = self.previous_price {
            info!("[{}] Project price is {} before the run", ctx.scenario(), format_eth(price));
        }
        Ok(())
    }

    async fn run(&mut self, ctx: &ScenarioContext) -> Result<(), ScenarioError> {
        let fixture = Fixture::new(ctx)?;
        let key = fixture.config_key();

        info!(
            "[{}] Setting price of project {} to {}",
            ctx.scenario(),
            fixture.project_number,
            format_eth(self.price_wei)
        );
        let set = ctx
            .submit(fixture.minter.update_price(
                &fixture.artist,
                fixture.project_number,
                &fixture.core,
                self.price_wei,
            )?)
            .await?;

        let synced = ctx.sync(&set).await?;
        let config = ensure_some(
            "minter configuration after update",
            synced.queries().project_minter_configuration(&key).await?,
        )?;
        ensure_eq("priceIsConfigured after update", true, config.price_is_configured)?;
        ensure_eq("basePrice after update", Some(self.price_wei), config.base_price)?;

        info!("[{}] Resetting price of project {}", ctx.scenario(), fixture.project_number);
        let reset = ctx
            .submit(fixture.minter.reset_price(
                &fixture.artist,
                fixture.project_number,
                &fixture.core,
            )?)
            .await?;
        self.reset_confirmed = true;
        ensure("reset confirmed above the update", reset.height > set.height)?;

        let synced = ctx.sync(&reset).await?;
        let config = ensure_some(
            "minter configuration after reset",
            synced.queries().project_minter_configuration(&key).await?,
        )?;
        ensure_eq("priceIsConfigured after reset", false, config.price_is_configured)?;
        ensure_eq("basePrice after reset", None, config.base_price)?;

        Ok(())
    }

    async fn cleanup(&mut self, ctx: &ScenarioContext) -> Result<(), CleanupError> {
        let fixture = Fixture::new(ctx)?;

        if let Some(price) = self.previous_price {
            info!("[{}] Restoring price {}", ctx.scenario(), format_eth(price));
            ctx.submit(fixture.minter.update_price(
                &fixture.artist,
                fixture.project_number,
                &fixture.core,
                price,
            )?)
            .await?;
            return Ok(());
        }

        if self.reset_confirmed {
            return Err(CleanupError::Benign("price already reset".into()));
        }

        let reset = fixture.minter.reset_price(
            &fixture.artist,
            fixture.project_number,
            &fixture.core,
        )?;
        match ctx.submit(reset).await {
            Ok(_) => Ok(()),
            Err(ScenarioError::Ledger(e)) if e.is_revert() => {
                Err(CleanupError::Benign(format!("nothing to reset: {}", e)))
            }
            Err(e) => Err(e.into()),
        }
    }
}
