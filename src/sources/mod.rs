//! Read-only boundary to the pools, the price oracle and the governance token.

use crate::amount::NativeAmount;
use crate::pool::{Pool, PoolApy};
use crate::sources::error::SourceError;
use alloy_primitives::Address;
use std::sync::Arc;

pub(crate) mod client;
pub use client::GatewayClient;
pub mod error;

#[cfg(test)]
use mockall::automock;

/// Supplies the current ETH to USD conversion rate.
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait PriceOracle: Send + Sync {
    /// ETH/USD as an 18-decimal fixed-point ratio.
    async fn eth_usd_rate(&self) -> Result<NativeAmount, SourceError>;
}

/// Supplies per-pool raw balances and accrued interest for an account.
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait PoolBalanceSource: Send + Sync {
    /// Raw balance of `address` in `pool`, in the pool's native unit.
    async fn balance_of(&self, pool: Pool, address: Address) -> Result<NativeAmount, SourceError>;

    /// Raw interest accrued by `address` in `pool`, in the pool's native unit.
    async fn interest_accrued_by(
        &self,
        pool: Pool,
        address: Address,
    ) -> Result<NativeAmount, SourceError>;
}

/// Governance token reads. Both figures are USD-pegged.
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait GovernanceSource: Send + Sync {
    async fn rgt_exchange_rate(&self) -> Result<NativeAmount, SourceError>;

    async fn rgt_balance_of(&self, address: Address) -> Result<NativeAmount, SourceError>;
}

/// Total value locked across all pools, USD at 18-decimal scale.
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait TvlSource: Send + Sync {
    async fn total_value_locked(&self) -> Result<NativeAmount, SourceError>;
}

/// Current yields of each pool.
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait ApySource: Send + Sync {
    async fn pool_apy(&self, pool: Pool) -> Result<PoolApy, SourceError>;
}

/// Informational news feed.
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait NewsSource: Send + Sync {
    async fn fetch_news_items(&self) -> Result<Vec<String>, SourceError>;
}

/// Every source the dashboard reads from.
#[derive(Clone)]
pub struct Sources {
    pub price: Arc<dyn PriceOracle>,
    pub pools: Arc<dyn PoolBalanceSource>,
    pub governance: Arc<dyn GovernanceSource>,
    pub tvl: Arc<dyn TvlSource>,
    pub apy: Arc<dyn ApySource>,
    pub news: Arc<dyn NewsSource>,
}

impl Sources {
    /// Routes every read through one gateway client.
    pub fn from_gateway(client: GatewayClient) -> Self {
        let client = Arc::new(client);
        Self {
            price: client.clone(),
            pools: client.clone(),
            governance: client.clone(),
            tvl: client.clone(),
            apy: client.clone(),
            news: client,
        }
    }
}
