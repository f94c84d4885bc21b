//! Shared fixtures for unit tests.

use crate::amount::NativeAmount;
use crate::pool::PoolApy;
use crate::session::AccountSession;
use crate::sources::{
    MockApySource, MockGovernanceSource, MockNewsSource, MockPoolBalanceSource, MockPriceOracle,
    MockTvlSource, Sources,
};
use alloy_primitives::Address;
use std::sync::Arc;

pub fn address(n: u64) -> Address {
    Address::left_padding_from(&n.to_be_bytes())
}

pub fn account(n: u64) -> AccountSession {
    AccountSession::new(address(n), 0)
}

pub fn units(n: u64) -> NativeAmount {
    NativeAmount::from_units(n)
}

/// Pool and price mocks, with the remaining sources left without expectations.
pub fn sources_with(pools: MockPoolBalanceSource, price: MockPriceOracle) -> Sources {
    Sources {
        price: Arc::new(price),
        pools: Arc::new(pools),
        governance: Arc::new(MockGovernanceSource::new()),
        tvl: Arc::new(MockTvlSource::new()),
        apy: Arc::new(MockApySource::new()),
        news: Arc::new(MockNewsSource::new()),
    }
}

/// Every source answers: `units` in each pool, no interest, ETH at `eth_usd` USD,
/// RGT at 1 USD, a TVL of one million, flat zero yields and a single news item.
pub fn static_sources(balance_units: u64, eth_usd: u64) -> Sources {
    let mut pools = MockPoolBalanceSource::new();
    pools
        .expect_balance_of()
        .returning(move |_, _| Ok(units(balance_units)));
    pools
        .expect_interest_accrued_by()
        .returning(|_, _| Ok(NativeAmount::ZERO));

    let mut price = MockPriceOracle::new();
    price
        .expect_eth_usd_rate()
        .returning(move || Ok(units(eth_usd)));

    let mut governance = MockGovernanceSource::new();
    governance.expect_rgt_exchange_rate().returning(|| Ok(units(1)));
    governance
        .expect_rgt_balance_of()
        .returning(|_| Ok(NativeAmount::ZERO));

    let mut tvl = MockTvlSource::new();
    tvl.expect_total_value_locked()
        .returning(|| Ok(units(1_000_000)));

    let mut apy = MockApySource::new();
    apy.expect_pool_apy().returning(|_| Ok(PoolApy::default()));

    let mut news = MockNewsSource::new();
    news.expect_fetch_news_items()
        .returning(|| Ok(vec!["Welcome".to_string()]));

    Sources {
        price: Arc::new(price),
        pools: Arc::new(pools),
        governance: Arc::new(governance),
        tvl: Arc::new(tvl),
        apy: Arc::new(apy),
        news: Arc::new(news),
    }
}
