//! Cross-pool aggregation of balances and accrued interest.
//!
//! Every aggregate is computed from one aggregation cycle: a concurrent batch
//! of per-pool reads plus one ETH/USD rate read. Normalization only ever pairs
//! amounts with the rate fetched in the same cycle, and a failed read fails
//! the whole aggregate.

use crate::amount::{AmountError, NativeAmount, UsdAmount, checked_sum, normalize};
use crate::pool::{Pool, PoolUnit};
use crate::session::AccountSession;
use crate::sources::Sources;
use crate::sources::error::SourceError;
use futures::future::try_join_all;
use log::debug;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AggregationError {
    #[error("Source unavailable: {0}")]
    Source(#[from] SourceError),

    #[error("Amount contract violation: {0}")]
    Amount(#[from] AmountError),
}

/// Total balance across every pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateBalance {
    pub total: UsdAmount,
}

/// Total accrued interest across every pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateInterest {
    pub total: UsdAmount,
    /// Un-normalized interest from the yield pool, kept for divergence detection.
    pub yield_pool_raw: NativeAmount,
}

/// A single pool's balance, raw and normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolBalance {
    pub pool: Pool,
    pub raw: NativeAmount,
    pub usd: UsdAmount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reading {
    Balance,
    InterestAccrued,
}

/// Results of one aggregation cycle.
#[derive(Debug, Clone)]
struct AggregationCycle {
    raws: Vec<(Pool, NativeAmount)>,
    eth_usd_rate: NativeAmount,
}

impl AggregationCycle {
    fn raw(&self, pool: Pool) -> NativeAmount {
        self.raws
            .iter()
            .find(|(p, _)| *p == pool)
            .map(|(_, raw)| *raw)
            .unwrap_or(NativeAmount::ZERO)
    }

    /// Sum of every pool's contribution, recomputed from scratch.
    fn normalized_total(&self) -> Result<UsdAmount, AmountError> {
        checked_sum(
            self.raws
                .iter()
                .map(|(pool, raw)| normalize(*raw, *pool, self.eth_usd_rate)),
        )
    }
}

async fn read_pool(
    sources: &Sources,
    reading: Reading,
    pool: Pool,
    session: &AccountSession,
) -> Result<NativeAmount, SourceError> {
    match reading {
        Reading::Balance => sources.pools.balance_of(pool, session.address()).await,
        Reading::InterestAccrued => {
            sources
                .pools
                .interest_accrued_by(pool, session.address())
                .await
        }
    }
}

/// Issues every per-pool read and the rate read concurrently and waits for all.
async fn read_cycle(
    sources: &Sources,
    reading: Reading,
    session: &AccountSession,
) -> Result<AggregationCycle, SourceError> {
    let reads = Pool::all().map(|pool| async move {
        read_pool(sources, reading, pool, session)
            .await
            .map(|raw| (pool, raw))
    });

    let (raws, eth_usd_rate) =
        futures::try_join!(try_join_all(reads), sources.price.eth_usd_rate())?;

    debug!(
        "{:?} cycle for {} resolved with ETH/USD rate {}",
        reading,
        session.address(),
        eth_usd_rate
    );
    Ok(AggregationCycle { raws, eth_usd_rate })
}

/// Sums the account's normalized balance across every pool.
pub async fn aggregate_balance(
    session: &AccountSession,
    sources: &Sources,
) -> Result<AggregateBalance, AggregationError> {
    let cycle = read_cycle(sources, Reading::Balance, session).await?;
    Ok(AggregateBalance {
        total: cycle.normalized_total()?,
    })
}

/// Sums the account's normalized accrued interest across every pool.
pub async fn aggregate_interest(
    session: &AccountSession,
    sources: &Sources,
) -> Result<AggregateInterest, AggregationError> {
    let cycle = read_cycle(sources, Reading::InterestAccrued, session).await?;
    Ok(AggregateInterest {
        total: cycle.normalized_total()?,
        yield_pool_raw: cycle.raw(Pool::Yield),
    })
}

/// Reads one pool's balance. Ether balances are priced with a rate read in the same cycle.
pub async fn pool_balance(
    session: &AccountSession,
    sources: &Sources,
    pool: Pool,
) -> Result<PoolBalance, AggregationError> {
    let (raw, eth_usd_rate) = match pool.unit() {
        PoolUnit::Usd => (
            read_pool(sources, Reading::Balance, pool, session).await?,
            NativeAmount::ZERO,
        ),
        PoolUnit::Eth => futures::try_join!(
            read_pool(sources, Reading::Balance, pool, session),
            sources.price.eth_usd_rate()
        )?,
    };

    Ok(PoolBalance {
        pool,
        raw,
        usd: normalize(raw, pool, eth_usd_rate)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::{MockPoolBalanceSource, MockPriceOracle};
    use crate::test_support::{account, sources_with, units};
    use rust_decimal::Decimal;

    fn each_pool(
        stable: NativeAmount,
        yield_: NativeAmount,
        ethereum: NativeAmount,
    ) -> [(Pool, NativeAmount); 3] {
        [
            (Pool::Stable, stable),
            (Pool::Yield, yield_),
            (Pool::Ethereum, ethereum),
        ]
    }

    fn pools_returning(
        balances: [(Pool, NativeAmount); 3],
        interest: [(Pool, NativeAmount); 3],
    ) -> MockPoolBalanceSource {
        let mut pools = MockPoolBalanceSource::new();
        pools.expect_balance_of().returning(move |pool, _| {
            Ok(balances.iter().find(|(p, _)| *p == pool).unwrap().1)
        });
        pools.expect_interest_accrued_by().returning(move |pool, _| {
            Ok(interest.iter().find(|(p, _)| *p == pool).unwrap().1)
        });
        pools
    }

    fn price_returning(rate: NativeAmount) -> MockPriceOracle {
        let mut price = MockPriceOracle::new();
        price.expect_eth_usd_rate().returning(move || Ok(rate));
        price
    }

    #[tokio::test]
    async fn stable_only_balance_totals_in_usd() {
        let pools = pools_returning(
            [
                (Pool::Stable, units(1_000)),
                (Pool::Yield, NativeAmount::ZERO),
                (Pool::Ethereum, NativeAmount::ZERO),
            ],
            each_pool(NativeAmount::ZERO, NativeAmount::ZERO, NativeAmount::ZERO),
        );
        let sources = sources_with(pools, price_returning(units(1_800)));

        let balance = aggregate_balance(&account(0xA), &sources).await.unwrap();
        assert_eq!(balance.total.as_decimal(), Decimal::from(1_000));
    }

    #[tokio::test]
    async fn eth_balance_is_converted_with_cycle_rate() {
        let pools = pools_returning(
            [
                (Pool::Stable, units(100)),
                (Pool::Yield, units(50)),
                (Pool::Ethereum, units(2)),
            ],
            each_pool(NativeAmount::ZERO, NativeAmount::ZERO, NativeAmount::ZERO),
        );
        let sources = sources_with(pools, price_returning(units(1_800)));

        let balance = aggregate_balance(&account(1), &sources).await.unwrap();
        assert_eq!(balance.total.as_decimal(), Decimal::from(3_750));
    }

    #[tokio::test]
    async fn interest_keeps_raw_yield_figure() {
        let yield_interest = NativeAmount::from_raw(alloy_primitives::U256::from(7u8));
        let pools = pools_returning(
            each_pool(NativeAmount::ZERO, NativeAmount::ZERO, NativeAmount::ZERO),
            [
                (Pool::Stable, units(3)),
                (Pool::Yield, yield_interest),
                (Pool::Ethereum, units(1)),
            ],
        );
        let sources = sources_with(pools, price_returning(units(2_000)));

        let interest = aggregate_interest(&account(1), &sources).await.unwrap();
        assert_eq!(interest.yield_pool_raw, yield_interest);
        assert_eq!(
            interest.total.as_decimal(),
            Decimal::from_i128_with_scale(2_003_000_000_000_000_000_007, 18)
        );
    }

    #[tokio::test]
    /// One failed read fails the aggregate; no partial total is produced.
    async fn failed_rate_read_fails_whole_aggregate() {
        let pools = pools_returning(
            each_pool(units(1_000), units(1_000), units(1)),
            each_pool(NativeAmount::ZERO, NativeAmount::ZERO, NativeAmount::ZERO),
        );
        let mut price = MockPriceOracle::new();
        price.expect_eth_usd_rate().returning(|| {
            Err(SourceError::Http {
                status: 503,
                message: "oracle down".to_string(),
            })
        });
        let sources = sources_with(pools, price);

        let result = aggregate_balance(&account(1), &sources).await;
        assert!(matches!(
            result,
            Err(AggregationError::Source(SourceError::Http { status: 503, .. }))
        ));
    }

    #[tokio::test]
    async fn failed_pool_read_fails_interest_aggregate() {
        let mut pools = MockPoolBalanceSource::new();
        pools
            .expect_interest_accrued_by()
            .returning(|pool, _| match pool {
                Pool::Ethereum => Err(SourceError::Http {
                    status: 500,
                    message: "revert".to_string(),
                }),
                _ => Ok(NativeAmount::from_units(1)),
            });
        let sources = sources_with(pools, price_returning(units(1)));

        assert!(aggregate_interest(&account(1), &sources).await.is_err());
    }

    #[tokio::test]
    /// Every pool is read exactly once per cycle, plus one rate read.
    async fn cycle_reads_each_pool_once() {
        let mut pools = MockPoolBalanceSource::new();
        for pool in Pool::all() {
            pools
                .expect_balance_of()
                .withf(move |p, _| *p == pool)
                .times(1)
                .returning(|_, _| Ok(NativeAmount::ZERO));
        }
        let mut price = MockPriceOracle::new();
        price
            .expect_eth_usd_rate()
            .times(1)
            .returning(|| Ok(NativeAmount::ZERO));
        let sources = sources_with(pools, price);

        let balance = aggregate_balance(&account(1), &sources).await.unwrap();
        assert!(balance.total.is_zero());
    }

    #[tokio::test]
    /// Two pools that each normalize fine can still overflow once summed.
    async fn total_past_decimal_range_is_an_amount_error() {
        // 5e28 USD per pool at 18 decimals
        let ten = alloy_primitives::U256::from(10u8);
        let half = NativeAmount::from_raw(
            alloy_primitives::U256::from(5u8) * ten.pow(alloy_primitives::U256::from(46u8)),
        );
        let pools = pools_returning(
            each_pool(half, half, NativeAmount::ZERO),
            each_pool(NativeAmount::ZERO, NativeAmount::ZERO, NativeAmount::ZERO),
        );
        let sources = sources_with(pools, price_returning(units(1_800)));

        let result = aggregate_balance(&account(1), &sources).await;
        assert!(matches!(
            result,
            Err(AggregationError::Amount(AmountError::Overflow))
        ));
    }

    #[tokio::test]
    async fn usd_pool_balance_skips_rate_read() {
        let mut pools = MockPoolBalanceSource::new();
        pools
            .expect_balance_of()
            .returning(|_, _| Ok(NativeAmount::from_units(25)));
        let mut price = MockPriceOracle::new();
        price.expect_eth_usd_rate().never();
        let sources = sources_with(pools, price);

        let balance = pool_balance(&account(1), &sources, Pool::Yield)
            .await
            .unwrap();
        assert_eq!(balance.raw, units(25));
        assert_eq!(balance.usd.as_decimal(), Decimal::from(25));
    }

    #[tokio::test]
    async fn eth_pool_balance_is_priced() {
        let mut pools = MockPoolBalanceSource::new();
        pools
            .expect_balance_of()
            .returning(|_, _| Ok(NativeAmount::from_units(2)));
        let sources = sources_with(pools, price_returning(units(1_800)));

        let balance = pool_balance(&account(1), &sources, Pool::Ethereum)
            .await
            .unwrap();
        assert_eq!(balance.usd.as_decimal(), Decimal::from(3_600));
    }
}
