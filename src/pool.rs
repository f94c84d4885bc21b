//! The fixed set of yield-bearing pools.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use strum::EnumIter;

/// One of the pools an account can deposit into.
///
/// Declaration order is the enumeration order used for display and aggregation.
#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    strum::Display,
    strum::AsRefStr,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Pool {
    /// Stablecoin pool, denominated in a USD-pegged unit.
    Stable,
    /// Diversified yield pool, denominated in a USD-pegged unit.
    Yield,
    /// Ether pool, denominated in ETH.
    Ethereum,
}

/// Base unit a pool's native amounts are denominated in.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PoolUnit {
    Usd,
    Eth,
}

impl Pool {
    /// All pools, in enumeration order.
    pub fn all() -> [Pool; 3] {
        [Pool::Stable, Pool::Yield, Pool::Ethereum]
    }

    pub fn unit(&self) -> PoolUnit {
        match self {
            Pool::Stable | Pool::Yield => PoolUnit::Usd,
            Pool::Ethereum => PoolUnit::Eth,
        }
    }

    /// Human readable pool name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Pool::Stable => "Stable Pool",
            Pool::Yield => "Yield Pool",
            Pool::Ethereum => "Ethereum Pool",
        }
    }
}

/// Yearly returns of one pool, in percent.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct PoolApy {
    /// Paid by the pool itself.
    pub pool_apy: Decimal,
    /// Extra returns paid out in RGT.
    pub rgt_apr: Decimal,
}

impl Display for PoolApy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let percent =
            |rate: Decimal| rate.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        write!(
            f,
            "{:.2}% APY + ({:.2}% RGT)",
            percent(self.pool_apy),
            percent(self.rgt_apr)
        )
    }
}
