//! Point-in-time view of every dashboard stat
//!
//! Contains the snapshot types handed to presentation and the plain-text renderer

use crate::amount::UsdAmount;
use crate::cache::FetchState;
use crate::consts::portal_consts::{APY_PLACEHOLDER, USD_PLACEHOLDER};
use crate::error_classifier::LogLevel;
use crate::pool::{Pool, PoolApy};
use alloy_primitives::Address;
use num_format::{Locale, ToFormattedString};
use std::fmt::{Display, Formatter};

/// Every stat the dashboard shows.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum StatKind {
    AccountBalance,
    InterestEarned,
    Pool(Pool),
    PoolApy(Pool),
    RgtPrice,
    RgtBalance,
    Tvl,
    News,
    DivergenceLoss,
}

impl Display for StatKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StatKind::AccountBalance => write!(f, "Account Balance"),
            StatKind::InterestEarned => write!(f, "Interest Earned"),
            StatKind::Pool(pool) => write!(f, "{}", pool.display_name()),
            StatKind::PoolApy(pool) => write!(f, "{} APY", pool.display_name()),
            StatKind::RgtPrice => write!(f, "RGT Price"),
            StatKind::RgtBalance => write!(f, "RGT Balance (Claimed)"),
            StatKind::Tvl => write!(f, "Total Value Locked"),
            StatKind::News => write!(f, "News"),
            StatKind::DivergenceLoss => write!(f, "Divergence Loss"),
        }
    }
}

/// Why a stat has no value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatError {
    pub message: String,
    pub level: LogLevel,
}

/// One figure as presentation sees it, a USD amount unless stated otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stat<V = UsdAmount> {
    pub value: Option<V>,
    pub is_loading: bool,
    pub error: Option<StatError>,
}

impl<V> Default for Stat<V> {
    fn default() -> Self {
        Self {
            value: None,
            is_loading: false,
            error: None,
        }
    }
}

impl<V> Stat<V> {
    pub(crate) fn from_state<T, E>(
        state: &FetchState<T, E>,
        value: impl Fn(&T) -> V,
        classify: impl Fn(&E) -> LogLevel,
    ) -> Self
    where
        E: Display,
    {
        Self {
            value: state.value.as_ref().map(value),
            is_loading: state.is_loading,
            error: state.error.as_ref().map(|e| StatError {
                message: e.to_string(),
                level: classify(e.as_ref()),
            }),
        }
    }
}

impl Stat {
    /// `$1,234.56`, or the placeholder while unknown.
    pub fn display_usd(&self) -> String {
        self.value
            .map(|v| v.format_usd())
            .unwrap_or_else(|| USD_PLACEHOLDER.to_string())
    }

    /// Token amounts: the same grouping without the currency sign.
    pub fn display_units(&self) -> String {
        match self.value {
            Some(v) => v.format_usd().trim_start_matches('$').to_string(),
            None => USD_PLACEHOLDER.to_string(),
        }
    }
}

impl Stat<PoolApy> {
    pub fn display_apy(&self) -> String {
        self.value
            .map(|apy| apy.to_string())
            .unwrap_or_else(|| APY_PLACEHOLDER.to_string())
    }
}

/// Everything the dashboard knows at one instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardSnapshot {
    /// Signed-in account, if any.
    pub account: Option<Address>,
    pub account_balance: Stat,
    pub interest_earned: Stat,
    /// Per-pool balances, in pool enumeration order.
    pub pools: Vec<(Pool, Stat)>,
    /// Per-pool yields, known with or without an account.
    pub pool_apys: Vec<(Pool, Stat<PoolApy>)>,
    pub rgt_price: Stat,
    pub rgt_balance: Stat,
    pub rgt_supply: u64,
    pub tvl: Stat,
    /// `None` until both yield-pool figures have resolved.
    pub divergence: Option<bool>,
    /// `None` until the account balance has resolved.
    pub has_deposited: Option<bool>,
    pub news: Vec<String>,
}

impl DashboardSnapshot {
    /// Every USD stat with its kind, in display order.
    pub fn stats(&self) -> Vec<(StatKind, &Stat)> {
        let mut stats = vec![
            (StatKind::AccountBalance, &self.account_balance),
            (StatKind::InterestEarned, &self.interest_earned),
        ];
        stats.extend(self.pools.iter().map(|(p, s)| (StatKind::Pool(*p), s)));
        stats.push((StatKind::RgtPrice, &self.rgt_price));
        stats.push((StatKind::RgtBalance, &self.rgt_balance));
        stats.push((StatKind::Tvl, &self.tvl));
        stats
    }

    /// Plain-text panel used by headless mode and `snapshot`.
    pub fn render(&self) -> String {
        let mut lines = Vec::new();
        match self.account {
            Some(address) => lines.push(format!("Account {}", address)),
            None => lines.push("Not signed in".to_string()),
        }

        lines.push(row(&StatKind::Tvl, self.tvl.display_usd()));
        if self.account.is_some() {
            if self.has_deposited == Some(false) {
                lines.push("  No deposits yet".to_string());
            } else {
                lines.push(row(
                    &StatKind::AccountBalance,
                    self.account_balance.display_usd(),
                ));
                let mut interest = self.interest_earned.display_usd();
                if self.divergence == Some(true) {
                    interest.push_str("  (!) yield pool may be suffering divergence loss");
                }
                lines.push(row(&StatKind::InterestEarned, interest));
            }
            for (pool, stat) in &self.pools {
                lines.push(row(&StatKind::Pool(*pool), stat.display_usd()));
            }
            lines.push(row(&StatKind::RgtBalance, self.rgt_balance.display_units()));
        }

        for (pool, stat) in &self.pool_apys {
            lines.push(row(&StatKind::PoolApy(*pool), stat.display_apy()));
        }

        lines.push(row(&"RGT Supply", self.rgt_supply.to_formatted_string(&Locale::en)));
        lines.push(row(&StatKind::RgtPrice, self.rgt_price.display_usd()));

        if self.news.is_empty() {
            lines.push(row(&StatKind::News, "Loading...".to_string()));
        } else {
            lines.push(row(&StatKind::News, self.news.join("  |  ")));
        }
        lines.join("\n")
    }
}

fn row(caption: &dyn Display, value: String) -> String {
    format!("  {:<24}{}", caption.to_string(), value)
}
