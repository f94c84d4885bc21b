//! Dashboard state
//!
//! Owns one polling subscription per displayed stat and assembles them into
//! [`DashboardSnapshot`]s. Account-scoped stats are keyed by the current
//! [`AccountSession`], so switching accounts drops every entry of the old one.

pub mod snapshot;
pub mod updaters;

pub use snapshot::{DashboardSnapshot, Stat, StatError, StatKind};
pub use updaters::diff_events;

use crate::aggregator::{
    AggregateBalance, AggregateInterest, AggregationError, PoolBalance, aggregate_balance,
    aggregate_interest, pool_balance,
};
use crate::amount::UsdAmount;
use crate::cache::{FetchOptions, FetchState, PollingFetchCache, Subscription};
use crate::config::Config;
use crate::consts::portal_consts::RGT_SUPPLY;
use crate::divergence::{DivergenceThreshold, detect_divergence};
use crate::error_classifier::ErrorClassifier;
use crate::pool::{Pool, PoolApy};
use crate::session::AccountSession;
use crate::sources::Sources;
use crate::sources::error::SourceError;
use alloy_primitives::Address;
use log::{debug, info};
use std::time::Duration;

/// Refresh cadence and detection thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DashboardSettings {
    pub divergence_threshold: DivergenceThreshold,
    pub account_refresh: Duration,
    pub rgt_price_refresh: Duration,
    pub tvl_refresh: Duration,
    pub apy_refresh: Duration,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for DashboardSettings {
    fn from(config: &Config) -> Self {
        Self {
            divergence_threshold: DivergenceThreshold::new(config.divergence_threshold_units),
            account_refresh: Duration::from_millis(config.account_refresh_ms),
            rgt_price_refresh: Duration::from_millis(config.rgt_price_refresh_ms),
            tvl_refresh: Duration::from_millis(config.tvl_refresh_ms),
            apy_refresh: Duration::from_millis(config.apy_refresh_ms),
        }
    }
}

#[derive(Default)]
struct DashboardCaches {
    balances: PollingFetchCache<AggregateBalance, AggregationError>,
    interest: PollingFetchCache<AggregateInterest, AggregationError>,
    pools: PollingFetchCache<PoolBalance, AggregationError>,
    usd: PollingFetchCache<UsdAmount, SourceError>,
    apys: PollingFetchCache<PoolApy, SourceError>,
    news: PollingFetchCache<Vec<String>, SourceError>,
}

impl DashboardCaches {
    /// Drops every account-scoped entry belonging to `session`.
    fn forget(&self, session: &AccountSession) -> usize {
        let owned = |key: &str| session.owns_key(key);
        self.balances.remove_where(owned)
            + self.interest.remove_where(owned)
            + self.pools.remove_where(owned)
            + self.usd.remove_where(owned)
    }
}

struct AccountStats {
    session: AccountSession,
    balance: Subscription<AggregateBalance, AggregationError>,
    interest: Subscription<AggregateInterest, AggregationError>,
    pools: Vec<(Pool, Subscription<PoolBalance, AggregationError>)>,
    rgt_balance: Subscription<UsdAmount, SourceError>,
}

struct GlobalStats {
    rgt_price: Subscription<UsdAmount, SourceError>,
    tvl: Subscription<UsdAmount, SourceError>,
    apys: Vec<(Pool, Subscription<PoolApy, SourceError>)>,
    news: Subscription<Vec<String>, SourceError>,
}

/// Live dashboard for at most one signed-in account.
pub struct Dashboard {
    sources: Sources,
    settings: DashboardSettings,
    caches: DashboardCaches,
    classifier: ErrorClassifier,
    global: GlobalStats,
    account: Option<AccountStats>,
    last_epoch: u64,
}

impl Dashboard {
    /// Starts polling the account-independent stats. Must be called inside a Tokio runtime.
    pub fn mount(sources: Sources, settings: DashboardSettings) -> Self {
        let caches = DashboardCaches::default();
        let global = subscribe_global(&caches, &sources, &settings);
        Self {
            sources,
            settings,
            caches,
            classifier: ErrorClassifier::new(),
            global,
            account: None,
            last_epoch: 0,
        }
    }

    pub fn session(&self) -> Option<&AccountSession> {
        self.account.as_ref().map(|stats| &stats.session)
    }

    /// Signs in as `address`, or signs out with `None`.
    ///
    /// Every entry of the previous session is removed before the new session
    /// subscribes, so no result fetched for the old account can land afterwards.
    pub fn set_account(&mut self, address: Option<Address>) {
        if self.session().map(|s| s.address()) == address {
            return;
        }

        if let Some(stats) = self.account.take() {
            let session = stats.session;
            drop(stats);
            let removed = self.caches.forget(&session);
            info!("Signed out of {}", session);
            debug!("Dropped {} cache entries for {}", removed, session);
        }

        if let Some(address) = address {
            self.last_epoch += 1;
            let session = AccountSession::new(address, self.last_epoch);
            info!("Signed in as {}", session);
            self.account = Some(self.subscribe_account(session));
        }
    }

    fn subscribe_account(&self, session: AccountSession) -> AccountStats {
        let options = FetchOptions::every(self.settings.account_refresh);

        let balance = {
            let sources = self.sources.clone();
            self.caches.balances.subscribe(
                &session.key("allPoolBalance"),
                move || {
                    let sources = sources.clone();
                    async move { aggregate_balance(&session, &sources).await }
                },
                options,
            )
        };

        let interest = {
            let sources = self.sources.clone();
            self.caches.interest.subscribe(
                &session.key("allPoolInterest"),
                move || {
                    let sources = sources.clone();
                    async move { aggregate_interest(&session, &sources).await }
                },
                options,
            )
        };

        let pools = Pool::all()
            .into_iter()
            .map(|pool| {
                let sources = self.sources.clone();
                let subscription = self.caches.pools.subscribe(
                    &session.key(&format!("poolBalance:{}", pool)),
                    move || {
                        let sources = sources.clone();
                        async move { pool_balance(&session, &sources, pool).await }
                    },
                    options,
                );
                (pool, subscription)
            })
            .collect();

        let rgt_balance = {
            let sources = self.sources.clone();
            self.caches.usd.subscribe(
                &session.key("rgtBalance"),
                move || {
                    let sources = sources.clone();
                    async move { fetch_rgt_balance(&sources, session.address()).await }
                },
                options,
            )
        };

        AccountStats {
            session,
            balance,
            interest,
            pools,
            rgt_balance,
        }
    }

    /// Current state of every stat.
    pub fn snapshot(&self) -> DashboardSnapshot {
        let classify_aggregation = |e: &AggregationError| self.classifier.classify_aggregation_error(e);
        let classify_source = |e: &SourceError| self.classifier.classify_source_error(e);
        let usd_stat = |state: &FetchState<UsdAmount, SourceError>| {
            Stat::from_state(state, |v| *v, classify_source)
        };

        let mut snapshot = DashboardSnapshot {
            account: self.session().map(|s| s.address()),
            account_balance: Stat::default(),
            interest_earned: Stat::default(),
            pools: Vec::new(),
            pool_apys: self
                .global
                .apys
                .iter()
                .map(|(pool, subscription)| {
                    (*pool, Stat::from_state(&subscription.state(), |a| *a, classify_source))
                })
                .collect(),
            rgt_price: usd_stat(&self.global.rgt_price.state()),
            rgt_balance: Stat::default(),
            rgt_supply: RGT_SUPPLY,
            tvl: usd_stat(&self.global.tvl.state()),
            divergence: None,
            has_deposited: None,
            news: self.global.news.state().value.unwrap_or_default(),
        };

        let Some(stats) = &self.account else {
            return snapshot;
        };

        let balance = stats.balance.state();
        let interest = stats.interest.state();
        let pools: Vec<(Pool, FetchState<PoolBalance, AggregationError>)> = stats
            .pools
            .iter()
            .map(|(pool, subscription)| (*pool, subscription.state()))
            .collect();

        let yield_pool_raw_balance = pools
            .iter()
            .find(|(pool, _)| *pool == Pool::Yield)
            .and_then(|(_, state)| state.value.map(|b| b.raw));
        snapshot.divergence = detect_divergence(
            interest.value.map(|i| i.yield_pool_raw),
            yield_pool_raw_balance,
            self.settings.divergence_threshold,
        );
        snapshot.has_deposited = balance.value.map(|b| !b.total.is_zero());

        snapshot.account_balance = Stat::from_state(&balance, |b| b.total, classify_aggregation);
        snapshot.interest_earned = Stat::from_state(&interest, |i| i.total, classify_aggregation);
        snapshot.pools = pools
            .iter()
            .map(|(pool, state)| (*pool, Stat::from_state(state, |p| p.usd, classify_aggregation)))
            .collect();
        snapshot.rgt_balance = usd_stat(&stats.rgt_balance.state());
        snapshot
    }

    /// Waits until every stat has produced a value or an error.
    pub async fn settled(&mut self) {
        self.global.rgt_price.settled().await;
        self.global.tvl.settled().await;
        for (_, subscription) in &mut self.global.apys {
            subscription.settled().await;
        }
        self.global.news.settled().await;

        if let Some(stats) = &mut self.account {
            stats.balance.settled().await;
            stats.interest.settled().await;
            for (_, subscription) in &mut stats.pools {
                subscription.settled().await;
            }
            stats.rgt_balance.settled().await;
        }
    }

    /// Marks every account stat stale so it is fetched again right away.
    pub fn refresh_account(&self) {
        if let Some(stats) = &self.account {
            self.caches.balances.invalidate(stats.balance.key());
            self.caches.interest.invalidate(stats.interest.key());
            for (_, subscription) in &stats.pools {
                self.caches.pools.invalidate(subscription.key());
            }
            self.caches.usd.invalidate(stats.rgt_balance.key());
        }
    }
}

async fn fetch_rgt_balance(sources: &Sources, address: Address) -> Result<UsdAmount, SourceError> {
    let raw = sources.governance.rgt_balance_of(address).await?;
    Ok(UsdAmount::from_native(raw)?)
}

async fn fetch_rgt_price(sources: &Sources) -> Result<UsdAmount, SourceError> {
    let rate = sources.governance.rgt_exchange_rate().await?;
    Ok(UsdAmount::from_native(rate)?)
}

async fn fetch_tvl(sources: &Sources) -> Result<UsdAmount, SourceError> {
    let raw = sources.tvl.total_value_locked().await?;
    Ok(UsdAmount::from_native(raw)?)
}

fn subscribe_global(
    caches: &DashboardCaches,
    sources: &Sources,
    settings: &DashboardSettings,
) -> GlobalStats {
    let rgt_price = {
        let sources = sources.clone();
        caches.usd.subscribe(
            "rgtPrice",
            move || {
                let sources = sources.clone();
                async move { fetch_rgt_price(&sources).await }
            },
            FetchOptions::every(settings.rgt_price_refresh),
        )
    };

    let tvl = {
        let sources = sources.clone();
        caches.usd.subscribe(
            "tvl",
            move || {
                let sources = sources.clone();
                async move { fetch_tvl(&sources).await }
            },
            FetchOptions::every(settings.tvl_refresh),
        )
    };

    let apys = Pool::all()
        .into_iter()
        .map(|pool| {
            let sources = sources.clone();
            let subscription = caches.apys.subscribe(
                &format!("poolApy:{}", pool),
                move || {
                    let sources = sources.clone();
                    async move { sources.apy.pool_apy(pool).await }
                },
                FetchOptions::every(settings.apy_refresh),
            );
            (pool, subscription)
        })
        .collect();

    let news = {
        let sources = sources.clone();
        caches.news.subscribe(
            "news",
            move || {
                let sources = sources.clone();
                async move { sources.news.fetch_news_items().await }
            },
            FetchOptions::once(),
        )
    };

    GlobalStats {
        rgt_price,
        tvl,
        apys,
        news,
    }
}
