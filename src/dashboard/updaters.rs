//! Snapshot diffing
//!
//! Turns two consecutive snapshots into the events headless mode prints.

use super::snapshot::{DashboardSnapshot, Stat, StatKind};
use crate::error_classifier::LogLevel;
use crate::events::Event;
use crate::pool::PoolApy;

/// Events describing what changed between `prev` and `next`.
///
/// With no previous snapshot every known value is reported.
pub fn diff_events(prev: Option<&DashboardSnapshot>, next: &DashboardSnapshot) -> Vec<Event> {
    let mut events = Vec::new();

    let prev_account = prev.and_then(|p| p.account);
    if prev.is_some() && prev_account != next.account {
        events.push(match next.account {
            Some(address) => Event::session(format!("Signed in as {}", address)),
            None => Event::session("Signed out".to_string()),
        });
    }

    let prev_stats = prev.map(|p| p.stats()).unwrap_or_default();
    for (kind, stat) in next.stats() {
        let before = prev_stats
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, s)| *s);
        events.extend(stat_events(kind, before, stat, |s| display(kind, s)));
    }

    for (pool, stat) in &next.pool_apys {
        let before = prev
            .and_then(|p| p.pool_apys.iter().find(|(candidate, _)| candidate == pool))
            .map(|(_, s)| s);
        events.extend(stat_events(
            StatKind::PoolApy(*pool),
            before,
            stat,
            |s: &Stat<PoolApy>| s.display_apy(),
        ));
    }

    let was_divergent = prev.and_then(|p| p.divergence) == Some(true);
    if next.divergence == Some(true) && !was_divergent {
        events.push(Event::stat_failed(
            StatKind::DivergenceLoss,
            "Yield pool deposit has earned no interest and may be suffering divergence loss"
                .to_string(),
            LogLevel::Warn,
        ));
    }

    let prev_news = prev.map(|p| p.news.as_slice()).unwrap_or_default();
    if !next.news.is_empty() && next.news != prev_news {
        events.push(Event::stat_updated(StatKind::News, next.news.join(" | ")));
    }

    events
}

fn stat_events<V: PartialEq>(
    kind: StatKind,
    before: Option<&Stat<V>>,
    after: &Stat<V>,
    display: impl Fn(&Stat<V>) -> String,
) -> Vec<Event> {
    let mut events = Vec::new();
    let was_loading = before.is_some_and(|s| s.is_loading);
    if after.is_loading && !was_loading {
        events.push(Event::stat_refreshing(kind));
    }

    let previous = before.and_then(|s| s.value.as_ref());
    if after.value.is_some() && after.value.as_ref() != previous {
        events.push(Event::stat_updated(kind, display(after)));
    }

    if let Some(error) = &after.error {
        if before.and_then(|s| s.error.as_ref()) != Some(error) {
            events.push(Event::stat_failed(kind, error.message.clone(), error.level));
        }
    }
    events
}

fn display(kind: StatKind, stat: &Stat) -> String {
    match kind {
        StatKind::RgtBalance => stat.display_units(),
        _ => stat.display_usd(),
    }
}
