//! Keyed fetch cache with in-flight deduplication, polling and detach-aware cancellation.
//!
//! Every entry is keyed by a request identity string. At most one fetch per key
//! is in flight; later callers attach to it instead of issuing another request.
//! Each fetch is stamped with the entry generation it started under, and a
//! result is only applied if that generation is still current when it lands.
//! Invalidation, removal and the last consumer detaching all move the entry
//! to a new generation, which is how late results are dropped.

use futures::future::{BoxFuture, FutureExt, Shared, TryFutureExt};
use log::debug;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::{Notify, watch};
use tokio_util::sync::CancellationToken;

type SharedFetch<T, E> = Shared<BoxFuture<'static, Result<T, Arc<E>>>>;

/// Per-key fetch behaviour.
#[derive(Debug, Clone, Copy, Default)]
pub struct FetchOptions {
    /// Re-fetch on this interval while at least one consumer is attached.
    pub refresh_interval: Option<Duration>,
}

impl FetchOptions {
    pub fn once() -> Self {
        Self::default()
    }

    pub fn every(interval: Duration) -> Self {
        Self {
            refresh_interval: Some(interval),
        }
    }
}

/// What consumers observe for a key.
#[derive(Debug)]
pub struct FetchState<T, E> {
    pub value: Option<T>,
    pub is_loading: bool,
    pub error: Option<Arc<E>>,
    pub is_stale: bool,
}

impl<T: Clone, E> Clone for FetchState<T, E> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            is_loading: self.is_loading,
            error: self.error.clone(),
            is_stale: self.is_stale,
        }
    }
}

impl<T, E> Default for FetchState<T, E> {
    fn default() -> Self {
        Self {
            value: None,
            is_loading: false,
            error: None,
            is_stale: false,
        }
    }
}

impl<T, E> FetchState<T, E> {
    /// True once a fetch has either produced a value or failed.
    pub fn is_settled(&self) -> bool {
        !self.is_loading && (self.value.is_some() || self.error.is_some())
    }
}

struct InFlight<T, E> {
    id: u64,
    generation: u64,
    future: SharedFetch<T, E>,
}

struct CacheEntry<T, E> {
    /// Identity of this entry; a removed and recreated key gets a new one.
    id: u64,
    state: watch::Sender<FetchState<T, E>>,
    generation: u64,
    last_fetch_started_at: Option<Instant>,
    in_flight: Option<InFlight<T, E>>,
    last_applied: u64,
    consumers: usize,
    poller: Option<CancellationToken>,
    wake: Arc<Notify>,
}

impl<T, E> CacheEntry<T, E> {
    fn new(id: u64) -> Self {
        let (state, _) = watch::channel(FetchState::default());
        Self {
            id,
            state,
            generation: id,
            last_fetch_started_at: None,
            in_flight: None,
            last_applied: 0,
            consumers: 0,
            poller: None,
            wake: Arc::new(Notify::new()),
        }
    }

    fn has_fresh_value(&self) -> bool {
        let state = self.state.borrow();
        state.value.is_some() && !state.is_stale
    }
}

struct CacheInner<T, E> {
    entries: HashMap<String, CacheEntry<T, E>>,
    next_id: u64,
}

impl<T, E> CacheInner<T, E> {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn entry(&mut self, key: &str) -> &mut CacheEntry<T, E> {
        let next_id = &mut self.next_id;
        self.entries.entry(key.to_string()).or_insert_with(|| {
            *next_id += 1;
            CacheEntry::new(*next_id)
        })
    }
}

/// A fetch this caller started or attached to.
struct FetchTicket<T, E> {
    id: u64,
    generation: u64,
    future: SharedFetch<T, E>,
}

/// Memoized-by-key asynchronous fetches.
pub struct PollingFetchCache<T, E> {
    inner: Arc<Mutex<CacheInner<T, E>>>,
}

impl<T, E> Clone for PollingFetchCache<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T, E> Default for PollingFetchCache<T, E> {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(CacheInner {
                entries: HashMap::new(),
                next_id: 0,
            })),
        }
    }
}

impl<T, E> PollingFetchCache<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner<T, E>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the cached value for `key`, fetching it if absent or stale.
    ///
    /// Concurrent callers for the same key share one in-flight fetch. If this
    /// future is dropped before the fetch resolves, the result is not applied
    /// on its behalf. The dashboard only reads through [`Self::subscribe`], whose
    /// first fetch takes this same memoized path.
    #[cfg(test)]
    pub async fn get_or_fetch<F, Fut>(&self, key: &str, fetch: F) -> FetchState<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let _consumer = self.attach(key);
        self.run_fetch(key, fetch, true).await;
        self.state(key)
    }

    /// Attaches a long-lived consumer to `key`.
    ///
    /// The first consumer of a key starts a background driver that fetches
    /// once, then again on every `refresh_interval` tick and after every
    /// invalidation. The driver stops when the last consumer detaches.
    pub fn subscribe<F, Fut>(&self, key: &str, fetch: F, options: FetchOptions) -> Subscription<T, E>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let consumer = self.attach(key);

        let mut inner = self.lock();
        let entry = inner.entry(key);
        let receiver = entry.state.subscribe();
        if entry.poller.is_none() {
            let token = CancellationToken::new();
            entry.poller = Some(token.clone());
            let wake = entry.wake.clone();
            let cache = self.clone();
            let key = key.to_string();
            tokio::spawn(async move {
                cache
                    .drive(&key, fetch, options.refresh_interval, wake, token)
                    .await;
            });
        }

        Subscription { consumer, receiver }
    }

    async fn drive<F, Fut>(
        &self,
        key: &str,
        fetch: F,
        interval: Option<Duration>,
        wake: Arc<Notify>,
        token: CancellationToken,
    ) where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let mut memoized = true;
        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = self.run_fetch(key, &fetch, memoized) => {}
            }
            memoized = false;

            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = wake.notified() => {}
                _ = sleep_or_pending(interval) => {}
            }
        }
        debug!("Stopped polling {}", key);
    }

    async fn run_fetch<F, Fut>(&self, key: &str, fetch: F, memoized: bool)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let Some(ticket) = self.begin(key, fetch, memoized) else {
            return;
        };
        let result = ticket.future.clone().await;
        self.apply(key, &ticket, result);
    }

    fn begin<F, Fut>(&self, key: &str, fetch: F, memoized: bool) -> Option<FetchTicket<T, E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let mut inner = self.lock();
        let id = inner.next_id();
        let entry = inner.entry(key);

        if let Some(in_flight) = &entry.in_flight {
            return Some(FetchTicket {
                id: in_flight.id,
                generation: in_flight.generation,
                future: in_flight.future.clone(),
            });
        }
        if memoized && entry.has_fresh_value() {
            return None;
        }

        let future = fetch().map_err(Arc::new).boxed().shared();
        entry.in_flight = Some(InFlight {
            id,
            generation: entry.generation,
            future: future.clone(),
        });
        entry.last_fetch_started_at = Some(Instant::now());
        entry.state.send_modify(|state| state.is_loading = true);

        Some(FetchTicket {
            id,
            generation: entry.generation,
            future,
        })
    }

    /// Applies a fetch result unless it was superseded. Returns whether it was applied.
    fn apply(&self, key: &str, ticket: &FetchTicket<T, E>, result: Result<T, Arc<E>>) -> bool {
        let mut inner = self.lock();
        let Some(entry) = inner.entries.get_mut(key) else {
            debug!("Dropping result for removed key {}", key);
            return false;
        };

        if entry.in_flight.as_ref().is_some_and(|f| f.id == ticket.id) {
            entry.in_flight = None;
        }
        if ticket.generation != entry.generation {
            debug!("Dropping stale result for {}", key);
            return false;
        }
        if ticket.id <= entry.last_applied {
            return false;
        }

        entry.last_applied = ticket.id;
        let still_loading = entry.in_flight.is_some();
        entry.state.send_modify(|state| {
            match result {
                Ok(value) => {
                    state.value = Some(value);
                    state.error = None;
                }
                Err(error) => {
                    state.value = None;
                    state.error = Some(error);
                }
            }
            state.is_loading = still_loading;
            state.is_stale = false;
        });
        true
    }

    fn attach(&self, key: &str) -> ConsumerGuard<T, E> {
        let entry_id = {
            let mut inner = self.lock();
            let entry = inner.entry(key);
            entry.consumers += 1;
            entry.id
        };
        ConsumerGuard {
            cache: self.clone(),
            key: key.to_string(),
            entry_id,
        }
    }

    fn detach(&self, key: &str, entry_id: u64) {
        let mut inner = self.lock();
        let next_generation = inner.next_id();
        let Some(entry) = inner.entries.get_mut(key).filter(|e| e.id == entry_id) else {
            return;
        };

        entry.consumers = entry.consumers.saturating_sub(1);
        if entry.consumers > 0 {
            return;
        }
        if let Some(poller) = entry.poller.take() {
            poller.cancel();
        }
        if entry.in_flight.take().is_some() {
            entry.generation = next_generation;
            entry.state.send_modify(|state| state.is_loading = false);
        }
    }

    /// Marks `key` stale and drops any in-flight result. Active consumers re-fetch.
    pub fn invalidate(&self, key: &str) {
        let mut inner = self.lock();
        let next_generation = inner.next_id();
        if let Some(entry) = inner.entries.get_mut(key) {
            debug!(
                "Invalidating {}, last fetched {:?} ago",
                key,
                entry.last_fetch_started_at.map(|at| at.elapsed())
            );
            entry.generation = next_generation;
            entry.in_flight = None;
            entry.state.send_modify(|state| {
                state.is_stale = true;
                state.is_loading = false;
            });
            entry.wake.notify_one();
        }
    }

    /// Removes every entry whose key matches, stopping its polling.
    pub fn remove_where(&self, matches: impl Fn(&str) -> bool) -> usize {
        let mut inner = self.lock();
        let before = inner.entries.len();
        inner.entries.retain(|key, entry| {
            if !matches(key) {
                return true;
            }
            if let Some(poller) = entry.poller.take() {
                poller.cancel();
            }
            false
        });
        before - inner.entries.len()
    }

    #[cfg(test)]
    pub fn state(&self, key: &str) -> FetchState<T, E> {
        self.lock()
            .entries
            .get(key)
            .map(|entry| entry.state.borrow().clone())
            .unwrap_or_default()
    }

    #[cfg(test)]
    pub fn last_fetch_started_at(&self, key: &str) -> Option<Instant> {
        self.lock()
            .entries
            .get(key)
            .and_then(|entry| entry.last_fetch_started_at)
    }

    #[cfg(test)]
    pub fn consumers(&self, key: &str) -> usize {
        self.lock()
            .entries
            .get(key)
            .map(|entry| entry.consumers)
            .unwrap_or(0)
    }
}

async fn sleep_or_pending(interval: Option<Duration>) {
    match interval {
        Some(interval) => tokio::time::sleep(interval).await,
        None => std::future::pending().await,
    }
}

/// Counts one consumer of a key for as long as it lives.
struct ConsumerGuard<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    cache: PollingFetchCache<T, E>,
    key: String,
    entry_id: u64,
}

impl<T, E> Drop for ConsumerGuard<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    fn drop(&mut self) {
        self.cache.detach(&self.key, self.entry_id);
    }
}

/// A long-lived consumer of one key. Dropping it detaches.
pub struct Subscription<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    consumer: ConsumerGuard<T, E>,
    receiver: watch::Receiver<FetchState<T, E>>,
}

impl<T, E> Subscription<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    pub fn key(&self) -> &str {
        &self.consumer.key
    }

    pub fn state(&self) -> FetchState<T, E> {
        self.receiver.borrow().clone()
    }

    /// Waits for the next state change. Returns `false` once the entry is gone.
    pub async fn changed(&mut self) -> bool {
        self.receiver.changed().await.is_ok()
    }

    /// Waits until the state is settled, or the entry is gone.
    pub async fn settled(&mut self) -> FetchState<T, E> {
        loop {
            let state = self.state();
            if state.is_settled() || !self.changed().await {
                return state;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use thiserror::Error;
    use tokio::sync::oneshot;

    #[derive(Debug, Error, PartialEq)]
    #[error("fetch failed")]
    struct FetchFailed;

    type Cache = PollingFetchCache<u64, FetchFailed>;

    type CountedFetch = BoxFuture<'static, Result<u64, FetchFailed>>;

    fn counting(
        calls: &Arc<AtomicUsize>,
        value: u64,
    ) -> impl Fn() -> CountedFetch + Send + Sync + 'static {
        let calls = calls.clone();
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Ok(value) }.boxed()
        }
    }

    #[tokio::test(start_paused = true)]
    /// Two concurrent callers for one key trigger exactly one fetch.
    async fn concurrent_callers_share_one_fetch() {
        let cache = Cache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let slow = |calls: Arc<AtomicUsize>| {
            move || {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    Ok(7)
                }
            }
        };

        let (a, b) = tokio::join!(
            cache.get_or_fetch("k", slow(calls.clone())),
            cache.get_or_fetch("k", slow(calls.clone())),
        );

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(a.value, Some(7));
        assert_eq!(b.value, Some(7));
        assert!(cache.last_fetch_started_at("k").is_some());
    }

    #[tokio::test]
    async fn fresh_value_is_memoized() {
        let cache = Cache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        cache.get_or_fetch("k", counting(&calls, 1)).await;
        let state = cache.get_or_fetch("k", counting(&calls, 2)).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(state.value, Some(1));
    }

    #[tokio::test]
    async fn errors_surface_as_error_state() {
        let cache = Cache::new();
        let state = cache
            .get_or_fetch("k", || async { Err::<u64, _>(FetchFailed) })
            .await;

        assert!(state.value.is_none());
        assert_eq!(state.error.as_deref(), Some(&FetchFailed));
        assert!(!state.is_loading);
    }

    #[tokio::test]
    /// A result landing after its only consumer went away changes nothing.
    async fn result_after_detach_is_discarded() {
        let cache = Cache::new();
        let (release, gate) = oneshot::channel::<u64>();

        let pending = cache.get_or_fetch("k", move || async move {
            Ok(gate.await.unwrap_or(0))
        });
        let timed_out = tokio::time::timeout(Duration::from_millis(10), pending).await;
        assert!(timed_out.is_err());

        let _ = release.send(99);
        tokio::task::yield_now().await;

        let state = cache.state("k");
        assert!(state.value.is_none());
        assert!(!state.is_loading);
        assert_eq!(cache.consumers("k"), 0);
    }

    #[tokio::test]
    /// Invalidation while a fetch is in flight drops that fetch's result.
    async fn invalidated_in_flight_result_is_dropped() {
        let cache = Cache::new();
        let (release, gate) = oneshot::channel::<u64>();

        let waiter = {
            let cache = cache.clone();
            tokio::spawn(async move {
                cache
                    .get_or_fetch("k", move || async move { Ok(gate.await.unwrap_or(0)) })
                    .await
            })
        };
        while !cache.state("k").is_loading {
            tokio::task::yield_now().await;
        }

        cache.invalidate("k");
        let _ = release.send(5);
        let state = waiter.await.unwrap();

        assert!(state.value.is_none());
        assert!(state.is_stale);
    }

    #[tokio::test(start_paused = true)]
    async fn subscription_polls_until_detached() {
        let cache = Cache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let mut subscription = cache.subscribe(
            "k",
            counting(&calls, 3),
            FetchOptions::every(Duration::from_secs(1)),
        );
        let state = subscription.settled().await;
        assert_eq!(state.value, Some(3));

        tokio::time::sleep(Duration::from_millis(3_500)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 4);

        drop(subscription);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(cache.consumers("k"), 0);
    }

    #[tokio::test(start_paused = true)]
    /// The timer keeps running while any consumer remains.
    async fn polling_continues_while_one_consumer_remains() {
        let cache = Cache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let options = FetchOptions::every(Duration::from_secs(1));

        let first = cache.subscribe("k", counting(&calls, 1), options);
        let second = cache.subscribe("k", counting(&calls, 1), options);
        assert_eq!(cache.consumers("k"), 2);

        drop(first);
        tokio::time::sleep(Duration::from_millis(2_500)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        drop(second);
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    /// A failing tick does not stop the next one.
    async fn polling_survives_fetch_errors() {
        let cache = Cache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let fetch = {
            let calls = calls.clone();
            move || {
                let call = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if call == 0 {
                        Err(FetchFailed)
                    } else {
                        Ok(10)
                    }
                }
            }
        };

        let mut subscription =
            cache.subscribe("k", fetch, FetchOptions::every(Duration::from_secs(1)));
        let first = subscription.settled().await;
        assert!(first.error.is_some());

        tokio::time::sleep(Duration::from_millis(1_500)).await;
        let state = subscription.state();
        assert_eq!(state.value, Some(10));
        assert!(state.error.is_none());
    }

    #[tokio::test(start_paused = true)]
    /// Invalidating a watched key re-fetches without waiting for the next tick.
    async fn invalidate_wakes_subscribers() {
        let cache = Cache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let mut subscription = cache.subscribe("k", counting(&calls, 8), FetchOptions::once());
        subscription.settled().await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        cache.invalidate("k");
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        let state = subscription.state();
        assert_eq!(state.value, Some(8));
        assert!(!state.is_stale);
    }

    #[tokio::test]
    async fn remove_where_drops_matching_entries() {
        let cache = Cache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        cache.get_or_fetch("0xA balance", counting(&calls, 1)).await;
        cache.get_or_fetch("0xA interest", counting(&calls, 2)).await;
        cache.get_or_fetch("tvl", counting(&calls, 3)).await;

        let removed = cache.remove_where(|key| key.starts_with("0xA "));
        assert_eq!(removed, 2);
        assert!(cache.state("0xA balance").value.is_none());
        assert_eq!(cache.state("tvl").value, Some(3));
    }

    #[tokio::test]
    /// A fetch that resolves after its key was removed is dropped, even if the key is recreated.
    async fn result_for_removed_key_is_dropped() {
        let cache = Cache::new();
        let (release, gate) = oneshot::channel::<u64>();

        let waiter = {
            let cache = cache.clone();
            tokio::spawn(async move {
                cache
                    .get_or_fetch("k", move || async move { Ok(gate.await.unwrap_or(0)) })
                    .await
            })
        };
        while !cache.state("k").is_loading {
            tokio::task::yield_now().await;
        }

        cache.remove_where(|_| true);
        let calls = Arc::new(AtomicUsize::new(0));
        let _subscription = cache.subscribe("k", counting(&calls, 1), FetchOptions::once());
        let _ = release.send(42);
        let _ = waiter.await;
        tokio::task::yield_now().await;

        assert_ne!(cache.state("k").value, Some(42));
    }
}
