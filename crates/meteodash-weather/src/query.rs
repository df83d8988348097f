//! Request-keyed caching of archive responses and observable query state.
//!
//! A [`QueryCache`] holds one entry per request key. Fresh entries are served
//! without a network call; otherwise a per-key async lock makes sure at most one
//! fetch per key is outstanding, and callers that waited on it share its result.
//!
//! A [`QueryObserver`] tracks the key derived from the current filter values and
//! publishes a [`QueryState`] on a `watch` channel for the presentation layer.

use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use meteodash_core::QueryConfig;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::client::WeatherSource;
use crate::error::WeatherError;
use crate::retry::{with_retry, RetryPolicy};
use crate::types::{
    DailyWeatherParams, DailyWeatherResponse, HourlyWeatherParams, HourlyWeatherResponse,
};

pub const DAILY_SCOPE: &str = "dailyWeather";
pub const HOURLY_SCOPE: &str = "hourlyWeather";

/// Shared outcome of one fetch.
pub type QueryResult<T> = Result<Arc<T>, Arc<WeatherError>>;

pub type BoxFetch<T> = Pin<Box<dyn Future<Output = Result<T, WeatherError>> + Send>>;
pub type Fetcher<P, T> = Arc<dyn Fn(&P) -> BoxFetch<T> + Send + Sync>;

/// Canonical cache key: `[scope, params]` as JSON.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey(String);

impl QueryKey {
    pub fn new<P: Serialize + Debug>(scope: &str, params: &P) -> Self {
        match serde_json::to_string(&(scope, params)) {
            Ok(key) => Self(key),
            Err(e) => {
                tracing::warn!("Falling back to debug key for {}: {}", scope, e);
                Self(format!("{}:{:?}", scope, params))
            }
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

struct CacheEntry<T> {
    data: Option<Arc<T>>,
    updated_at: Option<Instant>,
    last_access: Instant,
    /// Bumped every time a fetch for this key completes.
    generation: u64,
    last_result: Option<QueryResult<T>>,
    fetch_lock: Arc<tokio::sync::Mutex<()>>,
}

impl<T> CacheEntry<T> {
    fn new(now: Instant) -> Self {
        Self {
            data: None,
            updated_at: None,
            last_access: now,
            generation: 0,
            last_result: None,
            fetch_lock: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    fn fresh(&self, stale_time: Duration, now: Instant) -> Option<Arc<T>> {
        match (&self.data, self.updated_at) {
            (Some(data), Some(at)) if now.duration_since(at) < stale_time => Some(data.clone()),
            _ => None,
        }
    }
}

pub struct QueryCache<T> {
    entries: Mutex<HashMap<QueryKey, CacheEntry<T>>>,
    stale_time: Duration,
    gc_time: Duration,
    retry: RetryPolicy,
}

impl<T: Send + Sync + 'static> QueryCache<T> {
    pub fn new(stale_time: Duration, gc_time: Duration, retry: RetryPolicy) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            stale_time,
            gc_time,
            retry,
        }
    }

    pub fn from_config(config: &QueryConfig) -> Self {
        Self::new(
            Duration::from_secs(config.stale_secs),
            Duration::from_secs(config.gc_secs),
            RetryPolicy::from_config(config),
        )
    }

    /// Cached data for `key` if it has not gone stale.
    pub fn peek_fresh(&self, key: &QueryKey) -> Option<Arc<T>> {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let entry = entries.get_mut(key)?;
        entry.last_access = now;
        entry.fresh(self.stale_time, now)
    }

    /// Cached data for `key`, stale or not.
    pub fn peek(&self, key: &QueryKey) -> Option<Arc<T>> {
        self.entries.lock().get(key).and_then(|e| e.data.clone())
    }

    /// Return fresh cached data or run `fetcher` (with retries) for `key`.
    pub async fn fetch<F, Fut>(&self, key: &QueryKey, fetcher: F) -> QueryResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, WeatherError>>,
    {
        // Fast path: fresh data, no lock held across the await below
        let (lock, seen_generation) = {
            let now = Instant::now();
            let mut entries = self.entries.lock();
            let entry = entries
                .entry(key.clone())
                .or_insert_with(|| CacheEntry::new(now));
            entry.last_access = now;
            if let Some(data) = entry.fresh(self.stale_time, now) {
                tracing::debug!("Cache hit for {}", key.as_str());
                return Ok(data);
            }
            (entry.fetch_lock.clone(), entry.generation)
        };

        let _guard = lock.lock().await;

        // Someone else fetched this key while we waited: share their outcome
        {
            let entries = self.entries.lock();
            if let Some(entry) = entries.get(key) {
                if entry.generation != seen_generation {
                    if let Some(result) = &entry.last_result {
                        tracing::debug!("Joined in-flight fetch for {}", key.as_str());
                        return result.clone();
                    }
                }
            }
        }

        tracing::debug!("Fetching {}", key.as_str());
        let result = match with_retry(&self.retry, fetcher).await {
            Ok(value) => Ok(Arc::new(value)),
            Err(e) => {
                tracing::warn!("Fetch failed for {}: {}", key.as_str(), e);
                Err(Arc::new(e))
            }
        };

        let now = Instant::now();
        let mut entries = self.entries.lock();
        let entry = entries
            .entry(key.clone())
            .or_insert_with(|| CacheEntry::new(now));
        if let Ok(data) = &result {
            entry.data = Some(data.clone());
            entry.updated_at = Some(now);
        }
        entry.generation += 1;
        entry.last_access = now;
        entry.last_result = Some(result.clone());

        result
    }

    /// Mark `key` stale so the next fetch goes to the network.
    pub fn invalidate(&self, key: &QueryKey) {
        if let Some(entry) = self.entries.lock().get_mut(key) {
            entry.updated_at = None;
        }
    }

    /// Drop entries nobody has looked at for longer than the gc time.
    pub fn collect_garbage(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, e| {
            Arc::strong_count(&e.fetch_lock) > 1 || now.duration_since(e.last_access) <= self.gc_time
        });
        let removed = before - entries.len();
        if removed > 0 {
            tracing::debug!("Collected {} cache entries", removed);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryStatus {
    /// Inputs are incomplete; nothing is requested.
    #[default]
    Idle,
    /// Waiting for the first result for this key.
    Loading,
    Success,
    Error,
}

/// What the presentation layer renders for one query.
#[derive(Debug)]
pub struct QueryState<T> {
    pub status: QueryStatus,
    pub data: Option<Arc<T>>,
    pub error: Option<Arc<WeatherError>>,
    /// `data` belongs to a previous key and is shown until the new one lands.
    pub is_placeholder: bool,
    /// A request for the current key is in flight.
    pub is_fetching: bool,
}

impl<T> Clone for QueryState<T> {
    fn clone(&self) -> Self {
        Self {
            status: self.status,
            data: self.data.clone(),
            error: self.error.clone(),
            is_placeholder: self.is_placeholder,
            is_fetching: self.is_fetching,
        }
    }
}

impl<T> Default for QueryState<T> {
    fn default() -> Self {
        Self {
            status: QueryStatus::Idle,
            data: None,
            error: None,
            is_placeholder: false,
            is_fetching: false,
        }
    }
}

impl<T> QueryState<T> {
    fn success(data: Arc<T>) -> Self {
        Self {
            status: QueryStatus::Success,
            data: Some(data),
            ..Self::default()
        }
    }

    fn failed(error: Arc<WeatherError>) -> Self {
        Self {
            status: QueryStatus::Error,
            error: Some(error),
            ..Self::default()
        }
    }

    pub fn is_loading(&self) -> bool {
        self.status == QueryStatus::Loading
    }

    pub fn is_error(&self) -> bool {
        self.status == QueryStatus::Error
    }

    pub fn is_success(&self) -> bool {
        self.status == QueryStatus::Success
    }
}

/// Follows one query slot (e.g. the overview charts) as its inputs change.
pub struct QueryObserver<P, T> {
    scope: &'static str,
    cache: Arc<QueryCache<T>>,
    fetcher: Fetcher<P, T>,
    is_enabled: fn(&P) -> bool,
    keep_previous_data: bool,
    current: Mutex<Option<(QueryKey, P)>>,
    state: watch::Sender<QueryState<T>>,
}

impl<P, T> QueryObserver<P, T>
where
    P: Serialize + Debug + Clone + Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    pub fn new(
        scope: &'static str,
        cache: Arc<QueryCache<T>>,
        fetcher: Fetcher<P, T>,
        is_enabled: fn(&P) -> bool,
        keep_previous_data: bool,
    ) -> Self {
        let (state, _) = watch::channel(QueryState::default());
        Self {
            scope,
            cache,
            fetcher,
            is_enabled,
            keep_previous_data,
            current: Mutex::new(None),
            state,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<QueryState<T>> {
        self.state.subscribe()
    }

    pub fn state(&self) -> QueryState<T> {
        self.state.borrow().clone()
    }

    pub fn current_key(&self) -> Option<QueryKey> {
        self.current.lock().as_ref().map(|(k, _)| k.clone())
    }

    /// Point the observer at `params` and resolve it.
    ///
    /// Returns the state published for this key, or the current state if a
    /// newer key superseded this one before it resolved.
    pub async fn observe(&self, params: P) -> QueryState<T> {
        if !(self.is_enabled)(&params) {
            tracing::debug!("{} disabled: incomplete inputs", self.scope);
            *self.current.lock() = None;
            self.state.send_replace(QueryState::default());
            return QueryState::default();
        }

        let key = QueryKey::new(self.scope, &params);
        *self.current.lock() = Some((key.clone(), params.clone()));

        if let Some(data) = self.cache.peek_fresh(&key) {
            let state = QueryState::success(data);
            self.state.send_replace(state.clone());
            return state;
        }

        self.publish_pending(&key);

        let result = self
            .cache
            .fetch(&key, || (self.fetcher)(&params))
            .await;

        if self.current_key().as_ref() != Some(&key) {
            tracing::debug!("Discarding superseded result for {}", key.as_str());
            return self.state();
        }

        let state = match result {
            Ok(data) => QueryState::success(data),
            Err(error) => QueryState::failed(error),
        };
        self.state.send_replace(state.clone());
        state
    }

    /// Re-issue the current request, bypassing the cache.
    pub async fn refetch(&self) -> QueryState<T> {
        let current = self.current.lock().clone();
        match current {
            Some((key, params)) => {
                self.cache.invalidate(&key);
                self.observe(params).await
            }
            None => self.state(),
        }
    }

    fn publish_pending(&self, key: &QueryKey) {
        let stale = self.cache.peek(key);
        let keep_previous = self.keep_previous_data;
        self.state.send_modify(|state| {
            let (data, is_placeholder) = match stale {
                Some(data) => (Some(data), false),
                None if keep_previous && state.data.is_some() => (state.data.clone(), true),
                None => (None, false),
            };
            *state = QueryState {
                status: if data.is_some() {
                    QueryStatus::Success
                } else {
                    QueryStatus::Loading
                },
                data,
                error: None,
                is_placeholder,
                is_fetching: true,
            };
        });
    }
}

/// The daily and hourly query caches over one weather source.
pub struct WeatherQueries<S> {
    source: Arc<S>,
    daily: Arc<QueryCache<DailyWeatherResponse>>,
    hourly: Arc<QueryCache<HourlyWeatherResponse>>,
    keep_previous_data: bool,
}

impl<S: WeatherSource> WeatherQueries<S> {
    pub fn new(source: S, config: &QueryConfig) -> Self {
        Self {
            source: Arc::new(source),
            daily: Arc::new(QueryCache::from_config(config)),
            hourly: Arc::new(QueryCache::from_config(config)),
            keep_previous_data: config.keep_previous_data,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn daily_observer(&self) -> QueryObserver<DailyWeatherParams, DailyWeatherResponse> {
        let source = self.source.clone();
        let fetcher: Fetcher<DailyWeatherParams, DailyWeatherResponse> =
            Arc::new(move |params: &DailyWeatherParams| -> BoxFetch<DailyWeatherResponse> {
                let source = source.clone();
                let params = params.clone();
                Box::pin(async move { source.fetch_daily(&params).await })
            });
        QueryObserver::new(
            DAILY_SCOPE,
            self.daily.clone(),
            fetcher,
            DailyWeatherParams::is_complete,
            self.keep_previous_data,
        )
    }

    pub fn hourly_observer(&self) -> QueryObserver<HourlyWeatherParams, HourlyWeatherResponse> {
        let source = self.source.clone();
        let fetcher: Fetcher<HourlyWeatherParams, HourlyWeatherResponse> =
            Arc::new(move |params: &HourlyWeatherParams| -> BoxFetch<HourlyWeatherResponse> {
                let source = source.clone();
                let params = params.clone();
                Box::pin(async move { source.fetch_hourly(&params).await })
            });
        QueryObserver::new(
            HOURLY_SCOPE,
            self.hourly.clone(),
            fetcher,
            HourlyWeatherParams::is_complete,
            self.keep_previous_data,
        )
    }

    /// Drop long-unused entries from both caches.
    pub fn collect_garbage(&self) -> usize {
        self.daily.collect_garbage() + self.hourly.collect_garbage()
    }
}
