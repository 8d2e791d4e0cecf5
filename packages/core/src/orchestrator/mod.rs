//! Request orchestration.
//!
//! [`RequestOrchestrator`] wraps one-shot backend calls with a uniform
//! loading / success / error state, user notifications, batch execution,
//! fixed-interval polling, a keyed TTL cache, and retry with backoff.
//!
//! One orchestrator is constructed per session and shared as
//! `Arc<RequestOrchestrator>`. Its state and cache sit behind
//! `std::sync::Mutex` and are never locked across an `.await`.

mod batch;
mod poll;
mod retry;


use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::cache::{KeyedCache, DEFAULT_TTL};
use crate::error::{AppError, DEFAULT_FAILURE_MESSAGE};
use crate::metrics::AppMetrics;
use crate::notify::Notifier;

pub use batch::{BatchOptions, BatchOutcome};
pub use poll::{PollOptions, Poller};
pub use retry::{backoff_delay, RetryOptions};

/// Snapshot of the orchestrator's request state.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RequestState {
    /// A call with `show_loading` is in flight.
    pub loading: bool,
    /// Any call is in flight.
    pub pending: bool,
    /// The most recent call succeeded.
    pub success: bool,
    /// The most recent call failed.
    pub error: bool,
    pub last_error: Option<String>,
    /// Result of the most recent successful call.
    pub data: Option<Value>,
}

/// Per-call presentation options for [`RequestOrchestrator::execute`].
#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    pub loading_message: Option<String>,
    pub success_message: Option<String>,
    /// Shown when the error itself carries no message.
    pub error_message: String,
    pub show_loading: bool,
    pub show_success: bool,
    pub show_error: bool,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            loading_message: None,
            success_message: None,
            error_message: DEFAULT_FAILURE_MESSAGE.to_string(),
            show_loading: true,
            show_success: false,
            show_error: true,
        }
    }
}

impl ExecuteOptions {
    pub fn loading_message(mut self, message: impl Into<String>) -> Self {
        self.loading_message = Some(message.into());
        self
    }

    /// Set a success message and enable showing it.
    pub fn success_message(mut self, message: impl Into<String>) -> Self {
        self.success_message = Some(message.into());
        self.show_success = true;
        self
    }

    pub fn error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = message.into();
        self
    }

    /// Suppress every notification.
    pub fn silent(mut self) -> Self {
        self.show_loading = false;
        self.show_success = false;
        self.show_error = false;
        self
    }
}

/// Options for [`RequestOrchestrator::execute_with_cache`].
#[derive(Debug, Clone)]
pub struct CacheOptions {
    pub ttl: Duration,
    pub force_refresh: bool,
    pub execute: ExecuteOptions,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            force_refresh: false,
            execute: ExecuteOptions::default(),
        }
    }
}

impl CacheOptions {
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn force_refresh(mut self, force: bool) -> Self {
        self.force_refresh = force;
        self
    }
}

pub struct RequestOrchestrator {
    notifier: Arc<dyn Notifier>,
    metrics: Option<Arc<AppMetrics>>,
    state: Mutex<RequestState>,
    cache: Mutex<KeyedCache<Value>>,
}

impl std::fmt::Debug for RequestOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestOrchestrator")
            .field("state", &self.state())
            .field("cached", &self.cache_len())
            .finish()
    }
}

impl RequestOrchestrator {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self {
            notifier,
            metrics: None,
            state: Mutex::new(RequestState::default()),
            cache: Mutex::new(KeyedCache::new()),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<AppMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }

    pub fn state(&self) -> RequestState {
        self.lock_state().clone()
    }

    /// Run one backend call and return its result unchanged.
    pub async fn execute<T, F, Fut>(&self, call: F, options: &ExecuteOptions) -> Result<T, AppError>
    where
        T: Serialize,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        self.execute_map(call, |value| value, options).await
    }

    /// Run one backend call and apply `transform` to a successful result.
    ///
    /// The transformed value becomes the state's `data`. On failure the
    /// error is logged, recorded, shown to the user unless `show_error` is
    /// off, and returned.
    pub async fn execute_map<T, U, F, Fut, M>(
        &self,
        call: F,
        transform: M,
        options: &ExecuteOptions,
    ) -> Result<U, AppError>
    where
        U: Serialize,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
        M: FnOnce(T) -> U,
    {
        {
            let mut state = self.lock_state();
            state.loading = options.show_loading;
            state.pending = true;
            state.success = false;
            state.error = false;
            state.last_error = None;
        }

        if options.show_loading {
            if let Some(message) = options.loading_message.as_deref().filter(|m| !m.is_empty()) {
                self.notifier.info(message);
            }
        }

        let started = Instant::now();
        let outcome = call().await;
        self.observe_call(started, outcome.is_err());

        match outcome {
            Ok(value) => {
                let value = transform(value);
                {
                    let mut state = self.lock_state();
                    state.loading = false;
                    state.pending = false;
                    state.success = true;
                    state.data = to_data(&value);
                }

                if options.show_success {
                    if let Some(message) = options.success_message.as_deref().filter(|m| !m.is_empty()) {
                        self.notifier.success(message);
                    }
                }

                Ok(value)
            }
            Err(err) => {
                tracing::error!("API error: {}", err);
                {
                    let mut state = self.lock_state();
                    state.loading = false;
                    state.pending = false;
                    state.error = true;
                    state.last_error = Some(err.to_string());
                }

                if options.show_error {
                    self.notifier.error(&user_message(&err, &options.error_message));
                }

                Err(err)
            }
        }
    }

    /// Serve `key` from the cache while its entry is younger than
    /// `options.ttl`, otherwise run `call` through [`execute`](Self::execute)
    /// and cache the result.
    pub async fn execute_with_cache<T, F, Fut>(
        &self,
        key: &str,
        call: F,
        options: &CacheOptions,
    ) -> Result<T, AppError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        if !options.force_refresh {
            if let Some(hit) = self.cached::<T>(key, options.ttl) {
                tracing::debug!("cache hit for '{}'", key);
                if let Some(metrics) = &self.metrics {
                    metrics.cache_hits_total.inc();
                }
                return Ok(hit);
            }
        }

        if let Some(metrics) = &self.metrics {
            metrics.cache_misses_total.inc();
        }

        let value = self.execute(call, &options.execute).await?;
        if let Some(data) = to_data(&value) {
            self.lock_cache().insert(key, data);
        }
        Ok(value)
    }

    /// Drop one cache entry, or all of them.
    pub fn clear_cache(&self, key: Option<&str>) {
        let mut cache = self.lock_cache();
        match key {
            Some(key) => cache.invalidate(key),
            None => cache.clear(),
        }
    }

    pub fn cache_len(&self) -> usize {
        self.lock_cache().len()
    }

    fn cached<T: DeserializeOwned>(&self, key: &str, ttl: Duration) -> Option<T> {
        let data = self.lock_cache().get_fresh(key, ttl)?;
        match serde_json::from_value::<T>(data.clone()) {
            Ok(value) => {
                self.lock_state().data = Some(data);
                Some(value)
            }
            Err(err) => {
                tracing::warn!("cached entry '{}' has an unexpected shape: {}", key, err);
                None
            }
        }
    }

    fn observe_call(&self, started: Instant, failed: bool) {
        if let Some(metrics) = &self.metrics {
            metrics.requests_total.inc();
            metrics.request_duration.observe(started.elapsed().as_secs_f64());
            if failed {
                metrics.request_errors_total.inc();
            }
        }
    }

    pub(crate) fn record_data(&self, data: Option<Value>) {
        self.lock_state().data = data;
    }

    pub(crate) fn record_error(&self, err: &AppError) {
        let mut state = self.lock_state();
        state.error = true;
        state.last_error = Some(err.to_string());
    }

    pub(crate) fn metrics(&self) -> Option<&Arc<AppMetrics>> {
        self.metrics.as_ref()
    }

    fn lock_state(&self) -> MutexGuard<'_, RequestState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_cache(&self) -> MutexGuard<'_, KeyedCache<Value>> {
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn to_data<T: Serialize>(value: &T) -> Option<Value> {
    match serde_json::to_value(value) {
        Ok(data) => Some(data),
        Err(err) => {
            tracing::warn!("result could not be recorded: {}", err);
            None
        }
    }
}

/// The error's own message, or `fallback` when it has none.
fn user_message(err: &AppError, fallback: &str) -> String {
    let message = err.to_string();
    if message.trim().is_empty() {
        fallback.to_string()
    } else {
        message
    }
}
