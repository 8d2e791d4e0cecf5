//! Realtime alert watcher.
//!
//! Drives the alerts store's realtime refresh: each tick fetches the latest
//! alerts and merges them into the store, so views built on the store always
//! see fresh data. The tick interval and on/off switch come from the store's
//! persisted realtime config.

use std::sync::Arc;

use tokio::signal;
use tokio::time;

use crate::stores::alerts::FetchOptions;
use crate::stores::AlertsStore;
use crate::types::Severity;

/// Run the alert refresh loop for `city` (or all cities).
///
/// Fetch errors are logged and the loop continues. Returns immediately when
/// realtime refresh is disabled, otherwise runs until `Ctrl+C`.
pub async fn run_alert_watcher(store: Arc<AlertsStore>, city: Option<String>) {
    let realtime = store.read().await.realtime;
    if !realtime.enabled {
        tracing::info!("Realtime alerts disabled; watcher not started");
        return;
    }

    let mut interval = time::interval(realtime.interval());

    tracing::info!(
        "Alert watcher started (interval: {}s, city: {})",
        realtime.interval().as_secs(),
        city.as_deref().unwrap_or("all")
    );

    loop {
        tokio::select! {
            _ = interval.tick() => {
                watch_once(&store, city.as_deref()).await;
            }

            _ = signal::ctrl_c() => {
                tracing::info!("Shutdown signal received. Stopping alert watcher.");
                break;
            }
        }
    }

    tracing::info!("Alert watcher stopped cleanly");
}

/// One refresh cycle. Returns how many alerts were new to the store.
async fn watch_once(store: &AlertsStore, city: Option<&str>) -> usize {
    let before = store.read().await.alerts.len();

    let options = FetchOptions {
        city: city.map(str::to_string),
        ..FetchOptions::default()
    };

    let after = match store.fetch_alerts(options).await {
        Ok(len) => len,
        Err(err) => {
            tracing::error!("Alert refresh failed, skipping tick: {}", err);
            return 0;
        }
    };

    let added = after.saturating_sub(before);
    if added == 0 {
        tracing::debug!("No new alerts this tick");
        return 0;
    }

    let high = store
        .read()
        .await
        .unresolved_alerts()
        .iter()
        .filter(|alert| alert.anomaly_severity == Severity::High)
        .count();

    tracing::info!("{} new alerts, {} unresolved high severity", added, high);
    added
}
