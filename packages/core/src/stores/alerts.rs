//! Alerts store.
//!
//! Holds the fetched alerts with their filter, pagination and realtime
//! settings. Read-side views live on [`AlertsState`] and are computed on
//! demand; [`AlertsStore`] owns the state behind a Tokio `RwLock` and runs
//! the actions that talk to the backend.
//!
//! Resolution is optimistic: the local record flips to resolved before the
//! backend confirms, and the previous values are restored if it refuses.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Local, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, RwLockReadGuard};

use super::{persist_slice, restore_slice};
use crate::api::alerts::{AlertStatsQuery, AlertsSource};
use crate::error::AppError;
use crate::notify::Notifier;
use crate::storage::LocalStorage;
use crate::types::{Alert, Metrics, Severity};

pub const STORE_ID: &str = "alerts";
pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const DEFAULT_RECENT_LIMIT: u32 = 10;
pub const DEFAULT_REALTIME_INTERVAL: Duration = Duration::from_secs(30);

// ---- Filters, pagination, realtime ----

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Resolved,
    Unresolved,
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "" | "all" => Ok(StatusFilter::All),
            "resolved" => Ok(StatusFilter::Resolved),
            "unresolved" => Ok(StatusFilter::Unresolved),
            other => Err(format!("Invalid status '{}'. Must be one of: all, resolved, unresolved", other)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AlertFilters {
    pub city: Option<String>,
    pub severity: Option<Severity>,
    #[serde(rename = "type")]
    pub anomaly_type: Option<String>,
    pub status: StatusFilter,
    /// Inclusive range over the alert's creation date.
    pub date_range: Option<(NaiveDate, NaiveDate)>,
}

impl AlertFilters {
    pub fn matches(&self, alert: &Alert) -> bool {
        if let Some(city) = self.city.as_deref().filter(|c| !c.is_empty()) {
            if alert.city != city {
                return false;
            }
        }
        if let Some(severity) = self.severity {
            if alert.anomaly_severity != severity {
                return false;
            }
        }
        if let Some(anomaly_type) = self.anomaly_type.as_deref().filter(|t| !t.is_empty()) {
            if alert.anomaly_type != anomaly_type {
                return false;
            }
        }
        match self.status {
            StatusFilter::Resolved if !alert.is_resolved => return false,
            StatusFilter::Unresolved if alert.is_resolved => return false,
            _ => {}
        }
        if let Some((start, end)) = self.date_range {
            match alert.created_at.map(|at| at.date()) {
                Some(day) if day >= start && day <= end => {}
                _ => return false,
            }
        }
        true
    }
}

/// One filter field to change.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterChange {
    City(Option<String>),
    Severity(Option<Severity>),
    Type(Option<String>),
    Status(StatusFilter),
    DateRange(Option<(NaiveDate, NaiveDate)>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Pagination {
    pub current: u32,
    pub page_size: u32,
    pub total: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            current: 1,
            page_size: DEFAULT_PAGE_SIZE,
            total: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RealtimeConfig {
    pub enabled: bool,
    /// Refresh interval in milliseconds.
    #[serde(rename = "interval")]
    pub interval_ms: u64,
    pub last_update: Option<NaiveDateTime>,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: interval_millis(DEFAULT_REALTIME_INTERVAL),
            last_update: None,
        }
    }
}

impl RealtimeConfig {
    /// The refresh period. A zero interval falls back to the default.
    pub fn interval(&self) -> Duration {
        match self.interval_ms {
            0 => DEFAULT_REALTIME_INTERVAL,
            ms => Duration::from_millis(ms),
        }
    }
}

/// Whole milliseconds of `interval`, saturating at `u64::MAX` and never
/// below one.
fn interval_millis(interval: Duration) -> u64 {
    u64::try_from(interval.as_millis()).unwrap_or(u64::MAX).max(1)
}

/// The part of the store that survives restarts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct PersistedAlerts {
    filters: AlertFilters,
    pagination: Pagination,
    #[serde(rename = "realTimeConfig")]
    realtime: RealtimeConfig,
}

// ---- Derived view shapes ----

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CityAlertStats {
    pub total: usize,
    pub unresolved: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrendBucket {
    /// Bucket start as `HH:MM`.
    pub time: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSummary {
    pub total: usize,
    pub unresolved: usize,
    pub resolved: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub cities: usize,
    pub last_update: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(format!("Unsupported export format '{}'. Use json or csv", other)),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        })
    }
}

// ---- State ----

#[derive(Debug, Clone, Default)]
pub struct AlertsState {
    /// Insertion-ordered, unique by id after merges.
    pub alerts: Vec<Alert>,
    pub recent_alerts: Vec<Alert>,
    pub alert_stats: Metrics,
    pub loading: bool,
    pub last_error: Option<String>,
    pub filters: AlertFilters,
    pub pagination: Pagination,
    pub realtime: RealtimeConfig,
}

impl AlertsState {
    pub fn filtered_alerts(&self) -> Vec<&Alert> {
        self.alerts.iter().filter(|a| self.filters.matches(a)).collect()
    }

    pub fn unresolved_alerts(&self) -> Vec<&Alert> {
        self.alerts.iter().filter(|a| !a.is_resolved).collect()
    }

    pub fn high_severity_alerts(&self) -> Vec<&Alert> {
        self.alerts
            .iter()
            .filter(|a| a.anomaly_severity == Severity::High)
            .collect()
    }

    pub fn alerts_by_city(&self) -> BTreeMap<String, CityAlertStats> {
        let mut by_city: BTreeMap<String, CityAlertStats> = BTreeMap::new();
        for alert in &self.alerts {
            let stats = by_city.entry(alert.city.clone()).or_default();
            stats.total += 1;
            if !alert.is_resolved {
                stats.unresolved += 1;
            }
            match alert.anomaly_severity {
                Severity::High => stats.high += 1,
                Severity::Medium => stats.medium += 1,
                Severity::Low => stats.low += 1,
                Severity::Unknown => {}
            }
        }
        by_city
    }

    /// Alert counts for the 24 whole hours ending with the hour containing
    /// `now`, oldest first.
    pub fn alert_trend(&self, now: NaiveDateTime) -> Vec<TrendBucket> {
        let current_hour = now
            .date()
            .and_hms_opt(now.hour(), 0, 0)
            .unwrap_or(now);

        (0..24)
            .rev()
            .map(|hours_back| {
                let start = current_hour - ChronoDuration::hours(hours_back);
                let end = start + ChronoDuration::hours(1);
                let count = self
                    .alerts
                    .iter()
                    .filter_map(|a| a.created_at)
                    .filter(|at| *at >= start && *at < end)
                    .count();
                TrendBucket {
                    time: start.format("%H:%M").to_string(),
                    count,
                }
            })
            .collect()
    }

    pub fn stats_summary(&self) -> StatsSummary {
        let count = |severity: Severity| {
            self.alerts
                .iter()
                .filter(|a| a.anomaly_severity == severity)
                .count()
        };
        let resolved = self.alerts.iter().filter(|a| a.is_resolved).count();

        StatsSummary {
            total: self.alerts.len(),
            unresolved: self.alerts.len() - resolved,
            resolved,
            high: count(Severity::High),
            medium: count(Severity::Medium),
            low: count(Severity::Low),
            cities: self.alerts_by_city().len(),
            last_update: self.realtime.last_update,
        }
    }

    /// Replace the collection, or append the incoming alerts whose ids are
    /// not present yet.
    pub fn merge_alerts(&mut self, incoming: Vec<Alert>, replace: bool) {
        if replace {
            self.alerts = incoming;
            return;
        }

        let mut known: HashSet<i64> = self.alerts.iter().map(|a| a.id).collect();
        for alert in incoming {
            if known.insert(alert.id) {
                self.alerts.push(alert);
            }
        }
    }

    pub fn export(&self, format: ExportFormat) -> Result<String, AppError> {
        let rows = self.filtered_alerts();
        match format {
            ExportFormat::Json => Ok(serde_json::to_string_pretty(&rows)?),
            ExportFormat::Csv => Ok(to_csv(&rows)),
        }
    }

    fn persisted(&self) -> PersistedAlerts {
        PersistedAlerts {
            filters: self.filters.clone(),
            pagination: self.pagination,
            realtime: self.realtime,
        }
    }
}

const CSV_HEADERS: [&str; 7] = ["ID", "City", "Type", "Severity", "Status", "Created At", "Resolved At"];

fn to_csv(rows: &[&Alert]) -> String {
    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(CSV_HEADERS.join(","));

    for alert in rows {
        let fields = [
            alert.id.to_string(),
            alert.city.clone(),
            alert.anomaly_type.clone(),
            alert.anomaly_severity.to_string(),
            if alert.is_resolved { "Resolved" } else { "Unresolved" }.to_string(),
            alert.created_at.map(format_timestamp).unwrap_or_default(),
            alert.resolved_at.map(format_timestamp).unwrap_or_default(),
        ];
        let line: Vec<String> = fields.iter().map(|f| csv_field(f)).collect();
        lines.push(line.join(","));
    }

    lines.join("\n")
}

fn format_timestamp(at: NaiveDateTime) -> String {
    at.format("%Y-%m-%dT%H:%M:%S").to_string()
}

fn csv_field(raw: &str) -> String {
    if raw.contains([',', '"', '\n']) {
        format!("\"{}\"", raw.replace('"', "\"\""))
    } else {
        raw.to_string()
    }
}

// ---- Store ----

/// Options for [`AlertsStore::fetch_alerts`]. Unset fields fall back to the
/// store's pagination and city filter.
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub city: Option<String>,
    /// Replace the collection instead of merging into it.
    pub refresh: bool,
}

struct ResolutionSnapshot {
    id: i64,
    is_resolved: bool,
    resolved_at: Option<NaiveDateTime>,
}

pub struct AlertsStore {
    state: RwLock<AlertsState>,
    source: Arc<dyn AlertsSource + Send + Sync>,
    notifier: Arc<dyn Notifier>,
    storage: Option<Arc<LocalStorage>>,
}

impl AlertsStore {
    pub fn new(source: Arc<dyn AlertsSource + Send + Sync>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            state: RwLock::new(AlertsState::default()),
            source,
            notifier,
            storage: None,
        }
    }

    /// Attach storage and restore the persisted filters, pagination and
    /// realtime settings from it.
    pub fn with_storage(mut self, storage: Arc<LocalStorage>) -> Self {
        if let Some(saved) = restore_slice::<PersistedAlerts>(&storage, STORE_ID) {
            let state = self.state.get_mut();
            state.filters = saved.filters;
            state.pagination = saved.pagination;
            state.realtime = saved.realtime;
            if state.realtime.interval_ms == 0 {
                tracing::warn!("ignoring persisted realtime interval of 0ms");
                state.realtime.interval_ms = interval_millis(DEFAULT_REALTIME_INTERVAL);
            }
            tracing::debug!("restored alerts store from storage");
        }
        self.storage = Some(storage);
        self
    }

    pub async fn read(&self) -> RwLockReadGuard<'_, AlertsState> {
        self.state.read().await
    }

    pub async fn snapshot(&self) -> AlertsState {
        self.state.read().await.clone()
    }

    /// Load alerts for the configured city (today's alerts) or, without a
    /// city, the most recent `page_size * page` alerts. Returns the size of
    /// the collection afterwards.
    pub async fn fetch_alerts(&self, options: FetchOptions) -> Result<usize, AppError> {
        let (city, limit) = {
            let mut state = self.state.write().await;
            state.loading = true;
            state.last_error = None;

            let page = options.page.unwrap_or(state.pagination.current).max(1);
            let page_size = options.page_size.unwrap_or(state.pagination.page_size);
            let city = options
                .city
                .clone()
                .or_else(|| state.filters.city.clone())
                .filter(|c| !c.is_empty());
            (city, page_size.saturating_mul(page))
        };

        let fetched = match city.as_deref() {
            Some(city) => self.source.today_alerts(city).await,
            None => self.source.recent_alerts(limit).await,
        };

        let mut state = self.state.write().await;
        state.loading = false;
        match fetched {
            Ok(alerts) => {
                state.merge_alerts(alerts, options.refresh);
                state.pagination.total = state.alerts.len();
                state.realtime.last_update = Some(now());
                self.persist(&state);
                Ok(state.alerts.len())
            }
            Err(err) => {
                tracing::error!("Failed to fetch alerts: {}", err);
                state.last_error = Some(err.to_string());
                Err(err)
            }
        }
    }

    pub async fn fetch_recent_alerts(&self, limit: Option<u32>) -> Result<Vec<Alert>, AppError> {
        let alerts = self
            .source
            .recent_alerts(limit.unwrap_or(DEFAULT_RECENT_LIMIT))
            .await
            .map_err(|err| {
                tracing::error!("Failed to fetch recent alerts: {}", err);
                err
            })?;

        self.state.write().await.recent_alerts = alerts.clone();
        Ok(alerts)
    }

    pub async fn fetch_alert_stats(&self, query: &AlertStatsQuery) -> Result<Metrics, AppError> {
        let stats = self.source.alert_stats(query).await.map_err(|err| {
            tracing::error!("Failed to fetch alert stats: {}", err);
            err
        })?;

        self.state.write().await.alert_stats = stats.clone();
        Ok(stats)
    }

    pub async fn resolve_alert(&self, alert_id: i64) -> Result<(), AppError> {
        match self
            .resolve_with_rollback(&[alert_id], self.source.resolve_alert(alert_id))
            .await
        {
            Ok(()) => {
                self.notifier.success("Alert resolved");
                Ok(())
            }
            Err(err) => {
                self.notifier.error("Failed to resolve alert");
                Err(err)
            }
        }
    }

    pub async fn resolve_alerts_in_batch(&self, alert_ids: &[i64]) -> Result<(), AppError> {
        match self
            .resolve_with_rollback(alert_ids, self.source.resolve_alerts(alert_ids))
            .await
        {
            Ok(()) => {
                self.notifier
                    .success(&format!("Resolved {} alerts", alert_ids.len()));
                Ok(())
            }
            Err(err) => {
                self.notifier.error("Failed to resolve alerts in batch");
                Err(err)
            }
        }
    }

    /// Mark `alert_ids` resolved locally, then await `remote`. If it fails
    /// the touched alerts get their previous resolution fields back.
    async fn resolve_with_rollback<Fut>(&self, alert_ids: &[i64], remote: Fut) -> Result<(), AppError>
    where
        Fut: Future<Output = Result<(), AppError>>,
    {
        let snapshots = {
            let mut state = self.state.write().await;
            let resolved_at = now();
            let mut snapshots = Vec::new();
            for id in alert_ids {
                if let Some(alert) = state.alerts.iter_mut().find(|a| a.id == *id) {
                    snapshots.push(ResolutionSnapshot {
                        id: *id,
                        is_resolved: alert.is_resolved,
                        resolved_at: alert.resolved_at,
                    });
                    alert.is_resolved = true;
                    alert.resolved_at = Some(resolved_at);
                }
            }
            snapshots
        };

        if let Err(err) = remote.await {
            tracing::error!("Resolving {:?} failed, rolling back: {}", alert_ids, err);
            let mut state = self.state.write().await;
            // The list may have been refreshed or reordered while the request
            // was in flight; alerts that are gone by now are skipped.
            for snapshot in snapshots.into_iter().rev() {
                if let Some(alert) = state.alerts.iter_mut().find(|a| a.id == snapshot.id) {
                    alert.is_resolved = snapshot.is_resolved;
                    alert.resolved_at = snapshot.resolved_at;
                }
            }
            return Err(err);
        }

        Ok(())
    }

    /// Prepend a pushed alert. High-severity alerts raise a warning.
    pub async fn add_alert(&self, alert: Alert) {
        if alert.anomaly_severity == Severity::High {
            self.notifier
                .warning(&format!("{}: {}", alert.city, alert.anomaly_type));
        }
        self.state.write().await.alerts.insert(0, alert);
    }

    /// Replace the alert with the same id. Returns false when none matches.
    pub async fn update_alert(&self, updated: Alert) -> bool {
        let mut state = self.state.write().await;
        match state.alerts.iter_mut().find(|a| a.id == updated.id) {
            Some(existing) => {
                *existing = updated;
                true
            }
            None => false,
        }
    }

    pub async fn remove_alert(&self, alert_id: i64) -> bool {
        let mut state = self.state.write().await;
        match state.alerts.iter().position(|a| a.id == alert_id) {
            Some(index) => {
                state.alerts.remove(index);
                true
            }
            None => false,
        }
    }

    /// Change one filter and go back to the first page.
    pub async fn set_filter(&self, change: FilterChange) {
        let mut state = self.state.write().await;
        let filters = &mut state.filters;
        match change {
            FilterChange::City(city) => filters.city = city,
            FilterChange::Severity(severity) => filters.severity = severity,
            FilterChange::Type(anomaly_type) => filters.anomaly_type = anomaly_type,
            FilterChange::Status(status) => filters.status = status,
            FilterChange::DateRange(range) => filters.date_range = range,
        }
        state.pagination.current = 1;
        self.persist(&state);
    }

    pub async fn reset_filters(&self) {
        let mut state = self.state.write().await;
        state.filters = AlertFilters::default();
        state.pagination.current = 1;
        self.persist(&state);
    }

    pub async fn set_pagination(&self, page: u32, page_size: Option<u32>) {
        let mut state = self.state.write().await;
        state.pagination.current = page;
        if let Some(page_size) = page_size {
            state.pagination.page_size = page_size;
        }
        self.persist(&state);
    }

    pub async fn enable_realtime(&self) {
        self.update_realtime(|realtime| realtime.enabled = true).await;
    }

    pub async fn disable_realtime(&self) {
        self.update_realtime(|realtime| realtime.enabled = false).await;
    }

    /// Change the refresh period. Sub-millisecond values round up to 1ms.
    pub async fn set_realtime_interval(&self, interval: Duration) {
        self.update_realtime(|realtime| realtime.interval_ms = interval_millis(interval))
            .await;
    }

    async fn update_realtime(&self, change: impl FnOnce(&mut RealtimeConfig)) {
        let mut state = self.state.write().await;
        change(&mut state.realtime);
        self.persist(&state);
    }

    pub async fn clear_alerts(&self) {
        let mut state = self.state.write().await;
        state.alerts.clear();
        state.recent_alerts.clear();
        state.alert_stats = Metrics::Null;
        state.pagination.current = 1;
        state.pagination.total = 0;
        self.persist(&state);
    }

    /// Export the filtered view.
    pub async fn export_alerts(&self, format: ExportFormat) -> Result<String, AppError> {
        self.state.read().await.export(format)
    }

    fn persist(&self, state: &AlertsState) {
        if let Some(storage) = &self.storage {
            persist_slice(storage, STORE_ID, &state.persisted());
        }
    }
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;
    use tokio::sync::Notify;

    use crate::notify::{NotifyLevel, RecordingNotifier};

    #[derive(Default)]
    struct MockSource {
        today: Vec<Alert>,
        recent: Vec<Alert>,
        fail_fetch: bool,
        fail_resolve: bool,
        recent_limits: Mutex<Vec<u32>>,
        resolved: Mutex<Vec<i64>>,
    }

    #[async_trait]
    impl AlertsSource for MockSource {
        async fn today_alerts(&self, _city: &str) -> Result<Vec<Alert>, AppError> {
            if self.fail_fetch {
                return Err(AppError::Network("connection refused".into()));
            }
            Ok(self.today.clone())
        }

        async fn recent_alerts(&self, limit: u32) -> Result<Vec<Alert>, AppError> {
            self.recent_limits.lock().unwrap().push(limit);
            if self.fail_fetch {
                return Err(AppError::Network("connection refused".into()));
            }
            Ok(self.recent.clone())
        }

        async fn alert_stats(&self, _query: &AlertStatsQuery) -> Result<Metrics, AppError> {
            Ok(json!({ "HIGH": 2 }))
        }

        async fn resolve_alert(&self, alert_id: i64) -> Result<(), AppError> {
            if self.fail_resolve {
                return Err(AppError::api("alert is locked"));
            }
            self.resolved.lock().unwrap().push(alert_id);
            Ok(())
        }

        async fn resolve_alerts(&self, alert_ids: &[i64]) -> Result<(), AppError> {
            if self.fail_resolve {
                return Err(AppError::api("alert is locked"));
            }
            self.resolved.lock().unwrap().extend_from_slice(alert_ids);
            Ok(())
        }
    }

    fn at(raw: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S").unwrap()
    }

    fn alert(id: i64, city: &str, severity: Severity, resolved: bool, created: &str) -> Alert {
        Alert {
            id,
            city: city.to_string(),
            anomaly_type: "DELAY".to_string(),
            anomaly_severity: severity,
            order_id: None,
            courier_id: None,
            anomaly_value: None,
            threshold_value: None,
            description: None,
            original_time: None,
            analysis_date: None,
            analysis_hour: None,
            is_resolved: resolved,
            created_at: Some(at(created)),
            resolved_at: None,
        }
    }

    fn store_with(source: MockSource) -> (AlertsStore, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::new());
        (AlertsStore::new(Arc::new(source), notifier.clone()), notifier)
    }

    fn sample() -> Vec<Alert> {
        vec![
            alert(1, "Shanghai", Severity::High, false, "2024-03-01T09:10:00"),
            alert(2, "Shanghai", Severity::Low, true, "2024-03-01T10:20:00"),
            alert(3, "Hangzhou", Severity::Medium, false, "2024-03-02T10:45:00"),
        ]
    }

    // ---- views ----

    #[test]
    fn filters_combine() {
        let mut state = AlertsState {
            alerts: sample(),
            ..AlertsState::default()
        };

        state.filters.city = Some("Shanghai".into());
        assert_eq!(state.filtered_alerts().len(), 2);

        state.filters.status = StatusFilter::Unresolved;
        let ids: Vec<i64> = state.filtered_alerts().iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![1]);

        state.filters = AlertFilters {
            date_range: Some((
                NaiveDate::from_ymd_opt(2024, 3, 2).unwrap(),
                NaiveDate::from_ymd_opt(2024, 3, 2).unwrap(),
            )),
            ..AlertFilters::default()
        };
        let ids: Vec<i64> = state.filtered_alerts().iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![3]);
    }

    #[test]
    fn empty_string_filters_match_everything() {
        let mut state = AlertsState {
            alerts: sample(),
            ..AlertsState::default()
        };
        state.filters.city = Some(String::new());
        state.filters.anomaly_type = Some(String::new());
        assert_eq!(state.filtered_alerts().len(), 3);
    }

    #[test]
    fn alerts_by_city_counts_severities() {
        let state = AlertsState {
            alerts: sample(),
            ..AlertsState::default()
        };
        let by_city = state.alerts_by_city();

        assert_eq!(
            by_city["Shanghai"],
            CityAlertStats {
                total: 2,
                unresolved: 1,
                high: 1,
                medium: 0,
                low: 1
            }
        );
        assert_eq!(by_city["Hangzhou"].medium, 1);
    }

    #[test]
    fn trend_has_24_hourly_buckets_ending_now() {
        let state = AlertsState {
            alerts: sample(),
            ..AlertsState::default()
        };
        let trend = state.alert_trend(at("2024-03-01T10:30:00"));

        assert_eq!(trend.len(), 24);
        assert_eq!(trend[23].time, "10:00");
        assert_eq!(trend[23].count, 1);
        assert_eq!(trend[22].time, "09:00");
        assert_eq!(trend[22].count, 1);
        assert_eq!(trend[0].time, "11:00");
        assert_eq!(trend.iter().map(|b| b.count).sum::<usize>(), 2);
    }

    #[test]
    fn summary_counts_everything() {
        let state = AlertsState {
            alerts: sample(),
            ..AlertsState::default()
        };
        let summary = state.stats_summary();

        assert_eq!(summary.total, 3);
        assert_eq!(summary.resolved, 1);
        assert_eq!(summary.unresolved, 2);
        assert_eq!((summary.high, summary.medium, summary.low), (1, 1, 1));
        assert_eq!(summary.cities, 2);
    }

    #[test]
    fn merge_skips_known_ids() {
        let mut state = AlertsState {
            alerts: sample(),
            ..AlertsState::default()
        };
        state.merge_alerts(
            vec![
                alert(3, "Hangzhou", Severity::Medium, false, "2024-03-02T10:45:00"),
                alert(4, "Jilin", Severity::Low, false, "2024-03-02T11:00:00"),
                alert(4, "Jilin", Severity::Low, false, "2024-03-02T11:00:00"),
            ],
            false,
        );

        let ids: Vec<i64> = state.alerts.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[test]
    fn csv_export_uses_filtered_view() {
        let mut state = AlertsState {
            alerts: sample(),
            ..AlertsState::default()
        };
        state.filters.city = Some("Hangzhou".into());

        let csv = state.export(ExportFormat::Csv).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "ID,City,Type,Severity,Status,Created At,Resolved At");
        assert_eq!(lines[1], "3,Hangzhou,DELAY,MEDIUM,Unresolved,2024-03-02T10:45:00,");
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn csv_fields_with_commas_are_quoted() {
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(csv_field("plain"), "plain");
    }

    #[test]
    fn json_export_is_camel_case() {
        let state = AlertsState {
            alerts: sample(),
            ..AlertsState::default()
        };
        let json = state.export(ExportFormat::Json).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed[0]["anomalySeverity"], "HIGH");
        assert_eq!(parsed.as_array().unwrap().len(), 3);
    }

    // ---- actions ----

    #[tokio::test]
    async fn fetch_without_city_asks_for_page_size_times_page() {
        let source = Arc::new(MockSource {
            recent: sample(),
            ..MockSource::default()
        });
        let store = AlertsStore::new(source.clone(), Arc::new(RecordingNotifier::new()));
        store.set_pagination(3, Some(10)).await;

        let count = store.fetch_alerts(FetchOptions::default()).await.unwrap();

        assert_eq!(count, 3);
        assert_eq!(*source.recent_limits.lock().unwrap(), vec![30]);
        let state = store.read().await;
        assert_eq!(state.pagination.total, 3);
        assert!(state.realtime.last_update.is_some());
        assert!(!state.loading);
    }

    #[tokio::test]
    async fn fetch_merges_unless_refreshing() {
        let (store, _) = store_with(MockSource {
            today: vec![alert(9, "Shanghai", Severity::Low, false, "2024-03-01T08:00:00")],
            ..MockSource::default()
        });
        store.add_alert(alert(1, "Shanghai", Severity::Low, false, "2024-03-01T07:00:00")).await;

        let options = FetchOptions {
            city: Some("Shanghai".into()),
            ..FetchOptions::default()
        };
        store.fetch_alerts(options.clone()).await.unwrap();
        store.fetch_alerts(options.clone()).await.unwrap();
        assert_eq!(store.read().await.alerts.len(), 2);

        store
            .fetch_alerts(FetchOptions {
                refresh: true,
                ..options
            })
            .await
            .unwrap();
        let ids: Vec<i64> = store.read().await.alerts.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![9]);
    }

    #[tokio::test]
    async fn fetch_failure_is_recorded_and_returned() {
        let (store, _) = store_with(MockSource {
            fail_fetch: true,
            ..MockSource::default()
        });

        let err = store.fetch_alerts(FetchOptions::default()).await.unwrap_err();

        assert!(matches!(err, AppError::Network(_)));
        let state = store.read().await;
        assert!(!state.loading);
        assert!(state.last_error.is_some());
    }

    #[tokio::test]
    async fn resolve_marks_alert_and_notifies() {
        let (store, notifier) = store_with(MockSource::default());
        store.add_alert(alert(5, "Shanghai", Severity::Low, false, "2024-03-01T07:00:00")).await;

        store.resolve_alert(5).await.unwrap();

        let state = store.read().await;
        assert!(state.alerts[0].is_resolved);
        assert!(state.alerts[0].resolved_at.is_some());
        assert_eq!(notifier.messages_at(NotifyLevel::Success), vec!["Alert resolved"]);
    }

    #[tokio::test]
    async fn failed_resolve_rolls_back() {
        let (store, notifier) = store_with(MockSource {
            fail_resolve: true,
            ..MockSource::default()
        });
        store.add_alert(alert(5, "Shanghai", Severity::Low, false, "2024-03-01T07:00:00")).await;

        let err = store.resolve_alert(5).await.unwrap_err();

        assert_eq!(err.to_string(), "alert is locked");
        let state = store.read().await;
        assert!(!state.alerts[0].is_resolved);
        assert!(state.alerts[0].resolved_at.is_none());
        assert_eq!(notifier.messages_at(NotifyLevel::Error), vec!["Failed to resolve alert"]);
    }

    #[tokio::test]
    async fn failed_batch_resolve_restores_every_alert() {
        let (store, _) = store_with(MockSource {
            fail_resolve: true,
            ..MockSource::default()
        });
        let mut already = alert(1, "Shanghai", Severity::Low, true, "2024-03-01T07:00:00");
        already.resolved_at = Some(at("2024-03-01T08:00:00"));
        store.add_alert(already.clone()).await;
        store.add_alert(alert(2, "Shanghai", Severity::Low, false, "2024-03-01T07:30:00")).await;

        assert!(store.resolve_alerts_in_batch(&[1, 2]).await.is_err());

        let state = store.read().await;
        let first = state.alerts.iter().find(|a| a.id == 1).unwrap();
        let second = state.alerts.iter().find(|a| a.id == 2).unwrap();
        assert_eq!(first.resolved_at, already.resolved_at);
        assert!(first.is_resolved);
        assert!(!second.is_resolved);
    }

    #[tokio::test]
    async fn batch_resolve_reports_count() {
        let (store, notifier) = store_with(MockSource::default());
        store.add_alert(alert(1, "Shanghai", Severity::Low, false, "2024-03-01T07:00:00")).await;
        store.add_alert(alert(2, "Shanghai", Severity::Low, false, "2024-03-01T07:30:00")).await;

        store.resolve_alerts_in_batch(&[1, 2]).await.unwrap();

        assert_eq!(store.read().await.unresolved_alerts().len(), 0);
        assert_eq!(notifier.messages_at(NotifyLevel::Success), vec!["Resolved 2 alerts"]);
    }

    #[tokio::test]
    async fn high_severity_alert_raises_warning() {
        let (store, notifier) = store_with(MockSource::default());
        store.add_alert(alert(1, "Shanghai", Severity::Low, false, "2024-03-01T07:00:00")).await;
        store.add_alert(alert(2, "Jilin", Severity::High, false, "2024-03-01T07:30:00")).await;

        assert_eq!(notifier.messages_at(NotifyLevel::Warning), vec!["Jilin: DELAY"]);
        assert_eq!(store.read().await.alerts[0].id, 2, "new alerts go first");
    }

    #[tokio::test]
    async fn update_and_remove_by_id() {
        let (store, _) = store_with(MockSource::default());
        store.add_alert(alert(1, "Shanghai", Severity::Low, false, "2024-03-01T07:00:00")).await;

        let mut changed = alert(1, "Shanghai", Severity::High, false, "2024-03-01T07:00:00");
        changed.description = Some("escalated".into());
        assert!(store.update_alert(changed).await);
        assert!(!store.update_alert(alert(99, "X", Severity::Low, false, "2024-03-01T07:00:00")).await);
        assert_eq!(store.read().await.alerts[0].anomaly_severity, Severity::High);

        assert!(store.remove_alert(1).await);
        assert!(!store.remove_alert(1).await);
        assert!(store.read().await.alerts.is_empty());
    }

    #[tokio::test]
    async fn set_filter_resets_page() {
        let (store, _) = store_with(MockSource::default());
        store.set_pagination(4, None).await;

        store.set_filter(FilterChange::Severity(Some(Severity::High))).await;

        let state = store.read().await;
        assert_eq!(state.pagination.current, 1);
        assert_eq!(state.filters.severity, Some(Severity::High));
    }

    #[tokio::test]
    async fn clear_alerts_resets_collections() {
        let (store, _) = store_with(MockSource::default());
        store.add_alert(alert(1, "Shanghai", Severity::Low, false, "2024-03-01T07:00:00")).await;
        store.fetch_alert_stats(&AlertStatsQuery::default()).await.unwrap();

        store.clear_alerts().await;

        let state = store.read().await;
        assert!(state.alerts.is_empty());
        assert!(state.alert_stats.is_null());
        assert_eq!(state.pagination.total, 0);
    }

    #[tokio::test]
    async fn persisted_settings_survive_store_recreation() {
        let storage = Arc::new(LocalStorage::in_memory());
        let notifier = Arc::new(RecordingNotifier::new());

        let store = AlertsStore::new(Arc::new(MockSource::default()), notifier.clone())
            .with_storage(storage.clone());
        store.set_filter(FilterChange::City(Some("Hangzhou".into()))).await;
        store.set_pagination(2, Some(50)).await;
        store.set_realtime_interval(Duration::from_secs(10)).await;
        store.disable_realtime().await;
        drop(store);

        let restored = AlertsStore::new(Arc::new(MockSource::default()), notifier)
            .with_storage(storage.clone());
        let state = restored.read().await;
        assert_eq!(state.filters.city.as_deref(), Some("Hangzhou"));
        assert_eq!(state.pagination.page_size, 50);
        assert_eq!(state.realtime.interval(), Duration::from_secs(10));
        assert!(!state.realtime.enabled);

        let raw: serde_json::Value =
            serde_json::from_str(&storage.get("pinia-alerts").unwrap()).unwrap();
        assert_eq!(raw["realTimeConfig"]["interval"], 10_000);
    }

    #[tokio::test]
    async fn invalid_persisted_slice_keeps_defaults() {
        let storage = Arc::new(LocalStorage::in_memory());
        storage.set("pinia-alerts", "not json").unwrap();

        let store = AlertsStore::new(Arc::new(MockSource::default()), Arc::new(RecordingNotifier::new()))
            .with_storage(storage);

        let state = store.read().await;
        assert_eq!(state.pagination, Pagination::default());
        assert!(state.realtime.enabled);
    }

    #[test]
    fn zero_interval_falls_back_to_default() {
        let realtime = RealtimeConfig {
            interval_ms: 0,
            ..RealtimeConfig::default()
        };
        assert_eq!(realtime.interval(), DEFAULT_REALTIME_INTERVAL);
        assert_eq!(interval_millis(Duration::MAX), u64::MAX);
    }

    #[tokio::test]
    async fn sub_millisecond_interval_rounds_up() {
        let (store, _) = store_with(MockSource::default());

        store.set_realtime_interval(Duration::from_micros(500)).await;
        assert_eq!(store.read().await.realtime.interval_ms, 1);

        store.set_realtime_interval(Duration::ZERO).await;
        assert_eq!(store.read().await.realtime.interval(), Duration::from_millis(1));
    }

    #[tokio::test]
    async fn persisted_zero_interval_restores_default() {
        let storage = Arc::new(LocalStorage::in_memory());
        storage
            .set("pinia-alerts", r#"{"realTimeConfig":{"enabled":true,"interval":0}}"#)
            .unwrap();

        let store = AlertsStore::new(Arc::new(MockSource::default()), Arc::new(RecordingNotifier::new()))
            .with_storage(storage);

        let state = store.read().await;
        assert_eq!(state.realtime.interval_ms, 30_000);
        assert_eq!(state.realtime.interval(), DEFAULT_REALTIME_INTERVAL);
    }

    /// Holds resolve requests open until the test releases them, then fails.
    #[derive(Default)]
    struct GatedSource {
        started: Notify,
        release: Notify,
    }

    impl GatedSource {
        async fn hold(&self) -> Result<(), AppError> {
            self.started.notify_one();
            self.release.notified().await;
            Err(AppError::api("backend rejected"))
        }
    }

    #[async_trait]
    impl AlertsSource for GatedSource {
        async fn today_alerts(&self, _city: &str) -> Result<Vec<Alert>, AppError> {
            Ok(Vec::new())
        }

        async fn recent_alerts(&self, _limit: u32) -> Result<Vec<Alert>, AppError> {
            Ok(Vec::new())
        }

        async fn alert_stats(&self, _query: &AlertStatsQuery) -> Result<Metrics, AppError> {
            Ok(Metrics::Null)
        }

        async fn resolve_alert(&self, _alert_id: i64) -> Result<(), AppError> {
            self.hold().await
        }

        async fn resolve_alerts(&self, _alert_ids: &[i64]) -> Result<(), AppError> {
            self.hold().await
        }
    }

    #[tokio::test]
    async fn rollback_targets_alert_id_after_list_shifts() {
        let source = Arc::new(GatedSource::default());
        let store = Arc::new(AlertsStore::new(source.clone(), Arc::new(RecordingNotifier::new())));
        store.add_alert(alert(5, "Shanghai", Severity::Low, false, "2024-03-01T08:00:00")).await;

        let pending = tokio::spawn({
            let store = store.clone();
            async move { store.resolve_alert(5).await }
        });
        source.started.notified().await;

        let mut pushed = alert(9, "Jilin", Severity::Low, true, "2024-03-01T08:30:00");
        pushed.resolved_at = Some(at("2024-03-01T08:45:00"));
        store.add_alert(pushed).await;
        source.release.notify_one();

        assert!(pending.await.unwrap().is_err());

        let state = store.read().await;
        assert_eq!(state.alerts.iter().map(|a| a.id).collect::<Vec<_>>(), vec![9, 5]);
        let five = state.alerts.iter().find(|a| a.id == 5).unwrap();
        assert!(!five.is_resolved);
        assert!(five.resolved_at.is_none());
        let nine = state.alerts.iter().find(|a| a.id == 9).unwrap();
        assert!(nine.is_resolved);
        assert_eq!(nine.resolved_at, Some(at("2024-03-01T08:45:00")));
    }

    #[tokio::test]
    async fn rollback_skips_alerts_removed_in_flight() {
        let source = Arc::new(GatedSource::default());
        let store = Arc::new(AlertsStore::new(source.clone(), Arc::new(RecordingNotifier::new())));
        store.add_alert(alert(1, "Shanghai", Severity::Low, false, "2024-03-01T08:00:00")).await;
        store.add_alert(alert(2, "Shanghai", Severity::Low, false, "2024-03-01T08:10:00")).await;

        let pending = tokio::spawn({
            let store = store.clone();
            async move { store.resolve_alerts_in_batch(&[1, 2]).await }
        });
        source.started.notified().await;
        assert!(store.remove_alert(2).await);
        source.release.notify_one();

        assert!(pending.await.unwrap().is_err());

        let state = store.read().await;
        assert_eq!(state.alerts.len(), 1);
        assert!(!state.alerts[0].is_resolved);
        assert!(state.alerts[0].resolved_at.is_none());
    }
}

