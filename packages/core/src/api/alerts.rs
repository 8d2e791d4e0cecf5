//! `/api/alerts` endpoints.
//!
//! [`AlertsApi`] also implements [`AlertsSource`], the seam the alerts store
//! fetches and resolves through.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::AppError;
use crate::services::backend::{ApiClient, QueryParams};
use crate::types::{Alert, Metrics, Severity};

pub const DEFAULT_RECENT_LIMIT: u32 = 50;
pub const DEFAULT_STATS_GROUP_BY: &str = "type_severity";

/// Parameters for `GET /api/alerts/stats`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlertStatsQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Defaults to `type_severity`.
    pub group_by: Option<String>,
}

impl AlertStatsQuery {
    fn to_params(&self) -> QueryParams {
        QueryParams::new()
            .push_opt("startDate", self.start_date)
            .push_opt("endDate", self.end_date)
            .push(
                "groupBy",
                self.group_by.as_deref().unwrap_or(DEFAULT_STATS_GROUP_BY),
            )
    }
}

/// Operations the alerts store needs from the backend.
#[async_trait]
pub trait AlertsSource {
    async fn today_alerts(&self, city: &str) -> Result<Vec<Alert>, AppError>;

    async fn recent_alerts(&self, limit: u32) -> Result<Vec<Alert>, AppError>;

    async fn alert_stats(&self, query: &AlertStatsQuery) -> Result<Metrics, AppError>;

    async fn resolve_alert(&self, alert_id: i64) -> Result<(), AppError>;

    async fn resolve_alerts(&self, alert_ids: &[i64]) -> Result<(), AppError>;
}

#[derive(Debug, Clone)]
pub struct AlertsApi {
    client: Arc<ApiClient>,
}

impl AlertsApi {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    pub async fn get_alert_by_id(&self, id: i64) -> Result<Alert, AppError> {
        let id = id.to_string();
        self.client
            .get(&["api", "alerts", id.as_str()], QueryParams::new())
            .await
    }

    pub async fn get_today_alerts(&self, city: &str) -> Result<Vec<Alert>, AppError> {
        self.client
            .get(&["api", "alerts", "today", city], QueryParams::new())
            .await
    }

    pub async fn get_unresolved_alerts(&self, city: &str) -> Result<Vec<Alert>, AppError> {
        self.client
            .get(&["api", "alerts", "unresolved", city], QueryParams::new())
            .await
    }

    pub async fn get_high_risk_alerts(&self, city: &str) -> Result<Vec<Alert>, AppError> {
        self.client
            .get(&["api", "alerts", "high-risk", city], QueryParams::new())
            .await
    }

    pub async fn get_alerts_by_severity(&self, severity: Severity) -> Result<Vec<Alert>, AppError> {
        self.client
            .get(&["api", "alerts", "severity", severity.as_str()], QueryParams::new())
            .await
    }

    pub async fn get_alerts_by_type(&self, anomaly_type: &str) -> Result<Vec<Alert>, AppError> {
        self.client
            .get(&["api", "alerts", "type", anomaly_type], QueryParams::new())
            .await
    }

    pub async fn get_alerts_by_range(
        &self,
        city: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<Alert>, AppError> {
        self.client
            .get(
                &["api", "alerts", "range", city],
                QueryParams::new()
                    .push("startDate", start_date)
                    .push("endDate", end_date),
            )
            .await
    }

    pub async fn get_recent_alerts(&self, limit: Option<u32>) -> Result<Vec<Alert>, AppError> {
        let limit = limit.unwrap_or(DEFAULT_RECENT_LIMIT);
        self.client
            .get(&["api", "alerts", "recent"], QueryParams::new().push("limit", limit))
            .await
    }

    pub async fn resolve_alert(&self, alert_id: i64) -> Result<(), AppError> {
        let id = alert_id.to_string();
        self.client
            .put_empty(&["api", "alerts", "resolve", id.as_str()])
            .await
    }

    pub async fn resolve_alerts_in_batch(&self, alert_ids: &[i64]) -> Result<(), AppError> {
        self.client
            .put(&["api", "alerts", "resolve", "batch"], alert_ids)
            .await
    }

    pub async fn get_alerts_stats(&self, query: &AlertStatsQuery) -> Result<Metrics, AppError> {
        self.client
            .get(&["api", "alerts", "stats"], query.to_params())
            .await
    }

    pub async fn get_alerts_trend(
        &self,
        city: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Metrics, AppError> {
        self.client
            .get(
                &["api", "alerts", "trend", city],
                QueryParams::new()
                    .push("startDate", start_date)
                    .push("endDate", end_date),
            )
            .await
    }

    pub async fn get_hourly_distribution(&self, city: &str, date: NaiveDate) -> Result<Metrics, AppError> {
        self.client
            .get(
                &["api", "alerts", "distribution", "hourly", city],
                QueryParams::new().push("date", date),
            )
            .await
    }
}

#[async_trait]
impl AlertsSource for AlertsApi {
    async fn today_alerts(&self, city: &str) -> Result<Vec<Alert>, AppError> {
        self.get_today_alerts(city).await
    }

    async fn recent_alerts(&self, limit: u32) -> Result<Vec<Alert>, AppError> {
        self.get_recent_alerts(Some(limit)).await
    }

    async fn alert_stats(&self, query: &AlertStatsQuery) -> Result<Metrics, AppError> {
        self.get_alerts_stats(query).await
    }

    async fn resolve_alert(&self, alert_id: i64) -> Result<(), AppError> {
        AlertsApi::resolve_alert(self, alert_id).await
    }

    async fn resolve_alerts(&self, alert_ids: &[i64]) -> Result<(), AppError> {
        self.resolve_alerts_in_batch(alert_ids).await
    }
}
