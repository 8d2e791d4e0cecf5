use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::AppError;
use crate::services::backend::{ApiClient, QueryParams};
use crate::types::Metrics;

pub const DEFAULT_TREND_DAYS: u32 = 30;
pub const DEFAULT_LIMIT: u32 = 10;

/// `/api/time-efficiency` endpoints.
#[derive(Debug, Clone)]
pub struct TimeEfficiencyApi {
    client: Arc<ApiClient>,
}

impl TimeEfficiencyApi {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    pub async fn get_today(&self, city: &str) -> Result<Metrics, AppError> {
        self.client
            .get(&["api", "time-efficiency", "today", city], QueryParams::new())
            .await
    }

    pub async fn get_by_date(&self, city: &str, date: NaiveDate) -> Result<Metrics, AppError> {
        self.client
            .get(
                &["api", "time-efficiency", "date", city],
                QueryParams::new().push("date", date),
            )
            .await
    }

    pub async fn get_efficiency_trend(&self, city: &str, days: Option<u32>) -> Result<Metrics, AppError> {
        self.client
            .get(
                &["api", "time-efficiency", "trend", city],
                QueryParams::new().push("days", days.unwrap_or(DEFAULT_TREND_DAYS)),
            )
            .await
    }

    pub async fn get_trend_stats(&self, city: &str, start_date: NaiveDate) -> Result<Metrics, AppError> {
        self.client
            .get(
                &["api", "time-efficiency", "trend-stats", city],
                QueryParams::new().push("startDate", start_date),
            )
            .await
    }

    pub async fn get_by_range(
        &self,
        city: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Metrics, AppError> {
        self.client
            .get(
                &["api", "time-efficiency", "range", city],
                QueryParams::new()
                    .push("startDate", start_date)
                    .push("endDate", end_date),
            )
            .await
    }

    pub async fn search(&self, params: QueryParams) -> Result<Metrics, AppError> {
        self.client
            .get(&["api", "time-efficiency", "search"], params)
            .await
    }

    pub async fn get_distribution_stats(&self, city: &str, start_date: NaiveDate) -> Result<Metrics, AppError> {
        self.client
            .get(
                &["api", "time-efficiency", "distribution", city],
                QueryParams::new().push("startDate", start_date),
            )
            .await
    }

    /// Ranking across cities. Cities are sent as repeated `cities=` keys
    /// without array indexes.
    pub async fn get_efficiency_ranking(
        &self,
        cities: &[&str],
        start_date: NaiveDate,
        limit: Option<u32>,
    ) -> Result<Metrics, AppError> {
        self.client
            .get(
                &["api", "time-efficiency", "ranking"],
                QueryParams::new()
                    .push_all("cities", cities)
                    .push("startDate", start_date)
                    .push("limit", limit.unwrap_or(DEFAULT_LIMIT)),
            )
            .await
    }

    pub async fn get_slow_delivery_analysis(
        &self,
        city: &str,
        threshold: f64,
        start_date: NaiveDate,
        limit: Option<u32>,
    ) -> Result<Metrics, AppError> {
        self.client
            .get(
                &["api", "time-efficiency", "slow-delivery", city],
                QueryParams::new()
                    .push("threshold", threshold)
                    .push("startDate", start_date)
                    .push("limit", limit.unwrap_or(DEFAULT_LIMIT)),
            )
            .await
    }

    pub async fn get_fast_delivery_analysis(
        &self,
        city: &str,
        threshold: f64,
        start_date: NaiveDate,
        limit: Option<u32>,
    ) -> Result<Metrics, AppError> {
        self.client
            .get(
                &["api", "time-efficiency", "fast-delivery", city],
                QueryParams::new()
                    .push("threshold", threshold)
                    .push("startDate", start_date)
                    .push("limit", limit.unwrap_or(DEFAULT_LIMIT)),
            )
            .await
    }

    pub async fn get_summary_stats(&self, city: &str, start_date: NaiveDate) -> Result<Metrics, AppError> {
        self.client
            .get(
                &["api", "time-efficiency", "summary", city],
                QueryParams::new().push("startDate", start_date),
            )
            .await
    }

    pub async fn get_latest(&self, city: &str) -> Result<Metrics, AppError> {
        self.client
            .get(&["api", "time-efficiency", "latest", city], QueryParams::new())
            .await
    }

    pub async fn get_city_comparison(
        &self,
        cities: &[&str],
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Metrics, AppError> {
        self.client
            .get(
                &["api", "time-efficiency", "comparison"],
                QueryParams::new()
                    .push_all("cities", cities)
                    .push("startDate", start_date)
                    .push("endDate", end_date),
            )
            .await
    }

    pub async fn get_count(&self, city: &str) -> Result<u64, AppError> {
        self.client
            .get(&["api", "time-efficiency", "count", city], QueryParams::new())
            .await
    }

    pub async fn save<B: Serialize + ?Sized>(&self, data: &B) -> Result<Metrics, AppError> {
        self.client.post(&["api", "time-efficiency"], data).await
    }

    pub async fn update<B: Serialize + ?Sized>(&self, data: &B) -> Result<Metrics, AppError> {
        self.client.put(&["api", "time-efficiency"], data).await
    }

    pub async fn batch_save<B: Serialize>(&self, data: &[B]) -> Result<Metrics, AppError> {
        self.client.post(&["api", "time-efficiency", "batch"], data).await
    }

    pub async fn cleanup_old_data(&self, cutoff_date: NaiveDate) -> Result<Metrics, AppError> {
        self.client
            .delete(
                &["api", "time-efficiency", "cleanup"],
                QueryParams::new().push("cutoffDate", cutoff_date),
            )
            .await
    }
}
