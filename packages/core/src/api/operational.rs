use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::AppError;
use crate::services::backend::{ApiClient, QueryParams};
use crate::types::Metrics;

pub const DEFAULT_RANKING_LIMIT: u32 = 10;

/// `/api/operational-efficiency` endpoints.
#[derive(Debug, Clone)]
pub struct OperationalEfficiencyApi {
    client: Arc<ApiClient>,
}

fn range(start_date: NaiveDate, end_date: NaiveDate) -> QueryParams {
    QueryParams::new()
        .push("startDate", start_date)
        .push("endDate", end_date)
}

fn since(start_date: NaiveDate) -> QueryParams {
    QueryParams::new().push("startDate", start_date)
}

impl OperationalEfficiencyApi {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    pub async fn get_today(&self, city: &str) -> Result<Metrics, AppError> {
        self.client
            .get(&["api", "operational-efficiency", "today", city], QueryParams::new())
            .await
    }

    pub async fn get_by_date(&self, city: &str, date: NaiveDate) -> Result<Metrics, AppError> {
        self.client
            .get(
                &["api", "operational-efficiency", "date", city],
                QueryParams::new().push("date", date),
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
                &["api", "operational-efficiency", "range", city],
                range(start_date, end_date),
            )
            .await
    }

    pub async fn get_courier_efficiency(
        &self,
        courier_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Metrics, AppError> {
        self.client
            .get(
                &["api", "operational-efficiency", "courier", courier_id],
                range(start_date, end_date),
            )
            .await
    }

    pub async fn get_region_efficiency(
        &self,
        region_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Metrics, AppError> {
        self.client
            .get(
                &["api", "operational-efficiency", "region", region_id],
                range(start_date, end_date),
            )
            .await
    }

    pub async fn search(&self, params: QueryParams) -> Result<Metrics, AppError> {
        self.client
            .get(&["api", "operational-efficiency", "search"], params)
            .await
    }

    pub async fn get_efficiency_trend(&self, city: &str, start_date: NaiveDate) -> Result<Metrics, AppError> {
        self.client
            .get(&["api", "operational-efficiency", "trend", city], since(start_date))
            .await
    }

    pub async fn get_courier_ranking(
        &self,
        city: &str,
        start_date: NaiveDate,
        limit: Option<u32>,
    ) -> Result<Metrics, AppError> {
        self.client
            .get(
                &["api", "operational-efficiency", "ranking", "courier"],
                QueryParams::new()
                    .push("city", city)
                    .push("startDate", start_date)
                    .push("limit", limit.unwrap_or(DEFAULT_RANKING_LIMIT)),
            )
            .await
    }

    pub async fn get_region_ranking(
        &self,
        city: &str,
        start_date: NaiveDate,
        limit: Option<u32>,
    ) -> Result<Metrics, AppError> {
        self.client
            .get(
                &["api", "operational-efficiency", "ranking", "region"],
                QueryParams::new()
                    .push("city", city)
                    .push("startDate", start_date)
                    .push("limit", limit.unwrap_or(DEFAULT_RANKING_LIMIT)),
            )
            .await
    }

    pub async fn get_distribution_stats(&self, city: &str, start_date: NaiveDate) -> Result<Metrics, AppError> {
        self.client
            .get(
                &["api", "operational-efficiency", "distribution", city],
                since(start_date),
            )
            .await
    }

    pub async fn get_low_efficiency_alerts(
        &self,
        threshold: f64,
        start_date: NaiveDate,
        limit: Option<u32>,
    ) -> Result<Metrics, AppError> {
        self.client
            .get(
                &["api", "operational-efficiency", "alerts", "low-efficiency"],
                QueryParams::new()
                    .push("threshold", threshold)
                    .push("startDate", start_date)
                    .push("limit", limit.unwrap_or(DEFAULT_RANKING_LIMIT)),
            )
            .await
    }

    pub async fn get_high_efficiency_performance(
        &self,
        threshold: f64,
        start_date: NaiveDate,
        limit: Option<u32>,
    ) -> Result<Metrics, AppError> {
        self.client
            .get(
                &["api", "operational-efficiency", "performance", "high-efficiency"],
                QueryParams::new()
                    .push("threshold", threshold)
                    .push("startDate", start_date)
                    .push("limit", limit.unwrap_or(DEFAULT_RANKING_LIMIT)),
            )
            .await
    }

    pub async fn get_summary_stats(&self, city: &str, start_date: NaiveDate) -> Result<Metrics, AppError> {
        self.client
            .get(&["api", "operational-efficiency", "summary", city], since(start_date))
            .await
    }

    pub async fn get_latest(&self, city: &str) -> Result<Metrics, AppError> {
        self.client
            .get(&["api", "operational-efficiency", "latest", city], QueryParams::new())
            .await
    }

    pub async fn get_latest_courier(&self, courier_id: &str) -> Result<Metrics, AppError> {
        self.client
            .get(
                &["api", "operational-efficiency", "latest", "courier", courier_id],
                QueryParams::new(),
            )
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
                &["api", "operational-efficiency", "comparison"],
                QueryParams::new()
                    .push_all("cities", cities)
                    .push("startDate", start_date)
                    .push("endDate", end_date),
            )
            .await
    }

    pub async fn get_count(&self, city: &str) -> Result<u64, AppError> {
        self.client
            .get(&["api", "operational-efficiency", "count", city], QueryParams::new())
            .await
    }

    pub async fn get_courier_count(&self, courier_id: &str) -> Result<u64, AppError> {
        self.client
            .get(
                &["api", "operational-efficiency", "count", "courier", courier_id],
                QueryParams::new(),
            )
            .await
    }

    pub async fn save<B: Serialize + ?Sized>(&self, data: &B) -> Result<Metrics, AppError> {
        self.client.post(&["api", "operational-efficiency"], data).await
    }

    pub async fn update<B: Serialize + ?Sized>(&self, data: &B) -> Result<Metrics, AppError> {
        self.client.put(&["api", "operational-efficiency"], data).await
    }

    pub async fn batch_save<B: Serialize>(&self, data: &[B]) -> Result<Metrics, AppError> {
        self.client
            .post(&["api", "operational-efficiency", "batch"], data)
            .await
    }

    pub async fn cleanup_old_data(&self, cutoff_date: NaiveDate) -> Result<Metrics, AppError> {
        self.client
            .delete(
                &["api", "operational-efficiency", "cleanup"],
                QueryParams::new().push("cutoffDate", cutoff_date),
            )
            .await
    }
}
