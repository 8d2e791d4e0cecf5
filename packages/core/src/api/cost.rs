use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::AppError;
use crate::services::backend::{ApiClient, QueryParams};
use crate::types::Metrics;

pub const DEFAULT_RANKING_LIMIT: u32 = 10;
pub const DASHBOARD_HIGH_COST_THRESHOLD: f64 = 1000.0;
pub const REPORT_HIGH_COST_THRESHOLD: f64 = 800.0;

/// Common `analysisType` values.
pub mod analysis_types {
    pub const DAILY: &str = "daily";
    pub const WEEKLY: &str = "weekly";
    pub const MONTHLY: &str = "monthly";
    pub const QUARTERLY: &str = "quarterly";
}

#[derive(Debug, Clone, Serialize)]
pub struct CostOverview {
    pub analysis: Metrics,
    pub trend: Metrics,
    pub summary: Metrics,
    pub ranking: Metrics,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostDashboardData {
    pub cost_data: Metrics,
    pub trend_data: Metrics,
    pub summary_data: Metrics,
    pub ranking_data: Metrics,
    pub alerts_data: Metrics,
    pub stats_data: Metrics,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostReportData {
    pub search_results: Metrics,
    pub summary: Metrics,
    pub trend: Metrics,
    pub ranking: Metrics,
    pub alerts: Metrics,
}

/// `/api/cost-analysis` endpoints, plus composite views that fan out
/// several calls concurrently and fail as soon as one of them fails.
#[derive(Debug, Clone)]
pub struct CostAnalysisApi {
    client: Arc<ApiClient>,
}

impl CostAnalysisApi {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    pub async fn get_by_city(
        &self,
        city: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Metrics, AppError> {
        self.client
            .get(
                &["api", "cost-analysis", "city", city],
                QueryParams::new()
                    .push("startDate", start_date)
                    .push("endDate", end_date),
            )
            .await
    }

    pub async fn get_by_region(
        &self,
        region_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Metrics, AppError> {
        self.client
            .get(
                &["api", "cost-analysis", "region", region_id],
                QueryParams::new()
                    .push("startDate", start_date)
                    .push("endDate", end_date),
            )
            .await
    }

    pub async fn search(&self, params: QueryParams) -> Result<Metrics, AppError> {
        self.client.get(&["api", "cost-analysis", "search"], params).await
    }

    pub async fn get_cost_trend(&self, city: &str, start_date: NaiveDate) -> Result<Metrics, AppError> {
        self.client
            .get(
                &["api", "cost-analysis", "trend", "city", city],
                QueryParams::new().push("startDate", start_date),
            )
            .await
    }

    pub async fn get_region_cost_ranking(
        &self,
        city: &str,
        start_date: NaiveDate,
        limit: Option<u32>,
    ) -> Result<Metrics, AppError> {
        self.client
            .get(
                &["api", "cost-analysis", "ranking", "region"],
                QueryParams::new()
                    .push("city", city)
                    .push("startDate", start_date)
                    .push("limit", limit.unwrap_or(DEFAULT_RANKING_LIMIT)),
            )
            .await
    }

    pub async fn get_analysis_type_stats(&self, city: &str, start_date: NaiveDate) -> Result<Metrics, AppError> {
        self.client
            .get(
                &["api", "cost-analysis", "stats", "analysis-type"],
                QueryParams::new()
                    .push("city", city)
                    .push("startDate", start_date),
            )
            .await
    }

    pub async fn get_high_cost_alerts(
        &self,
        threshold: f64,
        date: NaiveDate,
        limit: Option<u32>,
    ) -> Result<Metrics, AppError> {
        self.client
            .get(
                &["api", "cost-analysis", "alerts", "high-cost"],
                QueryParams::new()
                    .push("threshold", threshold)
                    .push("date", date)
                    .push("limit", limit.unwrap_or(DEFAULT_RANKING_LIMIT)),
            )
            .await
    }

    pub async fn get_cost_summary(&self, city: &str, start_date: NaiveDate) -> Result<Metrics, AppError> {
        self.client
            .get(
                &["api", "cost-analysis", "summary", city],
                QueryParams::new().push("startDate", start_date),
            )
            .await
    }

    pub async fn get_count(&self, city: &str) -> Result<u64, AppError> {
        self.client
            .get(&["api", "cost-analysis", "count", city], QueryParams::new())
            .await
    }

    pub async fn save<B: Serialize + ?Sized>(&self, data: &B) -> Result<Metrics, AppError> {
        self.client.post(&["api", "cost-analysis"], data).await
    }

    pub async fn update<B: Serialize + ?Sized>(&self, data: &B) -> Result<Metrics, AppError> {
        self.client.put(&["api", "cost-analysis"], data).await
    }

    pub async fn batch_save<B: Serialize>(&self, data: &[B]) -> Result<Metrics, AppError> {
        self.client.post(&["api", "cost-analysis", "batch"], data).await
    }

    pub async fn cleanup_old_data(&self, cutoff_date: NaiveDate) -> Result<Metrics, AppError> {
        self.client
            .delete(
                &["api", "cost-analysis", "cleanup"],
                QueryParams::new().push("cutoffDate", cutoff_date),
            )
            .await
    }

    pub async fn get_overview(
        &self,
        city: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<CostOverview, AppError> {
        let (analysis, trend, summary, ranking) = tokio::try_join!(
            self.get_by_city(city, start_date, end_date),
            self.get_cost_trend(city, start_date),
            self.get_cost_summary(city, start_date),
            self.get_region_cost_ranking(city, start_date, Some(DEFAULT_RANKING_LIMIT)),
        )
        .map_err(|err| {
            tracing::error!("cost overview for {} failed: {}", city, err);
            err
        })?;

        Ok(CostOverview {
            analysis,
            trend,
            summary,
            ranking,
        })
    }

    pub async fn get_dashboard_data(
        &self,
        city: &str,
        (start_date, end_date): (NaiveDate, NaiveDate),
    ) -> Result<CostDashboardData, AppError> {
        let (cost_data, trend_data, summary_data, ranking_data, alerts_data, stats_data) = tokio::try_join!(
            self.get_by_city(city, start_date, end_date),
            self.get_cost_trend(city, start_date),
            self.get_cost_summary(city, start_date),
            self.get_region_cost_ranking(city, start_date, Some(DEFAULT_RANKING_LIMIT)),
            self.get_high_cost_alerts(DASHBOARD_HIGH_COST_THRESHOLD, end_date, Some(5)),
            self.get_analysis_type_stats(city, start_date),
        )
        .map_err(|err| {
            tracing::error!("cost dashboard data for {} failed: {}", city, err);
            err
        })?;

        Ok(CostDashboardData {
            cost_data,
            trend_data,
            summary_data,
            ranking_data,
            alerts_data,
            stats_data,
        })
    }

    pub async fn get_report_data(
        &self,
        city: &str,
        (start_date, end_date): (NaiveDate, NaiveDate),
        analysis_type: Option<&str>,
    ) -> Result<CostReportData, AppError> {
        let search = QueryParams::new()
            .push("city", city)
            .push("startDate", start_date)
            .push("endDate", end_date)
            .push_opt("analysisType", analysis_type);

        let (search_results, summary, trend, ranking, alerts) = tokio::try_join!(
            self.search(search),
            self.get_cost_summary(city, start_date),
            self.get_cost_trend(city, start_date),
            self.get_region_cost_ranking(city, start_date, Some(20)),
            self.get_high_cost_alerts(REPORT_HIGH_COST_THRESHOLD, end_date, Some(10)),
        )
        .map_err(|err| {
            tracing::error!("cost report data for {} failed: {}", city, err);
            err
        })?;

        Ok(CostReportData {
            search_results,
            summary,
            trend,
            ranking,
            alerts,
        })
    }
}
