use std::sync::Arc;

use chrono::NaiveDate;

use crate::error::AppError;
use crate::services::backend::{ApiClient, QueryParams};
use crate::types::{Metrics, RealtimeKpi};

pub const DEFAULT_RECENT_DAYS: u32 = 7;

/// `/api/kpi` endpoints.
#[derive(Debug, Clone)]
pub struct KpiApi {
    client: Arc<ApiClient>,
}

impl KpiApi {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    pub async fn health_check(&self) -> Result<Metrics, AppError> {
        self.client.get(&["api", "kpi", "health"], QueryParams::new()).await
    }

    pub async fn get_today_kpi(&self, city: &str) -> Result<RealtimeKpi, AppError> {
        self.client
            .get(&["api", "kpi", "today", city], QueryParams::new())
            .await
    }

    pub async fn get_kpi_by_date(&self, city: &str, date: NaiveDate) -> Result<Vec<RealtimeKpi>, AppError> {
        self.client
            .get(&["api", "kpi", "date", city], QueryParams::new().push("date", date))
            .await
    }

    /// KPI records for the last `days` days (defaults to 7).
    pub async fn get_recent_kpi(&self, city: &str, days: Option<u32>) -> Result<Vec<RealtimeKpi>, AppError> {
        let days = days.unwrap_or(DEFAULT_RECENT_DAYS);
        self.client
            .get(&["api", "kpi", "recent", city], QueryParams::new().push("days", days))
            .await
    }

    pub async fn get_kpi_count(&self, city: &str) -> Result<u64, AppError> {
        self.client
            .get(&["api", "kpi", "count", city], QueryParams::new())
            .await
    }

    pub async fn cleanup_old_data(&self, cutoff_date: NaiveDate) -> Result<Metrics, AppError> {
        self.client
            .delete(&["api", "kpi", "cleanup"], QueryParams::new().push("cutoffDate", cutoff_date))
            .await
    }
}
