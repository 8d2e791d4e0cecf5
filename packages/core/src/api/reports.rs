use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;

use crate::error::AppError;
use crate::services::backend::{ApiClient, QueryParams};
use crate::types::Metrics;

pub const DEFAULT_DOWNLOAD_FORMAT: &str = "pdf";
pub const DEFAULT_PAGE_SIZE: u32 = 20;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    report_type: &'a str,
    parameters: &'a Value,
}

/// `/api/reports` endpoints.
#[derive(Debug, Clone)]
pub struct ReportsApi {
    client: Arc<ApiClient>,
}

impl ReportsApi {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    pub async fn get_daily(&self, city: &str, date: NaiveDate) -> Result<Metrics, AppError> {
        self.client
            .get(&["api", "reports", "daily", city], QueryParams::new().push("date", date))
            .await
    }

    pub async fn get_weekly(&self, city: &str, week_start: NaiveDate) -> Result<Metrics, AppError> {
        self.client
            .get(
                &["api", "reports", "weekly", city],
                QueryParams::new().push("weekStart", week_start),
            )
            .await
    }

    pub async fn get_monthly(&self, city: &str, year: i32, month: u32) -> Result<Metrics, AppError> {
        self.client
            .get(
                &["api", "reports", "monthly", city],
                QueryParams::new().push("year", year).push("month", month),
            )
            .await
    }

    pub async fn get_yearly(&self, city: &str, year: i32) -> Result<Metrics, AppError> {
        self.client
            .get(&["api", "reports", "yearly", city], QueryParams::new().push("year", year))
            .await
    }

    pub async fn get_custom<B: Serialize + ?Sized>(&self, config: &B) -> Result<Metrics, AppError> {
        self.client.post(&["api", "reports", "custom"], config).await
    }

    pub async fn generate(&self, report_type: &str, parameters: &Value) -> Result<Metrics, AppError> {
        let body = GenerateRequest {
            report_type,
            parameters,
        };
        self.client.post(&["api", "reports", "generate"], &body).await
    }

    /// Raw report file. The body is returned as-is, not unwrapped from the
    /// response envelope.
    pub async fn download(&self, report_id: &str, format: Option<&str>) -> Result<Vec<u8>, AppError> {
        self.client
            .get_bytes(
                &["api", "reports", report_id, "download"],
                QueryParams::new().push("format", format.unwrap_or(DEFAULT_DOWNLOAD_FORMAT)),
            )
            .await
    }

    pub async fn list(&self, page: Option<u32>, page_size: Option<u32>) -> Result<Metrics, AppError> {
        self.client
            .get(
                &["api", "reports", "list"],
                QueryParams::new()
                    .push("page", page.unwrap_or(1))
                    .push("pageSize", page_size.unwrap_or(DEFAULT_PAGE_SIZE)),
            )
            .await
    }

    pub async fn delete(&self, report_id: &str) -> Result<Metrics, AppError> {
        self.client
            .delete(&["api", "reports", report_id], QueryParams::new())
            .await
    }

    pub async fn get_templates(&self) -> Result<Metrics, AppError> {
        self.client
            .get(&["api", "reports", "templates"], QueryParams::new())
            .await
    }

    pub async fn create_template<B: Serialize + ?Sized>(&self, template: &B) -> Result<Metrics, AppError> {
        self.client.post(&["api", "reports", "templates"], template).await
    }

    pub async fn get_kpi_summary(
        &self,
        city: &str,
        (start_date, end_date): (NaiveDate, NaiveDate),
    ) -> Result<Metrics, AppError> {
        self.client
            .get(
                &["api", "reports", "kpi-summary", city],
                QueryParams::new()
                    .push("startDate", start_date)
                    .push("endDate", end_date),
            )
            .await
    }

    pub async fn get_anomaly(
        &self,
        city: &str,
        (start_date, end_date): (NaiveDate, NaiveDate),
    ) -> Result<Metrics, AppError> {
        self.client
            .get(
                &["api", "reports", "anomaly", city],
                QueryParams::new()
                    .push("startDate", start_date)
                    .push("endDate", end_date),
            )
            .await
    }
}
