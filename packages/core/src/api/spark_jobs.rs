use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::AppError;
use crate::services::backend::{ApiClient, QueryParams};
use crate::types::{Metrics, SparkJob};

pub const DEFAULT_COMPLETED_LIMIT: u32 = 50;
pub const DEFAULT_FAILED_LIMIT: u32 = 20;
pub const DEFAULT_LOG_TYPE: &str = "stdout";

/// `/api/spark` endpoints. Job status transitions happen server-side; the
/// client only reads them and issues submit/stop/restart commands.
#[derive(Debug, Clone)]
pub struct SparkJobsApi {
    client: Arc<ApiClient>,
}

impl SparkJobsApi {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    pub async fn get_all_jobs(&self) -> Result<Vec<SparkJob>, AppError> {
        self.client.get(&["api", "spark", "jobs"], QueryParams::new()).await
    }

    pub async fn get_job_by_id(&self, job_id: &str) -> Result<SparkJob, AppError> {
        self.client
            .get(&["api", "spark", "jobs", job_id], QueryParams::new())
            .await
    }

    pub async fn get_running_jobs(&self) -> Result<Vec<SparkJob>, AppError> {
        self.client
            .get(&["api", "spark", "jobs", "running"], QueryParams::new())
            .await
    }

    pub async fn get_completed_jobs(&self, limit: Option<u32>) -> Result<Vec<SparkJob>, AppError> {
        self.client
            .get(
                &["api", "spark", "jobs", "completed"],
                QueryParams::new().push("limit", limit.unwrap_or(DEFAULT_COMPLETED_LIMIT)),
            )
            .await
    }

    pub async fn get_failed_jobs(&self, limit: Option<u32>) -> Result<Vec<SparkJob>, AppError> {
        self.client
            .get(
                &["api", "spark", "jobs", "failed"],
                QueryParams::new().push("limit", limit.unwrap_or(DEFAULT_FAILED_LIMIT)),
            )
            .await
    }

    pub async fn submit_job<C: Serialize + ?Sized>(&self, job_config: &C) -> Result<SparkJob, AppError> {
        self.client
            .post(&["api", "spark", "jobs", "submit"], job_config)
            .await
    }

    pub async fn stop_job(&self, job_id: &str) -> Result<Metrics, AppError> {
        self.client
            .post_empty(&["api", "spark", "jobs", job_id, "stop"])
            .await
    }

    pub async fn restart_job(&self, job_id: &str) -> Result<Metrics, AppError> {
        self.client
            .post_empty(&["api", "spark", "jobs", job_id, "restart"])
            .await
    }

    /// Job logs; `log_type` defaults to `stdout`.
    pub async fn get_job_logs(&self, job_id: &str, log_type: Option<&str>) -> Result<Metrics, AppError> {
        self.client
            .get(
                &["api", "spark", "jobs", job_id, "logs"],
                QueryParams::new().push("logType", log_type.unwrap_or(DEFAULT_LOG_TYPE)),
            )
            .await
    }

    pub async fn get_job_stats(&self, start_date: NaiveDate, end_date: NaiveDate) -> Result<Metrics, AppError> {
        self.client
            .get(
                &["api", "spark", "jobs", "stats"],
                QueryParams::new()
                    .push("startDate", start_date)
                    .push("endDate", end_date),
            )
            .await
    }

    pub async fn get_cluster_resources(&self) -> Result<Metrics, AppError> {
        self.client
            .get(&["api", "spark", "cluster", "resources"], QueryParams::new())
            .await
    }

    pub async fn get_job_metrics(&self, job_id: &str) -> Result<Metrics, AppError> {
        self.client
            .get(&["api", "spark", "jobs", job_id, "metrics"], QueryParams::new())
            .await
    }
}
