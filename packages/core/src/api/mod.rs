//! Typed wrappers over the analytics backend, one per domain.

use std::sync::Arc;

use crate::services::backend::ApiClient;

pub mod alerts;
pub mod cost;
pub mod kpi;
pub mod operational;
pub mod predictive;
pub mod reports;
pub mod spark_jobs;
pub mod spatial;
pub mod time_efficiency;

pub use alerts::{AlertStatsQuery, AlertsApi, AlertsSource};
pub use cost::CostAnalysisApi;
pub use kpi::KpiApi;
pub use operational::OperationalEfficiencyApi;
pub use predictive::PredictiveApi;
pub use reports::ReportsApi;
pub use spark_jobs::SparkJobsApi;
pub use spatial::SpatialAnalysisApi;
pub use time_efficiency::TimeEfficiencyApi;

/// Every domain client, sharing one [`ApiClient`].
#[derive(Debug, Clone)]
pub struct BackendApis {
    pub kpi: KpiApi,
    pub alerts: AlertsApi,
    pub time_efficiency: TimeEfficiencyApi,
    pub spatial: SpatialAnalysisApi,
    pub predictive: PredictiveApi,
    pub operational: OperationalEfficiencyApi,
    pub cost: CostAnalysisApi,
    pub reports: ReportsApi,
    pub spark: SparkJobsApi,
}

impl BackendApis {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self {
            kpi: KpiApi::new(client.clone()),
            alerts: AlertsApi::new(client.clone()),
            time_efficiency: TimeEfficiencyApi::new(client.clone()),
            spatial: SpatialAnalysisApi::new(client.clone()),
            predictive: PredictiveApi::new(client.clone()),
            operational: OperationalEfficiencyApi::new(client.clone()),
            cost: CostAnalysisApi::new(client.clone()),
            reports: ReportsApi::new(client.clone()),
            spark: SparkJobsApi::new(client),
        }
    }
}
