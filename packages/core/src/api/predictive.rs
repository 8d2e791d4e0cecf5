use std::sync::Arc;

use chrono::NaiveDate;

use crate::error::AppError;
use crate::services::backend::{ApiClient, QueryParams};
use crate::types::Metrics;

pub const DEFAULT_LATEST_LIMIT: u32 = 24;

/// The predictive backend only knows capitalised English city names.
/// Lower-case ids and Chinese labels of the known cities are mapped;
/// anything else passes through unchanged.
pub fn canonical_city(city: &str) -> &str {
    match city {
        "yantai" | "烟台" => "Yantai",
        "shanghai" | "上海" => "Shanghai",
        "hangzhou" | "杭州" => "Hangzhou",
        "jilin" | "吉林" => "Jilin",
        "chongqing" | "重庆" => "Chongqing",
        other => other,
    }
}

/// `/api/predictive-analysis` endpoints.
#[derive(Debug, Clone)]
pub struct PredictiveApi {
    client: Arc<ApiClient>,
}

impl PredictiveApi {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    async fn by_city(
        &self,
        route: &[&str],
        city: &str,
        query: QueryParams,
    ) -> Result<Metrics, AppError> {
        let city = canonical_city(city);
        tracing::debug!("predictive {} for {}", route.join("/"), city);

        let mut segments = vec!["api", "predictive-analysis"];
        segments.extend_from_slice(route);
        segments.push(city);
        self.client.get(&segments, query).await
    }

    /// Demand forecast, served from the trend data.
    pub async fn get_demand_forecast(&self, city: &str) -> Result<Metrics, AppError> {
        self.by_city(&["trends"], city, QueryParams::new()).await
    }

    pub async fn get_capacity_analysis(&self, city: &str) -> Result<Metrics, AppError> {
        self.by_city(&["capacity"], city, QueryParams::new()).await
    }

    /// Latest predictions. With a data type the result is limited
    /// (default 24 rows).
    pub async fn get_latest_prediction(
        &self,
        city: &str,
        data_type: Option<&str>,
        limit: Option<u32>,
    ) -> Result<Metrics, AppError> {
        let city = canonical_city(city);
        match data_type {
            Some(data_type) => {
                self.client
                    .get(
                        &["api", "predictive-analysis", "latest", city, data_type],
                        QueryParams::new().push("limit", limit.unwrap_or(DEFAULT_LATEST_LIMIT)),
                    )
                    .await
            }
            None => {
                self.client
                    .get(&["api", "predictive-analysis", "latest", city], QueryParams::new())
                    .await
            }
        }
    }

    pub async fn get_order_volume_trend(
        &self,
        city: &str,
        start_date: NaiveDate,
        data_type: Option<&str>,
    ) -> Result<Metrics, AppError> {
        self.by_city(
            &["trend", "order-volume"],
            city,
            QueryParams::new()
                .push("startDate", start_date)
                .push_opt("dataType", data_type),
        )
        .await
    }

    pub async fn get_efficiency_trend(&self, city: &str, start_date: NaiveDate) -> Result<Metrics, AppError> {
        self.by_city(
            &["trend", "efficiency"],
            city,
            QueryParams::new().push("startDate", start_date),
        )
        .await
    }

    pub async fn get_hourly_distribution(&self, city: &str, start_date: NaiveDate) -> Result<Metrics, AppError> {
        self.by_city(
            &["distribution", "hourly"],
            city,
            QueryParams::new().push("startDate", start_date),
        )
        .await
    }

    pub async fn get_summary_stats(&self, city: &str, start_date: NaiveDate) -> Result<Metrics, AppError> {
        self.by_city(&["summary"], city, QueryParams::new().push("startDate", start_date))
            .await
    }

    pub async fn get_by_date(&self, city: &str, date: NaiveDate) -> Result<Metrics, AppError> {
        self.by_city(&["date"], city, QueryParams::new().push("date", date))
            .await
    }

    pub async fn get_custom_prediction(
        &self,
        city: &str,
        data_type: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Metrics, AppError> {
        self.by_city(
            &["custom"],
            city,
            QueryParams::new()
                .push("dataType", data_type)
                .push("startDate", start_date)
                .push("endDate", end_date),
        )
        .await
    }

    /// Free-form search. A `city` parameter is canonicalised like every
    /// other city argument.
    pub async fn search(&self, params: QueryParams) -> Result<Metrics, AppError> {
        let params: QueryParams = params
            .pairs()
            .iter()
            .map(|(key, value)| {
                let value = if key == "city" { canonical_city(value) } else { value.as_str() };
                (key.as_str(), value)
            })
            .collect();

        self.client
            .get(&["api", "predictive-analysis", "search"], params)
            .await
    }

    pub async fn get_capacity_stats(&self, city: &str, start_date: NaiveDate) -> Result<Metrics, AppError> {
        self.by_city(
            &["stats", "capacity"],
            city,
            QueryParams::new().push("startDate", start_date),
        )
        .await
    }

    pub async fn get_data_type_stats(&self, city: &str, start_date: NaiveDate) -> Result<Metrics, AppError> {
        self.by_city(
            &["stats", "data-type"],
            city,
            QueryParams::new().push("startDate", start_date),
        )
        .await
    }

    pub async fn get_city_comparison(
        &self,
        cities: &[&str],
        data_type: Option<&str>,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Metrics, AppError> {
        let cities: Vec<&str> = cities.iter().map(|c| canonical_city(c)).collect();
        self.client
            .get(
                &["api", "predictive-analysis", "comparison"],
                QueryParams::new()
                    .push_all("cities", &cities)
                    .push("startDate", start_date)
                    .push("endDate", end_date)
                    .push_opt("dataType", data_type),
            )
            .await
    }

    pub async fn get_count(&self, city: &str, data_type: Option<&str>) -> Result<u64, AppError> {
        self.client
            .get(
                &["api", "predictive-analysis", "count", canonical_city(city)],
                QueryParams::new().push_opt("dataType", data_type),
            )
            .await
    }

    pub async fn cleanup_old_data(&self, cutoff_date: NaiveDate) -> Result<Metrics, AppError> {
        self.client
            .delete(
                &["api", "predictive-analysis", "cleanup"],
                QueryParams::new().push("cutoffDate", cutoff_date),
            )
            .await
    }
}
