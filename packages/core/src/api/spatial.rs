use std::sync::Arc;

use chrono::{Local, NaiveDate};

use crate::error::AppError;
use crate::services::backend::{ApiClient, QueryParams};
use crate::types::{GeoBounds, Metrics};

pub const DEFAULT_HOTSPOT_LIMIT: u32 = 20;
pub const DEFAULT_DENSITY_LIMIT: u32 = 50;
pub const DEFAULT_COURIER_LIMIT: u32 = 30;
pub const DEFAULT_GRID_SIZE: f64 = 0.01;

/// `/api/spatial-analysis` endpoints.
#[derive(Debug, Clone)]
pub struct SpatialAnalysisApi {
    client: Arc<ApiClient>,
}

impl SpatialAnalysisApi {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    pub async fn get_today(&self, city: &str) -> Result<Metrics, AppError> {
        self.client
            .get(&["api", "spatial-analysis", "today", city], QueryParams::new())
            .await
    }

    pub async fn get_by_date(&self, city: &str, date: NaiveDate) -> Result<Metrics, AppError> {
        self.client
            .get(
                &["api", "spatial-analysis", "date", city],
                QueryParams::new().push("date", date),
            )
            .await
    }

    pub async fn get_hotspots(
        &self,
        city: &str,
        date: Option<NaiveDate>,
        limit: Option<u32>,
    ) -> Result<Metrics, AppError> {
        self.client
            .get(
                &["api", "spatial-analysis", "hotspots", city],
                QueryParams::new()
                    .push("limit", limit.unwrap_or(DEFAULT_HOTSPOT_LIMIT))
                    .push_opt("date", date),
            )
            .await
    }

    /// Density analysis, used as heatmap input.
    pub async fn get_heatmap_data(&self, city: &str, date: Option<NaiveDate>) -> Result<Metrics, AppError> {
        self.client
            .get(
                &["api", "spatial-analysis", "density", city],
                QueryParams::new().push_opt("date", date),
            )
            .await
    }

    pub async fn get_delivery_density_heatmap(
        &self,
        city: &str,
        start_date: NaiveDate,
        limit: Option<u32>,
    ) -> Result<Metrics, AppError> {
        self.client
            .get(
                &["api", "spatial-analysis", "heatmap", "density", city],
                QueryParams::new()
                    .push("startDate", start_date)
                    .push("limit", limit.unwrap_or(DEFAULT_DENSITY_LIMIT)),
            )
            .await
    }

    pub async fn get_delivery_time_heatmap(&self, city: &str, start_date: NaiveDate) -> Result<Metrics, AppError> {
        self.client
            .get(
                &["api", "spatial-analysis", "heatmap", "delivery-time", city],
                QueryParams::new().push("startDate", start_date),
            )
            .await
    }

    /// Regional distribution statistics; `start_date` defaults to today.
    pub async fn get_regional_stats(&self, city: &str, start_date: Option<NaiveDate>) -> Result<Metrics, AppError> {
        let start_date = start_date.unwrap_or_else(|| Local::now().date_naive());
        self.client
            .get(
                &["api", "spatial-analysis", "stats", "distribution", city],
                QueryParams::new().push("startDate", start_date),
            )
            .await
    }

    pub async fn get_grid_aggregation(
        &self,
        city: &str,
        date: NaiveDate,
        grid_size: Option<f64>,
    ) -> Result<Metrics, AppError> {
        self.client
            .get(
                &["api", "spatial-analysis", "grid-aggregation", city],
                QueryParams::new()
                    .push("date", date)
                    .push("gridSize", grid_size.unwrap_or(DEFAULT_GRID_SIZE)),
            )
            .await
    }

    pub async fn get_summary(&self, city: &str, start_date: NaiveDate) -> Result<Metrics, AppError> {
        self.client
            .get(
                &["api", "spatial-analysis", "summary", city],
                QueryParams::new().push("startDate", start_date),
            )
            .await
    }

    pub async fn get_courier_distribution(
        &self,
        city: &str,
        start_date: NaiveDate,
        limit: Option<u32>,
    ) -> Result<Metrics, AppError> {
        self.client
            .get(
                &["api", "spatial-analysis", "courier-distribution", city],
                QueryParams::new()
                    .push("startDate", start_date)
                    .push("limit", limit.unwrap_or(DEFAULT_COURIER_LIMIT)),
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
                &["api", "spatial-analysis", "range", city],
                QueryParams::new()
                    .push("startDate", start_date)
                    .push("endDate", end_date),
            )
            .await
    }

    pub async fn get_by_geo_range(
        &self,
        city: &str,
        bounds: GeoBounds,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Metrics, AppError> {
        self.client
            .get(
                &["api", "spatial-analysis", "geo-range", city],
                QueryParams::new()
                    .push("minLng", bounds.min_lng)
                    .push("maxLng", bounds.max_lng)
                    .push("minLat", bounds.min_lat)
                    .push("maxLat", bounds.max_lat)
                    .push("startDate", start_date)
                    .push("endDate", end_date),
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
                &["api", "spatial-analysis", "comparison"],
                QueryParams::new()
                    .push_all("cities", cities)
                    .push("startDate", start_date)
                    .push("endDate", end_date),
            )
            .await
    }

    pub async fn get_count(&self, city: &str) -> Result<u64, AppError> {
        self.client
            .get(&["api", "spatial-analysis", "count", city], QueryParams::new())
            .await
    }

    // Older names still used by some views.

    pub async fn get_regional_statistics(&self, city: &str) -> Result<Metrics, AppError> {
        self.get_regional_stats(city, None).await
    }

    pub async fn get_delivery_density(&self, city: &str, date: Option<NaiveDate>) -> Result<Metrics, AppError> {
        self.get_heatmap_data(city, date).await
    }

    /// Clustering is served from the hotspot analysis.
    pub async fn get_cluster_analysis(&self, city: &str, date: Option<NaiveDate>) -> Result<Metrics, AppError> {
        self.get_hotspots(city, date, Some(DEFAULT_HOTSPOT_LIMIT)).await
    }
}
