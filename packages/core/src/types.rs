//! Domain records returned by the backend and the label tables used to
//! present their enumerated fields.
//!
//! Backend date-times carry no zone, so they are modelled as
//! `NaiveDateTime`. Aggregate payloads the client never inspects stay as
//! [`Metrics`] and are passed through untouched.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Opaque pre-aggregated analytics payload.
pub type Metrics = Value;

/// Colour used for anything without a dedicated entry.
pub const NEUTRAL_COLOR: &str = "#909399";

/// Display metadata attached to an enumerated tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusLabel {
    pub label: &'static str,
    pub color: &'static str,
}

/// Label lookup for a raw tag that may not match any known variant.
///
/// Unknown tags echo back as their own label with the neutral colour; an
/// empty tag renders as `--`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLabel {
    pub label: String,
    pub color: &'static str,
}

impl From<StatusLabel> for ResolvedLabel {
    fn from(value: StatusLabel) -> Self {
        Self {
            label: value.label.to_string(),
            color: value.color,
        }
    }
}

fn fallback_label(tag: &str) -> ResolvedLabel {
    ResolvedLabel {
        label: if tag.is_empty() { "--".to_string() } else { tag.to_string() },
        color: NEUTRAL_COLOR,
    }
}

// ---- Severity ----

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    High,
    Medium,
    Low,
    #[serde(other)]
    Unknown,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::High => "HIGH",
            Severity::Medium => "MEDIUM",
            Severity::Low => "LOW",
            Severity::Unknown => "UNKNOWN",
        }
    }

    pub fn status_label(&self) -> StatusLabel {
        match self {
            Severity::High => StatusLabel { label: "High", color: "#F56C6C" },
            Severity::Medium => StatusLabel { label: "Medium", color: "#E6A23C" },
            Severity::Low => StatusLabel { label: "Low", color: "#67C23A" },
            Severity::Unknown => StatusLabel { label: "--", color: NEUTRAL_COLOR },
        }
    }

    /// Higher is more urgent.
    pub fn priority(&self) -> u8 {
        match self {
            Severity::High => 3,
            Severity::Medium => 2,
            Severity::Low => 1,
            Severity::Unknown => 0,
        }
    }

    pub fn lookup(tag: &str) -> ResolvedLabel {
        match tag.parse::<Severity>() {
            Ok(severity) if severity != Severity::Unknown => severity.status_label().into(),
            _ => fallback_label(tag),
        }
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "HIGH" => Ok(Severity::High),
            "MEDIUM" => Ok(Severity::Medium),
            "LOW" => Ok(Severity::Low),
            other => Err(format!("Invalid severity '{}'. Must be one of: HIGH, MEDIUM, LOW", other)),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---- Alert status ----

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertStatus {
    Unresolved,
    Resolved,
    InProgress,
    Ignored,
}

impl AlertStatus {
    pub fn status_label(&self) -> StatusLabel {
        match self {
            AlertStatus::Unresolved => StatusLabel { label: "Unresolved", color: "#F56C6C" },
            AlertStatus::Resolved => StatusLabel { label: "Resolved", color: "#67C23A" },
            AlertStatus::InProgress => StatusLabel { label: "In progress", color: "#E6A23C" },
            AlertStatus::Ignored => StatusLabel { label: "Ignored", color: NEUTRAL_COLOR },
        }
    }

    pub fn lookup(tag: &str) -> ResolvedLabel {
        let status = match tag {
            "UNRESOLVED" => AlertStatus::Unresolved,
            "RESOLVED" => AlertStatus::Resolved,
            "IN_PROGRESS" => AlertStatus::InProgress,
            "IGNORED" => AlertStatus::Ignored,
            _ => return fallback_label(tag),
        };
        status.status_label().into()
    }
}

// ---- Spark job status ----

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobStatus {
    Running,
    Succeeded,
    Failed,
    Pending,
    Cancelled,
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    pub fn status_label(&self) -> StatusLabel {
        match self {
            JobStatus::Running => StatusLabel { label: "Running", color: "#409EFF" },
            JobStatus::Succeeded => StatusLabel { label: "Succeeded", color: "#67C23A" },
            JobStatus::Failed => StatusLabel { label: "Failed", color: "#F56C6C" },
            JobStatus::Pending => StatusLabel { label: "Pending", color: "#E6A23C" },
            JobStatus::Cancelled => StatusLabel { label: "Cancelled", color: NEUTRAL_COLOR },
            JobStatus::Unknown => StatusLabel { label: "--", color: NEUTRAL_COLOR },
        }
    }

    /// `true` once the backend will no longer change the status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed | JobStatus::Cancelled)
    }

    pub fn lookup(tag: &str) -> ResolvedLabel {
        match serde_json::from_value::<JobStatus>(Value::String(tag.to_string())) {
            Ok(JobStatus::Unknown) | Err(_) => fallback_label(tag),
            Ok(status) => status.status_label().into(),
        }
    }
}

// ---- Shipment status ----

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShipmentStatus {
    Pending,
    PickedUp,
    InTransit,
    OutForDelivery,
    Delivered,
    Failed,
    Returned,
}

impl ShipmentStatus {
    pub fn status_label(&self) -> StatusLabel {
        match self {
            ShipmentStatus::Pending => StatusLabel { label: "Pending", color: "#E6A23C" },
            ShipmentStatus::PickedUp => StatusLabel { label: "Picked up", color: "#409EFF" },
            ShipmentStatus::InTransit => StatusLabel { label: "In transit", color: "#409EFF" },
            ShipmentStatus::OutForDelivery => StatusLabel { label: "Out for delivery", color: "#409EFF" },
            ShipmentStatus::Delivered => StatusLabel { label: "Delivered", color: "#67C23A" },
            ShipmentStatus::Failed => StatusLabel { label: "Delivery failed", color: "#F56C6C" },
            ShipmentStatus::Returned => StatusLabel { label: "Returned", color: NEUTRAL_COLOR },
        }
    }

    pub fn lookup(tag: &str) -> ResolvedLabel {
        match serde_json::from_value::<ShipmentStatus>(Value::String(tag.to_string())) {
            Ok(status) => status.status_label().into(),
            Err(_) => fallback_label(tag),
        }
    }
}

// ---- Cities ----

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct City {
    pub label: &'static str,
    pub value: &'static str,
    pub code: &'static str,
}

pub const CITIES: [City; 5] = [
    City { label: "烟台", value: "yantai", code: "370600" },
    City { label: "上海", value: "shanghai", code: "310000" },
    City { label: "杭州", value: "hangzhou", code: "330100" },
    City { label: "吉林", value: "jilin", code: "220200" },
    City { label: "重庆", value: "chongqing", code: "500000" },
];

/// Find a catalogue city by its value or its display label.
pub fn find_city(name: &str) -> Option<&'static City> {
    let lowered = name.to_lowercase();
    CITIES
        .iter()
        .find(|city| city.value == lowered || city.label == name)
}

// ---- Records ----

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: i64,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub anomaly_type: String,
    #[serde(default = "unknown_severity")]
    pub anomaly_severity: Severity,
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub courier_id: Option<String>,
    #[serde(default)]
    pub anomaly_value: Option<f64>,
    #[serde(default)]
    pub threshold_value: Option<f64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub original_time: Option<String>,
    #[serde(default)]
    pub analysis_date: Option<NaiveDate>,
    #[serde(default)]
    pub analysis_hour: Option<u8>,
    #[serde(default)]
    pub is_resolved: bool,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub resolved_at: Option<NaiveDateTime>,
}

fn unknown_severity() -> Severity {
    Severity::Unknown
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeKpi {
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub hour: Option<u8>,
    #[serde(default)]
    pub total_orders: Option<i64>,
    #[serde(default)]
    pub active_couriers: Option<i64>,
    #[serde(default)]
    pub avg_delivery_time: Option<f64>,
    #[serde(default)]
    pub efficiency_score: Option<f64>,
    #[serde(default)]
    pub fast_delivery_rate: Option<f64>,
    /// Aggregates the client does not model explicitly.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One point of the KPI trend view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiTrendPoint {
    pub date: Option<NaiveDate>,
    pub orders: Option<i64>,
    pub couriers: Option<i64>,
    pub avg_delivery_time: Option<f64>,
}

impl From<&RealtimeKpi> for KpiTrendPoint {
    fn from(kpi: &RealtimeKpi) -> Self {
        Self {
            date: kpi.date,
            orders: kpi.total_orders,
            couriers: kpi.active_couriers,
            avg_delivery_time: kpi.avg_delivery_time,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SparkJob {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub job_name: Option<String>,
    #[serde(default = "unknown_job_status")]
    pub status: JobStatus,
    #[serde(default)]
    pub start_time: Option<NaiveDateTime>,
    #[serde(default)]
    pub end_time: Option<NaiveDateTime>,
    #[serde(default)]
    pub processed_records: Option<i64>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub execution_time_seconds: Option<i64>,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn unknown_job_status() -> JobStatus {
    JobStatus::Unknown
}

/// Geographic bounding box for spatial range queries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoBounds {
    pub min_lng: f64,
    pub max_lng: f64,
    pub min_lat: f64,
    pub max_lat: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn alert_deserializes_backend_payload() {
        let alert: Alert = serde_json::from_value(json!({
            "id": 7,
            "city": "Shanghai",
            "anomalyType": "DELAY",
            "anomalySeverity": "HIGH",
            "anomalyValue": 95.5,
            "isResolved": false,
            "createdAt": "2024-03-01T10:15:00"
        }))
        .unwrap();

        assert_eq!(alert.id, 7);
        assert_eq!(alert.anomaly_severity, Severity::High);
        assert!(!alert.is_resolved);
        assert_eq!(
            alert.created_at.unwrap().format("%H:%M").to_string(),
            "10:15"
        );
    }

    #[test]
    fn unrecognised_severity_maps_to_unknown() {
        let alert: Alert =
            serde_json::from_value(json!({ "id": 1, "anomalySeverity": "CRITICAL" })).unwrap();
        assert_eq!(alert.anomaly_severity, Severity::Unknown);
    }

    #[test]
    fn severity_lookup_falls_back_for_unknown_tags() {
        assert_eq!(Severity::lookup("HIGH").label, "High");
        assert_eq!(Severity::lookup("high").color, "#F56C6C");

        let fallback = Severity::lookup("SEVERE");
        assert_eq!(fallback.label, "SEVERE");
        assert_eq!(fallback.color, NEUTRAL_COLOR);
        assert_eq!(Severity::lookup("").label, "--");
    }

    #[test]
    fn severity_priority_orders_high_first() {
        assert!(Severity::High.priority() > Severity::Medium.priority());
        assert!(Severity::Medium.priority() > Severity::Low.priority());
    }

    #[test]
    fn job_status_lookup_and_terminal_states() {
        assert_eq!(JobStatus::lookup("RUNNING").label, "Running");
        assert_eq!(JobStatus::lookup("EXPLODED").label, "EXPLODED");
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Pending.is_terminal());
    }

    #[test]
    fn shipment_and_alert_status_lookups() {
        assert_eq!(ShipmentStatus::lookup("out_for_delivery").label, "Out for delivery");
        assert_eq!(ShipmentStatus::lookup("teleported").color, NEUTRAL_COLOR);
        assert_eq!(AlertStatus::lookup("IN_PROGRESS").label, "In progress");
        assert_eq!(AlertStatus::lookup("").label, "--");
    }

    #[test]
    fn kpi_keeps_unmodelled_fields() {
        let kpi: RealtimeKpi = serde_json::from_value(json!({
            "totalOrders": 120,
            "peakHour": 18
        }))
        .unwrap();

        assert_eq!(kpi.total_orders, Some(120));
        assert_eq!(kpi.extra["peakHour"], 18);
    }

    #[test]
    fn find_city_matches_value_or_label() {
        assert_eq!(find_city("Shanghai").unwrap().code, "310000");
        assert_eq!(find_city("重庆").unwrap().value, "chongqing");
        assert!(find_city("atlantis").is_none());
    }
}
