//! Explicitly wired dashboard session.
//!
//! [`DashboardSession`] owns everything a dashboard needs for its lifetime:
//! local storage, the shared HTTP client, the request orchestrator, the
//! domain API clients and the stores. Construction order is fixed:
//! storage, client, orchestrator, APIs, stores.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;

use crate::api::{AlertsApi, BackendApis};
use crate::config::Config;
use crate::error::AppError;
use crate::metrics::AppMetrics;
use crate::notify::Notifier;
use crate::orchestrator::{ExecuteOptions, PollOptions, Poller, RequestOrchestrator};
use crate::realtime::{PushClient, PushOptions};
use crate::services::backend::ApiClient;
use crate::storage::LocalStorage;
use crate::stores::{AlertsStore, DashboardStore};
use crate::types::{Alert, KpiTrendPoint, RealtimeKpi};

pub const DEFAULT_TREND_DAYS: u32 = 7;
pub const DEFAULT_RECENT_ALERTS: u32 = 50;
pub const DEFAULT_ALERT_POLL_INTERVAL: Duration = Duration::from_secs(30);

pub struct DashboardSession {
    storage: Arc<LocalStorage>,
    client: Arc<ApiClient>,
    metrics: Arc<AppMetrics>,
    orchestrator: Arc<RequestOrchestrator>,
    apis: BackendApis,
    alerts: Arc<AlertsStore>,
    dashboard: Arc<RwLock<DashboardStore>>,
    ws_url: String,
}

impl DashboardSession {
    /// Open the file-backed storage named by `config` and wire a session
    /// around it.
    pub fn new(config: &Config, notifier: Arc<dyn Notifier>) -> Result<Self, AppError> {
        let storage = Arc::new(LocalStorage::open(&config.storage_path)?);
        Self::with_storage(config, storage, notifier)
    }

    pub fn with_storage(
        config: &Config,
        storage: Arc<LocalStorage>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, AppError> {
        let client = Arc::new(ApiClient::new(
            &config.api_base_url,
            config.request_timeout(),
            storage.clone(),
        )?);

        let metrics = Arc::new(
            AppMetrics::new()
                .map_err(|err| AppError::Unknown(format!("metrics registry: {}", err)))?,
        );

        let orchestrator = Arc::new(
            RequestOrchestrator::new(notifier.clone()).with_metrics(metrics.clone()),
        );

        let apis = BackendApis::new(client.clone());

        let alerts = Arc::new(
            AlertsStore::new(Arc::new(apis.alerts.clone()), notifier).with_storage(storage.clone()),
        );
        let dashboard = Arc::new(RwLock::new(DashboardStore::new()));

        tracing::debug!("dashboard session ready for {}", client.base_url());

        Ok(Self {
            storage,
            client,
            metrics,
            orchestrator,
            apis,
            alerts,
            dashboard,
            ws_url: config.ws_url.clone(),
        })
    }

    pub fn storage(&self) -> &Arc<LocalStorage> {
        &self.storage
    }

    pub fn client(&self) -> &Arc<ApiClient> {
        &self.client
    }

    pub fn metrics(&self) -> &Arc<AppMetrics> {
        &self.metrics
    }

    pub fn orchestrator(&self) -> &Arc<RequestOrchestrator> {
        &self.orchestrator
    }

    pub fn apis(&self) -> &BackendApis {
        &self.apis
    }

    pub fn alerts(&self) -> &Arc<AlertsStore> {
        &self.alerts
    }

    pub fn dashboard(&self) -> &Arc<RwLock<DashboardStore>> {
        &self.dashboard
    }

    /// Open the realtime push connection and feed pushed alerts into the
    /// alerts store.
    pub fn listen_for_alerts(&self) -> PushClient {
        PushClient::connect(PushOptions::new(self.ws_url.clone()), self.alerts.clone())
    }

    pub async fn today_kpi(&self, city: &str) -> Result<RealtimeKpi, AppError> {
        let options = ExecuteOptions::default().loading_message("Loading today's KPI data...");
        self.orchestrator
            .execute(|| self.apis.kpi.get_today_kpi(city), &options)
            .await
    }

    /// Daily KPI trend for the last `days` days (defaults to 7).
    pub async fn kpi_trend(&self, city: &str, days: Option<u32>) -> Result<Vec<KpiTrendPoint>, AppError> {
        let days = days.unwrap_or(DEFAULT_TREND_DAYS);
        self.orchestrator
            .execute_map(
                || self.apis.kpi.get_recent_kpi(city, Some(days)),
                |records: Vec<RealtimeKpi>| records.iter().map(KpiTrendPoint::from).collect(),
                &ExecuteOptions::default(),
            )
            .await
    }

    pub async fn recent_alerts(&self, limit: Option<u32>) -> Result<Vec<Alert>, AppError> {
        let limit = limit.unwrap_or(DEFAULT_RECENT_ALERTS);
        self.orchestrator
            .execute(|| self.apis.alerts.get_recent_alerts(Some(limit)), &ExecuteOptions::default())
            .await
    }

    /// A stopped poller over today's alerts for `city`. Every non-empty
    /// result raises a warning notification.
    pub fn poll_alerts(&self, city: &str, interval: Option<Duration>) -> Poller<Vec<Alert>> {
        let api: AlertsApi = self.apis.alerts.clone();
        let notifier = self.orchestrator.notifier().clone();
        let city = city.to_string();
        let label = city.clone();

        let options = PollOptions::default().on_success(move |alerts: &Vec<Alert>| {
            if !alerts.is_empty() {
                notifier.warning(&format!("{} has {} new alerts", label, alerts.len()));
            }
        });

        self.orchestrator.poll(
            move || {
                let api = api.clone();
                let city = city.clone();
                async move { api.get_today_alerts(&city).await }
            },
            interval.unwrap_or(DEFAULT_ALERT_POLL_INTERVAL),
            options,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::RecordingNotifier;

    fn config(api_base_url: &str) -> Config {
        let mut config = Config::from_lookup(|_| None).unwrap();
        config.api_base_url = api_base_url.to_string();
        config
    }

    #[test]
    fn session_rejects_unusable_base_url() {
        let result = DashboardSession::with_storage(
            &config("not a url"),
            Arc::new(LocalStorage::in_memory()),
            Arc::new(RecordingNotifier::new()),
        );
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[tokio::test]
    async fn session_starts_with_default_selection() {
        let session = DashboardSession::with_storage(
            &config("http://localhost:8080"),
            Arc::new(LocalStorage::in_memory()),
            Arc::new(RecordingNotifier::new()),
        )
        .unwrap();

        assert_eq!(session.dashboard().read().await.selected_city(), "shanghai");
        assert!(session.alerts().read().await.alerts.is_empty());
        assert_eq!(session.orchestrator().cache_len(), 0);
    }

    #[tokio::test]
    async fn alert_poller_is_returned_stopped() {
        let session = DashboardSession::with_storage(
            &config("http://localhost:8080"),
            Arc::new(LocalStorage::in_memory()),
            Arc::new(RecordingNotifier::new()),
        )
        .unwrap();

        let poller = session.poll_alerts("shanghai", None);
        assert!(!poller.is_polling());
        assert_eq!(poller.interval(), DEFAULT_ALERT_POLL_INTERVAL);
    }

    #[tokio::test]
    async fn pushed_alerts_reach_the_session_store() {
        use futures::SinkExt;
        use tokio_tungstenite::tungstenite::Message;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut config = config("http://localhost:8080");
        config.ws_url = format!("ws://{}/ws", listener.local_addr().unwrap());
        let server = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            let alert = r#"{"id":7,"city":"Hangzhou","anomalyType":"LOW_RATING","anomalySeverity":"MEDIUM"}"#;
            ws.send(Message::Text(alert.into())).await.unwrap();
            ws.close(None).await.unwrap();
        });

        let session = DashboardSession::with_storage(
            &config,
            Arc::new(LocalStorage::in_memory()),
            Arc::new(RecordingNotifier::new()),
        )
        .unwrap();

        let mut client = session.listen_for_alerts();
        server.await.unwrap();
        let received = async {
            while session.alerts().read().await.alerts.is_empty() {
                tokio::task::yield_now().await;
            }
        };
        tokio::time::timeout(Duration::from_secs(5), received).await.unwrap();
        // The server is gone; stop the reconnect loop.
        client.close();
        client.join().await;

        let state = session.alerts().read().await;
        assert_eq!(state.alerts[0].id, 7);
        assert_eq!(state.alerts[0].city, "Hangzhou");
    }
}
