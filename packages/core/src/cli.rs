use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

use crate::config::Config;
use crate::error::AppError;
use crate::notify::TracingNotifier;
use crate::scheduler::run_alert_watcher;
use crate::session::DashboardSession;
use crate::storage::keys;
use crate::stores::alerts::{ExportFormat, FetchOptions, FilterChange, StatusFilter};

/// Logistics analytics dashboard CLI arguments
#[derive(Debug, Parser)]
#[command(
    name = "logistics-dashboard",
    version,
    about = "Logistics analytics dashboard client and asset server"
)]
pub struct Cli {
    /// Analytics backend base URL
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Local storage file (token, preferences, persisted stores)
    #[arg(long, global = true)]
    pub storage: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve the built dashboard assets
    Serve {
        /// Port to listen on
        #[arg(long)]
        port: Option<u16>,

        /// Directory holding the built assets
        #[arg(long)]
        dist: Option<PathBuf>,
    },

    /// Realtime KPI data
    #[command(subcommand)]
    Kpi(KpiCommand),

    /// Anomaly alerts
    #[command(subcommand)]
    Alerts(AlertsCommand),

    /// Spark analysis jobs
    #[command(subcommand)]
    Spark(SparkCommand),

    /// Bearer token kept in local storage
    #[command(subcommand)]
    Token(TokenCommand),
}

#[derive(Debug, Subcommand)]
pub enum KpiCommand {
    /// Today's KPI for a city
    Today {
        #[arg(long, default_value = "shanghai")]
        city: String,
    },

    /// Daily KPI trend
    Trend {
        #[arg(long, default_value = "shanghai")]
        city: String,

        #[arg(long)]
        days: Option<u32>,
    },
}

#[derive(Debug, Subcommand)]
pub enum AlertsCommand {
    /// Most recent alerts across all cities
    Recent {
        #[arg(long)]
        limit: Option<u32>,
    },

    /// Fetch alerts and export the filtered view
    Export {
        #[arg(long, default_value = "json")]
        format: ExportFormat,

        #[arg(long)]
        city: Option<String>,

        /// all, resolved or unresolved
        #[arg(long, default_value = "all")]
        status: StatusFilter,
    },

    /// Mark alerts resolved
    Resolve {
        #[arg(required = true)]
        ids: Vec<i64>,
    },

    /// Receive pushed alerts until Ctrl+C
    Listen {
        /// Push endpoint, overrides WS_URL
        #[arg(long)]
        url: Option<String>,
    },

    /// Keep refreshing alerts until Ctrl+C
    Watch {
        #[arg(long)]
        city: Option<String>,

        /// Refresh interval in seconds
        #[arg(long)]
        interval: Option<u64>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum JobFilter {
    All,
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Subcommand)]
pub enum SparkCommand {
    /// List jobs
    Jobs {
        #[arg(long, value_enum, default_value = "all")]
        status: JobFilter,

        #[arg(long)]
        limit: Option<u32>,
    },

    /// Logs of one job
    Logs {
        job_id: String,

        /// stdout or stderr
        #[arg(long)]
        log_type: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum TokenCommand {
    /// Store the bearer token sent with every request
    Set { token: String },

    /// Forget the stored token
    Clear,
}

impl Cli {
    /// Apply command-line overrides on top of the environment config.
    pub fn apply_overrides(&self, mut config: Config) -> Config {
        if let Some(api_url) = &self.api_url {
            config.api_base_url = api_url.clone();
        }
        if let Some(storage) = &self.storage {
            config.storage_path = storage.clone();
        }
        if let Command::Alerts(AlertsCommand::Listen { url: Some(url) }) = &self.command {
            config.ws_url = url.clone();
        }
        if let Command::Serve { port, dist } = &self.command {
            if let Some(port) = port {
                config.port = *port;
            }
            if let Some(dist) = dist {
                config.dist_dir = dist.clone();
            }
        }
        config
    }
}

/// Run every client-side command. `serve` is handled by the binary.
pub async fn run(command: Command, config: &Config) -> Result<(), AppError> {
    let session = DashboardSession::new(config, Arc::new(TracingNotifier))?;

    match command {
        Command::Serve { .. } => Ok(()),

        Command::Kpi(KpiCommand::Today { city }) => print_json(&session.today_kpi(&city).await?),
        Command::Kpi(KpiCommand::Trend { city, days }) => {
            print_json(&session.kpi_trend(&city, days).await?)
        }

        Command::Alerts(AlertsCommand::Recent { limit }) => {
            print_json(&session.recent_alerts(limit).await?)
        }
        Command::Alerts(AlertsCommand::Export { format, city, status }) => {
            let store = session.alerts();
            store.set_filter(FilterChange::City(city)).await;
            store.set_filter(FilterChange::Status(status)).await;
            store
                .fetch_alerts(FetchOptions {
                    refresh: true,
                    ..FetchOptions::default()
                })
                .await?;
            println!("{}", store.export_alerts(format).await?);
            Ok(())
        }
        Command::Alerts(AlertsCommand::Resolve { ids }) => {
            let store = session.alerts();
            if let [id] = ids.as_slice() {
                store.resolve_alert(*id).await
            } else {
                store.resolve_alerts_in_batch(&ids).await
            }
        }
        Command::Alerts(AlertsCommand::Listen { .. }) => {
            let mut client = session.listen_for_alerts();
            tokio::select! {
                summary = client.join() => {
                    tracing::warn!("Push connection ended after {} attempts", summary.attempts);
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Shutdown signal received. Closing push connection.");
                    client.close();
                    client.join().await;
                }
            }
            let pushed = session.alerts().read().await.alerts.len();
            tracing::info!("{} alerts received", pushed);
            Ok(())
        }
        Command::Alerts(AlertsCommand::Watch { city, interval }) => {
            let store = session.alerts().clone();
            store.enable_realtime().await;
            if let Some(secs) = interval.filter(|secs| *secs > 0) {
                store.set_realtime_interval(Duration::from_secs(secs)).await;
            }
            run_alert_watcher(store, city).await;
            Ok(())
        }

        Command::Spark(SparkCommand::Jobs { status, limit }) => {
            let spark = &session.apis().spark;
            let jobs = match status {
                JobFilter::All => spark.get_all_jobs().await?,
                JobFilter::Running => spark.get_running_jobs().await?,
                JobFilter::Completed => spark.get_completed_jobs(limit).await?,
                JobFilter::Failed => spark.get_failed_jobs(limit).await?,
            };
            print_json(&jobs)
        }
        Command::Spark(SparkCommand::Logs { job_id, log_type }) => {
            let logs = session
                .apis()
                .spark
                .get_job_logs(&job_id, log_type.as_deref())
                .await?;
            print_json(&logs)
        }

        Command::Token(TokenCommand::Set { token }) => {
            session.storage().set(keys::TOKEN, token)?;
            tracing::info!("Token saved");
            Ok(())
        }
        Command::Token(TokenCommand::Clear) => {
            session.storage().remove(keys::TOKEN)?;
            tracing::info!("Token cleared");
            Ok(())
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
