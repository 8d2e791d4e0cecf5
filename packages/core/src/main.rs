use std::sync::Arc;

use clap::Parser;
use dotenvy::dotenv;

use logistics_dashboard::cli::{self, Cli, Command};
use logistics_dashboard::config::Config;
use logistics_dashboard::error::AppError;
use logistics_dashboard::logging::init_logging;
use logistics_dashboard::metrics::AppMetrics;
use logistics_dashboard::server;

#[tokio::main]
async fn main() {
    dotenv().ok();
    init_logging();

    let args = Cli::parse();

    let config = Config::from_env()
        .map_err(AppError::Config)
        .map(|config| args.apply_overrides(config))
        .unwrap_or_else(|err| {
            tracing::error!("{}", err);
            std::process::exit(1);
        });

    tracing::debug!("Loaded config: {:?}", config);

    match args.command {
        Command::Serve { .. } => serve(&config).await,
        command => {
            if let Err(err) = cli::run(command, &config).await {
                tracing::error!("{}", err);
                std::process::exit(1);
            }
        }
    }
}

async fn serve(config: &Config) {
    let metrics = match AppMetrics::new() {
        Ok(metrics) => Arc::new(metrics),
        Err(err) => {
            tracing::error!("Failed to register metrics: {}", err);
            std::process::exit(1);
        }
    };

    if let Err(err) = server::serve(&config.dist_dir, config.port, metrics).await {
        tracing::error!("Server failed to start: {}", err);
        server::wait_for_keypress();
        std::process::exit(1);
    }
}
