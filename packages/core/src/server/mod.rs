//! Static asset server for the built dashboard.
//!
//! Serves files from the asset directory and answers every unmatched path
//! with `index.html` so client-side routes survive a reload. `/health` and
//! `/metrics` are served alongside the assets.

pub mod health;

use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Request, State},
    handler::HandlerWithoutStateExt,
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::services::ServeDir;

use crate::metrics::AppMetrics;

pub const INDEX_FILE: &str = "index.html";

/// Faults that stop the server from starting or keep it from running.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("asset directory not found: {0}")]
    MissingAssets(PathBuf),

    #[error("port {0} is already in use; close the program holding it or choose another port")]
    PortInUse(u16),

    #[error("failed to bind port {port}: {source}")]
    Bind { port: u16, source: io::Error },

    #[error("server error: {0}")]
    Io(#[from] io::Error),
}

/// Assemble the router: health and metrics routes, static assets, and the
/// `index.html` fallback. Every request is counted in `metrics`.
pub fn build_router(dist_dir: &Path, metrics: Arc<AppMetrics>) -> Router {
    let index_path = dist_dir.join(INDEX_FILE);
    let spa_fallback = (move || {
        let index_path = index_path.clone();
        async move { serve_index(&index_path).await }
    })
    .into_service();

    let assets = ServeDir::new(dist_dir).fallback(spa_fallback);

    Router::new()
        .route("/health", get(health::health))
        .route("/metrics", get(health::metrics))
        .with_state(metrics.clone())
        .fallback_service(assets)
        .layer(middleware::from_fn_with_state(metrics, track_requests))
}

async fn serve_index(index_path: &Path) -> Response {
    match tokio::fs::read(index_path).await {
        Ok(body) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "text/html; charset=utf-8"),
                (header::CACHE_CONTROL, "no-cache"),
            ],
            body,
        )
            .into_response(),
        Err(err) => {
            tracing::warn!("{} unavailable: {}", index_path.display(), err);
            (StatusCode::NOT_FOUND, "index.html not found").into_response()
        }
    }
}

async fn track_requests(
    State(metrics): State<Arc<AppMetrics>>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    metrics
        .http_requests_total
        .with_label_values(&[method.as_str(), response.status().as_str()])
        .inc();
    metrics
        .http_request_duration
        .observe(started.elapsed().as_secs_f64());

    response
}

/// Bind `port` and serve `dist_dir` until `Ctrl+C`.
pub async fn serve(dist_dir: &Path, port: u16, metrics: Arc<AppMetrics>) -> Result<(), ServerError> {
    if !dist_dir.is_dir() {
        return Err(ServerError::MissingAssets(dist_dir.to_path_buf()));
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await.map_err(|err| match err.kind() {
        io::ErrorKind::AddrInUse => ServerError::PortInUse(port),
        _ => ServerError::Bind { port, source: err },
    })?;

    tracing::info!("Serving {} at http://localhost:{}", dist_dir.display(), port);
    tracing::info!("Press Ctrl+C to stop the server");

    axum::serve(listener, build_router(dist_dir, metrics))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", err);
        return;
    }
    tracing::info!("Shutting down server...");
}

/// Block until the user acknowledges a start-up fault on the console.
pub fn wait_for_keypress() {
    use std::io::Read;

    println!("Press Enter to exit...");
    let mut byte = [0u8; 1];
    let _ = io::stdin().read(&mut byte);
}
