//! Realtime alert push over WebSocket.
//!
//! [`PushClient::connect`] spawns a task that holds a connection to the push
//! endpoint, decodes every text frame as JSON and hands it to a
//! [`PushHandler`]. A lost or refused connection is retried a bounded number
//! of times, waiting `reconnect_interval` between tries; every successful
//! connection resets the count.
//!
//! The alerts store is a handler: each pushed alert is prepended to it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::error::AppError;
use crate::stores::AlertsStore;
use crate::types::Alert;

pub const DEFAULT_RECONNECT_ATTEMPTS: u32 = 5;
pub const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_millis(3000);

type PushStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Clone)]
pub struct PushOptions {
    pub url: String,
    /// Reconnects allowed in a row before the client gives up.
    pub reconnect_attempts: u32,
    pub reconnect_interval: Duration,
}

impl PushOptions {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            reconnect_attempts: DEFAULT_RECONNECT_ATTEMPTS,
            reconnect_interval: DEFAULT_RECONNECT_INTERVAL,
        }
    }

    pub fn reconnect_attempts(mut self, attempts: u32) -> Self {
        self.reconnect_attempts = attempts;
        self
    }

    pub fn reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect_interval = interval;
        self
    }
}

/// Receives connection events. Only `on_message` is required.
#[async_trait]
pub trait PushHandler: Send + Sync {
    async fn on_message(&self, message: Value);

    async fn on_open(&self) {}

    async fn on_close(&self) {}

    async fn on_error(&self, _error: &AppError) {}
}

#[async_trait]
impl PushHandler for AlertsStore {
    async fn on_message(&self, message: Value) {
        match serde_json::from_value::<Alert>(message) {
            Ok(alert) => {
                tracing::debug!("pushed alert {} for {}", alert.id, alert.city);
                self.add_alert(alert).await;
            }
            Err(err) => tracing::warn!("Ignoring pushed message that is not an alert: {}", err),
        }
    }
}

/// What a finished push task did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PushSummary {
    /// Connection attempts, successful or not.
    pub attempts: u32,
    /// Attempts that opened a connection.
    pub connections: u32,
}

/// Handle to a running push connection.
pub struct PushClient {
    outgoing: mpsc::UnboundedSender<String>,
    stop: watch::Sender<bool>,
    connected: Arc<AtomicBool>,
    task: JoinHandle<PushSummary>,
}

impl PushClient {
    /// Spawn the connection task. Must be called inside a Tokio runtime.
    pub fn connect(options: PushOptions, handler: Arc<dyn PushHandler>) -> Self {
        let (outgoing, outgoing_rx) = mpsc::unbounded_channel();
        let (stop, stop_rx) = watch::channel(false);
        let connected = Arc::new(AtomicBool::new(false));

        let task = tokio::spawn(run_push(
            options,
            handler,
            outgoing_rx,
            stop_rx,
            connected.clone(),
        ));

        Self {
            outgoing,
            stop,
            connected,
            task,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Queue `payload` for the server. A string goes out verbatim, anything
    /// else as JSON. Returns `Ok(false)` when no connection is open.
    pub fn send<T: Serialize + ?Sized>(&self, payload: &T) -> Result<bool, AppError> {
        if !self.is_connected() {
            tracing::warn!("Push connection not open, message dropped");
            return Ok(false);
        }

        let text = match serde_json::to_value(payload)? {
            Value::String(text) => text,
            other => other.to_string(),
        };
        Ok(self.outgoing.send(text).is_ok())
    }

    /// Close the connection and stop reconnecting.
    pub fn close(&self) {
        self.stop.send_replace(true);
    }

    /// Wait for the push task to finish.
    pub async fn join(&mut self) -> PushSummary {
        match (&mut self.task).await {
            Ok(summary) => summary,
            Err(err) => {
                tracing::error!("Push task failed: {}", err);
                PushSummary::default()
            }
        }
    }
}

async fn run_push(
    options: PushOptions,
    handler: Arc<dyn PushHandler>,
    mut outgoing: mpsc::UnboundedReceiver<String>,
    mut stop: watch::Receiver<bool>,
    connected: Arc<AtomicBool>,
) -> PushSummary {
    let mut summary = PushSummary::default();
    let mut reconnect_count: u32 = 0;

    loop {
        summary.attempts += 1;
        tracing::info!("Connecting to push endpoint {}", options.url);

        match connect_async(options.url.as_str()).await {
            Ok((stream, _)) => {
                summary.connections += 1;
                reconnect_count = 0;
                connected.store(true, Ordering::SeqCst);
                handler.on_open().await;

                let closed_locally =
                    pump(stream, handler.as_ref(), &mut outgoing, &mut stop).await;

                connected.store(false, Ordering::SeqCst);
                handler.on_close().await;
                if closed_locally {
                    return summary;
                }
            }
            Err(err) => {
                let err = AppError::Network(format!("push connection failed: {}", err));
                tracing::warn!("{}", err);
                handler.on_error(&err).await;
            }
        }

        if *stop.borrow() {
            return summary;
        }
        if reconnect_count >= options.reconnect_attempts {
            tracing::warn!(
                "Giving up on {} after {} reconnect attempts",
                options.url,
                reconnect_count
            );
            return summary;
        }

        reconnect_count += 1;
        tracing::info!(
            "Reconnecting in {:?} ({}/{})",
            options.reconnect_interval,
            reconnect_count,
            options.reconnect_attempts
        );

        tokio::select! {
            _ = sleep(options.reconnect_interval) => {}
            _ = stop.changed() => return summary,
        }
    }
}

/// Move frames both ways until the connection drops or a stop is requested.
/// Returns true when the stop ended it.
async fn pump(
    stream: PushStream,
    handler: &dyn PushHandler,
    outgoing: &mut mpsc::UnboundedReceiver<String>,
    stop: &mut watch::Receiver<bool>,
) -> bool {
    let (mut write, mut read) = stream.split();

    loop {
        tokio::select! {
            frame = read.next() => match frame {
                Some(Ok(Message::Text(text))) => match serde_json::from_str::<Value>(&text) {
                    Ok(message) => handler.on_message(message).await,
                    Err(err) => tracing::warn!("Failed to parse push message: {}", err),
                },
                Some(Ok(Message::Close(_))) | None => {
                    tracing::info!("Push connection closed by server");
                    return false;
                }
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    tracing::error!("Push connection error: {}", err);
                    handler.on_error(&AppError::Network(err.to_string())).await;
                    return false;
                }
            },

            Some(text) = outgoing.recv() => {
                if let Err(err) = write.send(Message::Text(text)).await {
                    tracing::warn!("Failed to send push message: {}", err);
                }
            }

            _ = stop.changed() => {
                if let Err(err) = write.send(Message::Close(None)).await {
                    tracing::debug!("close frame not delivered: {}", err);
                }
                return true;
            }
        }
    }
}
