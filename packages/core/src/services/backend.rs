//! Shared HTTP client for the analytics backend.
//!
//! Every request goes through [`ApiClient::send`], which applies the two
//! cross-cutting concerns of the backend contract:
//!
//! - outgoing: `Content-Type: application/json` and, when local storage holds
//!   a token, `Authorization: Bearer <token>` (read fresh on every request);
//! - incoming: the `{ success, data, message }` envelope is unwrapped into
//!   `data`, and `success: false` becomes [`AppError::Api`] carrying the
//!   server message.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::{header, Client, Method, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AppError;
use crate::storage::{keys, LocalStorage};

/// Response envelope shared by every backend endpoint.
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub message: Option<String>,
}

impl ApiEnvelope {
    /// Unwrap into `data`, or the server's refusal.
    pub fn into_data<T: DeserializeOwned>(self) -> Result<T, AppError> {
        if !self.success {
            return Err(AppError::rejected(None, self.message));
        }
        serde_json::from_value(self.data).map_err(AppError::from)
    }
}

/// Ordered query parameters. Repeated keys are kept as repeated pairs
/// (`cities=a&cities=b`), which is the form the backend expects for lists.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(mut self, key: &str, value: impl fmt::Display) -> Self {
        self.0.push((key.to_string(), value.to_string()));
        self
    }

    /// Push only when a value is present.
    pub fn push_opt<V: fmt::Display>(self, key: &str, value: Option<V>) -> Self {
        match value {
            Some(value) => self.push(key, value),
            None => self,
        }
    }

    pub fn push_all<V: fmt::Display>(mut self, key: &str, values: &[V]) -> Self {
        for value in values {
            self.0.push((key.to_string(), value.to_string()));
        }
        self
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: AsRef<str>, V: fmt::Display> FromIterator<(K, V)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.as_ref().to_string(), v.to_string()))
                .collect(),
        )
    }
}

#[derive(Clone)]
pub struct ApiClient {
    base_url: Url,
    http: Client,
    storage: Arc<LocalStorage>,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url.as_str())
            .finish()
    }
}

impl ApiClient {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        storage: Arc<LocalStorage>,
    ) -> Result<Self, AppError> {
        let base_url = Url::parse(base_url)
            .map_err(|err| AppError::Config(format!("Invalid API base URL '{}': {}", base_url, err)))?;

        if base_url.cannot_be_a_base() {
            return Err(AppError::Config(format!(
                "API base URL '{}' cannot carry a path",
                base_url
            )));
        }

        let mut default_headers = header::HeaderMap::new();
        default_headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let http = Client::builder()
            .timeout(timeout)
            .default_headers(default_headers)
            .build()
            .map_err(|err| AppError::Config(format!("Failed to create HTTP client: {}", err)))?;

        Ok(Self {
            base_url,
            http,
            storage,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    pub fn storage(&self) -> &Arc<LocalStorage> {
        &self.storage
    }

    /// Build an endpoint URL from path segments. Each segment is
    /// percent-encoded on its own, so city names with spaces or non-ASCII
    /// characters are safe to interpolate.
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty();
            path.extend(segments);
        }
        url
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: QueryParams,
    ) -> Result<T, AppError> {
        self.send(Method::GET, segments, query, None).await
    }

    pub async fn delete<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: QueryParams,
    ) -> Result<T, AppError> {
        self.send(Method::DELETE, segments, query, None).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> Result<T, AppError> {
        let body = serde_json::to_value(body)?;
        self.send(Method::POST, segments, QueryParams::new(), Some(body)).await
    }

    /// POST without a request body.
    pub async fn post_empty<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, AppError> {
        self.send(Method::POST, segments, QueryParams::new(), None).await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> Result<T, AppError> {
        let body = serde_json::to_value(body)?;
        self.send(Method::PUT, segments, QueryParams::new(), Some(body)).await
    }

    /// PUT without a request body.
    pub async fn put_empty<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, AppError> {
        self.send(Method::PUT, segments, QueryParams::new(), None).await
    }

    /// Fetch a binary payload (report downloads). Not enveloped.
    pub async fn get_bytes(
        &self,
        segments: &[&str],
        query: QueryParams,
    ) -> Result<Vec<u8>, AppError> {
        let response = self
            .request(Method::GET, segments, &query, None)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.bytes().await.unwrap_or_default();
            return Err(rejection_from_body(status.as_u16(), &body));
        }

        Ok(response.bytes().await?.to_vec())
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        segments: &[&str],
        query: QueryParams,
        body: Option<Value>,
    ) -> Result<T, AppError> {
        tracing::debug!("{} /{}", method, segments.join("/"));

        let response = self
            .request(method, segments, &query, body)
            .send()
            .await
            .map_err(|err| {
                tracing::error!("API error: {}", err);
                AppError::from(err)
            })?;

        let status = response.status();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            let err = rejection_from_body(status.as_u16(), &bytes);
            tracing::error!("API error: {}", err);
            return Err(err);
        }

        let envelope: ApiEnvelope = serde_json::from_slice(&bytes)
            .map_err(|err| AppError::Parse(format!("malformed response envelope: {}", err)))?;

        envelope.into_data()
    }

    fn request(
        &self,
        method: Method,
        segments: &[&str],
        query: &QueryParams,
        body: Option<Value>,
    ) -> reqwest::RequestBuilder {
        let mut request = self.http.request(method, self.endpoint(segments));

        if !query.is_empty() {
            request = request.query(query.pairs());
        }

        if let Some(token) = self.storage.get(keys::TOKEN).filter(|t| !t.is_empty()) {
            request = request.bearer_auth(token);
        }

        if let Some(body) = body {
            request = request.json(&body);
        }

        request
    }
}

/// Turn a non-2xx response into an error, preferring the envelope's message.
fn rejection_from_body(status: u16, body: &[u8]) -> AppError {
    let message = serde_json::from_slice::<ApiEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.message)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| format!("HTTP {}", status));

    AppError::Api {
        status: Some(status),
        message,
    }
}
