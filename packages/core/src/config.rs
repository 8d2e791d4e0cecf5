use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 10;
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_DIST_DIR: &str = "dist";
pub const DEFAULT_STORAGE_PATH: &str = ".logistics-dashboard/storage.json";
pub const DEFAULT_WS_URL: &str = "ws://localhost:8080/ws";

#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: String,
    pub request_timeout_seconds: u64,
    pub port: u16,
    pub dist_dir: PathBuf,
    pub storage_path: PathBuf,
    /// Realtime alert push endpoint.
    pub ws_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary variable source. Every setting has a
    /// default; only values that are present but malformed are rejected.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_base_url = lookup("API_BASE_URL")
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());

        if !api_base_url.starts_with("http://") && !api_base_url.starts_with("https://") {
            return Err(format!("Invalid API_BASE_URL: {}", api_base_url));
        }

        let request_timeout_seconds = match lookup("REQUEST_TIMEOUT_SECONDS") {
            Some(raw) => raw
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or("REQUEST_TIMEOUT_SECONDS must be a positive number")?,
            None => DEFAULT_REQUEST_TIMEOUT_SECONDS,
        };

        let port = match lookup("PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|_| "PORT must be a valid port number")?,
            None => DEFAULT_PORT,
        };

        let dist_dir = lookup("DIST_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DIST_DIR));

        let storage_path = lookup("STORAGE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STORAGE_PATH));

        let ws_url = lookup("WS_URL").unwrap_or_else(|| DEFAULT_WS_URL.to_string());

        if !ws_url.starts_with("ws://") && !ws_url.starts_with("wss://") {
            return Err(format!("Invalid WS_URL: {}", ws_url));
        }

        Ok(Self {
            api_base_url,
            request_timeout_seconds,
            port,
            dist_dir,
            storage_path,
            ws_url,
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = Config::from_lookup(|_| None).unwrap();
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.port, 3000);
        assert_eq!(config.dist_dir, PathBuf::from("dist"));
        assert_eq!(config.ws_url, "ws://localhost:8080/ws");
    }

    #[test]
    fn values_are_read_from_the_source() {
        let config = Config::from_lookup(lookup_from(&[
            ("API_BASE_URL", "https://analytics.example.com"),
            ("REQUEST_TIMEOUT_SECONDS", "30"),
            ("PORT", "8081"),
        ]))
        .unwrap();

        assert_eq!(config.api_base_url, "https://analytics.example.com");
        assert_eq!(config.request_timeout_seconds, 30);
        assert_eq!(config.port, 8081);
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        assert!(Config::from_lookup(lookup_from(&[("PORT", "eighty")])).is_err());
        assert!(Config::from_lookup(lookup_from(&[("REQUEST_TIMEOUT_SECONDS", "0")])).is_err());
    }

    #[test]
    fn non_http_base_url_is_rejected() {
        let err = Config::from_lookup(lookup_from(&[("API_BASE_URL", "ftp://nope")])).unwrap_err();
        assert!(err.contains("API_BASE_URL"));
    }

    #[test]
    fn ws_url_must_use_websocket_scheme() {
        let config = Config::from_lookup(lookup_from(&[("WS_URL", "wss://push.example.com/ws")])).unwrap();
        assert_eq!(config.ws_url, "wss://push.example.com/ws");

        let err = Config::from_lookup(lookup_from(&[("WS_URL", "http://push.example.com")])).unwrap_err();
        assert!(err.contains("WS_URL"));
    }
}
