use thiserror::Error;

/// Message used when the backend rejects a request without saying why.
pub const DEFAULT_FAILURE_MESSAGE: &str = "request failed";

/// Unified application error.
///
/// Network failures, backend-signalled failures and local faults all end up
/// here so callers can show one readable message regardless of origin.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    /// The backend answered but refused the request. Displays as the
    /// server-supplied message verbatim.
    #[error("{message}")]
    Api { status: Option<u16>, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl AppError {
    pub fn api(message: impl Into<String>) -> Self {
        Self::Api {
            status: None,
            message: message.into(),
        }
    }

    /// Build an `Api` error from an optional server message, substituting
    /// the default failure message when the server sent none.
    pub fn rejected(status: Option<u16>, message: Option<String>) -> Self {
        let message = message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_FAILURE_MESSAGE.to_string());
        Self::Api { status, message }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::Network(format!("request timed out: {}", err))
        } else if err.is_decode() {
            AppError::Parse(err.to_string())
        } else {
            AppError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Parse(err.to_string())
    }
}
