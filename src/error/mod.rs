//! Error types for the notes client.

use serde_json::Value;
use strum::Display;
use thiserror::Error;

/// Primary error type for every client operation.
#[derive(Error, Debug)]
pub enum ClientError {
    /// No response was received (connection refused, DNS, TLS, transport timeout).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The backend answered with a non-2xx status other than 401.
    #[error("HTTP error (status {status}): {}", describe(.body))]
    Http { status: u16, body: Value },

    /// The backend rejected the credential (401).
    #[error("Authentication error: {}", describe(.body))]
    Authentication { body: Value },

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Broad error category for consumer-side messaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorCategory {
    Authentication,
    Client,
    Server,
    Network,
    Timeout,
    Configuration,
    Serialization,
    Storage,
}

impl ClientError {
    /// Build the error matching a non-success status and its (already camelized) body.
    pub fn from_status(status: u16, body: Value) -> Self {
        if status == 401 {
            Self::Authentication { body }
        } else {
            Self::Http { status, body }
        }
    }

    /// HTTP status carried by this error, if a response was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Authentication { .. } => Some(401),
            Self::Network(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Response body carried by this error, if any.
    pub fn body(&self) -> Option<&Value> {
        match self {
            Self::Http { body, .. } | Self::Authentication { body } => Some(body),
            _ => None,
        }
    }

    /// The backend's `message` field, when the error body has one.
    pub fn message(&self) -> Option<&str> {
        self.body()?.get("message")?.as_str()
    }

    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }

    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Authentication { .. } => ErrorCategory::Authentication,
            Self::Http { status, .. } => match status {
                403 => ErrorCategory::Authentication,
                500..=599 => ErrorCategory::Server,
                _ => ErrorCategory::Client,
            },
            Self::Network(err) if err.is_timeout() => ErrorCategory::Timeout,
            Self::Network(_) => ErrorCategory::Network,
            Self::Timeout(_) => ErrorCategory::Timeout,
            Self::Configuration(_) => ErrorCategory::Configuration,
            Self::Serialization(_) => ErrorCategory::Serialization,
            Self::Storage(_) | Self::Io(_) => ErrorCategory::Storage,
        }
    }

    /// Whether retrying the same call later could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Network | ErrorCategory::Timeout | ErrorCategory::Server
        )
    }
}

fn describe(body: &Value) -> String {
    match body.get("message").and_then(Value::as_str) {
        Some(message) => message.to_string(),
        None if body.is_null() => "<empty body>".to_string(),
        None => body.to_string(),
    }
}

impl From<toml::de::Error> for ClientError {
    fn from(error: toml::de::Error) -> Self {
        Self::Storage(error.to_string())
    }
}

impl From<toml::ser::Error> for ClientError {
    fn from(error: toml::ser::Error) -> Self {
        Self::Storage(error.to_string())
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, ClientError>;
