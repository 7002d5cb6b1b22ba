//! Client configuration (layered: code > env > defaults).

use std::path::PathBuf;
use std::time::Duration;

use bon::Builder;
use reqwest::Url;

use crate::error::ClientError;

pub const DEFAULT_REFRESH_PATH: &str = "/auth/refresh";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(15);

const BASE_URL_VAR: &str = "NOTES_BACKEND_URL";
const REQUEST_TIMEOUT_VAR: &str = "NOTES_REQUEST_TIMEOUT_SECS";
const REFRESH_TIMEOUT_VAR: &str = "NOTES_REFRESH_TIMEOUT_SECS";
const TOKEN_DIR_VAR: &str = "NOTES_TOKEN_DIR";

/// Settings for an [`HttpClient`](crate::http::HttpClient).
///
/// # Example
/// ```
/// use std::time::Duration;
/// use notes_client::config::ClientConfig;
///
/// let config = ClientConfig::builder()
///     .base_url("https://notes.example.com")
///     .refresh_timeout(Duration::from_secs(5))
///     .build();
/// assert_eq!(config.refresh_path, "/auth/refresh");
/// ```
#[derive(Debug, Clone, Builder)]
pub struct ClientConfig {
    /// Backend origin every relative path is resolved against.
    #[builder(into)]
    pub base_url: String,
    /// Path of the token refresh endpoint.
    #[builder(into, default = DEFAULT_REFRESH_PATH.to_string())]
    pub refresh_path: String,
    /// Transport timeout applied to every request.
    #[builder(default = DEFAULT_REQUEST_TIMEOUT)]
    pub request_timeout: Duration,
    /// Upper bound on a single refresh call. Waiting requests fail once it elapses.
    #[builder(default = DEFAULT_REFRESH_TIMEOUT)]
    pub refresh_timeout: Duration,
    /// Directory for the file-backed token store. `None` means the default directory.
    #[builder(into)]
    pub token_dir: Option<PathBuf>,
}

impl ClientConfig {
    /// Load from environment variables (`NOTES_BACKEND_URL` and friends).
    ///
    /// A `.env` file in the working directory is honoured when present.
    pub fn from_env() -> Result<Self, ClientError> {
        let _ = dotenvy::dotenv();

        let base_url = std::env::var(BASE_URL_VAR)
            .map_err(|_| ClientError::Configuration(format!("{BASE_URL_VAR} is not set")))?;

        let config = Self::builder()
            .base_url(base_url)
            .request_timeout(env_secs(REQUEST_TIMEOUT_VAR)?.unwrap_or(DEFAULT_REQUEST_TIMEOUT))
            .refresh_timeout(env_secs(REFRESH_TIMEOUT_VAR)?.unwrap_or(DEFAULT_REFRESH_TIMEOUT))
            .maybe_token_dir(std::env::var_os(TOKEN_DIR_VAR).map(PathBuf::from))
            .build();
        config.validate()?;
        Ok(config)
    }

    /// Check the base URL and refresh path are usable.
    pub fn validate(&self) -> Result<(), ClientError> {
        self.parsed_base_url()?;
        if !self.refresh_path.starts_with('/') {
            return Err(ClientError::Configuration(format!(
                "refresh path must start with '/': {}",
                self.refresh_path
            )));
        }
        Ok(())
    }

    /// The base URL as an absolute http(s) URL.
    pub fn parsed_base_url(&self) -> Result<Url, ClientError> {
        let url = Url::parse(&self.base_url).map_err(|err| {
            ClientError::Configuration(format!("invalid base URL {}: {err}", self.base_url))
        })?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(ClientError::Configuration(format!(
                "unsupported base URL scheme: {other}"
            ))),
        }
    }

    /// Token directory, falling back to `~/.notes-client`.
    pub fn token_dir(&self) -> PathBuf {
        self.token_dir.clone().unwrap_or_else(default_token_dir)
    }
}

fn env_secs(var: &str) -> Result<Option<Duration>, ClientError> {
    match std::env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map(|secs| Some(Duration::from_secs(secs)))
            .map_err(|_| ClientError::Configuration(format!("{var} must be whole seconds: {raw}"))),
        Err(_) => Ok(None),
    }
}

pub(crate) fn default_token_dir() -> PathBuf {
    directories::UserDirs::new()
        .map(|dirs| dirs.home_dir().join(".notes-client"))
        .unwrap_or_else(|| PathBuf::from(".notes-client"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_applies_defaults() {
        let config = ClientConfig::builder().base_url("http://localhost:5000").build();
        assert_eq!(config.refresh_path, DEFAULT_REFRESH_PATH);
        assert_eq!(config.request_timeout, DEFAULT_REQUEST_TIMEOUT);
        assert_eq!(config.refresh_timeout, DEFAULT_REFRESH_TIMEOUT);
        assert!(config.token_dir.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_relative_base_url() {
        let config = ClientConfig::builder().base_url("/api").build();
        assert!(matches!(
            config.validate(),
            Err(ClientError::Configuration(_))
        ));
    }

    #[test]
    fn validate_rejects_non_http_scheme() {
        let config = ClientConfig::builder().base_url("ftp://notes.example.com").build();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("ftp"));
    }

    #[test]
    fn validate_rejects_refresh_path_without_slash() {
        let config = ClientConfig::builder()
            .base_url("http://localhost:5000")
            .refresh_path("auth/refresh")
            .build();
        assert!(config.validate().is_err());
    }

    #[test]
    fn explicit_token_dir_wins() {
        let config = ClientConfig::builder()
            .base_url("http://localhost:5000")
            .token_dir(PathBuf::from("/tmp/notes"))
            .build();
        assert_eq!(config.token_dir(), PathBuf::from("/tmp/notes"));
    }
}
