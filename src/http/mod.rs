//! The shared request-issuing client.
//!
//! Every call goes through the same [`Pipeline`] and, on a 401, through the
//! [`RefreshCoordinator`]: the failed request is replayed once with the
//! refreshed token, or the original 401 is surfaced if the refresh fails.

pub mod pipeline;

pub use pipeline::{
    ApiResponse, BearerAuth, Pipeline, PendingRequest, RequestOptions, RequestStage,
    ResponseStage, WireKeys,
};

use std::fmt;
use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, Url};
use serde::Serialize;
use serde_json::{json, Value};

use crate::auth::cookies::CSRF_HEADER;
use crate::auth::{
    AccessToken, FileTokenStore, RefreshCoordinator, SessionCookies, SessionListener,
    TerminationReason, TokenStore,
};
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};

/// Cheaply clonable handle; clones share token, refresh state, and cookies.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use notes_client::auth::MemoryTokenStore;
/// use notes_client::config::ClientConfig;
/// use notes_client::http::HttpClient;
///
/// # async fn example() -> notes_client::error::Result<()> {
/// let config = ClientConfig::builder().base_url("http://localhost:5000").build();
/// let client = HttpClient::builder(config)
///     .token_store(Arc::new(MemoryTokenStore::new()))
///     .session_listener(|reason: &notes_client::auth::TerminationReason| {
///         eprintln!("logged out: {reason}");
///     })
///     .build()?;
/// let me = client.get("/auth/who_am_i").await?;
/// println!("{}", me.body);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct HttpClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: reqwest::Client,
    config: ClientConfig,
    base_url: Url,
    pipeline: Pipeline,
    coordinator: RefreshCoordinator,
    cookies: Arc<SessionCookies>,
}

impl fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("pipeline", &self.inner.pipeline)
            .field("coordinator", &self.inner.coordinator)
            .finish()
    }
}

/// Assembles an [`HttpClient`].
pub struct HttpClientBuilder {
    config: ClientConfig,
    store: Option<Arc<dyn TokenStore>>,
    listeners: Vec<Arc<dyn SessionListener>>,
    request_stages: Vec<Arc<dyn RequestStage>>,
    response_stages: Vec<Arc<dyn ResponseStage>>,
}

impl HttpClientBuilder {
    /// Persist the token and cookies here instead of the file store in `config.token_dir`.
    pub fn token_store(mut self, store: Arc<dyn TokenStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn session_listener(mut self, listener: impl SessionListener + 'static) -> Self {
        self.listeners.push(Arc::new(listener));
        self
    }

    /// Appended after the standard request stages.
    pub fn request_stage(mut self, stage: Arc<dyn RequestStage>) -> Self {
        self.request_stages.push(stage);
        self
    }

    /// Appended after the standard response stages.
    pub fn response_stage(mut self, stage: Arc<dyn ResponseStage>) -> Self {
        self.response_stages.push(stage);
        self
    }

    pub fn build(self) -> Result<HttpClient> {
        self.config.validate()?;
        let base_url = self.config.parsed_base_url()?;
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(FileTokenStore::new(self.config.token_dir())));

        let token = AccessToken::load(store.clone());
        let coordinator = RefreshCoordinator::new(token.clone(), self.config.refresh_timeout);
        for listener in self.listeners {
            coordinator.add_listener(listener);
        }

        let pipeline = self
            .request_stages
            .into_iter()
            .fold(Pipeline::standard(token), Pipeline::with_request_stage);
        let pipeline = self
            .response_stages
            .into_iter()
            .fold(pipeline, Pipeline::with_response_stage);

        let cookies = Arc::new(SessionCookies::load(store));
        let http = reqwest::Client::builder()
            .timeout(self.config.request_timeout)
            .cookie_provider(cookies.clone())
            .build()
            .map_err(|err| ClientError::Configuration(format!("HTTP client: {err}")))?;

        Ok(HttpClient {
            inner: Arc::new(ClientInner {
                http,
                config: self.config,
                base_url,
                pipeline,
                coordinator,
                cookies,
            }),
        })
    }
}

impl HttpClient {
    pub fn builder(config: ClientConfig) -> HttpClientBuilder {
        HttpClientBuilder {
            config,
            store: None,
            listeners: Vec::new(),
            request_stages: Vec::new(),
            response_stages: Vec::new(),
        }
    }

    /// Client with the default file-backed store.
    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::builder(config).build()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn access_token(&self) -> &AccessToken {
        self.inner.coordinator.token()
    }

    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.inner.coordinator
    }

    pub fn cookies(&self) -> &SessionCookies {
        &self.inner.cookies
    }

    pub fn on_session_terminated(&self, listener: impl SessionListener + 'static) {
        self.inner.coordinator.add_listener(Arc::new(listener));
    }

    pub async fn get(&self, path: &str) -> Result<ApiResponse> {
        self.request(Method::GET, path, None, RequestOptions::default())
            .await
    }

    pub async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<ApiResponse> {
        self.request(Method::POST, path, Some(serde_json::to_value(body)?), RequestOptions::default())
            .await
    }

    pub async fn put<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<ApiResponse> {
        self.request(Method::PUT, path, Some(serde_json::to_value(body)?), RequestOptions::default())
            .await
    }

    pub async fn delete(&self, path: &str) -> Result<ApiResponse> {
        self.request(Method::DELETE, path, None, RequestOptions::default())
            .await
    }

    /// Issue a request. `path` is resolved against the base URL unless it is
    /// already an absolute http(s) URL.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        options: RequestOptions,
    ) -> Result<ApiResponse> {
        let pending = self.describe(method, path, body, options)?;
        let prepared = self.inner.pipeline.prepare(&pending);
        let sent_with = prepared.bearer().map(str::to_owned);
        match self.send(prepared).await {
            Err(err) if err.is_authentication() => self.recover(pending, sent_with, err).await,
            other => other,
        }
    }

    /// Options for a call to the refresh endpoint: no bearer token, CSRF header when known.
    pub fn refresh_options(&self) -> RequestOptions {
        let options = RequestOptions::new().skip_auth();
        match self.refresh_url().ok().and_then(|url| self.inner.cookies.csrf_token(&url)) {
            Some(csrf) => options.with_header(CSRF_HEADER, csrf),
            None => options,
        }
    }

    /// Same origin and path as the configured refresh endpoint; the query is ignored.
    pub fn is_refresh_endpoint(&self, url: &Url) -> bool {
        self.refresh_url()
            .is_ok_and(|refresh| refresh.origin() == url.origin() && refresh.path() == url.path())
    }

    async fn recover(
        &self,
        mut pending: PendingRequest,
        sent_with: Option<String>,
        original: ClientError,
    ) -> Result<ApiResponse> {
        if self.is_refresh_endpoint(&pending.url) {
            tracing::warn!("Refresh endpoint rejected the session");
            self.inner
                .coordinator
                .terminate_session(TerminationReason::RefreshRejected);
            return Err(original);
        }

        tracing::debug!(url = %pending.url, "401 received, attempting token refresh");
        let client = self.clone();
        let refreshed = self
            .inner
            .coordinator
            .refreshed_token(sent_with.as_deref(), move || async move {
                client.refresh().await
            })
            .await;
        let token = match refreshed {
            Ok(token) => token,
            Err(failure) => {
                tracing::debug!(%failure, url = %pending.url, "Not retrying after 401");
                return Err(original);
            }
        };

        tracing::debug!(url = %pending.url, "Retrying request with refreshed token");
        pending.authorize(&token);
        pending.retried = true;
        let prepared = self.inner.pipeline.prepare(&pending);
        match self.send(prepared).await {
            Err(err) if err.is_authentication() => {
                tracing::debug!(url = %pending.url, "Retried request rejected again");
                Err(err)
            }
            other => other,
        }
    }

    /// Call the refresh endpoint and return the issued token.
    ///
    /// This is the raw network exchange: it neither installs the token nor
    /// recovers from its own 401. Use [`crate::api::AuthApi::refresh`] to
    /// install the result.
    pub async fn refresh(&self) -> Result<String> {
        let pending = self.describe(
            Method::POST,
            &self.inner.config.refresh_path,
            Some(json!({})),
            self.refresh_options(),
        )?;
        let response = self.send(self.inner.pipeline.prepare(&pending)).await?;
        extract_access_token(&response.body)
    }

    fn refresh_url(&self) -> Result<Url> {
        self.resolve(&self.inner.config.refresh_path)
    }

    fn resolve(&self, path: &str) -> Result<Url> {
        if path.starts_with("http://") || path.starts_with("https://") {
            return Url::parse(path)
                .map_err(|err| ClientError::Configuration(format!("invalid URL {path}: {err}")));
        }
        let base = self.inner.base_url.as_str().trim_end_matches('/');
        let joined = if path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        };
        Url::parse(&joined)
            .map_err(|err| ClientError::Configuration(format!("invalid URL {joined}: {err}")))
    }

    fn describe(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        options: RequestOptions,
    ) -> Result<PendingRequest> {
        let mut url = self.resolve(path)?;
        if !options.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&options.query);
        }

        let mut headers = HeaderMap::new();
        for (name, value) in &options.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|err| ClientError::Configuration(format!("header {name}: {err}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|err| ClientError::Configuration(format!("header {name}: {err}")))?;
            headers.insert(name, value);
        }

        Ok(PendingRequest {
            method,
            url,
            headers,
            body,
            skip_auth: options.skip_auth,
            retried: false,
        })
    }

    async fn send(&self, prepared: PendingRequest) -> Result<ApiResponse> {
        let PendingRequest {
            method,
            url,
            headers,
            body,
            ..
        } = prepared;
        tracing::debug!(%method, %url, "Sending request");

        let mut builder = self.inner.http.request(method, url).headers(headers);
        if let Some(body) = &body {
            builder = builder.json(body);
        }
        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.bytes().await?;

        let mut received = ApiResponse {
            status,
            headers,
            body: decode_body(&bytes),
        };
        self.inner.pipeline.receive(&mut received);

        if status.is_success() {
            Ok(received)
        } else {
            tracing::debug!(status = status.as_u16(), "Request failed");
            Err(ClientError::from_status(status.as_u16(), received.body))
        }
    }
}

fn decode_body(bytes: &[u8]) -> Value {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Value::Null;
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}

/// Pull `accessToken` out of an already camelized body.
pub(crate) fn extract_access_token(body: &Value) -> Result<String> {
    #[derive(serde::Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Issued {
        access_token: String,
    }
    let issued: Issued = serde_json::from_value(body.clone())?;
    Ok(issued.access_token)
}
