//! Ordered request/response stages applied around every network call.

use std::fmt;
use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::auth::AccessToken;
use crate::error::Result;
use crate::transform;

/// Per-call switches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOptions {
    /// Do not attach the shared access token.
    pub skip_auth: bool,
    /// Extra headers, applied before any stage runs.
    pub headers: Vec<(String, String)>,
    /// Query string pairs, sent verbatim.
    pub query: Vec<(String, String)>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn skip_auth(mut self) -> Self {
        self.skip_auth = true;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }
}

/// A fully described request. Kept in application naming so it can be
/// replayed after a token refresh.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Value>,
    pub skip_auth: bool,
    /// Set on the single reissue after a refresh. A retried request is never recovered again.
    pub retried: bool,
}

impl PendingRequest {
    /// Bearer token carried in the authorization header, if any.
    pub fn bearer(&self) -> Option<&str> {
        self.headers
            .get(AUTHORIZATION)?
            .to_str()
            .ok()?
            .strip_prefix("Bearer ")
    }

    /// Pin the authorization header to `token`.
    pub fn authorize(&mut self, token: &str) {
        match HeaderValue::from_str(&format!("Bearer {token}")) {
            Ok(value) => {
                self.headers.insert(AUTHORIZATION, value);
            }
            Err(_) => tracing::warn!("Access token is not a valid header value"),
        }
    }
}

/// A received response, body already decoded as JSON when possible.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl ApiResponse {
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.body.clone())?)
    }

    pub fn into_json<T: DeserializeOwned>(self) -> Result<T> {
        Ok(serde_json::from_value(self.body)?)
    }
}

/// Runs on a copy of the request immediately before it is sent.
pub trait RequestStage: Send + Sync {
    fn name(&self) -> &'static str;
    fn on_request(&self, request: &mut PendingRequest);
}

/// Runs on every received response, success or failure, before status checks.
pub trait ResponseStage: Send + Sync {
    fn name(&self) -> &'static str;
    fn on_response(&self, response: &mut ApiResponse);
}

/// Rewrites body keys between application and wire naming.
#[derive(Debug, Clone, Copy, Default)]
pub struct WireKeys;

impl RequestStage for WireKeys {
    fn name(&self) -> &'static str {
        "wire_keys"
    }

    fn on_request(&self, request: &mut PendingRequest) {
        if let Some(body) = request.body.take() {
            request.body = Some(transform::to_wire(body));
        }
    }
}

impl ResponseStage for WireKeys {
    fn name(&self) -> &'static str {
        "wire_keys"
    }

    fn on_response(&self, response: &mut ApiResponse) {
        let body = std::mem::take(&mut response.body);
        response.body = transform::from_wire(body);
    }
}

/// Attaches the shared access token as a bearer credential.
///
/// Leaves the request alone when it opts out with `skip_auth`, when there is
/// no token, or when it already carries an authorization header.
#[derive(Debug, Clone)]
pub struct BearerAuth {
    token: AccessToken,
}

impl BearerAuth {
    pub fn new(token: AccessToken) -> Self {
        Self { token }
    }
}

impl RequestStage for BearerAuth {
    fn name(&self) -> &'static str {
        "bearer_auth"
    }

    fn on_request(&self, request: &mut PendingRequest) {
        if request.skip_auth || request.headers.contains_key(AUTHORIZATION) {
            return;
        }
        if let Some(token) = self.token.get() {
            request.authorize(&token);
        }
    }
}

/// Ordered list of stages.
#[derive(Clone, Default)]
pub struct Pipeline {
    request: Vec<Arc<dyn RequestStage>>,
    response: Vec<Arc<dyn ResponseStage>>,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("request", &self.request.iter().map(|s| s.name()).collect::<Vec<_>>())
            .field("response", &self.response.iter().map(|s| s.name()).collect::<Vec<_>>())
            .finish()
    }
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Key translation, then bearer auth; responses get key translation.
    pub fn standard(token: AccessToken) -> Self {
        Self::new()
            .with_request_stage(Arc::new(WireKeys))
            .with_request_stage(Arc::new(BearerAuth::new(token)))
            .with_response_stage(Arc::new(WireKeys))
    }

    pub fn with_request_stage(mut self, stage: Arc<dyn RequestStage>) -> Self {
        self.request.push(stage);
        self
    }

    pub fn with_response_stage(mut self, stage: Arc<dyn ResponseStage>) -> Self {
        self.response.push(stage);
        self
    }

    /// Copy of `request` with every request stage applied in order.
    pub fn prepare(&self, request: &PendingRequest) -> PendingRequest {
        let mut prepared = request.clone();
        for stage in &self.request {
            stage.on_request(&mut prepared);
        }
        prepared
    }

    pub fn receive(&self, response: &mut ApiResponse) {
        for stage in &self.response {
            stage.on_response(response);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MemoryTokenStore;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn pending(body: Option<Value>) -> PendingRequest {
        PendingRequest {
            method: Method::POST,
            url: Url::parse("http://localhost/test").unwrap(),
            headers: HeaderMap::new(),
            body,
            skip_auth: false,
            retried: false,
        }
    }

    fn token(value: Option<&str>) -> AccessToken {
        let store = match value {
            Some(value) => MemoryTokenStore::with_access_token(value),
            None => MemoryTokenStore::new(),
        };
        AccessToken::load(Arc::new(store))
    }

    #[test]
    fn standard_pipeline_transforms_and_authorizes_a_copy() {
        let pipeline = Pipeline::standard(token(Some("test-token")));
        let original = pending(Some(json!({ "firstName": "John" })));

        let prepared = pipeline.prepare(&original);

        assert_eq!(prepared.body, Some(json!({ "first_name": "John" })));
        assert_eq!(prepared.bearer(), Some("test-token"));
        assert_eq!(original.body, Some(json!({ "firstName": "John" })));
        assert!(original.bearer().is_none());
    }

    #[test]
    fn no_token_means_no_authorization_header() {
        let prepared = Pipeline::standard(token(None)).prepare(&pending(None));
        assert!(!prepared.headers.contains_key(AUTHORIZATION));
    }

    #[test]
    fn skip_auth_is_respected() {
        let mut request = pending(None);
        request.skip_auth = true;
        let prepared = Pipeline::standard(token(Some("test-token"))).prepare(&request);
        assert!(prepared.bearer().is_none());
    }

    #[test]
    fn pinned_authorization_is_not_overwritten() {
        let mut request = pending(None);
        request.authorize("pinned");
        let prepared = Pipeline::standard(token(Some("other"))).prepare(&request);
        assert_eq!(prepared.bearer(), Some("pinned"));
    }

    #[test]
    fn responses_are_camelized() {
        let mut response = ApiResponse {
            status: StatusCode::BAD_REQUEST,
            headers: HeaderMap::new(),
            body: json!({ "error_message": "Invalid credentials" }),
        };
        Pipeline::standard(token(None)).receive(&mut response);
        assert_eq!(response.body, json!({ "errorMessage": "Invalid credentials" }));
    }

    #[test]
    fn stages_run_in_insertion_order() {
        struct Stamp(&'static str);
        impl RequestStage for Stamp {
            fn name(&self) -> &'static str {
                self.0
            }
            fn on_request(&self, request: &mut PendingRequest) {
                let mut seen = request.body.take().unwrap_or(json!([]));
                if let Value::Array(items) = &mut seen {
                    items.push(json!(self.0));
                }
                request.body = Some(seen);
            }
        }

        let pipeline = Pipeline::new()
            .with_request_stage(Arc::new(Stamp("first")))
            .with_request_stage(Arc::new(Stamp("second")));
        let prepared = pipeline.prepare(&pending(None));

        assert_eq!(prepared.body, Some(json!(["first", "second"])));
        assert_eq!(
            format!("{pipeline:?}"),
            r#"Pipeline { request: ["first", "second"], response: [] }"#
        );
    }
}
