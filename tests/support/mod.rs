//! Shared helpers for integration tests against a mocked backend.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use notes_client::auth::{MemoryTokenStore, TerminationReason, TokenStore};
use notes_client::config::ClientConfig;
use notes_client::http::HttpClient;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const REFRESH_PATH: &str = "/auth/refresh";

pub fn config(server: &MockServer) -> ClientConfig {
    ClientConfig::builder()
        .base_url(server.uri())
        .refresh_timeout(Duration::from_secs(2))
        .request_timeout(Duration::from_secs(5))
        .build()
}

/// Client backed by `store`, talking to `server`.
pub fn client(server: &MockServer, store: Arc<dyn TokenStore>) -> HttpClient {
    HttpClient::builder(config(server))
        .token_store(store)
        .build()
        .expect("client")
}

/// Client whose stored access token is `token`.
pub fn client_with_token(server: &MockServer, token: &str) -> (HttpClient, Arc<MemoryTokenStore>) {
    let store = Arc::new(MemoryTokenStore::with_access_token(token));
    (client(server, store.clone()), store)
}

/// Records every termination signal the client emits.
#[derive(Clone, Default)]
pub struct Terminations {
    count: Arc<AtomicUsize>,
    reasons: Arc<Mutex<Vec<TerminationReason>>>,
}

impl Terminations {
    pub fn attach(client: &HttpClient) -> Self {
        let terminations = Self::default();
        let seen = terminations.clone();
        client.on_session_terminated(move |reason: &TerminationReason| {
            seen.count.fetch_add(1, Ordering::SeqCst);
            seen.reasons.lock().unwrap().push(reason.clone());
        });
        terminations
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    pub fn reasons(&self) -> Vec<TerminationReason> {
        self.reasons.lock().unwrap().clone()
    }
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

pub fn unauthorized() -> ResponseTemplate {
    ResponseTemplate::new(401).set_body_json(json!({ "msg": "Token has expired" }))
}

/// Refresh endpoint that issues `token`.
pub async fn mount_refresh(server: &MockServer, token: &str) {
    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access_token": token })))
        .mount(server)
        .await;
}

/// Number of calls the backend saw to `path`.
pub async fn hits(server: &MockServer, target: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.url.path() == target)
        .count()
}

/// Authorization headers of every call the backend saw to `path`, in order.
pub async fn authorizations(server: &MockServer, target: &str) -> Vec<Option<String>> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.url.path() == target)
        .map(|request| {
            request
                .headers
                .get("authorization")
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
        })
        .collect()
}
