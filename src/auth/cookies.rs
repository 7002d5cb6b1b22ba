//! Cookie jar that survives restarts, plus CSRF token lookup.
//!
//! The backend keeps the refresh credential in cookies and expects the value
//! of the `csrf_refresh_token` cookie echoed back in `X-CSRF-TOKEN` on refresh.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use cookie::time::{Duration, OffsetDateTime};
use cookie::Cookie;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::HeaderValue;
use reqwest::Url;
use serde::{Deserialize, Serialize};

use super::store::TokenStore;
use crate::error::ClientError;

pub const CSRF_COOKIE: &str = "csrf_refresh_token";
pub const CSRF_HEADER: &str = "X-CSRF-TOKEN";
pub const COOKIES_KEY: &str = "cookies";

/// A [`CookieStore`] that mirrors every accepted `Set-Cookie` into a [`TokenStore`].
pub struct SessionCookies {
    jar: Jar,
    store: Arc<dyn TokenStore>,
    persisted: Mutex<BTreeMap<String, PersistedCookie>>,
}

/// `raw` is a `Set-Cookie` value whose lifetime, if any, is an absolute `Expires`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedCookie {
    raw: String,
    url: String,
}

impl SessionCookies {
    /// Build a jar and replay any unexpired cookies persisted by an earlier run.
    pub fn load(store: Arc<dyn TokenStore>) -> Self {
        let mut persisted: BTreeMap<String, PersistedCookie> = match store.load(COOKIES_KEY) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|err| {
                tracing::warn!(error = %err, "Discarding unreadable persisted cookies");
                BTreeMap::new()
            }),
            Ok(None) => BTreeMap::new(),
            Err(err) => {
                tracing::warn!(error = %err, "Failed to load persisted cookies");
                BTreeMap::new()
            }
        };

        let now = OffsetDateTime::now_utc();
        persisted.retain(|_, cookie| {
            Cookie::parse(cookie.raw.as_str()).is_ok_and(|parsed| !is_expired(&parsed, now))
        });

        let jar = Jar::default();
        for cookie in persisted.values() {
            if let Ok(url) = Url::parse(&cookie.url) {
                jar.add_cookie_str(&cookie.raw, &url);
            }
        }

        Self {
            jar,
            store,
            persisted: Mutex::new(persisted),
        }
    }

    /// The CSRF token visible to `url`, if the backend has issued one.
    pub fn csrf_token(&self, url: &Url) -> Option<String> {
        let header = self.jar.cookies(url)?;
        cookie_value(header.to_str().ok()?, CSRF_COOKIE)
    }

    /// Forget every persisted cookie. Cookies already in the in-memory jar
    /// stay until the backend expires them.
    pub fn forget(&self) {
        self.lock().clear();
        if let Err(err) = self.store.clear(COOKIES_KEY) {
            tracing::warn!(error = %err, "Failed to clear persisted cookies");
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, PersistedCookie>> {
        self.persisted.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, cookies: &BTreeMap<String, PersistedCookie>) {
        let result = serde_json::to_string(cookies)
            .map_err(ClientError::from)
            .and_then(|serialized| self.store.save(COOKIES_KEY, &serialized));
        if let Err(err) = result {
            tracing::warn!(error = %err, "Failed to persist cookies");
        }
    }
}

impl CookieStore for SessionCookies {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        let headers: Vec<HeaderValue> = cookie_headers.cloned().collect();
        self.jar.set_cookies(&mut headers.iter(), url);

        let now = OffsetDateTime::now_utc();
        let mut persisted = self.lock();
        let mut changed = false;
        for raw in headers.iter().filter_map(|h| h.to_str().ok()) {
            let Ok(mut cookie) = Cookie::parse(raw) else {
                continue;
            };
            if cookie.value().is_empty() || is_expired(&cookie, now) {
                changed |= persisted.remove(cookie.name()).is_some();
                continue;
            }
            if let Some(max_age) = cookie.max_age() {
                cookie.set_max_age(None);
                cookie.set_expires(now + max_age);
            }
            persisted.insert(
                cookie.name().to_string(),
                PersistedCookie {
                    raw: cookie.to_string(),
                    url: url.to_string(),
                },
            );
            changed = true;
        }
        if changed {
            self.persist(&persisted);
        }
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        self.jar.cookies(url)
    }
}

/// `Max-Age` wins over `Expires`, as in RFC 6265.
fn is_expired(cookie: &Cookie<'_>, now: OffsetDateTime) -> bool {
    match (cookie.max_age(), cookie.expires_datetime()) {
        (Some(max_age), _) => max_age <= Duration::ZERO,
        (None, Some(expires)) => expires <= now,
        (None, None) => false,
    }
}

/// Value of `name` in a `Cookie:` request header.
pub fn cookie_value(header: &str, name: &str) -> Option<String> {
    Cookie::split_parse(header)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == name)
        .map(|cookie| cookie.value().to_string())
}
