use serde_json::{json, Value};

use super::types::{Credentials, PasswordChange, Registration, TokenResponse, User};
use crate::error::Result;
use crate::http::HttpClient;

/// Account and session endpoints.
#[derive(Debug, Clone)]
pub struct AuthApi {
    http: HttpClient,
}

impl AuthApi {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    pub async fn register(&self, registration: &Registration) -> Result<Value> {
        let response = self.http.post("/auth/register", registration).await?;
        Ok(response.body)
    }

    /// Exchange credentials for an access token and install it.
    pub async fn login(&self, credentials: &Credentials) -> Result<TokenResponse> {
        let issued: TokenResponse = self
            .http
            .post("/auth/login", credentials)
            .await?
            .into_json()?;
        self.http.coordinator().establish(issued.access_token.clone());
        tracing::info!(email = %credentials.email, "Logged in");
        Ok(issued)
    }

    pub async fn who_am_i(&self) -> Result<User> {
        self.http.get("/auth/who_am_i").await?.into_json()
    }

    /// Refresh explicitly, outside of 401 recovery, and install the new token.
    pub async fn refresh(&self) -> Result<String> {
        let token = self.http.refresh().await?;
        self.http.coordinator().establish(token.clone());
        Ok(token)
    }

    /// End the session on the backend. The local token and cookies are
    /// dropped whether or not the backend call succeeds.
    pub async fn logout(&self) -> Result<()> {
        let result = self.http.post("/auth/logout", &json!({})).await;
        self.http.coordinator().end_session();
        self.http.cookies().forget();
        if let Err(err) = &result {
            tracing::warn!(error = %err, "Logout request failed; local session cleared anyway");
        }
        result.map(|_| ())
    }

    /// A 401 here is not retried after the first refresh attempt, so a wrong
    /// current password surfaces as an authentication error.
    pub async fn update_password(&self, change: &PasswordChange) -> Result<()> {
        self.http.put("/auth/password", change).await?;
        Ok(())
    }
}
