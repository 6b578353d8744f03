//! Token endpoint exchange for the tenant's identity provider.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{OAuthError, Result};

/// Public client id used when exchanging an API key for access tokens.
pub const API_KEY_CLIENT_ID: &str = "ast-app";

/// Tokens are treated as expired this long before their actual expiry.
const EXPIRY_BUFFER_SECS: i64 = 10;

/// Token endpoint configuration for one tenant.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub token_url: String,
}

impl OAuthConfig {
    /// Config for a confidential client registered in `tenant`'s realm.
    pub fn for_tenant(iam_url: &str, tenant: &str, client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            token_url: token_url(iam_url, tenant),
        }
    }

    /// Config for API-key sessions, which use the fixed public client.
    pub fn api_key(iam_url: &str, tenant: &str) -> Self {
        Self::for_tenant(iam_url, tenant, API_KEY_CLIENT_ID)
    }
}

/// Build the OpenID Connect token endpoint URL for a tenant realm.
pub fn token_url(iam_url: &str, tenant: &str) -> String {
    format!(
        "{}/auth/realms/{}/protocol/openid-connect/token",
        iam_url.trim_end_matches('/'),
        tenant
    )
}

/// Tokens returned from the token endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthTokens {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    /// Absolute expiry computed from `expires_in` when the token was received.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl OAuthTokens {
    /// A token set holding only a refresh token that must be exchanged before use.
    pub fn expired_refresh(refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: String::new(),
            refresh_token: Some(refresh_token.into()),
            expires_in: None,
            token_type: None,
            scope: None,
            expires_at: Some(Utc::now()),
        }
    }

    /// Compute `expires_at` relative to `now`. Tokens without `expires_in` never expire.
    pub fn stamp_expiry(&mut self, now: DateTime<Utc>) {
        self.expires_at = self
            .expires_in
            .and_then(|secs| i64::try_from(secs).ok())
            .and_then(TimeDelta::try_seconds)
            .and_then(|delta| now.checked_add_signed(delta));
    }

    /// Whether the access token is missing or (nearly) expired at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        if self.access_token.is_empty() {
            return true;
        }
        match self.expires_at {
            Some(at) => now + TimeDelta::seconds(EXPIRY_BUFFER_SECS) >= at,
            None => false,
        }
    }

    /// Whether the access token is missing or (nearly) expired.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

/// OAuth error body (RFC 6749 §5.2).
#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// Run the `client_credentials` grant.
pub async fn request_client_credentials(
    http: &reqwest::Client,
    config: &OAuthConfig,
    client_secret: &str,
) -> Result<OAuthTokens> {
    if config.client_id.is_empty() || client_secret.is_empty() {
        return Err(OAuthError::InvalidRequest(
            "client_id and client_secret are required".to_string(),
        ));
    }

    let form = [
        ("grant_type", "client_credentials"),
        ("client_id", config.client_id.as_str()),
        ("client_secret", client_secret),
    ];
    token_request(http, config, &form, "Client credentials grant").await
}

/// Exchange a refresh token (or API key) for a fresh access token.
pub async fn refresh_access_token(
    http: &reqwest::Client,
    config: &OAuthConfig,
    refresh_token: &str,
) -> Result<OAuthTokens> {
    if refresh_token.is_empty() {
        return Err(OAuthError::InvalidRequest(
            "refresh token is required".to_string(),
        ));
    }

    let form = [
        ("grant_type", "refresh_token"),
        ("client_id", config.client_id.as_str()),
        ("refresh_token", refresh_token),
    ];
    token_request(http, config, &form, "Token refresh").await
}

async fn token_request(
    http: &reqwest::Client,
    config: &OAuthConfig,
    form: &[(&str, &str)],
    what: &str,
) -> Result<OAuthTokens> {
    tracing::debug!(token_url = %config.token_url, "{}", what);

    let response = http
        .post(&config.token_url)
        .form(form)
        .send()
        .await
        .map_err(|e| OAuthError::Network(format!("{} request failed: {}", what, e)))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<TokenErrorResponse>(&body)
            .ok()
            .and_then(|e| e.error_description.or(e.error))
            .unwrap_or(body);
        return Err(OAuthError::Backend(format!(
            "{} failed ({}): {}",
            what, status, detail
        )));
    }

    let mut tokens: OAuthTokens = response.json().await.map_err(|e| {
        OAuthError::Serialization(format!("Failed to parse token response: {}", e))
    })?;

    if tokens.access_token.is_empty() {
        return Err(OAuthError::Backend(format!(
            "{} returned no access token",
            what
        )));
    }

    tokens.stamp_expiry(Utc::now());
    Ok(tokens)
}
