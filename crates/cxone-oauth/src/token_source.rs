//! Token sources: cached access tokens with on-demand refresh.
//!
//! A token source hands out a valid access token, going back to the token
//! endpoint only when the cached one is missing or expired. Refreshes are
//! serialized so concurrent requests share one exchange.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::{OAuthError, Result};
use crate::oauth::{OAuthConfig, OAuthTokens, refresh_access_token, request_client_credentials};

// ============================================================================
// TokenSource Trait
// ============================================================================

/// Supplies bearer tokens for outgoing requests.
#[async_trait]
pub trait TokenSource: Send + Sync + fmt::Debug {
    /// Get a valid access token, refreshing if necessary.
    async fn access_token(&self) -> Result<String>;

    /// The currently cached token set, if any.
    async fn current_tokens(&self) -> Option<OAuthTokens>;
}

/// Token source shared between the session and its transport.
pub type SharedTokenSource = Arc<dyn TokenSource>;

// ============================================================================
// ClientCredentialsSource
// ============================================================================

/// Mints tokens with the `client_credentials` grant whenever the cached one expires.
pub struct ClientCredentialsSource {
    http: reqwest::Client,
    config: OAuthConfig,
    client_secret: String,
    cached: Mutex<Option<OAuthTokens>>,
}

impl ClientCredentialsSource {
    pub fn new(http: reqwest::Client, config: OAuthConfig, client_secret: impl Into<String>) -> Self {
        Self {
            http,
            config,
            client_secret: client_secret.into(),
            cached: Mutex::new(None),
        }
    }
}

impl fmt::Debug for ClientCredentialsSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentialsSource")
            .field("client_id", &self.config.client_id)
            .field("token_url", &self.config.token_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl TokenSource for ClientCredentialsSource {
    async fn access_token(&self) -> Result<String> {
        let mut cached = self.cached.lock().await;
        if let Some(tokens) = cached.as_ref()
            && !tokens.is_expired()
        {
            return Ok(tokens.access_token.clone());
        }

        let tokens =
            request_client_credentials(&self.http, &self.config, &self.client_secret).await?;
        tracing::debug!(client_id = %self.config.client_id, "Minted new access token");
        let access_token = tokens.access_token.clone();
        *cached = Some(tokens);
        Ok(access_token)
    }

    async fn current_tokens(&self) -> Option<OAuthTokens> {
        self.cached.lock().await.clone()
    }
}

// ============================================================================
// RefreshTokenSource
// ============================================================================

/// Refreshes access tokens with the `refresh_token` grant.
///
/// Seeded with an expired token set carrying only the refresh token (for API-key
/// sessions the API key itself), so the first call always hits the endpoint.
pub struct RefreshTokenSource {
    http: reqwest::Client,
    config: OAuthConfig,
    cached: Mutex<OAuthTokens>,
}

impl RefreshTokenSource {
    pub fn new(http: reqwest::Client, config: OAuthConfig, seed: OAuthTokens) -> Self {
        Self {
            http,
            config,
            cached: Mutex::new(seed),
        }
    }
}

impl fmt::Debug for RefreshTokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshTokenSource")
            .field("client_id", &self.config.client_id)
            .field("token_url", &self.config.token_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl TokenSource for RefreshTokenSource {
    async fn access_token(&self) -> Result<String> {
        let mut cached = self.cached.lock().await;
        if !cached.is_expired() {
            return Ok(cached.access_token.clone());
        }

        let refresh_token = cached
            .refresh_token
            .clone()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| OAuthError::InvalidRequest("no refresh token available".to_string()))?;

        let mut tokens = refresh_access_token(&self.http, &self.config, &refresh_token).await?;
        if tokens.refresh_token.as_deref().is_none_or(str::is_empty) {
            tokens.refresh_token = Some(refresh_token);
        }

        tracing::debug!(client_id = %self.config.client_id, "Access token refreshed");
        let access_token = tokens.access_token.clone();
        *cached = tokens;
        Ok(access_token)
    }

    async fn current_tokens(&self) -> Option<OAuthTokens> {
        let cached = self.cached.lock().await;
        if cached.access_token.is_empty() {
            None
        } else {
            Some(cached.clone())
        }
    }
}

// ============================================================================
// StaticTokenSource
// ============================================================================

/// Always returns the same pre-minted token. Never refreshes.
pub struct StaticTokenSource {
    tokens: OAuthTokens,
}

impl StaticTokenSource {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            tokens: OAuthTokens {
                access_token: access_token.into(),
                refresh_token: None,
                expires_in: None,
                token_type: Some("Bearer".to_string()),
                scope: None,
                expires_at: None,
            },
        }
    }

    /// Wrap in an `Arc` for use as a [`SharedTokenSource`].
    pub fn shared(access_token: impl Into<String>) -> SharedTokenSource {
        Arc::new(Self::new(access_token))
    }
}

impl fmt::Debug for StaticTokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticTokenSource").finish_non_exhaustive()
    }
}

#[async_trait]
impl TokenSource for StaticTokenSource {
    async fn access_token(&self) -> Result<String> {
        Ok(self.tokens.access_token.clone())
    }

    async fn current_tokens(&self) -> Option<OAuthTokens> {
        Some(self.tokens.clone())
    }
}
