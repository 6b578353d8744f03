//! Authenticated sessions against a tenant's identity provider.
//!
//! Two entry points:
//!
//! - [`AuthSession::client_credentials`]: confidential client id/secret. A failed
//!   initial exchange degrades the session (no initial token) instead of failing.
//! - [`AuthSession::api_key`]: long-lived API key used as a refresh token. A failed
//!   exchange fails the session.
//!
//! Both build the HTTP client with redirect following disabled so redirect
//! responses reach the caller as-is.

use std::sync::Arc;

use crate::error::{OAuthError, Result};
use crate::oauth::{OAuthConfig, OAuthTokens};
use crate::token_source::{
    ClientCredentialsSource, RefreshTokenSource, SharedTokenSource, TokenSource,
};

/// Credentials for one session. Exactly one variant is used per client.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Confidential client id/secret (`client_credentials` grant).
    ClientSecret {
        client_id: String,
        client_secret: String,
    },
    /// Long-lived API key exchanged as a refresh token.
    ApiKey { api_key: String },
}

impl Credentials {
    pub fn client_secret(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self::ClientSecret {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    pub fn api_key(api_key: impl Into<String>) -> Self {
        Self::ApiKey {
            api_key: api_key.into(),
        }
    }

    /// Whether every field of the variant is non-empty.
    pub fn is_complete(&self) -> bool {
        match self {
            Self::ClientSecret {
                client_id,
                client_secret,
            } => !client_id.is_empty() && !client_secret.is_empty(),
            Self::ApiKey { api_key } => !api_key.is_empty(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ClientSecret { client_id, .. } => f
                .debug_struct("ClientSecret")
                .field("client_id", client_id)
                .field("client_secret", &"<redacted>")
                .finish(),
            Self::ApiKey { .. } => f
                .debug_struct("ApiKey")
                .field("api_key", &"<redacted>")
                .finish(),
        }
    }
}

/// Build the base HTTP client: the caller's settings with redirects disabled.
pub fn build_http_client(builder: reqwest::ClientBuilder) -> Result<reqwest::Client> {
    builder
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .map_err(OAuthError::from)
}

/// HTTP client paired with the token source that authorizes its requests.
#[derive(Debug, Clone)]
pub struct AuthTransport {
    http: reqwest::Client,
    tokens: SharedTokenSource,
}

impl AuthTransport {
    pub fn new(http: reqwest::Client, tokens: SharedTokenSource) -> Self {
        Self { http, tokens }
    }

    /// The underlying (redirect-disabled) HTTP client.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub fn tokens(&self) -> &SharedTokenSource {
        &self.tokens
    }

    /// Attach a bearer token, refreshing it first if it has expired.
    pub async fn authorize(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::RequestBuilder> {
        let token = self.tokens.access_token().await?;
        Ok(request.bearer_auth(token))
    }
}

/// An authenticated session: the transport plus the token minted at start-up.
#[derive(Debug)]
pub struct AuthSession {
    transport: AuthTransport,
    initial_token: Option<String>,
}

impl AuthSession {
    /// Start a session with whichever grant `credentials` calls for.
    pub async fn start(
        http: reqwest::ClientBuilder,
        iam_url: &str,
        tenant: &str,
        credentials: &Credentials,
    ) -> Result<Self> {
        match credentials {
            Credentials::ClientSecret {
                client_id,
                client_secret,
            } => Self::client_credentials(http, iam_url, tenant, client_id, client_secret).await,
            Credentials::ApiKey { api_key } => Self::api_key(http, iam_url, tenant, api_key).await,
        }
    }

    /// Start a session with the `client_credentials` grant.
    pub async fn client_credentials(
        http: reqwest::ClientBuilder,
        iam_url: &str,
        tenant: &str,
        client_id: &str,
        client_secret: &str,
    ) -> Result<Self> {
        require(&[
            ("iam_url", iam_url),
            ("tenant", tenant),
            ("client_id", client_id),
            ("client_secret", client_secret),
        ])?;

        let http = build_http_client(http)?;
        let source = Arc::new(ClientCredentialsSource::new(
            http.clone(),
            OAuthConfig::for_tenant(iam_url, tenant, client_id),
            client_secret,
        ));

        let initial_token = match source.access_token().await {
            Ok(token) => Some(token),
            Err(e) => {
                tracing::warn!(
                    "Error retrieving token data: {}. License information will not be available",
                    e
                );
                None
            }
        };

        Ok(Self {
            transport: AuthTransport::new(http, source),
            initial_token,
        })
    }

    /// Start a session by exchanging an API key as a refresh token.
    pub async fn api_key(
        http: reqwest::ClientBuilder,
        iam_url: &str,
        tenant: &str,
        api_key: &str,
    ) -> Result<Self> {
        require(&[("iam_url", iam_url), ("tenant", tenant), ("api_key", api_key)])?;

        let http = build_http_client(http)?;
        let source = Arc::new(RefreshTokenSource::new(
            http.clone(),
            OAuthConfig::api_key(iam_url, tenant),
            OAuthTokens::expired_refresh(api_key),
        ));

        let token = source.access_token().await?;

        Ok(Self {
            transport: AuthTransport::new(http, source),
            initial_token: Some(token),
        })
    }

    /// Wrap an existing transport, e.g. one using a pre-minted token.
    pub fn from_transport(transport: AuthTransport, initial_token: Option<String>) -> Self {
        Self {
            transport,
            initial_token,
        }
    }

    pub fn transport(&self) -> &AuthTransport {
        &self.transport
    }

    /// Access token obtained when the session started, if the exchange succeeded.
    pub fn initial_token(&self) -> Option<&str> {
        self.initial_token.as_deref()
    }

    pub fn into_parts(self) -> (AuthTransport, Option<String>) {
        (self.transport, self.initial_token)
    }
}

fn require(fields: &[(&str, &str)]) -> Result<()> {
    match fields.iter().find(|(_, value)| value.is_empty()) {
        Some((name, _)) => Err(OAuthError::InvalidRequest(format!("{} is required", name))),
        None => Ok(()),
    }
}
