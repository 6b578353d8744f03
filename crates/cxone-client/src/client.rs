//! Client facade: session, claims, feature flags and polling settings in one handle.

use std::collections::HashMap;
use std::fmt;

use cxone_oauth::{AuthSession, Credentials, License, TokenClaims};

use crate::api::{FlagsApi, TenantApi};
use crate::dispatch::{ApiRequest, Dispatcher, Endpoints, Surface};
use crate::error::{Error, Result};
use crate::headers::Headers;
use crate::vars::ClientVars;

const INVALID_PARAMETERS: &str = "unable to create client: invalid parameters provided";

/// CxOne API client.
///
/// Construction authenticates, decodes the token's license claims and resolves
/// the tenant's ids and feature flags. Bootstrap failures after authentication
/// are logged and leave the corresponding value empty.
///
/// # Example
///
/// ```no_run
/// use cxone_client::CxOneClient;
///
/// # async fn example() -> cxone_client::Result<()> {
/// let client = CxOneClient::builder()
///     .base_url("https://eu.ast.example.net")
///     .iam_url("https://eu.iam.example.net")
///     .tenant("acme")
///     .api_key(std::env::var("CXONE_APIKEY").unwrap_or_default())
///     .build()
///     .await?;
///
/// if client.is_engine_allowed("sast") {
///     let body = client.send(cxone_client::ApiRequest::get(
///         cxone_client::Surface::Api,
///         "/projects?limit=10",
///     )).await?;
///     println!("{}", String::from_utf8_lossy(&body));
/// }
/// # Ok(())
/// # }
/// ```
///
/// Mutating operations take `&mut self`; share the client behind a lock if
/// several tasks must refresh it. [`Dispatcher`] clones can be handed out for
/// concurrent requests.
pub struct CxOneClient {
    dispatcher: Dispatcher,
    claims: TokenClaims,
    flags: HashMap<String, bool>,
    vars: ClientVars,
    tenant_id: String,
    app_id: String,
}

impl CxOneClient {
    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Connect with a confidential client id and secret.
    pub async fn with_client_secret(
        base_url: &str,
        iam_url: &str,
        tenant: &str,
        client_id: &str,
        client_secret: &str,
    ) -> Result<Self> {
        Self::builder()
            .base_url(base_url)
            .iam_url(iam_url)
            .tenant(tenant)
            .client_secret(client_id, client_secret)
            .build()
            .await
    }

    /// Connect with an API key.
    pub async fn with_api_key(
        base_url: &str,
        iam_url: &str,
        tenant: &str,
        api_key: &str,
    ) -> Result<Self> {
        Self::builder()
            .base_url(base_url)
            .iam_url(iam_url)
            .tenant(tenant)
            .api_key(api_key)
            .build()
            .await
    }

    /// Build the facade over an existing dispatcher and run bootstrap.
    ///
    /// `initial_token` is decoded for claims; pass `None` when no token could
    /// be obtained and claims stay empty.
    pub async fn connect(dispatcher: Dispatcher, initial_token: Option<&str>) -> Self {
        let claims = match initial_token {
            Some(token) => TokenClaims::decode(token).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse token claims: {}", e);
                TokenClaims::default()
            }),
            None => TokenClaims::default(),
        };

        let mut client = Self {
            dispatcher,
            claims,
            flags: HashMap::new(),
            vars: ClientVars::default(),
            tenant_id: String::new(),
            app_id: String::new(),
        };
        client.initialize().await;
        client
    }

    async fn initialize(&mut self) {
        let tenant = TenantApi::new(self.dispatcher.clone());

        match tenant.id().await {
            Ok(id) => self.tenant_id = id,
            Err(e) => tracing::warn!("Failed to retrieve tenant ID: {}", e),
        }

        match tenant.app_id().await {
            Ok(id) => self.app_id = id,
            Err(e) => tracing::warn!("Failed to retrieve app ID: {}", e),
        }

        if let Err(e) = self.refresh_flags().await {
            tracing::warn!("Failed to retrieve feature flags: {}", e);
        }

        self.vars = ClientVars::default();
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Feature flags
    // ─────────────────────────────────────────────────────────────────────────

    /// Fetch the tenant's feature flags. The current map is kept on failure.
    pub async fn refresh_flags(&mut self) -> Result<()> {
        let flags = self.flags_api().map(&self.tenant_id).await?;
        tracing::debug!("Loaded {} feature flags", flags.len());
        self.flags = flags;
        Ok(())
    }

    pub fn flags(&self) -> &HashMap<String, bool> {
        &self.flags
    }

    /// State of one flag; unknown names are an error.
    pub fn check_flag(&self, name: &str) -> Result<bool> {
        self.flags
            .get(name)
            .copied()
            .ok_or_else(|| Error::FlagNotFound(name.to_string()))
    }

    /// Access the feature flags API.
    pub fn flags_api(&self) -> FlagsApi {
        FlagsApi::new(self.dispatcher.clone())
    }

    /// Access the tenant identity API.
    pub fn tenant_api(&self) -> TenantApi {
        TenantApi::new(self.dispatcher.clone())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // License
    // ─────────────────────────────────────────────────────────────────────────

    pub fn license(&self) -> &License {
        &self.claims.license
    }

    pub fn claims(&self) -> &TokenClaims {
        &self.claims
    }

    /// Re-decode claims from the session's current access token.
    ///
    /// The previous claims are kept when the token cannot be obtained or decoded.
    pub async fn refresh_claims(&mut self) -> Result<()> {
        let token = self.dispatcher.transport().tokens().access_token().await?;
        self.claims = TokenClaims::decode(&token).map_err(Error::Claims)?;
        Ok(())
    }

    /// Whether the license allows `engine`, ignoring ASCII case.
    pub fn is_engine_allowed(&self, engine: &str) -> bool {
        self.claims.allows_engine(engine)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Settings and identity
    // ─────────────────────────────────────────────────────────────────────────

    pub fn client_vars(&self) -> ClientVars {
        tracing::debug!("Polling limits: {:?}", self.vars);
        self.vars
    }

    pub fn set_client_vars(&mut self, vars: ClientVars) {
        self.vars = vars;
    }

    /// Internal tenant id; empty if it could not be resolved.
    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    /// Internal id of the platform application client; empty if unresolved.
    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    pub fn tenant(&self) -> &str {
        self.dispatcher.endpoints().tenant()
    }

    pub fn base_url(&self) -> &str {
        self.dispatcher.endpoints().base_url()
    }

    pub fn iam_url(&self) -> &str {
        self.dispatcher.endpoints().iam_url()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Requests
    // ─────────────────────────────────────────────────────────────────────────

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub async fn send(&self, request: ApiRequest) -> Result<Vec<u8>> {
        self.dispatcher.send(request).await
    }

    pub async fn send_raw(&self, request: ApiRequest) -> Result<reqwest::Response> {
        self.dispatcher.send_raw(request).await
    }

    pub async fn send_json<T: serde::de::DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        self.dispatcher.send_json(request).await
    }

    pub async fn dispatch(
        &self,
        method: reqwest::Method,
        surface: Surface,
        path: &str,
        body: Option<Vec<u8>>,
        headers: Headers,
    ) -> Result<Vec<u8>> {
        self.dispatcher
            .dispatch(method, surface, path, body, headers)
            .await
    }
}

impl fmt::Display for CxOneClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on {} ", self.tenant(), self.base_url())
    }
}

impl fmt::Debug for CxOneClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CxOneClient")
            .field("endpoints", self.dispatcher.endpoints())
            .field("tenant_id", &self.tenant_id)
            .field("app_id", &self.app_id)
            .field("flags", &self.flags.len())
            .finish_non_exhaustive()
    }
}

/// Builder for creating a [`CxOneClient`].
#[derive(Debug, Default)]
pub struct ClientBuilder {
    base_url: Option<String>,
    iam_url: Option<String>,
    tenant: Option<String>,
    credentials: Option<Credentials>,
    http: Option<reqwest::ClientBuilder>,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Platform API host, e.g. `https://eu.ast.example.net`.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Identity-provider host, e.g. `https://eu.iam.example.net`.
    pub fn iam_url(mut self, url: impl Into<String>) -> Self {
        self.iam_url = Some(url.into());
        self
    }

    pub fn tenant(mut self, tenant: impl Into<String>) -> Self {
        self.tenant = Some(tenant.into());
        self
    }

    /// Authenticate with a confidential client. Replaces any API key.
    pub fn client_secret(
        mut self,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        self.credentials = Some(Credentials::client_secret(client_id, client_secret));
        self
    }

    /// Authenticate with an API key. Replaces any client secret.
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.credentials = Some(Credentials::api_key(api_key));
        self
    }

    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Base HTTP client settings (timeouts, proxies, TLS). Redirect following
    /// is always disabled.
    pub fn http_builder(mut self, builder: reqwest::ClientBuilder) -> Self {
        self.http = Some(builder);
        self
    }

    /// Authenticate and bootstrap the client.
    pub async fn build(self) -> Result<CxOneClient> {
        let (base_url, iam_url, tenant, credentials) = match self.validate() {
            Some(parts) => parts,
            None => return Err(Error::Config(INVALID_PARAMETERS.to_string())),
        };

        let endpoints = Endpoints::new(base_url, iam_url, tenant);
        let session = AuthSession::start(
            self.http.unwrap_or_default(),
            endpoints.iam_url(),
            endpoints.tenant(),
            &credentials,
        )
        .await?;

        let (transport, initial_token) = session.into_parts();
        let dispatcher = Dispatcher::new(transport, endpoints);
        Ok(CxOneClient::connect(dispatcher, initial_token.as_deref()).await)
    }

    fn validate(&self) -> Option<(String, String, String, Credentials)> {
        let non_empty = |v: &Option<String>| v.clone().filter(|s| !s.is_empty());
        let credentials = self.credentials.clone().filter(Credentials::is_complete)?;
        Some((
            non_empty(&self.base_url)?,
            non_empty(&self.iam_url)?,
            non_empty(&self.tenant)?,
            credentials,
        ))
    }
}
