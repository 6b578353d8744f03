//! Request dispatch: URL composition, authorization, and failure classification.
//!
//! Every call to the platform goes through [`Dispatcher`]. It targets one of
//! three surfaces ([`Surface`]), fills in default headers, attaches the bearer
//! token, and turns `>= 400` responses into [`Error::Api`] with the most useful
//! message it can find in the body.

use std::future::Future;
use std::sync::Arc;

use cxone_oauth::AuthTransport;
use futures::{Stream, StreamExt};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::{Error, Result};
use crate::headers::Headers;

/// Tracing target for request/response bodies captured on failures.
pub const DIAGNOSTICS_TARGET: &str = "cxone_client::diagnostics";

/// Keys searched, in order, for a human-readable message in error bodies.
const ERROR_MESSAGE_KEYS: [&str; 4] = ["message", "error_description", "error", "errorMessage"];

/// Longest raw-body snippet used as an error message.
const ERROR_SNIPPET_LEN: usize = 20;

/// Read errors some intercepting proxies raise after the response was delivered.
const BENIGN_TRANSPORT_ERRORS: [&str; 2] = [
    "remote error: tls: user canceled",
    "received fatal alert: UserCanceled",
];

/// Base segment of the identity provider's admin API.
pub const ADMIN_BASE: &str = "/auth/admin";

// ─────────────────────────────────────────────────────────────────────────────
// Surfaces and endpoints
// ─────────────────────────────────────────────────────────────────────────────

/// Backend surface a request is addressed to.
///
/// The surfaces are not interchangeable; the dispatcher does no negotiation
/// between them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Surface {
    /// Primary API: `{base_url}/api{path}`.
    Api,
    /// Identity-provider realm endpoints: `{iam_url}{base}/realms/{tenant}{path}`.
    Realm { base: String },
    /// Console-style endpoints: `{iam_url}{base}/{tenant}{path}`.
    Console { base: String },
}

impl Surface {
    pub fn realm(base: impl Into<String>) -> Self {
        Self::Realm { base: base.into() }
    }

    pub fn console(base: impl Into<String>) -> Self {
        Self::Console { base: base.into() }
    }

    /// Realm surface of the admin API.
    pub fn realm_admin() -> Self {
        Self::realm(ADMIN_BASE)
    }
}

/// Where the tenant lives: API host, identity-provider host, and tenant name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    base_url: String,
    iam_url: String,
    tenant: String,
}

impl Endpoints {
    pub fn new(
        base_url: impl Into<String>,
        iam_url: impl Into<String>,
        tenant: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            iam_url: iam_url.into().trim_end_matches('/').to_string(),
            tenant: tenant.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn iam_url(&self) -> &str {
        &self.iam_url
    }

    pub fn tenant(&self) -> &str {
        &self.tenant
    }

    /// Compose the target URL for `path` on `surface`.
    pub fn url(&self, surface: &Surface, path: &str) -> String {
        match surface {
            Surface::Api => format!("{}/api{}", self.base_url, path),
            Surface::Realm { base } => {
                format!("{}{}/realms/{}{}", self.iam_url, base, self.tenant, path)
            }
            Surface::Console { base } => {
                format!("{}{}/{}{}", self.iam_url, base, self.tenant, path)
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Requests
// ─────────────────────────────────────────────────────────────────────────────

/// A request to dispatch. Bodies are fully buffered.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub surface: Surface,
    pub path: String,
    pub body: Option<Vec<u8>>,
    pub headers: Headers,
    cancel: Option<CancellationToken>,
}

impl ApiRequest {
    pub fn new(method: Method, surface: Surface, path: impl Into<String>) -> Self {
        Self {
            method,
            surface,
            path: path.into(),
            body: None,
            headers: Headers::new(),
            cancel: None,
        }
    }

    pub fn get(surface: Surface, path: impl Into<String>) -> Self {
        Self::new(Method::GET, surface, path)
    }

    pub fn post(surface: Surface, path: impl Into<String>) -> Self {
        Self::new(Method::POST, surface, path)
    }

    pub fn put(surface: Surface, path: impl Into<String>) -> Self {
        Self::new(Method::PUT, surface, path)
    }

    pub fn patch(surface: Surface, path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, surface, path)
    }

    pub fn delete(surface: Surface, path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, surface, path)
    }

    /// Set a raw body.
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serialize `body` as JSON.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self> {
        self.body = Some(serde_json::to_vec(body)?);
        Ok(self)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.add(name, value);
        self
    }

    pub fn headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    /// Abort the request with [`Error::Cancelled`] when `token` fires.
    pub fn cancel_on(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Dispatcher
// ─────────────────────────────────────────────────────────────────────────────

/// Sends requests through the authenticated transport.
///
/// Cheap to clone; clones share the connection pool and token source.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

#[derive(Debug)]
struct DispatcherInner {
    transport: AuthTransport,
    endpoints: Endpoints,
}

impl Dispatcher {
    pub fn new(transport: AuthTransport, endpoints: Endpoints) -> Self {
        Self {
            inner: Arc::new(DispatcherInner {
                transport,
                endpoints,
            }),
        }
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.inner.endpoints
    }

    pub fn transport(&self) -> &AuthTransport {
        &self.inner.transport
    }

    /// Compose the target URL for `path` on `surface`.
    pub fn url(&self, surface: &Surface, path: &str) -> String {
        self.inner.endpoints.url(surface, path)
    }

    /// Send a request and return the response body.
    pub async fn dispatch(
        &self,
        method: Method,
        surface: Surface,
        path: &str,
        body: Option<Vec<u8>>,
        headers: Headers,
    ) -> Result<Vec<u8>> {
        let mut request = ApiRequest::new(method, surface, path).headers(headers);
        request.body = body;
        self.send(request).await
    }

    /// Send a request and return the fully read response body.
    pub async fn send(&self, request: ApiRequest) -> Result<Vec<u8>> {
        let cancel = request.cancel.clone();
        let request_body = request.body.clone();
        cancellable(cancel, async {
            let response = self.exchange(request).await?;
            collect_body(response.bytes_stream()).await.map_err(|e| {
                tracing::trace!(target: DIAGNOSTICS_TARGET, "Failed to read response body: {}", e);
                record_diagnostics(request_body.as_deref(), None);
                Error::Http(e)
            })
        })
        .await
    }

    /// Send a request and return the unconsumed response, for streaming callers.
    ///
    /// Only responses with status `< 400` are returned; redirects are not followed.
    pub async fn send_raw(&self, request: ApiRequest) -> Result<reqwest::Response> {
        let cancel = request.cancel.clone();
        cancellable(cancel, self.exchange(request)).await
    }

    /// Send a request and decode the JSON response body.
    pub async fn send_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        let body = self.send(request).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn exchange(&self, request: ApiRequest) -> Result<reqwest::Response> {
        let ApiRequest {
            method,
            surface,
            path,
            body,
            headers,
            ..
        } = request;

        let url = Url::parse(&self.url(&surface, &path))?;
        tracing::debug!("Sending {} request to URL {}", method, url);

        let header_map = headers.to_header_map()?;
        let transport = &self.inner.transport;
        let mut builder = transport.http().request(method, url).headers(header_map);
        if let Some(bytes) = &body {
            builder = builder.body(bytes.clone());
        }

        let builder = match transport.authorize(builder).await {
            Ok(builder) => builder,
            Err(e) => {
                tracing::trace!(target: DIAGNOSTICS_TARGET, "Unable to authorize request: {}", e);
                record_diagnostics(body.as_deref(), None);
                return Err(Error::Auth(e));
            }
        };

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::trace!(target: DIAGNOSTICS_TARGET, "Failed HTTP request: '{}'", e);
                record_diagnostics(body.as_deref(), None);
                return Err(Error::Http(e));
            }
        };

        let status = response.status();
        if status.as_u16() >= 400 {
            let reason = response
                .extensions()
                .get::<hyper::ext::ReasonPhrase>()
                .map(|r| r.as_bytes().to_vec());
            let response_body = read_error_body(response.bytes_stream()).await;
            record_diagnostics(body.as_deref(), Some(&response_body));
            return Err(api_error(status, reason.as_deref(), &response_body));
        }

        Ok(response)
    }
}

async fn cancellable<T>(
    cancel: Option<CancellationToken>,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    match cancel {
        Some(token) => {
            tokio::select! {
                biased;
                _ = token.cancelled() => Err(Error::Cancelled),
                result = fut => result,
            }
        }
        None => fut.await,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Response handling
// ─────────────────────────────────────────────────────────────────────────────

/// Read a body stream to the end.
///
/// A benign proxy TLS error ends the body early instead of failing it: the
/// response has already been delivered by then.
pub(crate) async fn collect_body<S, B, E>(stream: S) -> std::result::Result<Vec<u8>, E>
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    E: std::error::Error + 'static,
{
    let mut stream = std::pin::pin!(stream);
    let mut body = Vec::new();
    while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(bytes) => body.extend_from_slice(bytes.as_ref()),
            Err(e) if is_benign_transport_error(&e) => {
                tracing::warn!("Potentially benign error from HTTP connection: {}", e);
                break;
            }
            Err(e) => return Err(e),
        }
    }
    Ok(body)
}

/// Whether any error in the source chain is the proxy `user canceled` TLS alert.
pub fn is_benign_transport_error(error: &(dyn std::error::Error + 'static)) -> bool {
    let mut current = Some(error);
    while let Some(e) = current {
        let message = e.to_string();
        if BENIGN_TRANSPORT_ERRORS.iter().any(|m| message.contains(m)) {
            return true;
        }
        current = e.source();
    }
    false
}

/// Read an error response body. A failed read yields whatever is usable, or nothing.
pub(crate) async fn read_error_body<S, B, E>(stream: S) -> Vec<u8>
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    E: std::error::Error + 'static,
{
    collect_body(stream).await.unwrap_or_else(|e| {
        tracing::trace!(target: DIAGNOSTICS_TARGET, "Failed to read error body: {}", e);
        Vec::new()
    })
}

fn api_error(status: StatusCode, reason: Option<&[u8]>, body: &[u8]) -> Error {
    Error::Api {
        status: status.as_u16(),
        status_line: status_line(status, reason),
        message: extract_error_message(body),
    }
}

/// Code plus the reason phrase the server sent, else the canonical phrase,
/// else the bare code.
fn status_line(status: StatusCode, reason: Option<&[u8]>) -> String {
    let reason = reason
        .map(|r| String::from_utf8_lossy(r).trim().to_string())
        .filter(|r| !r.is_empty())
        .or_else(|| status.canonical_reason().map(str::to_string));
    match reason {
        Some(reason) => format!("{} {}", status.as_str(), reason),
        None => status.as_str().to_string(),
    }
}

/// Best-effort message from an error body: a known JSON key, else a raw snippet.
pub(crate) fn extract_error_message(body: &[u8]) -> String {
    if let Ok(serde_json::Value::Object(map)) = serde_json::from_slice::<serde_json::Value>(body)
        && let Some(message) = ERROR_MESSAGE_KEYS
            .iter()
            .find_map(|key| map.get(*key).and_then(serde_json::Value::as_str))
    {
        return message.to_string();
    }

    snippet(body, ERROR_SNIPPET_LEN)
}

/// The first `max_len` bytes of `body`, decoded lossily.
fn snippet(body: &[u8], max_len: usize) -> String {
    String::from_utf8_lossy(&body[..body.len().min(max_len)]).into_owned()
}

fn record_diagnostics(request_body: Option<&[u8]>, response_body: Option<&[u8]>) {
    if let Some(body) = request_body.filter(|b| !b.is_empty()) {
        tracing::trace!(target: DIAGNOSTICS_TARGET, "Request body: {}", String::from_utf8_lossy(body));
    }
    if let Some(body) = response_body.filter(|b| !b.is_empty()) {
        tracing::trace!(target: DIAGNOSTICS_TARGET, "Response body: {}", String::from_utf8_lossy(body));
    }
}
