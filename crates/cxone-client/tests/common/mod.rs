//! Common test utilities for integration tests.
//!
//! A single wiremock server stands in for both the platform API host and the
//! identity provider.

#![allow(dead_code)]

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use cxone_client::{CxOneClient, Dispatcher, Endpoints};
use cxone_oauth::{AuthTransport, StaticTokenSource, build_http_client};
use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TENANT: &str = "acme";
pub const TENANT_ID: &str = "0c1d-tenant";
pub const APP_ID: &str = "5f2e-app";
pub const TOKEN_PATH: &str = "/auth/realms/acme/protocol/openid-connect/token";
pub const REALM_PATH: &str = "/auth/admin/realms/acme";

/// Unsigned JWT carrying `claims` as its payload.
pub fn fake_jwt(claims: Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{}.{}.signature", header, payload)
}

/// Token whose license allows `engines`.
pub fn licensed_jwt(engines: &[&str]) -> String {
    fake_jwt(json!({
        "iss": "https://iam.example.net/auth/realms/acme",
        "tenant_name": TENANT,
        "ast-license": {
            "ID": 7,
            "TenantID": TENANT_ID,
            "PackageName": "Enterprise",
            "LicenseData": {
                "allowedEngines": engines,
                "maxConcurrentScans": 4,
                "dastEnabled": false
            }
        }
    }))
}

/// Mock platform: token endpoint plus the bootstrap endpoints.
pub struct MockPlatform {
    pub server: MockServer,
}

impl MockPlatform {
    /// A platform that answers nothing until mocks are mounted.
    pub async fn bare() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// A platform that issues `token` and answers the bootstrap requests.
    pub async fn start(token: &str, flags: Value) -> Self {
        let platform = Self::bare().await;
        platform.mount_token(token).await;
        platform.mount_bootstrap(flags).await;
        platform
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    pub async fn mount_token(&self, token: &str) {
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": token,
                "expires_in": 300,
                "token_type": "Bearer"
            })))
            .mount(&self.server)
            .await;
    }

    pub async fn mount_token_failure(&self) {
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": "unauthorized_client",
                "error_description": "Invalid client or Invalid client credentials"
            })))
            .mount(&self.server)
            .await;
    }

    pub async fn mount_bootstrap(&self, flags: Value) {
        self.mount_identity().await;
        self.mount_flags(flags).await;
    }

    /// Tenant realm and application client lookups.
    pub async fn mount_identity(&self) {
        Mock::given(method("GET"))
            .and(path(REALM_PATH))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"id": TENANT_ID, "realm": TENANT})),
            )
            .mount(&self.server)
            .await;

        Mock::given(method("GET"))
            .and(path(format!("{}/clients", REALM_PATH)))
            .and(query_param("clientId", "ast-app"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([{"id": APP_ID, "clientId": "ast-app"}])),
            )
            .mount(&self.server)
            .await;
    }

    pub async fn mount_flags(&self, flags: Value) {
        self.mount_flags_response(ResponseTemplate::new(200).set_body_json(flags), None)
            .await;
    }

    /// Flags endpoint answering `response`, at most `times` times when given.
    pub async fn mount_flags_response(&self, response: ResponseTemplate, times: Option<u64>) {
        let mock = Mock::given(method("GET"))
            .and(path("/api/flags"))
            .and(query_param("filter", TENANT_ID))
            .respond_with(response);
        let mock = match times {
            Some(n) => mock.up_to_n_times(n),
            None => mock,
        };
        mock.mount(&self.server).await;
    }

    /// Dispatcher authorized by a fixed token, skipping the token endpoint.
    pub fn dispatcher(&self, token: &str) -> Dispatcher {
        dispatcher_for(&self.uri(), token)
    }

    /// Client bootstrapped over [`dispatcher`](Self::dispatcher).
    pub async fn connect(&self, token: &str) -> CxOneClient {
        CxOneClient::connect(self.dispatcher(token), Some(token)).await
    }
}

/// Serve one connection with a fixed raw HTTP/1.1 response, then close it.
///
/// For responses wiremock cannot produce: custom reason phrases, bodies
/// shorter than their `Content-Length`.
pub async fn serve_raw_once(response: &'static [u8]) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request_complete(&request) {
            match socket.read(&mut buf).await {
                Ok(0) | Err(_) => return,
                Ok(n) => request.extend_from_slice(&buf[..n]),
            }
        }
        let _ = socket.write_all(response).await;
        let _ = socket.shutdown().await;
    });
    format!("http://{}", addr)
}

/// Whether `request` holds the full head and any `Content-Length` body.
fn request_complete(request: &[u8]) -> bool {
    let Some(head_end) = request.windows(4).position(|w| w == b"\r\n\r\n") else {
        return false;
    };
    let head = String::from_utf8_lossy(&request[..head_end]).to_ascii_lowercase();
    let body_len = head
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);
    request.len() >= head_end + 4 + body_len
}

/// Dispatcher against `uri` authorized by a fixed token.
pub fn dispatcher_for(uri: &str, token: &str) -> Dispatcher {
    let http = build_http_client(reqwest::Client::builder()).unwrap();
    let transport = AuthTransport::new(http, StaticTokenSource::shared(token));
    Dispatcher::new(transport, Endpoints::new(uri, uri, TENANT))
}

/// Log lines captured by a test subscriber.
#[derive(Clone, Default)]
pub struct CapturedLogs(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }

    /// Capture every event, diagnostics included, on the current thread.
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .with_writer(self.clone())
            .finish();
        tracing::subscriber::set_default(subscriber)
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
