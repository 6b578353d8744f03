//! Dispatcher integration tests: surfaces, headers, and failure classification.

mod common;

use std::time::Duration;

use cxone_client::headers::{DEFAULT_CONTENT_TYPE, DEFAULT_USER_AGENT};
use cxone_client::{
    ApiRequest, CancellationToken, DIAGNOSTICS_TARGET, Dispatcher, Endpoints, Error, Headers,
    Method, Surface,
};
use cxone_oauth::{AuthTransport, StaticTokenSource, build_http_client};
use serde_json::json;
use wiremock::matchers::{body_string, header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use common::{CapturedLogs, MockPlatform, dispatcher_for, serve_raw_once};

const TOKEN: &str = "test-access-token";

#[tokio::test]
async fn test_api_error_uses_message_key() {
    let platform = MockPlatform::bare().await;
    Mock::given(method("GET"))
        .and(path("/api/projects/missing"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(json!({"code": 210, "message": "project not found"})),
        )
        .mount(&platform.server)
        .await;

    let err = platform
        .dispatcher(TOKEN)
        .send(ApiRequest::get(Surface::Api, "/projects/missing"))
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "HTTP 404 Not Found: project not found");
    assert!(err.is_not_found());
    assert_eq!(err.status(), Some(404));
}

#[tokio::test]
async fn test_api_error_from_oauth_style_body() {
    let platform = MockPlatform::bare().await;
    Mock::given(method("GET"))
        .and(path("/auth/admin/realms/acme/users"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": "insufficient_scope",
            "error_description": "not allowed to view users"
        })))
        .mount(&platform.server)
        .await;

    let err = platform
        .dispatcher(TOKEN)
        .send(ApiRequest::get(Surface::realm_admin(), "/users"))
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "HTTP 403 Forbidden: not allowed to view users");
}

#[tokio::test]
async fn test_non_json_error_body_truncated() {
    let platform = MockPlatform::bare().await;
    Mock::given(method("POST"))
        .and(path("/api/scans"))
        .respond_with(
            ResponseTemplate::new(502)
                .set_body_string("<html><body>upstream connect error</body></html>"),
        )
        .mount(&platform.server)
        .await;

    let err = platform
        .dispatcher(TOKEN)
        .send(
            ApiRequest::post(Surface::Api, "/scans")
                .json(&json!({"project": "p"}))
                .unwrap(),
        )
        .await
        .unwrap_err();

    match &err {
        Error::Api {
            status, message, ..
        } => {
            assert_eq!(*status, 502);
            assert_eq!(message, "<html><body>upstream");
            assert_eq!(message.len(), 20);
        }
        other => panic!("expected API error, got {other:?}"),
    }
    assert!(err.is_server_error());
}

#[tokio::test]
async fn test_status_without_standard_reason() {
    let platform = MockPlatform::bare().await;
    Mock::given(method("GET"))
        .and(path("/api/x"))
        .respond_with(ResponseTemplate::new(499).set_body_json(json!({"message": "X"})))
        .mount(&platform.server)
        .await;

    let err = platform
        .dispatcher(TOKEN)
        .send(ApiRequest::get(Surface::Api, "/x"))
        .await
        .unwrap_err();

    let text = err.to_string();
    assert_eq!(err.status(), Some(499));
    assert!(text.starts_with("HTTP 499"), "{text}");
    assert!(text.ends_with(": X"), "{text}");
    assert!(!text.contains("unknown status code"), "{text}");
}

#[tokio::test]
async fn test_status_line_uses_server_reason_phrase() {
    let uri = serve_raw_once(
        b"HTTP/1.1 499 Client Closed Request\r\n\
          Content-Type: application/json\r\n\
          Content-Length: 15\r\n\
          \r\n\
          {\"message\":\"X\"}",
    )
    .await;

    let err = dispatcher_for(&uri, TOKEN)
        .send(ApiRequest::get(Surface::Api, "/x"))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "HTTP 499 Client Closed Request: X");
}

#[tokio::test]
async fn test_truncated_success_body_records_diagnostics() {
    let logs = CapturedLogs::default();
    let _guard = logs.install();

    let uri = serve_raw_once(
        b"HTTP/1.1 200 OK\r\n\
          Content-Type: application/json\r\n\
          Content-Length: 100\r\n\
          \r\n\
          {\"partial\":",
    )
    .await;

    let err = dispatcher_for(&uri, TOKEN)
        .send(
            ApiRequest::post(Surface::Api, "/projects")
                .json(&json!({"name": "p"}))
                .unwrap(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Http(_)), "{err:?}");

    let output = logs.contents();
    assert!(output.contains(DIAGNOSTICS_TARGET), "{output}");
    assert!(output.contains(r#"Request body: {"name":"p"}"#), "{output}");
}

#[tokio::test]
async fn test_default_headers_and_bearer() {
    let platform = MockPlatform::bare().await;
    Mock::given(method("GET"))
        .and(path("/api/projects"))
        .and(header("user-agent", DEFAULT_USER_AGENT))
        .and(header("content-type", DEFAULT_CONTENT_TYPE))
        .and(header("authorization", "Bearer test-access-token"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .expect(1)
        .mount(&platform.server)
        .await;

    let body = platform
        .dispatcher(TOKEN)
        .send(ApiRequest::get(Surface::Api, "/projects"))
        .await
        .unwrap();
    assert_eq!(body, b"[]");
}

#[tokio::test]
async fn test_caller_headers_override_defaults() {
    let platform = MockPlatform::bare().await;
    Mock::given(method("PUT"))
        .and(path("/api/configuration/tenant"))
        .and(header("user-agent", "cxone-ci/2.1"))
        .and(header("content-type", "text/plain"))
        .and(body_string("raw"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&platform.server)
        .await;

    let headers = Headers::new()
        .with("User-Agent", "cxone-ci/2.1")
        .with("Content-Type", "text/plain");
    let body = platform
        .dispatcher(TOKEN)
        .dispatch(
            Method::PUT,
            Surface::Api,
            "/configuration/tenant",
            Some(b"raw".to_vec()),
            headers,
        )
        .await
        .unwrap();
    assert!(body.is_empty());
}

#[tokio::test]
async fn test_redirect_not_followed() {
    let platform = MockPlatform::bare().await;
    Mock::given(method("GET"))
        .and(path("/api/uploads/link"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("Location", "https://storage.example.net/blob"),
        )
        .mount(&platform.server)
        .await;

    let response = platform
        .dispatcher(TOKEN)
        .send_raw(ApiRequest::get(Surface::Api, "/uploads/link"))
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 302);
    assert_eq!(
        response.headers().get("location").unwrap(),
        "https://storage.example.net/blob"
    );
}

#[tokio::test]
async fn test_surfaces_route_to_distinct_urls() {
    let platform = MockPlatform::bare().await;
    for route in [
        "/api/queries",
        "/auth/admin/realms/acme/groups",
        "/auth/console/acme/whoami",
    ] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_string(route))
            .expect(1)
            .mount(&platform.server)
            .await;
    }

    let dispatcher = platform.dispatcher(TOKEN);
    let api = dispatcher
        .send(ApiRequest::get(Surface::Api, "/queries"))
        .await
        .unwrap();
    let realm = dispatcher
        .send(ApiRequest::get(Surface::realm_admin(), "/groups"))
        .await
        .unwrap();
    let console = dispatcher
        .send(ApiRequest::get(Surface::console("/auth/console"), "/whoami"))
        .await
        .unwrap();

    assert_eq!(api, b"/api/queries");
    assert_eq!(realm, b"/auth/admin/realms/acme/groups");
    assert_eq!(console, b"/auth/console/acme/whoami");
}

#[tokio::test]
async fn test_send_json_decodes_body() {
    let platform = MockPlatform::bare().await;
    Mock::given(method("GET"))
        .and(path("/api/projects"))
        .and(query_param("limit", "1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"totalCount": 1, "projects": []})),
        )
        .mount(&platform.server)
        .await;

    let value: serde_json::Value = platform
        .dispatcher(TOKEN)
        .send_json(ApiRequest::get(Surface::Api, "/projects?limit=1"))
        .await
        .unwrap();
    assert_eq!(value["totalCount"], 1);
}

#[tokio::test]
async fn test_cancellation_aborts_request() {
    let platform = MockPlatform::bare().await;
    Mock::given(method("GET"))
        .and(path("/api/scans/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(10)))
        .mount(&platform.server)
        .await;

    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let err = platform
        .dispatcher(TOKEN)
        .send(ApiRequest::get(Surface::Api, "/scans/slow").cancel_on(token))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Cancelled));
}

#[tokio::test]
async fn test_connection_failure_is_transport_error() {
    let http = build_http_client(reqwest::Client::builder()).unwrap();
    let transport = AuthTransport::new(http, StaticTokenSource::shared(TOKEN));
    // Nothing listens on port 1.
    let endpoints = Endpoints::new("http://127.0.0.1:1", "http://127.0.0.1:1", "acme");
    let dispatcher = Dispatcher::new(transport, endpoints);

    let err = dispatcher
        .send(ApiRequest::get(Surface::Api, "/projects"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Http(_)));
    assert_eq!(err.status(), None);
}

#[tokio::test]
async fn test_invalid_header_rejected_before_send() {
    let platform = MockPlatform::bare().await;
    let err = platform
        .dispatcher(TOKEN)
        .send(ApiRequest::get(Surface::Api, "/projects").header("bad header", "x"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidHeader(_)));
}
