//! CLI integration tests for the cxone command-line interface.
//!
//! Each test runs the binary with `CXONE_CONFIG_DIR` and the working directory
//! pointed at temporary directories so no real user config is read. Tests that
//! talk to a platform use a wiremock server.

use std::path::Path;

use assert_cmd::Command;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Get a command for the cxone binary, isolated from the environment.
fn cxone(config_dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("cxone").unwrap();
    cmd.current_dir(config_dir)
        .env("CXONE_CONFIG_DIR", config_dir)
        .env_remove("CXONE_PROFILE")
        .env_remove("CXONE_BASE_URI")
        .env_remove("CXONE_BASE_AUTH_URI")
        .env_remove("CXONE_TENANT")
        .env_remove("CXONE_APIKEY")
        .env_remove("CXONE_CLIENT_ID")
        .env_remove("CXONE_CLIENT_SECRET");
    cmd
}

fn write_config(dir: &Path, contents: &str) {
    std::fs::write(dir.join("config.toml"), contents).unwrap();
}

// ─────────────────────────────────────────────────────────────────────────────
// Help and Version Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_help_lists_subcommands() {
    let dir = TempDir::new().unwrap();
    cxone(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("flags"))
        .stdout(predicate::str::contains("license"))
        .stdout(predicate::str::contains("vars"))
        .stdout(predicate::str::contains("request"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_version_displays() {
    let dir = TempDir::new().unwrap();
    cxone(dir.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("cxone"));
}

#[test]
fn test_request_help_lists_surfaces() {
    let dir = TempDir::new().unwrap();
    cxone(dir.path())
        .args(["request", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("realm"))
        .stdout(predicate::str::contains("console"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Invalid Input Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_unknown_subcommand_fails() {
    let dir = TempDir::new().unwrap();
    cxone(dir.path())
        .arg("unknown-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_missing_connection_settings_fail() {
    let dir = TempDir::new().unwrap();
    cxone(dir.path())
        .arg("flags")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--base-url"));
}

#[test]
fn test_unknown_profile_fails() {
    let dir = TempDir::new().unwrap();
    cxone(dir.path())
        .args(["--profile", "nope", "vars"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("profile 'nope' not found"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Offline Commands
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_vars_defaults() {
    let dir = TempDir::new().unwrap();
    let output = cxone(dir.path())
        .args(["--json", "vars"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let vars: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(vars["scan-polling-max-seconds"], 0);
    assert_eq!(vars["audit-scan-polling-max-seconds"], 600);
    assert_eq!(vars["project-application-link-polling-delay-seconds"], 5);
}

#[test]
fn test_vars_profile_overrides() {
    let dir = TempDir::new().unwrap();
    write_config(
        dir.path(),
        r#"
current-profile = "prod"

[profiles.prod]
tenant = "acme"

[profiles.prod.polling]
scan-polling-max-seconds = 3600
"#,
    );

    let output = cxone(dir.path())
        .args(["--json", "vars"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let vars: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(vars["scan-polling-max-seconds"], 3600);
    assert_eq!(vars["scan-polling-delay-seconds"], 15);
}

#[test]
fn test_config_set_and_use_profile() {
    let dir = TempDir::new().unwrap();

    cxone(dir.path())
        .args([
            "config",
            "set-profile",
            "prod",
            "--url",
            "https://eu.ast.example.net",
            "--iam",
            "https://eu.iam.example.net",
            "--tenant-name",
            "acme",
            "--api-key-env",
            "PROD_KEY",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("set as current profile"));

    cxone(dir.path())
        .args(["config", "set-profile", "ci", "--tenant-name", "acme-ci"])
        .assert()
        .success();

    cxone(dir.path())
        .args(["config", "use-profile", "ci"])
        .assert()
        .success();

    let saved = std::fs::read_to_string(dir.path().join("config.toml")).unwrap();
    assert!(saved.contains("current-profile = \"ci\""));
    assert!(saved.contains("api-key-env = \"PROD_KEY\""));

    cxone(dir.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("acme-ci"));

    cxone(dir.path())
        .args(["config", "use-profile", "staging"])
        .assert()
        .failure();
}

// ─────────────────────────────────────────────────────────────────────────────
// Against a mock platform
// ─────────────────────────────────────────────────────────────────────────────

async fn mock_platform() -> MockServer {
    let server = MockServer::start().await;
    let claims = json!({
        "ast-license": {
            "PackageName": "Enterprise",
            "LicenseData": { "allowedEngines": ["sast", "sca"] }
        }
    });
    let token = format!(
        "{}.{}.sig",
        URL_SAFE_NO_PAD.encode(br#"{"alg":"none"}"#),
        URL_SAFE_NO_PAD.encode(claims.to_string())
    );

    Mock::given(method("POST"))
        .and(path("/auth/realms/acme/protocol/openid-connect/token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"access_token": token, "expires_in": 300})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/auth/admin/realms/acme"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "t-1", "realm": "acme"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/auth/admin/realms/acme/clients"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{"id": "app-1", "clientId": "ast-app"}])),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/flags"))
        .and(query_param("filter", "t-1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{"name": "NEW_UI", "status": true}])),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/projects/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "no project"})))
        .mount(&server)
        .await;
    server
}

/// Run `args` against `server` with API-key auth, off the async runtime.
async fn run_against(server: &MockServer, args: &[&str]) -> assert_cmd::assert::Assert {
    let uri = server.uri();
    let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
    tokio::task::spawn_blocking(move || {
        let dir = TempDir::new().unwrap();
        cxone(dir.path())
            .args(["--base-url", &uri, "--iam-url", &uri, "--tenant", "acme"])
            .env("CXONE_APIKEY", "test-key")
            .args(&args)
            .assert()
    })
    .await
    .unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn test_status_json() {
    let server = mock_platform().await;
    let output = run_against(&server, &["--json", "status"])
        .await
        .success()
        .get_output()
        .stdout
        .clone();

    let status: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(status["connected"], true);
    assert_eq!(status["tenant_id"], "t-1");
    assert_eq!(status["app_id"], "app-1");
    assert_eq!(status["package"], "Enterprise");
    assert_eq!(status["flags"], 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_flag_check() {
    let server = mock_platform().await;
    run_against(&server, &["flags", "NEW_UI"])
        .await
        .success()
        .stdout(predicate::str::contains("true"));
    run_against(&server, &["flags", "OTHER"])
        .await
        .failure()
        .stderr(predicate::str::contains("no such flag: OTHER"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_license_engine() {
    let server = mock_platform().await;
    run_against(&server, &["license", "--engine", "SAST"])
        .await
        .success()
        .stdout(predicate::str::contains("true"));
    run_against(&server, &["license", "--engine", "dast"])
        .await
        .failure();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_request_reports_api_error() {
    let server = mock_platform().await;
    run_against(&server, &["request", "GET", "/projects/missing"])
        .await
        .failure()
        .stderr(predicate::str::contains("HTTP 404 Not Found: no project"));
}
