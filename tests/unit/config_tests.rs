use crate::test_utils::TEST_SECRET;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use backend_lib::config::{ConfigError, LogFormat, Settings};
use backend_lib::directory::MemoryDirectory;
use backend_lib::router::create_router;
use backend_lib::AppState;
use std::sync::Arc;
use tempfile::tempdir;
use tower::ServiceExt;

fn write_config(body: &str) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("gamefinder.toml");
    std::fs::write(&path, body).unwrap();
    (dir, path)
}

async fn federated_status(settings: Settings) -> StatusCode {
    let state = AppState::from_settings(settings, Arc::new(MemoryDirectory::new())).unwrap();
    let router = create_router(Arc::new(state));
    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/google")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"idToken":"not-a-jwt"}"#))
        .unwrap();
    router.oneshot(request).await.unwrap().status()
}

#[test]
fn test_file_values_reach_settings() {
    let (_dir, path) = write_config(&format!(
        r#"
        log_format = "json"

        [server]
        host = "0.0.0.0"
        port = 8088

        [auth]
        jwt_secret = "{TEST_SECRET}"
        max_failed_attempts = 3

        [reset]
        code_ttl_secs = 90
        mail_from = "games@example.com"
        "#
    ));

    let settings = Settings::load_from(&path).unwrap();
    assert_eq!(settings.bind_addr().unwrap().to_string(), "0.0.0.0:8088");
    assert_eq!(settings.log_format, LogFormat::Json);
    assert_eq!(settings.auth.max_failed_attempts, 3);
    assert_eq!(settings.reset.code_ttl_secs, 90);
    assert_eq!(settings.reset.mail_from, "games@example.com");
    // untouched sections keep defaults
    assert_eq!(settings.auth.session_ttl_secs, 604_800);
}

#[test]
fn test_short_secret_is_rejected_at_load() {
    let (_dir, path) = write_config("[auth]\njwt_secret = \"too-short\"\n");
    assert!(matches!(
        Settings::load_from(&path),
        Err(ConfigError::Invalid(_))
    ));
}

#[test]
fn test_malformed_file_is_a_load_error() {
    let (_dir, path) = write_config("[server\nport = ");
    assert!(matches!(Settings::load_from(&path), Err(ConfigError::Load(_))));
}

#[tokio::test]
async fn test_federated_login_disabled_without_project() {
    let mut settings = Settings::default();
    settings.auth.jwt_secret = TEST_SECRET.to_string();
    assert_eq!(federated_status(settings).await, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_federated_login_enabled_with_project() {
    let mut settings = Settings::default();
    settings.auth.jwt_secret = TEST_SECRET.to_string();
    settings.federated.project_id = Some("gamefinder-test".to_string());
    // malformed tokens are refused before any key fetch
    assert_eq!(federated_status(settings).await, StatusCode::UNAUTHORIZED);
}
