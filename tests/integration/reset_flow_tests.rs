use crate::test_utils::{error_code, test_settings, TestApp};
use axum::http::StatusCode;
use backend_lib::auth::hash_password;
use backend_lib::directory::{AccountId, Directory, NewResetCode};
use chrono::Utc;
use serde_json::json;
use std::time::Duration;

async fn request_code(app: &TestApp, email: &str) -> String {
    let (status, body) = app.post("/api/auth/forgot", json!({ "email": email })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "ok": true, "sent": true, "expiresIn": 60 }));
    app.notifier.last_code_for(email).unwrap()
}

async fn verify(app: &TestApp, email: &str, code: &str) -> (StatusCode, serde_json::Value) {
    app.post("/api/auth/forgot/verify", json!({ "email": email, "code": code }))
        .await
}

#[tokio::test]
async fn test_full_reset_scenario() {
    let app = TestApp::new();
    app.signup("Ana", "a@x.com", "secret1").await;

    let code = request_code(&app, "a@x.com").await;
    assert_eq!(code.len(), 4);
    assert!(code.chars().all(|c| c.is_ascii_digit()));
    assert_eq!(app.notifier.sent()[0].validity, Duration::from_secs(60));

    let (status, body) = verify(&app, "a@x.com", &code).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    let reset_token = body["resetToken"].as_str().unwrap().to_string();

    let (status, body) = app
        .post(
            "/api/auth/reset",
            json!({ "resetToken": reset_token, "newPassword": "newpass1" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "ok": true }));

    let (status, _) = app
        .post(
            "/api/auth/reset",
            json!({ "resetToken": reset_token, "newPassword": "newpass2" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post("/api/login", json!({ "email": "a@x.com", "password": "newpass1" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app
        .post("/api/login", json!({ "email": "a@x.com", "password": "newpass2" }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unknown_email_gets_same_response() {
    let app = TestApp::new();
    let (status, body) = app
        .post("/api/auth/forgot", json!({ "email": "nobody@x.com" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "ok": true, "sent": true, "expiresIn": 60 }));
    assert!(app.notifier.sent().is_empty());
}

#[tokio::test]
async fn test_second_verify_reports_already_used() {
    let app = TestApp::new();
    app.signup("Ana", "a@x.com", "secret1").await;
    let code = request_code(&app, "a@x.com").await;

    let (status, _) = verify(&app, "a@x.com", &code).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = verify(&app, "a@x.com", &code).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "Code already used");
}

#[tokio::test]
async fn test_expired_code() {
    let app = TestApp::new();
    let (id, _) = app.signup("Ana", "a@x.com", "secret1").await;
    app.directory
        .insert_reset_code(NewResetCode {
            account_id: AccountId(id),
            code_hash: hash_password("4321").unwrap(),
            expires_at: Utc::now() - chrono::Duration::seconds(5),
        })
        .await
        .unwrap();

    let (status, body) = verify(&app, "a@x.com", "4321").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "Code expired");
}

#[tokio::test]
async fn test_wrong_code_and_unknown_account_are_indistinguishable() {
    let app = TestApp::new();
    app.signup("Ana", "a@x.com", "secret1").await;
    let code = request_code(&app, "a@x.com").await;
    let wrong = if code == "9999" { "1000" } else { "9999" };

    let (s1, b1) = verify(&app, "a@x.com", wrong).await;
    let (s2, b2) = verify(&app, "nobody@x.com", &code).await;
    assert_eq!(s1, StatusCode::BAD_REQUEST);
    assert_eq!((s1, b1), (s2, b2));
}

#[tokio::test]
async fn test_only_the_latest_code_verifies() {
    let app = TestApp::new();
    app.signup("Ana", "a@x.com", "secret1").await;
    let first = request_code(&app, "a@x.com").await;
    let second = request_code(&app, "a@x.com").await;

    if first != second {
        let (status, _) = verify(&app, "a@x.com", &first).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
    let (status, _) = verify(&app, "a@x.com", &second).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_notifier_failure_is_bad_gateway() {
    let app = TestApp::new();
    let (id, _) = app.signup("Ana", "a@x.com", "secret1").await;
    app.notifier.set_failing(true);

    let (status, body) = app.post("/api/auth/forgot", json!({ "email": "a@x.com" })).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(error_code(&body), "UPSTREAM_001");
    // the code row stays
    assert_eq!(app.directory.reset_codes_for(AccountId(id)).len(), 1);
}

#[tokio::test]
async fn test_session_token_is_not_a_reset_token() {
    let app = TestApp::new();
    let (_, session) = app.signup("Ana", "a@x.com", "secret1").await;

    let (status, body) = app
        .post(
            "/api/auth/reset",
            json!({ "resetToken": session, "newPassword": "newpass1" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "RESET_004");
}

#[tokio::test]
async fn test_reset_token_is_not_a_session_token() {
    let app = TestApp::new();
    app.signup("Ana", "a@x.com", "secret1").await;
    let code = request_code(&app, "a@x.com").await;
    let (_, body) = verify(&app, "a@x.com", &code).await;
    let reset_token = body["resetToken"].as_str().unwrap();

    let (status, _) = app.get_authed("/api/account/me", reset_token).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_weak_new_password_is_rejected() {
    let app = TestApp::new();
    app.signup("Ana", "a@x.com", "secret1").await;
    let code = request_code(&app, "a@x.com").await;
    let (_, body) = verify(&app, "a@x.com", &code).await;
    let reset_token = body["resetToken"].as_str().unwrap();

    let (status, body) = app
        .post(
            "/api/auth/reset",
            json!({ "resetToken": reset_token, "newPassword": "12345" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "NEW_WEAK");
}

#[tokio::test]
async fn test_code_guessing_locks_out_the_account() {
    let mut settings = test_settings();
    settings.auth.max_failed_attempts = 3;
    let app = TestApp::with_settings(settings);
    app.signup("Ana", "a@x.com", "secret1").await;
    let code = request_code(&app, "a@x.com").await;
    let wrong = if code == "9999" { "1000" } else { "9999" };

    for _ in 0..3 {
        let (status, _) = verify(&app, "a@x.com", wrong).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
    let (status, _) = verify(&app, "A@x.com", &code).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_custom_code_window_is_reported() {
    let mut settings = test_settings();
    settings.reset.code_ttl_secs = 120;
    let app = TestApp::with_settings(settings);
    app.signup("Ana", "a@x.com", "secret1").await;

    let (_, body) = app.post("/api/auth/forgot", json!({ "email": "a@x.com" })).await;
    assert_eq!(body["expiresIn"], 120);
    let (_, body) = app.post("/api/auth/forgot", json!({ "email": "ghost@x.com" })).await;
    assert_eq!(body["expiresIn"], 120);
}
