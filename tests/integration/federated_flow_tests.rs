use crate::test_utils::{error_code, TestApp};
use axum::http::StatusCode;
use backend_lib::directory::{AccountId, Credential, Directory};
use serde_json::json;

#[tokio::test]
async fn test_first_login_creates_federated_only_account() {
    let app = TestApp::new();
    app.verifier
        .accept("tok-1", "g-sub-1", Some("Gamer@Mail.com"), Some("Pro Gamer"));

    let (status, body) = app.post("/api/auth/google", json!({ "idToken": "tok-1" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], "gamer@mail.com");
    assert_eq!(body["user"]["nickname"], "Pro_Gamer");

    let id = body["user"]["id"].as_i64().unwrap();
    let account = app.directory.account_by_id(AccountId(id)).await.unwrap().unwrap();
    assert_eq!(account.credential, Credential::FederatedOnly);
    assert_eq!(account.federated_id.as_deref(), Some("g-sub-1"));

    // federated-only accounts cannot log in with a password
    let (status, _) = app
        .post("/api/login", json!({ "email": "gamer@mail.com", "password": "anything" }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_repeated_login_is_idempotent() {
    let app = TestApp::new();
    app.verifier.accept("tok-1", "g-sub-1", Some("g@x.com"), None);

    let (_, first) = app.post("/api/auth/google", json!({ "idToken": "tok-1" })).await;
    let (status, second) = app.post("/api/auth/google", json!({ "idToken": "tok-1" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["user"], second["user"]);
    assert_eq!(app.directory.account_count(), 1);
    // nickname falls back to the email local part
    assert_eq!(second["user"]["nickname"], "g");
}

#[tokio::test]
async fn test_links_existing_password_account_by_email() {
    let app = TestApp::new();
    let (id, _) = app.signup("Ana", "a@x.com", "secret1").await;
    app.verifier.accept("tok-a", "g-ana", Some("A@X.com"), Some("Ana G"));

    let (status, body) = app.post("/api/auth/google", json!({ "idToken": "tok-a" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["id"], id);
    assert_eq!(body["user"]["nickname"], "Ana");

    let account = app.directory.account_by_id(AccountId(id)).await.unwrap().unwrap();
    assert_eq!(account.federated_id.as_deref(), Some("g-ana"));
    assert!(account.has_local_password());

    // the password keeps working after linking
    let (status, _) = app
        .post("/api/login", json!({ "email": "a@x.com", "password": "secret1" }))
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_existing_link_is_not_overwritten() {
    let app = TestApp::new();
    app.verifier.accept("tok-1", "g-first", Some("a@x.com"), None);
    app.verifier.accept("tok-2", "g-second", Some("a@x.com"), None);

    let (_, first) = app.post("/api/auth/google", json!({ "idToken": "tok-1" })).await;
    let (status, second) = app.post("/api/auth/google", json!({ "idToken": "tok-2" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["user"]["id"], second["user"]["id"]);

    let id = first["user"]["id"].as_i64().unwrap();
    let account = app.directory.account_by_id(AccountId(id)).await.unwrap().unwrap();
    assert_eq!(account.federated_id.as_deref(), Some("g-first"));
}

#[tokio::test]
async fn test_assertion_without_email() {
    let app = TestApp::new();
    app.verifier.accept("tok-anon", "g-anon", None, Some("Anon"));

    let (status, body) = app
        .post("/api/auth/google", json!({ "idToken": "tok-anon" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "AUTH_004");
    assert_eq!(app.directory.account_count(), 0);
}

#[tokio::test]
async fn test_invalid_assertion() {
    let app = TestApp::new();
    let (status, body) = app
        .post("/api/auth/google", json!({ "idToken": "forged" }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), "AUTH_003");

    let (status, body) = app.post("/api/auth/google", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "VAL_001");
}

#[tokio::test]
async fn test_disabled_without_verifier() {
    let app = TestApp::without_federated();
    let (status, body) = app.post("/api/auth/google", json!({ "idToken": "tok" })).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(error_code(&body), "AUTH_005");
}

#[tokio::test]
async fn test_federated_only_account_cannot_change_password_locally() {
    let app = TestApp::new();
    app.verifier.accept("tok-1", "g-sub-1", Some("g@x.com"), Some("G"));
    let (_, body) = app.post("/api/auth/google", json!({ "idToken": "tok-1" })).await;
    let token = body["token"].as_str().unwrap();

    let (status, body) = app
        .patch_authed(
            "/api/account/password",
            token,
            json!({ "currentPassword": "anything", "newPassword": "newpass1" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "NO_LOCAL_PASSWORD");
}

#[tokio::test]
async fn test_federated_only_account_can_set_password_via_reset() {
    let app = TestApp::new();
    app.verifier.accept("tok-1", "g-sub-1", Some("g@x.com"), Some("G"));
    app.post("/api/auth/google", json!({ "idToken": "tok-1" })).await;

    app.post("/api/auth/forgot", json!({ "email": "g@x.com" })).await;
    let code = app.notifier.last_code_for("g@x.com").unwrap();
    let (_, body) = app
        .post("/api/auth/forgot/verify", json!({ "email": "g@x.com", "code": code }))
        .await;
    let reset_token = body["resetToken"].as_str().unwrap();
    let (status, _) = app
        .post(
            "/api/auth/reset",
            json!({ "resetToken": reset_token, "newPassword": "local-pw" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .post("/api/login", json!({ "email": "g@x.com", "password": "local-pw" }))
        .await;
    assert_eq!(status, StatusCode::OK);
}
