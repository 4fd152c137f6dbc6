use crate::test_utils::{error_code, TestApp};
use axum::http::{Method, StatusCode};
use serde_json::json;

#[tokio::test]
async fn test_me_returns_own_profile() {
    let app = TestApp::new();
    let (id, token) = app.signup("Ana", "a@x.com", "secret1").await;

    let (status, body) = app.get_authed("/api/account/me", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "id": id, "nickname": "Ana", "email": "a@x.com" }));
}

#[tokio::test]
async fn test_verify_current_credentials() {
    let app = TestApp::new();
    let (_, token) = app.signup("Ana", "a@x.com", "secret1").await;

    let (status, body) = app
        .post_authed(
            "/api/account/email/verify-current",
            &token,
            json!({ "email": "A@x.com", "password": "secret1" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "ok": true }));

    let (wrong_pw, wrong_pw_body) = app
        .post_authed(
            "/api/account/email/verify-current",
            &token,
            json!({ "email": "a@x.com", "password": "nope" }),
        )
        .await;
    let (wrong_email, wrong_email_body) = app
        .post_authed(
            "/api/account/email/verify-current",
            &token,
            json!({ "email": "b@x.com", "password": "secret1" }),
        )
        .await;
    assert_eq!(wrong_pw, StatusCode::BAD_REQUEST);
    assert_eq!(wrong_email, StatusCode::BAD_REQUEST);
    assert_eq!(wrong_pw_body, wrong_email_body);
    assert_eq!(wrong_pw_body["error"]["message"], "Invalid email or password");
}

#[tokio::test]
async fn test_change_password_error_codes() {
    let app = TestApp::new();
    let (_, token) = app.signup("Ana", "a@x.com", "secret1").await;

    let cases = [
        (json!({ "newPassword": "newpass1" }), "CURRENT_REQUIRED"),
        (json!({ "currentPassword": "", "newPassword": "newpass1" }), "CURRENT_REQUIRED"),
        (json!({ "currentPassword": "secret1", "newPassword": "123" }), "NEW_WEAK"),
        (json!({ "currentPassword": "secret1" }), "NEW_WEAK"),
        (json!({ "currentPassword": "wrong", "newPassword": "newpass1" }), "CURRENT_INCORRECT"),
    ];
    for (body, code) in cases {
        let (status, response) = app.patch_authed("/api/account/password", &token, body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "expected {code}");
        assert_eq!(error_code(&response), code);
    }
}

#[tokio::test]
async fn test_change_password_success() {
    let app = TestApp::new();
    let (_, token) = app.signup("Ana", "a@x.com", "secret1").await;

    let (status, body) = app
        .patch_authed(
            "/api/account/password",
            &token,
            json!({ "currentPassword": "secret1", "newPassword": "newpass1" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "ok": true }));

    let (status, _) = app
        .post("/api/login", json!({ "email": "a@x.com", "password": "secret1" }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = app
        .post("/api/login", json!({ "email": "a@x.com", "password": "newpass1" }))
        .await;
    assert_eq!(status, StatusCode::OK);

    // existing sessions stay valid
    let (status, _) = app.get_authed("/api/account/me", &token).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_update_profile() {
    let app = TestApp::new();
    let (id, token) = app.signup("Ana", "a@x.com", "secret1").await;

    let (status, body) = app
        .patch_authed("/api/account", &token, json!({ "nickname": "Anabel" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "id": id, "nickname": "Anabel", "email": "a@x.com" }));

    let (status, body) = app
        .patch_authed("/api/account", &token, json!({ "email": "New@X.com" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "new@x.com");
    assert_eq!(body["nickname"], "Anabel");

    let (status, _) = app
        .post("/api/login", json!({ "email": "new@x.com", "password": "secret1" }))
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_update_profile_rejections() {
    let app = TestApp::new();
    app.signup("Taken", "taken@x.com", "secret1").await;
    let (_, token) = app.signup("Ana", "a@x.com", "secret1").await;

    let (status, body) = app.patch_authed("/api/account", &token, json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "VAL_001");

    let (status, _) = app
        .patch_authed("/api/account", &token, json!({ "email": "broken" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .patch_authed("/api/account", &token, json!({ "nickname": "x".repeat(51) }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .patch_authed("/api/account", &token, json!({ "nickname": "Taken" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["message"], "Nickname already in use");

    let (status, _) = app
        .patch_authed("/api/account", &token, json!({ "email": "TAKEN@x.com" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_account_routes_require_session() {
    let app = TestApp::new();
    for (method, uri) in [
        (Method::GET, "/api/account/me"),
        (Method::PATCH, "/api/account"),
        (Method::PATCH, "/api/account/password"),
        (Method::POST, "/api/account/email/verify-current"),
    ] {
        let (status, body) = app.send(method, uri, None, Some(json!({}))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
        assert_eq!(error_code(&body), "AUTH_001");
    }
}
