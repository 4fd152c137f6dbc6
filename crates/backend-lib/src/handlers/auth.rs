// ============================
// crates/backend-lib/src/handlers/auth.rs
// ============================
//! Public authentication endpoints: signup, login, federated login and the
//! password-reset flow.

use crate::auth::SignedIn;
use crate::directory::normalize_email;
use crate::error::AppError;
use crate::middleware::ClientAddr;
use crate::validation::{required, required_secret, validate_email, validate_nickname};
use crate::AppState;
use axum::{extract::State, Json};
use gamefinder_common::{
    Ack, AuthResponse, FederatedLoginRequest, ForgotPasswordRequest, ForgotPasswordResponse,
    LoginRequest, ResetPasswordRequest, SignupRequest, VerifyCodeRequest, VerifyCodeResponse,
};
use std::sync::Arc;

fn auth_response(signed_in: SignedIn) -> Json<AuthResponse> {
    Json(AuthResponse {
        user: signed_in.account.summary(),
        token: signed_in.token,
    })
}

/// `POST /api/signup`
pub async fn signup(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignupRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let nickname = validate_nickname(required(&req.nickname, "nickname")?)?;
    let email = validate_email(required(&req.email, "email")?)?;
    let password = required_secret(&req.password, "password")?;

    let signed_in = state.auth.signup(nickname, email, password).await?;
    Ok(auth_response(signed_in))
}

/// `POST /api/login`
pub async fn login(
    State(state): State<Arc<AppState>>,
    ClientAddr(client): ClientAddr,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let email = required(&req.email, "email")?;
    let password = required_secret(&req.password, "password")?;

    let key = format!("login:{client}");
    if !state.rate_limiter.check(&key) {
        return Err(AppError::RateLimited);
    }
    match state.auth.login(email, password).await {
        Ok(signed_in) => {
            state.rate_limiter.record_success(&key);
            Ok(auth_response(signed_in))
        },
        Err(AppError::InvalidCredentials) => {
            state.rate_limiter.record_failed_attempt(&key);
            Err(AppError::InvalidCredentials)
        },
        Err(e) => Err(e),
    }
}

/// `POST /api/auth/google`
pub async fn federated_login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<FederatedLoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let id_token = required(&req.id_token, "idToken")?;
    let signed_in = state.auth.federated_login(id_token).await?;
    Ok(auth_response(signed_in))
}

/// `POST /api/auth/forgot`
pub async fn forgot_password(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ForgotPasswordRequest>,
) -> Result<Json<ForgotPasswordResponse>, AppError> {
    let email = required(&req.email, "email")?;
    let window = state.auth.request_reset_code(email).await?;
    Ok(Json(ForgotPasswordResponse {
        ok: true,
        sent: true,
        expires_in: window.as_secs(),
    }))
}

/// `POST /api/auth/forgot/verify`
pub async fn verify_reset_code(
    State(state): State<Arc<AppState>>,
    Json(req): Json<VerifyCodeRequest>,
) -> Result<Json<VerifyCodeResponse>, AppError> {
    let email = required(&req.email, "email")?;
    let code = required(&req.code, "code")?;

    // keyed by account: four-digit codes are guessable from many addresses
    let key = format!("reset:{}", normalize_email(email));
    if !state.rate_limiter.check(&key) {
        return Err(AppError::RateLimited);
    }
    match state.auth.verify_reset_code(email, code).await {
        Ok(reset_token) => {
            state.rate_limiter.record_success(&key);
            Ok(Json(VerifyCodeResponse {
                ok: true,
                reset_token,
            }))
        },
        Err(e @ (AppError::InvalidCode | AppError::CodeExpired | AppError::CodeAlreadyUsed)) => {
            state.rate_limiter.record_failed_attempt(&key);
            Err(e)
        },
        Err(e) => Err(e),
    }
}

/// `POST /api/auth/reset`
pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<Json<Ack>, AppError> {
    let reset_token = required(&req.reset_token, "resetToken")?;
    let new_password = required_secret(&req.new_password, "newPassword")?;
    state.auth.reset_password(reset_token, new_password).await?;
    Ok(Json(Ack::OK))
}
