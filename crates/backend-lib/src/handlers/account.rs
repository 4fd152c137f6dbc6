// ============================
// crates/backend-lib/src/handlers/account.rs
// ============================
//! Endpoints for the signed-in account.

use crate::directory::ProfileChanges;
use crate::error::AppError;
use crate::middleware::CurrentAccount;
use crate::validation::{required, required_secret, validate_email, validate_nickname};
use crate::AppState;
use axum::{extract::State, Json};
use gamefinder_common::{
    AccountSummary, Ack, ChangePasswordRequest, UpdateProfileRequest, VerifyCredentialsRequest,
};
use std::sync::Arc;

/// `GET /api/account/me`
pub async fn me(
    State(state): State<Arc<AppState>>,
    CurrentAccount(id): CurrentAccount,
) -> Result<Json<AccountSummary>, AppError> {
    let account = state.auth.profile(id).await?;
    Ok(Json(account.summary()))
}

/// `POST /api/account/email/verify-current`
pub async fn verify_current(
    State(state): State<Arc<AppState>>,
    CurrentAccount(id): CurrentAccount,
    Json(req): Json<VerifyCredentialsRequest>,
) -> Result<Json<Ack>, AppError> {
    let email = required(&req.email, "email")?;
    let password = required_secret(&req.password, "password")?;
    state.auth.verify_credentials(id, email, password).await?;
    Ok(Json(Ack::OK))
}

/// `PATCH /api/account/password`
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    CurrentAccount(id): CurrentAccount,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<Json<Ack>, AppError> {
    state
        .auth
        .change_password(
            id,
            req.current_password.as_deref(),
            req.new_password.as_deref(),
        )
        .await?;
    Ok(Json(Ack::OK))
}

/// `PATCH /api/account`
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    CurrentAccount(id): CurrentAccount,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<AccountSummary>, AppError> {
    // a field that is present must be valid; absent fields stay unchanged
    let changes = ProfileChanges {
        nickname: req
            .nickname
            .as_deref()
            .map(validate_nickname)
            .transpose()?
            .map(str::to_string),
        email: req
            .email
            .as_deref()
            .map(validate_email)
            .transpose()?
            .map(str::to_string),
    };
    let account = state.auth.update_profile(id, changes).await?;
    Ok(Json(account.summary()))
}
