// ================
// common/src/lib.rs
// ================
//! Wire types shared between the GameFinder API server and its clients.
//!
//! Request bodies keep every field optional so that a missing field is
//! reported by the server with a field-specific message instead of a
//! generic deserialization failure.

use serde::{Deserialize, Serialize};

/// Public view of an account
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AccountSummary {
    pub id: i64,
    pub nickname: String,
    pub email: String,
}

/// `POST /api/signup`
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct SignupRequest {
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// `POST /api/login`
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// `POST /api/auth/google`
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct FederatedLoginRequest {
    #[serde(default)]
    pub id_token: Option<String>,
}

/// Returned by signup, login and federated login
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AuthResponse {
    pub user: AccountSummary,
    /// Bearer session token
    pub token: String,
}

/// `POST /api/auth/forgot`
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct ForgotPasswordRequest {
    #[serde(default)]
    pub email: Option<String>,
}

/// Acknowledgment for a reset-code request.
///
/// The same shape is returned whether or not the email belongs to an account.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ForgotPasswordResponse {
    pub ok: bool,
    pub sent: bool,
    /// Validity window of the code, in seconds
    pub expires_in: u64,
}

/// `POST /api/auth/forgot/verify`
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct VerifyCodeRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct VerifyCodeResponse {
    pub ok: bool,
    pub reset_token: String,
}

/// `POST /api/auth/reset`
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    #[serde(default)]
    pub reset_token: Option<String>,
    #[serde(default)]
    pub new_password: Option<String>,
}

/// `POST /api/account/email/verify-current`
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct VerifyCredentialsRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// `PATCH /api/account/password`
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub current_password: Option<String>,
    #[serde(default)]
    pub new_password: Option<String>,
}

/// `PATCH /api/account`
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Generic `{ "ok": true }` acknowledgment
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ack {
    pub ok: bool,
}

impl Ack {
    pub const OK: Ack = Ack { ok: true };
}

/// Error envelope: `{ "error": { "code": ..., "message": ... } }`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ErrorDetail {
    /// Stable machine-readable code, e.g. `AUTH_002`
    pub code: String,
    pub message: String,
}
