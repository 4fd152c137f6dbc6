// ============================
// crates/backend-lib/src/error.rs
// ============================
//! Central error type + Axum integration.
use crate::directory::{DirectoryError, UniqueField};
use crate::notify::NotifyError;
use crate::auth::token::TokenError;
use crate::validation::ValidationError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use gamefinder_common::{ErrorBody, ErrorDetail};
use thiserror::Error;

/// Application error types with error codes
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Unauthorized")]
    Unauthorized,

    /// Unknown email and wrong password are the same error
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Email/password re-check on an authenticated account failed
    #[error("Credential mismatch")]
    CredentialMismatch,

    #[error("Current password is required")]
    CurrentPasswordRequired,

    #[error("Current password is incorrect")]
    CurrentPasswordIncorrect,

    #[error("New password is too weak")]
    WeakPassword,

    #[error("Account has no local password")]
    NoLocalPassword,

    #[error("Invalid code")]
    InvalidCode,

    #[error("Code already used")]
    CodeAlreadyUsed,

    #[error("Code expired")]
    CodeExpired,

    #[error("Invalid reset token")]
    InvalidResetToken,

    #[error("Invalid federated assertion")]
    InvalidAssertion,

    #[error("Federated account has no email")]
    AssertionWithoutEmail,

    #[error("Federated login is not configured")]
    FederatedDisabled,

    #[error("{0} already in use")]
    Conflict(UniqueField),

    #[error("Not found: {0}")]
    NotFound(&'static str),

    #[error("Upstream failure: {0}")]
    Upstream(String),

    #[error("Authentication rate limit exceeded")]
    RateLimited,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized | AppError::InvalidCredentials | AppError::InvalidAssertion => {
                StatusCode::UNAUTHORIZED
            },
            AppError::Validation(_)
            | AppError::CredentialMismatch
            | AppError::CurrentPasswordRequired
            | AppError::CurrentPasswordIncorrect
            | AppError::WeakPassword
            | AppError::NoLocalPassword
            | AppError::InvalidCode
            | AppError::CodeAlreadyUsed
            | AppError::CodeExpired
            | AppError::InvalidResetToken
            | AppError::AssertionWithoutEmail => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::FederatedDisabled => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the stable error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VAL_001",
            AppError::Unauthorized => "AUTH_001",
            AppError::InvalidCredentials => "AUTH_002",
            AppError::InvalidAssertion => "AUTH_003",
            AppError::AssertionWithoutEmail => "AUTH_004",
            AppError::FederatedDisabled => "AUTH_005",
            AppError::RateLimited => "AUTH_006",
            AppError::CredentialMismatch => "ACC_001",
            AppError::CurrentPasswordRequired => "CURRENT_REQUIRED",
            AppError::CurrentPasswordIncorrect => "CURRENT_INCORRECT",
            AppError::WeakPassword => "NEW_WEAK",
            AppError::NoLocalPassword => "NO_LOCAL_PASSWORD",
            AppError::InvalidCode => "RESET_001",
            AppError::CodeAlreadyUsed => "RESET_002",
            AppError::CodeExpired => "RESET_003",
            AppError::InvalidResetToken => "RESET_004",
            AppError::Conflict(_) => "CONFLICT_001",
            AppError::NotFound(_) => "NF_001",
            AppError::Upstream(_) => "UPSTREAM_001",
            AppError::Internal(_) => "INT_001",
        }
    }

    /// Message safe to show to clients
    pub fn public_message(&self) -> String {
        match self {
            AppError::Validation(e) => e.to_string(),
            AppError::Unauthorized => "Unauthorized".to_string(),
            AppError::InvalidCredentials => "Invalid credentials".to_string(),
            AppError::CredentialMismatch => "Invalid email or password".to_string(),
            AppError::CurrentPasswordRequired => "Current password is required".to_string(),
            AppError::CurrentPasswordIncorrect => "Current password is incorrect".to_string(),
            AppError::WeakPassword => ValidationError::WeakPassword.to_string(),
            AppError::NoLocalPassword => {
                "This account has no local password set. Use \"Forgot password\" to create one."
                    .to_string()
            },
            AppError::InvalidCode => "Invalid code".to_string(),
            AppError::CodeAlreadyUsed => "Code already used".to_string(),
            AppError::CodeExpired => "Code expired".to_string(),
            AppError::InvalidResetToken => "Invalid or expired reset token".to_string(),
            AppError::InvalidAssertion => "Invalid Google token".to_string(),
            AppError::AssertionWithoutEmail => "Google account has no email".to_string(),
            AppError::FederatedDisabled => "Google login is not available".to_string(),
            AppError::Conflict(field) => format!("{field} already in use"),
            AppError::NotFound(what) => format!("{what} not found"),
            AppError::Upstream(_) => "Failed to send the code, please try again".to_string(),
            AppError::RateLimited => {
                "Too many authentication attempts, please try again later".to_string()
            },
            AppError::Internal(_) => "An internal server error occurred".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match &self {
            AppError::Internal(detail) => tracing::error!(error = %detail, "internal error"),
            AppError::Upstream(detail) => tracing::error!(error = %detail, "upstream failure"),
            _ => {},
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: self.error_code().to_string(),
                message: self.public_message(),
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<DirectoryError> for AppError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::Conflict(field) => AppError::Conflict(field),
            DirectoryError::NotFound => AppError::NotFound("User"),
            DirectoryError::Unavailable(detail) => AppError::Internal(detail),
        }
    }
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Invalid => AppError::Unauthorized,
            TokenError::Signing(detail) => AppError::Internal(detail),
        }
    }
}

impl From<NotifyError> for AppError {
    fn from(err: NotifyError) -> Self {
        AppError::Upstream(err.to_string())
    }
}

impl From<argon2::password_hash::Error> for AppError {
    fn from(err: argon2::password_hash::Error) -> Self {
        AppError::Internal(format!("password hashing failed: {err}"))
    }
}
