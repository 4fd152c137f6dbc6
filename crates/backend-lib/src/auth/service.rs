use crate::directory::{Account, AccountId, ProfileChanges};
use crate::error::AppError;
use async_trait::async_trait;
use std::time::Duration;

/// A freshly authenticated account and its session token
#[derive(Debug, Clone)]
pub struct SignedIn {
    pub account: Account,
    pub token: String,
}

/// Credential and session operations behind the HTTP surface.
///
/// Arguments arrive already checked for presence and shape; the service
/// enforces the credential rules.
#[async_trait]
pub trait AuthService: Send + Sync {
    async fn signup(&self, nickname: &str, email: &str, password: &str)
        -> Result<SignedIn, AppError>;

    /// Unknown email and wrong password both fail with `InvalidCredentials`
    async fn login(&self, email: &str, password: &str) -> Result<SignedIn, AppError>;

    async fn federated_login(&self, id_token: &str) -> Result<SignedIn, AppError>;

    /// Returns the code validity window, whether or not the email is known
    async fn request_reset_code(&self, email: &str) -> Result<Duration, AppError>;

    /// Returns a reset token
    async fn verify_reset_code(&self, email: &str, code: &str) -> Result<String, AppError>;

    async fn reset_password(&self, reset_token: &str, new_password: &str)
        -> Result<(), AppError>;

    /// Re-check email and password of the signed-in account
    async fn verify_credentials(
        &self,
        id: AccountId,
        email: &str,
        password: &str,
    ) -> Result<(), AppError>;

    async fn change_password(
        &self,
        id: AccountId,
        current_password: Option<&str>,
        new_password: Option<&str>,
    ) -> Result<(), AppError>;

    async fn profile(&self, id: AccountId) -> Result<Account, AppError>;

    async fn update_profile(
        &self,
        id: AccountId,
        changes: ProfileChanges,
    ) -> Result<Account, AppError>;
}
