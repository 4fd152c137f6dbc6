// ============================
// crates/backend-lib/src/auth/reset.rs
// ============================
//! Password reset codes.
//!
//! Per account, only the most recently created code is eligible. A code is
//! usable while `now < expires_at` and `used_at` is unset; a successful
//! verification spends it and yields a reset token bound to the account's
//! credential version. Consuming the token bumps that version, so a token
//! works at most once.
//!
//! Every request and verification runs exactly one hash or verify through
//! the [`CodeHasher`], whether or not the email belongs to an account.

use super::password::{hash_password_blocking, verify_password_blocking};
use super::token::TokenService;
use crate::directory::{normalize_email, Directory, NewResetCode};
use crate::error::AppError;
use crate::metrics::{RESET_CODE_ISSUED, RESET_CODE_REJECTED, RESET_COMPLETED};
use crate::notify::Notifier;
use crate::validation::validate_new_password;
use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use zeroize::Zeroizing;

pub const CODE_MIN: u16 = 1000;
pub const CODE_MAX: u16 = 9999;

/// Default validity window of a code
pub const CODE_TTL: Duration = Duration::from_secs(60);

/// Uniform random 4-digit code
pub fn generate_code() -> String {
    rand::rng().random_range(CODE_MIN..=CODE_MAX).to_string()
}

/// One-way hashing of reset codes
#[async_trait]
pub trait CodeHasher: Send + Sync {
    async fn hash(&self, code: String) -> Result<String, argon2::password_hash::Error>;

    /// `None` runs a dummy verification and returns false
    async fn verify(&self, hash: Option<String>, code: String) -> bool;
}

/// Argon2id on the blocking pool, same parameters as passwords
#[derive(Debug, Clone, Copy, Default)]
pub struct Argon2CodeHasher;

#[async_trait]
impl CodeHasher for Argon2CodeHasher {
    async fn hash(&self, code: String) -> Result<String, argon2::password_hash::Error> {
        hash_password_blocking(code).await
    }

    async fn verify(&self, hash: Option<String>, code: String) -> bool {
        verify_password_blocking(hash, code).await
    }
}

/// Issues, verifies and consumes reset codes
pub struct ResetCodeService {
    directory: Arc<dyn Directory>,
    notifier: Arc<dyn Notifier>,
    tokens: Arc<TokenService>,
    hasher: Arc<dyn CodeHasher>,
    code_ttl: Duration,
}

impl ResetCodeService {
    pub fn new(
        directory: Arc<dyn Directory>,
        notifier: Arc<dyn Notifier>,
        tokens: Arc<TokenService>,
        code_ttl: Duration,
    ) -> Self {
        Self {
            directory,
            notifier,
            tokens,
            hasher: Arc::new(Argon2CodeHasher),
            code_ttl,
        }
    }

    pub fn with_hasher(mut self, hasher: Arc<dyn CodeHasher>) -> Self {
        self.hasher = hasher;
        self
    }

    /// Issue a code for `email` and hand it to the notifier.
    ///
    /// Unknown emails and directory lookup failures return the same `Ok` as a
    /// sent code, after hashing a throwaway code. Only a notifier failure,
    /// after the code row is stored, is reported.
    pub async fn request_code(&self, email: &str) -> Result<Duration, AppError> {
        let email = normalize_email(email);
        let lookup = self.directory.account_by_email(&email).await;
        let code = Zeroizing::new(generate_code());
        let hashed = self.hasher.hash(code.to_string()).await;

        let account = match lookup {
            Ok(Some(account)) => account,
            Ok(None) => {
                tracing::debug!(email = %email, "reset requested for unknown email");
                return Ok(self.code_ttl);
            },
            Err(e) => {
                tracing::error!(error = %e, "reset lookup failed, reporting success");
                return Ok(self.code_ttl);
            },
        };

        let code_hash = hashed?;
        let ttl = chrono::Duration::from_std(self.code_ttl)
            .map_err(|e| AppError::Internal(e.to_string()))?;
        self.directory
            .insert_reset_code(NewResetCode {
                account_id: account.id,
                code_hash,
                expires_at: Utc::now() + ttl,
            })
            .await?;
        metrics::counter!(RESET_CODE_ISSUED).increment(1);
        tracing::info!(account_id = %account.id, "reset code issued");

        if let Err(e) = self.notifier.send(&account.email, &code, self.code_ttl).await {
            tracing::warn!(account_id = %account.id, error = %e, "reset code delivery failed");
            return Err(e.into());
        }
        Ok(self.code_ttl)
    }

    /// Check a code against the account's latest one and mint a reset token
    pub async fn verify_code(&self, email: &str, code: &str) -> Result<String, AppError> {
        let result = self.check_code(email, code).await;
        if let Err(e) = &result {
            metrics::counter!(RESET_CODE_REJECTED).increment(1);
            tracing::debug!(reason = e.error_code(), "reset code rejected");
        }
        result
    }

    async fn check_code(&self, email: &str, code: &str) -> Result<String, AppError> {
        let account = self
            .directory
            .account_by_email(&normalize_email(email))
            .await?;
        let candidate = match account {
            Some(account) => self
                .directory
                .latest_reset_code(account.id)
                .await?
                .map(|latest| (account, latest)),
            None => None,
        };

        // verify before branching so a missing account or code costs the same
        let stored_hash = candidate.as_ref().map(|(_, latest)| latest.code_hash.clone());
        let matches = self.hasher.verify(stored_hash, code.trim().to_string()).await;
        let (account, latest) = candidate.ok_or(AppError::InvalidCode)?;

        if latest.is_used() {
            return Err(AppError::CodeAlreadyUsed);
        }
        let now = Utc::now();
        if latest.is_expired(now) {
            return Err(AppError::CodeExpired);
        }
        if !matches {
            return Err(AppError::InvalidCode);
        }
        if !self.directory.mark_reset_code_used(latest.id, now).await? {
            // a concurrent verification spent it first
            return Err(AppError::CodeAlreadyUsed);
        }

        Ok(self
            .tokens
            .mint_reset_token(account.id, account.credential_version)?)
    }

    /// Set a new password with a reset token
    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), AppError> {
        let grant = self
            .tokens
            .verify_reset_purpose(token)
            .map_err(|_| AppError::InvalidResetToken)?;
        validate_new_password(new_password).map_err(|_| AppError::WeakPassword)?;

        let hash = hash_password_blocking(new_password.to_string()).await?;
        let written = match self
            .directory
            .replace_password(grant.account_id, &hash, grant.credential_version)
            .await
        {
            Ok(written) => written,
            Err(crate::directory::DirectoryError::NotFound) => false,
            Err(e) => return Err(e.into()),
        };
        if !written {
            tracing::debug!(account_id = %grant.account_id, "stale reset token");
            return Err(AppError::InvalidResetToken);
        }

        metrics::counter!(RESET_COMPLETED).increment(1);
        tracing::info!(account_id = %grant.account_id, "password reset completed");
        Ok(())
    }
}
