// ============================
// crates/backend-lib/src/auth/token.rs
// ============================
//! Stateless bearer tokens.
//!
//! Session tokens and password-reset tokens are both HS256 JWTs signed with
//! the same server secret. Every token carries a `typ` claim and every
//! verification checks it, so neither kind is accepted in place of the other.

use crate::config::AuthSettings;
use crate::directory::AccountId;
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Default session TTL (7 days)
pub const SESSION_TTL: Duration = Duration::from_secs(60 * 60 * 24 * 7);

/// Default reset-token TTL (15 minutes)
pub const RESET_TOKEN_TTL: Duration = Duration::from_secs(15 * 60);

/// Purpose tag carried in the `typ` claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenKind {
    #[serde(rename = "session")]
    Session,
    #[serde(rename = "pwd_reset")]
    PasswordReset,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Account id
    pub sub: String,
    pub typ: TokenKind,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
    /// Credential version the reset token was minted against
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ver: Option<u32>,
}

/// Proof that the bearer passed reset-code verification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetGrant {
    pub account_id: AccountId,
    pub credential_version: u32,
}

#[derive(Error, Debug)]
pub enum TokenError {
    /// Covers tampered, expired, malformed and wrong-purpose tokens alike
    #[error("invalid token")]
    Invalid,

    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// Mints and verifies session and reset tokens
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    session_ttl: Duration,
    reset_ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &[u8], session_ttl: Duration, reset_ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            session_ttl,
            reset_ttl,
        }
    }

    pub fn from_settings(settings: &AuthSettings) -> Self {
        Self::new(
            settings.jwt_secret.as_bytes(),
            Duration::from_secs(settings.session_ttl_secs),
            Duration::from_secs(settings.reset_token_ttl_secs),
        )
    }

    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }

    /// Mint a session token for an account
    pub fn mint(&self, account: AccountId) -> Result<String, TokenError> {
        self.sign(&self.claims(account, TokenKind::Session, self.session_ttl, None))
    }

    /// Mint a single-purpose reset token bound to the current credential version
    pub fn mint_reset_token(
        &self,
        account: AccountId,
        credential_version: u32,
    ) -> Result<String, TokenError> {
        self.sign(&self.claims(
            account,
            TokenKind::PasswordReset,
            self.reset_ttl,
            Some(credential_version),
        ))
    }

    /// Verify a session token and return the account it was minted for
    pub fn verify(&self, token: &str) -> Result<AccountId, TokenError> {
        let claims = self.decode_kind(token, TokenKind::Session)?;
        account_id(&claims)
    }

    /// Verify a reset token; session tokens are rejected
    pub fn verify_reset_purpose(&self, token: &str) -> Result<ResetGrant, TokenError> {
        let claims = self.decode_kind(token, TokenKind::PasswordReset)?;
        Ok(ResetGrant {
            account_id: account_id(&claims)?,
            credential_version: claims.ver.ok_or(TokenError::Invalid)?,
        })
    }

    fn claims(
        &self,
        account: AccountId,
        typ: TokenKind,
        ttl: Duration,
        ver: Option<u32>,
    ) -> Claims {
        let now = Utc::now().timestamp();
        let ttl = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX / 2);
        Claims {
            sub: account.to_string(),
            typ,
            iat: now,
            exp: now.saturating_add(ttl),
            jti: Uuid::new_v4().to_string(),
            ver,
        }
    }

    pub(crate) fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    fn decode_kind(&self, token: &str, expected: TokenKind) -> Result<Claims, TokenError> {
        let claims = decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(|e| {
                tracing::debug!(error = %e, "token rejected");
                TokenError::Invalid
            })?
            .claims;
        if claims.typ != expected {
            tracing::debug!(expected = ?expected, got = ?claims.typ, "token purpose mismatch");
            return Err(TokenError::Invalid);
        }
        Ok(claims)
    }
}

fn account_id(claims: &Claims) -> Result<AccountId, TokenError> {
    claims
        .sub
        .parse::<i64>()
        .map(AccountId)
        .map_err(|_| TokenError::Invalid)
}
