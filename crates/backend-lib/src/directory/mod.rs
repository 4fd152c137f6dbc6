// ============================
// crates/backend-lib/src/directory/mod.rs
// ============================
//! Identity directory contract.
//!
//! The directory is the durable record of accounts and reset codes. It is
//! owned by an external store; the rest of the crate only talks to it through
//! the [`Directory`] trait. Uniqueness of `email` and `nickname` is enforced
//! here and surfaced as [`DirectoryError::Conflict`], which callers treat as
//! the concurrency backstop for account creation.

mod memory;
#[cfg(feature = "postgres")]
mod postgres;

pub use memory::MemoryDirectory;
#[cfg(feature = "postgres")]
pub use postgres::PostgresDirectory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gamefinder_common::AccountSummary;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Store-assigned account identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountId(pub i64);

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How an account proves possession of its identity locally
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// PHC-formatted hash of the local password
    Password(String),
    /// Created through federated login; no local password yet
    FederatedOnly,
}

impl Credential {
    pub fn password_hash(&self) -> Option<&str> {
        match self {
            Credential::Password(hash) => Some(hash),
            Credential::FederatedOnly => None,
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::Password(_) => f.write_str("Password(<redacted>)"),
            Credential::FederatedOnly => f.write_str("FederatedOnly"),
        }
    }
}

/// Identity record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: AccountId,
    pub nickname: String,
    pub email: String,
    pub credential: Credential,
    /// External provider subject; set at most once
    pub federated_id: Option<String>,
    /// Bumped on every password write
    pub credential_version: u32,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn has_local_password(&self) -> bool {
        self.credential.password_hash().is_some()
    }

    pub fn summary(&self) -> AccountSummary {
        AccountSummary {
            id: self.id.0,
            nickname: self.nickname.clone(),
            email: self.email.clone(),
        }
    }
}

/// Row to insert; the store assigns `id`, `credential_version` and `created_at`
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub nickname: String,
    pub email: String,
    pub credential: Credential,
    pub federated_id: Option<String>,
}

/// Partial update of the mutable profile fields
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub nickname: Option<String>,
    pub email: Option<String>,
}

/// One-time credential recovery artifact
#[derive(Clone, PartialEq, Eq)]
pub struct ResetCode {
    /// Surrogate id, ascending in insertion order
    pub id: i64,
    pub account_id: AccountId,
    pub code_hash: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
}

impl ResetCode {
    pub fn is_used(&self) -> bool {
        self.used_at.is_some()
    }

    /// A code is only usable while `now < expires_at`
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

impl fmt::Debug for ResetCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResetCode")
            .field("id", &self.id)
            .field("account_id", &self.account_id)
            .field("created_at", &self.created_at)
            .field("expires_at", &self.expires_at)
            .field("used_at", &self.used_at)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct NewResetCode {
    pub account_id: AccountId,
    pub code_hash: String,
    pub expires_at: DateTime<Utc>,
}

/// Column guarded by a uniqueness constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    Email,
    Nickname,
    FederatedId,
}

impl fmt::Display for UniqueField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UniqueField::Email => f.write_str("Email"),
            UniqueField::Nickname => f.write_str("Nickname"),
            UniqueField::FederatedId => f.write_str("Federated identity"),
        }
    }
}

#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("{0} already in use")]
    Conflict(UniqueField),

    #[error("account not found")]
    NotFound,

    #[error("directory unavailable: {0}")]
    Unavailable(String),
}

/// Trait for identity directory backends
#[async_trait]
pub trait Directory: Send + Sync {
    async fn account_by_id(&self, id: AccountId) -> Result<Option<Account>, DirectoryError>;

    /// Case-insensitive lookup
    async fn account_by_email(&self, email: &str) -> Result<Option<Account>, DirectoryError>;

    async fn account_by_federated_id(&self, subject: &str)
        -> Result<Option<Account>, DirectoryError>;

    /// Exact-match check used by the nickname allocator
    async fn nickname_taken(&self, nickname: &str) -> Result<bool, DirectoryError>;

    /// Fails with [`DirectoryError::Conflict`] when email or nickname is taken
    async fn insert_account(&self, account: NewAccount) -> Result<Account, DirectoryError>;

    /// Attach a federated subject if the account has none; an existing
    /// linkage is left untouched. Returns the current row.
    async fn link_federated_id(
        &self,
        id: AccountId,
        subject: &str,
    ) -> Result<Account, DirectoryError>;

    /// Compare-and-set password write.
    ///
    /// Stores `hash` and bumps `credential_version` only while the stored
    /// version still equals `expected_version`. Returns whether the write
    /// happened.
    async fn replace_password(
        &self,
        id: AccountId,
        hash: &str,
        expected_version: u32,
    ) -> Result<bool, DirectoryError>;

    async fn update_profile(
        &self,
        id: AccountId,
        changes: &ProfileChanges,
    ) -> Result<Account, DirectoryError>;

    async fn insert_reset_code(&self, code: NewResetCode) -> Result<ResetCode, DirectoryError>;

    /// Most recent code: highest `created_at`, then highest `id`
    async fn latest_reset_code(
        &self,
        account: AccountId,
    ) -> Result<Option<ResetCode>, DirectoryError>;

    /// Set `used_at` if it is still unset. Returns whether this call spent it.
    async fn mark_reset_code_used(
        &self,
        code_id: i64,
        at: DateTime<Utc>,
    ) -> Result<bool, DirectoryError>;

    /// Federated lookup: subject id first, then email
    async fn account_by_federated_id_or_email(
        &self,
        subject: &str,
        email: &str,
    ) -> Result<Option<Account>, DirectoryError> {
        if let Some(account) = self.account_by_federated_id(subject).await? {
            return Ok(Some(account));
        }
        self.account_by_email(email).await
    }
}

/// Canonical comparison form of an email address
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
