//! Postgres directory over the `users` / `password_reset_codes` tables.
//!
//! Rows written by earlier deployments may carry a NULL `password_hash` or the
//! literal `'<google-oauth>'` marker for federated-only accounts; both read
//! back as [`Credential::FederatedOnly`] and new rows store NULL.
//!
//! The directory holds one [`Client`] and does not reconnect. Once the
//! connection task ends, every call fails with
//! [`DirectoryError::Unavailable`] (503) until the process is restarted.

use super::{
    Account, AccountId, Credential, Directory, DirectoryError, NewAccount, NewResetCode,
    ProfileChanges, ResetCode, UniqueField,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio_postgres::error::SqlState;
use tokio_postgres::{Client, NoTls, Row};

const LEGACY_FEDERATED_MARKER: &str = "<google-oauth>";

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    id                  BIGSERIAL PRIMARY KEY,
    nickname            VARCHAR(50)  NOT NULL UNIQUE,
    email               VARCHAR(100) NOT NULL UNIQUE,
    password_hash       TEXT,
    google_uid          TEXT UNIQUE,
    credential_version  INTEGER      NOT NULL DEFAULT 0,
    created_at          TIMESTAMPTZ  NOT NULL DEFAULT NOW()
);
ALTER TABLE users ADD COLUMN IF NOT EXISTS credential_version INTEGER NOT NULL DEFAULT 0;
";

/// Emails that only differ by case; the case-insensitive index cannot be
/// built while any exist
const CASE_DUPLICATE_EMAILS: &str = "
SELECT lower(email) FROM users GROUP BY lower(email) HAVING count(*) > 1 ORDER BY 1 LIMIT 10
";

const SCHEMA_INDEXES: &str = "
CREATE UNIQUE INDEX IF NOT EXISTS users_email_lower_key ON users (lower(email));
CREATE TABLE IF NOT EXISTS password_reset_codes (
    id          BIGSERIAL PRIMARY KEY,
    user_id     BIGINT      NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    code_hash   TEXT        NOT NULL,
    created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    expires_at  TIMESTAMPTZ NOT NULL,
    used_at     TIMESTAMPTZ
);
CREATE INDEX IF NOT EXISTS password_reset_codes_user_idx
    ON password_reset_codes (user_id, created_at DESC, id DESC);
";

const ACCOUNT_COLUMNS: &str =
    "id, nickname, email, password_hash, google_uid, credential_version, created_at";
const CODE_COLUMNS: &str = "id, user_id, code_hash, created_at, expires_at, used_at";

/// Postgres implementation of the [`Directory`] trait
#[derive(Clone)]
pub struct PostgresDirectory {
    client: Arc<Client>,
}

impl PostgresDirectory {
    /// Connect and drive the connection on a background task
    pub async fn connect(url: &str) -> Result<Self, DirectoryError> {
        let (client, connection) = tokio_postgres::connect(url, NoTls)
            .await
            .map_err(unavailable)?;
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!(error = %e, "postgres connection closed");
            }
        });
        Ok(Self {
            client: Arc::new(client),
        })
    }

    pub fn from_client(client: Arc<Client>) -> Self {
        Self { client }
    }

    /// Create tables and indexes if they are missing.
    ///
    /// Fails without touching the indexes when existing rows hold emails that
    /// differ only by case; those must be merged by hand first.
    pub async fn migrate(&self) -> Result<(), DirectoryError> {
        self.client.batch_execute(SCHEMA).await.map_err(unavailable)?;
        let duplicates: Vec<String> = self
            .client
            .query(CASE_DUPLICATE_EMAILS, &[])
            .await
            .map_err(unavailable)?
            .iter()
            .map(|row| row.try_get::<_, String>(0))
            .collect::<Result<_, _>>()
            .map_err(unavailable)?;
        if let Some(err) = case_duplicate_error(&duplicates) {
            tracing::error!(count = duplicates.len(), "case-duplicate emails block migration");
            return Err(err);
        }
        self.client
            .batch_execute(SCHEMA_INDEXES)
            .await
            .map_err(unavailable)
    }

    async fn account_where(
        &self,
        predicate: &str,
        param: &(dyn tokio_postgres::types::ToSql + Sync),
    ) -> Result<Option<Account>, DirectoryError> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM users WHERE {predicate} LIMIT 1");
        self.client
            .query_opt(sql.as_str(), &[param])
            .await
            .map_err(map_error)?
            .map(|row| account_from_row(&row))
            .transpose()
    }
}

fn account_from_row(row: &Row) -> Result<Account, DirectoryError> {
    let hash: Option<String> = row.try_get(3).map_err(unavailable)?;
    let credential = match hash {
        Some(h) if h != LEGACY_FEDERATED_MARKER && !h.is_empty() => Credential::Password(h),
        _ => Credential::FederatedOnly,
    };
    let version: i32 = row.try_get(5).map_err(unavailable)?;
    Ok(Account {
        id: AccountId(row.try_get(0).map_err(unavailable)?),
        nickname: row.try_get(1).map_err(unavailable)?,
        email: row.try_get(2).map_err(unavailable)?,
        credential,
        federated_id: row.try_get(4).map_err(unavailable)?,
        credential_version: u32::try_from(version).unwrap_or_default(),
        created_at: row.try_get(6).map_err(unavailable)?,
    })
}

fn code_from_row(row: &Row) -> Result<ResetCode, DirectoryError> {
    Ok(ResetCode {
        id: row.try_get(0).map_err(unavailable)?,
        account_id: AccountId(row.try_get(1).map_err(unavailable)?),
        code_hash: row.try_get(2).map_err(unavailable)?,
        created_at: row.try_get(3).map_err(unavailable)?,
        expires_at: row.try_get(4).map_err(unavailable)?,
        used_at: row.try_get(5).map_err(unavailable)?,
    })
}

fn case_duplicate_error(duplicates: &[String]) -> Option<DirectoryError> {
    if duplicates.is_empty() {
        return None;
    }
    Some(DirectoryError::Unavailable(format!(
        "users table has emails differing only by case, merge them before migrating: {}",
        duplicates.join(", ")
    )))
}

fn unavailable(e: tokio_postgres::Error) -> DirectoryError {
    DirectoryError::Unavailable(e.to_string())
}

/// Translate unique violations into [`DirectoryError::Conflict`]
fn map_error(e: tokio_postgres::Error) -> DirectoryError {
    if e.code() == Some(&SqlState::UNIQUE_VIOLATION) {
        let constraint = e
            .as_db_error()
            .and_then(|db| db.constraint())
            .unwrap_or_default();
        let field = if constraint.contains("nickname") {
            UniqueField::Nickname
        } else if constraint.contains("google_uid") {
            UniqueField::FederatedId
        } else {
            UniqueField::Email
        };
        return DirectoryError::Conflict(field);
    }
    unavailable(e)
}

#[async_trait]
impl Directory for PostgresDirectory {
    async fn account_by_id(&self, id: AccountId) -> Result<Option<Account>, DirectoryError> {
        self.account_where("id = $1", &id.0).await
    }

    async fn account_by_email(&self, email: &str) -> Result<Option<Account>, DirectoryError> {
        self.account_where("lower(email) = lower($1)", &email.trim())
            .await
    }

    async fn account_by_federated_id(
        &self,
        subject: &str,
    ) -> Result<Option<Account>, DirectoryError> {
        self.account_where("google_uid = $1", &subject).await
    }

    async fn nickname_taken(&self, nickname: &str) -> Result<bool, DirectoryError> {
        let row = self
            .client
            .query_opt("SELECT 1 FROM users WHERE nickname = $1", &[&nickname])
            .await
            .map_err(map_error)?;
        Ok(row.is_some())
    }

    async fn insert_account(&self, new: NewAccount) -> Result<Account, DirectoryError> {
        let sql = format!(
            "INSERT INTO users (nickname, email, password_hash, google_uid)
             VALUES ($1, $2, $3, $4)
             RETURNING {ACCOUNT_COLUMNS}"
        );
        let row = self
            .client
            .query_one(
                sql.as_str(),
                &[
                    &new.nickname,
                    &new.email,
                    &new.credential.password_hash(),
                    &new.federated_id,
                ],
            )
            .await
            .map_err(map_error)?;
        account_from_row(&row)
    }

    async fn link_federated_id(
        &self,
        id: AccountId,
        subject: &str,
    ) -> Result<Account, DirectoryError> {
        let sql = format!(
            "UPDATE users SET google_uid = COALESCE(google_uid, $2)
             WHERE id = $1
             RETURNING {ACCOUNT_COLUMNS}"
        );
        let row = self
            .client
            .query_opt(sql.as_str(), &[&id.0, &subject])
            .await
            .map_err(map_error)?
            .ok_or(DirectoryError::NotFound)?;
        account_from_row(&row)
    }

    async fn replace_password(
        &self,
        id: AccountId,
        hash: &str,
        expected_version: u32,
    ) -> Result<bool, DirectoryError> {
        let expected = i32::try_from(expected_version).unwrap_or(i32::MAX);
        let updated = self
            .client
            .execute(
                "UPDATE users
                 SET password_hash = $2, credential_version = credential_version + 1
                 WHERE id = $1 AND credential_version = $3",
                &[&id.0, &hash, &expected],
            )
            .await
            .map_err(map_error)?;
        if updated == 1 {
            return Ok(true);
        }
        match self.account_by_id(id).await? {
            Some(_) => Ok(false),
            None => Err(DirectoryError::NotFound),
        }
    }

    async fn update_profile(
        &self,
        id: AccountId,
        changes: &ProfileChanges,
    ) -> Result<Account, DirectoryError> {
        let sql = format!(
            "UPDATE users
             SET nickname = COALESCE($2, nickname), email = COALESCE($3, email)
             WHERE id = $1
             RETURNING {ACCOUNT_COLUMNS}"
        );
        let row = self
            .client
            .query_opt(sql.as_str(), &[&id.0, &changes.nickname, &changes.email])
            .await
            .map_err(map_error)?
            .ok_or(DirectoryError::NotFound)?;
        account_from_row(&row)
    }

    async fn insert_reset_code(&self, code: NewResetCode) -> Result<ResetCode, DirectoryError> {
        let sql = format!(
            "INSERT INTO password_reset_codes (user_id, code_hash, expires_at)
             VALUES ($1, $2, $3)
             RETURNING {CODE_COLUMNS}"
        );
        let row = self
            .client
            .query_one(
                sql.as_str(),
                &[&code.account_id.0, &code.code_hash, &code.expires_at],
            )
            .await
            .map_err(map_error)?;
        code_from_row(&row)
    }

    async fn latest_reset_code(
        &self,
        account: AccountId,
    ) -> Result<Option<ResetCode>, DirectoryError> {
        let sql = format!(
            "SELECT {CODE_COLUMNS} FROM password_reset_codes
             WHERE user_id = $1
             ORDER BY created_at DESC, id DESC
             LIMIT 1"
        );
        self.client
            .query_opt(sql.as_str(), &[&account.0])
            .await
            .map_err(map_error)?
            .map(|row| code_from_row(&row))
            .transpose()
    }

    async fn mark_reset_code_used(
        &self,
        code_id: i64,
        at: DateTime<Utc>,
    ) -> Result<bool, DirectoryError> {
        let updated = self
            .client
            .execute(
                "UPDATE password_reset_codes SET used_at = $2
                 WHERE id = $1 AND used_at IS NULL",
                &[&code_id, &at],
            )
            .await
            .map_err(map_error)?;
        Ok(updated == 1)
    }
}
