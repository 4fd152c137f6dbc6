//! In-process directory backed by hash maps.
//!
//! Every method takes the lock, does its work synchronously and releases it
//! before returning, so no guard is ever held across an `.await`.

use super::{
    normalize_email, Account, AccountId, Credential, Directory, DirectoryError, NewAccount,
    NewResetCode, ProfileChanges, ResetCode, UniqueField,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default)]
struct Tables {
    accounts: HashMap<i64, Account>,
    by_email: HashMap<String, i64>,
    by_nickname: HashMap<String, i64>,
    by_federated: HashMap<String, i64>,
    codes: Vec<ResetCode>,
    next_account_id: i64,
    next_code_id: i64,
}

impl Tables {
    fn get(&self, id: i64) -> Option<&Account> {
        self.accounts.get(&id)
    }
}

/// Memory implementation of the [`Directory`] trait
#[derive(Clone, Default)]
pub struct MemoryDirectory {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn account_count(&self) -> usize {
        self.tables.read().accounts.len()
    }

    /// Full reset-code history of an account, oldest first
    pub fn reset_codes_for(&self, account: AccountId) -> Vec<ResetCode> {
        self.tables
            .read()
            .codes
            .iter()
            .filter(|c| c.account_id == account)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Directory for MemoryDirectory {
    async fn account_by_id(&self, id: AccountId) -> Result<Option<Account>, DirectoryError> {
        Ok(self.tables.read().get(id.0).cloned())
    }

    async fn account_by_email(&self, email: &str) -> Result<Option<Account>, DirectoryError> {
        let tables = self.tables.read();
        Ok(tables
            .by_email
            .get(&normalize_email(email))
            .and_then(|id| tables.get(*id))
            .cloned())
    }

    async fn account_by_federated_id(
        &self,
        subject: &str,
    ) -> Result<Option<Account>, DirectoryError> {
        let tables = self.tables.read();
        Ok(tables
            .by_federated
            .get(subject)
            .and_then(|id| tables.get(*id))
            .cloned())
    }

    async fn nickname_taken(&self, nickname: &str) -> Result<bool, DirectoryError> {
        Ok(self.tables.read().by_nickname.contains_key(nickname))
    }

    async fn insert_account(&self, new: NewAccount) -> Result<Account, DirectoryError> {
        let mut tables = self.tables.write();
        let email_key = normalize_email(&new.email);

        if tables.by_email.contains_key(&email_key) {
            return Err(DirectoryError::Conflict(UniqueField::Email));
        }
        if tables.by_nickname.contains_key(&new.nickname) {
            return Err(DirectoryError::Conflict(UniqueField::Nickname));
        }
        if let Some(subject) = &new.federated_id {
            if tables.by_federated.contains_key(subject) {
                return Err(DirectoryError::Conflict(UniqueField::FederatedId));
            }
        }

        tables.next_account_id += 1;
        let id = tables.next_account_id;
        let account = Account {
            id: AccountId(id),
            nickname: new.nickname,
            email: new.email,
            credential: new.credential,
            federated_id: new.federated_id,
            credential_version: 0,
            created_at: Utc::now(),
        };

        tables.by_email.insert(email_key, id);
        tables.by_nickname.insert(account.nickname.clone(), id);
        if let Some(subject) = &account.federated_id {
            tables.by_federated.insert(subject.clone(), id);
        }
        tables.accounts.insert(id, account.clone());
        Ok(account)
    }

    async fn link_federated_id(
        &self,
        id: AccountId,
        subject: &str,
    ) -> Result<Account, DirectoryError> {
        let mut tables = self.tables.write();
        let current = tables.get(id.0).ok_or(DirectoryError::NotFound)?;
        if current.federated_id.is_some() {
            return Ok(current.clone());
        }
        if tables.by_federated.contains_key(subject) {
            return Err(DirectoryError::Conflict(UniqueField::FederatedId));
        }

        tables.by_federated.insert(subject.to_string(), id.0);
        let account = tables
            .accounts
            .get_mut(&id.0)
            .ok_or(DirectoryError::NotFound)?;
        account.federated_id = Some(subject.to_string());
        Ok(account.clone())
    }

    async fn replace_password(
        &self,
        id: AccountId,
        hash: &str,
        expected_version: u32,
    ) -> Result<bool, DirectoryError> {
        let mut tables = self.tables.write();
        let account = tables
            .accounts
            .get_mut(&id.0)
            .ok_or(DirectoryError::NotFound)?;
        if account.credential_version != expected_version {
            return Ok(false);
        }
        account.credential = Credential::Password(hash.to_string());
        account.credential_version += 1;
        Ok(true)
    }

    async fn update_profile(
        &self,
        id: AccountId,
        changes: &ProfileChanges,
    ) -> Result<Account, DirectoryError> {
        let mut tables = self.tables.write();
        let current = tables.get(id.0).ok_or(DirectoryError::NotFound)?.clone();

        // Check both constraints before touching anything
        if let Some(nickname) = &changes.nickname {
            if matches!(tables.by_nickname.get(nickname), Some(owner) if *owner != id.0) {
                return Err(DirectoryError::Conflict(UniqueField::Nickname));
            }
        }
        if let Some(email) = &changes.email {
            let key = normalize_email(email);
            if matches!(tables.by_email.get(&key), Some(owner) if *owner != id.0) {
                return Err(DirectoryError::Conflict(UniqueField::Email));
            }
        }

        let mut updated = current.clone();
        if let Some(nickname) = &changes.nickname {
            tables.by_nickname.remove(&current.nickname);
            tables.by_nickname.insert(nickname.clone(), id.0);
            updated.nickname = nickname.clone();
        }
        if let Some(email) = &changes.email {
            tables.by_email.remove(&normalize_email(&current.email));
            tables.by_email.insert(normalize_email(email), id.0);
            updated.email = email.clone();
        }
        tables.accounts.insert(id.0, updated.clone());
        Ok(updated)
    }

    async fn insert_reset_code(&self, code: NewResetCode) -> Result<ResetCode, DirectoryError> {
        let mut tables = self.tables.write();
        if tables.get(code.account_id.0).is_none() {
            return Err(DirectoryError::NotFound);
        }
        tables.next_code_id += 1;
        let row = ResetCode {
            id: tables.next_code_id,
            account_id: code.account_id,
            code_hash: code.code_hash,
            created_at: Utc::now(),
            expires_at: code.expires_at,
            used_at: None,
        };
        tables.codes.push(row.clone());
        Ok(row)
    }

    async fn latest_reset_code(
        &self,
        account: AccountId,
    ) -> Result<Option<ResetCode>, DirectoryError> {
        Ok(self
            .tables
            .read()
            .codes
            .iter()
            .filter(|c| c.account_id == account)
            .max_by_key(|c| (c.created_at, c.id))
            .cloned())
    }

    async fn mark_reset_code_used(
        &self,
        code_id: i64,
        at: DateTime<Utc>,
    ) -> Result<bool, DirectoryError> {
        let mut tables = self.tables.write();
        match tables.codes.iter_mut().find(|c| c.id == code_id) {
            Some(code) if code.used_at.is_none() => {
                code.used_at = Some(at);
                Ok(true)
            },
            Some(_) => Ok(false),
            None => Err(DirectoryError::NotFound),
        }
    }
}
