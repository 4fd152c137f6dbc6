// ============================
// crates/backend-lib/src/auth/federated.rs
// ============================
//! Federated identity linking.
//!
//! Exchanges a provider-verified assertion for a local account, creating or
//! linking as needed. Verifying the raw assertion is the job of an
//! [`AssertionVerifier`]; the linker trusts what it is handed.

use super::nickname;
use crate::directory::{
    normalize_email, Account, Credential, Directory, DirectoryError, NewAccount, UniqueField,
};
use crate::metrics::{ACCOUNT_CREATED, FEDERATED_LINKED};
use async_trait::async_trait;
use thiserror::Error;

/// Identity asserted by the provider after signature checks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedAssertion {
    /// Stable provider subject id
    pub subject: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

#[derive(Error, Debug)]
pub enum AssertionError {
    #[error("assertion rejected: {0}")]
    Invalid(String),

    /// Signing keys could not be fetched
    #[error("key retrieval failed: {0}")]
    Keys(String),
}

/// Verifies raw provider assertions (ID tokens)
#[async_trait]
pub trait AssertionVerifier: Send + Sync {
    async fn verify(&self, raw: &str) -> Result<VerifiedAssertion, AssertionError>;
}

#[derive(Error, Debug)]
pub enum LinkError {
    #[error("assertion carries no email")]
    MissingEmail,

    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

/// Nickname base: display name, else the email's local part, else `user`
fn nickname_base<'a>(assertion: &'a VerifiedAssertion, email: &'a str) -> &'a str {
    assertion
        .display_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .or_else(|| email.split('@').next().filter(|local| !local.is_empty()))
        .unwrap_or("user")
}

/// Find the account for an assertion, creating or linking it as needed.
///
/// Subject id is looked up before email. An existing linkage is never
/// overwritten. Repeating the call with the same assertion returns the same
/// account without further writes.
pub async fn link_or_create(
    directory: &dyn Directory,
    assertion: &VerifiedAssertion,
) -> Result<Account, LinkError> {
    let email = assertion
        .email
        .as_deref()
        .map(normalize_email)
        .filter(|e| !e.is_empty())
        .ok_or(LinkError::MissingEmail)?;

    // one retry: a concurrent call may create the account between our
    // lookup and our insert
    for _ in 0..2 {
        if let Some(account) = directory
            .account_by_federated_id_or_email(&assertion.subject, &email)
            .await?
        {
            return link_existing(directory, account, &assertion.subject).await;
        }

        let created = nickname::claim(directory, nickname_base(assertion, &email), |nickname| {
            NewAccount {
                nickname,
                email: email.clone(),
                credential: Credential::FederatedOnly,
                federated_id: Some(assertion.subject.clone()),
            }
        })
        .await;

        match created {
            Ok(account) => {
                metrics::counter!(ACCOUNT_CREATED).increment(1);
                tracing::info!(account_id = %account.id, "account created from federated login");
                return Ok(account);
            },
            Err(DirectoryError::Conflict(UniqueField::Email | UniqueField::FederatedId)) => {
                tracing::debug!("federated account created concurrently, retrying lookup");
            },
            Err(e) => return Err(e.into()),
        }
    }

    directory
        .account_by_federated_id_or_email(&assertion.subject, &email)
        .await?
        .ok_or(LinkError::Directory(DirectoryError::Conflict(UniqueField::Email)))
}

async fn link_existing(
    directory: &dyn Directory,
    account: Account,
    subject: &str,
) -> Result<Account, LinkError> {
    if account.federated_id.is_some() {
        return Ok(account);
    }
    let linked = directory.link_federated_id(account.id, subject).await?;
    metrics::counter!(FEDERATED_LINKED).increment(1);
    tracing::info!(account_id = %linked.id, "federated identity linked");
    Ok(linked)
}
