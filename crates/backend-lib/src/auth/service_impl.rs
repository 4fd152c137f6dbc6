use super::federated::{link_or_create, AssertionVerifier, LinkError};
use super::nickname;
use super::password::{hash_password_blocking, verify_password_blocking};
use super::reset::ResetCodeService;
use super::service::{AuthService, SignedIn};
use super::token::TokenService;
use crate::directory::{
    normalize_email, Account, AccountId, Credential, Directory, NewAccount, ProfileChanges,
};
use crate::error::AppError;
use crate::metrics::{LOGIN_FAILED, LOGIN_SUCCEEDED, PASSWORD_CHANGED, ACCOUNT_CREATED};
use crate::validation::{validate_new_password, ValidationError};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

pub struct DefaultAuth {
    directory: Arc<dyn Directory>,
    tokens: Arc<TokenService>,
    reset: ResetCodeService,
    verifier: Option<Arc<dyn AssertionVerifier>>,
}

impl DefaultAuth {
    pub fn new(
        directory: Arc<dyn Directory>,
        tokens: Arc<TokenService>,
        reset: ResetCodeService,
        verifier: Option<Arc<dyn AssertionVerifier>>,
    ) -> Self {
        Self {
            directory,
            tokens,
            reset,
            verifier,
        }
    }

    fn sign_in(&self, account: Account) -> Result<SignedIn, AppError> {
        let token = self.tokens.mint(account.id)?;
        Ok(SignedIn { account, token })
    }

    async fn account(&self, id: AccountId) -> Result<Account, AppError> {
        self.directory
            .account_by_id(id)
            .await?
            .ok_or(AppError::NotFound("User"))
    }
}

#[async_trait]
impl AuthService for DefaultAuth {
    async fn signup(
        &self,
        nickname: &str,
        email: &str,
        password: &str,
    ) -> Result<SignedIn, AppError> {
        validate_new_password(password)?;
        let email = normalize_email(email);
        let hash = hash_password_blocking(password.to_string()).await?;

        let account =
            nickname::claim_preferred(self.directory.as_ref(), nickname, |nickname| NewAccount {
                nickname,
                email: email.clone(),
                credential: Credential::Password(hash.clone()),
                federated_id: None,
            })
            .await?;

        metrics::counter!(ACCOUNT_CREATED).increment(1);
        tracing::info!(account_id = %account.id, nickname = %account.nickname, "account created");
        self.sign_in(account)
    }

    async fn login(&self, email: &str, password: &str) -> Result<SignedIn, AppError> {
        let account = self.directory.account_by_email(&normalize_email(email)).await?;
        // unknown accounts and federated-only accounts verify against the dummy hash
        let hash = account
            .as_ref()
            .and_then(|a| a.credential.password_hash())
            .map(str::to_string);
        let ok = verify_password_blocking(hash, password.to_string()).await;

        match account {
            Some(account) if ok => {
                metrics::counter!(LOGIN_SUCCEEDED).increment(1);
                tracing::info!(account_id = %account.id, "login succeeded");
                self.sign_in(account)
            },
            _ => {
                metrics::counter!(LOGIN_FAILED).increment(1);
                Err(AppError::InvalidCredentials)
            },
        }
    }

    async fn federated_login(&self, id_token: &str) -> Result<SignedIn, AppError> {
        let verifier = self.verifier.as_ref().ok_or(AppError::FederatedDisabled)?;
        let assertion = verifier.verify(id_token).await.map_err(|e| {
            tracing::debug!(error = %e, "federated assertion rejected");
            AppError::InvalidAssertion
        })?;

        let account = link_or_create(self.directory.as_ref(), &assertion)
            .await
            .map_err(|e| match e {
                LinkError::MissingEmail => AppError::AssertionWithoutEmail,
                LinkError::Directory(e) => e.into(),
            })?;
        self.sign_in(account)
    }

    async fn request_reset_code(&self, email: &str) -> Result<Duration, AppError> {
        self.reset.request_code(email).await
    }

    async fn verify_reset_code(&self, email: &str, code: &str) -> Result<String, AppError> {
        self.reset.verify_code(email, code).await
    }

    async fn reset_password(&self, reset_token: &str, new_password: &str) -> Result<(), AppError> {
        self.reset.reset_password(reset_token, new_password).await
    }

    async fn verify_credentials(
        &self,
        id: AccountId,
        email: &str,
        password: &str,
    ) -> Result<(), AppError> {
        let account = self.account(id).await?;
        if normalize_email(&account.email) != normalize_email(email) {
            return Err(AppError::CredentialMismatch);
        }
        let Some(hash) = account.credential.password_hash() else {
            return Err(AppError::NoLocalPassword);
        };
        if !verify_password_blocking(Some(hash.to_string()), password.to_string()).await {
            return Err(AppError::CredentialMismatch);
        }
        Ok(())
    }

    async fn change_password(
        &self,
        id: AccountId,
        current_password: Option<&str>,
        new_password: Option<&str>,
    ) -> Result<(), AppError> {
        let current = current_password
            .filter(|p| !p.is_empty())
            .ok_or(AppError::CurrentPasswordRequired)?;
        let new = new_password
            .filter(|p| validate_new_password(p).is_ok())
            .ok_or(AppError::WeakPassword)?;

        let account = self.account(id).await?;
        let Some(hash) = account.credential.password_hash() else {
            return Err(AppError::NoLocalPassword);
        };
        if !verify_password_blocking(Some(hash.to_string()), current.to_string()).await {
            return Err(AppError::CurrentPasswordIncorrect);
        }

        let new_hash = hash_password_blocking(new.to_string()).await?;
        if !self
            .directory
            .replace_password(id, &new_hash, account.credential_version)
            .await?
        {
            // changed concurrently; the verified password is no longer current
            return Err(AppError::CurrentPasswordIncorrect);
        }

        metrics::counter!(PASSWORD_CHANGED).increment(1);
        tracing::info!(account_id = %id, "password changed");
        Ok(())
    }

    async fn profile(&self, id: AccountId) -> Result<Account, AppError> {
        self.account(id).await
    }

    async fn update_profile(
        &self,
        id: AccountId,
        mut changes: ProfileChanges,
    ) -> Result<Account, AppError> {
        if changes.nickname.is_none() && changes.email.is_none() {
            return Err(ValidationError::NothingToUpdate.into());
        }
        changes.email = changes.email.as_deref().map(normalize_email);

        let account = self.directory.update_profile(id, &changes).await?;
        tracing::info!(account_id = %id, "profile updated");
        Ok(account)
    }
}
