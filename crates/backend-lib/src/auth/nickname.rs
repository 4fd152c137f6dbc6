// ============================
// crates/backend-lib/src/auth/nickname.rs
// ============================
//! Collision-free display names for new accounts.
//!
//! Candidates are tried in a fixed order: the normalized base, then the base
//! cut to 28 characters with a counter 1..=999, then `base_<unix millis>`.
//! A nickname the user typed is tried verbatim first (up to 50 characters);
//! normalization only shapes the fallbacks. [`claim`] inserts directly and
//! treats a nickname conflict as "try the next candidate", so the directory's
//! uniqueness constraint settles races between concurrent signups.

use crate::directory::{Account, Directory, DirectoryError, NewAccount, UniqueField};
use crate::metrics::NICKNAME_RETRIES;
use chrono::Utc;

pub const MAX_BASE_CHARS: usize = 30;
const COUNTER_BASE_CHARS: usize = 28;
const MAX_COUNTER: u32 = 999;
const FALLBACK_BASE: &str = "user";

/// Trim, collapse whitespace runs to `_`, keep 30 characters, default `user`
pub fn normalize(base: &str) -> String {
    let joined = base.split_whitespace().collect::<Vec<_>>().join("_");
    let cut: String = joined.chars().take(MAX_BASE_CHARS).collect();
    if cut.is_empty() {
        FALLBACK_BASE.to_string()
    } else {
        cut
    }
}

/// Ordered candidate nicknames for one base
#[derive(Debug, Clone)]
pub struct NicknameCandidates {
    first: String,
    base: String,
    short: String,
    step: u32,
}

impl NicknameCandidates {
    pub fn new(base: &str) -> Self {
        let base = normalize(base);
        Self::with_first(base.clone(), base)
    }

    /// Candidates starting with `nickname` as given, minus surrounding
    /// whitespace. The caller has already checked its length.
    pub fn preferring(nickname: &str) -> Self {
        Self::with_first(nickname.trim().to_string(), normalize(nickname))
    }

    fn with_first(first: String, base: String) -> Self {
        let short = base.chars().take(COUNTER_BASE_CHARS).collect();
        Self {
            first,
            base,
            short,
            step: 0,
        }
    }
}

impl Iterator for NicknameCandidates {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let step = self.step;
        self.step = self.step.saturating_add(1);
        match step {
            0 => Some(self.first.clone()),
            n if n <= MAX_COUNTER => Some(format!("{}{n}", self.short)),
            n if n == MAX_COUNTER + 1 => {
                Some(format!("{}_{}", self.base, Utc::now().timestamp_millis()))
            },
            _ => None,
        }
    }
}

/// Check the directory and return the first free candidate.
///
/// Only free at the instant of the check; use [`claim`] to create accounts.
/// The timestamp fallback is returned unchecked.
pub async fn allocate(directory: &dyn Directory, base: &str) -> Result<String, DirectoryError> {
    let mut candidates = NicknameCandidates::new(base);
    for candidate in candidates.by_ref().take(MAX_COUNTER as usize + 1) {
        if !directory.nickname_taken(&candidate).await? {
            return Ok(candidate);
        }
    }
    // counter range exhausted; the next candidate is the timestamp form
    candidates.next().ok_or(DirectoryError::Conflict(UniqueField::Nickname))
}

/// Insert an account under the first candidate nickname the directory accepts.
///
/// `build` turns a nickname into the row to insert. Conflicts on email or
/// federated id are returned to the caller unchanged.
pub async fn claim<F>(directory: &dyn Directory, base: &str, build: F) -> Result<Account, DirectoryError>
where
    F: Fn(String) -> NewAccount,
{
    claim_from(directory, NicknameCandidates::new(base), build).await
}

/// Like [`claim`], but keeps a user-chosen nickname intact when it is free
pub async fn claim_preferred<F>(
    directory: &dyn Directory,
    nickname: &str,
    build: F,
) -> Result<Account, DirectoryError>
where
    F: Fn(String) -> NewAccount,
{
    claim_from(directory, NicknameCandidates::preferring(nickname), build).await
}

async fn claim_from<F>(
    directory: &dyn Directory,
    candidates: NicknameCandidates,
    build: F,
) -> Result<Account, DirectoryError>
where
    F: Fn(String) -> NewAccount,
{
    let mut retries = 0u64;
    for candidate in candidates {
        match directory.insert_account(build(candidate)).await {
            Ok(account) => {
                if retries > 0 {
                    metrics::counter!(NICKNAME_RETRIES).increment(retries);
                    tracing::debug!(retries, nickname = %account.nickname, "nickname taken, used next candidate");
                }
                return Ok(account);
            },
            Err(DirectoryError::Conflict(UniqueField::Nickname)) => retries += 1,
            Err(e) => return Err(e),
        }
    }
    Err(DirectoryError::Conflict(UniqueField::Nickname))
}
