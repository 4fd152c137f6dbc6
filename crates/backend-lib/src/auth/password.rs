// ============================
// crates/backend-lib/src/auth/password.rs
// ============================
//! Password hashing and verification.
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use std::sync::LazyLock;
use zeroize::Zeroize;

/// Minimum length of a local password, enforced by callers before hashing
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Hash of a random throwaway password, verified against when the account
/// does not exist so both login failure paths do the same work.
static DUMMY_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password("dummy-password-for-timing").ok());

/// Hash a password using Argon2id with a fresh random salt
pub fn hash_password(plain: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)?
        .to_string();
    Ok(hash)
}

/// Verify a password against a hash. A malformed hash never matches.
pub fn verify_password(hash: &str, plain: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(plain.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Burn one verification against the dummy hash; always returns false
pub fn verify_dummy(plain: &str) -> bool {
    if let Some(hash) = DUMMY_HASH.as_deref() {
        let _ = verify_password(hash, plain);
    }
    false
}

/// Check the local password length policy (counted in characters)
pub fn meets_length_policy(password: &str) -> bool {
    password.chars().count() >= MIN_PASSWORD_LENGTH
}

/// Hash on the blocking pool and zeroize the plaintext afterwards
pub async fn hash_password_blocking(
    mut plain: String,
) -> Result<String, argon2::password_hash::Error> {
    tokio::task::spawn_blocking(move || {
        let hash = hash_password(&plain);
        plain.zeroize();
        hash
    })
    .await
    .unwrap_or(Err(argon2::password_hash::Error::Crypto))
}

/// Verify on the blocking pool; `None` as hash runs the dummy verification
pub async fn verify_password_blocking(hash: Option<String>, mut plain: String) -> bool {
    tokio::task::spawn_blocking(move || {
        let ok = match hash {
            Some(h) => verify_password(&h, &plain),
            None => verify_dummy(&plain),
        };
        plain.zeroize();
        ok
    })
    .await
    .unwrap_or(false)
}
