// ============================
// crates/backend-lib/src/validation/mod.rs
// ============================
//! Request field validation.
//!
//! Request DTOs carry every field as `Option<String>`; the helpers here turn
//! them into trimmed values or a [`ValidationError`] naming the field.

use crate::auth::password::meets_length_policy;
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

pub const MAX_NICKNAME_LENGTH: usize = 50;
pub const MAX_EMAIL_LENGTH: usize = 100;

static EMAIL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

/// Possible validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },

    #[error("Invalid email address format")]
    InvalidEmail,

    #[error("Password must be at least 6 characters")]
    WeakPassword,

    #[error("Nothing to update")]
    NothingToUpdate,
}

/// Result type for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Trimmed, non-empty value of a required field
pub fn required<'a>(value: &'a Option<String>, field: &'static str) -> ValidationResult<&'a str> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ValidationError::Missing(field)),
    }
}

/// Required password; not trimmed, whitespace is significant
pub fn required_secret<'a>(
    value: &'a Option<String>,
    field: &'static str,
) -> ValidationResult<&'a str> {
    match value.as_deref() {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ValidationError::Missing(field)),
    }
}

/// Validate an email address: shape and length
pub fn validate_email(email: &str) -> ValidationResult<&str> {
    let email = email.trim();
    if email.is_empty() {
        return Err(ValidationError::Missing("email"));
    }
    if email.chars().count() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::TooLong {
            field: "email",
            max: MAX_EMAIL_LENGTH,
        });
    }
    if !EMAIL_REGEX.is_match(email) {
        return Err(ValidationError::InvalidEmail);
    }
    Ok(email)
}

/// Validate a user-chosen nickname
pub fn validate_nickname(nickname: &str) -> ValidationResult<&str> {
    let nickname = nickname.trim();
    if nickname.is_empty() {
        return Err(ValidationError::Missing("nickname"));
    }
    if nickname.chars().count() > MAX_NICKNAME_LENGTH {
        return Err(ValidationError::TooLong {
            field: "nickname",
            max: MAX_NICKNAME_LENGTH,
        });
    }
    Ok(nickname)
}

/// Validate a new local password against the length policy
pub fn validate_new_password(password: &str) -> ValidationResult<&str> {
    if !meets_length_policy(password) {
        return Err(ValidationError::WeakPassword);
    }
    Ok(password)
}
