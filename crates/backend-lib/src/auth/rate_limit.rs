// ============================
// crates/backend-lib/src/auth/rate_limit.rs
// ============================
//! Failed-attempt lockout for login and reset-code verification.
//!
//! Keys are free-form strings so callers choose the scope: logins are keyed
//! by client address, code verification by account email.

use crate::config::AuthSettings;
use crate::metrics::RATE_LIMITED;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default number of failed attempts before lockout
const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default lockout duration (5 minutes)
const DEFAULT_LOCKOUT_DURATION: Duration = Duration::from_secs(5 * 60);

/// How long an entry without a lockout is remembered
const ENTRY_RETENTION: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone)]
struct AttemptEntry {
    failed_attempts: u32,
    last_failure: Instant,
    /// Set while the key is locked out
    lockout_expiry: Option<Instant>,
}

/// Rate limiter for authentication attempts
#[derive(Debug, Clone)]
pub struct AuthRateLimiter {
    attempts: Arc<DashMap<String, AttemptEntry>>,
    max_attempts: u32,
    lockout_duration: Duration,
}

impl Default for AuthRateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_LOCKOUT_DURATION)
    }
}

impl AuthRateLimiter {
    pub fn new(max_attempts: u32, lockout_duration: Duration) -> Self {
        Self {
            attempts: Arc::new(DashMap::new()),
            max_attempts,
            lockout_duration,
        }
    }

    pub fn from_settings(settings: &AuthSettings) -> Self {
        Self::new(
            settings.max_failed_attempts,
            Duration::from_secs(settings.lockout_secs),
        )
    }

    /// Record a failed attempt; locks the key once the limit is reached
    pub fn record_failed_attempt(&self, key: &str) {
        let now = Instant::now();
        let mut entry = self
            .attempts
            .entry(key.to_string())
            .or_insert_with(|| AttemptEntry {
                failed_attempts: 0,
                last_failure: now,
                lockout_expiry: None,
            });

        if entry.lockout_expiry.is_some_and(|expiry| now >= expiry) {
            entry.failed_attempts = 0;
            entry.lockout_expiry = None;
        }

        entry.failed_attempts += 1;
        entry.last_failure = now;

        if entry.failed_attempts >= self.max_attempts && entry.lockout_expiry.is_none() {
            entry.lockout_expiry = Some(now + self.lockout_duration);
            metrics::counter!(RATE_LIMITED).increment(1);
            tracing::warn!(
                attempts = entry.failed_attempts,
                lockout_secs = self.lockout_duration.as_secs(),
                "authentication locked out"
            );
        }
    }

    /// Forget a key after a successful attempt
    pub fn record_success(&self, key: &str) {
        self.attempts.remove(key);
    }

    /// Whether the key may attempt authentication now
    pub fn check(&self, key: &str) -> bool {
        match self.attempts.get(key) {
            Some(entry) => !matches!(entry.lockout_expiry, Some(expiry) if Instant::now() < expiry),
            None => true,
        }
    }

    /// Drop expired lockouts and stale entries
    pub fn cleanup(&self) {
        let now = Instant::now();
        self.attempts.retain(|_, entry| match entry.lockout_expiry {
            Some(expiry) => now < expiry,
            None => now.duration_since(entry.last_failure) < ENTRY_RETENTION,
        });
    }

    pub fn tracked_keys(&self) -> usize {
        self.attempts.len()
    }
}
