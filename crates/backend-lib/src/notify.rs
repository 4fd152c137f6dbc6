// ============================
// crates/backend-lib/src/notify.rs
// ============================
//! Outbound delivery of reset codes.
//!
//! Transport is pluggable through [`Notifier`]. [`LogNotifier`] is the
//! development transport: it writes the composed message to the log instead
//! of sending mail.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

pub const RESET_SUBJECT: &str = "Your GameFinder code";

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("delivery failed: {0}")]
    Delivery(String),
}

/// A composed reset-code message
#[derive(Clone, PartialEq, Eq)]
pub struct ResetCodeMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl ResetCodeMessage {
    pub fn compose(from: &str, to: &str, code: &str, validity: Duration) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
            subject: RESET_SUBJECT.to_string(),
            body: format!(
                "Your code: {code}\nThis code is valid for {}.",
                describe_window(validity)
            ),
        }
    }
}

impl std::fmt::Debug for ResetCodeMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResetCodeMessage")
            .field("from", &self.from)
            .field("to", &self.to)
            .field("subject", &self.subject)
            .finish_non_exhaustive()
    }
}

/// Human wording of a validity window, e.g. "1 minute" or "90 seconds"
pub fn describe_window(validity: Duration) -> String {
    let secs = validity.as_secs();
    match (secs / 60, secs % 60) {
        (1, 0) => "1 minute".to_string(),
        (m, 0) if m > 1 => format!("{m} minutes"),
        _ if secs == 1 => "1 second".to_string(),
        _ => format!("{secs} seconds"),
    }
}

/// Delivers reset codes to account owners
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, to: &str, code: &str, validity: Duration) -> Result<(), NotifyError>;
}

/// Writes reset messages to the log
#[derive(Debug, Clone)]
pub struct LogNotifier {
    from: String,
}

impl LogNotifier {
    pub fn new(from: impl Into<String>) -> Self {
        Self { from: from.into() }
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, to: &str, code: &str, validity: Duration) -> Result<(), NotifyError> {
        let message = ResetCodeMessage::compose(&self.from, to, code, validity);
        tracing::info!(to = %message.to, subject = %message.subject, "reset code message queued");
        tracing::debug!(target: "gamefinder::mail", body = %message.body, "mail body");
        Ok(())
    }
}
