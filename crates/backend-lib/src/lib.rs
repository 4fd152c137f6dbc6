// ============================
// crates/backend-lib/src/lib.rs
// ============================
//! Core of the GameFinder account service: credential and session lifecycle
//! behind an axum router.

pub mod auth;
pub mod config;
pub mod directory;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod notify;
pub mod router;
pub mod validation;

use crate::auth::{
    AssertionError, AssertionVerifier, AuthRateLimiter, AuthService, DefaultAuth,
    FirebaseVerifier, ResetCodeService, TokenService,
};
use crate::config::Settings;
use crate::directory::Directory;
use crate::middleware::AccessGate;
use crate::notify::{LogNotifier, Notifier};
use std::sync::Arc;
use std::time::Duration;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Authentication service
    pub auth: Arc<dyn AuthService>,
    /// Token service, used by the access gate
    pub tokens: Arc<TokenService>,
    /// Identity directory
    pub directory: Arc<dyn Directory>,
    pub settings: Arc<Settings>,
    /// Failed-attempt lockout for login and code verification
    pub rate_limiter: Arc<AuthRateLimiter>,
    pub gate: Arc<AccessGate>,
}

impl AppState {
    /// Wire the services from explicit collaborators
    pub fn new(
        settings: Settings,
        directory: Arc<dyn Directory>,
        notifier: Arc<dyn Notifier>,
        verifier: Option<Arc<dyn AssertionVerifier>>,
    ) -> Self {
        let tokens = Arc::new(TokenService::from_settings(&settings.auth));
        let reset = ResetCodeService::new(
            directory.clone(),
            notifier,
            tokens.clone(),
            Duration::from_secs(settings.reset.code_ttl_secs),
        );
        let auth = Arc::new(DefaultAuth::new(
            directory.clone(),
            tokens.clone(),
            reset,
            verifier,
        ));
        let rate_limiter = Arc::new(AuthRateLimiter::from_settings(&settings.auth));

        Self {
            auth,
            tokens,
            directory,
            settings: Arc::new(settings),
            rate_limiter,
            gate: Arc::new(AccessGate::default()),
        }
    }

    /// Log-based notifier and, when a project id is configured, the Firebase verifier
    pub fn from_settings(
        settings: Settings,
        directory: Arc<dyn Directory>,
    ) -> Result<Self, AssertionError> {
        let notifier = Arc::new(LogNotifier::new(settings.reset.mail_from.clone()));
        let verifier = FirebaseVerifier::from_settings(&settings.federated)?
            .map(|v| Arc::new(v) as Arc<dyn AssertionVerifier>);
        if verifier.is_none() {
            tracing::info!("federated.project_id not set, Google login disabled");
        }
        Ok(Self::new(settings, directory, notifier, verifier))
    }

    pub fn with_gate(mut self, gate: AccessGate) -> Self {
        self.gate = Arc::new(gate);
        self
    }
}
