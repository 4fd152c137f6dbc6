// ============================
// crates/backend-lib/src/middleware/gate.rs
// ============================
//! Default-deny access gate for the `/api` router.
//!
//! Paths are matched relative to `/api` against an ordered rule table; the
//! first matching rule decides, unmatched paths require a session. Public
//! paths still resolve a valid bearer token when one is sent.

use crate::directory::AccountId;
use crate::error::AppError;
use crate::metrics::GATE_REJECTED;
use crate::AppState;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use regex::Regex;
use std::sync::Arc;

/// Paths reachable without a session, relative to `/api`
pub const PUBLIC_PREFIXES: [&str; 10] = [
    "/signup",
    "/login",
    "/auth/google",
    "/auth/forgot",
    "/auth/forgot/verify",
    "/auth/reset",
    "/health",
    "/games",
    "/genres",
    "/youtube",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessPolicy {
    /// Anonymous allowed; a valid token is still resolved
    Public,
    /// Valid session token required
    Required,
}

#[derive(Debug, Clone)]
pub enum PathMatcher {
    /// Matches the prefix itself and anything below it (`/games`, `/games/42`)
    Prefix(String),
    Pattern(Regex),
}

impl PathMatcher {
    pub fn matches(&self, path: &str) -> bool {
        match self {
            PathMatcher::Prefix(prefix) => path
                .strip_prefix(prefix.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('/')),
            PathMatcher::Pattern(re) => re.is_match(path),
        }
    }
}

/// Ordered `(matcher, policy)` table
#[derive(Debug, Clone)]
pub struct AccessGate {
    rules: Vec<(PathMatcher, AccessPolicy)>,
    default: AccessPolicy,
}

impl Default for AccessGate {
    fn default() -> Self {
        Self::new(
            PUBLIC_PREFIXES
                .iter()
                .map(|p| (PathMatcher::Prefix((*p).to_string()), AccessPolicy::Public))
                .collect(),
        )
    }
}

impl AccessGate {
    /// Gate with the given rules; unmatched paths require a session
    pub fn new(rules: Vec<(PathMatcher, AccessPolicy)>) -> Self {
        Self {
            rules,
            default: AccessPolicy::Required,
        }
    }

    pub fn with_rule(mut self, matcher: PathMatcher, policy: AccessPolicy) -> Self {
        self.rules.push((matcher, policy));
        self
    }

    pub fn policy_for(&self, path: &str) -> AccessPolicy {
        self.rules
            .iter()
            .find(|(matcher, _)| matcher.matches(path))
            .map_or(self.default, |(_, policy)| *policy)
    }
}

/// Account resolved by the gate for the current request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity(pub Option<AccountId>);

/// `Authorization: Bearer <token>`
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Gate middleware
pub async fn access_gate(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let policy = state.gate.policy_for(request.uri().path());
    let account = bearer_token(request.headers()).and_then(|token| state.tokens.verify(token).ok());

    if policy == AccessPolicy::Required && account.is_none() {
        metrics::counter!(GATE_REJECTED).increment(1);
        tracing::debug!(path = %request.uri().path(), "request without valid session rejected");
        return Err(AppError::Unauthorized);
    }

    request.extensions_mut().insert(Identity(account));
    Ok(next.run(request).await)
}

/// Signed-in account; rejects with 401 when the gate resolved none
#[derive(Debug, Clone, Copy)]
pub struct CurrentAccount(pub AccountId);

impl<S: Send + Sync> FromRequestParts<S> for CurrentAccount {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<Identity>() {
            Some(Identity(Some(id))) => Ok(CurrentAccount(*id)),
            _ => Err(AppError::Unauthorized),
        }
    }
}
