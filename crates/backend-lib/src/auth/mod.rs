// ============================
// crates/backend-lib/src/auth/mod.rs
// ============================
//! Authentication module.

pub mod federated;
pub mod firebase;
pub mod nickname;
pub mod password;
pub mod rate_limit;
pub mod reset;
pub mod token;
mod service;
mod service_impl;

pub use federated::{AssertionError, AssertionVerifier, VerifiedAssertion};
pub use firebase::FirebaseVerifier;
pub use password::{hash_password, verify_password, MIN_PASSWORD_LENGTH};
pub use rate_limit::AuthRateLimiter;
pub use reset::{Argon2CodeHasher, CodeHasher, ResetCodeService};
pub use service::{AuthService, SignedIn};
pub use service_impl::DefaultAuth;
pub use token::{TokenError, TokenService, SESSION_TTL};
