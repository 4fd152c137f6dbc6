// crates/backend-lib/src/middleware/mod.rs

//! Request middleware and extractors.

pub mod client;
pub mod gate;

pub use client::{client_addr, ClientAddr, UNKNOWN_CLIENT};
pub use gate::{access_gate, AccessGate, AccessPolicy, CurrentAccount, Identity, PathMatcher};
