// ==============
// crates/backend-lib/src/metrics.rs

//! Central place for metric keys
pub const ACCOUNT_CREATED: &str = "account.created";
pub const LOGIN_SUCCEEDED: &str = "login.succeeded";
pub const LOGIN_FAILED: &str = "login.failed";
pub const FEDERATED_LINKED: &str = "federated.linked";
pub const RESET_CODE_ISSUED: &str = "reset.code_issued";
pub const RESET_CODE_REJECTED: &str = "reset.code_rejected";
pub const RESET_COMPLETED: &str = "reset.completed";
pub const PASSWORD_CHANGED: &str = "password.changed";
pub const NICKNAME_RETRIES: &str = "nickname.retries";
pub const GATE_REJECTED: &str = "gate.rejected";
pub const RATE_LIMITED: &str = "auth.rate_limited";
