// ============================
// crates/backend-lib/src/config.rs
// ============================
//! Configuration management.
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use thiserror::Error;

/// Default config file, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "gamefinder.toml";

/// Prefix of environment overrides, e.g. `GAMEFINDER_AUTH__JWT_SECRET`
pub const ENV_PREFIX: &str = "GAMEFINDER_";

/// Shortest accepted signing secret, in bytes
pub const MIN_JWT_SECRET_LENGTH: usize = 32;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub auth: AuthSettings,
    pub reset: ResetSettings,
    pub federated: FederatedSettings,
    /// Log level
    pub log_level: String,
    /// `pretty` or `json`
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins; empty allows any origin
    pub cors_origins: Vec<String>,
    /// Key lockouts on `x-real-ip`/`x-forwarded-for`. Only enable behind a
    /// reverse proxy that overwrites both headers.
    pub trust_proxy_headers: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    /// HMAC secret for session and reset tokens
    pub jwt_secret: String,
    pub session_ttl_secs: u64,
    pub reset_token_ttl_secs: u64,
    /// Failed attempts before a client is locked out
    pub max_failed_attempts: u32,
    pub lockout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResetSettings {
    /// Validity window of a reset code
    pub code_ttl_secs: u64,
    /// Sender address used by mail-based notifiers
    pub mail_from: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FederatedSettings {
    /// Firebase project id; federated login is disabled when unset
    pub project_id: Option<String>,
    pub jwks_url: String,
    pub jwks_cache_secs: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            auth: AuthSettings::default(),
            reset: ResetSettings::default(),
            federated: FederatedSettings::default(),
            log_level: "info".to_string(),
            log_format: LogFormat::default(),
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3001,
            cors_origins: Vec::new(),
            trust_proxy_headers: false,
        }
    }
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            session_ttl_secs: 60 * 60 * 24 * 7, // 7 days
            reset_token_ttl_secs: 15 * 60,
            max_failed_attempts: 5,
            lockout_secs: 5 * 60,
        }
    }
}

impl Default for ResetSettings {
    fn default() -> Self {
        Self {
            code_ttl_secs: 60,
            mail_from: "no-reply@gamefinder.local".to_string(),
        }
    }
}

impl Default for FederatedSettings {
    fn default() -> Self {
        Self {
            project_id: None,
            jwks_url: "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com"
                .to_string(),
            jwks_cache_secs: 60 * 60,
        }
    }
}

impl Settings {
    /// Load from `gamefinder.toml` and the environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Load from a specific TOML file (missing file is fine) and the environment
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings: Settings = Self::figment(path.as_ref())
            .extract()
            .map_err(|e| ConfigError::Load(Box::new(e)))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Provider chain: defaults, then file, then environment
    pub fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.jwt_secret.len() < MIN_JWT_SECRET_LENGTH {
            return Err(ConfigError::Invalid(format!(
                "auth.jwt_secret must be at least {MIN_JWT_SECRET_LENGTH} bytes"
            )));
        }
        if self.auth.session_ttl_secs == 0 || self.auth.reset_token_ttl_secs == 0 {
            return Err(ConfigError::Invalid("token TTLs must be positive".to_string()));
        }
        if self.reset.code_ttl_secs == 0 {
            return Err(ConfigError::Invalid(
                "reset.code_ttl_secs must be positive".to_string(),
            ));
        }
        if self.auth.max_failed_attempts == 0 {
            return Err(ConfigError::Invalid(
                "auth.max_failed_attempts must be positive".to_string(),
            ));
        }
        if !LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "unknown log level '{}'",
                self.log_level
            )));
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| ConfigError::Invalid(format!("bad bind address: {e}")))
    }
}
