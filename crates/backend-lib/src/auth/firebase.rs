// ============================
// crates/backend-lib/src/auth/firebase.rs
// ============================
//! Firebase / Google ID token verification.
//!
//! Tokens are RS256 JWTs issued by `https://securetoken.google.com/<project>`.
//! Signing keys come from the provider's JWKS endpoint and are cached for
//! `jwks_cache_secs`; an unknown `kid` forces one refresh to pick up rotated
//! keys.

use super::federated::{AssertionError, AssertionVerifier, VerifiedAssertion};
use crate::config::FederatedSettings;
use async_trait::async_trait;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use parking_lot::RwLock;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

const ISSUER_PREFIX: &str = "https://securetoken.google.com/";
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct FirebaseClaims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

struct CachedKeys {
    keys: Arc<JwkSet>,
    fetched_at: Instant,
}

/// Verifies Firebase ID tokens against the provider JWKS
pub struct FirebaseVerifier {
    http: reqwest::Client,
    jwks_url: String,
    project_id: String,
    cache_ttl: Duration,
    cache: RwLock<Option<CachedKeys>>,
}

impl FirebaseVerifier {
    pub fn new(
        project_id: impl Into<String>,
        jwks_url: impl Into<String>,
        cache_ttl: Duration,
    ) -> Result<Self, AssertionError> {
        let http = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| AssertionError::Keys(e.to_string()))?;
        Ok(Self {
            http,
            jwks_url: jwks_url.into(),
            project_id: project_id.into(),
            cache_ttl,
            cache: RwLock::new(None),
        })
    }

    /// `None` when no project id is configured
    pub fn from_settings(settings: &FederatedSettings) -> Result<Option<Self>, AssertionError> {
        settings
            .project_id
            .as_deref()
            .map(|project| {
                Self::new(
                    project,
                    settings.jwks_url.clone(),
                    Duration::from_secs(settings.jwks_cache_secs),
                )
            })
            .transpose()
    }

    fn cached(&self) -> Option<Arc<JwkSet>> {
        self.cache
            .read()
            .as_ref()
            .filter(|c| c.fetched_at.elapsed() < self.cache_ttl)
            .map(|c| c.keys.clone())
    }

    async fn refresh(&self) -> Result<Arc<JwkSet>, AssertionError> {
        let keys: JwkSet = self
            .http
            .get(&self.jwks_url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| AssertionError::Keys(e.to_string()))?
            .json()
            .await
            .map_err(|e| AssertionError::Keys(e.to_string()))?;
        let keys = Arc::new(keys);
        tracing::debug!(count = keys.keys.len(), "fetched provider signing keys");
        *self.cache.write() = Some(CachedKeys {
            keys: keys.clone(),
            fetched_at: Instant::now(),
        });
        Ok(keys)
    }

    async fn key_for(&self, kid: &str) -> Result<DecodingKey, AssertionError> {
        if let Some(keys) = self.cached() {
            if let Some(jwk) = keys.find(kid) {
                return DecodingKey::from_jwk(jwk).map_err(|e| AssertionError::Keys(e.to_string()));
            }
        }
        let keys = self.refresh().await?;
        let jwk = keys
            .find(kid)
            .ok_or_else(|| AssertionError::Invalid("unknown signing key".to_string()))?;
        DecodingKey::from_jwk(jwk).map_err(|e| AssertionError::Keys(e.to_string()))
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[self.project_id.as_str()]);
        validation.set_issuer(&[format!("{ISSUER_PREFIX}{}", self.project_id)]);
        validation.set_required_spec_claims(&["exp", "sub", "aud", "iss"]);
        validation
    }
}

#[async_trait]
impl AssertionVerifier for FirebaseVerifier {
    async fn verify(&self, raw: &str) -> Result<VerifiedAssertion, AssertionError> {
        let header = decode_header(raw).map_err(|e| AssertionError::Invalid(e.to_string()))?;
        if header.alg != Algorithm::RS256 {
            return Err(AssertionError::Invalid("unexpected algorithm".to_string()));
        }
        let kid = header
            .kid
            .ok_or_else(|| AssertionError::Invalid("missing key id".to_string()))?;
        let key = self.key_for(&kid).await?;

        let claims = decode::<FirebaseClaims>(raw, &key, &self.validation())
            .map_err(|e| AssertionError::Invalid(e.to_string()))?
            .claims;
        if claims.sub.is_empty() {
            return Err(AssertionError::Invalid("empty subject".to_string()));
        }

        Ok(VerifiedAssertion {
            subject: claims.sub,
            email: claims.email,
            display_name: claims.name,
        })
    }
}
