//! Firebase ID token verification.
//!
//! Tokens are RS256 JWTs signed by Google. The public keys are published as a
//! JWK set and rotate a few times a day, so they are cached for a configurable
//! time and refetched when a token names a key id we have not seen. Refetches
//! are serialized and spaced at least `min_refetch_interval` apart, so forged
//! key ids cannot turn inbound requests into outbound ones.

use async_trait::async_trait;
use jsonwebtoken::jwk::{Jwk, JwkSet};
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use super::{IdentityProvider, VerifyError};
use crate::config::AuthConfig;

/// Allowed clock skew for `iat` and `auth_time`, in seconds.
const CLOCK_SKEW_SECS: i64 = 60;

pub const DEFAULT_MIN_REFETCH_INTERVAL: Duration = Duration::from_secs(30);

/// The parts of a service-account key file we need.
#[derive(Debug, Deserialize)]
pub struct ServiceAccount {
    pub project_id: String,
    #[serde(default)]
    pub client_email: Option<String>,
}

impl ServiceAccount {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[derive(Debug, Deserialize)]
struct FirebaseClaims {
    sub: String,
    iat: i64,
    #[serde(default)]
    auth_time: Option<i64>,
}

struct CachedKeys {
    keys: JwkSet,
    fetched_at: Instant,
}

#[derive(Default)]
struct KeyCache {
    current: Option<CachedKeys>,
    /// Last fetch attempt, successful or not.
    last_attempt: Option<Instant>,
}

pub struct FirebaseVerifier {
    project_id: String,
    jwks_url: String,
    key_ttl: Duration,
    min_refetch_interval: Duration,
    client: reqwest::Client,
    cache: RwLock<KeyCache>,
}

impl FirebaseVerifier {
    pub fn new(project_id: impl Into<String>, jwks_url: impl Into<String>, key_ttl: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            project_id: project_id.into(),
            jwks_url: jwks_url.into(),
            key_ttl,
            min_refetch_interval: DEFAULT_MIN_REFETCH_INTERVAL,
            client,
            cache: RwLock::new(KeyCache::default()),
        })
    }

    pub fn with_min_refetch_interval(mut self, interval: Duration) -> Self {
        self.min_refetch_interval = interval;
        self
    }

    /// Build the verifier at startup. Returns `None` when no project id can be
    /// resolved, which leaves only the test token usable.
    pub fn from_config(config: &AuthConfig) -> Option<Self> {
        let project_id = match &config.project_id {
            Some(id) => id.clone(),
            None => {
                let path = &config.service_account_path;
                if !path.exists() {
                    tracing::warn!(
                        "{} not found. Authentication will only work with test tokens.",
                        path.display()
                    );
                    return None;
                }
                match ServiceAccount::from_file(path) {
                    Ok(account) => {
                        tracing::debug!("Loaded service account {:?}", account.client_email);
                        account.project_id
                    }
                    Err(e) => {
                        tracing::error!("Error reading service account {}: {}", path.display(), e);
                        return None;
                    }
                }
            }
        };

        match Self::new(project_id, config.jwks_url.clone(), Duration::from_secs(config.key_cache_secs)) {
            Ok(verifier) => {
                let verifier =
                    verifier.with_min_refetch_interval(Duration::from_secs(config.key_refetch_secs));
                tracing::info!("Firebase token verification initialized for project '{}'", verifier.project_id);
                Some(verifier)
            }
            Err(e) => {
                tracing::error!("Error initializing Firebase HTTP client: {}", e);
                None
            }
        }
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    fn issuer(&self) -> String {
        format!("https://securetoken.google.com/{}", self.project_id)
    }

    async fn signing_key(&self, kid: &str) -> Result<DecodingKey, VerifyError> {
        if let Some(jwk) = self.cached_jwk(kid).await {
            return Ok(DecodingKey::from_jwk(&jwk)?);
        }

        // One refetch at a time; whoever waited re-checks what the last one brought.
        let mut cache = self.cache.write().await;
        let recently_attempted = cache
            .last_attempt
            .is_some_and(|at| at.elapsed() < self.min_refetch_interval);

        let fresh = cache
            .current
            .as_ref()
            .filter(|cached| recently_attempted || cached.fetched_at.elapsed() < self.key_ttl);
        if let Some(jwk) = fresh.and_then(|cached| cached.keys.find(kid)) {
            return Ok(DecodingKey::from_jwk(jwk)?);
        }
        if recently_attempted {
            return Err(VerifyError::UnknownKeyId(kid.to_string()));
        }

        cache.last_attempt = Some(Instant::now());
        let keys = self.fetch_keys().await?;
        let jwk = keys.find(kid).cloned();
        cache.current = Some(CachedKeys {
            keys,
            fetched_at: Instant::now(),
        });

        let jwk = jwk.ok_or_else(|| VerifyError::UnknownKeyId(kid.to_string()))?;
        Ok(DecodingKey::from_jwk(&jwk)?)
    }

    async fn cached_jwk(&self, kid: &str) -> Option<Jwk> {
        let cache = self.cache.read().await;
        cache
            .current
            .as_ref()
            .filter(|cached| cached.fetched_at.elapsed() < self.key_ttl)
            .and_then(|cached| cached.keys.find(kid).cloned())
    }

    async fn fetch_keys(&self) -> Result<JwkSet, VerifyError> {
        tracing::debug!("Fetching signing keys from {}", self.jwks_url);
        self.client
            .get(&self.jwks_url)
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(|e| VerifyError::KeyFetch(e.to_string()))?
            .json::<JwkSet>()
            .await
            .map_err(|e| VerifyError::KeyFetch(e.to_string()))
    }
}

#[async_trait]
impl IdentityProvider for FirebaseVerifier {
    async fn verify_id_token(&self, token: &str) -> Result<String, VerifyError> {
        let header = decode_header(token).map_err(|e| VerifyError::Malformed(e.to_string()))?;
        if header.alg != Algorithm::RS256 {
            return Err(VerifyError::UnsupportedAlgorithm(header.alg));
        }
        let kid = header.kid.ok_or(VerifyError::MissingKeyId)?;

        let key = self.signing_key(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[&self.project_id]);
        validation.set_issuer(&[self.issuer()]);
        validation.set_required_spec_claims(&["exp", "iat", "aud", "iss", "sub"]);

        let claims = decode::<FirebaseClaims>(token, &key, &validation)?.claims;
        check_claims(&claims, chrono::Utc::now().timestamp())?;

        Ok(claims.sub)
    }
}

fn check_claims(claims: &FirebaseClaims, now: i64) -> Result<(), VerifyError> {
    if claims.sub.is_empty() || claims.sub.len() > 128 {
        return Err(VerifyError::InvalidClaims("subject must be 1-128 characters".to_string()));
    }
    if claims.iat > now + CLOCK_SKEW_SECS {
        return Err(VerifyError::InvalidClaims("token issued in the future".to_string()));
    }
    if let Some(auth_time) = claims.auth_time {
        if auth_time > now + CLOCK_SKEW_SECS {
            return Err(VerifyError::InvalidClaims("authentication time is in the future".to_string()));
        }
    }
    Ok(())
}
