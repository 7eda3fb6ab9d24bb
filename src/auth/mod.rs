pub mod firebase;

use async_trait::async_trait;
use axum::http::HeaderValue;
use std::sync::Arc;

use crate::error::ApiError;

pub use firebase::FirebaseVerifier;

/// Bearer credential accepted without verification when the bypass is enabled.
pub const TEST_TOKEN: &str = "test-token";
/// Identity the test token resolves to.
pub const TEST_USER_ID: &str = "testuser_uid";

#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("unsupported signing algorithm {0:?}")]
    UnsupportedAlgorithm(jsonwebtoken::Algorithm),

    #[error("token header has no key id")]
    MissingKeyId,

    #[error("no signing key matches key id '{0}'")]
    UnknownKeyId(String),

    #[error("could not fetch signing keys: {0}")]
    KeyFetch(String),

    #[error("{0}")]
    Rejected(#[from] jsonwebtoken::errors::Error),

    #[error("invalid claims: {0}")]
    InvalidClaims(String),
}

/// External identity provider that turns an ID token into a subject id.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn verify_id_token(&self, token: &str) -> Result<String, VerifyError>;
}

/// Resolves the `Authorization` header of a request to a user id.
pub struct AuthGate {
    provider: Option<Arc<dyn IdentityProvider>>,
    allow_test_token: bool,
}

impl AuthGate {
    pub fn new(provider: Option<Arc<dyn IdentityProvider>>, allow_test_token: bool) -> Self {
        if allow_test_token {
            tracing::warn!("Test token bypass is enabled; '{}' resolves to '{}'", TEST_TOKEN, TEST_USER_ID);
        }
        Self {
            provider,
            allow_test_token,
        }
    }

    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    pub async fn authenticate(&self, header: Option<&HeaderValue>) -> Result<String, ApiError> {
        let token = extract_bearer(header).ok_or_else(|| {
            ApiError::unauthorized("Missing or invalid Authorization header. Expected 'Bearer <token>'")
        })?;

        if self.allow_test_token && token == TEST_TOKEN {
            return Ok(TEST_USER_ID.to_string());
        }

        let provider = self.provider.as_ref().ok_or_else(|| {
            ApiError::service_unavailable(
                "Identity verification is not configured and no test token was provided.",
            )
        })?;

        match provider.verify_id_token(token).await {
            Ok(uid) => Ok(uid),
            Err(e) => {
                tracing::debug!("Token verification failed: {}", e);
                Err(e.into())
            }
        }
    }
}

fn extract_bearer(header: Option<&HeaderValue>) -> Option<&str> {
    header?.to_str().ok()?.strip_prefix("Bearer ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl IdentityProvider for CountingProvider {
        async fn verify_id_token(&self, token: &str) -> Result<String, VerifyError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match token {
                "good" => Ok("firebase-uid-1".to_string()),
                _ => Err(VerifyError::Malformed("not a JWT".to_string())),
            }
        }
    }

    fn gate(allow_test_token: bool) -> (AuthGate, Arc<CountingProvider>) {
        let provider = Arc::new(CountingProvider {
            calls: AtomicUsize::new(0),
        });
        let gate = AuthGate::new(Some(provider.clone() as Arc<dyn IdentityProvider>), allow_test_token);
        (gate, provider)
    }

    fn bearer(token: &str) -> HeaderValue {
        HeaderValue::from_str(&format!("Bearer {}", token)).unwrap()
    }

    #[tokio::test]
    async fn missing_header_is_unauthorized() {
        let (gate, _) = gate(true);
        let err = gate.authenticate(None).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        assert!(err.message().contains("Expected 'Bearer <token>'"));
    }

    #[tokio::test]
    async fn wrong_scheme_is_unauthorized() {
        let (gate, provider) = gate(true);
        let header = HeaderValue::from_static("Basic dXNlcjpwYXNz");
        let err = gate.authenticate(Some(&header)).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_token_skips_verification() {
        let (gate, provider) = gate(true);
        let uid = gate.authenticate(Some(&bearer(TEST_TOKEN))).await.unwrap();
        assert_eq!(uid, TEST_USER_ID);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_token_is_verified_when_bypass_disabled() {
        let (gate, provider) = gate(false);
        let err = gate.authenticate(Some(&bearer(TEST_TOKEN))).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn verified_token_yields_subject() {
        let (gate, _) = gate(true);
        let uid = gate.authenticate(Some(&bearer("good"))).await.unwrap();
        assert_eq!(uid, "firebase-uid-1");
    }

    #[tokio::test]
    async fn rejected_token_mentions_invalid_or_expired() {
        let (gate, _) = gate(true);
        for token in ["", "garbage"] {
            let err = gate.authenticate(Some(&bearer(token))).await.unwrap_err();
            assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
            assert!(err.message().starts_with("Invalid or expired token"), "{}", err);
        }
    }

    #[tokio::test]
    async fn no_provider_is_service_unavailable() {
        let gate = AuthGate::new(None, true);
        let err = gate.authenticate(Some(&bearer("some-real-token"))).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);

        // the bypass still works without a provider
        assert_eq!(gate.authenticate(Some(&bearer(TEST_TOKEN))).await.unwrap(), TEST_USER_ID);
    }
}
