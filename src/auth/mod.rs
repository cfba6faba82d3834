//! Identity verification.
//!
//! Every request except `ping` carries a bearer JWT issued by the identity
//! provider. Verification is mandatory before any handler runs. Decoding keys
//! come from a process-wide [`KeyCache`] refreshed from a [`KeyProvider`] on
//! TTL expiry or signature failure; a refresh replaces the `Arc`, it never
//! mutates a key set in place.

use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::http::HeaderMap;
use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::config::SecurityConfig;
use crate::error::ApiError;

/// Claims we require from the identity provider's tokens.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub exp: i64,
    pub iat: i64,
}

/// Authenticated identity derived from a verified credential. Email is
/// case-normalized here and nowhere else.
#[derive(Clone, Debug)]
pub struct Principal {
    pub subject: String,
    pub email: String,
    pub expires_at: DateTime<Utc>,
}

impl From<Claims> for Principal {
    fn from(claims: Claims) -> Self {
        Self {
            subject: claims.sub,
            email: claims.email.trim().to_lowercase(),
            expires_at: Utc
                .timestamp_opt(claims.exp, 0)
                .single()
                .unwrap_or_else(Utc::now),
        }
    }
}

/// Key material currently trusted for verification.
pub struct KeySet {
    pub decoding: DecodingKey,
}

/// Source of decoding keys. Production wires the configured provider secret;
/// tests inject fixed keys without network access.
#[async_trait]
pub trait KeyProvider: Send + Sync {
    async fn fetch_keys(&self) -> Result<KeySet, ApiError>;
}

/// Provider backed by the static HMAC secret shared with the identity
/// provider.
pub struct StaticKeyProvider {
    secret: String,
}

impl StaticKeyProvider {
    pub fn new(secret: impl Into<String>) -> Self {
        Self { secret: secret.into() }
    }
}

#[async_trait]
impl KeyProvider for StaticKeyProvider {
    async fn fetch_keys(&self) -> Result<KeySet, ApiError> {
        if self.secret.is_empty() {
            return Err(ApiError::authentication("Identity provider not configured"));
        }
        Ok(KeySet {
            decoding: DecodingKey::from_secret(self.secret.as_bytes()),
        })
    }
}

/// Read-mostly cache of provider keys. Concurrent reads share the current
/// `Arc<KeySet>`; refresh swaps the reference.
pub struct KeyCache {
    provider: Arc<dyn KeyProvider>,
    ttl: Duration,
    current: RwLock<Option<(Instant, Arc<KeySet>)>>,
}

impl KeyCache {
    pub fn new(provider: Arc<dyn KeyProvider>, ttl: Duration) -> Self {
        Self {
            provider,
            ttl,
            current: RwLock::new(None),
        }
    }

    pub async fn current(&self) -> Result<Arc<KeySet>, ApiError> {
        {
            let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
            if let Some((fetched_at, keys)) = guard.as_ref() {
                if fetched_at.elapsed() < self.ttl {
                    return Ok(keys.clone());
                }
            }
        }
        self.refresh().await
    }

    pub async fn refresh(&self) -> Result<Arc<KeySet>, ApiError> {
        let keys = Arc::new(self.provider.fetch_keys().await?);
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        *guard = Some((Instant::now(), keys.clone()));
        Ok(keys)
    }
}

pub struct IdentityVerifier {
    keys: KeyCache,
    validation: Validation,
}

impl IdentityVerifier {
    pub fn new(provider: Arc<dyn KeyProvider>, issuer: Option<&str>, ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        if let Some(issuer) = issuer {
            validation.set_issuer(&[issuer]);
        }
        Self {
            keys: KeyCache::new(provider, ttl),
            validation,
        }
    }

    pub fn from_config(security: &SecurityConfig) -> Self {
        Self::new(
            Arc::new(StaticKeyProvider::new(security.jwt_secret.clone())),
            security.jwt_issuer.as_deref(),
            Duration::from_secs(security.key_cache_ttl_secs),
        )
    }

    /// Verify a bearer credential and produce the authenticated principal.
    /// Signature failures trigger one key refresh before giving up, so a
    /// provider key rotation does not lock callers out for a full TTL.
    pub async fn verify(&self, token: &str) -> Result<Principal, ApiError> {
        let keys = self.keys.current().await?;
        match self.decode_claims(token, &keys) {
            Ok(claims) => Ok(claims.into()),
            Err(err) if matches!(err.kind(), ErrorKind::InvalidSignature) => {
                let keys = self.keys.refresh().await?;
                self.decode_claims(token, &keys)
                    .map(Principal::from)
                    .map_err(map_jwt_error)
            }
            Err(err) => Err(map_jwt_error(err)),
        }
    }

    fn decode_claims(
        &self,
        token: &str,
        keys: &KeySet,
    ) -> Result<Claims, jsonwebtoken::errors::Error> {
        decode::<Claims>(token, &keys.decoding, &self.validation).map(|data| data.claims)
    }
}

fn map_jwt_error(err: jsonwebtoken::errors::Error) -> ApiError {
    match err.kind() {
        ErrorKind::ExpiredSignature => ApiError::authentication("Expired credential"),
        ErrorKind::InvalidIssuer => ApiError::authentication("Credential issuer not trusted"),
        _ => ApiError::authentication("Invalid credential"),
    }
}

/// Extract the bearer token from the Authorization header.
pub fn bearer_token(headers: &HeaderMap) -> Result<String, ApiError> {
    let auth_header = headers
        .get("authorization")
        .ok_or_else(|| ApiError::authentication("Missing Authorization header"))?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| ApiError::authentication("Invalid Authorization header format"))?;

    let Some(token) = auth_str.strip_prefix("Bearer ") else {
        return Err(ApiError::authentication(
            "Authorization header must use Bearer token format",
        ));
    };

    if token.trim().is_empty() {
        return Err(ApiError::authentication("Empty bearer token"));
    }
    Ok(token.trim().to_string())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    const SECRET: &str = "unit-test-secret";

    fn verifier(issuer: Option<&str>) -> IdentityVerifier {
        IdentityVerifier::new(
            Arc::new(StaticKeyProvider::new(SECRET)),
            issuer,
            Duration::from_secs(60),
        )
    }

    fn mint(email: &str, exp_offset_secs: i64, secret: &str, issuer: Option<&str>) -> String {
        let now = Utc::now().timestamp();
        let mut claims = json!({
            "sub": "subject-1",
            "email": email,
            "exp": now + exp_offset_secs,
            "iat": now,
        });
        if let Some(issuer) = issuer {
            claims["iss"] = json!(issuer);
        }
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn valid_token_yields_normalized_principal() {
        let token = mint("Alice@X.com", 3600, SECRET, None);
        let principal = verifier(None).verify(&token).await.unwrap();
        assert_eq!(principal.email, "alice@x.com");
        assert_eq!(principal.subject, "subject-1");
        assert!(principal.expires_at > Utc::now());
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let token = mint("a@x.com", -7200, SECRET, None);
        let err = verifier(None).verify(&token).await.unwrap_err();
        assert!(matches!(err, ApiError::Authentication(_)));
    }

    #[tokio::test]
    async fn tampered_token_is_rejected() {
        let token = mint("a@x.com", 3600, "some-other-secret", None);
        let err = verifier(None).verify(&token).await.unwrap_err();
        assert!(matches!(err, ApiError::Authentication(_)));
    }

    #[tokio::test]
    async fn malformed_token_is_rejected() {
        let err = verifier(None).verify("not-a-jwt").await.unwrap_err();
        assert!(matches!(err, ApiError::Authentication(_)));
    }

    #[tokio::test]
    async fn issuer_mismatch_is_rejected() {
        let token = mint("a@x.com", 3600, SECRET, Some("https://rogue.example"));
        let err = verifier(Some("https://idp.example"))
            .verify(&token)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Authentication(_)));

        let token = mint("a@x.com", 3600, SECRET, Some("https://idp.example"));
        assert!(verifier(Some("https://idp.example")).verify(&token).await.is_ok());
    }

    /// Provider that rotates to a new secret after its first fetch.
    struct RotatingKeyProvider {
        fetches: AtomicU32,
    }

    #[async_trait]
    impl KeyProvider for RotatingKeyProvider {
        async fn fetch_keys(&self) -> Result<KeySet, ApiError> {
            let n = self.fetches.fetch_add(1, Ordering::SeqCst);
            let secret = if n == 0 { "old-secret" } else { "new-secret" };
            Ok(KeySet {
                decoding: DecodingKey::from_secret(secret.as_bytes()),
            })
        }
    }

    #[tokio::test]
    async fn key_rotation_recovers_without_waiting_out_the_ttl() {
        let verifier = IdentityVerifier::new(
            Arc::new(RotatingKeyProvider {
                fetches: AtomicU32::new(0),
            }),
            None,
            Duration::from_secs(3600),
        );

        // Warm the cache under the old key.
        let old = mint("a@x.com", 3600, "old-secret", None);
        assert!(verifier.verify(&old).await.is_ok());

        // The provider has rotated; the cached key no longer matches, but
        // the one-shot refresh inside verify picks up the new key.
        let new = mint("a@x.com", 3600, "new-secret", None);
        let principal = verifier.verify(&new).await.unwrap();
        assert_eq!(principal.email, "a@x.com");

        // Credentials signed under the retired key stay rejected.
        assert!(verifier.verify(&old).await.is_err());
    }

    #[tokio::test]
    async fn unconfigured_provider_rejects_everything() {
        let verifier = IdentityVerifier::new(
            Arc::new(StaticKeyProvider::new("")),
            None,
            Duration::from_secs(60),
        );
        let token = mint("a@x.com", 3600, SECRET, None);
        let err = verifier.verify(&token).await.unwrap_err();
        assert!(matches!(err, ApiError::Authentication(_)));
    }

    #[test]
    fn bearer_extraction_rules() {
        let mut headers = HeaderMap::new();
        assert!(bearer_token(&headers).is_err());

        headers.insert("authorization", "Token abc".parse().unwrap());
        assert!(bearer_token(&headers).is_err());

        headers.insert("authorization", "Bearer ".parse().unwrap());
        assert!(bearer_token(&headers).is_err());

        headers.insert("authorization", "Bearer abc.def.ghi".parse().unwrap());
        assert_eq!(bearer_token(&headers).unwrap(), "abc.def.ghi");
    }
}
