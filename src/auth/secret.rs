// auth/secret.rs - Custom-token signing secret
//
// The secret lives in an external secret store as a JSON payload
// `{ "ccJWTSecret": "..." }`. It is fetched on first use and cached by
// `SecretCache` for the life of the process (or until the TTL elapses).

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Error)]
pub enum SecretError {
    #[error("Secret not found: {0}")]
    NotFound(String),

    #[error("Secret {id} is malformed: {message}")]
    Malformed { id: String, message: String },

    #[error("Secret store unavailable: {0}")]
    Unavailable(String),
}

/// Source of raw secret strings, addressed by secret id.
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn get_secret(&self, secret_id: &str) -> Result<String, SecretError>;
}

/// Reads secrets from environment variables named `CC_SECRET_<ID>`, where
/// `<ID>` is the secret id upper-cased with non-alphanumerics replaced by `_`.
#[derive(Debug, Clone, Default)]
pub struct EnvSecretStore;

impl EnvSecretStore {
    pub fn variable_name(secret_id: &str) -> String {
        let id: String = secret_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
            .collect();
        format!("CC_SECRET_{}", id)
    }
}

#[async_trait]
impl SecretStore for EnvSecretStore {
    async fn get_secret(&self, secret_id: &str) -> Result<String, SecretError> {
        let name = Self::variable_name(secret_id);
        std::env::var(&name).map_err(|_| SecretError::NotFound(name))
    }
}

/// Fixed secrets, for tests and local tooling.
#[derive(Debug, Clone, Default)]
pub struct StaticSecretStore {
    secrets: HashMap<String, String>,
}

impl StaticSecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secret(mut self, secret_id: impl Into<String>, payload: impl Into<String>) -> Self {
        self.secrets.insert(secret_id.into(), payload.into());
        self
    }

    /// Store `signing_secret` in the JSON shape the cache expects.
    pub fn with_signing_secret(self, secret_id: impl Into<String>, signing_secret: &str) -> Self {
        let payload = serde_json::json!({ "ccJWTSecret": signing_secret }).to_string();
        self.with_secret(secret_id, payload)
    }
}

#[async_trait]
impl SecretStore for StaticSecretStore {
    async fn get_secret(&self, secret_id: &str) -> Result<String, SecretError> {
        self.secrets
            .get(secret_id)
            .cloned()
            .ok_or_else(|| SecretError::NotFound(secret_id.to_string()))
    }
}

#[derive(Deserialize)]
struct SigningSecretPayload {
    #[serde(rename = "ccJWTSecret")]
    cc_jwt_secret: String,
}

struct CachedSecret {
    value: Arc<str>,
    fetched_at: Instant,
}

/// Read-through cache for the custom-token signing secret.
pub struct SecretCache {
    store: Arc<dyn SecretStore>,
    secret_id: String,
    ttl: Option<Duration>,
    cached: RwLock<Option<CachedSecret>>,
}

impl SecretCache {
    pub fn new(store: Arc<dyn SecretStore>, secret_id: impl Into<String>, ttl: Option<Duration>) -> Self {
        Self {
            store,
            secret_id: secret_id.into(),
            ttl,
            cached: RwLock::new(None),
        }
    }

    /// Current signing secret, fetching it on a miss or after expiry.
    ///
    /// Concurrent misses may each fetch; the last one to finish wins, which is
    /// fine because the value is the same.
    pub async fn signing_secret(&self) -> Result<Arc<str>, SecretError> {
        {
            let cached = self.cached.read().await;
            if let Some(entry) = cached.as_ref() {
                if self.ttl.map_or(true, |ttl| entry.fetched_at.elapsed() < ttl) {
                    return Ok(entry.value.clone());
                }
            }
        }

        let raw = self.store.get_secret(&self.secret_id).await?;
        let payload: SigningSecretPayload =
            serde_json::from_str(&raw).map_err(|e| SecretError::Malformed {
                id: self.secret_id.clone(),
                message: e.to_string(),
            })?;

        if payload.cc_jwt_secret.is_empty() {
            return Err(SecretError::Malformed {
                id: self.secret_id.clone(),
                message: "empty signing secret".to_string(),
            });
        }

        let value: Arc<str> = Arc::from(payload.cc_jwt_secret);
        *self.cached.write().await = Some(CachedSecret {
            value: value.clone(),
            fetched_at: Instant::now(),
        });

        tracing::debug!("Fetched signing secret '{}'", self.secret_id);
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingStore {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SecretStore for CountingStore {
        async fn get_secret(&self, _secret_id: &str) -> Result<String, SecretError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(r#"{"ccJWTSecret":"s3cr3t"}"#.to_string())
        }
    }

    #[tokio::test]
    async fn secret_is_fetched_once() {
        let store = Arc::new(CountingStore { calls: AtomicUsize::new(0) });
        let cache = SecretCache::new(store.clone(), "jwtSigningKey", None);

        assert_eq!(&*cache.signing_secret().await.unwrap(), "s3cr3t");
        assert_eq!(&*cache.signing_secret().await.unwrap(), "s3cr3t");
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn expired_secret_is_refetched() {
        let store = Arc::new(CountingStore { calls: AtomicUsize::new(0) });
        let cache = SecretCache::new(store.clone(), "jwtSigningKey", Some(Duration::ZERO));

        cache.signing_secret().await.unwrap();
        cache.signing_secret().await.unwrap();
        assert_eq!(store.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn malformed_payload_is_rejected() {
        let store = Arc::new(StaticSecretStore::new().with_secret("jwtSigningKey", "not json"));
        let cache = SecretCache::new(store, "jwtSigningKey", None);

        let err = cache.signing_secret().await.unwrap_err();
        assert!(matches!(err, SecretError::Malformed { .. }));
    }

    #[tokio::test]
    async fn missing_secret_is_not_found() {
        let cache = SecretCache::new(Arc::new(StaticSecretStore::new()), "jwtSigningKey", None);
        assert!(matches!(
            cache.signing_secret().await.unwrap_err(),
            SecretError::NotFound(_)
        ));
    }

    #[test]
    fn env_variable_names() {
        assert_eq!(EnvSecretStore::variable_name("jwtSigningKey"), "CC_SECRET_JWTSIGNINGKEY");
        assert_eq!(EnvSecretStore::variable_name("cc/jwt-key"), "CC_SECRET_CC_JWT_KEY");
    }
}
