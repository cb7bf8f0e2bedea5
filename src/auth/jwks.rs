// auth/jwks.rs - Identity-provider signing keys
//
// Keys are published by the identity provider as a JWK set and rotated by
// key id. `SigningKeyCache` keeps decoded keys in-process and only goes back
// to the network on a cache miss, at most N times per rolling minute.

use async_trait::async_trait;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::DecodingKey;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Error)]
pub enum KeySetError {
    #[error("Key set fetch failed: {0}")]
    Fetch(String),

    #[error("Key set fetch rate limit exceeded")]
    RateLimited,

    #[error("No signing key with id '{0}'")]
    UnknownKeyId(String),
}

impl From<reqwest::Error> for KeySetError {
    fn from(err: reqwest::Error) -> Self {
        KeySetError::Fetch(err.to_string())
    }
}

/// Where the published key set comes from.
#[async_trait]
pub trait KeySetSource: Send + Sync {
    async fn fetch(&self) -> Result<JwkSet, KeySetError>;
}

/// Fetches the key set over HTTPS.
pub struct HttpKeySetSource {
    client: reqwest::Client,
    url: url::Url,
}

impl HttpKeySetSource {
    pub fn new(url: url::Url, timeout: Duration) -> Result<Self, KeySetError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl KeySetSource for HttpKeySetSource {
    async fn fetch(&self) -> Result<JwkSet, KeySetError> {
        tracing::info!("Fetching identity-provider key set from {}", self.url);

        let jwks = self
            .client
            .get(self.url.clone())
            .send()
            .await?
            .error_for_status()?
            .json::<JwkSet>()
            .await?;
        Ok(jwks)
    }
}

/// A fixed key set, for tests and offline deployments.
pub struct StaticKeySetSource {
    jwks: JwkSet,
}

impl StaticKeySetSource {
    pub fn new(jwks: JwkSet) -> Self {
        Self { jwks }
    }

    pub fn from_json(json: &str) -> Result<Self, KeySetError> {
        let jwks = serde_json::from_str(json).map_err(|e| KeySetError::Fetch(e.to_string()))?;
        Ok(Self::new(jwks))
    }
}

#[async_trait]
impl KeySetSource for StaticKeySetSource {
    async fn fetch(&self) -> Result<JwkSet, KeySetError> {
        Ok(self.jwks.clone())
    }
}

/// Rolling-window limiter for key-set fetches.
pub struct FetchLimiter {
    max_fetches: usize,
    window: Duration,
    recent: Mutex<VecDeque<Instant>>,
}

impl FetchLimiter {
    pub fn new(max_fetches: u32, window: Duration) -> Self {
        Self {
            max_fetches: max_fetches as usize,
            window,
            recent: Mutex::new(VecDeque::new()),
        }
    }

    pub fn per_minute(max_fetches: u32) -> Self {
        Self::new(max_fetches, Duration::from_secs(60))
    }

    pub fn try_acquire(&self) -> bool {
        self.try_acquire_at(Instant::now())
    }

    /// Record a fetch at `now` if the window has room.
    pub fn try_acquire_at(&self, now: Instant) -> bool {
        // A poisoned lock only means another fetch panicked mid-update; the
        // timestamps are still usable.
        let mut recent = self.recent.lock().unwrap_or_else(|e| e.into_inner());

        while let Some(oldest) = recent.front() {
            if now.saturating_duration_since(*oldest) >= self.window {
                recent.pop_front();
            } else {
                break;
            }
        }

        if recent.len() >= self.max_fetches {
            return false;
        }
        recent.push_back(now);
        true
    }
}

struct CachedKey {
    key: DecodingKey,
    fetched_at: Instant,
}

/// Decoded identity-provider keys by key id.
pub struct SigningKeyCache {
    source: Arc<dyn KeySetSource>,
    limiter: FetchLimiter,
    ttl: Option<Duration>,
    keys: RwLock<HashMap<String, CachedKey>>,
}

impl SigningKeyCache {
    pub fn new(source: Arc<dyn KeySetSource>, requests_per_minute: u32, ttl: Option<Duration>) -> Self {
        Self {
            source,
            limiter: FetchLimiter::per_minute(requests_per_minute),
            ttl,
            keys: RwLock::new(HashMap::new()),
        }
    }

    /// Decoding key for `kid`, fetching the key set on a miss.
    pub async fn signing_key(&self, kid: &str) -> Result<DecodingKey, KeySetError> {
        if let Some(key) = self.cached(kid).await {
            return Ok(key);
        }

        if !self.limiter.try_acquire() {
            tracing::warn!("Key set fetch for kid '{}' rejected by rate limit", kid);
            return Err(KeySetError::RateLimited);
        }

        let jwks = self.source.fetch().await?;
        let fetched_at = Instant::now();
        let mut decoded = HashMap::new();

        for jwk in &jwks.keys {
            let Some(id) = jwk.common.key_id.clone() else {
                continue;
            };
            match DecodingKey::from_jwk(jwk) {
                Ok(key) => {
                    decoded.insert(id, CachedKey { key, fetched_at });
                }
                Err(e) => tracing::warn!("Skipping unusable key '{}' in key set: {}", id, e),
            }
        }

        let found = decoded.get(kid).map(|entry| entry.key.clone());
        self.keys.write().await.extend(decoded);

        found.ok_or_else(|| KeySetError::UnknownKeyId(kid.to_string()))
    }

    async fn cached(&self, kid: &str) -> Option<DecodingKey> {
        let keys = self.keys.read().await;
        let entry = keys.get(kid)?;
        match self.ttl {
            Some(ttl) if entry.fetched_at.elapsed() >= ttl => None,
            _ => Some(entry.key.clone()),
        }
    }
}
