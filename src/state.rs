// state.rs - Shared application state
//
// Built once at startup. Everything inside is an Arc, so cloning the state
// for each request is cheap.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::auth::jwks::{HttpKeySetSource, KeySetError, KeySetSource, SigningKeyCache};
use crate::auth::secret::{EnvSecretStore, SecretCache, SecretStore};
use crate::auth::{AuthResolver, IdentityProviderSettings, ScanProjectMembership, TokenVerifier};
use crate::config::{AppConfig, AuthConfig, StoreBackend, StoreConfig};
use crate::policy::PolicyEvaluator;
use crate::store::{DocumentStore, MemoryStore, PgDocumentStore, StoreError};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("document store: {0}")]
    Store(#[from] StoreError),

    #[error("identity-provider key set: {0}")]
    KeySet(#[from] KeySetError),

    #[error("invalid key-set URL: {0}")]
    KeySetUrl(#[from] url::ParseError),
}

/// Physical table names, after the configured suffix is applied.
#[derive(Debug, Clone)]
pub struct Tables {
    pub projects: String,
    pub users: String,
    pub items: String,
    pub profiles: String,
}

impl Tables {
    pub fn from_config(store: &StoreConfig) -> Self {
        Self {
            projects: store.table("projects"),
            users: store.table("users"),
            items: store.table("items"),
            profiles: store.table("profiles"),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub resolver: Arc<AuthResolver>,
    pub policy: Arc<PolicyEvaluator>,
    pub tables: Arc<Tables>,
    pub custom_token_ttl_hours: u64,
}

impl AppState {
    /// Production wiring: store backend from config, secrets from the
    /// environment, keys fetched over HTTP.
    pub async fn from_config(config: &AppConfig) -> Result<Self, StartupError> {
        let store: Arc<dyn DocumentStore> = match config.store.backend {
            StoreBackend::Memory => {
                tracing::info!("Using in-memory document store");
                Arc::new(MemoryStore::new())
            }
            StoreBackend::Postgres => {
                let url = config
                    .store
                    .database_url
                    .as_deref()
                    .ok_or(StoreError::ConfigMissing("DATABASE_URL"))?;
                Arc::new(PgDocumentStore::connect(url, config.store.max_connections).await?)
            }
        };

        let keys = HttpKeySetSource::new(
            config.auth.jwks_url()?,
            Duration::from_secs(config.auth.jwks_timeout_secs),
        )?;

        Ok(Self::with_collaborators(
            config,
            store,
            Arc::new(EnvSecretStore),
            Arc::new(keys),
        ))
    }

    /// Wire the state around explicit collaborators.
    pub fn with_collaborators(
        config: &AppConfig,
        store: Arc<dyn DocumentStore>,
        secrets: Arc<dyn SecretStore>,
        keys: Arc<dyn KeySetSource>,
    ) -> Self {
        let auth = &config.auth;
        let tables = Tables::from_config(&config.store);

        let verifier = build_verifier(auth, secrets, keys);

        let membership = ScanProjectMembership::new(store.clone(), tables.projects.clone());
        let resolver = AuthResolver::new(
            auth.idp_scheme.clone(),
            Arc::new(verifier),
            Arc::new(membership),
        );

        Self {
            store,
            resolver: Arc::new(resolver),
            policy: Arc::new(PolicyEvaluator::new()),
            tables: Arc::new(tables),
            custom_token_ttl_hours: auth.custom_token_ttl_hours,
        }
    }
}

/// Verifier with its secret and signing-key caches, as configured.
pub fn build_verifier(
    auth: &AuthConfig,
    secrets: Arc<dyn SecretStore>,
    keys: Arc<dyn KeySetSource>,
) -> TokenVerifier {
    let secret_cache = SecretCache::new(
        secrets,
        auth.secret_id.clone(),
        auth.secret_cache_ttl_secs.map(Duration::from_secs),
    );
    let key_cache = SigningKeyCache::new(
        keys,
        auth.jwks_requests_per_minute,
        auth.key_cache_ttl_secs.map(Duration::from_secs),
    );
    TokenVerifier::new(
        secret_cache,
        key_cache,
        IdentityProviderSettings {
            issuer: auth.idp_issuer.clone(),
            audience: auth.idp_audience.clone(),
        },
    )
}
