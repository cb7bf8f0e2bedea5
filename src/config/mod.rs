use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub auth: AuthConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreBackend {
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub database_url: Option<String>,
    pub max_connections: u32,
    /// Appended to every table name as `-{suffix}` (per-deployment tables).
    pub table_suffix: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Authorization scheme prefix that marks an identity-provider token.
    pub idp_scheme: String,
    pub idp_issuer: String,
    /// Defaults to `{idp_issuer}/.well-known/jwks.json` when unset.
    pub idp_jwks_url: Option<String>,
    pub idp_audience: Option<String>,
    pub jwks_requests_per_minute: u32,
    pub jwks_timeout_secs: u64,
    /// None keeps fetched keys for the life of the process.
    pub key_cache_ttl_secs: Option<u64>,
    pub secret_id: String,
    pub secret_cache_ttl_secs: Option<u64>,
    pub custom_token_ttl_hours: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Empty means any origin.
    pub cors_origins: Vec<String>,
}

impl StoreConfig {
    /// Physical table name for a logical collection.
    pub fn table(&self, collection: &str) -> String {
        match self.table_suffix.as_deref() {
            Some(suffix) if !suffix.is_empty() => format!("{}-{}", collection, suffix),
            _ => collection.to_string(),
        }
    }
}

impl AuthConfig {
    /// Resolve the key-set URL, deriving it from the issuer when not configured.
    pub fn jwks_url(&self) -> Result<url::Url, url::ParseError> {
        match &self.idp_jwks_url {
            Some(explicit) => url::Url::parse(explicit),
            None => {
                let issuer = url::Url::parse(&format!(
                    "{}/",
                    self.idp_issuer.trim_end_matches('/')
                ))?;
                issuer.join(".well-known/jwks.json")
            }
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Ok(v) = env::var("SERVER_BIND_ADDRESS") {
            self.server.bind_address = v;
        }
        if let Some(port) = env::var("CC_API_PORT")
            .ok()
            .or_else(|| env::var("PORT").ok())
            .and_then(|s| s.parse::<u16>().ok())
        {
            self.server.port = port;
        }

        // Store overrides
        if let Ok(v) = env::var("STORE_BACKEND") {
            match v.to_ascii_lowercase().as_str() {
                "postgres" | "postgresql" => self.store.backend = StoreBackend::Postgres,
                "memory" => self.store.backend = StoreBackend::Memory,
                other => tracing::warn!("Ignoring unknown STORE_BACKEND '{}'", other),
            }
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            self.store.database_url = Some(v);
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.store.max_connections = v.parse().unwrap_or(self.store.max_connections);
        }
        if let Ok(v) = env::var("STORE_TABLE_SUFFIX") {
            self.store.table_suffix = Some(v).filter(|s| !s.is_empty());
        }

        // Auth overrides
        if let Ok(v) = env::var("AUTH_IDP_SCHEME") {
            self.auth.idp_scheme = v;
        }
        if let Ok(v) = env::var("AUTH_IDP_ISSUER") {
            self.auth.idp_issuer = v;
        }
        if let Ok(v) = env::var("AUTH_IDP_JWKS_URL") {
            self.auth.idp_jwks_url = Some(v);
        }
        if let Ok(v) = env::var("AUTH_IDP_AUDIENCE") {
            self.auth.idp_audience = Some(v).filter(|s| !s.is_empty());
        }
        if let Ok(v) = env::var("AUTH_JWKS_REQUESTS_PER_MINUTE") {
            self.auth.jwks_requests_per_minute = v.parse().unwrap_or(self.auth.jwks_requests_per_minute);
        }
        if let Ok(v) = env::var("AUTH_JWKS_TIMEOUT_SECS") {
            self.auth.jwks_timeout_secs = v.parse().unwrap_or(self.auth.jwks_timeout_secs);
        }
        if let Ok(v) = env::var("AUTH_KEY_CACHE_TTL_SECS") {
            self.auth.key_cache_ttl_secs = v.parse().ok();
        }
        if let Ok(v) = env::var("AUTH_SECRET_ID") {
            self.auth.secret_id = v;
        }
        if let Ok(v) = env::var("AUTH_SECRET_CACHE_TTL_SECS") {
            self.auth.secret_cache_ttl_secs = v.parse().ok();
        }
        if let Ok(v) = env::var("AUTH_CUSTOM_TOKEN_TTL_HOURS") {
            self.auth.custom_token_ttl_hours = v.parse().unwrap_or(self.auth.custom_token_ttl_hours);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        self
    }

    fn base_auth() -> AuthConfig {
        AuthConfig {
            idp_scheme: "Cognito".to_string(),
            idp_issuer: "https://cognito-idp.us-east-1.amazonaws.com/us-east-1_example".to_string(),
            idp_jwks_url: None,
            idp_audience: None,
            jwks_requests_per_minute: 10,
            jwks_timeout_secs: 10,
            key_cache_ttl_secs: None,
            secret_id: "jwtSigningKey".to_string(),
            secret_cache_ttl_secs: None,
            custom_token_ttl_hours: 24,
        }
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 3000,
            },
            store: StoreConfig {
                backend: StoreBackend::Memory,
                database_url: None,
                max_connections: 10,
                table_suffix: None,
            },
            auth: AuthConfig {
                custom_token_ttl_hours: 24 * 7, // 1 week
                ..Self::base_auth()
            },
            security: SecurityConfig {
                cors_origins: Vec::new(),
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                bind_address: "0.0.0.0".to_string(),
                port: 3000,
            },
            store: StoreConfig {
                backend: StoreBackend::Postgres,
                database_url: None,
                max_connections: 20,
                table_suffix: Some("staging".to_string()),
            },
            auth: AuthConfig {
                key_cache_ttl_secs: Some(6 * 60 * 60),
                ..Self::base_auth()
            },
            security: SecurityConfig {
                cors_origins: Vec::new(),
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                bind_address: "0.0.0.0".to_string(),
                port: 3000,
            },
            store: StoreConfig {
                backend: StoreBackend::Postgres,
                database_url: None,
                max_connections: 50,
                table_suffix: None,
            },
            auth: AuthConfig {
                key_cache_ttl_secs: Some(6 * 60 * 60),
                secret_cache_ttl_secs: Some(60 * 60),
                custom_token_ttl_hours: 4,
                ..Self::base_auth()
            },
            security: SecurityConfig {
                cors_origins: Vec::new(),
            },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}
