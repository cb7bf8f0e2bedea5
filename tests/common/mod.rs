#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde_json::{json, Value};

use crudconnect_api::auth::jwks::StaticKeySetSource;
use crudconnect_api::auth::secret::StaticSecretStore;
use crudconnect_api::config::AppConfig;
use crudconnect_api::store::{DocumentStore, MemoryStore};
use crudconnect_api::AppState;

pub const SIGNING_SECRET: &str = "integration-test-secret";
pub const ISSUER: &str = "https://idp.example.com/pool_test";
pub const KEY_ID: &str = "test-key-1";

const JWKS: &str = include_str!("../fixtures/idp_jwks.json");
const RSA_PEM: &[u8] = include_bytes!("../fixtures/idp_signing_key.pem");

/// The router served in-process on a free port, backed by an in-memory store.
pub struct TestServer {
    pub base_url: String,
    pub client: reqwest::Client,
    pub store: Arc<MemoryStore>,
}

impl TestServer {
    pub async fn spawn() -> Result<Self> {
        let mut config = AppConfig::development();
        config.auth.idp_issuer = ISSUER.to_string();
        config.auth.idp_audience = None;

        let store = Arc::new(MemoryStore::new());
        let secrets = StaticSecretStore::new()
            .with_signing_secret(config.auth.secret_id.clone(), SIGNING_SECRET);
        let keys = StaticKeySetSource::from_json(JWKS).context("fixture key set")?;

        let state = AppState::with_collaborators(
            &config,
            store.clone() as Arc<dyn DocumentStore>,
            Arc::new(secrets),
            Arc::new(keys),
        );
        let app = crudconnect_api::app(state, &config.security);

        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .context("failed to bind test listener")?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let server = Self {
            base_url: format!("http://127.0.0.1:{}", port),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()?,
            store,
        };
        server.wait_ready().await?;
        Ok(server)
    }

    async fn wait_ready(&self) -> Result<()> {
        for _ in 0..50 {
            if let Ok(resp) = self.client.get(self.url("/health")).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {}", self.base_url)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn get(&self, path: &str) -> RequestBuilder {
        self.client.get(self.url(path))
    }

    pub fn post(&self, path: &str) -> RequestBuilder {
        self.client.post(self.url(path))
    }

    pub fn put(&self, path: &str) -> RequestBuilder {
        self.client.put(self.url(path))
    }

    pub fn delete(&self, path: &str) -> RequestBuilder {
        self.client.delete(self.url(path))
    }
}

/// Status plus parsed JSON body (Null for empty bodies).
pub async fn read(resp: Response) -> Result<(StatusCode, Value)> {
    let status = resp.status();
    let text = resp.text().await?;
    let body = if text.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text).with_context(|| format!("non-JSON body: {}", text))?
    };
    Ok((status, body))
}

fn in_an_hour() -> i64 {
    Utc::now().timestamp() + 3600
}

pub fn custom_token_with(claims: Value, secret: &str) -> String {
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("sign custom token")
}

/// `Authorization` value for a custom token scoped to one project.
pub fn custom_auth(project_id: &str, email: &str, role: &str) -> String {
    let claims = json!({
        "sub": email,
        "Email": email,
        "ProjectID": project_id,
        "Role": role,
        "exp": in_an_hour(),
    });
    format!("Bearer {}", custom_token_with(claims, SIGNING_SECRET))
}

pub fn identity_token_with(claims: Value) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(KEY_ID.to_string());
    let key = EncodingKey::from_rsa_pem(RSA_PEM).expect("fixture RSA key");
    encode(&header, &claims, &key).expect("sign identity token")
}

/// `Authorization` value for an identity-provider (console) token.
pub fn console_auth(sub: &str, email: &str) -> String {
    let claims = json!({
        "sub": sub,
        "email": email,
        "iss": ISSUER,
        "exp": in_an_hour(),
    });
    format!("Cognito {}", identity_token_with(claims))
}

/// Create a project owned by `sub` through the API and return its ID.
pub async fn create_project(server: &TestServer, sub: &str, name: &str) -> Result<String> {
    let resp = server
        .post("/project")
        .header("Authorization", console_auth(sub, &format!("{}@x.com", sub)))
        .json(&json!({ "Name": name }))
        .send()
        .await?;
    let (status, body) = read(resp).await?;
    anyhow::ensure!(status == StatusCode::CREATED, "project create failed: {} {}", status, body);
    body["data"]["ID"]
        .as_str()
        .map(str::to_string)
        .context("project response has no ID")
}
