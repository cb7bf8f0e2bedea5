use serde::{Deserialize, Serialize};

use super::user_service::normalize_email;
use crate::auth::password::verify_password;
use crate::auth::{CustomClaims, TokenVerifier};
use crate::error::ApiError;
use crate::models::{from_document, ProjectUser};
use crate::store::{DocumentStore, Key};

const INVALID_CREDENTIALS: &str = "Invalid email or password";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub token: String,
}

/// Exchanges a project user's email and password for a custom token.
pub struct LoginService<'a> {
    store: &'a dyn DocumentStore,
    table: &'a str,
    verifier: &'a TokenVerifier,
    ttl_hours: u64,
}

impl<'a> LoginService<'a> {
    pub fn new(
        store: &'a dyn DocumentStore,
        table: &'a str,
        verifier: &'a TokenVerifier,
        ttl_hours: u64,
    ) -> Self {
        Self {
            store,
            table,
            verifier,
            ttl_hours,
        }
    }

    pub async fn login(
        &self,
        project_id: &str,
        request: LoginRequest,
    ) -> Result<LoginResponse, ApiError> {
        let email = normalize_email(&request.email)?;

        let user: ProjectUser = match self.store.get(self.table, &Key::new(project_id, email.as_str())).await? {
            Some(doc) => from_document(self.table, doc)?,
            None => {
                tracing::info!("Login failed for {} in {}: no such user", email, project_id);
                return Err(ApiError::unauthenticated(INVALID_CREDENTIALS));
            }
        };

        let verified = user
            .password_hash
            .as_deref()
            .map(|hash| verify_password(&request.password, hash))
            .unwrap_or(false);
        if !verified {
            tracing::info!("Login failed for {} in {}: bad password", email, project_id);
            return Err(ApiError::unauthenticated(INVALID_CREDENTIALS));
        }

        let claims = CustomClaims::new(project_id, &user.email, &user.role, self.ttl_hours);
        let token = self.verifier.issue_custom_token(&claims).await?;

        tracing::info!("Issued token for {} in {}", user.email, project_id);
        Ok(LoginResponse { token })
    }
}
