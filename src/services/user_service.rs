use serde::Serialize;
use serde_json::{json, Value};

use super::authorize;
use crate::auth::password::hash_password;
use crate::auth::{AuthorizationContext, GUEST_ROLE};
use crate::error::ApiError;
use crate::models::{
    from_document, to_document, NewProjectUser, ProjectUser, ProjectUserUpdate, ProjectUserView,
};
use crate::policy::{AccessRequest, Downgrade, Operation, PolicyEvaluator, Resource};
use crate::store::{Document, DocumentStore, Key, SortCondition};

/// Result of an idempotent user create.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CreateUserOutcome {
    Created {
        created: bool,
        user: ProjectUserView,
    },
    Existing {
        created: bool,
        #[serde(rename = "ProjectID")]
        project_id: String,
        #[serde(rename = "Email")]
        email: String,
    },
}

impl CreateUserOutcome {
    pub fn is_created(&self) -> bool {
        matches!(self, CreateUserOutcome::Created { .. })
    }
}

pub struct UserService<'a> {
    store: &'a dyn DocumentStore,
    table: &'a str,
    policy: &'a PolicyEvaluator,
}

impl<'a> UserService<'a> {
    pub fn new(store: &'a dyn DocumentStore, table: &'a str, policy: &'a PolicyEvaluator) -> Self {
        Self {
            store,
            table,
            policy,
        }
    }

    pub async fn list(
        &self,
        ctx: &AuthorizationContext,
        project_id: &str,
    ) -> Result<Vec<ProjectUserView>, ApiError> {
        authorize(
            self.policy,
            ctx,
            AccessRequest::new(Resource::ProjectUser, Operation::List).in_project(project_id),
        )?;

        let docs = self
            .store
            .query(self.table, project_id, &SortCondition::Any)
            .await?;

        let mut users = Vec::with_capacity(docs.len());
        for doc in docs {
            match from_document::<ProjectUser>(self.table, doc) {
                Ok(user) => users.push(user.redacted()),
                Err(e) => tracing::warn!("Skipping unreadable user in {}: {}", project_id, e),
            }
        }
        Ok(users)
    }

    pub async fn get(
        &self,
        ctx: &AuthorizationContext,
        project_id: &str,
        email: &str,
    ) -> Result<ProjectUserView, ApiError> {
        let email = normalize_email(email)?;
        authorize(
            self.policy,
            ctx,
            AccessRequest::new(Resource::ProjectUser, Operation::Read)
                .in_project(project_id)
                .target_email(&email),
        )?;

        self.fetch(project_id, &email)
            .await?
            .map(|user| user.redacted())
            .ok_or_else(|| ApiError::not_found("User not found"))
    }

    /// Conditional insert: an existing (ProjectID, Email) is reported, never overwritten.
    pub async fn create(
        &self,
        ctx: &AuthorizationContext,
        input: NewProjectUser,
    ) -> Result<CreateUserOutcome, ApiError> {
        if input.project_id.is_empty() {
            return Err(ApiError::validation("ProjectID is required"));
        }
        let email = normalize_email(&input.email)?;

        let downgrades = authorize(
            self.policy,
            ctx,
            AccessRequest::new(Resource::ProjectUser, Operation::Create)
                .in_project(&input.project_id)
                .target_email(&email),
        )?;

        let key = Key::new(&input.project_id, email.as_str());
        if self.store.get(self.table, &key).await?.is_some() {
            tracing::debug!("User {} already exists in {}", email, input.project_id);
            return Ok(CreateUserOutcome::Existing {
                created: false,
                project_id: input.project_id,
                email,
            });
        }

        let mut role = input.role.unwrap_or_else(|| GUEST_ROLE.to_string());
        for downgrade in &downgrades {
            if let Downgrade::ForceRole(forced) = downgrade {
                if role != *forced {
                    tracing::info!(
                        "Downgrading requested role '{}' to '{}' for {} in {}",
                        role,
                        forced,
                        email,
                        input.project_id
                    );
                }
                role = forced.to_string();
            }
        }

        let password_hash = match input.password.as_deref() {
            Some(pw) => Some(hash_password(pw)?),
            None => None,
        };

        let user = ProjectUser {
            project_id: input.project_id,
            email,
            name: input.name,
            password_hash,
            role,
        };

        let inserted = self
            .store
            .insert(self.table, &key, to_document(&user)?)
            .await?;

        if inserted {
            tracing::info!("Created user {} in project {}", user.email, user.project_id);
            Ok(CreateUserOutcome::Created {
                created: true,
                user: user.redacted(),
            })
        } else {
            tracing::debug!("User {} already exists in {}", user.email, user.project_id);
            Ok(CreateUserOutcome::Existing {
                created: false,
                project_id: user.project_id,
                email: user.email,
            })
        }
    }

    pub async fn update(
        &self,
        ctx: &AuthorizationContext,
        project_id: &str,
        email: &str,
        input: ProjectUserUpdate,
    ) -> Result<ProjectUserView, ApiError> {
        let email = normalize_email(email)?;
        let downgrades = authorize(
            self.policy,
            ctx,
            AccessRequest::new(Resource::ProjectUser, Operation::Update)
                .in_project(project_id)
                .target_email(&email),
        )?;

        if self.fetch(project_id, &email).await?.is_none() {
            return Err(ApiError::not_found("User not found"));
        }

        let mut changes = Document::new();
        if let Some(name) = input.name {
            changes.insert("Name".to_string(), Value::String(name));
        }
        if let Some(password) = input.password.as_deref() {
            changes.insert("PasswordHash".to_string(), json!(hash_password(password)?));
        }
        if let Some(role) = input.role {
            if downgrades.contains(&Downgrade::PreserveStoredRole) {
                tracing::info!("Ignoring role change on {} by non-admin caller", email);
            } else {
                changes.insert("Role".to_string(), Value::String(role));
            }
        }

        let updated = self
            .store
            .update(self.table, &Key::new(project_id, email.as_str()), changes)
            .await?
            .ok_or_else(|| ApiError::not_found("User not found"))?;

        let user: ProjectUser = from_document(self.table, updated)?;
        Ok(user.redacted())
    }

    pub async fn delete(
        &self,
        ctx: &AuthorizationContext,
        project_id: &str,
        email: &str,
    ) -> Result<(), ApiError> {
        let email = normalize_email(email)?;
        authorize(
            self.policy,
            ctx,
            AccessRequest::new(Resource::ProjectUser, Operation::Delete)
                .in_project(project_id)
                .target_email(&email),
        )?;

        if !self.store.delete(self.table, &Key::new(project_id, email.as_str())).await? {
            return Err(ApiError::not_found("User not found"));
        }
        tracing::info!("Deleted user {} from project {}", email, project_id);
        Ok(())
    }

    async fn fetch(&self, project_id: &str, email: &str) -> Result<Option<ProjectUser>, ApiError> {
        match self.store.get(self.table, &Key::new(project_id, email)).await? {
            Some(doc) => Ok(Some(from_document(self.table, doc)?)),
            None => Ok(None),
        }
    }
}

pub(crate) fn normalize_email(email: &str) -> Result<String, ApiError> {
    let email = email.trim().to_lowercase();
    if email.is_empty() {
        return Err(ApiError::validation("Email is required"));
    }
    Ok(email)
}
