use serde_json::{json, Value};
use uuid::Uuid;

use super::{authorize, console_subject};
use crate::auth::AuthorizationContext;
use crate::error::ApiError;
use crate::models::{from_document, to_document, Project, ProjectInput};
use crate::policy::{AccessRequest, Operation, PolicyEvaluator, Resource};
use crate::store::{Document, DocumentStore, Key, ScanFilter};

/// Projects are only ever visible to their owner.
pub struct ProjectService<'a> {
    store: &'a dyn DocumentStore,
    table: &'a str,
    policy: &'a PolicyEvaluator,
}

impl<'a> ProjectService<'a> {
    pub fn new(store: &'a dyn DocumentStore, table: &'a str, policy: &'a PolicyEvaluator) -> Self {
        Self {
            store,
            table,
            policy,
        }
    }

    fn owner<'c>(
        &self,
        ctx: &'c AuthorizationContext,
        operation: Operation,
    ) -> Result<&'c str, ApiError> {
        authorize(self.policy, ctx, AccessRequest::new(Resource::Project, operation))?;
        console_subject(ctx)
    }

    pub async fn list(&self, ctx: &AuthorizationContext) -> Result<Vec<Project>, ApiError> {
        let owner = self.owner(ctx, Operation::List)?;

        let docs = self
            .store
            .scan(self.table, &ScanFilter::field_equals("OwnerUserID", owner))
            .await?;

        let mut projects = Vec::with_capacity(docs.len());
        for doc in docs {
            projects.push(from_document::<Project>(self.table, doc)?);
        }
        projects.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(projects)
    }

    pub async fn get(&self, ctx: &AuthorizationContext, id: &str) -> Result<Project, ApiError> {
        let owner = self.owner(ctx, Operation::Read)?;
        self.fetch(id, owner)
            .await?
            .ok_or_else(|| ApiError::not_found("Project not found"))
    }

    pub async fn create(
        &self,
        ctx: &AuthorizationContext,
        input: ProjectInput,
    ) -> Result<Project, ApiError> {
        let owner = self.owner(ctx, Operation::Create)?;
        let name = validate_name(&input.name)?;

        let project = Project {
            id: Uuid::new_v4().to_string(),
            owner_user_id: owner.to_string(),
            name,
            description: input.description,
        };

        let inserted = self
            .store
            .insert(
                self.table,
                &Key::new(&project.id, &project.owner_user_id),
                to_document(&project)?,
            )
            .await?;
        if !inserted {
            return Err(ApiError::conflict("Project already exists"));
        }

        tracing::info!("Created project {} for {}", project.id, owner);
        Ok(project)
    }

    pub async fn update(
        &self,
        ctx: &AuthorizationContext,
        id: &str,
        input: ProjectInput,
    ) -> Result<Project, ApiError> {
        let owner = self.owner(ctx, Operation::Update)?;
        let name = validate_name(&input.name)?;

        let mut changes = Document::new();
        changes.insert("Name".to_string(), Value::String(name));
        changes.insert("Description".to_string(), json!(input.description));

        let updated = self
            .store
            .update(self.table, &Key::new(id, owner), changes)
            .await?
            .ok_or_else(|| ApiError::not_found("Project not found"))?;

        from_document(self.table, updated).map_err(ApiError::from)
    }

    pub async fn delete(&self, ctx: &AuthorizationContext, id: &str) -> Result<(), ApiError> {
        let owner = self.owner(ctx, Operation::Delete)?;

        if !self.store.delete(self.table, &Key::new(id, owner)).await? {
            return Err(ApiError::not_found("Project not found"));
        }
        tracing::info!("Deleted project {} for {}", id, owner);
        Ok(())
    }

    async fn fetch(&self, id: &str, owner: &str) -> Result<Option<Project>, ApiError> {
        match self.store.get(self.table, &Key::new(id, owner)).await? {
            Some(doc) => Ok(Some(from_document(self.table, doc)?)),
            None => Ok(None),
        }
    }
}

fn validate_name(name: &str) -> Result<String, ApiError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ApiError::validation("Project name is required"));
    }
    Ok(name.to_string())
}
