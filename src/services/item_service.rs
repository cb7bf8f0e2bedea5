use chrono::Utc;
use serde_json::{json, Value};
use std::collections::BTreeSet;
use uuid::Uuid;

use super::authorize;
use crate::auth::AuthorizationContext;
use crate::error::ApiError;
use crate::models::{from_document, to_document, Item, ItemInput, ItemKey};
use crate::policy::{AccessRequest, Operation, PolicyEvaluator, Resource};
use crate::store::{Document, DocumentStore, Key, ScanFilter, SortCondition};

pub struct ItemService<'a> {
    store: &'a dyn DocumentStore,
    table: &'a str,
    policy: &'a PolicyEvaluator,
}

impl<'a> ItemService<'a> {
    pub fn new(store: &'a dyn DocumentStore, table: &'a str, policy: &'a PolicyEvaluator) -> Self {
        Self {
            store,
            table,
            policy,
        }
    }

    /// Items of one category visible to the caller.
    pub async fn list(&self, ctx: &AuthorizationContext, raw_key: &str) -> Result<Vec<Item>, ApiError> {
        let key = ItemKey::parse(raw_key)?;
        authorize(
            self.policy,
            ctx,
            AccessRequest::new(Resource::Item, Operation::List).in_project(&key.project_id),
        )?;

        let docs = self
            .store
            .query(self.table, &key.to_string(), &SortCondition::Any)
            .await?;

        Ok(self.visible(ctx, docs))
    }

    pub async fn get(
        &self,
        ctx: &AuthorizationContext,
        raw_key: &str,
        item_id: &str,
    ) -> Result<Item, ApiError> {
        let key = ItemKey::parse(raw_key)?;
        authorize(
            self.policy,
            ctx,
            AccessRequest::new(Resource::Item, Operation::Read).in_project(&key.project_id),
        )?;

        // Invisible records are reported exactly like missing ones
        self.fetch(&key, item_id)
            .await?
            .filter(|item| self.is_visible(ctx, item))
            .ok_or_else(|| ApiError::not_found("Item not found"))
    }

    pub async fn create(
        &self,
        ctx: &AuthorizationContext,
        raw_key: &str,
        input: ItemInput,
    ) -> Result<Item, ApiError> {
        let key = ItemKey::parse(raw_key)?;
        authorize(
            self.policy,
            ctx,
            AccessRequest::new(Resource::Item, Operation::Create).in_project(&key.project_id),
        )?;

        let now = Utc::now();
        let item = Item {
            project_category: key.to_string(),
            item_id: Uuid::new_v4().to_string(),
            scope: input.scope.unwrap_or_default(),
            created_by: ctx.actor().map(str::to_string),
            created_at: Some(now),
            updated_by: None,
            updated_at: None,
            data: input.data.unwrap_or(Value::Null),
        };

        let inserted = self
            .store
            .insert(
                self.table,
                &Key::new(&item.project_category, &item.item_id),
                to_document(&item)?,
            )
            .await?;
        if !inserted {
            return Err(ApiError::conflict("Item already exists"));
        }

        tracing::info!("Created item {} in {}", item.item_id, item.project_category);
        Ok(item)
    }

    pub async fn update(
        &self,
        ctx: &AuthorizationContext,
        raw_key: &str,
        item_id: &str,
        input: ItemInput,
    ) -> Result<Item, ApiError> {
        let key = ItemKey::parse(raw_key)?;
        let existing = self.authorized_existing(ctx, &key, item_id, Operation::Update).await?;

        let mut changes = Document::new();
        if let Some(data) = input.data {
            changes.insert("Data".to_string(), data);
        }
        changes.insert(
            "Scope".to_string(),
            json!(input.scope.unwrap_or(existing.scope)),
        );
        changes.insert(
            "UpdatedBy".to_string(),
            ctx.actor().map(|a| Value::String(a.to_string())).unwrap_or(Value::Null),
        );
        changes.insert("UpdatedAt".to_string(), json!(Utc::now()));

        let updated = self
            .store
            .update(self.table, &Key::new(key.to_string(), item_id), changes)
            .await?
            .ok_or_else(|| ApiError::not_found("Item not found"))?;

        from_document(self.table, updated).map_err(ApiError::from)
    }

    pub async fn delete(
        &self,
        ctx: &AuthorizationContext,
        raw_key: &str,
        item_id: &str,
    ) -> Result<(), ApiError> {
        let key = ItemKey::parse(raw_key)?;
        self.authorized_existing(ctx, &key, item_id, Operation::Delete).await?;

        if !self.store.delete(self.table, &Key::new(key.to_string(), item_id)).await? {
            return Err(ApiError::not_found("Item not found"));
        }
        tracing::info!("Deleted item {} from {}", item_id, key);
        Ok(())
    }

    /// Distinct categories of a project that hold at least one visible item.
    pub async fn categories(
        &self,
        ctx: &AuthorizationContext,
        project_id: &str,
    ) -> Result<Vec<String>, ApiError> {
        if project_id.is_empty() || project_id.contains('_') {
            return Err(ApiError::validation("Invalid project id"));
        }
        authorize(
            self.policy,
            ctx,
            AccessRequest::new(Resource::Item, Operation::List).in_project(project_id),
        )?;

        let docs = self
            .store
            .scan(
                self.table,
                &ScanFilter::PartitionBeginsWith(ItemKey::project_prefix(project_id)),
            )
            .await?;

        let categories: BTreeSet<String> = self
            .visible(ctx, docs)
            .iter()
            .filter_map(|item| item.category().map(str::to_string))
            .collect();
        Ok(categories.into_iter().collect())
    }

    /// Write path: check the request, then the stored record's own project.
    async fn authorized_existing(
        &self,
        ctx: &AuthorizationContext,
        key: &ItemKey,
        item_id: &str,
        operation: Operation,
    ) -> Result<Item, ApiError> {
        authorize(
            self.policy,
            ctx,
            AccessRequest::new(Resource::Item, operation).in_project(&key.project_id),
        )?;

        let existing = self
            .fetch(key, item_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Item not found"))?;

        let stored_project = existing
            .project_id()
            .ok_or_else(|| ApiError::internal("Stored item has an invalid key"))?;
        authorize(
            self.policy,
            ctx,
            AccessRequest::new(Resource::Item, operation)
                .in_project(&key.project_id)
                .target_project(stored_project),
        )?;

        Ok(existing)
    }

    async fn fetch(&self, key: &ItemKey, item_id: &str) -> Result<Option<Item>, ApiError> {
        match self.store.get(self.table, &Key::new(key.to_string(), item_id)).await? {
            Some(doc) => Ok(Some(from_document(self.table, doc)?)),
            None => Ok(None),
        }
    }

    fn is_visible(&self, ctx: &AuthorizationContext, item: &Item) -> bool {
        match item.project_id() {
            Some(project_id) => self.policy.item_visible(ctx, project_id, item.scope),
            None => false,
        }
    }

    /// Decode and keep only what the caller may see. Undecodable records are skipped.
    fn visible(&self, ctx: &AuthorizationContext, docs: Vec<Document>) -> Vec<Item> {
        docs.into_iter()
            .filter_map(|doc| match from_document::<Item>(self.table, doc) {
                Ok(item) => Some(item),
                Err(e) => {
                    tracing::warn!("Skipping unreadable item: {}", e);
                    None
                }
            })
            .filter(|item| self.is_visible(ctx, item))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Claims, CredentialRejection, Scheme};
    use crate::models::Scope;
    use crate::store::MemoryStore;
    use axum::http::StatusCode;
    use std::collections::BTreeSet;

    const TABLE: &str = "items";

    fn member(project: &str) -> AuthorizationContext {
        let claims = json!({"sub": "a@x.com", "Email": "a@x.com", "ProjectID": project});
        AuthorizationContext::custom_token(Claims(claims.as_object().cloned().unwrap()))
    }

    fn owner(projects: &[&str]) -> AuthorizationContext {
        let claims = json!({"sub": "owner-1", "email": "o@x.com"});
        let set: BTreeSet<String> = projects.iter().map(|p| p.to_string()).collect();
        AuthorizationContext::identity_provider(Claims(claims.as_object().cloned().unwrap()), set)
    }

    fn input(scope: Option<Scope>, data: Value) -> ItemInput {
        ItemInput {
            scope,
            data: Some(data),
        }
    }

    async fn seeded(store: &MemoryStore, policy: &PolicyEvaluator) {
        let svc = ItemService::new(store, TABLE, policy);
        let ctx = member("p1");
        svc.create(&ctx, "p1_posts", input(Some(Scope::Public), json!({"n": 1})))
            .await
            .unwrap();
        svc.create(&ctx, "p1_posts", input(None, json!({"n": 2})))
            .await
            .unwrap();
        svc.create(&ctx, "p1_drafts", input(Some(Scope::Private), json!({"n": 3})))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn anonymous_list_hides_private_items() {
        let store = MemoryStore::new();
        let policy = PolicyEvaluator::new();
        seeded(&store, &policy).await;
        let svc = ItemService::new(&store, TABLE, &policy);

        let items = svc.list(&AuthorizationContext::anonymous(), "p1_posts").await.unwrap();
        assert_eq!(items.len(), 1);
        assert!(items.iter().all(|i| i.scope == Scope::Public));

        let items = svc.list(&member("p1"), "p1_posts").await.unwrap();
        assert_eq!(items.len(), 2);
    }

    #[tokio::test]
    async fn rejected_credential_still_reads_public_items() {
        let store = MemoryStore::new();
        let policy = PolicyEvaluator::new();
        seeded(&store, &policy).await;
        let svc = ItemService::new(&store, TABLE, &policy);

        let ctx = AuthorizationContext::rejected(CredentialRejection {
            scheme: Scheme::CustomToken,
            reason: "token has expired".to_string(),
        });
        assert_eq!(svc.list(&ctx, "p1_posts").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn create_defaults_to_private_and_records_actor() {
        let store = MemoryStore::new();
        let policy = PolicyEvaluator::new();
        let svc = ItemService::new(&store, TABLE, &policy);

        let item = svc
            .create(&member("p1"), "p1_posts", input(None, json!({"title": "x"})))
            .await
            .unwrap();
        assert_eq!(item.scope, Scope::Private);
        assert_eq!(item.created_by.as_deref(), Some("a@x.com"));
        assert!(item.created_at.is_some());
    }

    #[tokio::test]
    async fn write_outside_authorized_project_is_forbidden() {
        let store = MemoryStore::new();
        let policy = PolicyEvaluator::new();
        let svc = ItemService::new(&store, TABLE, &policy);

        let err = svc
            .create(&member("p1"), "p2_posts", input(None, json!({})))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);

        let err = svc
            .create(&AuthorizationContext::anonymous(), "p1_posts", input(None, json!({})))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(store.len(TABLE).await, 0);
    }

    #[tokio::test]
    async fn owner_without_projects_gets_403() {
        let store = MemoryStore::new();
        let policy = PolicyEvaluator::new();
        let svc = ItemService::new(&store, TABLE, &policy);

        let err = svc
            .create(&owner(&[]), "p1_posts", input(None, json!({})))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn update_keeps_scope_unless_given() {
        let store = MemoryStore::new();
        let policy = PolicyEvaluator::new();
        let svc = ItemService::new(&store, TABLE, &policy);
        let ctx = owner(&["p1"]);

        let item = svc
            .create(&ctx, "p1_posts", input(Some(Scope::Public), json!({"v": 1})))
            .await
            .unwrap();
        let updated = svc
            .update(&ctx, "p1_posts", &item.item_id, input(None, json!({"v": 2})))
            .await
            .unwrap();

        assert_eq!(updated.scope, Scope::Public);
        assert_eq!(updated.data, json!({"v": 2}));
        assert_eq!(updated.updated_by.as_deref(), Some("o@x.com"));
        assert_eq!(updated.created_at, item.created_at);
    }

    #[tokio::test]
    async fn scope_only_update_keeps_data() {
        let store = MemoryStore::new();
        let policy = PolicyEvaluator::new();
        let svc = ItemService::new(&store, TABLE, &policy);
        let ctx = member("p1");

        let item = svc
            .create(&ctx, "p1_posts", input(None, json!({"title": "keep me"})))
            .await
            .unwrap();
        let body: ItemInput = serde_json::from_value(json!({"Scope": "Public"})).unwrap();
        let updated = svc
            .update(&ctx, "p1_posts", &item.item_id, body)
            .await
            .unwrap();

        assert_eq!(updated.scope, Scope::Public);
        assert_eq!(updated.data, json!({"title": "keep me"}));
    }

    #[tokio::test]
    async fn missing_item_is_404() {
        let store = MemoryStore::new();
        let policy = PolicyEvaluator::new();
        let svc = ItemService::new(&store, TABLE, &policy);

        let err = svc.delete(&member("p1"), "p1_posts", "nope").await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn private_item_get_is_404_for_outsiders() {
        let store = MemoryStore::new();
        let policy = PolicyEvaluator::new();
        let svc = ItemService::new(&store, TABLE, &policy);

        let item = svc
            .create(&member("p1"), "p1_posts", input(None, json!({})))
            .await
            .unwrap();
        let err = svc
            .get(&member("p2"), "p1_posts", &item.item_id)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert!(svc.get(&member("p1"), "p1_posts", &item.item_id).await.is_ok());
    }

    #[tokio::test]
    async fn malformed_key_is_400() {
        let store = MemoryStore::new();
        let policy = PolicyEvaluator::new();
        let svc = ItemService::new(&store, TABLE, &policy);

        let err = svc.list(&member("p1"), "p1").await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn categories_respect_visibility() {
        let store = MemoryStore::new();
        let policy = PolicyEvaluator::new();
        seeded(&store, &policy).await;
        let svc = ItemService::new(&store, TABLE, &policy);

        let anon = svc.categories(&AuthorizationContext::anonymous(), "p1").await.unwrap();
        assert_eq!(anon, vec!["posts".to_string()]);

        let all = svc.categories(&member("p1"), "p1").await.unwrap();
        assert_eq!(all, vec!["drafts".to_string(), "posts".to_string()]);
    }
}
