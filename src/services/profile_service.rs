use super::{authorize, console_subject};
use crate::auth::AuthorizationContext;
use crate::error::ApiError;
use crate::models::{from_document, to_document, Profile, ProfileInput};
use crate::policy::{AccessRequest, Operation, PolicyEvaluator, Resource};
use crate::store::{DocumentStore, Key};

pub struct ProfileService<'a> {
    store: &'a dyn DocumentStore,
    table: &'a str,
    policy: &'a PolicyEvaluator,
}

impl<'a> ProfileService<'a> {
    pub fn new(store: &'a dyn DocumentStore, table: &'a str, policy: &'a PolicyEvaluator) -> Self {
        Self {
            store,
            table,
            policy,
        }
    }

    /// The caller's profile, created with defaults on first access.
    pub async fn get(&self, ctx: &AuthorizationContext) -> Result<Profile, ApiError> {
        authorize(self.policy, ctx, AccessRequest::new(Resource::Profile, Operation::Read))?;
        let user_id = console_subject(ctx)?;
        let key = Key::partition_only(user_id);

        if let Some(doc) = self.store.get(self.table, &key).await? {
            return from_document(self.table, doc).map_err(ApiError::from);
        }

        let initial = Profile::initial(user_id, ctx.email());
        if !self.store.insert(self.table, &key, to_document(&initial)?).await? {
            // Lost a race with a concurrent first access; theirs wins
            let doc = self
                .store
                .get(self.table, &key)
                .await?
                .ok_or_else(|| ApiError::internal("Profile vanished during creation"))?;
            return from_document(self.table, doc).map_err(ApiError::from);
        }

        tracing::info!("Created profile for {}", user_id);
        Ok(initial)
    }

    /// Replace the caller's profile. `UserID` always comes from the token.
    pub async fn put(
        &self,
        ctx: &AuthorizationContext,
        input: ProfileInput,
    ) -> Result<Profile, ApiError> {
        authorize(self.policy, ctx, AccessRequest::new(Resource::Profile, Operation::Update))?;
        let user_id = console_subject(ctx)?;

        let profile = Profile {
            user_id: user_id.to_string(),
            name: input.name,
            email: input.email.or_else(|| ctx.email().map(str::to_string)),
            preferences: input
                .preferences
                .unwrap_or_else(|| serde_json::Value::Object(Default::default())),
        };

        self.store
            .put(self.table, &Key::partition_only(user_id), to_document(&profile)?)
            .await?;
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Claims;
    use crate::store::MemoryStore;
    use axum::http::StatusCode;
    use serde_json::json;
    use std::collections::BTreeSet;

    const TABLE: &str = "profiles";

    fn console(sub: &str) -> AuthorizationContext {
        let claims = json!({"sub": sub, "email": "o@x.com"});
        AuthorizationContext::identity_provider(
            Claims(claims.as_object().cloned().unwrap()),
            BTreeSet::new(),
        )
    }

    #[tokio::test]
    async fn first_get_creates_default_profile() {
        let store = MemoryStore::new();
        let policy = PolicyEvaluator::new();
        let svc = ProfileService::new(&store, TABLE, &policy);

        let profile = svc.get(&console("owner-1")).await.unwrap();
        assert_eq!(profile.user_id, "owner-1");
        assert_eq!(profile.email.as_deref(), Some("o@x.com"));
        assert_eq!(store.len(TABLE).await, 1);

        // Second access reads the same record
        assert_eq!(svc.get(&console("owner-1")).await.unwrap(), profile);
    }

    #[tokio::test]
    async fn put_replaces_profile() {
        let store = MemoryStore::new();
        let policy = PolicyEvaluator::new();
        let svc = ProfileService::new(&store, TABLE, &policy);

        let input = ProfileInput {
            name: Some("Olive".to_string()),
            email: None,
            preferences: Some(json!({"theme": "dark"})),
        };
        svc.put(&console("owner-1"), input).await.unwrap();

        let profile = svc.get(&console("owner-1")).await.unwrap();
        assert_eq!(profile.name.as_deref(), Some("Olive"));
        assert_eq!(profile.preferences, json!({"theme": "dark"}));
    }

    #[tokio::test]
    async fn anonymous_profile_is_unauthenticated() {
        let store = MemoryStore::new();
        let policy = PolicyEvaluator::new();
        let svc = ProfileService::new(&store, TABLE, &policy);

        let err = svc.get(&AuthorizationContext::anonymous()).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    }
}
