// services/mod.rs - Resource operations
//
// Each service borrows what it needs from AppState for the length of one
// request. Every operation starts with a policy check.

pub mod item_service;
pub mod login_service;
pub mod profile_service;
pub mod project_service;
pub mod user_service;

pub use item_service::ItemService;
pub use login_service::LoginService;
pub use profile_service::ProfileService;
pub use project_service::ProjectService;
pub use user_service::{CreateUserOutcome, UserService};

use crate::auth::AuthorizationContext;
use crate::error::ApiError;
use crate::policy::{AccessRequest, Downgrade, PolicyEvaluator};
use crate::state::AppState;

pub(crate) fn authorize(
    policy: &PolicyEvaluator,
    ctx: &AuthorizationContext,
    request: AccessRequest<'_>,
) -> Result<Vec<Downgrade>, ApiError> {
    policy.evaluate(ctx, &request).into_result().map_err(ApiError::from)
}

/// Subject of an identity-provider caller. Only called after a Console check passed.
pub(crate) fn console_subject(ctx: &AuthorizationContext) -> Result<&str, ApiError> {
    ctx.subject()
        .ok_or_else(|| ApiError::unauthenticated("Token has no subject"))
}

impl AppState {
    pub fn items(&self) -> ItemService<'_> {
        ItemService::new(self.store.as_ref(), &self.tables.items, &self.policy)
    }

    pub fn users(&self) -> UserService<'_> {
        UserService::new(self.store.as_ref(), &self.tables.users, &self.policy)
    }

    pub fn projects(&self) -> ProjectService<'_> {
        ProjectService::new(self.store.as_ref(), &self.tables.projects, &self.policy)
    }

    pub fn profiles(&self) -> ProfileService<'_> {
        ProfileService::new(self.store.as_ref(), &self.tables.profiles, &self.policy)
    }

    pub fn login(&self) -> LoginService<'_> {
        LoginService::new(
            self.store.as_ref(),
            &self.tables.users,
            self.resolver.verifier(),
            self.custom_token_ttl_hours,
        )
    }
}
