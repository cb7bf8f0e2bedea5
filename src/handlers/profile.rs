use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};

use super::body;
use crate::auth::AuthorizationContext;
use crate::middleware::{ApiResponse, ApiResult};
use crate::models::{Profile, ProfileInput};
use crate::state::AppState;

/// GET /profile - upserts a default profile on first access
pub async fn get(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthorizationContext>,
) -> ApiResult<Profile> {
    let profile = state.profiles().get(&ctx).await?;
    Ok(ApiResponse::success(profile))
}

/// PUT /profile
pub async fn put(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthorizationContext>,
    payload: Result<Json<ProfileInput>, JsonRejection>,
) -> ApiResult<Profile> {
    let input = body(payload)?;
    let profile = state.profiles().put(&ctx, input).await?;
    Ok(ApiResponse::success(profile))
}
