// handlers/items.rs - /item/:project_category[/:item_id]

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};

use super::body;
use crate::auth::AuthorizationContext;
use crate::middleware::{ApiResponse, ApiResult};
use crate::models::{Item, ItemInput};
use crate::state::AppState;

/// GET /item/:project_category - visible items of one category
pub async fn list(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthorizationContext>,
    Path(project_category): Path<String>,
) -> ApiResult<Vec<Item>> {
    let items = state.items().list(&ctx, &project_category).await?;
    Ok(ApiResponse::success(items))
}

/// POST /item/:project_category
pub async fn create(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthorizationContext>,
    Path(project_category): Path<String>,
    payload: Result<Json<ItemInput>, JsonRejection>,
) -> ApiResult<Item> {
    let input = body(payload)?;
    let item = state.items().create(&ctx, &project_category, input).await?;
    Ok(ApiResponse::created(item))
}

/// GET /item/:project_category/:item_id
pub async fn get(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthorizationContext>,
    Path((project_category, item_id)): Path<(String, String)>,
) -> ApiResult<Item> {
    let item = state.items().get(&ctx, &project_category, &item_id).await?;
    Ok(ApiResponse::success(item))
}

/// PUT /item/:project_category/:item_id
pub async fn update(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthorizationContext>,
    Path((project_category, item_id)): Path<(String, String)>,
    payload: Result<Json<ItemInput>, JsonRejection>,
) -> ApiResult<Item> {
    let input = body(payload)?;
    let item = state
        .items()
        .update(&ctx, &project_category, &item_id, input)
        .await?;
    Ok(ApiResponse::success(item))
}

/// DELETE /item/:project_category/:item_id
pub async fn delete(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthorizationContext>,
    Path((project_category, item_id)): Path<(String, String)>,
) -> ApiResult<()> {
    state.items().delete(&ctx, &project_category, &item_id).await?;
    Ok(ApiResponse::no_content())
}
