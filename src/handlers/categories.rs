use axum::{
    extract::{Path, State},
    Extension,
};

use crate::auth::AuthorizationContext;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

/// GET /category/:project_id - sorted categories with at least one visible item
pub async fn list(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthorizationContext>,
    Path(project_id): Path<String>,
) -> ApiResult<Vec<String>> {
    let categories = state.items().categories(&ctx, &project_id).await?;
    Ok(ApiResponse::success(categories))
}
