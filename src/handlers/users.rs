// handlers/users.rs - /user routes (project end users)

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Extension, Json,
};

use super::body;
use crate::auth::AuthorizationContext;
use crate::middleware::{ApiResponse, ApiResult};
use crate::models::{NewProjectUser, ProjectUserUpdate, ProjectUserView};
use crate::services::CreateUserOutcome;
use crate::state::AppState;

/// GET /user/:project_id - project admins only
pub async fn list(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthorizationContext>,
    Path(project_id): Path<String>,
) -> ApiResult<Vec<ProjectUserView>> {
    let users = state.users().list(&ctx, &project_id).await?;
    Ok(ApiResponse::success(users))
}

/// POST /user - 201 on creation, 200 when the user already existed
pub async fn create(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthorizationContext>,
    payload: Result<Json<NewProjectUser>, JsonRejection>,
) -> ApiResult<CreateUserOutcome> {
    let input = body(payload)?;
    let outcome = state.users().create(&ctx, input).await?;

    let status = if outcome.is_created() {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok(ApiResponse::with_status(outcome, status))
}

/// GET /user/:project_id/:email
pub async fn get(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthorizationContext>,
    Path((project_id, email)): Path<(String, String)>,
) -> ApiResult<ProjectUserView> {
    let user = state.users().get(&ctx, &project_id, &email).await?;
    Ok(ApiResponse::success(user))
}

/// PUT /user/:project_id/:email
pub async fn update(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthorizationContext>,
    Path((project_id, email)): Path<(String, String)>,
    payload: Result<Json<ProjectUserUpdate>, JsonRejection>,
) -> ApiResult<ProjectUserView> {
    let input = body(payload)?;
    let user = state.users().update(&ctx, &project_id, &email, input).await?;
    Ok(ApiResponse::success(user))
}

/// DELETE /user/:project_id/:email
pub async fn delete(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthorizationContext>,
    Path((project_id, email)): Path<(String, String)>,
) -> ApiResult<()> {
    state.users().delete(&ctx, &project_id, &email).await?;
    Ok(ApiResponse::no_content())
}
