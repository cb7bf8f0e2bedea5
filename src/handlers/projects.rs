// handlers/projects.rs - /project routes (console, identity-provider tokens only)

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};

use super::body;
use crate::auth::AuthorizationContext;
use crate::middleware::{ApiResponse, ApiResult};
use crate::models::{Project, ProjectInput};
use crate::state::AppState;

pub async fn list(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthorizationContext>,
) -> ApiResult<Vec<Project>> {
    let projects = state.projects().list(&ctx).await?;
    Ok(ApiResponse::success(projects))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthorizationContext>,
    payload: Result<Json<ProjectInput>, JsonRejection>,
) -> ApiResult<Project> {
    let input = body(payload)?;
    let project = state.projects().create(&ctx, input).await?;
    Ok(ApiResponse::created(project))
}

pub async fn get(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthorizationContext>,
    Path(id): Path<String>,
) -> ApiResult<Project> {
    let project = state.projects().get(&ctx, &id).await?;
    Ok(ApiResponse::success(project))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthorizationContext>,
    Path(id): Path<String>,
    payload: Result<Json<ProjectInput>, JsonRejection>,
) -> ApiResult<Project> {
    let input = body(payload)?;
    let project = state.projects().update(&ctx, &id, input).await?;
    Ok(ApiResponse::success(project))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthorizationContext>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    state.projects().delete(&ctx, &id).await?;
    Ok(ApiResponse::no_content())
}
