use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};

use super::body;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::login_service::{LoginRequest, LoginResponse};
use crate::state::AppState;

/// POST /login/:project_id - exchange email and password for a custom token
pub async fn login(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<LoginResponse> {
    let request = body(payload)?;
    let response = state.login().login(&project_id, request).await?;
    Ok(ApiResponse::success(response))
}
