use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::{json, Value};

use crate::state::AppState;

pub async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "CrudConnect API",
            "version": version,
            "description": "Multi-tenant CRUD backend with custom and identity-provider tokens",
            "endpoints": {
                "health": "/health (public)",
                "login": "/login/:project_id (public - token acquisition)",
                "category": "/category/:project_id (public items, more with a token)",
                "item": "/item/:project_category[/:item_id] (reads public, writes need a token)",
                "user": "/user[/:project_id[/:email]] (project admins, or the user themself)",
                "project": "/project[/:id] (identity-provider token)",
                "profile": "/profile (identity-provider token)",
            },
            "auth": {
                "custom": "Authorization: Bearer <token>",
                "identity_provider": "Authorization: <scheme> <token>",
            }
        }
    }))
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.store.health_check().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "store": "ok"
                }
            })),
        ),
        Err(e) => {
            tracing::error!("Store health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": {
                        "code": "STORE_UNAVAILABLE",
                        "message": "document store unavailable"
                    },
                    "data": {
                        "status": "degraded",
                        "timestamp": now
                    }
                })),
            )
        }
    }
}
