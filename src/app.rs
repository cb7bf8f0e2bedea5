use axum::{
    http::HeaderValue,
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::SecurityConfig;
use crate::handlers;
use crate::middleware::resolve_context_middleware;
use crate::state::AppState;

pub fn app(state: AppState, security: &SecurityConfig) -> Router {
    Router::new()
        // Public
        .route("/", get(handlers::system::root))
        .route("/health", get(handlers::system::health))
        .route("/login/:project_id", post(handlers::login::login))
        // Context-aware API; the policy evaluator decides per operation
        .merge(api_routes(state.clone()))
        // Global middleware
        .layer(cors_layer(security))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .merge(item_routes())
        .merge(user_routes())
        .merge(project_routes())
        .merge(profile_routes())
        .route_layer(from_fn_with_state(state, resolve_context_middleware))
}

fn item_routes() -> Router<AppState> {
    use handlers::{categories, items};

    Router::new()
        .route("/category/:project_id", get(categories::list))
        .route(
            "/item/:project_category",
            get(items::list).post(items::create),
        )
        .route(
            "/item/:project_category/:item_id",
            get(items::get).put(items::update).delete(items::delete),
        )
}

fn user_routes() -> Router<AppState> {
    use handlers::users;

    Router::new()
        .route("/user", post(users::create))
        .route("/user/:project_id", get(users::list))
        .route(
            "/user/:project_id/:email",
            get(users::get).put(users::update).delete(users::delete),
        )
}

fn project_routes() -> Router<AppState> {
    use handlers::projects;

    Router::new()
        .route("/project", get(projects::list).post(projects::create))
        .route(
            "/project/:id",
            get(projects::get)
                .put(projects::update)
                .delete(projects::delete),
        )
}

fn profile_routes() -> Router<AppState> {
    use handlers::profile;

    Router::new().route("/profile", get(profile::get).put(profile::put))
}

/// Permissive unless specific origins are configured.
fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    if security.cors_origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwks::StaticKeySetSource;
    use crate::auth::secret::StaticSecretStore;
    use crate::config::AppConfig;
    use crate::store::MemoryStore;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use jsonwebtoken::jwk::JwkSet;
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn router() -> Router {
        let config = AppConfig::development();
        let state = AppState::with_collaborators(
            &config,
            Arc::new(MemoryStore::new()),
            Arc::new(StaticSecretStore::new().with_signing_secret("jwtSigningKey", "s")),
            Arc::new(StaticKeySetSource::new(JwkSet { keys: Vec::new() })),
        );
        app(state, &config.security)
    }

    async fn call(uri: &str) -> (StatusCode, Value) {
        let response = router()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn root_describes_service() {
        let (status, body) = call("/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["name"], "CrudConnect API");
    }

    #[tokio::test]
    async fn anonymous_console_route_is_401_envelope() {
        let (status, body) = call("/profile").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "UNAUTHENTICATED");
    }

    #[tokio::test]
    async fn anonymous_item_list_is_empty_not_denied() {
        let (status, body) = call("/item/p1_posts").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], serde_json::json!([]));
    }
}
