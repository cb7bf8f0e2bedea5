use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::state::AppState;

/// Resolve the caller's AuthorizationContext and inject it into the request.
///
/// Never rejects: a missing or unverifiable credential yields an anonymous
/// context, and the policy evaluator decides what that caller may do.
pub async fn resolve_context_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Response {
    let authorization = extract_authorization(&headers);
    let ctx = state.resolver.resolve(authorization).await;

    request.extensions_mut().insert(ctx);
    next.run(request).await
}

/// Raw Authorization header value, if present and valid UTF-8.
fn extract_authorization(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?;
    match value.to_str() {
        Ok(s) => Some(s),
        Err(_) => {
            tracing::debug!("Ignoring non-UTF-8 Authorization header");
            None
        }
    }
}
