// handlers/mod.rs - HTTP handlers
//
// Handlers are thin: pull the AuthorizationContext that the auth middleware
// stored in the request extensions, call the matching service, and wrap the
// result in the response envelope.

pub mod categories;
pub mod items;
pub mod login;
pub mod profile;
pub mod projects;
pub mod system;
pub mod users;

use axum::extract::rejection::JsonRejection;
use axum::Json;

use crate::error::ApiError;

/// Unwrap a JSON body, reporting malformed input in the error envelope.
pub(crate) fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ApiError::validation(rejection.body_text()))
}
