pub mod auth;
pub mod response;

pub use auth::resolve_context_middleware;
pub use response::{ApiResponse, ApiResult};
