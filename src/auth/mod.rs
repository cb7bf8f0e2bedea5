// auth/mod.rs - Authentication and authorization context resolution
//
// Pipeline run once per request:
//   credential (classify header) -> verifier (check token) -> context (entitlements)
// The resulting AuthorizationContext is what `policy` decides against.

pub mod claims;
pub mod context;
pub mod credential;
pub mod jwks;
pub mod password;
pub mod resolver;
pub mod secret;
pub mod verifier;

pub use claims::{Claims, CustomClaims, ADMIN_ROLE, GUEST_ROLE};
pub use context::{AuthorizationContext, CredentialRejection, ProjectMembership, ScanProjectMembership, Scheme};
pub use credential::{classify, Credential};
pub use resolver::AuthResolver;
pub use verifier::{IdentityProviderSettings, TokenVerifier, VerifyError};
