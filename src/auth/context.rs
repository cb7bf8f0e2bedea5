// auth/context.rs - Per-request authorization context
//
// Built fresh for every request from the verified credential and dropped
// with it. Nothing here is cached.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;

use super::claims::Claims;
use crate::store::{DocumentStore, ScanFilter, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Scheme {
    None,
    CustomToken,
    IdentityProvider,
}

/// A credential that was presented but did not verify.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CredentialRejection {
    pub scheme: Scheme,
    pub reason: String,
}

/// Normalized identity and entitlements of the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthorizationContext {
    scheme: Scheme,
    claims: Claims,
    authorized_project_ids: BTreeSet<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rejection: Option<CredentialRejection>,
}

impl AuthorizationContext {
    pub fn anonymous() -> Self {
        Self {
            scheme: Scheme::None,
            claims: Claims::default(),
            authorized_project_ids: BTreeSet::new(),
            rejection: None,
        }
    }

    /// Anonymous context that remembers why the presented credential failed.
    pub fn rejected(rejection: CredentialRejection) -> Self {
        Self {
            rejection: Some(rejection),
            ..Self::anonymous()
        }
    }

    /// Custom tokens are single-tenant: the one `ProjectID` claim.
    pub fn custom_token(claims: Claims) -> Self {
        let authorized_project_ids = claims.project_id().map(str::to_string).into_iter().collect();
        Self {
            scheme: Scheme::CustomToken,
            claims,
            authorized_project_ids,
            rejection: None,
        }
    }

    pub fn identity_provider(claims: Claims, authorized_project_ids: BTreeSet<String>) -> Self {
        Self {
            scheme: Scheme::IdentityProvider,
            claims,
            authorized_project_ids,
            rejection: None,
        }
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn claims(&self) -> &Claims {
        &self.claims
    }

    pub fn authorized_project_ids(&self) -> &BTreeSet<String> {
        &self.authorized_project_ids
    }

    pub fn rejection(&self) -> Option<&CredentialRejection> {
        self.rejection.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.scheme != Scheme::None
    }

    pub fn is_authorized_for(&self, project_id: &str) -> bool {
        self.is_authenticated() && self.authorized_project_ids.contains(project_id)
    }

    pub fn subject(&self) -> Option<&str> {
        self.claims.subject()
    }

    pub fn email(&self) -> Option<&str> {
        self.claims.email()
    }

    pub fn is_admin(&self) -> bool {
        self.is_authenticated() && self.claims.is_admin()
    }

    /// Name recorded on records this caller writes.
    pub fn actor(&self) -> Option<&str> {
        self.claims.actor()
    }
}

/// Reverse lookup from an identity-provider subject to the projects it may act within.
#[async_trait]
pub trait ProjectMembership: Send + Sync {
    async fn projects_for_subject(&self, subject: &str) -> Result<BTreeSet<String>, StoreError>;
}

/// Membership by ownership, answered with a full scan of the project table.
///
/// There is no index on `OwnerUserID`; this is only reasonable while the
/// project table stays small.
pub struct ScanProjectMembership {
    store: Arc<dyn DocumentStore>,
    table: String,
}

impl ScanProjectMembership {
    pub fn new(store: Arc<dyn DocumentStore>, table: impl Into<String>) -> Self {
        Self {
            store,
            table: table.into(),
        }
    }
}

#[async_trait]
impl ProjectMembership for ScanProjectMembership {
    async fn projects_for_subject(&self, subject: &str) -> Result<BTreeSet<String>, StoreError> {
        let projects = self
            .store
            .scan(&self.table, &ScanFilter::field_equals("OwnerUserID", subject))
            .await?;

        Ok(projects
            .iter()
            .filter_map(|p| p.get("ID").and_then(|v| v.as_str()))
            .map(str::to_string)
            .collect())
    }
}

/// Output of token verification, as seen by the context builder.
#[derive(Debug)]
pub enum VerifiedCredential {
    Anonymous,
    Rejected(CredentialRejection),
    CustomToken(Claims),
    IdentityProvider(Claims),
}

/// Turns a verified credential into an `AuthorizationContext`.
pub struct ContextBuilder {
    membership: Arc<dyn ProjectMembership>,
}

impl ContextBuilder {
    pub fn new(membership: Arc<dyn ProjectMembership>) -> Self {
        Self { membership }
    }

    pub async fn build(&self, verified: VerifiedCredential) -> AuthorizationContext {
        match verified {
            VerifiedCredential::Anonymous => AuthorizationContext::anonymous(),
            VerifiedCredential::Rejected(rejection) => AuthorizationContext::rejected(rejection),
            VerifiedCredential::CustomToken(claims) => AuthorizationContext::custom_token(claims),
            VerifiedCredential::IdentityProvider(claims) => {
                let projects = match claims.subject() {
                    Some(subject) => self.lookup(subject).await,
                    None => {
                        tracing::warn!("Identity-provider token has no subject; no projects authorized");
                        BTreeSet::new()
                    }
                };
                AuthorizationContext::identity_provider(claims, projects)
            }
        }
    }

    /// Lookup failures leave the caller with no projects rather than failing the request.
    async fn lookup(&self, subject: &str) -> BTreeSet<String> {
        match self.membership.projects_for_subject(subject).await {
            Ok(projects) => projects,
            Err(e) => {
                tracing::warn!("Project membership lookup failed for '{}': {}", subject, e);
                BTreeSet::new()
            }
        }
    }
}
