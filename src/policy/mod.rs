// policy/mod.rs - Access policy evaluation
//
// Every authorization decision in the service goes through PolicyEvaluator.
// Handlers describe what they want to do as an AccessRequest; the evaluator
// looks the (resource, operation) pair up in the rule table and checks the
// requirement against the caller's AuthorizationContext.

mod rules;

pub use rules::RULES;

use crate::auth::{AuthorizationContext, Scheme, GUEST_ROLE};
use crate::models::Scope;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Item,
    ProjectUser,
    Project,
    Profile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    List,
    Read,
    Create,
    Update,
    Delete,
}

/// What a caller must hold for an operation to be allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Anyone,
    /// Identity-provider caller with a subject.
    Console,
    ProjectMember,
    ProjectAdmin,
    ProjectAdminOrSelf,
}

/// Field rewrites applied to an allowed write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DowngradeRule {
    None,
    GuestUnlessAdmin,
    KeepRoleUnlessAdmin,
}

#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub resource: Resource,
    pub operation: Operation,
    pub requirement: Requirement,
    pub downgrade: DowngradeRule,
}

impl Rule {
    pub const fn new(resource: Resource, operation: Operation, requirement: Requirement) -> Self {
        Self {
            resource,
            operation,
            requirement,
            downgrade: DowngradeRule::None,
        }
    }

    pub const fn with_downgrade(mut self, downgrade: DowngradeRule) -> Self {
        self.downgrade = downgrade;
        self
    }
}

/// The record an operation touches, when it already exists or is named by the request.
#[derive(Debug, Clone, Copy, Default)]
pub struct Target<'a> {
    /// Project the stored record belongs to (derived from its key).
    pub project_id: Option<&'a str>,
    /// Email of the ProjectUser being addressed.
    pub email: Option<&'a str>,
}

#[derive(Debug, Clone, Copy)]
pub struct AccessRequest<'a> {
    pub resource: Resource,
    pub operation: Operation,
    pub project_id: Option<&'a str>,
    pub target: Target<'a>,
}

impl<'a> AccessRequest<'a> {
    pub fn new(resource: Resource, operation: Operation) -> Self {
        Self {
            resource,
            operation,
            project_id: None,
            target: Target::default(),
        }
    }

    pub fn in_project(mut self, project_id: &'a str) -> Self {
        self.project_id = Some(project_id);
        self
    }

    pub fn target_project(mut self, project_id: &'a str) -> Self {
        self.target.project_id = Some(project_id);
        self
    }

    pub fn target_email(mut self, email: &'a str) -> Self {
        self.target.email = Some(email);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Denial {
    /// No verified credential. Carries the rejection reason when one was presented.
    Unauthenticated(Option<String>),
    Forbidden(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Downgrade {
    /// Overwrite the submitted role.
    ForceRole(&'static str),
    /// Keep whatever role the stored record already has.
    PreserveStoredRole,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(Denial),
    AllowWithDowngrade(Vec<Downgrade>),
}

impl Decision {
    /// Collapse into the downgrades to apply, or the denial.
    pub fn into_result(self) -> Result<Vec<Downgrade>, Denial> {
        match self {
            Decision::Allow => Ok(Vec::new()),
            Decision::AllowWithDowngrade(downgrades) => Ok(downgrades),
            Decision::Deny(denial) => Err(denial),
        }
    }
}

pub struct PolicyEvaluator {
    rules: &'static [Rule],
}

impl Default for PolicyEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl PolicyEvaluator {
    pub fn new() -> Self {
        Self::with_rules(RULES)
    }

    pub fn with_rules(rules: &'static [Rule]) -> Self {
        Self { rules }
    }

    fn rule(&self, resource: Resource, operation: Operation) -> Option<&Rule> {
        self.rules
            .iter()
            .find(|r| r.resource == resource && r.operation == operation)
    }

    pub fn evaluate(&self, ctx: &AuthorizationContext, request: &AccessRequest<'_>) -> Decision {
        let Some(rule) = self.rule(request.resource, request.operation) else {
            tracing::warn!(
                "No access rule for {:?} {:?}; denying",
                request.resource,
                request.operation
            );
            return Decision::Deny(deny(ctx, "operation not permitted"));
        };

        if let Err(denial) = self.check(ctx, rule.requirement, request) {
            tracing::debug!(
                "Denied {:?} {:?} on project {:?}: {:?}",
                request.resource,
                request.operation,
                request.project_id,
                denial
            );
            return Decision::Deny(denial);
        }

        let admin = is_project_admin(ctx, request);
        match rule.downgrade {
            DowngradeRule::GuestUnlessAdmin if !admin => {
                Decision::AllowWithDowngrade(vec![Downgrade::ForceRole(GUEST_ROLE)])
            }
            DowngradeRule::KeepRoleUnlessAdmin if !admin => {
                Decision::AllowWithDowngrade(vec![Downgrade::PreserveStoredRole])
            }
            _ => Decision::Allow,
        }
    }

    fn check(
        &self,
        ctx: &AuthorizationContext,
        requirement: Requirement,
        request: &AccessRequest<'_>,
    ) -> Result<(), Denial> {
        match requirement {
            Requirement::Anyone => Ok(()),
            Requirement::Console => {
                if ctx.scheme() == Scheme::IdentityProvider && ctx.subject().is_some() {
                    Ok(())
                } else if ctx.is_authenticated() {
                    Err(Denial::Forbidden(
                        "an identity-provider token is required".to_string(),
                    ))
                } else {
                    Err(deny(ctx, "an identity-provider token is required"))
                }
            }
            Requirement::ProjectMember => check_member(ctx, request),
            Requirement::ProjectAdmin => {
                check_member(ctx, request)?;
                if ctx.is_admin() {
                    Ok(())
                } else {
                    Err(Denial::Forbidden("project admin role required".to_string()))
                }
            }
            Requirement::ProjectAdminOrSelf => {
                check_member(ctx, request)?;
                if ctx.is_admin() || is_self(ctx, request.target.email) {
                    Ok(())
                } else {
                    Err(Denial::Forbidden(
                        "only a project admin or the user themself may do this".to_string(),
                    ))
                }
            }
        }
    }

    /// Whether a fetched item may be returned to this caller.
    pub fn item_visible(&self, ctx: &AuthorizationContext, project_id: &str, scope: Scope) -> bool {
        scope == Scope::Public || ctx.is_authorized_for(project_id)
    }
}

fn check_member(ctx: &AuthorizationContext, request: &AccessRequest<'_>) -> Result<(), Denial> {
    if !ctx.is_authenticated() {
        return Err(deny(ctx, "authentication required"));
    }
    let Some(project_id) = request.project_id else {
        return Err(Denial::Forbidden("no project named in request".to_string()));
    };
    if !ctx.is_authorized_for(project_id) {
        return Err(Denial::Forbidden(format!(
            "not authorized for project '{}'",
            project_id
        )));
    }
    if let Some(stored) = request.target.project_id {
        if !ctx.is_authorized_for(stored) {
            return Err(Denial::Forbidden(format!(
                "not authorized for project '{}'",
                stored
            )));
        }
    }
    Ok(())
}

fn is_self(ctx: &AuthorizationContext, target_email: Option<&str>) -> bool {
    match (ctx.email(), target_email) {
        (Some(caller), Some(target)) => caller.eq_ignore_ascii_case(target),
        _ => false,
    }
}

fn is_project_admin(ctx: &AuthorizationContext, request: &AccessRequest<'_>) -> bool {
    ctx.is_admin()
        && request
            .project_id
            .map(|p| ctx.is_authorized_for(p))
            .unwrap_or(false)
}

/// 401 for callers without a verified credential, 403 otherwise.
fn deny(ctx: &AuthorizationContext, message: &str) -> Denial {
    if ctx.is_authenticated() {
        Denial::Forbidden(message.to_string())
    } else {
        Denial::Unauthenticated(ctx.rejection().map(|r| r.reason.clone()))
    }
}
