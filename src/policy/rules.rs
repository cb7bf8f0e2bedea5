// policy/rules.rs - Access rule table
//
// One row per (resource, operation). Anything not listed is denied.

use super::{DowngradeRule, Operation, Requirement, Resource, Rule};

pub const RULES: &[Rule] = &[
    // Items: reads are open, visibility is filtered per record afterwards
    Rule::new(Resource::Item, Operation::List, Requirement::Anyone),
    Rule::new(Resource::Item, Operation::Read, Requirement::Anyone),
    Rule::new(Resource::Item, Operation::Create, Requirement::ProjectMember),
    Rule::new(Resource::Item, Operation::Update, Requirement::ProjectMember),
    Rule::new(Resource::Item, Operation::Delete, Requirement::ProjectMember),
    // Project users
    Rule::new(Resource::ProjectUser, Operation::List, Requirement::ProjectAdmin),
    Rule::new(Resource::ProjectUser, Operation::Read, Requirement::ProjectAdminOrSelf),
    Rule::new(Resource::ProjectUser, Operation::Create, Requirement::Anyone)
        .with_downgrade(DowngradeRule::GuestUnlessAdmin),
    Rule::new(Resource::ProjectUser, Operation::Update, Requirement::ProjectAdminOrSelf)
        .with_downgrade(DowngradeRule::KeepRoleUnlessAdmin),
    Rule::new(Resource::ProjectUser, Operation::Delete, Requirement::ProjectAdminOrSelf),
    // Console resources, owned by an identity-provider subject
    Rule::new(Resource::Project, Operation::List, Requirement::Console),
    Rule::new(Resource::Project, Operation::Read, Requirement::Console),
    Rule::new(Resource::Project, Operation::Create, Requirement::Console),
    Rule::new(Resource::Project, Operation::Update, Requirement::Console),
    Rule::new(Resource::Project, Operation::Delete, Requirement::Console),
    Rule::new(Resource::Profile, Operation::Read, Requirement::Console),
    Rule::new(Resource::Profile, Operation::Update, Requirement::Console),
];
