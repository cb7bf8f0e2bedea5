use serde::{Deserialize, Serialize};

use crate::auth::GUEST_ROLE;

/// Stand-in returned wherever a password would appear.
pub const REDACTED_PASSWORD: &str = "*****";

fn guest() -> String {
    GUEST_ROLE.to_string()
}

/// An end user of a project's application, as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProjectUser {
    #[serde(rename = "ProjectID")]
    pub project_id: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    #[serde(default = "guest")]
    pub role: String,
}

impl ProjectUser {
    pub fn redacted(&self) -> ProjectUserView {
        ProjectUserView {
            project_id: self.project_id.clone(),
            email: self.email.clone(),
            name: self.name.clone(),
            role: self.role.clone(),
            password: REDACTED_PASSWORD,
        }
    }
}

/// What callers see of a ProjectUser. Has no field that could hold a hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProjectUserView {
    #[serde(rename = "ProjectID")]
    pub project_id: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub role: String,
    pub password: &'static str,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NewProjectUser {
    #[serde(rename = "ProjectID")]
    pub project_id: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

/// Update body. `Email` and `ProjectID` are ignored; the path decides them.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProjectUserUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}
