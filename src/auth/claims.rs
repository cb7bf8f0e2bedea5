use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const ADMIN_ROLE: &str = "Admin";
pub const GUEST_ROLE: &str = "Guest";

/// Longest lifetime a minted custom token can have (ten years).
pub const MAX_CUSTOM_TOKEN_TTL_HOURS: u64 = 24 * 365 * 10;

/// Verified token claims, kept as the raw claim map.
///
/// The two token schemes (and older custom tokens) spell the same facts
/// differently; the accessors below normalize that.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Claims(pub Map<String, Value>);

impl Claims {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    fn first_str(&self, names: &[&str]) -> Option<&str> {
        names
            .iter()
            .find_map(|name| self.0.get(*name).and_then(Value::as_str))
            .filter(|s| !s.is_empty())
    }

    /// Subject identifier (`sub`, or `ID` on legacy custom tokens).
    pub fn subject(&self) -> Option<&str> {
        self.first_str(&["sub", "ID"])
    }

    pub fn email(&self) -> Option<&str> {
        self.first_str(&["email", "Email"])
    }

    /// Single tenant claim carried by custom tokens.
    pub fn project_id(&self) -> Option<&str> {
        self.first_str(&["ProjectID"])
    }

    /// Role claim: `Role` (custom tokens), `custom:role` or `role`.
    pub fn role(&self) -> Option<&str> {
        self.first_str(&["Role", "custom:role", "role"])
    }

    pub fn groups(&self) -> Vec<&str> {
        self.0
            .get("cognito:groups")
            .and_then(Value::as_array)
            .map(|groups| groups.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    pub fn is_admin(&self) -> bool {
        self.role() == Some(ADMIN_ROLE) || self.groups().contains(&ADMIN_ROLE)
    }

    /// Identity recorded as `CreatedBy`/`UpdatedBy`: email, falling back to subject.
    pub fn actor(&self) -> Option<&str> {
        self.email().or_else(|| self.subject())
    }
}

/// Claims of a custom token minted by this service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomClaims {
    pub sub: String,
    #[serde(rename = "Email")]
    pub email: String,
    #[serde(rename = "ProjectID")]
    pub project_id: String,
    #[serde(rename = "Role")]
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

impl CustomClaims {
    /// `ttl_hours` is clamped to [`MAX_CUSTOM_TOKEN_TTL_HOURS`].
    pub fn new(project_id: &str, email: &str, role: &str, ttl_hours: u64) -> Self {
        let now = Utc::now();
        let ttl = Duration::hours(ttl_hours.min(MAX_CUSTOM_TOKEN_TTL_HOURS) as i64);
        let exp = (now + ttl).timestamp();

        Self {
            sub: email.to_string(),
            email: email.to_string(),
            project_id: project_id.to_string(),
            role: role.to_string(),
            iat: now.timestamp(),
            exp,
        }
    }
}
