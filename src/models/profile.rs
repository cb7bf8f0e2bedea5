use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Console user profile, one per identity-provider subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Profile {
    #[serde(rename = "UserID")]
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub preferences: Value,
}

impl Profile {
    /// Profile created on first access, seeded from the token.
    pub fn initial(user_id: &str, email: Option<&str>) -> Self {
        Self {
            user_id: user_id.to_string(),
            name: None,
            email: email.map(str::to_string),
            preferences: Value::Object(Default::default()),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProfileInput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub preferences: Option<Value>,
}
