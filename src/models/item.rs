use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scope {
    Public,
    /// Unknown scope strings are treated as private.
    #[default]
    #[serde(other)]
    Private,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ItemKeyError {
    #[error("item key '{0}' must have the form ProjectID_Category")]
    MissingSeparator(String),

    #[error("item key '{0}' has an empty project id")]
    EmptyProject(String),

    #[error("item key '{0}' has an empty category")]
    EmptyCategory(String),
}

/// The `ProjectID_Category` partition key of an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemKey {
    pub project_id: String,
    pub category: String,
}

impl ItemKey {
    /// Split at the first `_`; categories may themselves contain underscores.
    pub fn parse(raw: &str) -> Result<Self, ItemKeyError> {
        let (project_id, category) = raw
            .split_once('_')
            .ok_or_else(|| ItemKeyError::MissingSeparator(raw.to_string()))?;

        if project_id.is_empty() {
            return Err(ItemKeyError::EmptyProject(raw.to_string()));
        }
        if category.is_empty() {
            return Err(ItemKeyError::EmptyCategory(raw.to_string()));
        }

        Ok(Self {
            project_id: project_id.to_string(),
            category: category.to_string(),
        })
    }

    /// Prefix shared by every item partition of a project.
    pub fn project_prefix(project_id: &str) -> String {
        format!("{}_", project_id)
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.project_id, self.category)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Item {
    #[serde(rename = "ProjectID_Category")]
    pub project_category: String,
    #[serde(rename = "ItemID")]
    pub item_id: String,
    #[serde(default)]
    pub scope: Scope,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub data: Value,
}

impl Item {
    /// Project the item belongs to, taken from its partition key.
    pub fn project_id(&self) -> Option<&str> {
        self.project_category
            .split_once('_')
            .map(|(project, _)| project)
            .filter(|p| !p.is_empty())
    }

    pub fn category(&self) -> Option<&str> {
        self.project_category
            .split_once('_')
            .map(|(_, category)| category)
            .filter(|c| !c.is_empty())
    }
}

/// Body of an item create or update. Absent fields keep their stored value on update.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ItemInput {
    #[serde(default)]
    pub scope: Option<Scope>,
    #[serde(default)]
    pub data: Option<Value>,
}
