// models/mod.rs - Persisted record shapes
//
// Records are stored as PascalCase JSON documents. These types are the typed
// view over them; `to_document`/`from_document` cross the store boundary.

pub mod item;
pub mod profile;
pub mod project;
pub mod project_user;

pub use item::{Item, ItemInput, ItemKey, ItemKeyError, Scope};
pub use profile::{Profile, ProfileInput};
pub use project::{Project, ProjectInput};
pub use project_user::{NewProjectUser, ProjectUser, ProjectUserUpdate, ProjectUserView, REDACTED_PASSWORD};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::store::{Document, StoreError};

pub fn to_document<T: Serialize>(record: &T) -> Result<Document, StoreError> {
    match serde_json::to_value(record) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(StoreError::Corrupt {
            table: String::new(),
            message: format!("record serialized to non-object JSON: {}", other),
        }),
        Err(e) => Err(StoreError::Corrupt {
            table: String::new(),
            message: e.to_string(),
        }),
    }
}

pub fn from_document<T: DeserializeOwned>(table: &str, doc: Document) -> Result<T, StoreError> {
    serde_json::from_value(Value::Object(doc)).map_err(|e| StoreError::Corrupt {
        table: table.to_string(),
        message: e.to_string(),
    })
}
