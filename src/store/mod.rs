// store/mod.rs - Document store abstraction
//
// Every collection is a single table addressed by a (partition, sort) key
// pair. Documents are JSON objects; the store never interprets them beyond
// the filters below.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

pub use memory::MemoryStore;
pub use postgres::PgDocumentStore;

/// A stored record.
pub type Document = Map<String, Value>;

/// Errors from a document store backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Corrupt document in {table}: {message}")]
    Corrupt { table: String, message: String },

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Composite primary key of a document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Key {
    pub partition: String,
    pub sort: String,
}

impl Key {
    pub fn new(partition: impl Into<String>, sort: impl Into<String>) -> Self {
        Self {
            partition: partition.into(),
            sort: sort.into(),
        }
    }

    /// Key for tables without a sort key.
    pub fn partition_only(partition: impl Into<String>) -> Self {
        Self::new(partition, "")
    }
}

/// Sort-key condition for partition queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortCondition {
    Any,
    Equals(String),
    BeginsWith(String),
}

impl SortCondition {
    pub fn matches(&self, sort: &str) -> bool {
        match self {
            SortCondition::Any => true,
            SortCondition::Equals(value) => sort == value,
            SortCondition::BeginsWith(prefix) => sort.starts_with(prefix.as_str()),
        }
    }
}

/// Filter applied during a full-table scan.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanFilter {
    All,
    /// Top-level document field equals the given string.
    FieldEquals { field: String, value: String },
    /// Partition key begins with the prefix.
    PartitionBeginsWith(String),
}

impl ScanFilter {
    pub fn field_equals(field: impl Into<String>, value: impl Into<String>) -> Self {
        ScanFilter::FieldEquals {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn matches(&self, key: &Key, doc: &Document) -> bool {
        match self {
            ScanFilter::All => true,
            ScanFilter::FieldEquals { field, value } => {
                doc.get(field).and_then(Value::as_str) == Some(value.as_str())
            }
            ScanFilter::PartitionBeginsWith(prefix) => key.partition.starts_with(prefix.as_str()),
        }
    }
}

/// Get/query/scan/put/update/delete over named tables.
///
/// Implementations must provide per-key atomicity; nothing above this layer
/// serializes concurrent writes to the same key.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, table: &str, key: &Key) -> Result<Option<Document>, StoreError>;

    /// All documents in one partition whose sort key matches `sort`, ordered by sort key.
    async fn query(
        &self,
        table: &str,
        partition: &str,
        sort: &SortCondition,
    ) -> Result<Vec<Document>, StoreError>;

    async fn scan(&self, table: &str, filter: &ScanFilter) -> Result<Vec<Document>, StoreError>;

    /// Unconditional write (insert or replace).
    async fn put(&self, table: &str, key: &Key, doc: Document) -> Result<(), StoreError>;

    /// Conditional write. Returns `false` without touching the existing
    /// document when the key is already present.
    async fn insert(&self, table: &str, key: &Key, doc: Document) -> Result<bool, StoreError>;

    /// Shallow-merge `changes` into an existing document and return the new
    /// version, or `None` when the key does not exist.
    async fn update(
        &self,
        table: &str,
        key: &Key,
        changes: Document,
    ) -> Result<Option<Document>, StoreError>;

    /// Returns whether a document was removed.
    async fn delete(&self, table: &str, key: &Key) -> Result<bool, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}
