use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{Document, DocumentStore, Key, ScanFilter, SortCondition, StoreError};

type Table = BTreeMap<Key, Document>;

/// In-process document store used for development and tests.
///
/// Tables are created on first write. A single lock guards all tables, which
/// makes every operation atomic per key (and then some).
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<HashMap<String, Table>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in a table (0 for unknown tables).
    pub async fn len(&self, table: &str) -> usize {
        self.tables.read().await.get(table).map_or(0, BTreeMap::len)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, table: &str, key: &Key) -> Result<Option<Document>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.get(table).and_then(|t| t.get(key)).cloned())
    }

    async fn query(
        &self,
        table: &str,
        partition: &str,
        sort: &SortCondition,
    ) -> Result<Vec<Document>, StoreError> {
        let tables = self.tables.read().await;
        let Some(t) = tables.get(table) else {
            return Ok(Vec::new());
        };

        Ok(t.iter()
            .filter(|(k, _)| k.partition == partition && sort.matches(&k.sort))
            .map(|(_, doc)| doc.clone())
            .collect())
    }

    async fn scan(&self, table: &str, filter: &ScanFilter) -> Result<Vec<Document>, StoreError> {
        let tables = self.tables.read().await;
        let Some(t) = tables.get(table) else {
            return Ok(Vec::new());
        };

        Ok(t.iter()
            .filter(|(k, doc)| filter.matches(k, doc))
            .map(|(_, doc)| doc.clone())
            .collect())
    }

    async fn put(&self, table: &str, key: &Key, doc: Document) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        tables
            .entry(table.to_string())
            .or_default()
            .insert(key.clone(), doc);
        Ok(())
    }

    async fn insert(&self, table: &str, key: &Key, doc: Document) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        let t = tables.entry(table.to_string()).or_default();
        if t.contains_key(key) {
            return Ok(false);
        }
        t.insert(key.clone(), doc);
        Ok(true)
    }

    async fn update(
        &self,
        table: &str,
        key: &Key,
        changes: Document,
    ) -> Result<Option<Document>, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(existing) = tables.get_mut(table).and_then(|t| t.get_mut(key)) else {
            return Ok(None);
        };

        for (field, value) in changes {
            existing.insert(field, value);
        }
        Ok(Some(existing.clone()))
    }

    async fn delete(&self, table: &str, key: &Key) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .get_mut(table)
            .map_or(false, |t| t.remove(key).is_some()))
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: serde_json::Value) -> Document {
        value.as_object().cloned().unwrap_or_default()
    }

    #[tokio::test]
    async fn insert_does_not_overwrite() {
        let store = MemoryStore::new();
        let key = Key::new("p1", "a@x.com");

        assert!(store.insert("users", &key, doc(json!({"Role": "Admin"}))).await.unwrap());
        assert!(!store.insert("users", &key, doc(json!({"Role": "Guest"}))).await.unwrap());

        let stored = store.get("users", &key).await.unwrap().unwrap();
        assert_eq!(stored["Role"], "Admin");
    }

    #[tokio::test]
    async fn update_merges_and_reports_missing() {
        let store = MemoryStore::new();
        let key = Key::new("p1_books", "i1");
        store
            .put("items", &key, doc(json!({"Scope": "Public", "Data": 1})))
            .await
            .unwrap();

        let updated = store
            .update("items", &key, doc(json!({"Data": 2})))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated["Scope"], "Public");
        assert_eq!(updated["Data"], 2);

        let missing = store
            .update("items", &Key::new("p1_books", "nope"), doc(json!({"Data": 3})))
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn query_is_partition_scoped() {
        let store = MemoryStore::new();
        store.put("items", &Key::new("p1_books", "a"), doc(json!({"n": 1}))).await.unwrap();
        store.put("items", &Key::new("p1_books", "b"), doc(json!({"n": 2}))).await.unwrap();
        store.put("items", &Key::new("p1_films", "c"), doc(json!({"n": 3}))).await.unwrap();

        let books = store.query("items", "p1_books", &SortCondition::Any).await.unwrap();
        assert_eq!(books.len(), 2);

        let scanned = store
            .scan("items", &ScanFilter::PartitionBeginsWith("p1_".into()))
            .await
            .unwrap();
        assert_eq!(scanned.len(), 3);
    }

    #[tokio::test]
    async fn delete_reports_presence() {
        let store = MemoryStore::new();
        let key = Key::partition_only("sub-1");
        store.put("profiles", &key, doc(json!({}))).await.unwrap();

        assert!(store.delete("profiles", &key).await.unwrap());
        assert!(!store.delete("profiles", &key).await.unwrap());
        assert_eq!(store.len("profiles").await, 0);
    }
}
