use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{CollectorError, Result};
use crate::model::CostRecord;
use crate::storage::{ObjectStore, SummaryStore};

/// An object captured by the in-memory store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub content_type: String,
}

/// A minimal in-memory object store for testing
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: RwLock<HashMap<String, StoredObject>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Retrieve an object by key
    pub fn get(&self, key: &str) -> Result<Option<StoredObject>> {
        let objects = self
            .objects
            .read()
            .map_err(|_| CollectorError::Storage("Lock poisoned".to_string()))?;
        Ok(objects.get(key).cloned())
    }

    /// Get all stored keys
    pub fn keys(&self) -> Result<Vec<String>> {
        let objects = self
            .objects
            .read()
            .map_err(|_| CollectorError::Storage("Lock poisoned".to_string()))?;
        Ok(objects.keys().cloned().collect())
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put_object(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<()> {
        let mut objects = self
            .objects
            .write()
            .map_err(|_| CollectorError::Storage("Lock poisoned".to_string()))?;
        objects.insert(
            key.to_string(),
            StoredObject {
                body,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }
}

/// A minimal in-memory summary store for testing
#[derive(Default)]
pub struct MemorySummaryStore {
    records: RwLock<Vec<CostRecord>>,
}

impl MemorySummaryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All records written so far, in write order
    pub fn records(&self) -> Result<Vec<CostRecord>> {
        let records = self
            .records
            .read()
            .map_err(|_| CollectorError::Storage("Lock poisoned".to_string()))?;
        Ok(records.clone())
    }
}

#[async_trait]
impl SummaryStore for MemorySummaryStore {
    async fn put_summary(&self, record: &CostRecord) -> Result<()> {
        let mut records = self
            .records
            .write()
            .map_err(|_| CollectorError::Storage("Lock poisoned".to_string()))?;
        records.push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_overwrites_by_key() {
        let store = MemoryObjectStore::new();
        store
            .put_object("a/b", b"one".to_vec(), "application/json")
            .await
            .unwrap();
        store
            .put_object("a/b", b"two".to_vec(), "application/json")
            .await
            .unwrap();

        let object = store.get("a/b").unwrap().unwrap();
        assert_eq!(object.body, b"two");
        assert_eq!(store.keys().unwrap().len(), 1);
    }
}
