//! In-memory object store.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;

use crate::storage::{ObjectMetadata, ObjectStore, StorageError};
use crate::traffic::LogKey;

/// An object and its metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub body: Bytes,
    pub metadata: ObjectMetadata,
}

/// A concurrent map of key -> object. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryObjectStore {
    inner: Arc<DashMap<String, StoredObject>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<StoredObject> {
        self.inner.get(key).map(|r| r.value().clone())
    }

    /// All keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<_> = self.inner.iter().map(|r| r.key().clone()).collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(
        &self,
        key: &LogKey,
        body: Bytes,
        metadata: ObjectMetadata,
    ) -> Result<(), StorageError> {
        self.inner
            .insert(key.to_string(), StoredObject { body, metadata });
        Ok(())
    }
}
