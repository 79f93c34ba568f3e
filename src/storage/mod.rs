//! Durable object storage for traffic logs.
//!
//! # Data Flow
//! ```text
//! TrafficPersister
//!     → ObjectStore::put(key, body, metadata)
//!         → fs.rs (files + metadata sidecar)
//!         → memory.rs (DashMap, tests and ephemeral runs)
//! ```
//!
//! # Design Decisions
//! - Stores are append-only sinks; every write targets a unique key
//! - Handles are `Arc<dyn ObjectStore>` shared by all requests, no locking
//! - Timeouts are whatever the backend imposes

pub mod fs;
pub mod memory;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::config::{StorageBackend, StorageConfig};
use crate::traffic::LogKey;

pub use fs::FsObjectStore;
pub use memory::{MemoryObjectStore, StoredObject};

/// Metadata stored alongside an object.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMetadata {
    pub content_type: String,
    pub custom: BTreeMap<String, String>,
}

impl ObjectMetadata {
    pub fn json() -> Self {
        Self {
            content_type: "application/json".to_string(),
            custom: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom.insert(key.into(), value.into());
        self
    }
}

/// Error type for object storage writes.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("invalid object key '{0}'")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("metadata encoding failed: {0}")]
    Metadata(#[from] serde_json::Error),

    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
}

/// A key/value blob store with metadata support.
#[async_trait]
pub trait ObjectStore: Send + Sync + std::fmt::Debug {
    async fn put(
        &self,
        key: &LogKey,
        body: Bytes,
        metadata: ObjectMetadata,
    ) -> Result<(), StorageError>;
}

/// Open the configured backend. `None` means no storage is bound.
pub fn open_store(config: &StorageConfig) -> Option<Arc<dyn ObjectStore>> {
    match config.backend {
        StorageBackend::Fs => Some(Arc::new(FsObjectStore::new(&config.root_dir))),
        StorageBackend::Memory => Some(Arc::new(MemoryObjectStore::new())),
        StorageBackend::None => None,
    }
}
