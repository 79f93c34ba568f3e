//! Filesystem object store.
//!
//! Objects live at `<root>/<key>`; metadata at `<root>/<key>.meta.json`.
//! The key's `/` separators become directories, so the time partition of
//! log keys doubles as the on-disk layout.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;

use crate::storage::{ObjectMetadata, ObjectStore, StorageError};
use crate::traffic::LogKey;

const METADATA_SUFFIX: &str = ".meta.json";

#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a key below the root, rejecting anything that could escape it.
    pub fn object_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(key);
        let safe = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(relative))
    }

    pub fn metadata_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        let mut path = self.object_path(key)?.into_os_string();
        path.push(METADATA_SUFFIX);
        Ok(PathBuf::from(path))
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn put(
        &self,
        key: &LogKey,
        body: Bytes,
        metadata: ObjectMetadata,
    ) -> Result<(), StorageError> {
        let object_path = self.object_path(key.as_str())?;
        let metadata_path = self.metadata_path(key.as_str())?;

        if let Some(parent) = object_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let metadata = serde_json::to_vec_pretty(&metadata)?;
        fs::write(&object_path, &body).await?;
        fs::write(&metadata_path, metadata).await?;
        Ok(())
    }
}
