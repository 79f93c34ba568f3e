//! Writes traffic records to object storage.
//!
//! [`TrafficPersister::persist`] is the error boundary of the logging path:
//! every failure below it becomes a diagnostic and `()`.

use std::sync::Arc;

use bytes::Bytes;
use chrono::SecondsFormat;

use crate::observability::metrics;
use crate::storage::{ObjectMetadata, ObjectStore, StorageError};
use crate::traffic::ident::IdentifierGenerator;
use crate::traffic::key::{LogKey, LogKeyBuilder};
use crate::traffic::record::NetworkLogRecord;

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("no storage backend bound")]
    NoStore,

    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug, Clone)]
pub struct TrafficPersister {
    store: Option<Arc<dyn ObjectStore>>,
    ids: IdentifierGenerator,
    keys: LogKeyBuilder,
}

impl TrafficPersister {
    pub fn new(
        store: Option<Arc<dyn ObjectStore>>,
        ids: IdentifierGenerator,
        keys: LogKeyBuilder,
    ) -> Self {
        Self { store, ids, keys }
    }

    /// Whether a storage backend is bound.
    pub fn is_bound(&self) -> bool {
        self.store.is_some()
    }

    /// Write `record`, logging instead of returning any failure.
    pub async fn persist(&self, record: &NetworkLogRecord) {
        match self.try_persist(record).await {
            Ok(key) => {
                metrics::record_traffic_log("written");
                tracing::debug!(key = %key, "Network log saved");
            }
            Err(PersistError::NoStore) => {
                metrics::record_traffic_log("skipped");
                tracing::warn!(path = %record.path(), "Storage not available for logging");
            }
            Err(e) => {
                metrics::record_traffic_log("failed");
                tracing::error!(path = %record.path(), error = %e, "Failed to log network traffic");
            }
        }
    }

    /// Serialize and store `record`, returning the key it was written under.
    pub async fn try_persist(&self, record: &NetworkLogRecord) -> Result<LogKey, PersistError> {
        let store = self.store.as_ref().ok_or(PersistError::NoStore)?;

        let log_id = self.ids.new_id();
        let key = self
            .keys
            .build(record.captured_at(), &log_id, record.high_fidelity_timestamp());
        let body = serde_json::to_vec_pretty(record)?;

        let created_at = self
            .ids
            .clock()
            .now()
            .to_rfc3339_opts(SecondsFormat::Millis, true);
        let metadata = ObjectMetadata::json()
            .with("log-id", log_id)
            .with("timestamp", record.high_fidelity_timestamp())
            .with("created-at", created_at)
            .with("path", record.path())
            .with("status", record.response_status().to_string());

        store.put(&key, Bytes::from(body), metadata).await?;
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CaptureConfig;
    use crate::storage::MemoryObjectStore;
    use crate::traffic::clock::FixedClock;
    use crate::traffic::ident::ThreadRandom;
    use crate::traffic::record::{RequestSnapshot, TrafficRecordBuilder};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{HeaderMap, Method, Response, StatusCode};
    use chrono::{DateTime, TimeZone, Utc};
    use url::Url;

    #[derive(Debug)]
    struct FailingStore;

    #[async_trait]
    impl ObjectStore for FailingStore {
        async fn put(
            &self,
            _key: &LogKey,
            _body: Bytes,
            _metadata: ObjectMetadata,
        ) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("bucket offline".into()))
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 11, 5, 9, 15, 0).unwrap()
    }

    fn ids() -> IdentifierGenerator {
        IdentifierGenerator::new(Arc::new(FixedClock::new(now(), 314)), Arc::new(ThreadRandom))
    }

    async fn sample_record() -> NetworkLogRecord {
        let builder = TrafficRecordBuilder::new(CaptureConfig::default(), ids());
        let request = RequestSnapshot {
            method: Method::GET,
            url: Url::parse("https://amp-blockchain.com/d/doc42").unwrap(),
            headers: HeaderMap::new(),
            body: None,
            edge: None,
        };
        let response = Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Body::empty())
            .unwrap();
        builder.build(&request, response, now(), Some("doc42".into())).await
    }

    #[tokio::test]
    async fn test_persist_writes_record_with_metadata() {
        let store = MemoryObjectStore::new();
        let persister = TrafficPersister::new(
            Some(Arc::new(store.clone())),
            ids(),
            LogKeyBuilder::default(),
        );
        let record = sample_record().await;

        let key = persister.try_persist(&record).await.unwrap();
        let hifi = format!("{}314", now().timestamp_millis());
        assert!(key.as_str().starts_with(&format!("network/2024/11/05/09/{}-", hifi)));
        assert!(key.as_str().ends_with(".json"));

        let object = store.get(key.as_str()).unwrap();
        let text = std::str::from_utf8(&object.body).unwrap();
        assert!(text.contains("\n  \"documentId\": \"doc42\""), "not pretty-printed: {}", text);

        let parsed: NetworkLogRecord = serde_json::from_slice(&object.body).unwrap();
        assert_eq!(parsed.path(), "/d/doc42");
        assert_eq!(parsed.response_status(), 404);

        let custom = &object.metadata.custom;
        assert_eq!(object.metadata.content_type, "application/json");
        assert_eq!(custom["timestamp"], hifi);
        assert_eq!(custom["path"], "/d/doc42");
        assert_eq!(custom["status"], "404");
        assert_eq!(custom["created-at"], "2024-11-05T09:15:00.000Z");
        let log_id = &custom["log-id"];
        assert_eq!(log_id.len(), 7);
        assert!(key.as_str().ends_with(&format!("-{}.json", log_id)));
    }

    #[tokio::test]
    async fn test_missing_store_is_skipped() {
        let persister = TrafficPersister::new(None, ids(), LogKeyBuilder::default());
        let record = sample_record().await;

        assert!(!persister.is_bound());
        assert!(matches!(
            persister.try_persist(&record).await,
            Err(PersistError::NoStore)
        ));
        // Boundary swallows it.
        persister.persist(&record).await;
    }

    #[tokio::test]
    async fn test_storage_failure_is_swallowed() {
        let persister =
            TrafficPersister::new(Some(Arc::new(FailingStore)), ids(), LogKeyBuilder::default());
        let record = sample_record().await;

        let err = persister.try_persist(&record).await.unwrap_err();
        assert!(matches!(err, PersistError::Storage(StorageError::Unavailable(_))));
        persister.persist(&record).await;
    }
}
