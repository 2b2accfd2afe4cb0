//! In-process store backend.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use railwatch_core::records::{Collection, ReportStatus, StatusChange};
use railwatch_core::types::RecordKey;
use serde_json::Value;

use crate::error::StoreError;
use crate::keys::KeyGenerator;
use crate::snapshot::{AppendedRecord, Snapshot};
use crate::store::{apply_status, ensure_object, AlertStore, AppendCallback, SnapshotCallback};
use crate::subscription::{CollectionFeed, Subscription};

struct CollectionState {
    records: BTreeMap<RecordKey, Value>,
    feed: CollectionFeed,
}

impl CollectionState {
    fn new(collection: Collection) -> Self {
        Self {
            records: BTreeMap::new(),
            feed: CollectionFeed::new(collection),
        }
    }
}

struct Collections {
    alerts: CollectionState,
    reports: CollectionState,
}

impl Collections {
    fn get_mut(&mut self, collection: Collection) -> &mut CollectionState {
        match collection {
            Collection::Alerts => &mut self.alerts,
            Collection::Reports => &mut self.reports,
        }
    }
}

/// Store kept entirely in memory. Writes are serialized by one lock, so
/// subscribers observe changes in write order.
pub struct MemoryStore {
    collections: Mutex<Collections>,
    keys: KeyGenerator,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            collections: Mutex::new(Collections {
                alerts: CollectionState::new(Collection::Alerts),
                reports: CollectionState::new(Collection::Reports),
            }),
            keys: KeyGenerator::new(),
        }
    }

    fn with_collection<T>(
        &self,
        collection: Collection,
        f: impl FnOnce(&mut CollectionState) -> T,
    ) -> T {
        let mut guard = self.collections.lock().unwrap_or_else(|e| e.into_inner());
        f(guard.get_mut(collection))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AlertStore for MemoryStore {
    async fn append(&self, collection: Collection, record: Value) -> Result<RecordKey, StoreError> {
        ensure_object(&record)?;

        let key = self.with_collection(collection, |state| {
            let key = self.keys.next_key();
            state.records.insert(key.clone(), record.clone());
            state
                .feed
                .publish_snapshot(Snapshot::new(collection, state.records.clone()));
            state.feed.publish_appended(AppendedRecord {
                collection,
                key: key.clone(),
                fields: record,
            });
            key
        });

        tracing::debug!(%collection, key = %key, "Record appended");
        Ok(key)
    }

    async fn update_status(
        &self,
        key: &str,
        status: ReportStatus,
    ) -> Result<StatusChange, StoreError> {
        let change = self.with_collection(Collection::Reports, |state| {
            let fields = state
                .records
                .get(key)
                .ok_or_else(|| StoreError::RecordNotFound(key.to_string()))?;
            let (change, updated) = apply_status(key, fields, status)?;
            if let Some(updated) = updated {
                state.records.insert(key.to_string(), updated);
                state
                    .feed
                    .publish_snapshot(Snapshot::new(Collection::Reports, state.records.clone()));
            }
            Ok::<_, StoreError>(change)
        })?;

        tracing::debug!(key, %status, ?change, "Report status updated");
        Ok(change)
    }

    async fn snapshot(&self, collection: Collection) -> Result<Snapshot, StoreError> {
        Ok(self.with_collection(collection, |state| state.feed.current()))
    }

    async fn subscribe(
        &self,
        collection: Collection,
        callback: SnapshotCallback,
    ) -> Result<Subscription, StoreError> {
        Ok(self.with_collection(collection, |state| state.feed.subscribe(callback)))
    }

    async fn subscribe_appended(
        &self,
        collection: Collection,
        callback: AppendCallback,
    ) -> Result<Subscription, StoreError> {
        Ok(self.with_collection(collection, |state| {
            state.feed.subscribe_appended(callback)
        }))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use assert_matches::assert_matches;
    use serde_json::json;
    use tokio::sync::mpsc;

    use super::*;

    const WAIT: Duration = Duration::from_secs(2);

    #[tokio::test]
    async fn append_assigns_increasing_keys() {
        let store = MemoryStore::new();
        let a = store
            .append(Collection::Alerts, json!({"type": "Fall Detected"}))
            .await
            .unwrap();
        let b = store
            .append(Collection::Alerts, json!({"type": "Fall Detected"}))
            .await
            .unwrap();
        assert!(a < b);

        let snapshot = store.snapshot(Collection::Alerts).await.unwrap();
        assert_eq!(snapshot.len(), 2);
        assert!(store.snapshot(Collection::Reports).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn append_rejects_non_objects() {
        let store = MemoryStore::new();
        assert_matches!(
            store.append(Collection::Alerts, json!("nope")).await,
            Err(StoreError::Validation(_))
        );
    }

    #[tokio::test]
    async fn update_status_rules() {
        let store = MemoryStore::new();
        let key = store
            .append(Collection::Reports, json!({"cabin": "A4", "status": "pending"}))
            .await
            .unwrap();

        assert_matches!(
            store.update_status("missing", ReportStatus::Resolved).await,
            Err(StoreError::RecordNotFound(k)) if k == "missing"
        );
        assert_eq!(
            store.update_status(&key, ReportStatus::Resolved).await.unwrap(),
            StatusChange::Changed
        );
        assert_eq!(
            store.update_status(&key, ReportStatus::Resolved).await.unwrap(),
            StatusChange::Unchanged
        );
        assert_matches!(
            store.update_status(&key, ReportStatus::Pending).await,
            Err(StoreError::InvalidTransition(_))
        );

        let snapshot = store.snapshot(Collection::Reports).await.unwrap();
        assert_eq!(snapshot.get(&key).unwrap()["status"], "resolved");
        assert_eq!(snapshot.get(&key).unwrap()["cabin"], "A4");
    }

    #[tokio::test]
    async fn alert_keys_are_not_reports() {
        let store = MemoryStore::new();
        let key = store
            .append(Collection::Alerts, json!({"type": "Fall Detected"}))
            .await
            .unwrap();
        assert_matches!(
            store.update_status(&key, ReportStatus::Resolved).await,
            Err(StoreError::RecordNotFound(_))
        );
    }

    #[tokio::test]
    async fn snapshot_subscriber_converges_on_writes() {
        let store = MemoryStore::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _sub = store
            .subscribe(
                Collection::Reports,
                Box::new(move |s| {
                    let _ = tx.send(s);
                }),
            )
            .await
            .unwrap();

        let initial = tokio::time::timeout(WAIT, rx.recv()).await.unwrap().unwrap();
        assert!(initial.is_empty());

        let key = store
            .append(Collection::Reports, json!({"cabin": "A4"}))
            .await
            .unwrap();

        let latest = loop {
            let s = tokio::time::timeout(WAIT, rx.recv()).await.unwrap().unwrap();
            if s.get(&key).is_some() {
                break s;
            }
        };
        assert_eq!(latest.len(), 1);
    }

    #[tokio::test]
    async fn append_subscriber_sees_each_record_in_order() {
        let store = MemoryStore::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _sub = store
            .subscribe_appended(
                Collection::Alerts,
                Box::new(move |r| {
                    let _ = tx.send(r);
                }),
            )
            .await
            .unwrap();

        let mut keys = Vec::new();
        for i in 0..3 {
            keys.push(
                store
                    .append(Collection::Alerts, json!({"type": "Fall Detected", "n": i}))
                    .await
                    .unwrap(),
            );
        }
        // Reports never reach an alerts subscriber.
        store
            .append(Collection::Reports, json!({"cabin": "A4"}))
            .await
            .unwrap();

        for expected in &keys {
            let got = tokio::time::timeout(WAIT, rx.recv()).await.unwrap().unwrap();
            assert_eq!(&got.key, expected);
            assert_eq!(got.collection, Collection::Alerts);
        }
        assert!(rx.try_recv().is_err());
    }
}
