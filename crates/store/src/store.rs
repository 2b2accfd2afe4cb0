use async_trait::async_trait;
use railwatch_core::records::{Collection, ReportStatus, StatusChange};
use railwatch_core::types::RecordKey;
use serde_json::Value;

use crate::error::StoreError;
use crate::snapshot::{AppendedRecord, Snapshot};
use crate::subscription::Subscription;

/// Receives the full collection snapshot, once on subscribe and again after
/// every change.
pub type SnapshotCallback = Box<dyn Fn(Snapshot) + Send + Sync>;

/// Receives each record appended after the subscription was made.
pub type AppendCallback = Box<dyn Fn(AppendedRecord) + Send + Sync>;

/// Keyed record store with change subscriptions.
///
/// Delivery is at-least-once: a subscriber may see the same full snapshot
/// again, e.g. after the backend reconnects. Writes are serialized by the
/// backend.
#[async_trait]
pub trait AlertStore: Send + Sync {
    /// Insert a new record under a store-assigned key.
    ///
    /// `record` must be a JSON object.
    async fn append(&self, collection: Collection, record: Value) -> Result<RecordKey, StoreError>;

    /// Move a report to `status`.
    ///
    /// Re-applying the current status is a successful no-op; `resolved ->
    /// pending` is rejected with [`StoreError::InvalidTransition`].
    async fn update_status(
        &self,
        key: &str,
        status: ReportStatus,
    ) -> Result<StatusChange, StoreError>;

    /// Current contents of a collection.
    async fn snapshot(&self, collection: Collection) -> Result<Snapshot, StoreError>;

    /// Subscribe to full snapshots of a collection.
    async fn subscribe(
        &self,
        collection: Collection,
        callback: SnapshotCallback,
    ) -> Result<Subscription, StoreError>;

    /// Subscribe to individually appended records.
    async fn subscribe_appended(
        &self,
        collection: Collection,
        callback: AppendCallback,
    ) -> Result<Subscription, StoreError>;
}

/// Reject anything but a JSON object before it reaches a backend.
pub(crate) fn ensure_object(record: &Value) -> Result<(), StoreError> {
    if record.is_object() {
        Ok(())
    } else {
        Err(StoreError::Validation(
            "records must be JSON objects".to_string(),
        ))
    }
}

/// Apply `status` to a stored report's fields.
///
/// Returns the updated fields when the status actually changes.
pub(crate) fn apply_status(
    key: &str,
    fields: &Value,
    status: ReportStatus,
) -> Result<(StatusChange, Option<Value>), StoreError> {
    let current = railwatch_core::records::Report::from_record(fields).status;
    let change = current
        .transition(status)
        .map_err(|e| StoreError::InvalidTransition(format!("report {key}: {e}")))?;

    match change {
        StatusChange::Unchanged => Ok((change, None)),
        StatusChange::Changed => {
            let mut updated = fields.clone();
            if let Some(map) = updated.as_object_mut() {
                map.insert("status".into(), Value::String(status.as_str().into()));
            }
            Ok((change, Some(updated)))
        }
    }
}
