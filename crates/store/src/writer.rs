//! Typed writers over [`AlertStore`].
//!
//! These are the only paths the rest of the system uses to write records,
//! so the record invariants are checked here before any append.

use railwatch_core::error::CoreError;
use railwatch_core::records::{Alert, Collection, NewReport, Report, ReportStatus, StatusChange};
use railwatch_core::types::RecordKey;

use crate::error::StoreError;
use crate::store::AlertStore;

/// Append a validated alert.
pub async fn append_alert(store: &dyn AlertStore, alert: &Alert) -> Result<RecordKey, StoreError> {
    alert.validate().map_err(validation)?;
    store.append(Collection::Alerts, alert.to_record()).await
}

/// Store a rider report, stamped now and `pending`.
pub async fn submit_report(
    store: &dyn AlertStore,
    input: NewReport,
) -> Result<(RecordKey, Report), StoreError> {
    input.check().map_err(validation)?;
    let report = input.into_report(chrono::Utc::now());
    let key = store.append(Collection::Reports, report.to_record()).await?;
    tracing::info!(key = %key, train = %report.train_number, cabin = %report.cabin, "Report submitted");
    Ok((key, report))
}

/// Mark a report resolved. Resolving twice is a no-op.
pub async fn resolve_report(store: &dyn AlertStore, key: &str) -> Result<StatusChange, StoreError> {
    store.update_status(key, ReportStatus::Resolved).await
}

fn validation(err: CoreError) -> StoreError {
    match err {
        CoreError::Validation(msg) => StoreError::Validation(msg),
        other => StoreError::Validation(other.to_string()),
    }
}
