//! Store record entity model and change notification payload.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use railwatch_core::types::Timestamp;

/// A row from the `store_records` table.
///
/// `fields` holds the record exactly as written by the client; the store
/// layer decodes it leniently.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct StoredRecord {
    pub collection: String,
    pub key: String,
    pub fields: serde_json::Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Payload of a `pg_notify` sent by the `store_records` trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordChange {
    pub collection: String,
    pub key: String,
    /// `INSERT` or `UPDATE`.
    pub op: String,
}

impl RecordChange {
    pub fn is_insert(&self) -> bool {
        self.op.eq_ignore_ascii_case("insert")
    }
}
