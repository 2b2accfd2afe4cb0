//! Point-in-time views of a collection.

use std::collections::BTreeMap;
use std::sync::Arc;

use railwatch_core::records::{Alert, Collection, Report};
use railwatch_core::types::RecordKey;
use serde_json::Value;

/// Full contents of one collection, keyed and ordered by record key.
///
/// Cheap to clone; the record map is shared.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub collection: Collection,
    pub records: Arc<BTreeMap<RecordKey, Value>>,
}

impl Snapshot {
    pub fn empty(collection: Collection) -> Self {
        Self::new(collection, BTreeMap::new())
    }

    pub fn new(collection: Collection, records: BTreeMap<RecordKey, Value>) -> Self {
        Self {
            collection,
            records: Arc::new(records),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.records.get(key)
    }

    /// Alerts, newest first, decoded leniently.
    pub fn alerts(&self) -> Vec<(RecordKey, Alert)> {
        self.records
            .iter()
            .rev()
            .map(|(key, value)| (key.clone(), Alert::from_record(value)))
            .collect()
    }

    /// Reports, newest first, decoded leniently.
    pub fn reports(&self) -> Vec<(RecordKey, Report)> {
        self.records
            .iter()
            .rev()
            .map(|(key, value)| (key.clone(), Report::from_record(value)))
            .collect()
    }
}

/// One record delivered to an append subscriber.
#[derive(Debug, Clone, PartialEq)]
pub struct AppendedRecord {
    pub collection: Collection,
    pub key: RecordKey,
    pub fields: Value,
}
