//! Local collection mapping with snapshot diffing.

use std::collections::BTreeMap;
use std::sync::Arc;

use railwatch_core::records::Collection;
use railwatch_core::types::RecordKey;
use railwatch_store::Snapshot;
use serde::Serialize;
use serde_json::Value;

/// Keys that differ between two consecutive snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheDiff {
    pub added: Vec<RecordKey>,
    pub changed: Vec<RecordKey>,
    pub removed: Vec<RecordKey>,
}

impl CacheDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.changed.is_empty() && self.removed.is_empty()
    }

    /// Compare two key-ordered mappings.
    pub fn between(
        previous: &BTreeMap<RecordKey, Value>,
        next: &BTreeMap<RecordKey, Value>,
    ) -> Self {
        let mut diff = CacheDiff::default();
        for (key, value) in next {
            match previous.get(key) {
                None => diff.added.push(key.clone()),
                Some(old) if old != value => diff.changed.push(key.clone()),
                Some(_) => {}
            }
        }
        diff.removed = previous
            .keys()
            .filter(|key| !next.contains_key(*key))
            .cloned()
            .collect();
        diff
    }
}

/// A dashboard's copy of one collection.
#[derive(Debug, Clone)]
pub struct DashboardCache {
    snapshot: Snapshot,
}

impl DashboardCache {
    pub fn new(collection: Collection) -> Self {
        Self {
            snapshot: Snapshot::empty(collection),
        }
    }

    /// Replace the local mapping with `snapshot`, returning what changed.
    pub fn apply(&mut self, snapshot: Snapshot) -> CacheDiff {
        let diff = if Arc::ptr_eq(&self.snapshot.records, &snapshot.records) {
            CacheDiff::default()
        } else {
            CacheDiff::between(&self.snapshot.records, &snapshot.records)
        };
        self.snapshot = snapshot;
        diff
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn len(&self) -> usize {
        self.snapshot.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot.is_empty()
    }
}
