//! Bounded live feed of newly appended alerts.

use std::collections::VecDeque;

use railwatch_core::records::Alert;
use railwatch_core::types::RecordKey;
use railwatch_store::AppendedRecord;
use serde::Serialize;

use crate::config::DEFAULT_ALERT_FEED_CAPACITY;

/// One alert as shown in the feed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedEntry {
    pub key: RecordKey,
    #[serde(flatten)]
    pub alert: Alert,
}

/// Newest-arrival-first list of alerts, capped in length.
///
/// Ordering is arrival order, not alert timestamp order. This is a UI feed,
/// separate from the authoritative store contents.
#[derive(Debug, Clone)]
pub struct AlertFeed {
    capacity: usize,
    entries: VecDeque<FeedEntry>,
}

impl AlertFeed {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Prepend a freshly appended alert, dropping the oldest beyond capacity.
    pub fn push(&mut self, record: &AppendedRecord) -> FeedEntry {
        let entry = FeedEntry {
            key: record.key.clone(),
            alert: Alert::from_record(&record.fields),
        };
        self.entries.push_front(entry.clone());
        self.entries.truncate(self.capacity);
        entry
    }

    /// Entries, most recent arrival first.
    pub fn entries(&self) -> impl Iterator<Item = &FeedEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for AlertFeed {
    fn default() -> Self {
        Self::new(DEFAULT_ALERT_FEED_CAPACITY)
    }
}
