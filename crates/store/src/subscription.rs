//! Subscription handles and the per-collection fan-out both backends share.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use railwatch_core::records::Collection;
use tokio::sync::{broadcast, watch};
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

use crate::snapshot::{AppendedRecord, Snapshot};
use crate::store::{AppendCallback, SnapshotCallback};

/// Buffer for appended-record fan-out. Lagging subscribers lose the oldest.
const APPEND_CAPACITY: usize = 256;

/// Callback shared between a handle and its delivery task. `None` once
/// unsubscribed; delivery holds the lock for the whole invocation.
type Slot<C> = Arc<Mutex<Option<C>>>;

fn lock_slot<C>(slot: &Mutex<Option<C>>) -> MutexGuard<'_, Option<C>> {
    slot.lock().unwrap_or_else(|e| e.into_inner())
}

trait Release: Send + Sync {
    fn release(&self);
}

impl<C: Send> Release for Mutex<Option<C>> {
    fn release(&self) {
        lock_slot(self).take();
    }
}

/// Live subscription. Unsubscribes when dropped.
///
/// After [`unsubscribe`](Self::unsubscribe) returns no callback is running
/// and none will start; repeated calls are no-ops. Calling it from inside
/// the subscription's own callback deadlocks.
pub struct Subscription {
    collection: Collection,
    active: AtomicBool,
    callback: Arc<dyn Release>,
    cancel: CancellationToken,
}

impl Subscription {
    fn new<C: Send + 'static>(collection: Collection, slot: &Slot<C>) -> Self {
        Self {
            collection,
            active: AtomicBool::new(true),
            callback: Arc::clone(slot) as Arc<dyn Release>,
            cancel: CancellationToken::new(),
        }
    }

    pub fn collection(&self) -> Collection {
        self.collection
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn unsubscribe(&self) {
        if self.active.swap(false, Ordering::SeqCst) {
            // Waits for an in-flight callback, then drops it.
            self.callback.release();
            self.cancel.cancel();
            tracing::debug!(collection = %self.collection, "Subscription closed");
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("collection", &self.collection)
            .field("active", &self.is_active())
            .finish()
    }
}

/// Invoke the callback if the subscription is still live.
fn deliver<T, C: Fn(T)>(slot: &Mutex<Option<C>>, value: T) -> bool {
    match lock_slot(slot).as_ref() {
        Some(callback) => {
            callback(value);
            true
        }
        None => false,
    }
}

/// Change fan-out for one collection.
pub(crate) struct CollectionFeed {
    collection: Collection,
    snapshots: watch::Sender<Snapshot>,
    appended: broadcast::Sender<AppendedRecord>,
}

impl CollectionFeed {
    pub(crate) fn new(collection: Collection) -> Self {
        let (snapshots, _) = watch::channel(Snapshot::empty(collection));
        let (appended, _) = broadcast::channel(APPEND_CAPACITY);
        Self {
            collection,
            snapshots,
            appended,
        }
    }

    pub(crate) fn current(&self) -> Snapshot {
        self.snapshots.borrow().clone()
    }

    /// Replace the current snapshot and notify every snapshot subscriber,
    /// even if the contents did not change.
    pub(crate) fn publish_snapshot(&self, snapshot: Snapshot) {
        self.snapshots.send_replace(snapshot);
    }

    pub(crate) fn publish_appended(&self, record: AppendedRecord) {
        // No receivers is fine.
        let _ = self.appended.send(record);
    }

    pub(crate) fn subscribe(&self, callback: SnapshotCallback) -> Subscription {
        let slot: Slot<SnapshotCallback> = Arc::new(Mutex::new(Some(callback)));
        let subscription = Subscription::new(self.collection, &slot);
        let cancel = subscription.cancel.clone();
        let mut rx = self.snapshots.subscribe();

        tokio::spawn(async move {
            let initial = rx.borrow_and_update().clone();
            if !deliver(&slot, initial) {
                return;
            }

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    changed = rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let snapshot = rx.borrow_and_update().clone();
                        if !deliver(&slot, snapshot) {
                            break;
                        }
                    }
                }
            }
        });

        subscription
    }

    pub(crate) fn subscribe_appended(&self, callback: AppendCallback) -> Subscription {
        let slot: Slot<AppendCallback> = Arc::new(Mutex::new(Some(callback)));
        let subscription = Subscription::new(self.collection, &slot);
        let cancel = subscription.cancel.clone();
        let collection = self.collection;
        let mut rx = self.appended.subscribe();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    received = rx.recv() => match received {
                        Ok(record) => {
                            if !deliver(&slot, record) {
                                break;
                            }
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::warn!(%collection, skipped, "Append subscriber lagged");
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
            }
        });

        subscription
    }
}
