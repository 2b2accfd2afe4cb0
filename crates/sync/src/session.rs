//! Per-dashboard subscription lifecycle.
//!
//! Each [`DashboardSession`] owns its subscriptions and derived state; no
//! state is shared between sessions. Updates are pushed over an unbounded
//! channel so the store's delivery tasks never block on a slow consumer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use railwatch_core::records::{Alert, Collection, Report};
use railwatch_core::types::RecordKey;
use railwatch_store::{AlertStore, Snapshot, StoreError, Subscription};
use serde::Serialize;
use tokio::sync::mpsc;

use crate::cache::{CacheDiff, DashboardCache};
use crate::config::SyncConfig;
use crate::feed::{AlertFeed, FeedEntry};

/// A record together with its store key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Keyed<T: Serialize> {
    pub key: RecordKey,
    #[serde(flatten)]
    pub record: T,
}

/// Change pushed to a dashboard.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DashboardUpdate {
    /// The reports collection was (re)delivered. Newest first.
    Reports {
        reports: Vec<Keyed<Report>>,
        diff: CacheDiff,
    },
    /// The alerts collection was (re)delivered. Newest first.
    Alerts {
        alerts: Vec<Keyed<Alert>>,
        diff: CacheDiff,
    },
    /// A single alert arrived and was prepended to the live feed.
    AlertFeed { entry: FeedEntry, feed_len: usize },
}

struct SessionState {
    reports: DashboardCache,
    alerts: DashboardCache,
    feed: AlertFeed,
}

/// One dashboard's view of the store.
pub struct DashboardSession {
    state: Arc<Mutex<SessionState>>,
    closed: Arc<AtomicBool>,
    subscriptions: Vec<Subscription>,
}

impl DashboardSession {
    /// Subscribe to reports, alerts and the appended-alert feed.
    ///
    /// The returned receiver yields updates until the session is closed.
    pub async fn open(
        store: &dyn AlertStore,
        config: &SyncConfig,
    ) -> Result<(Self, mpsc::UnboundedReceiver<DashboardUpdate>), StoreError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let state = Arc::new(Mutex::new(SessionState {
            reports: DashboardCache::new(Collection::Reports),
            alerts: DashboardCache::new(Collection::Alerts),
            feed: AlertFeed::new(config.alert_feed_capacity),
        }));
        let closed = Arc::new(AtomicBool::new(false));

        let mut session = Self {
            state,
            closed,
            subscriptions: Vec::with_capacity(3),
        };

        let reports = session
            .subscribe_snapshots(store, Collection::Reports, tx.clone())
            .await?;
        session.subscriptions.push(reports);

        let alerts = session
            .subscribe_snapshots(store, Collection::Alerts, tx.clone())
            .await?;
        session.subscriptions.push(alerts);

        let feed = session.subscribe_feed(store, tx).await?;
        session.subscriptions.push(feed);

        tracing::debug!("Dashboard session opened");
        Ok((session, rx))
    }

    async fn subscribe_snapshots(
        &self,
        store: &dyn AlertStore,
        collection: Collection,
        tx: mpsc::UnboundedSender<DashboardUpdate>,
    ) -> Result<Subscription, StoreError> {
        let state = Arc::clone(&self.state);
        let closed = Arc::clone(&self.closed);

        store
            .subscribe(
                collection,
                Box::new(move |snapshot: Snapshot| {
                    let mut state = lock(&state);
                    if closed.load(Ordering::SeqCst) {
                        return;
                    }
                    let update = match collection {
                        Collection::Reports => {
                            let diff = state.reports.apply(snapshot);
                            DashboardUpdate::Reports {
                                reports: keyed(state.reports.snapshot().reports()),
                                diff,
                            }
                        }
                        Collection::Alerts => {
                            let diff = state.alerts.apply(snapshot);
                            DashboardUpdate::Alerts {
                                alerts: keyed(state.alerts.snapshot().alerts()),
                                diff,
                            }
                        }
                    };
                    let _ = tx.send(update);
                }),
            )
            .await
    }

    async fn subscribe_feed(
        &self,
        store: &dyn AlertStore,
        tx: mpsc::UnboundedSender<DashboardUpdate>,
    ) -> Result<Subscription, StoreError> {
        let state = Arc::clone(&self.state);
        let closed = Arc::clone(&self.closed);

        store
            .subscribe_appended(
                Collection::Alerts,
                Box::new(move |record| {
                    let mut state = lock(&state);
                    if closed.load(Ordering::SeqCst) {
                        return;
                    }
                    let entry = state.feed.push(&record);
                    let feed_len = state.feed.len();
                    let _ = tx.send(DashboardUpdate::AlertFeed { entry, feed_len });
                }),
            )
            .await
    }

    /// Current reports, newest first.
    pub fn reports(&self) -> Vec<Keyed<Report>> {
        keyed(lock(&self.state).reports.snapshot().reports())
    }

    /// Current alerts, newest first.
    pub fn alerts(&self) -> Vec<Keyed<Alert>> {
        keyed(lock(&self.state).alerts.snapshot().alerts())
    }

    /// Live feed entries, most recent arrival first.
    pub fn feed(&self) -> Vec<FeedEntry> {
        lock(&self.state).feed.entries().cloned().collect()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Stop all further delivery. Safe to call more than once.
    ///
    /// Once this returns no callback can send another update: the flag is
    /// flipped under the state lock that every delivery holds while sending.
    pub fn close(&self) {
        {
            let _state = lock(&self.state);
            if self.closed.swap(true, Ordering::SeqCst) {
                return;
            }
        }
        for subscription in &self.subscriptions {
            subscription.unsubscribe();
        }
        tracing::debug!("Dashboard session closed");
    }
}

impl Drop for DashboardSession {
    fn drop(&mut self) {
        self.close();
    }
}

fn lock(state: &Mutex<SessionState>) -> std::sync::MutexGuard<'_, SessionState> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

fn keyed<T: Serialize>(records: Vec<(RecordKey, T)>) -> Vec<Keyed<T>> {
    records
        .into_iter()
        .map(|(key, record)| Keyed { key, record })
        .collect()
}
