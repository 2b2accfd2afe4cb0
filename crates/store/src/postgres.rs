//! PostgreSQL store backend.
//!
//! Records live in `store_records`. A trigger announces every insert and
//! update with `pg_notify`; one background listener per store turns those
//! notifications into snapshot and append deliveries, so writes made by
//! other processes reach local subscribers too. Whenever the listener
//! (re)connects, both collections are reloaded and redelivered in full.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use railwatch_core::records::{Collection, ReportStatus, StatusChange};
use railwatch_core::types::RecordKey;
use railwatch_db::models::record::RecordChange;
use railwatch_db::repositories::RecordRepo;
use railwatch_db::{DbPool, RECORD_CHANGES_CHANNEL};
use serde_json::Value;
use sqlx::postgres::PgListener;
use tokio_util::sync::CancellationToken;

use crate::error::StoreError;
use crate::keys::KeyGenerator;
use crate::snapshot::{AppendedRecord, Snapshot};
use crate::store::{apply_status, ensure_object, AlertStore, AppendCallback, SnapshotCallback};
use crate::subscription::{CollectionFeed, Subscription};

const INITIAL_RETRY_DELAY: Duration = Duration::from_secs(1);
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

struct Feeds {
    alerts: CollectionFeed,
    reports: CollectionFeed,
}

impl Feeds {
    fn get(&self, collection: Collection) -> &CollectionFeed {
        match collection {
            Collection::Alerts => &self.alerts,
            Collection::Reports => &self.reports,
        }
    }
}

/// Store backed by PostgreSQL.
pub struct PgStore {
    pool: DbPool,
    keys: KeyGenerator,
    feeds: Arc<Feeds>,
    cancel: CancellationToken,
}

impl PgStore {
    /// Load both collections, resume key generation after the largest stored
    /// key and start the change listener.
    pub async fn connect(pool: DbPool) -> Result<Self, StoreError> {
        let keys = match RecordRepo::max_key(&pool).await? {
            Some(max) => KeyGenerator::resume_after(&max),
            None => KeyGenerator::new(),
        };

        let feeds = Arc::new(Feeds {
            alerts: CollectionFeed::new(Collection::Alerts),
            reports: CollectionFeed::new(Collection::Reports),
        });
        reload(&pool, &feeds, Collection::Alerts).await?;
        reload(&pool, &feeds, Collection::Reports).await?;

        let cancel = CancellationToken::new();
        tokio::spawn(listen_loop(pool.clone(), Arc::clone(&feeds), cancel.clone()));
        tracing::info!("PostgreSQL store connected");

        Ok(Self {
            pool,
            keys,
            feeds,
            cancel,
        })
    }

    /// Stop the change listener. Existing subscriptions stop receiving.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

impl Drop for PgStore {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[async_trait]
impl AlertStore for PgStore {
    async fn append(&self, collection: Collection, record: Value) -> Result<RecordKey, StoreError> {
        ensure_object(&record)?;
        let key = self.keys.next_key();
        RecordRepo::insert(&self.pool, collection.as_str(), &key, &record).await?;
        tracing::debug!(%collection, key = %key, "Record appended");
        Ok(key)
    }

    async fn update_status(
        &self,
        key: &str,
        status: ReportStatus,
    ) -> Result<StatusChange, StoreError> {
        let collection = Collection::Reports.as_str();
        let mut tx = self.pool.begin().await?;

        let row = RecordRepo::find_for_update(&mut tx, collection, key)
            .await?
            .ok_or_else(|| StoreError::RecordNotFound(key.to_string()))?;
        let (change, updated) = apply_status(key, &row.fields, status)?;
        if let Some(updated) = updated {
            RecordRepo::replace_fields(&mut tx, collection, key, &updated).await?;
        }
        tx.commit().await?;

        tracing::debug!(key, %status, ?change, "Report status updated");
        Ok(change)
    }

    async fn snapshot(&self, collection: Collection) -> Result<Snapshot, StoreError> {
        load_snapshot(&self.pool, collection).await
    }

    async fn subscribe(
        &self,
        collection: Collection,
        callback: SnapshotCallback,
    ) -> Result<Subscription, StoreError> {
        Ok(self.feeds.get(collection).subscribe(callback))
    }

    async fn subscribe_appended(
        &self,
        collection: Collection,
        callback: AppendCallback,
    ) -> Result<Subscription, StoreError> {
        Ok(self.feeds.get(collection).subscribe_appended(callback))
    }
}

async fn load_snapshot(pool: &DbPool, collection: Collection) -> Result<Snapshot, StoreError> {
    let rows = RecordRepo::list(pool, collection.as_str()).await?;
    let records: BTreeMap<RecordKey, Value> =
        rows.into_iter().map(|row| (row.key, row.fields)).collect();
    Ok(Snapshot::new(collection, records))
}

async fn reload(pool: &DbPool, feeds: &Feeds, collection: Collection) -> Result<(), StoreError> {
    let snapshot = load_snapshot(pool, collection).await?;
    feeds.get(collection).publish_snapshot(snapshot);
    Ok(())
}

/// Keep a `LISTEN` session open until cancelled, reconnecting with
/// exponential backoff.
async fn listen_loop(pool: DbPool, feeds: Arc<Feeds>, cancel: CancellationToken) {
    let mut delay = INITIAL_RETRY_DELAY;

    loop {
        match listen_once(&pool, &feeds, &cancel).await {
            Ok(()) => {
                tracing::info!("Store change listener stopped");
                return;
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    retry_ms = delay.as_millis() as u64,
                    "Store change listener lost connection",
                );
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(delay) => {}
        }
        delay = (delay * 2).min(MAX_RETRY_DELAY);
    }
}

/// One listener session. Returns `Ok` only when cancelled.
async fn listen_once(
    pool: &DbPool,
    feeds: &Feeds,
    cancel: &CancellationToken,
) -> Result<(), StoreError> {
    let mut listener = PgListener::connect_with(pool).await?;
    listener.listen(RECORD_CHANGES_CHANNEL).await?;

    // Anything written while no listener was attached is covered by a full
    // reload; subscribers receive the snapshot again.
    reload(pool, feeds, Collection::Alerts).await?;
    reload(pool, feeds, Collection::Reports).await?;
    tracing::debug!(channel = RECORD_CHANGES_CHANNEL, "Store change listener attached");

    loop {
        let notification = tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            received = listener.try_recv() => received?,
        };

        let Some(notification) = notification else {
            return Err(StoreError::Unavailable(
                "notification connection closed".to_string(),
            ));
        };

        let change: RecordChange = match serde_json::from_str(notification.payload()) {
            Ok(change) => change,
            Err(e) => {
                tracing::warn!(error = %e, payload = notification.payload(), "Ignoring malformed change notification");
                continue;
            }
        };
        apply_change(pool, feeds, &change).await?;
    }
}

async fn apply_change(pool: &DbPool, feeds: &Feeds, change: &RecordChange) -> Result<(), StoreError> {
    let Ok(collection) = change.collection.parse::<Collection>() else {
        tracing::warn!(collection = %change.collection, "Change for unknown collection");
        return Ok(());
    };

    if change.is_insert() {
        if let Some(row) = RecordRepo::find(pool, collection.as_str(), &change.key).await? {
            feeds.get(collection).publish_appended(AppendedRecord {
                collection,
                key: row.key,
                fields: row.fields,
            });
        }
    }
    reload(pool, feeds, collection).await
}
