//! Repository for the `store_records` table.

use sqlx::{PgConnection, PgPool};

use crate::models::record::StoredRecord;

/// Column list for `store_records` queries.
const COLUMNS: &str = "collection, key, fields, created_at, updated_at";

/// Provides insert, read and field replacement for store records.
pub struct RecordRepo;

impl RecordRepo {
    /// Insert a new record, returning the full row.
    pub async fn insert(
        pool: &PgPool,
        collection: &str,
        key: &str,
        fields: &serde_json::Value,
    ) -> Result<StoredRecord, sqlx::Error> {
        let query = format!(
            "INSERT INTO store_records (collection, key, fields) \
             VALUES ($1, $2, $3) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, StoredRecord>(&query)
            .bind(collection)
            .bind(key)
            .bind(fields)
            .fetch_one(pool)
            .await
    }

    /// Find one record by collection and key.
    pub async fn find(
        pool: &PgPool,
        collection: &str,
        key: &str,
    ) -> Result<Option<StoredRecord>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM store_records WHERE collection = $1 AND key = $2");
        sqlx::query_as::<_, StoredRecord>(&query)
            .bind(collection)
            .bind(key)
            .fetch_optional(pool)
            .await
    }

    /// Find one record and lock its row until the enclosing transaction ends.
    pub async fn find_for_update(
        conn: &mut PgConnection,
        collection: &str,
        key: &str,
    ) -> Result<Option<StoredRecord>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM store_records \
             WHERE collection = $1 AND key = $2 \
             FOR UPDATE"
        );
        sqlx::query_as::<_, StoredRecord>(&query)
            .bind(collection)
            .bind(key)
            .fetch_optional(conn)
            .await
    }

    /// List every record of a collection in key order.
    pub async fn list(pool: &PgPool, collection: &str) -> Result<Vec<StoredRecord>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM store_records WHERE collection = $1 ORDER BY key");
        sqlx::query_as::<_, StoredRecord>(&query)
            .bind(collection)
            .fetch_all(pool)
            .await
    }

    /// Replace a record's fields. Returns `true` if a row was updated.
    pub async fn replace_fields(
        conn: &mut PgConnection,
        collection: &str,
        key: &str,
        fields: &serde_json::Value,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE store_records SET fields = $3, updated_at = NOW() \
             WHERE collection = $1 AND key = $2",
        )
        .bind(collection)
        .bind(key)
        .bind(fields)
        .execute(conn)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Largest key in use across all collections, for seeding key generation
    /// after a restart.
    pub async fn max_key(pool: &PgPool) -> Result<Option<String>, sqlx::Error> {
        let row: (Option<String>,) = sqlx::query_as("SELECT MAX(key) FROM store_records")
            .fetch_one(pool)
            .await?;
        Ok(row.0)
    }
}
