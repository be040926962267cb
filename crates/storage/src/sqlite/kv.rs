use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use crate::repository::StorageError;

fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

pub(crate) fn revision_to_i64(revision: u64) -> Result<i64, StorageError> {
    i64::try_from(revision)
        .map_err(|_| StorageError::Serialization(format!("revision overflow: {revision}")))
}

pub(crate) async fn get(pool: &SqlitePool, key: &str) -> Result<Option<String>, StorageError> {
    let row = sqlx::query("SELECT value FROM kv_entries WHERE key = ?1")
        .bind(key)
        .fetch_optional(pool)
        .await
        .map_err(conn)?;

    row.map(|row| {
        row.try_get::<String, _>("value")
            .map_err(|e| StorageError::Serialization(e.to_string()))
    })
    .transpose()
}

/// Upsert `value` under `key` unless the stored revision is newer.
pub(crate) async fn put_if_newer(
    pool: &SqlitePool,
    key: &str,
    value: &str,
    revision: i64,
    updated_at: DateTime<Utc>,
) -> Result<(), StorageError> {
    sqlx::query(
        r"
        INSERT INTO kv_entries (key, value, revision, updated_at)
        VALUES (?1, ?2, ?3, ?4)
        ON CONFLICT(key) DO UPDATE SET
            value = excluded.value,
            revision = excluded.revision,
            updated_at = excluded.updated_at
        WHERE excluded.revision >= kv_entries.revision
        ",
    )
    .bind(key)
    .bind(value)
    .bind(revision)
    .bind(updated_at)
    .execute(pool)
    .await
    .map_err(conn)?;
    Ok(())
}

pub(crate) async fn delete(pool: &SqlitePool, key: &str) -> Result<(), StorageError> {
    sqlx::query("DELETE FROM kv_entries WHERE key = ?1")
        .bind(key)
        .execute(pool)
        .await
        .map_err(conn)?;
    Ok(())
}
