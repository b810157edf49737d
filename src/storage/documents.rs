//! Whole-document JSON persistence on top of the `documents` table.
//!
//! Each document is read and written in full; callers run a read-modify-write
//! cycle inside one transaction.

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Serialize, de::DeserializeOwned};

use crate::storage::{
    db::SecondsSinceUnix,
    error::StorageError,
    schema::{columns::*, tables::*},
};

/// Reads document `key`, falling back to `T::default()` when it was never written.
pub(crate) fn read<T>(conn: &Connection, key: &str) -> Result<T, StorageError>
where
    T: DeserializeOwned + Default,
{
    let body: Option<String> = conn
        .query_row(
            &format!("SELECT {BODY} FROM {DOCUMENTS} WHERE {KEY} = ?1"),
            params![key],
            |row| row.get(0),
        )
        .optional()?;

    match body {
        None => Ok(T::default()),
        Some(body) => serde_json::from_str(&body).map_err(|e| StorageError::Corrupt {
            key: key.to_string(),
            reason: e.to_string(),
        }),
    }
}

/// Replaces document `key` with `value`.
pub(crate) fn write<T: Serialize>(
    conn: &Connection,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let body = serde_json::to_string(value)?;
    let now: SecondsSinceUnix = Utc::now().timestamp();

    conn.execute(
        &format!(
            "INSERT INTO {DOCUMENTS} ({KEY}, {BODY}, {UPDATED_AT}) VALUES (?1, ?2, ?3)
             ON CONFLICT({KEY}) DO UPDATE SET {BODY} = excluded.{BODY}, {UPDATED_AT} = excluded.{UPDATED_AT}"
        ),
        params![key, body, now],
    )?;
    Ok(())
}
