//! Durable single-value storage slots.
//!
//! # Responsibility
//! - Provide get/set access to last-value scalars outside the unit index:
//!   reading position, last sync time, last viewed page.
//!
//! # Invariants
//! - Each key holds at most one value; writes overwrite.
//! - Absent keys read as `None`, never as an error.

use crate::model::position::ReadingPosition;
use crate::repo::{StoreError, StoreResult};
use rusqlite::{params, Connection, OptionalExtension};

/// Slot key for the serialized [`ReadingPosition`].
pub const KEY_READING_POSITION: &str = "reading_position";
/// Slot key for the last completed full-sync time (epoch ms).
pub const KEY_LAST_SYNC_MS: &str = "last_sync_ms";
/// Slot key for the last viewed page number.
pub const KEY_LAST_PAGE: &str = "last_page";

/// Durable single-value storage collaborator.
pub trait MetaStore {
    fn get_value(&self, key: &str) -> StoreResult<Option<String>>;
    fn set_value(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Reads the persisted reading position, if any.
    fn reading_position(&self) -> StoreResult<Option<ReadingPosition>> {
        match self.get_value(KEY_READING_POSITION)? {
            Some(raw) => {
                let position = serde_json::from_str(&raw).map_err(|err| {
                    StoreError::InvalidData(format!("invalid reading_position slot: {err}"))
                })?;
                Ok(Some(position))
            }
            None => Ok(None),
        }
    }

    /// Overwrites the persisted reading position.
    fn set_reading_position(&self, position: &ReadingPosition) -> StoreResult<()> {
        let raw = serde_json::to_string(position)
            .map_err(|err| StoreError::InvalidData(err.to_string()))?;
        self.set_value(KEY_READING_POSITION, &raw)
    }

    /// Clears the reading position (explicit reset only).
    fn clear_reading_position(&self) -> StoreResult<()>;

    fn last_sync_ms(&self) -> StoreResult<Option<i64>> {
        parse_i64_slot(self.get_value(KEY_LAST_SYNC_MS)?, KEY_LAST_SYNC_MS)
    }

    fn set_last_sync_ms(&self, value: i64) -> StoreResult<()> {
        self.set_value(KEY_LAST_SYNC_MS, &value.to_string())
    }

    fn last_page(&self) -> StoreResult<Option<i64>> {
        parse_i64_slot(self.get_value(KEY_LAST_PAGE)?, KEY_LAST_PAGE)
    }

    fn set_last_page(&self, page_number: i64) -> StoreResult<()> {
        self.set_value(KEY_LAST_PAGE, &page_number.to_string())
    }
}

fn parse_i64_slot(raw: Option<String>, key: &str) -> StoreResult<Option<i64>> {
    match raw {
        Some(text) => text
            .parse::<i64>()
            .map(Some)
            .map_err(|_| StoreError::InvalidData(format!("invalid integer in `{key}` slot: {text}"))),
        None => Ok(None),
    }
}

/// SQLite-backed slot store over the `metadata` table.
pub struct SqliteMetaStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteMetaStore<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl MetaStore for SqliteMetaStore<'_> {
    fn get_value(&self, key: &str) -> StoreResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM metadata WHERE key = ?1;",
                [key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set_value(&self, key: &str, value: &str) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO metadata (key, value) VALUES (?1, ?2)
             ON CONFLICT (key) DO UPDATE SET value = excluded.value;",
            params![key, value],
        )?;
        Ok(())
    }

    fn clear_reading_position(&self) -> StoreResult<()> {
        self.conn.execute(
            "DELETE FROM metadata WHERE key = ?1;",
            [KEY_READING_POSITION],
        )?;
        Ok(())
    }
}
