//! Content unit store contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide idempotent upsert and sorted per-parent reads over `units`.
//! - Keep SQL details inside the store boundary.
//!
//! # Invariants
//! - Write paths call `ContentUnit::validate()` before SQL mutations.
//! - Replaying a sync batch never creates duplicate rows.
//! - Reads for an unknown parent return an empty list, not an error.

use crate::model::unit::{ContentUnit, UnitKey, UnitKind};
use crate::repo::{StoreError, StoreResult};
use rusqlite::{params, Connection, Row};

const UNIT_SELECT_SQL: &str = "SELECT
    kind,
    parent_id,
    sequence,
    primary_text,
    metadata_json
FROM units";

/// Persistent local store interface for content units.
pub trait UnitStore {
    /// Upserts a batch of units keyed by the natural key.
    fn put_units(&self, units: &[ContentUnit]) -> StoreResult<()>;
    /// Returns all units under one parent, sorted by sequence.
    fn get_by_parent(&self, kind: UnitKind, parent_id: i64) -> StoreResult<Vec<ContentUnit>>;
    /// Counts stored units of one kind.
    fn count_units(&self, kind: UnitKind) -> StoreResult<i64>;
}

/// SQLite-backed unit store.
pub struct SqliteUnitStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUnitStore<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl UnitStore for SqliteUnitStore<'_> {
    fn put_units(&self, units: &[ContentUnit]) -> StoreResult<()> {
        for unit in units {
            unit.validate()
                .map_err(|err| StoreError::InvalidData(err.to_string()))?;
        }

        // Last write wins: content for one natural key is identical across
        // tiers, so interleaved sync/resolver writers are safe.
        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO units (kind, parent_id, sequence, primary_text, metadata_json)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT (kind, parent_id, sequence) DO UPDATE SET
                primary_text = excluded.primary_text,
                metadata_json = excluded.metadata_json,
                updated_at = (strftime('%s', 'now') * 1000);",
        )?;

        for unit in units {
            let metadata_json = serde_json::to_string(&unit.metadata)
                .map_err(|err| StoreError::InvalidData(err.to_string()))?;
            stmt.execute(params![
                unit.key.kind.as_str(),
                unit.key.parent_id,
                unit.key.sequence,
                unit.primary_text.as_str(),
                metadata_json,
            ])?;
        }

        Ok(())
    }

    fn get_by_parent(&self, kind: UnitKind, parent_id: i64) -> StoreResult<Vec<ContentUnit>> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "{UNIT_SELECT_SQL}
             WHERE kind = ?1 AND parent_id = ?2
             ORDER BY sequence ASC;"
        ))?;

        let mut rows = stmt.query(params![kind.as_str(), parent_id])?;
        let mut units = Vec::new();
        while let Some(row) = rows.next()? {
            units.push(parse_unit_row(row)?);
        }

        Ok(units)
    }

    fn count_units(&self, kind: UnitKind) -> StoreResult<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM units WHERE kind = ?1;",
            [kind.as_str()],
            |row| row.get::<_, i64>(0),
        )?;
        Ok(count)
    }
}

fn parse_unit_row(row: &Row<'_>) -> StoreResult<ContentUnit> {
    let kind_text: String = row.get("kind")?;
    let kind = UnitKind::parse(&kind_text).ok_or_else(|| {
        StoreError::InvalidData(format!("invalid kind `{kind_text}` in units.kind"))
    })?;

    let metadata_json: String = row.get("metadata_json")?;
    let metadata: Vec<String> = serde_json::from_str(&metadata_json).map_err(|err| {
        StoreError::InvalidData(format!("invalid units.metadata_json payload: {err}"))
    })?;

    let unit = ContentUnit {
        key: UnitKey {
            kind,
            parent_id: row.get("parent_id")?,
            sequence: row.get("sequence")?,
        },
        primary_text: row.get("primary_text")?,
        metadata,
    };
    unit.validate()
        .map_err(|err| StoreError::InvalidData(err.to_string()))?;
    Ok(unit)
}
