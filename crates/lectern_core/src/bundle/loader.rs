//! Memoized bundled snapshot loader.
//!
//! # Responsibility
//! - Parse the delimited verse file and per-group record files into the
//!   content unit model.
//! - Build `parent -> units` indices and the parent/page catalog at load
//!   time.
//!
//! # Invariants
//! - `ensure_loaded` is idempotent; all callers share one parsed snapshot.
//! - Absent or malformed resources index to empty; a line that fails to
//!   parse is skipped with a warning, never fatal.

use crate::bundle::{AssetError, AssetReader};
use crate::model::catalog::Catalog;
use crate::model::page::PageExtent;
use crate::model::unit::{ContentUnit, UnitKey, UnitKind};
use log::{info, warn};
use once_cell::sync::OnceCell;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

/// Resource naming for one shipped bundle.
#[derive(Debug, Clone)]
pub struct BundleConfig {
    /// Delimited flat file: `parent|sequence|page|group|text` per line.
    pub verse_file: String,
    /// Per-group record files are named `{prefix}{group:02}.json`.
    pub record_file_prefix: String,
    /// Number of record groups shipped with the bundle.
    pub record_group_count: i64,
}

impl Default for BundleConfig {
    fn default() -> Self {
        Self {
            verse_file: "verses.txt".to_string(),
            record_file_prefix: "records_".to_string(),
            record_group_count: 30,
        }
    }
}

/// Shape of one entry in a structured record file.
#[derive(Debug, Deserialize)]
struct RecordRow {
    parent_id: i64,
    sequence: i64,
    page: i64,
    text: String,
    #[serde(default)]
    notes: Vec<String>,
}

/// Parsed snapshot: per-parent indices plus the derived catalog.
#[derive(Debug, Default)]
struct BundleSnapshot {
    by_parent: HashMap<(UnitKind, i64), Vec<ContentUnit>>,
    catalog: Catalog,
}

/// Read-only loader over packaged snapshot assets.
pub struct BundleLoader<R: AssetReader> {
    reader: R,
    config: BundleConfig,
    snapshot: OnceCell<BundleSnapshot>,
}

impl<R: AssetReader> BundleLoader<R> {
    pub fn new(reader: R, config: BundleConfig) -> Self {
        Self {
            reader,
            config,
            snapshot: OnceCell::new(),
        }
    }

    /// Parses the bundle once; later callers reuse the shared snapshot.
    pub fn ensure_loaded(&self) -> &Catalog {
        &self.snapshot().catalog
    }

    /// Units of one parent, sorted by sequence; empty when the bundle has
    /// nothing for that parent.
    pub fn get_by_parent(&self, kind: UnitKind, parent_id: i64) -> &[ContentUnit] {
        self.snapshot()
            .by_parent
            .get(&(kind, parent_id))
            .map_or(&[], Vec::as_slice)
    }

    /// Parent and page catalog derived from the bundle.
    pub fn catalog(&self) -> &Catalog {
        self.ensure_loaded()
    }

    fn snapshot(&self) -> &BundleSnapshot {
        self.snapshot.get_or_init(|| self.parse_all())
    }

    fn parse_all(&self) -> BundleSnapshot {
        let started_at = Instant::now();
        let mut snapshot = BundleSnapshot::default();
        // page -> (group, min key, max key) accumulated while parsing verses.
        let mut page_bounds: BTreeMap<i64, (i64, (i64, i64), (i64, i64))> = BTreeMap::new();

        let verse_count = self.parse_verses(&mut snapshot, &mut page_bounds);
        let record_count = self.parse_records(&mut snapshot);

        for units in snapshot.by_parent.values_mut() {
            units.sort_by_key(|unit| unit.key.sequence);
        }
        for ((kind, parent_id), units) in &snapshot.by_parent {
            snapshot
                .catalog
                .record_expected(*kind, *parent_id, units.len() as i64);
        }

        let extents = page_bounds
            .into_iter()
            .map(|(page_number, (group_id, start, end))| PageExtent {
                page_number,
                start_parent_id: start.0,
                start_sequence: start.1,
                end_parent_id: end.0,
                end_sequence: end.1,
                group_id,
            })
            .collect();
        snapshot.catalog.set_extents(extents);

        info!(
            "event=bundle_load module=bundle status=ok verses={} records={} pages={} duration_ms={}",
            verse_count,
            record_count,
            snapshot.catalog.page_count(),
            started_at.elapsed().as_millis()
        );

        snapshot
    }

    fn parse_verses(
        &self,
        snapshot: &mut BundleSnapshot,
        page_bounds: &mut BTreeMap<i64, (i64, (i64, i64), (i64, i64))>,
    ) -> usize {
        let content = match self.reader.read(&self.config.verse_file) {
            Ok(content) => content,
            Err(err) => {
                warn!(
                    "event=bundle_load module=bundle status=degraded resource={} error={}",
                    self.config.verse_file, err
                );
                return 0;
            }
        };

        let mut count = 0;
        for (line_number, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let Some((unit, page, group)) = parse_verse_line(trimmed) else {
                warn!(
                    "event=bundle_load module=bundle status=degraded resource={} line={} error_code=malformed_line",
                    self.config.verse_file,
                    line_number + 1
                );
                continue;
            };

            let key = (unit.key.parent_id, unit.key.sequence);
            page_bounds
                .entry(page)
                .and_modify(|(_, start, end)| {
                    if key < *start {
                        *start = key;
                    }
                    if key > *end {
                        *end = key;
                    }
                })
                .or_insert((group, key, key));

            snapshot
                .by_parent
                .entry((UnitKind::Verse, unit.key.parent_id))
                .or_default()
                .push(unit);
            count += 1;
        }
        count
    }

    fn parse_records(&self, snapshot: &mut BundleSnapshot) -> usize {
        let mut count = 0;
        for group in 1..=self.config.record_group_count {
            let name = format!("{}{group:02}.json", self.config.record_file_prefix);
            let content = match self.reader.read(&name) {
                Ok(content) => content,
                Err(AssetError::NotFound(_)) => continue,
                Err(err) => {
                    warn!(
                        "event=bundle_load module=bundle status=degraded resource={name} error={err}"
                    );
                    continue;
                }
            };

            let rows: Vec<RecordRow> = match serde_json::from_str(&content) {
                Ok(rows) => rows,
                Err(err) => {
                    warn!(
                        "event=bundle_load module=bundle status=degraded resource={name} error_code=invalid_json error={err}"
                    );
                    continue;
                }
            };

            for row in rows {
                let key = UnitKey::new(UnitKind::Record, row.parent_id, row.sequence);
                match ContentUnit::new(key, row.text, row.notes) {
                    Ok(unit) => {
                        snapshot
                            .by_parent
                            .entry((UnitKind::Record, row.parent_id))
                            .or_default()
                            .push(unit);
                        count += 1;
                    }
                    Err(err) => {
                        warn!(
                            "event=bundle_load module=bundle status=degraded resource={name} page={} error={err}",
                            row.page
                        );
                    }
                }
            }
        }
        count
    }
}

/// Parses one `parent|sequence|page|group|text` line.
fn parse_verse_line(line: &str) -> Option<(ContentUnit, i64, i64)> {
    let mut fields = line.splitn(5, '|');
    let parent_id = fields.next()?.trim().parse::<i64>().ok()?;
    let sequence = fields.next()?.trim().parse::<i64>().ok()?;
    let page = fields.next()?.trim().parse::<i64>().ok()?;
    let group = fields.next()?.trim().parse::<i64>().ok()?;
    let text = fields.next()?.trim();

    let key = UnitKey::new(UnitKind::Verse, parent_id, sequence);
    let unit = ContentUnit::new(key, text, Vec::new()).ok()?;
    Some((unit, page, group))
}
