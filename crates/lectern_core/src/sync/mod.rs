//! Background corpus sync into the persistent local store.
//!
//! # Responsibility
//! - Pull the full remote corpus in bounded batches, one domain at a time.
//! - Skip work that local counts already satisfy; rate-limit full syncs to
//!   one per freshness window.
//!
//! # Invariants
//! - Every batch is durably written before the next batch is requested; an
//!   interrupted run leaves a valid, partially-populated store.
//! - Resumption re-derives remaining work from current local counts, never
//!   from a saved offset.
//! - A batch error aborts the run without corrupting earlier batches.

use crate::model::catalog::Catalog;
use crate::model::unit::{ContentUnit, UnitKind};
use crate::repo::meta_store::MetaStore;
use crate::repo::unit_store::UnitStore;
use crate::repo::StoreError;
use crate::resolve::{RemoteError, RemoteSource};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// One full sync per this window unless local counts fall short.
pub const FRESHNESS_WINDOW_MS: i64 = 24 * 60 * 60 * 1000;
/// Records pulled per remote request.
pub const DEFAULT_BATCH_SIZE: i64 = 500;

/// Lifecycle state reported with every progress callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Syncing,
    Complete,
    Error,
}

/// Progress snapshot for one domain, emitted after every batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncProgress {
    pub domain: UnitKind,
    pub current: i64,
    pub total: i64,
    pub status: SyncStatus,
}

/// Result summary of one `sync_all` run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Freshness window and count thresholds were satisfied; nothing pulled.
    Fresh,
    /// Run finished; `fetched` counts newly pulled units across domains.
    Completed { fetched: i64 },
}

/// Sync-layer error: the run did not complete this cycle.
#[derive(Debug)]
pub enum SyncError {
    Remote {
        domain: UnitKind,
        offset: i64,
        source: RemoteError,
    },
    Store(StoreError),
}

impl Display for SyncError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Remote {
                domain,
                offset,
                source,
            } => write!(
                f,
                "sync batch failed for domain {} at offset {offset}: {source}",
                domain.as_str()
            ),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SyncError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Remote { source, .. } => Some(source),
            Self::Store(err) => Some(err),
        }
    }
}

impl From<StoreError> for SyncError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Tuning knobs for the sync manager.
#[derive(Debug, Clone, Copy)]
pub struct SyncConfig {
    pub batch_size: i64,
    pub freshness_window_ms: i64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            freshness_window_ms: FRESHNESS_WINDOW_MS,
        }
    }
}

/// Opportunistic puller that warms the local store for the resolver.
pub struct SyncManager<'a> {
    store: &'a dyn UnitStore,
    meta: &'a dyn MetaStore,
    remote: &'a dyn RemoteSource,
    catalog: &'a Catalog,
    config: SyncConfig,
}

impl<'a> SyncManager<'a> {
    pub fn new(
        store: &'a dyn UnitStore,
        meta: &'a dyn MetaStore,
        remote: &'a dyn RemoteSource,
        catalog: &'a Catalog,
        config: SyncConfig,
    ) -> Self {
        Self {
            store,
            meta,
            remote,
            catalog,
            config,
        }
    }

    /// Pulls both domains to their catalog totals, reporting progress after
    /// every batch.
    ///
    /// # Contract
    /// - Returns `SyncOutcome::Fresh` without remote traffic when the last
    ///   full sync is inside the freshness window and local counts meet both
    ///   known totals.
    /// - Stamps `last_sync_ms` only after a fully successful run.
    pub fn sync_all(
        &self,
        now_ms: i64,
        on_progress: &mut dyn FnMut(&SyncProgress),
    ) -> Result<SyncOutcome, SyncError> {
        if self.is_fresh(now_ms)? {
            info!("event=sync_all module=sync status=skipped reason=fresh");
            return Ok(SyncOutcome::Fresh);
        }

        let mut fetched = 0;
        for kind in [UnitKind::Verse, UnitKind::Record] {
            fetched += self.sync_domain(kind, on_progress)?;
        }

        self.meta.set_last_sync_ms(now_ms)?;
        info!("event=sync_all module=sync status=ok fetched={fetched}");
        Ok(SyncOutcome::Completed { fetched })
    }

    /// On-demand top-up for one parent, outside the resolver path.
    pub fn sync_one_parent(
        &self,
        kind: UnitKind,
        parent_id: i64,
    ) -> Result<Vec<ContentUnit>, SyncError> {
        let units = self
            .remote
            .fetch_by_parent(kind, parent_id)
            .map_err(|source| SyncError::Remote {
                domain: kind,
                offset: 0,
                source,
            })?;
        if !units.is_empty() {
            self.store.put_units(&units)?;
        }
        Ok(units)
    }

    fn is_fresh(&self, now_ms: i64) -> Result<bool, SyncError> {
        let Some(last_sync_ms) = self.meta.last_sync_ms()? else {
            return Ok(false);
        };
        if now_ms - last_sync_ms >= self.config.freshness_window_ms {
            return Ok(false);
        }
        for kind in [UnitKind::Verse, UnitKind::Record] {
            if self.store.count_units(kind)? < self.catalog.total_units(kind) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn sync_domain(
        &self,
        kind: UnitKind,
        on_progress: &mut dyn FnMut(&SyncProgress),
    ) -> Result<i64, SyncError> {
        let total = self.catalog.total_units(kind);
        // Resume point is the current local count, not a saved offset.
        let mut current = self.store.count_units(kind)?;
        let mut fetched = 0;

        while current < total {
            let batch = match self
                .remote
                .fetch_range(kind, current, self.config.batch_size)
            {
                Ok(batch) => batch,
                Err(source) => {
                    warn!(
                        "event=sync_all module=sync status=error domain={} offset={} error={}",
                        kind.as_str(),
                        current,
                        source
                    );
                    on_progress(&SyncProgress {
                        domain: kind,
                        current,
                        total,
                        status: SyncStatus::Error,
                    });
                    return Err(SyncError::Remote {
                        domain: kind,
                        offset: current,
                        source,
                    });
                }
            };

            if batch.is_empty() {
                // Remote has fewer units than the catalog promises; stop
                // rather than spin on the same offset.
                warn!(
                    "event=sync_all module=sync status=degraded domain={} offset={} error_code=short_corpus total={}",
                    kind.as_str(),
                    current,
                    total
                );
                break;
            }

            self.store.put_units(&batch)?;
            current += batch.len() as i64;
            fetched += batch.len() as i64;
            on_progress(&SyncProgress {
                domain: kind,
                current,
                total,
                status: SyncStatus::Syncing,
            });
        }

        on_progress(&SyncProgress {
            domain: kind,
            current,
            total,
            status: SyncStatus::Complete,
        });
        Ok(fetched)
    }
}
