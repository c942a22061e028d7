//! Tiered content resolution.
//!
//! # Responsibility
//! - Resolve a parent's units by walking bundled -> local -> remote tiers,
//!   validating completeness at each tier before trusting it.
//! - Memoize resolved parents so prefetch/scroll never re-resolves.
//!
//! # Invariants
//! - A failing tier is recovered locally by falling to the next tier; the
//!   caller never sees a tier failure.
//! - A partial answer is preferred over none; `resolve` never errors.
//! - Remote hits are written through to the local store.

use crate::bundle::{AssetReader, BundleLoader};
use crate::model::unit::{ContentUnit, UnitKind};
use crate::repo::unit_store::UnitStore;
use log::{debug, warn};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Remote authoritative source collaborator.
///
/// Both calls return zero or more units and never error for "not found".
pub trait RemoteSource {
    /// All units where parent = `parent_id`, ordered by sequence.
    fn fetch_by_parent(
        &self,
        kind: UnitKind,
        parent_id: i64,
    ) -> Result<Vec<ContentUnit>, RemoteError>;

    /// Bulk window ordered by `(parent, sequence)`, range `[offset, offset+limit)`.
    fn fetch_range(
        &self,
        kind: UnitKind,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<ContentUnit>, RemoteError>;
}

/// Remote transport failure. Timeouts and transport faults are treated
/// identically by the resolver: fall back to bundled/local.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    Unavailable(String),
    Protocol(String),
}

impl Display for RemoteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable(message) => write!(f, "remote source unavailable: {message}"),
            Self::Protocol(message) => write!(f, "remote source protocol error: {message}"),
        }
    }
}

impl Error for RemoteError {}

/// Which tier produced a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Bundled,
    Local,
    Remote,
}

impl Tier {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bundled => "bundled",
            Self::Local => "local",
            Self::Remote => "remote",
        }
    }
}

/// Per-call resolution result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub units: Vec<ContentUnit>,
    pub source: Tier,
    pub complete: bool,
}

/// Returns whether `units` fully satisfy an expected per-parent count.
///
/// With an unknown expectation (`expected_count <= 0`) any non-empty run is
/// accepted: don't let perfect be the enemy of offline.
fn satisfies_expected(units: &[ContentUnit], expected_count: i64) -> bool {
    let Some(first) = units.first() else {
        return false;
    };
    if expected_count <= 0 {
        return true;
    }
    if units.len() as i64 != expected_count || first.key.sequence != 1 {
        return false;
    }
    units
        .windows(2)
        .all(|pair| pair[1].key.sequence == pair[0].key.sequence + 1)
}

/// Three-tier resolver with a per-parent memo.
pub struct TieredResolver<'a, R: AssetReader> {
    bundle: &'a BundleLoader<R>,
    store: &'a dyn UnitStore,
    remote: &'a dyn RemoteSource,
    memo: HashMap<(UnitKind, i64), Resolved>,
}

impl<'a, R: AssetReader> TieredResolver<'a, R> {
    pub fn new(
        bundle: &'a BundleLoader<R>,
        store: &'a dyn UnitStore,
        remote: &'a dyn RemoteSource,
    ) -> Self {
        Self {
            bundle,
            store,
            remote,
            memo: HashMap::new(),
        }
    }

    /// Resolves all units under `parent_id`, best tier first.
    ///
    /// # Contract
    /// - Returns the bundled run when it matches `expected_count` and is
    ///   contiguous from sequence 1; this is the hot, zero-I/O path.
    /// - Otherwise prefers a complete local copy, then the remote source
    ///   (written through to the local store, even if partial).
    /// - When every tier fails, returns the largest partial found; an empty
    ///   result is still a result, never an error.
    pub fn resolve(&mut self, kind: UnitKind, parent_id: i64, expected_count: i64) -> Resolved {
        if let Some(hit) = self.memo.get(&(kind, parent_id)) {
            return hit.clone();
        }

        let resolved = self.resolve_uncached(kind, parent_id, expected_count);
        debug!(
            "event=resolve module=resolve status=ok kind={} parent={} tier={} complete={} units={}",
            kind.as_str(),
            parent_id,
            resolved.source.as_str(),
            resolved.complete,
            resolved.units.len()
        );
        self.memo.insert((kind, parent_id), resolved.clone());
        resolved
    }

    /// Drops the memo entry for one parent (used after sync top-ups).
    pub fn invalidate(&mut self, kind: UnitKind, parent_id: i64) {
        self.memo.remove(&(kind, parent_id));
    }

    /// Drops the whole memo.
    pub fn clear_memo(&mut self) {
        self.memo.clear();
    }

    fn resolve_uncached(&self, kind: UnitKind, parent_id: i64, expected_count: i64) -> Resolved {
        let bundled = self.bundle.get_by_parent(kind, parent_id);
        if satisfies_expected(bundled, expected_count) {
            return Resolved {
                units: bundled.to_vec(),
                source: Tier::Bundled,
                complete: true,
            };
        }

        // Storage failure is "tier unavailable", not fatal: continue with an
        // empty local candidate.
        let local = match self.store.get_by_parent(kind, parent_id) {
            Ok(units) => units,
            Err(err) => {
                warn!(
                    "event=resolve module=resolve status=degraded kind={} parent={} tier=local error={}",
                    kind.as_str(),
                    parent_id,
                    err
                );
                Vec::new()
            }
        };
        if satisfies_expected(&local, expected_count) {
            return Resolved {
                units: local,
                source: Tier::Local,
                complete: true,
            };
        }

        match self.remote.fetch_by_parent(kind, parent_id) {
            Ok(units) if !units.is_empty() => {
                if let Err(err) = self.store.put_units(&units) {
                    warn!(
                        "event=resolve module=resolve status=degraded kind={} parent={} tier=remote error_code=write_through_failed error={}",
                        kind.as_str(),
                        parent_id,
                        err
                    );
                }
                let complete = satisfies_expected(&units, expected_count);
                Resolved {
                    units,
                    source: Tier::Remote,
                    complete,
                }
            }
            Ok(_) => self.best_partial(bundled, local),
            Err(err) => {
                warn!(
                    "event=resolve module=resolve status=degraded kind={} parent={} tier=remote error={}",
                    kind.as_str(),
                    parent_id,
                    err
                );
                self.best_partial(bundled, local)
            }
        }
    }

    /// Largest partial wins; bundled wins ties.
    fn best_partial(&self, bundled: &[ContentUnit], local: Vec<ContentUnit>) -> Resolved {
        if local.len() > bundled.len() {
            Resolved {
                units: local,
                source: Tier::Local,
                complete: false,
            }
        } else {
            Resolved {
                units: bundled.to_vec(),
                source: Tier::Bundled,
                complete: false,
            }
        }
    }
}
