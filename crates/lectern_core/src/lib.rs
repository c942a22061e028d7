//! Core domain logic for Lectern, an offline-first paginated reference-text
//! reader. This crate is the single source of truth for content resolution,
//! pagination and reading-position invariants.

pub mod bundle;
pub mod db;
pub mod logging;
pub mod model;
pub mod pager;
pub mod repo;
pub mod resolve;
pub mod sync;
pub mod tracker;

pub use bundle::{AssetReader, BundleConfig, BundleLoader, FsAssetReader};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::catalog::Catalog;
pub use model::page::{Page, PageExtent};
pub use model::position::ReadingPosition;
pub use model::unit::{ContentUnit, UnitKey, UnitKind, UnitValidationError};
pub use pager::{PaginationEngine, PagerState, Viewport};
pub use repo::meta_store::{MetaStore, SqliteMetaStore};
pub use repo::unit_store::{SqliteUnitStore, UnitStore};
pub use repo::{StoreError, StoreResult};
pub use resolve::{RemoteError, RemoteSource, Resolved, Tier, TieredResolver};
pub use sync::{SyncConfig, SyncError, SyncManager, SyncOutcome, SyncProgress, SyncStatus};
pub use tracker::{PositionListener, PositionTracker, VisibilitySample};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
