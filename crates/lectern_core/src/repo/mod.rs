//! Store layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the persistent local store contracts used by resolver and sync.
//! - Isolate SQLite query details from orchestration code.
//!
//! # Invariants
//! - All unit writes are idempotent upserts keyed by the natural key.
//! - Store failures are recoverable: callers treat them as "tier
//!   unavailable", never as fatal.

pub mod meta_store;
pub mod unit_store;

use crate::db::DbError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StoreResult<T> = Result<T, StoreError>;

/// Store-layer error for persistence and decoding failures.
#[derive(Debug)]
pub enum StoreError {
    Db(DbError),
    InvalidData(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}
