//! Bundled snapshot access.
//!
//! # Responsibility
//! - Define the generic asset-read primitive for packaged resources.
//! - Expose the memoized snapshot loader and its in-memory indices.
//!
//! # Invariants
//! - The bundle is read-only; nothing here writes back to packaged assets.
//! - A partially present bundle degrades to empty indices, never to a
//!   failed load.

pub mod loader;

pub use loader::{BundleConfig, BundleLoader};

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

/// Asset read failure. The loader treats every variant as "resource absent";
/// the distinction exists for logging.
#[derive(Debug)]
pub enum AssetError {
    NotFound(String),
    Io { name: String, message: String },
}

impl Display for AssetError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(name) => write!(f, "bundled asset not found: {name}"),
            Self::Io { name, message } => {
                write!(f, "failed to read bundled asset `{name}`: {message}")
            }
        }
    }
}

impl Error for AssetError {}

/// Generic asset-read primitive (file read or packaged-resource fetch,
/// depending on platform).
pub trait AssetReader {
    fn read(&self, name: &str) -> Result<String, AssetError>;
}

/// Filesystem-backed asset reader rooted at the bundle directory.
pub struct FsAssetReader {
    root: PathBuf,
}

impl FsAssetReader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl AssetReader for FsAssetReader {
    fn read(&self, name: &str) -> Result<String, AssetError> {
        let path = self.root.join(name);
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(content),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(AssetError::NotFound(name.to_string()))
            }
            Err(err) => Err(AssetError::Io {
                name: name.to_string(),
                message: err.to_string(),
            }),
        }
    }
}
