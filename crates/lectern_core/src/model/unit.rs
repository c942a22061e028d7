//! Content unit domain model.
//!
//! # Responsibility
//! - Define the canonical record for verse-like and record-like content.
//! - Provide the natural-key type used across store, bundle and resolver.
//!
//! # Invariants
//! - `(kind, parent_id, sequence)` is globally unique and never reused.
//! - `parent_id` and `sequence` are positive; `primary_text` is non-empty.
//! - Units are read-only from the pagination engine's perspective.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Content domain a unit belongs to.
///
/// The two domains share one storage shape and one sync pipeline but are
/// counted and validated independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    /// Verse-like unit from the delimited flat bundle file.
    Verse,
    /// Annotated record unit from the per-group structured files.
    Record,
}

impl UnitKind {
    /// Stable storage tag for this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Verse => "verse",
            Self::Record => "record",
        }
    }

    /// Parses a storage tag back into a kind.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "verse" => Some(Self::Verse),
            "record" => Some(Self::Record),
            _ => None,
        }
    }
}

/// Natural compound key for a content unit.
///
/// Ordering follows `(kind, parent_id, sequence)` so sorted unit slices are
/// automatically in reading order within one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnitKey {
    pub kind: UnitKind,
    /// Grouping key under which units are ordered (chapter/book id).
    pub parent_id: i64,
    /// Per-parent ordinal (verse/record number).
    pub sequence: i64,
}

impl UnitKey {
    pub fn new(kind: UnitKind, parent_id: i64, sequence: i64) -> Self {
        Self {
            kind,
            parent_id,
            sequence,
        }
    }

    /// Compact `parent:sequence` form used by the reading-position slot.
    pub fn slot_value(&self) -> String {
        format!("{}:{}", self.parent_id, self.sequence)
    }
}

impl Display for UnitKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}:{}",
            self.kind.as_str(),
            self.parent_id,
            self.sequence
        )
    }
}

/// Validation error for content unit construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitValidationError {
    NonPositiveParent(i64),
    NonPositiveSequence(i64),
    EmptyText,
}

impl Display for UnitValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NonPositiveParent(value) => {
                write!(f, "parent_id must be positive, got {value}")
            }
            Self::NonPositiveSequence(value) => {
                write!(f, "sequence must be positive, got {value}")
            }
            Self::EmptyText => write!(f, "primary_text cannot be empty"),
        }
    }
}

impl Error for UnitValidationError {}

/// Canonical content record.
///
/// `metadata` carries secondary display lines (translations, annotations);
/// it is optional content, not identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentUnit {
    pub key: UnitKey,
    pub primary_text: String,
    #[serde(default)]
    pub metadata: Vec<String>,
}

impl ContentUnit {
    /// Creates a unit and checks model invariants.
    pub fn new(
        key: UnitKey,
        primary_text: impl Into<String>,
        metadata: Vec<String>,
    ) -> Result<Self, UnitValidationError> {
        let unit = Self {
            key,
            primary_text: primary_text.into(),
            metadata,
        };
        unit.validate()?;
        Ok(unit)
    }

    /// Validates key positivity and text presence.
    pub fn validate(&self) -> Result<(), UnitValidationError> {
        if self.key.parent_id <= 0 {
            return Err(UnitValidationError::NonPositiveParent(self.key.parent_id));
        }
        if self.key.sequence <= 0 {
            return Err(UnitValidationError::NonPositiveSequence(self.key.sequence));
        }
        if self.primary_text.trim().is_empty() {
            return Err(UnitValidationError::EmptyText);
        }
        Ok(())
    }
}

/// Returns whether `units` are sorted by `(parent_id, sequence)` and form
/// per-parent runs with no sequence gaps.
///
/// An empty slice counts as contiguous.
pub fn is_contiguous_run(units: &[ContentUnit]) -> bool {
    let mut previous: Option<UnitKey> = None;
    for unit in units {
        if let Some(prev) = previous {
            if unit.key.kind != prev.kind {
                return false;
            }
            let same_parent = unit.key.parent_id == prev.parent_id;
            if same_parent && unit.key.sequence != prev.sequence + 1 {
                return false;
            }
            if !same_parent && unit.key.parent_id <= prev.parent_id {
                return false;
            }
        }
        previous = Some(unit.key);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::{is_contiguous_run, ContentUnit, UnitKey, UnitKind, UnitValidationError};

    fn unit(parent: i64, seq: i64) -> ContentUnit {
        ContentUnit::new(
            UnitKey::new(UnitKind::Verse, parent, seq),
            format!("text {parent}:{seq}"),
            Vec::new(),
        )
        .expect("test unit should validate")
    }

    #[test]
    fn validates_key_and_text() {
        let bad_parent = ContentUnit::new(UnitKey::new(UnitKind::Verse, 0, 1), "x", Vec::new());
        assert_eq!(bad_parent, Err(UnitValidationError::NonPositiveParent(0)));

        let bad_seq = ContentUnit::new(UnitKey::new(UnitKind::Verse, 1, -2), "x", Vec::new());
        assert_eq!(bad_seq, Err(UnitValidationError::NonPositiveSequence(-2)));

        let blank = ContentUnit::new(UnitKey::new(UnitKind::Record, 1, 1), "   ", Vec::new());
        assert_eq!(blank, Err(UnitValidationError::EmptyText));
    }

    #[test]
    fn slot_value_uses_parent_and_sequence() {
        let key = UnitKey::new(UnitKind::Verse, 12, 34);
        assert_eq!(key.slot_value(), "12:34");
    }

    #[test]
    fn contiguous_run_accepts_gapless_multi_parent_slices() {
        let units = vec![unit(1, 6), unit(1, 7), unit(2, 1), unit(2, 2)];
        assert!(is_contiguous_run(&units));
        assert!(is_contiguous_run(&[]));
    }

    #[test]
    fn contiguous_run_rejects_gaps_and_disorder() {
        assert!(!is_contiguous_run(&[unit(1, 1), unit(1, 3)]));
        assert!(!is_contiguous_run(&[unit(2, 1), unit(1, 1)]));
    }
}
