//! Reading position record.
//!
//! # Responsibility
//! - Represent the single "last read" slot persisted per device.
//!
//! # Invariants
//! - Overwritten on every qualifying visibility event or explicit selection.
//! - Never deleted except by explicit reset.

use serde::{Deserialize, Serialize};

/// Last-read marker persisted to the durable single-value slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadingPosition {
    /// Compact `parent:sequence` key of the anchoring unit.
    pub unit_key: String,
    /// Page the unit was on when saved.
    pub page_number: i64,
    /// Save time in unix epoch milliseconds.
    pub saved_at_ms: i64,
}

impl ReadingPosition {
    pub fn new(unit_key: impl Into<String>, page_number: i64, saved_at_ms: i64) -> Self {
        Self {
            unit_key: unit_key.into(),
            page_number,
            saved_at_ms,
        }
    }
}
