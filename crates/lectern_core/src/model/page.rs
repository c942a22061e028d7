//! Page model for the windowed pagination engine.
//!
//! # Responsibility
//! - Describe the fixed extent of a page in natural-key terms.
//! - Hold materialized units for one page and report completeness.
//!
//! # Invariants
//! - A page's unit list is derived, never stored; it is recomputed each time
//!   the page is resolved.
//! - `units` are sorted by `(parent_id, sequence)` ascending; a detected gap
//!   marks the page incomplete, not invalid.

use crate::model::unit::{is_contiguous_run, ContentUnit};
use serde::{Deserialize, Serialize};

/// Boundary of a page expressed as inclusive `(parent, sequence)` endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageExtent {
    /// 1-based page number within the document.
    pub page_number: i64,
    pub start_parent_id: i64,
    pub start_sequence: i64,
    pub end_parent_id: i64,
    pub end_sequence: i64,
    /// Section/group the page belongs to (e.g. a reading division).
    pub group_id: i64,
}

impl PageExtent {
    /// Returns whether `(parent, sequence)` falls inside this extent.
    pub fn contains(&self, parent_id: i64, sequence: i64) -> bool {
        if parent_id < self.start_parent_id || parent_id > self.end_parent_id {
            return false;
        }
        if parent_id == self.start_parent_id && sequence < self.start_sequence {
            return false;
        }
        if parent_id == self.end_parent_id && sequence > self.end_sequence {
            return false;
        }
        true
    }

    /// Parent ids overlapped by this extent, in ascending order.
    pub fn parent_ids(&self) -> impl Iterator<Item = i64> {
        self.start_parent_id..=self.end_parent_id
    }
}

/// One materialized page held by the pagination window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub extent: PageExtent,
    pub units: Vec<ContentUnit>,
}

impl Page {
    pub fn new(extent: PageExtent, units: Vec<ContentUnit>) -> Self {
        Self { extent, units }
    }

    pub fn page_number(&self) -> i64 {
        self.extent.page_number
    }

    /// Returns whether the materialized units cover the extent without gaps.
    ///
    /// Completeness requires a non-empty, sorted, gap-free run whose first
    /// and last keys match the extent endpoints.
    pub fn is_complete(&self) -> bool {
        let (Some(first), Some(last)) = (self.units.first(), self.units.last()) else {
            return false;
        };
        if first.key.parent_id != self.extent.start_parent_id
            || first.key.sequence != self.extent.start_sequence
        {
            return false;
        }
        if last.key.parent_id != self.extent.end_parent_id
            || last.key.sequence != self.extent.end_sequence
        {
            return false;
        }
        is_contiguous_run(&self.units)
    }
}
