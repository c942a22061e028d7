//! Parent-level unit catalog and page extent table.
//!
//! # Responsibility
//! - Answer "how many units does parent X have" for completeness checks.
//! - Map page numbers to their natural-key extents and groups.
//!
//! # Invariants
//! - Page extents are stored sorted by page number with no duplicates.
//! - Expected counts of zero mean "unknown", not "empty"; callers treat
//!   unknown counts as best-effort.

use crate::model::page::PageExtent;
use crate::model::unit::UnitKind;
use std::collections::BTreeMap;

/// Lightweight index of per-parent totals and page boundaries.
///
/// Built by the bundle loader at load time; owned by the data-access layer
/// and shared by reference with resolver, sync and pager.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    expected: BTreeMap<(UnitKind, i64), i64>,
    extents: Vec<PageExtent>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the total unit count for one parent, keeping the larger value
    /// when called repeatedly for the same parent.
    pub fn record_expected(&mut self, kind: UnitKind, parent_id: i64, count: i64) {
        let entry = self.expected.entry((kind, parent_id)).or_insert(0);
        if count > *entry {
            *entry = count;
        }
    }

    /// Expected unit count for a parent; 0 when unknown.
    pub fn expected_count(&self, kind: UnitKind, parent_id: i64) -> i64 {
        self.expected.get(&(kind, parent_id)).copied().unwrap_or(0)
    }

    /// Total units known for one kind across all parents.
    pub fn total_units(&self, kind: UnitKind) -> i64 {
        self.expected
            .iter()
            .filter(|((entry_kind, _), _)| *entry_kind == kind)
            .map(|(_, count)| *count)
            .sum()
    }

    /// Parent ids known for one kind, ascending.
    pub fn parent_ids(&self, kind: UnitKind) -> Vec<i64> {
        self.expected
            .keys()
            .filter(|(entry_kind, _)| *entry_kind == kind)
            .map(|(_, parent_id)| *parent_id)
            .collect()
    }

    /// Replaces the page extent table with a sorted, deduplicated copy.
    pub fn set_extents(&mut self, mut extents: Vec<PageExtent>) {
        extents.sort_by_key(|extent| extent.page_number);
        extents.dedup_by_key(|extent| extent.page_number);
        self.extents = extents;
    }

    /// Extent for a 1-based page number.
    pub fn extent(&self, page_number: i64) -> Option<&PageExtent> {
        self.extents
            .binary_search_by_key(&page_number, |extent| extent.page_number)
            .ok()
            .map(|index| &self.extents[index])
    }

    /// Number of pages in the document.
    pub fn page_count(&self) -> i64 {
        self.extents
            .last()
            .map_or(0, |extent| extent.page_number)
    }

    /// First page whose extent contains the given verse key, used by
    /// deep-link navigation.
    pub fn page_of(&self, parent_id: i64, sequence: i64) -> Option<i64> {
        self.extents
            .iter()
            .find(|extent| extent.contains(parent_id, sequence))
            .map(|extent| extent.page_number)
    }
}

#[cfg(test)]
mod tests {
    use super::Catalog;
    use crate::model::page::PageExtent;
    use crate::model::unit::UnitKind;

    fn extent(page: i64, start: (i64, i64), end: (i64, i64)) -> PageExtent {
        PageExtent {
            page_number: page,
            start_parent_id: start.0,
            start_sequence: start.1,
            end_parent_id: end.0,
            end_sequence: end.1,
            group_id: 1,
        }
    }

    #[test]
    fn expected_counts_keep_largest_observation() {
        let mut catalog = Catalog::new();
        catalog.record_expected(UnitKind::Verse, 1, 5);
        catalog.record_expected(UnitKind::Verse, 1, 7);
        catalog.record_expected(UnitKind::Verse, 1, 6);
        assert_eq!(catalog.expected_count(UnitKind::Verse, 1), 7);
        assert_eq!(catalog.expected_count(UnitKind::Verse, 2), 0);
        assert_eq!(catalog.expected_count(UnitKind::Record, 1), 0);
    }

    #[test]
    fn totals_are_per_kind() {
        let mut catalog = Catalog::new();
        catalog.record_expected(UnitKind::Verse, 1, 7);
        catalog.record_expected(UnitKind::Verse, 2, 3);
        catalog.record_expected(UnitKind::Record, 1, 4);
        assert_eq!(catalog.total_units(UnitKind::Verse), 10);
        assert_eq!(catalog.total_units(UnitKind::Record), 4);
        assert_eq!(catalog.parent_ids(UnitKind::Verse), vec![1, 2]);
    }

    #[test]
    fn extents_are_sorted_and_looked_up_by_page() {
        let mut catalog = Catalog::new();
        catalog.set_extents(vec![
            extent(2, (1, 6), (2, 2)),
            extent(1, (1, 1), (1, 5)),
            extent(3, (2, 3), (2, 8)),
        ]);
        assert_eq!(catalog.page_count(), 3);
        assert_eq!(
            catalog.extent(2).map(|e| (e.start_parent_id, e.start_sequence)),
            Some((1, 6))
        );
        assert!(catalog.extent(9).is_none());
        assert_eq!(catalog.page_of(2, 5), Some(3));
        assert_eq!(catalog.page_of(1, 2), Some(1));
        assert_eq!(catalog.page_of(9, 1), None);
    }
}
