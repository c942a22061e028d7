//! Windowed pagination engine.
//!
//! # Responsibility
//! - Maintain a sliding window of materialized pages around the page being
//!   read, extending it in both directions on sentinel triggers.
//! - Preserve the visual scroll anchor when content is prepended.
//!
//! # Invariants
//! - Window pages are strictly increasing by page number with no duplicates
//!   or gaps inside the window.
//! - Extension operations are mutually exclusive: they run only from the
//!   `Ready` state, so overlapping triggers become no-ops.
//! - A failed load leaves the window at its last-known-good contents.

use crate::bundle::AssetReader;
use crate::model::catalog::Catalog;
use crate::model::page::Page;
use crate::model::unit::{UnitKey, UnitKind};
use crate::resolve::TieredResolver;
use log::{debug, warn};

/// Pages fetched per extension trigger.
pub const EXTEND_BATCH_PAGES: i64 = 3;
/// Pages warmed beyond the window after the initial load.
pub const PREFETCH_PAGES: i64 = 3;
/// Deep-link highlight lifetime.
pub const HIGHLIGHT_DURATION_MS: i64 = 2000;

/// Session state machine for the pagination engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagerState {
    Idle,
    LoadingInitial,
    Ready,
    ExtendingDown,
    ExtendingUp,
    Error,
}

/// Scroll container collaborator.
///
/// The engine is agnostic to how heights are measured; it only needs the
/// scroll metrics before/after window mutations and a change notification.
pub trait Viewport {
    fn content_height(&self) -> f64;
    fn scroll_top(&self) -> f64;
    fn set_scroll_top(&mut self, value: f64);
    /// Called after every window mutation with the new sorted window.
    fn window_changed(&mut self, pages: &[Page]);
}

/// Bidirectional windowed pager over resolved verse pages.
pub struct PaginationEngine<'a, R: AssetReader, V: Viewport> {
    resolver: TieredResolver<'a, R>,
    catalog: &'a Catalog,
    viewport: V,
    state: PagerState,
    window: Vec<Page>,
    scroll_target: Option<UnitKey>,
    highlight_until_ms: Option<i64>,
    initial_scroll_done: bool,
}

impl<'a, R: AssetReader, V: Viewport> PaginationEngine<'a, R, V> {
    pub fn new(resolver: TieredResolver<'a, R>, catalog: &'a Catalog, viewport: V) -> Self {
        Self {
            resolver,
            catalog,
            viewport,
            state: PagerState::Idle,
            window: Vec::new(),
            scroll_target: None,
            highlight_until_ms: None,
            initial_scroll_done: false,
        }
    }

    pub fn state(&self) -> PagerState {
        self.state
    }

    pub fn window(&self) -> &[Page] {
        &self.window
    }

    pub fn page_numbers(&self) -> Vec<i64> {
        self.window.iter().map(Page::page_number).collect()
    }

    pub fn viewport(&self) -> &V {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut V {
        &mut self.viewport
    }

    /// Loads `target_page - 1 ..= target_page + 1` clamped to document
    /// bounds and enters `Ready`.
    ///
    /// A deep-link unit overrides the target page, arms a scroll target and
    /// a highlight pulse, and gates `extend_up` until the host confirms the
    /// initial scroll with [`mark_initial_scroll_complete`].
    ///
    /// [`mark_initial_scroll_complete`]: Self::mark_initial_scroll_complete
    pub fn load_initial_window(
        &mut self,
        target_page: i64,
        deep_link: Option<UnitKey>,
        now_ms: i64,
    ) {
        self.state = PagerState::LoadingInitial;
        self.window.clear();
        self.scroll_target = None;
        self.highlight_until_ms = None;

        let target = deep_link
            .and_then(|key| self.catalog.page_of(key.parent_id, key.sequence))
            .unwrap_or(target_page)
            .clamp(1, self.catalog.page_count().max(1));

        let first = (target - 1).max(1);
        let last = (target + 1).min(self.catalog.page_count());
        for page_number in first..=last {
            if let Some(page) = self.build_page(page_number) {
                self.window.push(page);
            }
        }

        if self.window.is_empty() {
            warn!(
                "event=pager_init module=pager status=error target={target} error_code=empty_window"
            );
            self.state = PagerState::Error;
            return;
        }

        if let Some(key) = deep_link {
            self.scroll_target = Some(key);
            self.highlight_until_ms = Some(now_ms + HIGHLIGHT_DURATION_MS);
            self.initial_scroll_done = false;
        } else {
            self.initial_scroll_done = true;
        }

        self.state = PagerState::Ready;
        self.viewport.window_changed(&self.window);
        debug!(
            "event=pager_init module=pager status=ok target={target} pages={:?}",
            self.page_numbers()
        );
    }

    /// Bottom-sentinel trigger: appends up to [`EXTEND_BATCH_PAGES`] pages.
    ///
    /// No-op while another load is in flight or when the window already ends
    /// at the document's final page.
    pub fn extend_down(&mut self) {
        if self.state != PagerState::Ready {
            return;
        }
        let Some(last) = self.window.last().map(Page::page_number) else {
            return;
        };
        if last >= self.catalog.page_count() {
            return;
        }

        self.state = PagerState::ExtendingDown;
        let stop = (last + EXTEND_BATCH_PAGES).min(self.catalog.page_count());
        for page_number in (last + 1)..=stop {
            if let Some(page) = self.build_page(page_number) {
                self.window.push(page);
            }
        }
        self.state = PagerState::Ready;
        self.viewport.window_changed(&self.window);
    }

    /// Top-sentinel trigger: prepends up to [`EXTEND_BATCH_PAGES`] pages and
    /// preserves the visual scroll anchor.
    ///
    /// Gated until the initial deep-link scroll completed, so an early
    /// sentinel fire cannot drag the window back toward page 1.
    pub fn extend_up(&mut self) {
        if self.state != PagerState::Ready || !self.initial_scroll_done {
            return;
        }
        let Some(first) = self.window.first().map(Page::page_number) else {
            return;
        };
        if first <= 1 {
            return;
        }

        self.state = PagerState::ExtendingUp;
        let height_before = self.viewport.content_height();
        let scroll_before = self.viewport.scroll_top();

        let start = (first - EXTEND_BATCH_PAGES).max(1);
        let mut prepended = Vec::new();
        for page_number in start..first {
            if let Some(page) = self.build_page(page_number) {
                prepended.push(page);
            }
        }
        if !prepended.is_empty() {
            prepended.append(&mut self.window);
            self.window = prepended;
        }

        self.state = PagerState::Ready;
        self.viewport.window_changed(&self.window);

        // Anchor: whatever was at the top of the viewport stays put.
        let height_delta = self.viewport.content_height() - height_before;
        if height_delta > 0.0 {
            self.viewport.set_scroll_top(scroll_before + height_delta);
        }
    }

    /// Explicit navigation: resets the window entirely and reloads around
    /// `page_number`.
    pub fn go_to_page(&mut self, page_number: i64, now_ms: i64) {
        self.load_initial_window(page_number, None, now_ms);
    }

    /// Warms the resolver memo for pages beyond the window without touching
    /// window state. Pure cache priming.
    pub fn prefetch_ahead(&mut self, pages: i64) {
        if self.state != PagerState::Ready {
            return;
        }
        let Some(last) = self.window.last().map(Page::page_number) else {
            return;
        };
        let stop = (last + pages).min(self.catalog.page_count());
        for page_number in (last + 1)..=stop {
            let Some(extent) = self.catalog.extent(page_number) else {
                continue;
            };
            for parent_id in extent.parent_ids() {
                let expected = self.catalog.expected_count(UnitKind::Verse, parent_id);
                self.resolver.resolve(UnitKind::Verse, parent_id, expected);
            }
        }
    }

    /// Takes the pending deep-link scroll target, if any.
    pub fn take_scroll_target(&mut self) -> Option<UnitKey> {
        self.scroll_target.take()
    }

    /// Host confirms the initial deep-link scroll has settled; `extend_up`
    /// is armed from here on.
    pub fn mark_initial_scroll_complete(&mut self) {
        self.initial_scroll_done = true;
    }

    /// Whether the deep-link highlight pulse is still visible.
    pub fn highlight_active(&self, now_ms: i64) -> bool {
        self.highlight_until_ms
            .is_some_and(|until_ms| now_ms < until_ms)
    }

    /// Materializes one page by resolving every parent its extent overlaps
    /// and slicing units to the extent range.
    fn build_page(&mut self, page_number: i64) -> Option<Page> {
        let extent = *self.catalog.extent(page_number)?;
        let mut units = Vec::new();
        for parent_id in extent.parent_ids() {
            let expected = self.catalog.expected_count(UnitKind::Verse, parent_id);
            let resolved = self.resolver.resolve(UnitKind::Verse, parent_id, expected);
            units.extend(
                resolved
                    .units
                    .into_iter()
                    .filter(|unit| extent.contains(unit.key.parent_id, unit.key.sequence)),
            );
        }
        units.sort_by_key(|unit| (unit.key.parent_id, unit.key.sequence));

        let page = Page::new(extent, units);
        if !page.is_complete() {
            debug!(
                "event=pager_build module=pager status=degraded page={page_number} units={}",
                page.units.len()
            );
        }
        Some(page)
    }
}
