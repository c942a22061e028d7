use lectern_core::bundle::AssetError;
use lectern_core::db::open_db_in_memory;
use lectern_core::pager::HIGHLIGHT_DURATION_MS;
use lectern_core::{
    AssetReader, BundleConfig, BundleLoader, ContentUnit, Page, PagerState, PaginationEngine,
    RemoteError, RemoteSource, SqliteUnitStore, TieredResolver, UnitKey, UnitKind, Viewport,
};
use std::cell::Cell;

const UNIT_HEIGHT: f64 = 10.0;

/// 18 verses over parents 1 (7), 2 (5), 3 (6), three per page, six pages.
/// Pages 1-3 are group 1, pages 4-6 group 2.
fn verses_text(skip_parent3_seq5: bool) -> String {
    let parents: [(i64, i64); 3] = [(1, 7), (2, 5), (3, 6)];
    let mut lines = String::new();
    let mut index = 0;
    for (parent, count) in parents {
        for seq in 1..=count {
            let page = index / 3 + 1;
            let group = if page <= 3 { 1 } else { 2 };
            index += 1;
            if skip_parent3_seq5 && parent == 3 && seq == 5 {
                continue;
            }
            lines.push_str(&format!("{parent}|{seq}|{page}|{group}|verse {parent}:{seq}\n"));
        }
    }
    lines
}

struct StaticAssets {
    verses: String,
}

impl AssetReader for StaticAssets {
    fn read(&self, name: &str) -> Result<String, AssetError> {
        if name == "verses.txt" {
            Ok(self.verses.clone())
        } else {
            Err(AssetError::NotFound(name.to_string()))
        }
    }
}

struct NullRemote {
    parent_calls: Cell<usize>,
}

impl NullRemote {
    fn new() -> Self {
        Self {
            parent_calls: Cell::new(0),
        }
    }
}

impl RemoteSource for NullRemote {
    fn fetch_by_parent(
        &self,
        _kind: UnitKind,
        parent_id: i64,
    ) -> Result<Vec<ContentUnit>, RemoteError> {
        self.parent_calls.set(self.parent_calls.get() + 1);
        if parent_id == 3 {
            return Ok((1..=6)
                .map(|seq| {
                    ContentUnit::new(
                        UnitKey::new(UnitKind::Verse, 3, seq),
                        format!("remote 3:{seq}"),
                        Vec::new(),
                    )
                    .unwrap()
                })
                .collect());
        }
        Ok(Vec::new())
    }

    fn fetch_range(
        &self,
        _kind: UnitKind,
        _offset: i64,
        _limit: i64,
    ) -> Result<Vec<ContentUnit>, RemoteError> {
        Ok(Vec::new())
    }
}

/// Fixed-height fake scroll container: every unit renders 10px tall.
struct FakeViewport {
    content_height: f64,
    scroll_top: f64,
}

impl FakeViewport {
    fn new() -> Self {
        Self {
            content_height: 0.0,
            scroll_top: 0.0,
        }
    }
}

impl Viewport for FakeViewport {
    fn content_height(&self) -> f64 {
        self.content_height
    }

    fn scroll_top(&self) -> f64 {
        self.scroll_top
    }

    fn set_scroll_top(&mut self, value: f64) {
        self.scroll_top = value;
    }

    fn window_changed(&mut self, pages: &[Page]) {
        let units: usize = pages.iter().map(|page| page.units.len()).sum();
        self.content_height = units as f64 * UNIT_HEIGHT;
    }
}

fn flattened_keys(window: &[Page]) -> Vec<UnitKey> {
    window
        .iter()
        .flat_map(|page| page.units.iter().map(|unit| unit.key))
        .collect()
}

fn assert_strictly_increasing(pages: &[i64]) {
    for pair in pages.windows(2) {
        assert!(pair[0] < pair[1], "window out of order: {pages:?}");
    }
}

#[test]
fn initial_window_centers_on_target_page() {
    let bundle = BundleLoader::new(
        StaticAssets {
            verses: verses_text(false),
        },
        BundleConfig::default(),
    );
    let conn = open_db_in_memory().unwrap();
    let store = SqliteUnitStore::new(&conn);
    let remote = NullRemote::new();
    let resolver = TieredResolver::new(&bundle, &store, &remote);
    let mut engine = PaginationEngine::new(resolver, bundle.catalog(), FakeViewport::new());

    engine.load_initial_window(3, None, 0);

    assert_eq!(engine.state(), PagerState::Ready);
    assert_eq!(engine.page_numbers(), vec![2, 3, 4]);
    assert!(engine.window().iter().all(Page::is_complete));
    assert_eq!(engine.viewport().content_height(), 9.0 * UNIT_HEIGHT);
    assert_eq!(remote.parent_calls.get(), 0);
}

#[test]
fn window_stays_sorted_and_unique_through_extensions() {
    let bundle = BundleLoader::new(
        StaticAssets {
            verses: verses_text(false),
        },
        BundleConfig::default(),
    );
    let conn = open_db_in_memory().unwrap();
    let store = SqliteUnitStore::new(&conn);
    let remote = NullRemote::new();
    let resolver = TieredResolver::new(&bundle, &store, &remote);
    let mut engine = PaginationEngine::new(resolver, bundle.catalog(), FakeViewport::new());

    engine.load_initial_window(3, None, 0);
    engine.extend_down();
    assert_eq!(engine.page_numbers(), vec![2, 3, 4, 5, 6]);

    engine.extend_up();
    assert_eq!(engine.page_numbers(), vec![1, 2, 3, 4, 5, 6]);

    // Both edges are saturated: further triggers are no-ops.
    engine.extend_down();
    engine.extend_up();
    let pages = engine.page_numbers();
    assert_eq!(pages, vec![1, 2, 3, 4, 5, 6]);
    assert_strictly_increasing(&pages);
    assert_eq!(engine.state(), PagerState::Ready);
}

#[test]
fn extend_up_preserves_the_visual_scroll_anchor() {
    let bundle = BundleLoader::new(
        StaticAssets {
            verses: verses_text(false),
        },
        BundleConfig::default(),
    );
    let conn = open_db_in_memory().unwrap();
    let store = SqliteUnitStore::new(&conn);
    let remote = NullRemote::new();
    let resolver = TieredResolver::new(&bundle, &store, &remote);
    let mut engine = PaginationEngine::new(resolver, bundle.catalog(), FakeViewport::new());

    engine.load_initial_window(5, None, 0);
    assert_eq!(engine.page_numbers(), vec![4, 5, 6]);

    // Reader sits 25px in: the unit at index 2 is at the viewport top.
    engine.viewport_mut().set_scroll_top(25.0);
    let top_index = (engine.viewport().scroll_top() / UNIT_HEIGHT) as usize;
    let top_key_before = flattened_keys(engine.window())[top_index];
    let height_before = engine.viewport().content_height();

    engine.extend_up();
    assert_eq!(engine.page_numbers(), vec![1, 2, 3, 4, 5, 6]);

    let height_delta = engine.viewport().content_height() - height_before;
    assert_eq!(engine.viewport().scroll_top(), 25.0 + height_delta);

    let top_index_after = (engine.viewport().scroll_top() / UNIT_HEIGHT) as usize;
    let top_key_after = flattened_keys(engine.window())[top_index_after];
    assert_eq!(top_key_before, top_key_after);
}

#[test]
fn deep_link_arms_highlight_and_gates_extend_up() {
    let bundle = BundleLoader::new(
        StaticAssets {
            verses: verses_text(false),
        },
        BundleConfig::default(),
    );
    let conn = open_db_in_memory().unwrap();
    let store = SqliteUnitStore::new(&conn);
    let remote = NullRemote::new();
    let resolver = TieredResolver::new(&bundle, &store, &remote);
    let mut engine = PaginationEngine::new(resolver, bundle.catalog(), FakeViewport::new());

    // Verse 2:1 lives on page 3; the requested target page is overridden.
    let target = UnitKey::new(UnitKind::Verse, 2, 1);
    engine.load_initial_window(1, Some(target), 1_000);

    assert_eq!(engine.page_numbers(), vec![2, 3, 4]);
    assert_eq!(engine.take_scroll_target(), Some(target));
    assert!(engine.highlight_active(1_000 + HIGHLIGHT_DURATION_MS - 1));
    assert!(!engine.highlight_active(1_000 + HIGHLIGHT_DURATION_MS));

    // Top sentinel fires before the deep-link scroll settled: ignored.
    engine.extend_up();
    assert_eq!(engine.page_numbers(), vec![2, 3, 4]);

    engine.mark_initial_scroll_complete();
    engine.extend_up();
    assert_eq!(engine.page_numbers(), vec![1, 2, 3, 4]);
}

#[test]
fn go_to_page_resets_the_window() {
    let bundle = BundleLoader::new(
        StaticAssets {
            verses: verses_text(false),
        },
        BundleConfig::default(),
    );
    let conn = open_db_in_memory().unwrap();
    let store = SqliteUnitStore::new(&conn);
    let remote = NullRemote::new();
    let resolver = TieredResolver::new(&bundle, &store, &remote);
    let mut engine = PaginationEngine::new(resolver, bundle.catalog(), FakeViewport::new());

    engine.load_initial_window(1, None, 0);
    assert_eq!(engine.page_numbers(), vec![1, 2]);

    engine.go_to_page(6, 0);
    assert_eq!(engine.page_numbers(), vec![5, 6]);
    assert_eq!(engine.state(), PagerState::Ready);
}

#[test]
fn prefetch_warms_the_resolver_memo_without_touching_the_window() {
    // Parent 3 has a gap in the bundle (seq 5 missing), so resolving it
    // needs the remote tier.
    let bundle = BundleLoader::new(
        StaticAssets {
            verses: verses_text(true),
        },
        BundleConfig::default(),
    );
    let conn = open_db_in_memory().unwrap();
    let store = SqliteUnitStore::new(&conn);
    let remote = NullRemote::new();
    let resolver = TieredResolver::new(&bundle, &store, &remote);
    let mut engine = PaginationEngine::new(resolver, bundle.catalog(), FakeViewport::new());

    engine.load_initial_window(3, None, 0);
    assert_eq!(engine.page_numbers(), vec![2, 3, 4]);
    assert_eq!(remote.parent_calls.get(), 0);

    engine.prefetch_ahead(2);
    assert_eq!(engine.page_numbers(), vec![2, 3, 4]);
    assert_eq!(remote.parent_calls.get(), 1);

    // The extension reuses the warmed memo: no further remote traffic.
    engine.extend_down();
    assert_eq!(engine.page_numbers(), vec![2, 3, 4, 5, 6]);
    assert_eq!(remote.parent_calls.get(), 1);
}

#[test]
fn empty_document_leaves_engine_in_error_with_empty_window() {
    let bundle = BundleLoader::new(
        StaticAssets {
            verses: String::new(),
        },
        BundleConfig::default(),
    );
    let conn = open_db_in_memory().unwrap();
    let store = SqliteUnitStore::new(&conn);
    let remote = NullRemote::new();
    let resolver = TieredResolver::new(&bundle, &store, &remote);
    let mut engine = PaginationEngine::new(resolver, bundle.catalog(), FakeViewport::new());

    engine.load_initial_window(1, None, 0);

    assert_eq!(engine.state(), PagerState::Error);
    assert!(engine.window().is_empty());

    // Extension triggers in the error state stay no-ops.
    engine.extend_down();
    engine.extend_up();
    assert!(engine.window().is_empty());
}
