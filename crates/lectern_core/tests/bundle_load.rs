use lectern_core::{BundleConfig, BundleLoader, FsAssetReader, UnitKind};
use std::fs;
use std::path::Path;

fn write_asset(dir: &Path, name: &str, content: &str) {
    fs::write(dir.join(name), content).expect("fixture asset should write");
}

fn seeded_bundle_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("temp dir should create");
    write_asset(
        dir.path(),
        "verses.txt",
        "\
1|1|1|1|In the beginning
1|2|1|1|was the word
2|1|2|1|and the word
2|2|2|2|went on
",
    );
    write_asset(
        dir.path(),
        "records_01.json",
        r#"[
            {"parent_id": 1, "sequence": 1, "page": 1, "text": "first gloss", "notes": ["x", "y"]},
            {"parent_id": 2, "sequence": 1, "page": 2, "text": "second gloss"}
        ]"#,
    );
    // records_02.json is deliberately absent.
    dir
}

#[test]
fn loads_a_bundle_directory_from_disk() {
    let dir = seeded_bundle_dir();
    let reader = FsAssetReader::new(dir.path());
    let loader = BundleLoader::new(
        reader,
        BundleConfig {
            record_group_count: 2,
            ..BundleConfig::default()
        },
    );

    let catalog = loader.catalog();
    assert_eq!(catalog.page_count(), 2);
    assert_eq!(catalog.expected_count(UnitKind::Verse, 1), 2);
    assert_eq!(catalog.expected_count(UnitKind::Verse, 2), 2);
    assert_eq!(catalog.expected_count(UnitKind::Record, 1), 1);

    let verses = loader.get_by_parent(UnitKind::Verse, 1);
    assert_eq!(verses.len(), 2);
    assert_eq!(verses[0].primary_text, "In the beginning");

    let records = loader.get_by_parent(UnitKind::Record, 1);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].metadata, vec!["x".to_string(), "y".to_string()]);
}

#[test]
fn missing_record_groups_are_tolerated() {
    let dir = seeded_bundle_dir();
    let loader = BundleLoader::new(
        FsAssetReader::new(dir.path()),
        BundleConfig {
            record_group_count: 2,
            ..BundleConfig::default()
        },
    );

    // Group 2 has no file; its parents simply index to empty.
    assert!(loader.get_by_parent(UnitKind::Record, 99).is_empty());
    assert_eq!(loader.catalog().page_count(), 2);
}

#[test]
fn malformed_record_json_degrades_to_an_empty_group() {
    let dir = seeded_bundle_dir();
    write_asset(dir.path(), "records_02.json", "{ not json");

    let loader = BundleLoader::new(
        FsAssetReader::new(dir.path()),
        BundleConfig {
            record_group_count: 2,
            ..BundleConfig::default()
        },
    );

    // The broken group is skipped; the intact group still loads.
    assert_eq!(loader.get_by_parent(UnitKind::Record, 1).len(), 1);
    assert_eq!(loader.catalog().page_count(), 2);
}

#[test]
fn empty_directory_loads_an_empty_snapshot() {
    let dir = tempfile::tempdir().expect("temp dir should create");
    let loader = BundleLoader::new(FsAssetReader::new(dir.path()), BundleConfig::default());

    assert_eq!(loader.catalog().page_count(), 0);
    assert_eq!(loader.catalog().total_units(UnitKind::Verse), 0);
    assert!(loader.get_by_parent(UnitKind::Verse, 1).is_empty());
}
