use lectern_core::db::migrations::latest_version;
use lectern_core::db::{open_db, open_db_in_memory};

#[test]
fn in_memory_open_applies_latest_schema() {
    let conn = open_db_in_memory().unwrap();

    let version: u32 = conn
        .query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(version, latest_version());
    assert!(latest_version() > 0);
}

#[test]
fn migrated_schema_has_expected_tables() {
    let conn = open_db_in_memory().unwrap();

    let mut stmt = conn
        .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name;")
        .unwrap();
    let tables: Vec<String> = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();

    assert!(tables.contains(&"units".to_string()));
    assert!(tables.contains(&"metadata".to_string()));
}

#[test]
fn reopening_a_file_database_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lectern.db");

    {
        let conn = open_db(&path).unwrap();
        conn.execute(
            "INSERT INTO metadata (key, value) VALUES ('probe', '1');",
            [],
        )
        .unwrap();
    }

    let conn = open_db(&path).unwrap();
    let version: u32 = conn
        .query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(version, latest_version());

    let probe: String = conn
        .query_row("SELECT value FROM metadata WHERE key = 'probe';", [], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(probe, "1");
}
