use std::fs;

use leumit_sync::store::{self, Row};
use tempfile::TempDir;

fn row(pairs: &[(&str, &str)]) -> Row {
    let mut row = Row::new();
    for (key, value) in pairs {
        row.insert(*key, *value);
    }
    row
}

#[test]
fn hebrew_text_round_trips_and_files_carry_a_bom() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("players.csv");

    let rows = vec![row(&[
        ("Name", "דוד לוי"),
        ("Team", "הפועל גליל עליון"),
        ("Number", "7"),
    ])];
    store::save(&rows, &path, &["Name", "Team", "Number"]).unwrap();

    let raw = fs::read(&path).unwrap();
    assert_eq!(raw[..3], [0xEF, 0xBB, 0xBF]);

    let loaded = store::load(&path).unwrap().expect("file exists");
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].get("Name"), Some("דוד לוי"));
    assert_eq!(loaded[0].get("Team"), Some("הפועל גליל עליון"));
}

#[test]
fn missing_tables_load_as_absent() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nope.csv");
    assert!(store::load(&path).unwrap().is_none());
}

#[test]
fn append_is_a_whole_file_rewrite_with_canonical_order() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("quarters.csv");
    let canonical = ["game_id", "team", "score"];

    store::save(
        &[row(&[("game_id", "1"), ("team", "א"), ("score", "21")])],
        &path,
        &canonical,
    )
    .unwrap();

    // The appended row brings a column the canonical order never named.
    store::append(
        &[row(&[
            ("extra", "x"),
            ("game_id", "2"),
            ("team", "ב"),
            ("score", "17"),
        ])],
        &path,
        &canonical,
    )
    .unwrap();

    let loaded = store::load(&path).unwrap().unwrap();
    assert_eq!(loaded.len(), 2);
    // Canonical columns lead; the unanticipated extra trails.
    assert_eq!(loaded[0].columns(), ["game_id", "team", "score", "extra"]);
    assert_eq!(loaded[0].get("extra"), Some(""));
    assert_eq!(loaded[1].get("extra"), Some("x"));
    assert_eq!(loaded[1].get("game_id"), Some("2"));
}

#[test]
fn unknown_columns_keep_first_seen_order() {
    let first = row(&[("b", "1"), ("a", "2")]);
    let second = row(&[("a", "3"), ("c", "4")]);
    let columns = store::ordered_columns(&[first, second], &["a"]);
    assert_eq!(columns, ["a", "b", "c"]);
}
