use std::fs;
use std::path::PathBuf;

use scraper::Html;

use leumit_sync::player_fetch::{parse_player_bio, parse_player_history, parse_player_list};
use leumit_sync::schedule_feed::extract_league_id;

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

#[test]
fn roster_gallery_yields_name_team_and_url() {
    let doc = Html::parse_document(&read_fixture("league_page.html"));
    let roster = parse_player_list(&doc);
    assert_eq!(roster.len(), 3);

    assert_eq!(roster[0].name, "דוד לוי");
    assert_eq!(roster[0].team, "הפועל גליל עליון");
    assert_eq!(roster[0].url, "https://example.org/player/david-levi/");

    // Whitespace around the team label is stripped at extraction.
    assert_eq!(roster[2].name, "עומר מזרחי");
    assert_eq!(roster[2].team, "מכבי קרית גת");
}

#[test]
fn league_page_exposes_the_export_league_id() {
    let doc = Html::parse_document(&read_fixture("league_page.html"));
    assert_eq!(extract_league_id(&doc).as_deref(), Some("482"));
}

#[test]
fn bio_fields_extract_and_reformat() {
    let doc = Html::parse_document(&read_fixture("player_page.html"));
    let bio = parse_player_bio(&doc);
    assert_eq!(bio.date_of_birth, "08/03/2001");
    assert_eq!(bio.height, "1.96");
    assert_eq!(bio.number, "7");
}

#[test]
fn bio_is_blank_when_page_has_no_header() {
    let doc = Html::parse_document("<html><body><p>ריק</p></body></html>");
    let bio = parse_player_bio(&doc);
    assert_eq!(bio.date_of_birth, "");
    assert_eq!(bio.height, "");
    assert_eq!(bio.number, "");
}

#[test]
fn history_stops_after_second_youth_entry() {
    let doc = Html::parse_document(&read_fixture("player_page.html"));
    let history = parse_player_history(&doc);

    // The second youth-league line ends traversal, so the 2023-24 youth
    // season and everything older never appear.
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].0, "2025-26");
    assert_eq!(history[0].1, "הפועל גליל עליון (ליגה לאומית)");

    // Two entries for the same season are comma-joined; the first youth
    // entry is still kept.
    assert_eq!(history[1].0, "2024-25");
    assert_eq!(
        history[1].1,
        "מכבי חיפה (ליגה לאומית), מכבי חיפה (ליגת נוער על)"
    );
}

#[test]
fn history_is_empty_without_the_teams_block() {
    let doc = Html::parse_document("<html><body></body></html>");
    assert!(parse_player_history(&doc).is_empty());
}
