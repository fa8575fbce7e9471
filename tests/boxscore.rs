use std::fs;
use std::path::PathBuf;

use scraper::Html;

use leumit_sync::game_fetch::{
    extract_game, extract_player_stats, extract_quarter_scores, extract_team_stats,
};
use leumit_sync::team_names::TeamNameMapping;

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

fn match_doc() -> Html {
    Html::parse_document(&read_fixture("match_page.html"))
}

#[test]
fn quarter_scores_cover_both_perspectives() {
    let quarters = extract_quarter_scores(&match_doc(), "101", &TeamNameMapping::default());
    assert_eq!(quarters.len(), 8);

    let first = &quarters[0];
    assert_eq!(first.get("game_id"), Some("101"));
    assert_eq!(first.get("team"), Some("הפועל גליל עליון"));
    assert_eq!(first.get("opponent"), Some("מכבי קרית גת"));
    assert_eq!(first.get("quarter"), Some("Q1"));
    assert_eq!(first.get("score"), Some("21"));
    assert_eq!(first.get("score_against"), Some("17"));

    // The away side's fourth-quarter cell is "-", which coerces to 0.
    let away_q4 = &quarters[7];
    assert_eq!(away_q4.get("team"), Some("מכבי קרית גת"));
    assert_eq!(away_q4.get("quarter"), Some("Q4"));
    assert_eq!(away_q4.get("score"), Some("0"));
    assert_eq!(away_q4.get("score_against"), Some("24"));
}

#[test]
fn malformed_results_table_yields_nothing() {
    let doc = Html::parse_document(
        r#"<table class="sp-event-results"><tbody>
        <tr><td class="data-name">קבוצה אחת</td><td class="data-one">12</td></tr>
        </tbody></table>"#,
    );
    let quarters = extract_quarter_scores(&doc, "1", &TeamNameMapping::default());
    assert!(quarters.is_empty());
}

#[test]
fn player_stats_drop_dnp_and_total_rows() {
    let stats = extract_player_stats(&match_doc(), "101", &TeamNameMapping::default());
    let names: Vec<&str> = stats
        .iter()
        .filter_map(|row| row.get("player_name"))
        .collect();
    // The 0:00 player and both total rows are gone.
    assert_eq!(names, ["דוד לוי", "יוני כהן", "עומר מזרחי"]);
}

#[test]
fn player_rows_normalize_all_fields() {
    let stats = extract_player_stats(&match_doc(), "101", &TeamNameMapping::default());

    let david = stats
        .iter()
        .find(|row| row.get("player_name") == Some("דוד לוי"))
        .expect("starter should be present");
    assert_eq!(david.get("team"), Some("הפועל גליל עליון"));
    assert_eq!(david.get("starter"), Some("1"));
    assert_eq!(david.get("min"), Some("24"));
    assert_eq!(david.get("number"), Some("7"));
    assert_eq!(
        david.get("player_url"),
        Some("https://example.org/player/david-levi/")
    );
    assert_eq!(david.get("2ptm"), Some("7"));
    assert_eq!(david.get("2pta"), Some("12"));
    assert_eq!(david.get("2pt_pct"), Some("58.3"));
    assert_eq!(david.get("3pt_pct"), Some("33.3"));
    assert_eq!(david.get("fgm"), Some("8"));
    assert_eq!(david.get("fga"), Some("15"));
    assert_eq!(david.get("fg_pct"), Some("53.3"));
    assert_eq!(david.get("ft_pct"), Some("100"));
    assert!(!david.contains("fgs"));
    assert!(!david.contains("fgpercent"));
    assert!(!david.contains("pm"));
    assert!(!david.contains("#"));

    // 12:30 rounds up; the bench player carries starter = 0.
    let yoni = stats
        .iter()
        .find(|row| row.get("player_name") == Some("יוני כהן"))
        .unwrap();
    assert_eq!(yoni.get("starter"), Some("0"));
    assert_eq!(yoni.get("min"), Some("13"));

    // Bare-integer minutes pass through.
    let omer = stats
        .iter()
        .find(|row| row.get("player_name") == Some("עומר מזרחי"))
        .unwrap();
    assert_eq!(omer.get("min"), Some("31"));
    assert_eq!(omer.get("team"), Some("מכבי קרית גת"));
}

#[test]
fn team_totals_from_footer_and_from_label_scan() {
    let teams = extract_team_stats(&match_doc(), "101", &TeamNameMapping::default());
    assert_eq!(teams.len(), 2);

    // Home side has a structural tfoot total row.
    let home = &teams[0];
    assert_eq!(home.get("team"), Some("הפועל גליל עליון"));
    assert_eq!(home.get("pts"), Some("88"));
    assert_eq!(home.get("2ptm"), Some("30"));
    assert_eq!(home.get("2pta"), Some("55"));
    assert_eq!(home.get("2pt_pct"), Some("54.5"));
    assert_eq!(home.get("3pt_pct"), Some("38.1"));
    assert_eq!(home.get("fgm"), Some("38"));
    assert_eq!(home.get("fga"), Some("76"));
    assert_eq!(home.get("fg_pct"), Some("50"));
    assert_eq!(home.get("ft_pct"), Some("66.7"));
    // The untagged cell falls back to the header's column class.
    assert_eq!(home.get("rate"), Some("95"));
    assert!(!home.contains("min"));
    assert!(!home.contains("pm"));
    assert!(!home.contains("number"));

    // Supplemental labeled stats map through the fixed dictionary; unknown
    // labels stay verbatim.
    assert_eq!(home.get("second_chance_pts"), Some("12"));
    assert_eq!(home.get("bench_pts"), Some("20"));
    assert_eq!(home.get("fast_break_pts"), Some("9"));
    assert_eq!(home.get("points_in_paint"), Some("34"));
    assert_eq!(home.get("pts_off_turnovers"), Some("15"));
    assert_eq!(home.get("נקודות אחרונות:"), Some("3"));

    // Away side has no tfoot; the literal total label in the body is found.
    let away = &teams[1];
    assert_eq!(away.get("team"), Some("מכבי קרית גת"));
    assert_eq!(away.get("pts"), Some("58"));
    assert_eq!(away.get("to"), Some("16"));
    assert_eq!(away.get("ft_pct"), Some("72.7"));
}

#[test]
fn full_extract_is_nonempty_for_published_game() {
    let extract = extract_game(&match_doc(), "101", &TeamNameMapping::default());
    assert!(!extract.is_empty());
    assert_eq!(extract.quarters.len(), 8);
    assert_eq!(extract.player_stats.len(), 3);
    assert_eq!(extract.team_stats.len(), 2);
}

#[test]
fn unpublished_game_extracts_empty() {
    let doc = Html::parse_document("<html><body><p>אין נתונים</p></body></html>");
    let extract = extract_game(&doc, "999", &TeamNameMapping::default());
    assert!(extract.is_empty());
}
