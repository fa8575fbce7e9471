//! Box-score extraction for a single match page: quarter scores, per-player
//! lines, and the team total row with its supplemental stat block. Missing
//! or malformed sections yield empty output; only a failed page fetch is an
//! error.

use anyhow::Result;
use scraper::{ElementRef, Html, Selector};

use crate::http_client::fetch_document;
use crate::numeric::{fmt, int_or_zero, pct};
use crate::store::Row;
use crate::team_names::TeamNameMapping;

const QUARTER_KEYS: [(&str, &str); 4] = [
    ("Q1", "td.data-one"),
    ("Q2", "td.data-two"),
    ("Q3", "td.data-three"),
    ("Q4", "td.data-four"),
];

/// Composite "made-attempted" columns and the integer pairs they split into.
const SHOOTING_SPLITS: [(&str, &str, &str); 3] = [
    ("fgs", "2ptm", "2pta"),
    ("threeps", "3ptm", "3pta"),
    ("fts", "ftm", "fta"),
];

/// Upstream percentage columns are unreliable and always discarded;
/// percentages are recomputed from made/attempted.
const DISCARDED_PERCENT_KEYS: [&str; 3] = ["fgpercent", "threeppercent", "ftpercent"];

/// Labeled-text block stats mapped to canonical field names. Unrecognized
/// labels are kept verbatim.
const SUPPLEMENTAL_STATS: [(&str, &str); 5] = [
    ("נקודות מהזדמנות שנייה:", "second_chance_pts"),
    ("נקודות ספסל:", "bench_pts"),
    ("נקודות ממתפרצת:", "fast_break_pts"),
    ("נקודות בצבע:", "points_in_paint"),
    ("נקודות מאיבודים:", "pts_off_turnovers"),
];

const PLAYER_NAME_HEADER: &str = "שחקן";
const TOTAL_ROW_LABEL: &str = "סך הכל";

#[derive(Debug, Default)]
pub struct GameExtract {
    pub quarters: Vec<Row>,
    pub player_stats: Vec<Row>,
    pub team_stats: Vec<Row>,
}

impl GameExtract {
    pub fn is_empty(&self) -> bool {
        self.quarters.is_empty() && self.player_stats.is_empty() && self.team_stats.is_empty()
    }
}

pub fn fetch_game(game_url: &str, game_id: &str, mapping: &TeamNameMapping) -> Result<GameExtract> {
    let doc = fetch_document(game_url)?;
    Ok(extract_game(&doc, game_id, mapping))
}

pub fn extract_game(doc: &Html, game_id: &str, mapping: &TeamNameMapping) -> GameExtract {
    GameExtract {
        quarters: extract_quarter_scores(doc, game_id, mapping),
        player_stats: extract_player_stats(doc, game_id, mapping),
        team_stats: extract_team_stats(doc, game_id, mapping),
    }
}

/// Quarter-by-quarter scores, one row per team-perspective per quarter.
/// Anything other than exactly two team rows means a malformed page, which
/// is skipped rather than guessed at.
pub fn extract_quarter_scores(doc: &Html, game_id: &str, mapping: &TeamNameMapping) -> Vec<Row> {
    let table_sel = Selector::parse("table.sp-event-results").unwrap();
    let row_sel = Selector::parse("tbody tr").unwrap();
    let name_sel = Selector::parse("td.data-name").unwrap();
    let link_sel = Selector::parse("a").unwrap();

    let mut out = Vec::new();
    let Some(table) = doc.select(&table_sel).next() else {
        return out;
    };

    let mut team_rows: Vec<(String, ElementRef)> = Vec::new();
    for row in table.select(&row_sel) {
        let Some(cell) = row.select(&name_sel).next() else {
            continue;
        };
        let raw = cell
            .select(&link_sel)
            .next()
            .map(|link| collapsed_text(&link))
            .unwrap_or_else(|| collapsed_text(&cell));
        team_rows.push((mapping.resolve(&raw), row));
    }
    if team_rows.len() != 2 {
        log::warn!(
            "game {game_id}: expected 2 team rows in results table, found {}",
            team_rows.len()
        );
        return out;
    }

    let scores: Vec<[i64; 4]> = team_rows
        .iter()
        .map(|(_, row)| quarter_scores_of(row))
        .collect();

    for idx in 0..2 {
        let team = &team_rows[idx].0;
        let opponent = &team_rows[1 - idx].0;
        for (q, (label, _)) in QUARTER_KEYS.iter().enumerate() {
            let mut record = Row::new();
            record.insert("game_id", game_id);
            record.insert("team", team.clone());
            record.insert("opponent", opponent.clone());
            record.insert("quarter", *label);
            record.insert("score", scores[idx][q].to_string());
            record.insert("score_against", scores[1 - idx][q].to_string());
            out.push(record);
        }
    }
    out
}

fn quarter_scores_of(row: &ElementRef) -> [i64; 4] {
    let mut scores = [0i64; 4];
    for (q, (_, css)) in QUARTER_KEYS.iter().enumerate() {
        let sel = Selector::parse(css).unwrap();
        scores[q] = row
            .select(&sel)
            .next()
            .map(|cell| int_or_zero(&collapsed_text(&cell)))
            .unwrap_or(0);
    }
    scores
}

/// Per-player box-score lines for both teams. Header text maps each cell to
/// a field key (cell `data-key` attributes win over header text); players
/// with zero playing time are dropped entirely.
pub fn extract_player_stats(doc: &Html, game_id: &str, mapping: &TeamNameMapping) -> Vec<Row> {
    let section_sel = Selector::parse("div.sp-template-event-performance-values").unwrap();
    let caption_sel = Selector::parse("h4.sp-table-caption").unwrap();
    let table_sel = Selector::parse("table.sp-event-performance").unwrap();
    let header_sel = Selector::parse("thead tr th").unwrap();
    let body_row_sel = Selector::parse("tbody tr").unwrap();
    let cell_sel = Selector::parse("td").unwrap();
    let link_sel = Selector::parse("a").unwrap();

    let mut out = Vec::new();
    for section in doc.select(&section_sel) {
        let Some(caption) = section.select(&caption_sel).next() else {
            continue;
        };
        let team = mapping.resolve(&collapsed_text(&caption));
        let Some(table) = section.select(&table_sel).next() else {
            continue;
        };

        let headers: Vec<String> = table
            .select(&header_sel)
            .map(|th| collapsed_text(&th))
            .collect();

        for row in table.select(&body_row_sel) {
            if has_class(&row, "sp-total-row") {
                continue;
            }
            let mut stats = Row::new();
            stats.insert("game_id", game_id);
            stats.insert("team", team.clone());
            stats.insert("starter", if has_class(&row, "lineup") { "1" } else { "0" });

            for (idx, cell) in row.select(&cell_sel).enumerate() {
                let Some(header) = headers.get(idx) else {
                    continue;
                };
                if header == PLAYER_NAME_HEADER || has_class(&cell, "data-name") {
                    // The name column always yields both the display name and
                    // the profile reference, whatever its header says.
                    if let Some(link) = cell.select(&link_sel).next() {
                        stats.insert("player_name", collapsed_text(&link));
                        if let Some(href) = link.value().attr("href") {
                            stats.insert("player_url", href);
                        }
                    } else {
                        stats.insert("player_name", collapsed_text(&cell));
                    }
                } else {
                    let key = cell
                        .value()
                        .attr("data-key")
                        .map(str::to_string)
                        .unwrap_or_else(|| header.clone());
                    stats.insert(key, collapsed_text(&cell));
                }
            }

            if stats.is_blank("player_name") {
                continue;
            }
            // The source marks "did not play" with a zeroed clock.
            let minutes = stats.get("min").unwrap_or("00:00").to_string();
            if minutes == "00:00" || minutes == "0:00" {
                continue;
            }

            if let Some(number) = stats.remove("#") {
                stats.insert("number", number);
            }
            stats.insert("min", normalize_minutes(&minutes).to_string());
            stats.remove("pm");
            split_shooting_stats(&mut stats);
            out.push(stats);
        }
    }
    out
}

/// Team totals plus the supplemental labeled-text stats.
pub fn extract_team_stats(doc: &Html, game_id: &str, mapping: &TeamNameMapping) -> Vec<Row> {
    let section_sel = Selector::parse("div.sp-template-event-performance-values").unwrap();
    let caption_sel = Selector::parse("h4.sp-table-caption").unwrap();
    let table_sel = Selector::parse("table.sp-event-performance").unwrap();
    let header_sel = Selector::parse("thead tr th").unwrap();
    let cell_sel = Selector::parse("td").unwrap();

    let mut out = Vec::new();
    for section in doc.select(&section_sel) {
        let Some(caption) = section.select(&caption_sel).next() else {
            continue;
        };
        let team = mapping.resolve(&collapsed_text(&caption));
        let Some(table) = section.select(&table_sel).next() else {
            continue;
        };

        // Per-column semantic class tags, used when a total-row cell carries
        // no tag of its own.
        let header_keys: Vec<Option<String>> = table
            .select(&header_sel)
            .map(|th| data_key_from_classes(&th))
            .collect();

        let Some(total_row) = find_total_row(&table) else {
            log::warn!("game {game_id}: no total row found for '{team}'");
            continue;
        };

        let mut stats = Row::new();
        stats.insert("game_id", game_id);
        stats.insert("team", team.clone());

        for (idx, cell) in total_row.select(&cell_sel).enumerate() {
            if has_class(&cell, "data-name") {
                continue;
            }
            let key = data_key_from_classes(&cell)
                .or_else(|| header_keys.get(idx).cloned().flatten());
            if let Some(key) = key {
                stats.insert(key, collapsed_text(&cell));
            }
        }

        split_shooting_stats(&mut stats);
        for key in ["min", "pm", "#", "number"] {
            stats.remove(key);
        }
        apply_supplemental_stats(&section, &mut stats);
        out.push(stats);
    }
    out
}

/// Total-row detection heuristic, isolated so it can be swapped without
/// touching extraction: structural footer marker first, then a reverse scan
/// of body rows for the literal total label.
fn find_total_row<'a>(table: &ElementRef<'a>) -> Option<ElementRef<'a>> {
    let footer_sel = Selector::parse("tfoot tr.sp-total-row").unwrap();
    if let Some(row) = table.select(&footer_sel).next() {
        return Some(row);
    }
    let body_row_sel = Selector::parse("tbody tr").unwrap();
    let name_sel = Selector::parse("td.data-name").unwrap();
    let rows: Vec<ElementRef> = table.select(&body_row_sel).collect();
    rows.into_iter().rev().find(|row| {
        row.select(&name_sel)
            .next()
            .is_some_and(|cell| collapsed_text(&cell).contains(TOTAL_ROW_LABEL))
    })
}

fn apply_supplemental_stats(section: &ElementRef, stats: &mut Row) {
    let block_sel = Selector::parse("div.team-stats").unwrap();
    let label_sel = Selector::parse("label").unwrap();
    let span_sel = Selector::parse("span").unwrap();

    let Some(block) = section.select(&block_sel).next() else {
        return;
    };
    for label in block.select(&label_sel) {
        let name = first_own_text(&label);
        if name.is_empty() {
            continue;
        }
        let Some(value_span) = label.select(&span_sel).next() else {
            continue;
        };
        let value = collapsed_text(&value_span);
        let key = SUPPLEMENTAL_STATS
            .iter()
            .find(|(hebrew, _)| *hebrew == name)
            .map(|(_, canonical)| (*canonical).to_string())
            .unwrap_or(name);
        stats.insert(key, value);
    }
}

/// Decompose `"M-A"` composites into made/attempted integers, derive field
/// goal totals, and recompute every percentage from the split values.
pub fn split_shooting_stats(stats: &mut Row) {
    for (composite, made_key, att_key) in SHOOTING_SPLITS {
        let Some(raw) = stats.get(composite).map(str::to_string) else {
            continue;
        };
        if let Some((made, attempted)) = raw.split_once('-') {
            stats.remove(composite);
            stats.insert(made_key, int_or_zero(made).to_string());
            stats.insert(att_key, int_or_zero(attempted).to_string());
        }
    }
    // Pages occasionally deliver the split columns directly; those still go
    // through the same coercion.
    for key in ["2ptm", "2pta", "3ptm", "3pta", "ftm", "fta"] {
        if let Some(raw) = stats.get(key).map(str::to_string) {
            stats.insert(key, int_or_zero(&raw).to_string());
        }
    }

    let two_m = int_value(stats, "2ptm");
    let two_a = int_value(stats, "2pta");
    let three_m = int_value(stats, "3ptm");
    let three_a = int_value(stats, "3pta");
    let ftm = int_value(stats, "ftm");
    let fta = int_value(stats, "fta");

    let fgm = two_m + three_m;
    let fga = two_a + three_a;
    stats.insert("fgm", fgm.to_string());
    stats.insert("fga", fga.to_string());

    stats.insert("2pt_pct", fmt(pct(two_m as f64, two_a as f64)));
    stats.insert("3pt_pct", fmt(pct(three_m as f64, three_a as f64)));
    stats.insert("fg_pct", fmt(pct(fgm as f64, fga as f64)));
    stats.insert("ft_pct", fmt(pct(ftm as f64, fta as f64)));

    for key in DISCARDED_PERCENT_KEYS {
        stats.remove(key);
    }
}

/// `mm:ss` rounds to the nearest whole minute (30 seconds up); bare integers
/// pass through; anything else coerces to 0.
pub fn normalize_minutes(raw: &str) -> i64 {
    if let Some((minutes, seconds)) = raw.split_once(':') {
        let (Ok(minutes), Ok(seconds)) = (
            minutes.trim().parse::<i64>(),
            seconds.trim().parse::<i64>(),
        ) else {
            return 0;
        };
        if seconds >= 30 { minutes + 1 } else { minutes }
    } else {
        raw.trim().parse::<i64>().unwrap_or(0)
    }
}

fn int_value(stats: &Row, key: &str) -> i64 {
    stats.get(key).map(int_or_zero).unwrap_or(0)
}

fn has_class(el: &ElementRef, class: &str) -> bool {
    el.value()
        .attr("class")
        .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
}

fn data_key_from_classes(el: &ElementRef) -> Option<String> {
    el.value()
        .attr("class")?
        .split_whitespace()
        .find_map(|c| c.strip_prefix("data-"))
        .map(str::to_string)
}

fn collapsed_text(el: &ElementRef) -> String {
    el.text().collect::<String>().trim().to_string()
}

fn first_own_text(el: &ElementRef) -> String {
    el.children()
        .find_map(|child| child.value().as_text().map(|t| t.trim().to_string()))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minutes_round_at_thirty_seconds() {
        assert_eq!(normalize_minutes("24:29"), 24);
        assert_eq!(normalize_minutes("24:30"), 25);
        assert_eq!(normalize_minutes("31"), 31);
        assert_eq!(normalize_minutes("n/a"), 0);
    }

    #[test]
    fn shooting_splits_decompose_and_recompute() {
        let mut stats = Row::new();
        stats.insert("fgs", "7-12");
        stats.insert("threeps", "2-5");
        stats.insert("fts", "3-4");
        stats.insert("fgpercent", "57%");
        split_shooting_stats(&mut stats);

        assert!(!stats.contains("fgs"));
        assert!(!stats.contains("fgpercent"));
        assert_eq!(stats.get("2ptm"), Some("7"));
        assert_eq!(stats.get("2pta"), Some("12"));
        assert_eq!(stats.get("2pt_pct"), Some("58.3"));
        assert_eq!(stats.get("fgm"), Some("9"));
        assert_eq!(stats.get("fga"), Some("17"));
        assert_eq!(stats.get("fg_pct"), Some("52.9"));
        assert_eq!(stats.get("ft_pct"), Some("75"));
    }

    #[test]
    fn zero_attempts_is_zero_percent() {
        let mut stats = Row::new();
        stats.insert("fgs", "0-0");
        split_shooting_stats(&mut stats);
        assert_eq!(stats.get("2pt_pct"), Some("0"));
        assert_eq!(stats.get("fg_pct"), Some("0"));
    }

    #[test]
    fn garbled_split_text_coerces_to_zero() {
        let mut stats = Row::new();
        stats.insert("fgs", "x-12");
        split_shooting_stats(&mut stats);
        assert_eq!(stats.get("2ptm"), Some("0"));
        assert_eq!(stats.get("2pta"), Some("12"));
    }
}
