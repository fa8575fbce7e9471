//! Decides what actually needs re-fetching this run: player pages whose
//! persisted record is incomplete, and completed games whose box scores are
//! not yet in the quarter table. Everything else is served from prior state.

use std::collections::HashSet;

use crate::store::Row;

/// Identity/bio columns of the history table; anything else is a season entry.
pub const BIO_COLUMNS: [&str; 5] = ["Name", "Current Team", "Date Of Birth", "Height", "Number"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchReason {
    NewPlayer,
    MissingDob,
    MissingHeight,
    MissingNumber,
    NoHistory,
    Complete,
}

impl FetchReason {
    pub fn as_str(self) -> &'static str {
        match self {
            FetchReason::NewPlayer => "new player",
            FetchReason::MissingDob => "missing DOB",
            FetchReason::MissingHeight => "missing height",
            FetchReason::MissingNumber => "missing number",
            FetchReason::NoHistory => "no history data",
            FetchReason::Complete => "complete data",
        }
    }
}

/// Ordered rules, first match wins. Bio completeness is checked before
/// history so a player missing only a bio field reports that field, and a
/// player with full bio but an all-bio history row still gets flagged.
pub fn needs_detail_fetch(details: Option<&Row>, history: Option<&Row>) -> (bool, FetchReason) {
    let Some(details) = details else {
        return (true, FetchReason::NewPlayer);
    };
    if details.is_blank("Date Of Birth") {
        return (true, FetchReason::MissingDob);
    }
    if details.is_blank("Height") {
        return (true, FetchReason::MissingHeight);
    }
    if details.is_blank("Number") {
        return (true, FetchReason::MissingNumber);
    }
    if !has_any_history(history) {
        return (true, FetchReason::NoHistory);
    }
    (false, FetchReason::Complete)
}

/// True when the history row carries at least one populated season column.
pub fn has_any_history(history: Option<&Row>) -> bool {
    let Some(row) = history else {
        return false;
    };
    row.columns()
        .iter()
        .any(|col| !BIO_COLUMNS.contains(&col.as_str()) && !row.is_blank(col))
}

#[derive(Debug, Clone)]
pub struct GameRef {
    pub game_id: String,
    pub home: String,
    pub away: String,
}

/// A game is completed iff its recorded score is present and non-empty.
pub fn is_completed(schedule_row: &Row) -> bool {
    !schedule_row.is_blank("Home Score")
}

/// Game ids already present in the persisted quarter table. A game that
/// produced no rows on a previous run is deliberately absent here, so it is
/// retried instead of being silently marked done.
pub fn existing_game_ids(quarter_rows: &[Row]) -> HashSet<String> {
    quarter_rows
        .iter()
        .filter_map(|row| row.get("game_id"))
        .filter(|id| !id.trim().is_empty())
        .map(|id| id.to_string())
        .collect()
}

/// The delta set: completed games not yet scraped, in schedule order.
pub fn games_to_fetch(schedule: &[Row], existing: &HashSet<String>) -> Vec<GameRef> {
    let mut out = Vec::new();
    for row in schedule {
        if !is_completed(row) {
            continue;
        }
        let Some(code) = row.get("Code").map(str::trim).filter(|c| !c.is_empty()) else {
            continue;
        };
        let game_id = normalize_game_code(code);
        if existing.contains(&game_id) {
            continue;
        }
        out.push(GameRef {
            game_id,
            home: row.get("Home Team").unwrap_or("").to_string(),
            away: row.get("Away Team").unwrap_or("").to_string(),
        });
    }
    out
}

/// Workbook numeric cells may round-trip as "123.0"; ids compare in integer
/// form. Non-numeric ids pass through untouched.
fn normalize_game_code(code: &str) -> String {
    if let Ok(value) = code.parse::<f64>() {
        if value.fract() == 0.0 {
            return format!("{}", value as i64);
        }
    }
    code.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> Row {
        let mut row = Row::new();
        for (key, value) in pairs {
            row.insert(*key, *value);
        }
        row
    }

    #[test]
    fn new_player_wins_over_everything() {
        let (fetch, reason) = needs_detail_fetch(None, None);
        assert!(fetch);
        assert_eq!(reason, FetchReason::NewPlayer);
    }

    #[test]
    fn bio_gaps_are_checked_in_order() {
        let details = row(&[
            ("Name", "א"),
            ("Date Of Birth", ""),
            ("Height", ""),
            ("Number", ""),
        ]);
        assert_eq!(
            needs_detail_fetch(Some(&details), None).1,
            FetchReason::MissingDob
        );

        let details = row(&[
            ("Name", "א"),
            ("Date Of Birth", "01/01/2000"),
            ("Height", "1.95"),
            ("Number", " "),
        ]);
        assert_eq!(
            needs_detail_fetch(Some(&details), None).1,
            FetchReason::MissingNumber
        );
    }

    #[test]
    fn bio_only_history_row_still_flags_no_history() {
        let details = row(&[
            ("Name", "א"),
            ("Date Of Birth", "01/01/2000"),
            ("Height", "1.95"),
            ("Number", "7"),
        ]);
        let history = row(&[
            ("Name", "א"),
            ("Current Team", "ב"),
            ("Date Of Birth", "01/01/2000"),
            ("Height", "1.95"),
            ("Number", "7"),
        ]);
        let (fetch, reason) = needs_detail_fetch(Some(&details), Some(&history));
        assert!(fetch);
        assert_eq!(reason, FetchReason::NoHistory);
    }

    #[test]
    fn populated_history_completes_the_record() {
        let details = row(&[
            ("Name", "א"),
            ("Date Of Birth", "01/01/2000"),
            ("Height", "1.95"),
            ("Number", "7"),
        ]);
        let mut history = row(&[("Name", "א"), ("Current Team", "ב")]);
        history.insert("2024-25", "ב (לאומית)");
        let (fetch, reason) = needs_detail_fetch(Some(&details), Some(&history));
        assert!(!fetch);
        assert_eq!(reason, FetchReason::Complete);
    }

    #[test]
    fn delta_set_skips_scraped_and_unfinished_games() {
        let schedule = vec![
            row(&[("Code", "101.0"), ("Home Score", "88"), ("Home Team", "a"), ("Away Team", "b")]),
            row(&[("Code", "102"), ("Home Score", ""), ("Home Team", "c"), ("Away Team", "d")]),
            row(&[("Code", "103"), ("Home Score", "75"), ("Home Team", "e"), ("Away Team", "f")]),
        ];
        let existing: HashSet<String> = ["103".to_string()].into_iter().collect();
        let delta = games_to_fetch(&schedule, &existing);
        assert_eq!(delta.len(), 1);
        assert_eq!(delta[0].game_id, "101");
    }
}
