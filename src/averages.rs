//! Aggregation over the accumulated per-game tables: per-player, per-team,
//! and per-opponent averages with derived metrics and league ranks.
//!
//! Percentages are never averaged directly; they are recomputed from the
//! averaged made/attempted pairs to avoid average-of-ratios distortion.

use std::collections::{BTreeMap, HashMap};

use crate::numeric::{fmt, round1, round2};
use crate::store::Row;

const PLAYER_NUMERIC_COLUMNS: [&str; 22] = [
    "pts", "2ptm", "2pta", "3ptm", "3pta", "fgm", "fga", "ftm", "fta", "def", "off", "reb",
    "pf", "pfa", "stl", "to", "ast", "blk", "blka", "rate", "pm", "min",
];

/// Output order for the player table; anything else from the per-game rows
/// is dropped.
const PLAYER_AVERAGE_COLUMNS: [&str; 30] = [
    "player_name", "team", "games_played", "games_started", "min", "pts",
    "fgm", "fga", "fg_pct",
    "2ptm", "2pta", "2pt_pct",
    "3ptm", "3pta", "3pt_pct",
    "ftm", "fta", "ft_pct",
    "def", "off", "reb",
    "ast", "stl", "to", "pf", "pfa",
    "blk", "blka", "rate", "pm",
];

const TEAM_NUMERIC_COLUMNS: [&str; 25] = [
    "pts", "2ptm", "2pta", "3ptm", "3pta", "fgm", "fga", "ftm", "fta", "def", "off", "reb",
    "pf", "pfa", "stl", "to", "ast", "blk", "blka", "rate", "second_chance_pts", "bench_pts",
    "fast_break_pts", "points_in_paint", "pts_off_turnovers",
];

const PERCENT_SPECS: [(&str, &str, &str); 4] = [
    ("2ptm", "2pta", "2pt_pct"),
    ("3ptm", "3pta", "3pt_pct"),
    ("fgm", "fga", "fg_pct"),
    ("ftm", "fta", "ft_pct"),
];

const HIGHER_BETTER: [&str; 27] = [
    "pts", "fgm", "fga", "fg_pct", "2ptm", "2pta", "2pt_pct", "3ptm", "3pta", "3pt_pct",
    "ftm", "fta", "ft_pct", "def", "off", "reb", "ast", "stl", "blk", "pfa", "rate",
    "second_chance_pts", "bench_pts", "fast_break_pts", "points_in_paint",
    "pts_off_turnovers", "possessions",
];

const LOWER_BETTER: [&str; 3] = ["to", "pf", "blka"];

/// Not meaningful when framed from the opponent's side.
const OPPONENT_DROPPED: [&str; 2] = ["opp_bench_pts", "opp_pfa"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    HigherBetter,
    LowerBetter,
}

#[derive(Debug, Default)]
pub struct AverageTable {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

#[derive(Debug, Clone, Copy, Default)]
struct ColumnAcc {
    sum: f64,
    count: usize,
}

impl ColumnAcc {
    fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

/// Minimum-rank method: ties share the best eligible rank, and the next
/// distinct value skips accordingly.
pub fn min_rank(values: &[f64], direction: Direction) -> Vec<usize> {
    values
        .iter()
        .map(|v| {
            1 + values
                .iter()
                .filter(|other| match direction {
                    Direction::HigherBetter => **other > *v,
                    Direction::LowerBetter => **other < *v,
                })
                .count()
        })
        .collect()
}

/// Grouped by `(player_name, team)`: a player who changed teams mid-season
/// gets one row per team.
pub fn player_averages(player_games: &[Row]) -> AverageTable {
    #[derive(Default)]
    struct PlayerAcc {
        games: usize,
        started: f64,
        has_starter: bool,
        stats: HashMap<String, ColumnAcc>,
    }

    let mut groups: BTreeMap<(String, String), PlayerAcc> = BTreeMap::new();
    for row in player_games {
        let name = row.get("player_name").unwrap_or("").to_string();
        let team = row.get("team").unwrap_or("").to_string();
        let acc = groups.entry((name, team)).or_default();
        acc.games += 1;
        if row.contains("starter") {
            acc.has_starter = true;
            acc.started += parse_cell(row, "starter").unwrap_or(0.0);
        }
        for col in PLAYER_NUMERIC_COLUMNS {
            if let Some(value) = parse_cell(row, col) {
                acc.stats.entry(col.to_string()).or_default().add(value);
            }
        }
    }

    let mut rows = Vec::new();
    for ((name, team), acc) in &groups {
        let mut values: HashMap<String, f64> = HashMap::new();
        for (col, col_acc) in &acc.stats {
            if let Some(mean) = col_acc.mean() {
                values.insert(col.clone(), mean);
            }
        }
        values.insert("games_played".to_string(), acc.games as f64);
        if acc.has_starter {
            values.insert("games_started".to_string(), acc.started);
        }
        recompute_percentages(&mut values, "");
        for value in values.values_mut() {
            *value = round1(*value);
        }

        let mut row = Row::new();
        row.insert("player_name", name.clone());
        row.insert("team", team.clone());
        for col in &PLAYER_AVERAGE_COLUMNS[2..] {
            if let Some(value) = values.get(*col) {
                row.insert(*col, fmt(*value));
            }
        }
        rows.push(row);
    }

    let columns = PLAYER_AVERAGE_COLUMNS
        .iter()
        .filter(|col| rows.iter().any(|row| row.contains(col)))
        .map(|col| col.to_string())
        .collect();
    AverageTable { columns, rows }
}

/// Team averages with the estimated-possessions derivation and per-stat
/// league ranks.
pub fn team_averages(team_games: &[Row]) -> AverageTable {
    let entities = accumulate_by_team(team_games, "");
    let stat_order = stat_order_for(&entities, &team_stat_order());
    build_ranked_table(&entities, &stat_order, team_rank_direction)
}

/// Every team inherits the other side's raw per-game stats under `opp_`;
/// games without exactly two team rows contribute nothing.
pub fn opponent_averages(team_games: &[Row]) -> AverageTable {
    let mut game_order: Vec<String> = Vec::new();
    let mut by_game: HashMap<String, Vec<&Row>> = HashMap::new();
    for row in team_games {
        let game_id = row.get("game_id").unwrap_or("").to_string();
        if !by_game.contains_key(&game_id) {
            game_order.push(game_id.clone());
        }
        by_game.entry(game_id).or_default().push(row);
    }

    let mut inherited: Vec<Row> = Vec::new();
    for game_id in &game_order {
        let sides = &by_game[game_id];
        if sides.len() != 2 {
            continue;
        }
        for (own, other) in [(sides[0], sides[1]), (sides[1], sides[0])] {
            let mut row = Row::new();
            row.insert("game_id", game_id.clone());
            row.insert("team", own.get("team").unwrap_or(""));
            for col in TEAM_NUMERIC_COLUMNS {
                if let Some(value) = other.get(col) {
                    row.insert(format!("opp_{col}"), value);
                }
            }
            inherited.push(row);
        }
    }

    let entities = accumulate_by_team(&inherited, "opp_");
    let order: Vec<String> = opponent_stat_order()
        .into_iter()
        .filter(|col| !OPPONENT_DROPPED.contains(&col.as_str()))
        .collect();
    let stat_order = stat_order_for(&entities, &order);
    build_ranked_table(&entities, &stat_order, opponent_rank_direction)
}

/// Fold points-allowed context into the team table, right next to the
/// team's own scoring columns.
pub fn merge_points_allowed(team_table: &mut AverageTable, opponent_table: &AverageTable) {
    if !opponent_table.columns.iter().any(|c| c == "opp_pts") {
        return;
    }
    let mut by_team: HashMap<String, (String, String)> = HashMap::new();
    for row in &opponent_table.rows {
        let Some(team) = row.get("team") else {
            continue;
        };
        by_team.insert(
            team.to_string(),
            (
                row.get("opp_pts").unwrap_or("").to_string(),
                row.get("opp_pts_rank").unwrap_or("").to_string(),
            ),
        );
    }

    for row in &mut team_table.rows {
        let Some(team) = row.get("team").map(str::to_string) else {
            continue;
        };
        if let Some((pts, rank)) = by_team.get(&team) {
            row.insert("pts_allowed", pts.clone());
            row.insert("pts_allowed_rank", rank.clone());
        }
    }

    let anchor = team_table
        .columns
        .iter()
        .position(|c| c == "pts_rank")
        .or_else(|| team_table.columns.iter().position(|c| c == "pts"));
    match anchor {
        Some(idx) => {
            team_table.columns.insert(idx + 1, "pts_allowed".to_string());
            team_table
                .columns
                .insert(idx + 2, "pts_allowed_rank".to_string());
        }
        None => {
            team_table.columns.push("pts_allowed".to_string());
            team_table.columns.push("pts_allowed_rank".to_string());
        }
    }
}

type Entity = (String, HashMap<String, f64>);

/// Group rows by team, average the numeric columns, and derive percentages
/// and possessions. `prefix` is empty for the team view and `opp_` for the
/// opponent view; the formulas are identical under the prefix.
fn accumulate_by_team(rows: &[Row], prefix: &str) -> Vec<Entity> {
    #[derive(Default)]
    struct TeamAcc {
        games: usize,
        stats: HashMap<String, ColumnAcc>,
    }

    let columns: Vec<String> = TEAM_NUMERIC_COLUMNS
        .iter()
        .map(|col| format!("{prefix}{col}"))
        .collect();

    let mut groups: BTreeMap<String, TeamAcc> = BTreeMap::new();
    for row in rows {
        let team = row.get("team").unwrap_or("").to_string();
        let acc = groups.entry(team).or_default();
        acc.games += 1;
        for col in &columns {
            if let Some(value) = parse_cell(row, col) {
                acc.stats.entry(col.clone()).or_default().add(value);
            }
        }
    }

    let mut entities = Vec::new();
    for (team, acc) in &groups {
        let mut values: HashMap<String, f64> = HashMap::new();
        for (col, col_acc) in &acc.stats {
            if let Some(mean) = col_acc.mean() {
                values.insert(col.clone(), mean);
            }
        }
        values.insert("games_played".to_string(), acc.games as f64);
        derive_possessions(&mut values, prefix);
        recompute_percentages(&mut values, prefix);

        let possessions_col = format!("{prefix}possessions");
        for (col, value) in values.iter_mut() {
            if *col != possessions_col {
                *value = round1(*value);
            }
        }
        entities.push((team.clone(), values));
    }
    entities
}

/// `fga + 0.44*fta - off + to`, the standard estimated-possessions formula,
/// kept at two decimals.
fn derive_possessions(values: &mut HashMap<String, f64>, prefix: &str) {
    let inputs = ["fga", "fta", "off", "to"]
        .map(|col| values.get(&format!("{prefix}{col}")).copied());
    let [Some(fga), Some(fta), Some(off), Some(to)] = inputs else {
        return;
    };
    values.insert(
        format!("{prefix}possessions"),
        round2(fga + 0.44 * fta - off + to),
    );
}

fn recompute_percentages(values: &mut HashMap<String, f64>, prefix: &str) {
    for (made, attempted, pct_col) in PERCENT_SPECS {
        let made_mean = values.get(&format!("{prefix}{made}")).copied();
        let att_mean = values.get(&format!("{prefix}{attempted}")).copied();
        let (Some(made_mean), Some(att_mean)) = (made_mean, att_mean) else {
            continue;
        };
        let pct = if att_mean > 0.0 {
            made_mean / att_mean * 100.0
        } else {
            0.0
        };
        values.insert(format!("{prefix}{pct_col}"), pct);
    }
}

fn team_stat_order() -> Vec<String> {
    let mut order: Vec<String> = TEAM_NUMERIC_COLUMNS.iter().map(|c| c.to_string()).collect();
    order.push("possessions".to_string());
    for (_, _, pct_col) in PERCENT_SPECS {
        order.push(pct_col.to_string());
    }
    order
}

/// The opponent table lists percentages before possessions; the team table
/// is the other way around.
fn opponent_stat_order() -> Vec<String> {
    let mut order: Vec<String> = TEAM_NUMERIC_COLUMNS
        .iter()
        .map(|c| format!("opp_{c}"))
        .collect();
    for (_, _, pct_col) in PERCENT_SPECS {
        order.push(format!("opp_{pct_col}"));
    }
    order.push("opp_possessions".to_string());
    order
}

fn stat_order_for(entities: &[Entity], order: &[String]) -> Vec<String> {
    order
        .iter()
        .filter(|col| entities.iter().any(|(_, values)| values.contains_key(*col)))
        .cloned()
        .collect()
}

fn team_rank_direction(col: &str) -> Option<Direction> {
    if HIGHER_BETTER.contains(&col) {
        Some(Direction::HigherBetter)
    } else if LOWER_BETTER.contains(&col) {
        Some(Direction::LowerBetter)
    } else {
        None
    }
}

/// Low opponent output is good, so polarity inverts. The exception is
/// turnovers, where forcing more is the defensive win.
fn opponent_rank_direction(col: &str) -> Option<Direction> {
    if !col.starts_with("opp_") {
        return None;
    }
    if col == "opp_to" {
        Some(Direction::HigherBetter)
    } else {
        Some(Direction::LowerBetter)
    }
}

fn build_ranked_table(
    entities: &[Entity],
    stat_order: &[String],
    rank_direction: impl Fn(&str) -> Option<Direction>,
) -> AverageTable {
    let mut ranks: HashMap<String, Vec<usize>> = HashMap::new();
    for col in stat_order {
        if let Some(direction) = rank_direction(col) {
            let values: Vec<f64> = entities
                .iter()
                .map(|(_, values)| values.get(col).copied().unwrap_or(0.0))
                .collect();
            ranks.insert(col.clone(), min_rank(&values, direction));
        }
    }

    let mut columns = vec!["team".to_string(), "games_played".to_string()];
    for col in stat_order {
        columns.push(col.clone());
        if ranks.contains_key(col) {
            columns.push(format!("{col}_rank"));
        }
    }

    let mut rows = Vec::new();
    for (idx, (team, values)) in entities.iter().enumerate() {
        let mut row = Row::new();
        row.insert("team", team.clone());
        row.insert(
            "games_played",
            fmt(values.get("games_played").copied().unwrap_or(0.0)),
        );
        for col in stat_order {
            if let Some(value) = values.get(col) {
                row.insert(col.clone(), fmt(*value));
            }
            if let Some(col_ranks) = ranks.get(col) {
                row.insert(format!("{col}_rank"), col_ranks[idx].to_string());
            }
        }
        rows.push(row);
    }

    AverageTable {
        columns,
        rows,
    }
}

fn parse_cell(row: &Row, col: &str) -> Option<f64> {
    row.get(col).and_then(|raw| raw.trim().parse::<f64>().ok())
}
