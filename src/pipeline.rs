//! The three run phases: player details, game details, averages. Individual
//! fetch failures are logged and skipped; a failed phase precondition halts
//! the phases that depend on it while earlier outputs stay valid.

use std::collections::HashMap;
use std::path::Path;
use std::thread;

use anyhow::{Context, Result, anyhow, bail};

use crate::averages::{self, AverageTable};
use crate::config::RunConfig;
use crate::game_fetch;
use crate::planner::{self, BIO_COLUMNS};
use crate::player_fetch::{self, PlayerBio, SeasonHistory};
use crate::schedule_feed;
use crate::store::{self, Row};
use crate::team_names;

pub const PLAYER_DETAIL_COLUMNS: [&str; 5] = ["Name", "Team", "Date Of Birth", "Height", "Number"];

pub const QUARTER_COLUMNS: [&str; 6] =
    ["game_id", "team", "opponent", "quarter", "score", "score_against"];

pub const PLAYER_STAT_COLUMNS: [&str; 32] = [
    "game_id", "team", "number", "player_name", "player_url", "starter", "min", "pts",
    "2ptm", "2pta", "2pt_pct",
    "3ptm", "3pta", "3pt_pct",
    "fgm", "fga", "fg_pct",
    "ftm", "fta", "ft_pct",
    "def", "off", "reb", "pf", "pfa",
    "stl", "to", "ast", "blk", "blka", "rate", "pm",
];

pub const TEAM_STAT_COLUMNS: [&str; 31] = [
    "game_id", "team", "pts",
    "2ptm", "2pta", "2pt_pct",
    "3ptm", "3pta", "3pt_pct",
    "fgm", "fga", "fg_pct",
    "ftm", "fta", "ft_pct",
    "def", "off", "reb", "pf", "pfa",
    "stl", "to", "ast", "blk", "blka", "rate",
    "second_chance_pts", "bench_pts", "fast_break_pts",
    "points_in_paint", "pts_off_turnovers",
];

pub fn run(cfg: &RunConfig) -> Result<()> {
    log::info!("league auto-update started ({})", cfg.league);
    update_player_details(cfg).context("player details phase failed")?;
    update_game_details(cfg).context("game details phase failed")?;
    calculate_averages(cfg).context("averages phase failed")?;
    log::info!("all updates completed successfully");
    summarize_outputs(cfg);
    Ok(())
}

/// Phase 1: refresh the player details and history tables. Only players the
/// planner flags are fetched; everyone else is served from prior state.
pub fn update_player_details(cfg: &RunConfig) -> Result<()> {
    log::info!("step 1: updating player details");
    let mapping = team_names::load(&cfg.team_names_path());

    let existing_details = load_keyed_by_name(&cfg.player_details_path())?;
    let existing_history = load_keyed_by_name(&cfg.player_history_path())?;

    log::info!("fetching player list...");
    let roster = player_fetch::fetch_roster(&cfg.league_url).context("fetch player list")?;
    if roster.is_empty() {
        bail!("no players found on league page");
    }
    log::info!("found {} players", roster.len());

    let mut details_rows: Vec<Row> = Vec::new();
    let mut history_rows: Vec<Row> = Vec::new();
    let mut all_seasons: Vec<String> = Vec::new();
    let mut new_players = 0usize;
    let mut updated_players = 0usize;
    let mut skipped_players = 0usize;

    for (idx, player) in roster.iter().enumerate() {
        let team = mapping.resolve(&player.team);
        let details_row = existing_details.get(&player.name);
        let history_row = existing_history.get(&player.name);
        let (should_fetch, reason) = planner::needs_detail_fetch(details_row, history_row);

        let (bio, history): (PlayerBio, SeasonHistory) = if should_fetch {
            log::info!(
                "[{}/{}] fetching {} ({})",
                idx + 1,
                roster.len(),
                player.name,
                reason.as_str()
            );
            if details_row.is_none() {
                new_players += 1;
            } else {
                updated_players += 1;
            }
            let fetched = match player_fetch::fetch_player_page(&player.url) {
                Ok(pair) => pair,
                Err(err) => {
                    // Blank fields mean the planner flags this player again
                    // next run.
                    log::error!("failed to fetch player {}: {err:#}", player.name);
                    (PlayerBio::default(), SeasonHistory::default())
                }
            };
            thread::sleep(cfg.request_delay);
            fetched
        } else {
            skipped_players += 1;
            (carried_bio(details_row), carried_history(history_row))
        };

        for (season, _) in &history {
            if !all_seasons.contains(season) {
                all_seasons.push(season.clone());
            }
        }

        let mut details = Row::new();
        details.insert("Name", player.name.clone());
        details.insert("Team", team.clone());
        details.insert("Date Of Birth", bio.date_of_birth.clone());
        details.insert("Height", bio.height.clone());
        details.insert("Number", bio.number.clone());
        details_rows.push(details);

        let mut history_record = Row::new();
        history_record.insert("Name", player.name.clone());
        history_record.insert("Current Team", team);
        history_record.insert("Date Of Birth", bio.date_of_birth);
        history_record.insert("Height", bio.height);
        history_record.insert("Number", bio.number);
        for (season, entry) in history {
            history_record.insert(season, entry);
        }
        history_rows.push(history_record);
    }

    // Dynamic season columns, newest first.
    all_seasons.sort();
    all_seasons.reverse();
    let mut history_columns: Vec<&str> = BIO_COLUMNS.to_vec();
    history_columns.extend(all_seasons.iter().map(String::as_str));

    store::save(&details_rows, &cfg.player_details_path(), &PLAYER_DETAIL_COLUMNS)?;
    store::save(&history_rows, &cfg.player_history_path(), &history_columns)?;

    log::info!(
        "player details updated: total {} | new {} | updated {} | skipped {}",
        roster.len(),
        new_players,
        updated_players,
        skipped_players
    );
    Ok(())
}

/// Phase 2: refresh the schedule, then scrape box scores for the delta set
/// of completed games.
pub fn update_game_details(cfg: &RunConfig) -> Result<()> {
    log::info!("step 2: updating game details");
    let mapping = team_names::load(&cfg.team_names_path());

    let schedule = schedule_feed::download_schedule(cfg).context("download games schedule")?;
    if schedule.is_empty() {
        bail!("no games found in schedule feed");
    }
    if !schedule.iter().any(|row| row.contains("Home Score")) {
        bail!("'Home Score' column not found in schedule");
    }

    let completed = schedule.iter().filter(|row| planner::is_completed(row)).count();
    log::info!("found {completed} completed games");

    let existing_rows = match store::load(&cfg.quarters_path()) {
        Ok(rows) => rows.unwrap_or_default(),
        Err(err) => {
            log::warn!("could not read existing quarters table: {err:#}");
            Vec::new()
        }
    };
    let existing_ids = planner::existing_game_ids(&existing_rows);
    if !existing_ids.is_empty() {
        log::info!("already scraped: {} games", existing_ids.len());
    }

    let to_fetch = planner::games_to_fetch(&schedule, &existing_ids);
    if to_fetch.is_empty() {
        log::info!("all games already scraped");
        return Ok(());
    }
    log::info!("scraping {} new games", to_fetch.len());

    let mut all_quarters: Vec<Row> = Vec::new();
    let mut all_player_stats: Vec<Row> = Vec::new();
    let mut all_team_stats: Vec<Row> = Vec::new();

    for (count, game) in to_fetch.iter().enumerate() {
        log::info!(
            "[{}/{}] game {}: {} vs {}",
            count + 1,
            to_fetch.len(),
            game.game_id,
            game.home,
            game.away
        );
        match game_fetch::fetch_game(&cfg.match_url(&game.game_id), &game.game_id, &mapping) {
            Ok(extract) => {
                if extract.is_empty() {
                    // Absent from the quarter table, so it retries next run.
                    log::warn!(
                        "no stats found for game {} - may not have detailed stats yet",
                        game.game_id
                    );
                }
                all_quarters.extend(extract.quarters);
                all_player_stats.extend(extract.player_stats);
                all_team_stats.extend(extract.team_stats);
            }
            Err(err) => {
                log::error!("error scraping game {}: {err:#}; skipping", game.game_id);
            }
        }
        thread::sleep(cfg.request_delay);
    }

    if !all_quarters.is_empty() {
        store::append(&all_quarters, &cfg.quarters_path(), &QUARTER_COLUMNS)?;
        log::info!("saved {}", cfg.quarters_path().display());
    }
    if !all_player_stats.is_empty() {
        store::append(&all_player_stats, &cfg.player_stats_path(), &PLAYER_STAT_COLUMNS)?;
        log::info!("saved {}", cfg.player_stats_path().display());
    }
    if !all_team_stats.is_empty() {
        store::append(&all_team_stats, &cfg.team_stats_path(), &TEAM_STAT_COLUMNS)?;
        log::info!("saved {}", cfg.team_stats_path().display());
    }

    log::info!("game stats updated: {} new games scraped", to_fetch.len());
    Ok(())
}

/// Phase 3: fold the accumulated per-game tables into averages and ranks.
/// Pure table work; no network.
pub fn calculate_averages(cfg: &RunConfig) -> Result<()> {
    log::info!("step 3: calculating averages");

    let player_games = store::load(&cfg.player_stats_path())
        .context("read player stats")?
        .ok_or_else(|| anyhow!("no player stats found at {}", cfg.player_stats_path().display()))?;
    let team_games = store::load(&cfg.team_stats_path())
        .context("read team stats")?
        .ok_or_else(|| anyhow!("no team stats found at {}", cfg.team_stats_path().display()))?;

    let player_table = averages::player_averages(&player_games);
    save_average_table(&player_table, &cfg.player_averages_path())?;
    log::info!(
        "player averages calculated: {} players",
        player_table.rows.len()
    );

    let mut team_table = averages::team_averages(&team_games);
    let opponent_table = averages::opponent_averages(&team_games);
    if !opponent_table.rows.is_empty() {
        save_average_table(&opponent_table, &cfg.opponent_averages_path())?;
        log::info!(
            "opponent averages calculated: {} teams",
            opponent_table.rows.len()
        );
        averages::merge_points_allowed(&mut team_table, &opponent_table);
    }

    save_average_table(&team_table, &cfg.team_averages_path())?;
    log::info!("team averages calculated: {} teams", team_table.rows.len());
    Ok(())
}

fn save_average_table(table: &AverageTable, path: &Path) -> Result<()> {
    let columns: Vec<&str> = table.columns.iter().map(String::as_str).collect();
    store::save(&table.rows, path, &columns)
}

fn load_keyed_by_name(path: &Path) -> Result<HashMap<String, Row>> {
    Ok(store::load(path)?
        .unwrap_or_default()
        .into_iter()
        .filter_map(|row| {
            let name = row.get("Name")?.to_string();
            Some((name, row))
        })
        .collect())
}

/// Bio fields carried over from the persisted record for players the
/// planner marked complete.
fn carried_bio(details_row: Option<&Row>) -> PlayerBio {
    let field = |key: &str| {
        details_row
            .and_then(|row| row.get(key))
            .unwrap_or("")
            .to_string()
    };
    PlayerBio {
        date_of_birth: field("Date Of Birth"),
        height: field("Height"),
        number: field("Number"),
    }
}

fn carried_history(history_row: Option<&Row>) -> SeasonHistory {
    let Some(row) = history_row else {
        return SeasonHistory::default();
    };
    row.columns()
        .iter()
        .filter(|col| !BIO_COLUMNS.contains(&col.as_str()))
        .map(|col| (col.clone(), row.get(col).unwrap_or("").to_string()))
        .collect()
}

fn summarize_outputs(cfg: &RunConfig) {
    log::info!("summary of updated files:");
    for path in cfg.output_files() {
        match std::fs::metadata(&path) {
            Ok(meta) => log::info!("  {} ({:.1} KB)", path.display(), meta.len() as f64 / 1024.0),
            Err(_) => log::warn!("  {} (not found)", path.display()),
        }
    }
}
