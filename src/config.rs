use std::path::{Path, PathBuf};
use std::time::Duration;

/// Run configuration. Every component receives this explicitly; there are no
/// module-level path or URL globals.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub league: String,
    pub base_url: String,
    pub league_url: String,
    pub data_dir: PathBuf,
    pub request_delay: Duration,
    pub log_file: PathBuf,
}

impl RunConfig {
    /// Environment overrides on top of compiled defaults. `.env` is loaded by
    /// the binary before this runs.
    pub fn from_env() -> Self {
        let league = std::env::var("LEAGUE_NAME").unwrap_or_else(|_| "leumit".to_string());
        let base_url = std::env::var("BASE_URL")
            .unwrap_or_else(|_| "https://ibasketball.co.il".to_string());
        let league_url = std::env::var("LEAGUE_URL")
            .unwrap_or_else(|_| format!("{base_url}/league/2025-2/"));
        let data_dir = std::env::var("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data").join(&league));
        let delay_ms = std::env::var("REQUEST_DELAY_MS")
            .ok()
            .and_then(|val| val.parse::<u64>().ok())
            .unwrap_or(1000);
        let log_file = std::env::var("LOG_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("update_log.txt"));
        Self {
            league,
            base_url,
            league_url,
            data_dir,
            request_delay: Duration::from_millis(delay_ms),
            log_file,
        }
    }

    pub fn games_dir(&self) -> PathBuf {
        self.data_dir.join(format!("{}_games", self.league))
    }

    pub fn team_names_path(&self) -> PathBuf {
        self.data_dir.join("team_names.csv")
    }

    pub fn player_details_path(&self) -> PathBuf {
        self.data_dir
            .join(format!("{}_player_details.csv", self.league))
    }

    pub fn player_history_path(&self) -> PathBuf {
        self.data_dir
            .join(format!("{}_player_history.csv", self.league))
    }

    pub fn schedule_path(&self) -> PathBuf {
        self.games_dir().join("games_schedule.csv")
    }

    pub fn quarters_path(&self) -> PathBuf {
        self.games_dir().join("game_quarters.csv")
    }

    pub fn player_stats_path(&self) -> PathBuf {
        self.games_dir().join("game_player_stats.csv")
    }

    pub fn team_stats_path(&self) -> PathBuf {
        self.games_dir().join("game_team_stats.csv")
    }

    pub fn player_averages_path(&self) -> PathBuf {
        self.data_dir
            .join(format!("{}_player_averages.csv", self.league))
    }

    pub fn team_averages_path(&self) -> PathBuf {
        self.data_dir
            .join(format!("{}_team_averages.csv", self.league))
    }

    pub fn opponent_averages_path(&self) -> PathBuf {
        self.data_dir
            .join(format!("{}_opponent_averages.csv", self.league))
    }

    pub fn match_url(&self, game_id: &str) -> String {
        format!("{}/match/{}/", self.base_url, game_id)
    }

    /// All schema-significant output files, for the end-of-run summary.
    pub fn output_files(&self) -> Vec<PathBuf> {
        vec![
            self.player_details_path(),
            self.player_history_path(),
            self.player_averages_path(),
            self.team_averages_path(),
            self.opponent_averages_path(),
            self.schedule_path(),
            self.quarters_path(),
            self.player_stats_path(),
            self.team_stats_path(),
        ]
    }
}

impl RunConfig {
    /// Test construction rooted at an arbitrary directory.
    pub fn for_data_dir(league: &str, base_url: &str, league_url: &str, data_dir: &Path) -> Self {
        Self {
            league: league.to_string(),
            base_url: base_url.to_string(),
            league_url: league_url.to_string(),
            data_dir: data_dir.to_path_buf(),
            request_delay: Duration::from_millis(0),
            log_file: data_dir.join("update_log.txt"),
        }
    }
}
