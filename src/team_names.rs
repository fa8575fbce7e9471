//! Team identity resolution. The upstream pages spell the same team several
//! ways; a reference table maps every observed variant to one canonical name.

use std::collections::HashMap;
use std::path::Path;

use crate::store::{self, Row};

const VARIANT_COLUMNS: [&str; 3] = ["player_details_name", "schedule_team_name", "short_name"];

#[derive(Debug, Clone, Default)]
pub struct TeamNameMapping {
    map: HashMap<String, String>,
}

impl TeamNameMapping {
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Exact match first, then after trimming surrounding whitespace, then
    /// pass-through. Misses are logged, never fatal. An empty mapping is the
    /// degraded identity mode and stays silent.
    pub fn resolve(&self, name: &str) -> String {
        if self.map.is_empty() {
            return name.to_string();
        }
        if let Some(canonical) = self.map.get(name) {
            if canonical != name {
                log::info!("normalized team '{name}' -> '{canonical}'");
            }
            return canonical.clone();
        }
        let trimmed = name.trim();
        if let Some(canonical) = self.map.get(trimmed) {
            log::info!("normalized team '{name}' -> '{canonical}'");
            return canonical.clone();
        }
        log::warn!("no mapping found for team '{name}'");
        name.to_string()
    }
}

/// Build the finalized lookup from reference rows. Every variant maps to the
/// canonical name, and the canonical name maps to itself so repeated
/// resolution is idempotent.
pub fn build(rows: &[Row]) -> TeamNameMapping {
    let mut map = HashMap::new();
    for row in rows {
        let Some(canonical) = row
            .get("normalized_name")
            .map(str::trim)
            .filter(|name| !name.is_empty())
        else {
            continue;
        };
        for column in VARIANT_COLUMNS {
            if let Some(variant) = row.get(column) {
                if !variant.trim().is_empty() {
                    map.insert(variant.to_string(), canonical.to_string());
                }
            }
        }
        map.insert(canonical.to_string(), canonical.to_string());
    }
    TeamNameMapping { map }
}

/// Load the reference table. Missing or malformed files degrade resolution
/// to identity for the whole run; the pipeline keeps going with raw labels.
pub fn load(path: &Path) -> TeamNameMapping {
    match store::load(path) {
        Ok(Some(rows)) => {
            let mapping = build(&rows);
            log::info!(
                "loaded team mapping: {} teams, {} name variations",
                rows.len(),
                mapping.len()
            );
            mapping
        }
        Ok(None) => {
            log::warn!(
                "team mapping file not found: {}; continuing without team name normalization",
                path.display()
            );
            TeamNameMapping::default()
        }
        Err(err) => {
            log::warn!("error loading team mapping: {err:#}; continuing without normalization");
            TeamNameMapping::default()
        }
    }
}
