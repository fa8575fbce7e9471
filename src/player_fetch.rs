//! Player page extraction: the roster gallery on the league page, the bio
//! block on a player profile, and the season-by-season history list.

use anyhow::Result;
use scraper::{ElementRef, Html, Selector};

use crate::http_client::fetch_document;

#[derive(Debug, Clone)]
pub struct RosterEntry {
    pub name: String,
    pub team: String,
    pub url: String,
}

#[derive(Debug, Clone, Default)]
pub struct PlayerBio {
    pub date_of_birth: String,
    pub height: String,
    pub number: String,
}

/// One `(season, entry)` pair per season, in page order. Entries for a season
/// that appears twice are comma-joined.
pub type SeasonHistory = Vec<(String, String)>;

pub fn fetch_roster(league_url: &str) -> Result<Vec<RosterEntry>> {
    let doc = fetch_document(league_url)?;
    Ok(parse_player_list(&doc))
}

/// One page fetch serves both the bio fields and the history list.
pub fn fetch_player_page(url: &str) -> Result<(PlayerBio, SeasonHistory)> {
    let doc = fetch_document(url)?;
    Ok((parse_player_bio(&doc), parse_player_history(&doc)))
}

pub fn parse_player_list(doc: &Html) -> Vec<RosterEntry> {
    let player_sel = Selector::parse(".player-gallery a.player").unwrap();
    let span_sel = Selector::parse("span").unwrap();

    let mut players = Vec::new();
    for tag in doc.select(&player_sel) {
        let Some(url) = tag.value().attr("href") else {
            continue;
        };
        // The anchor text leads with the name; the nested span holds the team.
        let name = first_text(&tag);
        let team = tag
            .select(&span_sel)
            .next()
            .map(|span| collapsed_text(&span))
            .unwrap_or_default();
        players.push(RosterEntry {
            name,
            team,
            url: url.to_string(),
        });
    }
    players
}

pub fn parse_player_bio(doc: &Html) -> PlayerBio {
    let dob_sel = Selector::parse("div.data-birthdate").unwrap();
    let height_sel = Selector::parse(r#"div.data-other[data-metric="גובה"]"#).unwrap();
    let general_item_sel = Selector::parse("ul.general li").unwrap();
    let label_sel = Selector::parse("span.label").unwrap();
    let number_sel = Selector::parse("span.data-number").unwrap();

    let dob_raw = doc
        .select(&dob_sel)
        .next()
        .map(|el| last_text(&el))
        .unwrap_or_default();
    let height = doc
        .select(&height_sel)
        .next()
        .map(|el| last_text(&el))
        .unwrap_or_default();

    let mut number = String::new();
    for item in doc.select(&general_item_sel) {
        let Some(label) = item.select(&label_sel).next() else {
            continue;
        };
        if !collapsed_text(&label).contains("מספר") {
            continue;
        }
        if let Some(data) = item.select(&number_sel).next() {
            number = collapsed_text(&data);
            break;
        }
    }

    PlayerBio {
        date_of_birth: format_birthdate(&dob_raw),
        height,
        number,
    }
}

/// History lines sit between `<br>` markers: a `span[title]` season label, a
/// team link, then a league link. Traversal stops after encountering more
/// than one youth-league entry; the rule is carried over literally from the
/// upstream behavior.
pub fn parse_player_history(doc: &Html) -> SeasonHistory {
    let container_sel = Selector::parse("div.data-teams").unwrap();
    let br_sel = Selector::parse("br").unwrap();

    let mut history: SeasonHistory = Vec::new();
    let Some(container) = doc.select(&container_sel).next() else {
        return history;
    };

    let mut youth_count = 0;
    for br in container.select(&br_sel) {
        let Some(season_span) = next_sibling_where(br, |el| {
            el.value().name() == "span" && el.value().attr("title").is_some()
        }) else {
            continue;
        };
        let season = normalize_season(collapsed_text(&season_span).as_str());

        let Some(team_link) = next_sibling_where(season_span, |el| el.value().name() == "a")
        else {
            continue;
        };
        let team = collapsed_text(&team_link);

        let Some(league_link) = next_sibling_where(team_link, |el| el.value().name() == "a")
        else {
            continue;
        };
        let league = collapsed_text(&league_link);

        if league.contains("נוער") {
            youth_count += 1;
            if youth_count > 1 {
                break;
            }
        }

        let entry = format!("{team} ({league})");
        match history.iter_mut().find(|(s, _)| s == &season) {
            Some((_, existing)) => {
                existing.push_str(", ");
                existing.push_str(&entry);
            }
            None => history.push((season, entry)),
        }
    }
    history
}

/// `2024-2025` → `2024-25`; anything else passes through.
pub fn normalize_season(raw: &str) -> String {
    let parts: Vec<&str> = raw.split('-').collect();
    if parts.len() == 2 {
        let chars: Vec<char> = parts[1].chars().collect();
        let tail: String = chars[chars.len().saturating_sub(2)..].iter().collect();
        format!("{}-{}", parts[0], tail)
    } else {
        raw.to_string()
    }
}

/// `YYYY-MM-DD` → `DD/MM/YYYY`; blank stays blank.
fn format_birthdate(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }
    let mut parts: Vec<&str> = raw.split('-').collect();
    parts.reverse();
    parts.join("/")
}

fn next_sibling_where<'a>(
    el: ElementRef<'a>,
    matches: impl Fn(&ElementRef<'a>) -> bool,
) -> Option<ElementRef<'a>> {
    el.next_siblings()
        .filter_map(ElementRef::wrap)
        .find(|sibling| matches(sibling))
}

fn collapsed_text(el: &ElementRef) -> String {
    el.text().collect::<String>().trim().to_string()
}

fn first_text(el: &ElementRef) -> String {
    el.text()
        .map(str::trim)
        .find(|t| !t.is_empty())
        .unwrap_or("")
        .to_string()
}

fn last_text(el: &ElementRef) -> String {
    el.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .last()
        .unwrap_or("")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn season_labels_shorten() {
        assert_eq!(normalize_season("2024-2025"), "2024-25");
        assert_eq!(normalize_season("2019-2020"), "2019-20");
        assert_eq!(normalize_season("2024"), "2024");
    }

    #[test]
    fn birthdate_reverses_into_slashes() {
        assert_eq!(format_birthdate("2000-05-14"), "14/05/2000");
        assert_eq!(format_birthdate(""), "");
    }
}
