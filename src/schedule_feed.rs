//! Schedule feed: the league page exposes a workbook export link; the
//! workbook is downloaded and converted into the games-schedule table.

use std::io::Cursor;

use anyhow::{Context, Result, anyhow};
use calamine::{Data, Reader, Xlsx};
use scraper::{Html, Selector};

use crate::config::RunConfig;
use crate::http_client::{fetch_bytes, fetch_document};
use crate::store::{self, Row};

/// Pull the league id out of the export link's query string.
pub fn extract_league_id(doc: &Html) -> Option<String> {
    let export_sel = Selector::parse("a.export").unwrap();
    let href = doc.select(&export_sel).next()?.value().attr("href")?;
    let (_, tail) = href.split_once("league_id=")?;
    let id = tail.split('&').next().unwrap_or(tail);
    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}

/// Download the schedule workbook and rewrite `games_schedule.csv`.
pub fn download_schedule(cfg: &RunConfig) -> Result<Vec<Row>> {
    let doc = fetch_document(&cfg.league_url).context("fetch league page")?;
    let league_id = extract_league_id(&doc)
        .ok_or_else(|| anyhow!("could not find league_id in export link"))?;
    let feed_url = format!(
        "{}/?feed=xlsx&league_id={}",
        cfg.league_url.trim_end_matches('/'),
        league_id
    );
    let bytes = fetch_bytes(&feed_url).context("download schedule workbook")?;
    let rows = workbook_to_rows(&bytes).context("convert schedule workbook")?;
    store::save(&rows, &cfg.schedule_path(), &[])?;
    log::info!("games schedule updated: {} games", rows.len());
    Ok(rows)
}

/// Workbook-to-table conversion, isolated here: first sheet, first row as
/// headers, numeric cells rendered without a spurious decimal point.
pub fn workbook_to_rows(bytes: &[u8]) -> Result<Vec<Row>> {
    let mut workbook = Xlsx::new(Cursor::new(bytes.to_vec())).context("open workbook")?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| anyhow!("workbook has no sheets"))?
        .context("read first sheet")?;

    let mut sheet_rows = range.rows();
    let Some(header_cells) = sheet_rows.next() else {
        return Ok(Vec::new());
    };
    let headers: Vec<String> = header_cells.iter().map(cell_to_string).collect();

    let mut rows = Vec::new();
    for cells in sheet_rows {
        let mut row = Row::new();
        for (header, cell) in headers.iter().zip(cells.iter()) {
            if header.is_empty() {
                continue;
            }
            row.insert(header.clone(), cell_to_string(cell));
        }
        rows.push(row);
    }
    Ok(rows)
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) if f.fract() == 0.0 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt.as_f64().to_string(),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
        Data::Error(_) => String::new(),
    }
}
