use std::time::Duration;

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use reqwest::blocking::Client;
use scraper::Html;

const REQUEST_TIMEOUT_SECS: u64 = 10;
const FEED_TIMEOUT_SECS: u64 = 15;

static CLIENT: OnceCell<Client> = OnceCell::new();

pub fn http_client() -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("failed to build http client")
    })
}

/// Fetch a page and parse it into a document tree. Failures are the caller's
/// cue to treat the page as "no data" and move on.
pub fn fetch_document(url: &str) -> Result<Html> {
    let client = http_client()?;
    let resp = client
        .get(url)
        .send()
        .with_context(|| format!("fetch {url}"))?
        .error_for_status()
        .with_context(|| format!("fetch {url}"))?;
    let body = resp.text().with_context(|| format!("read body of {url}"))?;
    Ok(Html::parse_document(&body))
}

/// Fetch raw bytes. The workbook feed is slower than the HTML pages, so this
/// overrides the client timeout per request.
pub fn fetch_bytes(url: &str) -> Result<Vec<u8>> {
    let client = http_client()?;
    let resp = client
        .get(url)
        .timeout(Duration::from_secs(FEED_TIMEOUT_SECS))
        .send()
        .with_context(|| format!("fetch {url}"))?
        .error_for_status()
        .with_context(|| format!("fetch {url}"))?;
    let bytes = resp.bytes().with_context(|| format!("read body of {url}"))?;
    Ok(bytes.to_vec())
}
