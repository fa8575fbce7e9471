//! CSV-backed tabular store. Tables are sequences of ordered rows; files are
//! written with a UTF-8 BOM so Hebrew team and player names open correctly in
//! spreadsheet tools. `append` is read-concatenate-rewrite, not a file-level
//! append: the whole table is rewritten with the canonical column order
//! followed by any extra columns in first-seen order.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

const BOM: &str = "\u{feff}";

/// A single record: column values plus insertion order, so dynamic columns
/// (season labels, unrecognized stat labels) keep a stable position.
#[derive(Debug, Clone, Default)]
pub struct Row {
    order: Vec<String>,
    values: HashMap<String, String>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        if !self.values.contains_key(&key) {
            self.order.push(key.clone());
        }
        self.values.insert(key, value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
        self.values.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn columns(&self) -> &[String] {
        &self.order
    }

    /// Missing and whitespace-only are the same condition everywhere a field
    /// is checked for completeness.
    pub fn is_blank(&self, key: &str) -> bool {
        self.get(key).is_none_or(|v| v.trim().is_empty())
    }
}

/// Load a table, or `None` when the file does not exist.
pub fn load(path: &Path) -> Result<Option<Vec<Row>>> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .with_context(|| format!("read table {}", path.display()))?;
    let raw = raw.strip_prefix(BOM).unwrap_or(&raw);

    let mut reader = csv::Reader::from_reader(raw.as_bytes());
    let headers: Vec<String> = reader
        .headers()
        .with_context(|| format!("parse headers in {}", path.display()))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.with_context(|| format!("parse row in {}", path.display()))?;
        let mut row = Row::new();
        for (header, field) in headers.iter().zip(record.iter()) {
            row.insert(header.clone(), field);
        }
        rows.push(row);
    }
    Ok(Some(rows))
}

/// Rewrite the table in full: canonical columns that exist come first, extra
/// columns follow in the order they were first seen.
pub fn save(rows: &[Row], path: &Path, canonical: &[&str]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create data dir {}", parent.display()))?;
    }
    let columns = ordered_columns(rows, canonical);

    let mut out: Vec<u8> = Vec::new();
    out.extend_from_slice(BOM.as_bytes());
    if !columns.is_empty() {
        let mut writer = csv::Writer::from_writer(&mut out);
        writer
            .write_record(&columns)
            .context("write header row")?;
        for row in rows {
            let record: Vec<&str> = columns
                .iter()
                .map(|col| row.get(col).unwrap_or(""))
                .collect();
            writer.write_record(&record).context("write data row")?;
        }
        writer.flush().context("flush csv writer")?;
    }
    fs::write(path, out).with_context(|| format!("write table {}", path.display()))?;
    Ok(())
}

/// Concatenate onto the existing table (if readable) and rewrite. An
/// unreadable existing file is replaced, not fatal.
pub fn append(rows: &[Row], path: &Path, canonical: &[&str]) -> Result<()> {
    let mut combined = match load(path) {
        Ok(Some(existing)) => existing,
        Ok(None) => Vec::new(),
        Err(err) => {
            log::warn!(
                "could not read existing {}, rewriting from scratch: {err:#}",
                path.display()
            );
            Vec::new()
        }
    };
    combined.extend(rows.iter().cloned());
    save(&combined, path, canonical)
}

pub fn ordered_columns(rows: &[Row], canonical: &[&str]) -> Vec<String> {
    let mut columns: Vec<String> = canonical
        .iter()
        .filter(|col| rows.iter().any(|row| row.contains(col)))
        .map(|col| col.to_string())
        .collect();
    for row in rows {
        for col in row.columns() {
            if !columns.iter().any(|c| c == col) {
                columns.push(col.clone());
            }
        }
    }
    columns
}
