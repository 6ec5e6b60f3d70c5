// Candidate pool import from CSV.

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use snakedraft_core::ListEntry;

#[derive(Debug, thiserror::Error)]
pub enum PoolLoadError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },
}

/// One CSV row. Optional columns may be blank.
#[derive(Debug, Deserialize)]
struct RawEntry {
    position: u32,
    title: String,
    year: String,
    #[serde(default)]
    url_slug: String,
    #[serde(default)]
    poster_url: String,
    #[serde(default)]
    suggested_by: Option<String>,
    #[serde(default)]
    disabled: Option<bool>,
}

fn load_entries_from_reader<R: Read>(rdr: R) -> Result<Vec<ListEntry>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(rdr);
    let mut entries = Vec::new();
    let mut seen = HashSet::new();

    for result in reader.deserialize::<RawEntry>() {
        match result {
            Ok(raw) => {
                if raw.title.is_empty() {
                    warn!("skipping entry at position {}: empty title", raw.position);
                    continue;
                }
                if !seen.insert(raw.position) {
                    warn!("skipping '{}': duplicate position {}", raw.title, raw.position);
                    continue;
                }
                entries.push(ListEntry {
                    position: raw.position,
                    title: raw.title,
                    year: raw.year,
                    url_slug: raw.url_slug,
                    poster_url: raw.poster_url,
                    suggested_by: raw.suggested_by.filter(|s| !s.is_empty()),
                    disabled: raw.disabled.unwrap_or(false),
                });
            }
            Err(e) => {
                warn!("skipping malformed pool row: {}", e);
            }
        }
    }
    Ok(entries)
}

/// Load the candidate pool from a CSV file, in file order.
pub fn load_entries(path: &Path) -> Result<Vec<ListEntry>, PoolLoadError> {
    let file = std::fs::File::open(path).map_err(|e| PoolLoadError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    let entries = load_entries_from_reader(file).map_err(|e| PoolLoadError::Csv {
        path: path.display().to_string(),
        source: e,
    })?;
    info!("Loaded {} pool entries from {}", entries.len(), path.display());
    Ok(entries)
}
