// CSV exports: the pool with every pick made against it, and finished
// reviews.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone};
use serde::Serialize;
use tracing::info;

use snakedraft_core::{DraftSession, Review, SelectableEntry};

/// One exported row. Pick columns are blank for undrafted entries.
#[derive(Debug, Serialize)]
struct ExportRow<'a> {
    position: u32,
    title: &'a str,
    year: &'a str,
    url_slug: &'a str,
    suggested_by: Option<&'a str>,
    disabled: bool,
    selector: Option<&'a str>,
    global_order: Option<u32>,
    selector_order: Option<u32>,
    round_number: Option<u32>,
    round_order: Option<u32>,
    turn_order: Option<u32>,
    global_turn_number: Option<u32>,
    round_turn_number: Option<u32>,
}

impl<'a> From<&'a SelectableEntry> for ExportRow<'a> {
    fn from(item: &'a SelectableEntry) -> Self {
        let selection = item.selection.as_ref();
        let stamp = selection.map(|s| s.stamp);
        ExportRow {
            position: item.entry.position,
            title: &item.entry.title,
            year: &item.entry.year,
            url_slug: &item.entry.url_slug,
            suggested_by: item.entry.suggested_by.as_deref(),
            disabled: item.entry.disabled,
            selector: selection.map(|s| s.selector_name.as_str()),
            global_order: stamp.map(|s| s.global_order),
            selector_order: stamp.map(|s| s.individual_selector_order),
            round_number: stamp.map(|s| s.round_number),
            round_order: stamp.map(|s| s.round_order),
            turn_order: stamp.map(|s| s.turn_order),
            global_turn_number: stamp.map(|s| s.global_turn_number),
            round_turn_number: stamp.map(|s| s.round_turn_number),
        }
    }
}

/// File name for an export taken on `now`'s date.
pub fn export_file_name<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("{}-draft-pick-export.csv", now.format("%Y-%m-%d"))
}

/// Write every pool entry, in list order, to `{date}-draft-pick-export.csv`
/// under `dir`. An export from the same day is overwritten.
pub fn write_board<Tz: TimeZone>(
    dir: &Path,
    session: &DraftSession,
    now: &DateTime<Tz>,
) -> Result<PathBuf>
where
    Tz::Offset: std::fmt::Display,
{
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create export directory {}", dir.display()))?;
    let path = dir.join(export_file_name(now));

    let mut writer = csv::Writer::from_path(&path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    for item in session.pool().entries() {
        writer
            .serialize(ExportRow::from(item))
            .with_context(|| format!("failed to write entry {}", item.entry.position))?;
    }
    writer
        .flush()
        .with_context(|| format!("failed to flush {}", path.display()))?;

    info!(
        "Exported {} entries ({} picks) to {}",
        session.pool().len(),
        session.pool().current_order(),
        path.display()
    );
    Ok(path)
}

#[derive(Debug, Serialize)]
struct ReviewRow<'a> {
    film: &'a str,
    name: &'a str,
    score: Option<f64>,
}

/// File name for a review of `title` finished on `now`'s date.
pub fn review_file_name<Tz: TimeZone>(title: &str, year: &str, now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let title = title.replace(['/', '\\'], "-");
    format!(
        "review-export-{}-{}-{}.csv",
        title,
        year,
        now.format("%Y-%m-%d")
    )
}

/// Write one row per reviewer of `review` under `dir`.
pub fn write_review<Tz: TimeZone>(
    dir: &Path,
    review: &Review,
    now: &DateTime<Tz>,
) -> Result<PathBuf>
where
    Tz::Offset: std::fmt::Display,
{
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create export directory {}", dir.display()))?;
    let entry = review.entry();
    let path = dir.join(review_file_name(&entry.title, &entry.year, now));

    let mut writer = csv::Writer::from_path(&path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    for reviewer in review.reviewers() {
        writer
            .serialize(ReviewRow {
                film: &entry.title,
                name: &reviewer.person.name,
                score: reviewer.score,
            })
            .with_context(|| format!("failed to write score for {}", reviewer.person.name))?;
    }
    writer
        .flush()
        .with_context(|| format!("failed to flush {}", path.display()))?;

    info!("Exported review of '{}' to {}", entry.title, path.display());
    Ok(path)
}
