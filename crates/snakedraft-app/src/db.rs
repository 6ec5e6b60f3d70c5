// SQLite persistence layer for draft sessions.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use rusqlite::{params, Connection};

use snakedraft_core::{
    DraftStateData, EntrySelection, ListEntry, Person, SelectableEntry, SessionSnapshot,
};

/// SQLite-backed persistence for the roster, the pool and the picks made
/// against it.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) a SQLite database at `path` and ensure all tables
    /// exist. Pass `":memory:"` for an ephemeral in-memory database (useful
    /// for tests).
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA foreign_keys = ON;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS selectors (
                seat     INTEGER PRIMARY KEY,
                name     TEXT NOT NULL,
                color    TEXT NOT NULL UNIQUE COLLATE NOCASE,
                contrast TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS entries (
                position     INTEGER PRIMARY KEY,
                list_index   INTEGER NOT NULL,
                title        TEXT NOT NULL,
                year         TEXT NOT NULL,
                url_slug     TEXT NOT NULL DEFAULT '',
                poster_url   TEXT NOT NULL DEFAULT '',
                suggested_by TEXT,
                disabled     INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS draft_picks (
                global_order   INTEGER PRIMARY KEY,
                entry_position INTEGER NOT NULL REFERENCES entries(position),
                selector_color TEXT NOT NULL,
                selector_name  TEXT NOT NULL,
                stamp          TEXT NOT NULL,
                timestamp      TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );
            ",
        )
        .context("failed to create database schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the database connection.
    ///
    /// Panics if the mutex is poisoned (another thread panicked while
    /// holding the lock). This should never happen in normal operation.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }

    /// Replace the stored session with `snapshot` in one transaction.
    pub fn save_session(&self, snapshot: &SessionSnapshot) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin transaction")?;

        tx.execute("DELETE FROM draft_picks", [])
            .context("failed to delete draft picks")?;
        tx.execute("DELETE FROM entries", [])
            .context("failed to delete entries")?;
        tx.execute("DELETE FROM selectors", [])
            .context("failed to delete selectors")?;

        for (seat, person) in snapshot.selectors.iter().enumerate() {
            tx.execute(
                "INSERT INTO selectors (seat, name, color, contrast) VALUES (?1, ?2, ?3, ?4)",
                params![seat as i64, person.name, person.color, person.contrast],
            )
            .with_context(|| format!("failed to save selector {}", person.name))?;
        }

        for (list_index, item) in snapshot.entries.iter().enumerate() {
            let entry = &item.entry;
            tx.execute(
                "INSERT INTO entries
                    (position, list_index, title, year, url_slug, poster_url, suggested_by, disabled)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    entry.position,
                    list_index as i64,
                    entry.title,
                    entry.year,
                    entry.url_slug,
                    entry.poster_url,
                    entry.suggested_by,
                    entry.disabled,
                ],
            )
            .with_context(|| format!("failed to save entry {}", entry.position))?;

            if let Some(selection) = &item.selection {
                let stamp = serde_json::to_string(&selection.stamp)
                    .context("failed to serialize pick stamp")?;
                tx.execute(
                    "INSERT INTO draft_picks
                        (global_order, entry_position, selector_color, selector_name, stamp)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        selection.stamp.global_order,
                        entry.position,
                        selection.selector_color,
                        selection.selector_name,
                        stamp,
                    ],
                )
                .with_context(|| format!("failed to save pick for entry {}", entry.position))?;
            }
        }

        tx.commit().context("failed to commit save_session")?;
        Ok(())
    }

    /// Load the stored session. Returns `None` when nothing has been saved.
    pub fn load_session(&self) -> Result<Option<SessionSnapshot>> {
        let conn = self.conn();

        let selectors = conn
            .prepare("SELECT name, color, contrast FROM selectors ORDER BY seat")
            .context("failed to prepare selectors query")?
            .query_map([], |row| {
                Ok(Person {
                    name: row.get(0)?,
                    color: row.get(1)?,
                    contrast: row.get(2)?,
                })
            })
            .context("failed to query selectors")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map selector rows")?;

        let mut picks: HashMap<u32, EntrySelection> = HashMap::new();
        {
            let mut stmt = conn
                .prepare(
                    "SELECT entry_position, selector_color, selector_name, stamp
                     FROM draft_picks ORDER BY global_order",
                )
                .context("failed to prepare draft_picks query")?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((
                        row.get::<_, u32>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                })
                .context("failed to query draft picks")?;
            for row in rows {
                let (position, selector_color, selector_name, stamp_json) =
                    row.context("failed to read draft pick row")?;
                let stamp: DraftStateData = serde_json::from_str(&stamp_json)
                    .with_context(|| format!("failed to deserialize stamp for entry {position}"))?;
                picks.insert(
                    position,
                    EntrySelection {
                        selector_color,
                        selector_name,
                        stamp,
                    },
                );
            }
        }

        let entries = conn
            .prepare(
                "SELECT position, title, year, url_slug, poster_url, suggested_by, disabled
                 FROM entries ORDER BY list_index",
            )
            .context("failed to prepare entries query")?
            .query_map([], |row| {
                Ok(ListEntry {
                    position: row.get(0)?,
                    title: row.get(1)?,
                    year: row.get(2)?,
                    url_slug: row.get(3)?,
                    poster_url: row.get(4)?,
                    suggested_by: row.get(5)?,
                    disabled: row.get(6)?,
                })
            })
            .context("failed to query entries")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map entry rows")?;

        if selectors.is_empty() && entries.is_empty() {
            return Ok(None);
        }

        let entries = entries
            .into_iter()
            .map(|entry| {
                let selection = picks.remove(&entry.position);
                SelectableEntry { entry, selection }
            })
            .collect();

        Ok(Some(SessionSnapshot { selectors, entries }))
    }

    /// Returns `true` if at least one pick has been recorded.
    pub fn has_draft_in_progress(&self) -> Result<bool> {
        let conn = self.conn();
        let exists: bool = conn
            .query_row("SELECT EXISTS(SELECT 1 FROM draft_picks)", [], |row| {
                row.get(0)
            })
            .context("failed to check draft_picks existence")?;
        Ok(exists)
    }

    pub fn pick_count(&self) -> Result<usize> {
        let conn = self.conn();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM draft_picks", [], |row| row.get(0))
            .context("failed to count draft picks")?;
        Ok(count as usize)
    }

    /// Delete every pick, keeping the roster and pool.
    pub fn clear_draft(&self) -> Result<()> {
        let conn = self.conn();
        conn.execute("DELETE FROM draft_picks", [])
            .context("failed to delete draft picks")?;
        Ok(())
    }
}
