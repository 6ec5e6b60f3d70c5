// Integration tests for the snake draft console app.
//
// These exercise the library crate end-to-end: CSV pool import, crash
// recovery through a real database file, the event loop driven over its
// channels, and the CSV export.

use std::path::{Path, PathBuf};

use snakedraft_app::app::{self, AppState};
use snakedraft_app::config::{self, Config};
use snakedraft_app::db::Database;
use snakedraft_app::pool_csv;
use snakedraft_app::protocol::{UiUpdate, UserCommand};
use snakedraft_core::Person;

use tokio::sync::mpsc;

// ===========================================================================
// Test helpers
// ===========================================================================

fn crate_path(rel: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join(rel)
}

fn roster() -> Vec<Person> {
    vec![
        Person::new("Ann", "#e6194b", "#ffffff"),
        Person::new("Ben", "#3cb44b", "#000000"),
        Person::new("Cat", "#4363d8", "#ffffff"),
    ]
}

/// Fresh scratch directory for one test.
fn scratch(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(name);
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn config_in(dir: &Path) -> Config {
    Config {
        pool_path: crate_path("tests/fixtures/films.csv").display().to_string(),
        db_path: dir.join("draft.db").display().to_string(),
        export_dir: dir.join("exports").display().to_string(),
        selectors: roster(),
    }
}

/// Run the event loop over `commands` (a Quit is appended) and collect
/// everything it sent to the console.
async fn drive(state: AppState, commands: Vec<UserCommand>) -> Vec<UiUpdate> {
    let (cmd_tx, cmd_rx) = mpsc::channel(64);
    let (ui_tx, mut ui_rx) = mpsc::channel(256);
    let handle = tokio::spawn(app::run(cmd_rx, ui_tx, state));

    for cmd in commands {
        cmd_tx.send(cmd).await.unwrap();
    }
    cmd_tx.send(UserCommand::Quit).await.unwrap();
    handle.await.unwrap().unwrap();

    let mut updates = Vec::new();
    while let Some(update) = ui_rx.recv().await {
        updates.push(update);
    }
    updates
}

fn start(config: &Config) -> (AppState, bool) {
    let entries = pool_csv::load_entries(Path::new(&config.pool_path)).unwrap();
    let db = Database::open(&config.db_path).unwrap();
    let (session, restored) =
        app::recover_from_db(&db, entries, config.selectors.clone()).unwrap();
    (AppState::new(config.clone(), session, db), restored)
}

// ===========================================================================
// Shipped files
// ===========================================================================

#[test]
fn default_config_is_valid() {
    let dir = scratch("snakedraft_it_defaults");
    std::fs::create_dir_all(dir.join("defaults")).unwrap();
    std::fs::copy(
        crate_path("defaults/draft.toml"),
        dir.join("defaults/draft.toml"),
    )
    .unwrap();

    let copied = config::ensure_config_files(&dir).unwrap();
    assert_eq!(copied.len(), 1);
    let config = config::load_config_from(&dir).unwrap();
    assert_eq!(config.selectors.len(), 3);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn bundled_pool_loads() {
    let entries = pool_csv::load_entries(&crate_path("data/films.csv")).unwrap();
    assert_eq!(entries.len(), 23);
    assert!(entries.iter().all(|e| !e.disabled));
}

#[test]
fn fixture_pool_loads_with_disabled_entry() {
    let entries = pool_csv::load_entries(&crate_path("tests/fixtures/films.csv")).unwrap();
    assert_eq!(entries.len(), 11);
    assert_eq!(entries.iter().filter(|e| e.disabled).count(), 1);
    assert_eq!(entries[0].suggested_by.as_deref(), Some("Ann"));
}

#[test]
fn malformed_fixture_keeps_good_rows() {
    let entries = pool_csv::load_entries(&crate_path("tests/fixtures/malformed.csv")).unwrap();
    let positions: Vec<u32> = entries.iter().map(|e| e.position).collect();
    assert_eq!(positions, vec![1, 5]);
}

// ===========================================================================
// Full sessions
// ===========================================================================

#[tokio::test]
async fn full_draft_then_restart() {
    let dir = scratch("snakedraft_it_full_draft");
    let config = config_in(&dir);

    // 10 drafted-eligible entries, 3 selectors: 2 picks each over rounds [1, 1]
    let (state, restored) = start(&config);
    assert!(!restored);
    assert_eq!(state.session.draft().unwrap().available_selections(), 6);

    let picks = [1, 2, 3, 4, 6, 7].map(UserCommand::Select).to_vec();
    let updates = drive(state, picks).await;
    assert!(updates.contains(&UiUpdate::Complete(true)));
    assert!(updates.contains(&UiUpdate::ActiveSelector(None)));

    let (state, restored) = start(&config);
    assert!(restored);
    assert!(state.session.is_complete());
    let board = state.session.board();
    let titles = |i: usize| -> Vec<String> {
        board[i].picks.iter().map(|e| e.entry.title.clone()).collect()
    };
    assert_eq!(titles(0), vec!["Alien", "Gattaca"]);
    assert_eq!(titles(1), vec!["Brazil", "Fargo"]);
    assert_eq!(titles(2), vec!["Casablanca", "Dr. Strangelove"]);

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn disabled_entry_cannot_be_drafted() {
    let dir = scratch("snakedraft_it_disabled");
    let (state, _) = start(&config_in(&dir));

    let updates = drive(state, vec![UserCommand::Select(5)]).await;
    assert!(updates
        .iter()
        .any(|u| matches!(u, UiUpdate::Error(msg) if msg.contains("disabled"))));

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn undo_survives_restart() {
    let dir = scratch("snakedraft_it_undo");
    let config = config_in(&dir);

    let (state, _) = start(&config);
    drive(
        state,
        vec![
            UserCommand::Select(3),
            UserCommand::Select(8),
            UserCommand::Undo,
        ],
    )
    .await;

    let (state, restored) = start(&config);
    assert!(restored);
    assert_eq!(state.session.pool().current_order(), 1);
    assert_eq!(
        state.session.active_selector().map(|s| s.name().to_string()),
        Some("Ben".to_string())
    );

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn roster_changes_persist_across_restart() {
    let dir = scratch("snakedraft_it_roster");
    let config = config_in(&dir);

    let (state, _) = start(&config);
    drive(
        state,
        vec![
            UserCommand::Select(1),
            UserCommand::RemoveSelector("#3cb44b".into()),
            UserCommand::Rename {
                color: "#4363d8".into(),
                name: "Catherine".into(),
            },
        ],
    )
    .await;

    let (state, restored) = start(&config);
    // Removing a selector cleared the picks
    assert!(!restored);
    let names: Vec<&str> = state.session.selectors().iter().map(|s| s.name()).collect();
    assert_eq!(names, vec!["Ann", "Catherine"]);

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn export_writes_csv() {
    let dir = scratch("snakedraft_it_export");
    let config = config_in(&dir);

    let (state, _) = start(&config);
    let updates = drive(state, vec![UserCommand::Select(2), UserCommand::Export]).await;
    assert!(updates
        .iter()
        .any(|u| matches!(u, UiUpdate::Message(msg) if msg.starts_with("exported to"))));

    let exported: Vec<PathBuf> = std::fs::read_dir(dir.join("exports"))
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(exported.len(), 1);
    let name = exported[0].file_name().unwrap().to_string_lossy().to_string();
    assert!(name.ends_with("-draft-pick-export.csv"));

    let text = std::fs::read_to_string(&exported[0]).unwrap();
    assert_eq!(text.lines().count(), 12);
    assert!(text.contains("Brazil,1985,brazil,,false,Ann,1"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn reset_clears_stored_picks_but_keeps_roster() {
    let dir = scratch("snakedraft_it_reset");
    let config = config_in(&dir);

    let (state, _) = start(&config);
    drive(
        state,
        vec![
            UserCommand::Select(1),
            UserCommand::Select(2),
            UserCommand::Reset,
        ],
    )
    .await;

    let db = Database::open(&config.db_path).unwrap();
    assert!(!db.has_draft_in_progress().unwrap());
    assert_eq!(db.pick_count().unwrap(), 0);
    let stored = db.load_session().unwrap().unwrap();
    assert_eq!(stored.selectors, roster());
    assert_eq!(stored.entries.len(), 11);
    drop(db);

    let (state, restored) = start(&config);
    assert!(!restored);
    assert_eq!(state.session.pool().current_order(), 0);

    let _ = std::fs::remove_dir_all(&dir);
}

// ===========================================================================
// Reviews
// ===========================================================================

#[tokio::test]
async fn finished_review_is_exported() {
    let dir = scratch("snakedraft_it_review");
    let (state, _) = start(&config_in(&dir));

    let score = |color: &str, score: f64| UserCommand::Score {
        color: color.into(),
        score,
    };
    let updates = drive(
        state,
        vec![
            UserCommand::StartReview(1),
            score("#e6194b", 5.0),
            score("#3cb44b", 4.0),
            score("#4363d8", 4.0),
            UserCommand::FinishReview,
        ],
    )
    .await;
    // 13 / 3 = 4.33
    assert!(updates.contains(&UiUpdate::Message(
        "Alien (1979) receives 4/5 stars!".into()
    )));

    let text = std::fs::read_to_string(
        std::fs::read_dir(dir.join("exports"))
            .unwrap()
            .map(|e| e.unwrap().path())
            .find(|p| p.to_string_lossy().contains("review-export-Alien-1979"))
            .unwrap(),
    )
    .unwrap();
    assert_eq!(text.lines().count(), 4);
    assert!(text.contains("Alien,Cat,4.0"));

    let _ = std::fs::remove_dir_all(&dir);
}
