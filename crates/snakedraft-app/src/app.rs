// Application state and orchestration logic.
//
// The event loop owns the draft session. Console commands arrive on an mpsc
// channel; draft notifications and command results go back to the console
// as UiUpdates. Every change to the session is persisted before the next
// command is read.

use std::path::Path;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use snakedraft_core::{DraftEvent, DraftObserver, DraftSession, ListEntry, Person, Review};

use crate::config::{self, Config};
use crate::db::Database;
use crate::export;
use crate::protocol::{UiUpdate, UserCommand, HELP};

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

/// The complete application state.
pub struct AppState {
    pub config: Config,
    pub session: DraftSession,
    pub db: Database,
    /// Review in progress, if any. Not persisted.
    pub review: Option<Review>,
}

impl AppState {
    pub fn new(config: Config, session: DraftSession, db: Database) -> Self {
        AppState {
            config,
            session,
            db,
            review: None,
        }
    }

    /// Write the current session to the database. Failures are logged and
    /// reported, never fatal.
    fn persist(&self, ui_tx: &mpsc::Sender<UiUpdate>) {
        if let Err(e) = self.db.save_session(&self.session.snapshot()) {
            warn!("Failed to persist session: {:#}", e);
            let _ = ui_tx.try_send(UiUpdate::Error(format!("could not save draft: {e}")));
        }
    }

    fn selector_name(&self, color: &str) -> Option<String> {
        self.session
            .selectors()
            .iter()
            .find(|s| s.has_color(color))
            .map(|s| s.name().to_string())
    }
}

/// Forward draft notifications to the console. Runs inside the mutating
/// call, so it must not block: updates are dropped when the channel is full.
pub fn ui_observer(ui_tx: mpsc::Sender<UiUpdate>) -> DraftObserver {
    Box::new(move |event| {
        let update = match event {
            DraftEvent::State(state) => UiUpdate::State(*state),
            DraftEvent::ActiveSelector(selector) => {
                UiUpdate::ActiveSelector(selector.map(|s| s.person().clone()))
            }
            DraftEvent::Complete(complete) => UiUpdate::Complete(*complete),
        };
        if ui_tx.try_send(update).is_err() {
            debug!("UI channel full or closed, dropping draft update");
        }
    })
}

// ---------------------------------------------------------------------------
// Main event loop
// ---------------------------------------------------------------------------

/// Run the main application event loop until `Quit`, Ctrl+C, or the command
/// channel closing.
pub async fn run(
    mut cmd_rx: mpsc::Receiver<UserCommand>,
    ui_tx: mpsc::Sender<UiUpdate>,
    mut state: AppState,
) -> anyhow::Result<()> {
    info!("Application event loop started");

    // Replays the current state to the console straight away.
    state.session.subscribe(ui_observer(ui_tx.clone()));
    if state.session.draft().is_none() {
        let message = no_draft_message(&state.session);
        let _ = ui_tx.send(UiUpdate::Message(message)).await;
    }

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UserCommand::Quit) => {
                        info!("Quit command received, shutting down");
                        break;
                    }
                    Some(cmd) => {
                        handle_user_command(&mut state, cmd, &ui_tx).await;
                    }
                    None => {
                        info!("Command channel closed, shutting down");
                        break;
                    }
                }
            }

            _ = &mut ctrl_c => {
                info!("Ctrl+C received, shutting down");
                break;
            }
        }
    }

    state.persist(&ui_tx);
    info!("Application event loop exiting");
    Ok(())
}

/// Handle a user command from the console.
async fn handle_user_command(
    state: &mut AppState,
    cmd: UserCommand,
    ui_tx: &mpsc::Sender<UiUpdate>,
) {
    match cmd {
        UserCommand::Select(position) => {
            let picker = state.session.active_selector().map(|s| s.name().to_string());
            match state.session.select_entry(position) {
                Ok(true) => {
                    state.persist(ui_tx);
                    let title = state
                        .session
                        .pool()
                        .index_of(position)
                        .and_then(|idx| state.session.pool().get(idx))
                        .map(|e| e.entry.title.clone())
                        .unwrap_or_default();
                    info!("{} drafted '{}'", picker.as_deref().unwrap_or("?"), title);
                    let _ = ui_tx
                        .send(UiUpdate::Message(format!(
                            "{} drafted {}",
                            picker.unwrap_or_default(),
                            title
                        )))
                        .await;
                }
                Ok(false) => {
                    let reason = if state.session.draft().is_none() {
                        no_draft_message(&state.session)
                    } else if state.session.is_complete() {
                        "the draft is complete".to_string()
                    } else {
                        format!("entry {position} is already taken or disabled")
                    };
                    let _ = ui_tx.send(UiUpdate::Error(reason)).await;
                }
                Err(e) => {
                    let _ = ui_tx.send(UiUpdate::Error(e.to_string())).await;
                }
            }
        }
        UserCommand::Undo => match state.session.undo_last_selection() {
            Ok(true) => {
                state.persist(ui_tx);
                info!("Last selection undone");
                let _ = ui_tx
                    .send(UiUpdate::Message("last pick undone".into()))
                    .await;
            }
            Ok(false) => {
                let _ = ui_tx
                    .send(UiUpdate::Error("nothing to undo".into()))
                    .await;
            }
            Err(e) => {
                let _ = ui_tx.send(UiUpdate::Error(e.to_string())).await;
            }
        },
        UserCommand::Reset => match state.session.reset() {
            Ok(()) => {
                // Roster and pool are unchanged, only the picks go.
                if let Err(e) = state.db.clear_draft() {
                    warn!("Failed to clear stored picks: {:#}", e);
                    let _ = ui_tx
                        .send(UiUpdate::Error(format!("could not save draft: {e}")))
                        .await;
                }
                info!("Draft reset by user");
                let _ = ui_tx.send(UiUpdate::Message("draft reset".into())).await;
            }
            Err(e) => {
                let _ = ui_tx.send(UiUpdate::Error(e.to_string())).await;
            }
        },
        UserCommand::Rename { color, name } => {
            let name = name.trim().to_string();
            if name.is_empty() {
                let _ = ui_tx
                    .send(UiUpdate::Error("name must not be empty".into()))
                    .await;
                return;
            }
            let old = state.selector_name(&color);
            match state.session.rename_selector(&color, &name) {
                Ok(()) => {
                    state.persist(ui_tx);
                    info!("Renamed {} to {}", old.as_deref().unwrap_or(&color), name);
                    let _ = ui_tx
                        .send(UiUpdate::Message(format!(
                            "{} is now {}",
                            old.unwrap_or(color),
                            name
                        )))
                        .await;
                }
                Err(e) => {
                    let _ = ui_tx.send(UiUpdate::Error(e.to_string())).await;
                }
            }
        }
        UserCommand::AddSelector(person) => {
            if !config::is_hex_color(&person.color) || !config::is_hex_color(&person.contrast) {
                let _ = ui_tx
                    .send(UiUpdate::Error(format!(
                        "{} is not a #rrggbb color",
                        person.color
                    )))
                    .await;
                return;
            }
            if state.selector_name(&person.color).is_some() {
                let _ = ui_tx
                    .send(UiUpdate::Error(format!(
                        "color {} is already in use",
                        person.color
                    )))
                    .await;
                return;
            }
            let name = person.name.clone();
            state.session.add_selectors(vec![person]);
            state.persist(ui_tx);
            info!("Selector {} added, draft rebuilt", name);
            let _ = ui_tx
                .send(UiUpdate::Message(format!("{name} joined; picks cleared")))
                .await;
            if state.session.draft().is_none() {
                let message = no_draft_message(&state.session);
                let _ = ui_tx.send(UiUpdate::Message(message)).await;
            }
        }
        UserCommand::RemoveSelector(color) => match state.session.remove_selector(&color) {
            Ok(person) => {
                state.persist(ui_tx);
                info!("Selector {} removed, draft rebuilt", person.name);
                let _ = ui_tx
                    .send(UiUpdate::Message(format!("{} left; picks cleared", person.name)))
                    .await;
                if state.session.draft().is_none() {
                    let message = no_draft_message(&state.session);
                    let _ = ui_tx.send(UiUpdate::Message(message)).await;
                }
            }
            Err(e) => {
                let _ = ui_tx.send(UiUpdate::Error(e.to_string())).await;
            }
        },
        UserCommand::Export => {
            let dir = Path::new(&state.config.export_dir);
            let written = export::write_board(dir, &state.session, &chrono::Local::now());
            match written {
                Ok(path) => {
                    let _ = ui_tx
                        .send(UiUpdate::Message(format!("exported to {}", path.display())))
                        .await;
                }
                Err(e) => {
                    warn!("Export failed: {:#}", e);
                    let _ = ui_tx
                        .send(UiUpdate::Error(format!("export failed: {e:#}")))
                        .await;
                }
            }
        }
        UserCommand::Show => {
            let board = state.session.board();
            let _ = ui_tx.send(UiUpdate::Board(board)).await;
        }
        UserCommand::Leftovers => {
            let titles = state
                .session
                .pool()
                .entries()
                .iter()
                .filter(|e| !e.is_selected() && !e.is_disabled())
                .map(|e| e.entry.title.clone())
                .collect();
            let _ = ui_tx.send(UiUpdate::Leftovers(titles)).await;
        }
        UserCommand::StartReview(position) => {
            let entry = state
                .session
                .pool()
                .index_of(position)
                .and_then(|idx| state.session.pool().get(idx))
                .map(|e| e.entry.clone());
            let Some(entry) = entry else {
                let _ = ui_tx
                    .send(UiUpdate::Error(format!("no entry at position {position}")))
                    .await;
                return;
            };
            let people: Vec<Person> = state
                .session
                .selectors()
                .iter()
                .map(|s| s.person().clone())
                .collect();
            if people.is_empty() {
                let _ = ui_tx
                    .send(UiUpdate::Error("add a selector before reviewing".into()))
                    .await;
                return;
            }
            info!("Review started for '{}' with {} reviewers", entry.title, people.len());
            let review = Review::new(entry, people);
            state.review = Some(review.clone());
            let _ = ui_tx.send(UiUpdate::Review(review)).await;
        }
        UserCommand::Score { color, score } => {
            let result = match state.review.as_mut() {
                Some(review) => review
                    .add_or_replace_score(&color, score)
                    .map(|_| review.clone())
                    .map_err(|e| e.to_string()),
                None => Err(NO_REVIEW.to_string()),
            };
            send_review_result(ui_tx, result).await;
        }
        UserCommand::Unscore(color) => {
            let result = match state.review.as_mut() {
                Some(review) => review
                    .remove_score(&color)
                    .map(|_| review.clone())
                    .map_err(|e| e.to_string()),
                None => Err(NO_REVIEW.to_string()),
            };
            send_review_result(ui_tx, result).await;
        }
        UserCommand::FinishReview => {
            let Some(review) = state.review.as_ref() else {
                let _ = ui_tx.send(UiUpdate::Error(NO_REVIEW.into())).await;
                return;
            };
            let score = match review.finish() {
                Ok(score) => score,
                Err(e) => {
                    let _ = ui_tx.send(UiUpdate::Error(e.to_string())).await;
                    return;
                }
            };
            let entry = review.entry();
            let message = format!(
                "{} ({}) receives {}/5 stars!",
                entry.title, entry.year, score
            );
            info!("Review finished: {}", message);
            let dir = Path::new(&state.config.export_dir);
            let written = export::write_review(dir, review, &chrono::Local::now());
            state.review = None;
            let _ = ui_tx.send(UiUpdate::Message(message)).await;
            match written {
                Ok(path) => {
                    let _ = ui_tx
                        .send(UiUpdate::Message(format!("exported to {}", path.display())))
                        .await;
                }
                Err(e) => {
                    warn!("Review export failed: {:#}", e);
                    let _ = ui_tx
                        .send(UiUpdate::Error(format!("export failed: {e:#}")))
                        .await;
                }
            }
        }
        UserCommand::Help => {
            let _ = ui_tx.send(UiUpdate::Message(HELP.to_string())).await;
        }
        UserCommand::Quit => {
            // Handled in the main loop
        }
    }
}

const NO_REVIEW: &str = "no review in progress (try 'review <position>')";

async fn send_review_result(ui_tx: &mpsc::Sender<UiUpdate>, result: Result<Review, String>) {
    let update = match result {
        Ok(review) => UiUpdate::Review(review),
        Err(message) => UiUpdate::Error(message),
    };
    let _ = ui_tx.send(update).await;
}

fn no_draft_message(session: &DraftSession) -> String {
    if session.selectors().is_empty() {
        "no draft yet: add a selector to begin".to_string()
    } else {
        format!(
            "no draft yet: {} entries are too few for {} selectors",
            session.pool().available_entries(),
            session.selectors().len()
        )
    }
}

// ---------------------------------------------------------------------------
// Crash recovery
// ---------------------------------------------------------------------------

/// Build the session for startup.
///
/// A stored session is replayed onto the freshly loaded pool, keeping its
/// roster. History that no longer fits the pool or roster is discarded in
/// favour of an empty draft with the configured roster. Returns the session
/// and whether picks were restored.
pub fn recover_from_db(
    db: &Database,
    entries: Vec<ListEntry>,
    configured: Vec<Person>,
) -> anyhow::Result<(DraftSession, bool)> {
    let Some(snapshot) = db.load_session()? else {
        info!("No saved session, starting fresh");
        let session = DraftSession::new(entries, configured);
        db.save_session(&session.snapshot())?;
        return Ok((session, false));
    };

    let in_progress = db.has_draft_in_progress()?;
    info!(
        "Crash recovery: replaying {} picks for {} selectors",
        db.pick_count()?,
        snapshot.selectors.len()
    );

    match DraftSession::restore_onto(entries.clone(), snapshot) {
        Ok(session) => {
            db.save_session(&session.snapshot())?;
            info!(
                "Crash recovery complete: {} picks restored",
                session.pool().current_order()
            );
            Ok((session, in_progress))
        }
        Err(e) if e.is_structural() => {
            warn!("Saved draft no longer matches, starting fresh: {}", e);
            let session = DraftSession::new(entries, configured);
            db.save_session(&session.snapshot())?;
            Ok((session, false))
        }
        Err(e) => Err(anyhow::Error::new(e).context("failed to replay saved draft")),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(count: u32) -> Vec<ListEntry> {
        (1..=count)
            .map(|i| ListEntry {
                position: i,
                title: format!("Film {i}"),
                year: "1999".into(),
                url_slug: String::new(),
                poster_url: String::new(),
                suggested_by: None,
                disabled: false,
            })
            .collect()
    }

    fn roster() -> Vec<Person> {
        vec![
            Person::new("Ann", "#e6194b", "#ffffff"),
            Person::new("Ben", "#3cb44b", "#000000"),
        ]
    }

    fn test_config() -> Config {
        Config {
            pool_path: "unused.csv".into(),
            db_path: ":memory:".into(),
            export_dir: std::env::temp_dir()
                .join("snakedraft_app_exports")
                .display()
                .to_string(),
            selectors: roster(),
        }
    }

    fn test_state() -> AppState {
        let db = Database::open(":memory:").unwrap();
        let (session, _) = recover_from_db(&db, entries(13), roster()).unwrap();
        AppState::new(test_config(), session, db)
    }

    fn drain(rx: &mut mpsc::Receiver<UiUpdate>) -> Vec<UiUpdate> {
        let mut updates = Vec::new();
        while let Ok(update) = rx.try_recv() {
            updates.push(update);
        }
        updates
    }

    #[test]
    fn observer_maps_events() {
        let (tx, mut rx) = mpsc::channel(16);
        let mut session = DraftSession::new(entries(13), roster());
        session.subscribe(ui_observer(tx));

        let updates = drain(&mut rx);
        assert_eq!(updates[0], UiUpdate::Complete(false));
        assert_eq!(
            updates[1],
            UiUpdate::ActiveSelector(Some(roster()[0].clone()))
        );
        assert!(matches!(updates[2], UiUpdate::State(s) if s.global_order == 0));
    }

    #[test]
    fn observer_drops_updates_when_full() {
        let (tx, mut rx) = mpsc::channel(1);
        let mut session = DraftSession::new(entries(13), roster());
        session.subscribe(ui_observer(tx));
        session.select_entry(1).unwrap();
        assert_eq!(drain(&mut rx).len(), 1);
    }

    #[tokio::test]
    async fn select_persists_and_reports() {
        let mut state = test_state();
        let (tx, mut rx) = mpsc::channel(64);

        handle_user_command(&mut state, UserCommand::Select(4), &tx).await;
        assert_eq!(state.db.pick_count().unwrap(), 1);
        let updates = drain(&mut rx);
        assert!(updates.contains(&UiUpdate::Message("Ann drafted Film 4".into())));

        handle_user_command(&mut state, UserCommand::Select(4), &tx).await;
        let updates = drain(&mut rx);
        assert!(matches!(&updates[..], [UiUpdate::Error(msg)] if msg.contains("already taken")));

        handle_user_command(&mut state, UserCommand::Select(99), &tx).await;
        assert!(matches!(&drain(&mut rx)[..], [UiUpdate::Error(_)]));
    }

    #[tokio::test]
    async fn undo_and_reset_persist() {
        let mut state = test_state();
        let (tx, mut rx) = mpsc::channel(64);
        for pos in [1, 2, 3] {
            handle_user_command(&mut state, UserCommand::Select(pos), &tx).await;
        }
        handle_user_command(&mut state, UserCommand::Undo, &tx).await;
        assert_eq!(state.db.pick_count().unwrap(), 2);

        handle_user_command(&mut state, UserCommand::Reset, &tx).await;
        assert_eq!(state.db.pick_count().unwrap(), 0);
        drain(&mut rx);

        handle_user_command(&mut state, UserCommand::Undo, &tx).await;
        assert_eq!(
            drain(&mut rx),
            vec![UiUpdate::Error("nothing to undo".into())]
        );
    }

    #[tokio::test]
    async fn add_selector_validates_color() {
        let mut state = test_state();
        let (tx, mut rx) = mpsc::channel(64);

        let bad = Person::new("Cat", "blue", "#ffffff");
        handle_user_command(&mut state, UserCommand::AddSelector(bad), &tx).await;
        let dup = Person::new("Cat", "#E6194B", "#ffffff");
        handle_user_command(&mut state, UserCommand::AddSelector(dup), &tx).await;
        let updates = drain(&mut rx);
        assert_eq!(updates.len(), 2);
        assert!(updates.iter().all(|u| matches!(u, UiUpdate::Error(_))));
        assert_eq!(state.session.selectors().len(), 2);

        let good = Person::new("Cat", "#4363d8", "#ffffff");
        handle_user_command(&mut state, UserCommand::AddSelector(good), &tx).await;
        assert_eq!(state.session.selectors().len(), 3);
        let stored = state.db.load_session().unwrap().unwrap();
        assert_eq!(stored.selectors.len(), 3);
    }

    #[tokio::test]
    async fn rename_and_remove() {
        let mut state = test_state();
        let (tx, mut rx) = mpsc::channel(64);

        handle_user_command(
            &mut state,
            UserCommand::Rename {
                color: "#3cb44b".into(),
                name: "Benedict".into(),
            },
            &tx,
        )
        .await;
        assert_eq!(
            drain(&mut rx),
            vec![UiUpdate::Message("Ben is now Benedict".into())]
        );

        handle_user_command(&mut state, UserCommand::RemoveSelector("#3cb44b".into()), &tx)
            .await;
        assert_eq!(state.session.selectors().len(), 1);
        handle_user_command(&mut state, UserCommand::RemoveSelector("#3cb44b".into()), &tx)
            .await;
        assert!(matches!(drain(&mut rx).last(), Some(UiUpdate::Error(_))));
    }

    #[tokio::test]
    async fn leftovers_skip_drafted_entries() {
        let mut state = test_state();
        let (tx, mut rx) = mpsc::channel(64);
        handle_user_command(&mut state, UserCommand::Select(1), &tx).await;
        drain(&mut rx);

        handle_user_command(&mut state, UserCommand::Leftovers, &tx).await;
        match drain(&mut rx).as_slice() {
            [UiUpdate::Leftovers(titles)] => {
                assert_eq!(titles.len(), 12);
                assert!(!titles.contains(&"Film 1".to_string()));
            }
            other => panic!("unexpected updates: {other:?}"),
        }
    }

    #[tokio::test]
    async fn review_collects_scores_then_finishes() {
        let mut state = test_state();
        let (tx, mut rx) = mpsc::channel(64);

        handle_user_command(
            &mut state,
            UserCommand::Score {
                color: "#e6194b".into(),
                score: 4.0,
            },
            &tx,
        )
        .await;
        assert!(matches!(&drain(&mut rx)[..], [UiUpdate::Error(_)]));

        handle_user_command(&mut state, UserCommand::StartReview(3), &tx).await;
        assert!(matches!(&drain(&mut rx)[..], [UiUpdate::Review(r)] if r.entry().title == "Film 3"));

        for (color, score) in [("#e6194b", 4.0), ("#3cb44b", 9.0), ("#3cb44b", 2.5)] {
            handle_user_command(
                &mut state,
                UserCommand::Score {
                    color: color.into(),
                    score,
                },
                &tx,
            )
            .await;
        }
        let updates = drain(&mut rx);
        assert!(matches!(updates[1], UiUpdate::Error(ref msg) if msg.contains("outside")));

        handle_user_command(&mut state, UserCommand::Unscore("#3cb44b".into()), &tx).await;
        handle_user_command(&mut state, UserCommand::FinishReview, &tx).await;
        let updates = drain(&mut rx);
        assert!(matches!(&updates[1], UiUpdate::Error(msg) if msg.contains("Ben")));
        assert!(state.review.is_some());

        handle_user_command(
            &mut state,
            UserCommand::Score {
                color: "#3cb44b".into(),
                score: 2.5,
            },
            &tx,
        )
        .await;
        handle_user_command(&mut state, UserCommand::FinishReview, &tx).await;
        let updates = drain(&mut rx);
        // (4.0 + 2.5) / 2 = 3.25
        assert!(updates.contains(&UiUpdate::Message(
            "Film 3 (1999) receives 3/5 stars!".into()
        )));
        assert!(state.review.is_none());
        let _ = std::fs::remove_dir_all(&state.config.export_dir);
    }

    #[test]
    fn recover_replays_saved_picks() {
        let db = Database::open(":memory:").unwrap();
        let (mut session, restored) = recover_from_db(&db, entries(13), roster()).unwrap();
        assert!(!restored);
        session.select_entry(5).unwrap();
        session.select_entry(6).unwrap();
        db.save_session(&session.snapshot()).unwrap();

        // Configured roster is ignored once a session exists
        let (recovered, restored) =
            recover_from_db(&db, entries(13), vec![Person::new("Zed", "#000000", "#ffffff")])
                .unwrap();
        assert!(restored);
        assert_eq!(recovered.snapshot(), session.snapshot());
    }

    #[test]
    fn recover_falls_back_on_mismatch() {
        let db = Database::open(":memory:").unwrap();
        let (mut session, _) = recover_from_db(&db, entries(13), roster()).unwrap();
        session.select_entry(13).unwrap();
        db.save_session(&session.snapshot()).unwrap();

        // Entry 13 is gone from the reloaded pool
        let (fresh, restored) = recover_from_db(&db, entries(12), roster()).unwrap();
        assert!(!restored);
        assert_eq!(fresh.pool().current_order(), 0);
        assert!(!db.has_draft_in_progress().unwrap());
    }

    #[tokio::test]
    async fn run_loop_quits_and_persists() {
        let state = test_state();
        let (cmd_tx, cmd_rx) = mpsc::channel(8);
        let (ui_tx, mut ui_rx) = mpsc::channel(64);

        let handle = tokio::spawn(run(cmd_rx, ui_tx, state));
        cmd_tx.send(UserCommand::Select(2)).await.unwrap();
        cmd_tx.send(UserCommand::Quit).await.unwrap();
        handle.await.unwrap().unwrap();

        let mut updates = Vec::new();
        while let Some(update) = ui_rx.recv().await {
            updates.push(update);
        }
        // Initial replay, then the pick
        assert_eq!(updates[0], UiUpdate::Complete(false));
        assert!(updates.contains(&UiUpdate::Message("Ann drafted Film 2".into())));
    }
}
