// Snake draft console entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file, not terminal)
// 2. Load config
// 3. Load the candidate pool
// 4. Open database, recover any saved draft
// 5. Create mpsc channels
// 6. Spawn app logic task
// 7. Run the console until the user quits
// 8. Cleanup on exit

use std::path::Path;

use snakedraft_app::{app, config, console, db, pool_csv};

use anyhow::Context;
use tokio::sync::mpsc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing
    init_tracing()?;
    info!("Snake draft starting up");

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: pool={}, {} configured selectors",
        config.pool_path,
        config.selectors.len()
    );

    // 3. Load the candidate pool
    let entries = pool_csv::load_entries(Path::new(&config.pool_path))
        .context("failed to load candidate pool")?;

    // 4. Open database and recover
    let db = db::Database::open(&config.db_path).context("failed to open database")?;
    info!("Database opened at {}", config.db_path);

    let (session, restored) = app::recover_from_db(&db, entries, config.selectors.clone())
        .context("crash recovery failed")?;
    if restored {
        info!("Draft restored from previous session");
    } else {
        info!("Starting fresh draft session");
    }

    // 5. Channels
    let (cmd_tx, cmd_rx) = mpsc::channel(64);
    let (ui_tx, ui_rx) = mpsc::channel(256);

    // 6. Spawn app logic task
    let state = app::AppState::new(config, session, db);
    let app_handle = tokio::spawn(async move {
        if let Err(e) = app::run(cmd_rx, ui_tx, state).await {
            error!("Application loop error: {}", e);
        }
    });

    // 7. Console (blocks until the user quits)
    println!("snake draft: type 'help' for commands");
    if let Err(e) = console::run(ui_rx, cmd_tx).await {
        error!("Console error: {}", e);
    }

    // 8. Cleanup: wait for the app task to persist and exit
    let _ = tokio::time::timeout(std::time::Duration::from_secs(5), app_handle).await;

    info!("Snake draft shut down cleanly");
    Ok(())
}

/// Initialize tracing to log to a file (not the terminal, which is used by
/// the console).
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("snakedraft.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new("snakedraft=info,snakedraft_app=info,snakedraft_core=info,warn")
            }),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
