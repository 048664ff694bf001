//! SpellQuest - Word-spelling game for young learners
//!
//! Main entry point for the console application.
//!
//! # Overview
//!
//! This binary crate wires the library together. It initializes:
//! - Configuration loading ([`ConfigManager`])
//! - Logging infrastructure (daily file rotation, optional console output)
//! - Tokio async runtime (speech playback subprocesses)
//! - State management ([`StateManager`]) restored from the saved snapshot
//! - Console controller ([`ConsoleController`]) driving the menu and play modes
//!
//! # Execution Flow
//!
//! 1. Load `Spelling Config.yaml` from `SpellQuest Data/` (written with defaults if missing)
//! 2. Initialize logging → logs/spellquest.<date>
//! 3. Create tokio runtime with 2 worker threads
//! 4. Restore the game from `SpellQuest Data/spellquest-state.json`
//! 5. Run the console loop (blocks until the player quits)
//! 6. Log session metrics and shut the runtime down

use anyhow::Result;
use spellquest::services::{BuiltinWordRepository, CommandSpeechBackend, GameRules, Narrator};
use spellquest::state::FileSnapshotStore;
use spellquest::ui::ConsoleController;
use spellquest::{APP_NAME, ConfigManager, Metrics, StateManager, VERSION};
use std::sync::Arc;
use std::time::Duration;

const DATA_DIR: &str = "SpellQuest Data";
const WORKER_THREADS: usize = 2;

fn main() -> Result<()> {
    let config_manager = ConfigManager::new(DATA_DIR)?;
    let user_config = config_manager.load_or_create_user_config()?;

    let _log_guard =
        spellquest::logging::setup_logging_from_settings(&user_config.logging, "spellquest")?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(WORKER_THREADS)
        .thread_name("spellquest-worker")
        .build()?;

    tracing::info!("Tokio runtime initialized with {} worker threads", WORKER_THREADS);

    let metrics = Arc::new(Metrics::new());

    let store = Arc::new(FileSnapshotStore::new(config_manager.snapshot_path()));
    let state_manager =
        Arc::new(StateManager::restore(store)?.with_metrics(Arc::clone(&metrics)));
    tracing::info!("State manager initialized");

    let backend = Arc::new(CommandSpeechBackend::from_settings(&user_config.speech));
    let narrator = Arc::new(
        Narrator::new(backend, user_config.speech.clone(), runtime.handle().clone())
            .with_metrics(Arc::clone(&metrics)),
    );

    let stdin = std::io::stdin();
    let mut controller = ConsoleController::new(
        stdin.lock(),
        std::io::stdout(),
        Arc::clone(&state_manager),
        Arc::new(BuiltinWordRepository::new()),
        GameRules::new(user_config.gameplay.clone()),
    )?
    .with_narrator(Arc::clone(&narrator));

    let result = controller.run();

    tracing::info!("Console closed, shutting down");
    narrator.stop();

    metrics.log_summary();

    runtime.shutdown_timeout(Duration::from_secs(2));

    tracing::info!("Application shutdown complete");

    result.inspect_err(|e| tracing::error!("Console error: {:#}", e))
}
