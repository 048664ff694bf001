// SpellQuest - Word-spelling game for young learners
//
// This is the library crate containing the game state engine, services and
// data structures. The binary crate (main.rs) provides the console entry point.

pub mod config;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod services;
pub mod state;
pub mod ui;

// Re-export commonly used types for convenience
pub use config::ConfigManager;
pub use metrics::Metrics;
pub use models::{Difficulty, GameMode, GameState, LevelProgress, UserConfig};
pub use state::{StateChange, StateError, StateManager};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
