//! Data models for the SpellQuest game.
//!
//! - [`GameState`]: The central state container (mode, difficulty, scoring, level tracks, achievements)
//! - [`LevelProgress`]: One level of one difficulty track
//! - [`Achievement`]: Catalog entry with its one-time unlock timestamp
//! - [`Word`]: A spellable word served by the word repository
//! - [`UserConfig`]: Gameplay, speech and logging preferences loaded from `Spelling Config.yaml`
//!
//! # Architecture Note
//!
//! The models are designed to be:
//! - **Serializable**: `GameState` is the persisted snapshot, `UserConfig` is YAML
//! - **Cloneable**: GameState is wrapped in `Arc<RwLock<>>` by [`StateManager`](crate::state::StateManager)
//! - **Passive**: State transitions go through StateManager so invariants and events stay consistent

pub mod config;
pub mod game_state;
pub mod word;

pub use config::{GameplaySettings, LoggingSettings, SpeechSettings, UserConfig};
pub use game_state::{
    Achievement, Difficulty, GameMode, GameState, LEVELS_PER_TRACK, LevelProgress,
    achievement_catalog, achievement_ids, pristine_track,
};
pub use word::{Category, Word};
