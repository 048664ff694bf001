// State management module
//
// This module provides the StateManager which wraps GameState with shared access
// using Arc<RwLock<T>>, enforces the level/achievement invariants, persists a
// snapshot after every committed mutation and emits change events for the UI.

pub mod persistence;

pub use persistence::{FileSnapshotStore, MemorySnapshotStore, SnapshotStore};

use crate::metrics::Metrics;
use crate::models::{Difficulty, GameMode, GameState, LevelProgress, achievement_ids};
use anyhow::{Context, Result};
use chrono::Utc;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::broadcast;

/// Change events emitted when state is modified
///
/// These events are emitted to notify interested parties (primarily the
/// presentation layer) about state changes without requiring them to poll.
#[derive(Clone, Debug, PartialEq)]
pub enum StateChange {
    ModeChanged {
        mode: GameMode,
    },

    DifficultyChanged {
        difficulty: Difficulty,
    },

    /// Score or high score changed
    ScoreChanged {
        score: u32,
        high_score: u32,
    },

    StreakChanged {
        streak: u32,
    },

    /// A play session has started (score and streak were reset)
    SessionStarted,

    /// A play session has ended
    SessionEnded {
        total_words: u32,
        correct_words: u32,
    },

    CurrentLevelChanged {
        level: u32,
    },

    /// A level track was created for a difficulty
    TrackInitialized {
        difficulty: Difficulty,
    },

    /// A level was completed, or its rating or best time changed
    LevelCompleted {
        difficulty: Difficulty,
        level: u32,
        stars: u8,
        best_time: Option<Duration>,
    },

    LevelUnlocked {
        difficulty: Difficulty,
        level: u32,
    },

    AchievementUnlocked {
        id: String,
    },

    /// All level tracks were regenerated
    ProgressReset,
}

/// Precondition violations rejected by the store.
///
/// A rejected operation leaves the state untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("No level track initialized for {0} difficulty")]
    TrackNotInitialized(Difficulty),

    #[error("Level {level} is outside the track (1..={len})")]
    LevelOutOfRange { level: u32, len: usize },

    #[error("Star rating must be 1, 2 or 3, got {0}")]
    InvalidStars(u8),
}

/// Settle a track's unlock chain.
///
/// Level 1 is always unlocked and every level after a completed one is
/// unlocked. Only adds unlocks, so applying it twice equals applying it once.
pub fn repair_unlock_chain(track: &mut [LevelProgress]) {
    let mut previous_completed = true;
    for level in track.iter_mut() {
        level.unlocked |= previous_completed;
        previous_completed = level.completed;
    }
}

/// Whether [`repair_unlock_chain`] would change anything.
pub fn unlock_chain_needs_repair(track: &[LevelProgress]) -> bool {
    if track.first().is_some_and(|first| !first.unlocked) {
        return true;
    }
    track
        .windows(2)
        .any(|pair| pair[0].completed && !pair[1].unlocked)
}

/// Shared game state store with event emission and snapshot persistence
///
/// This is the central state component that:
/// - Provides shared access to [`GameState`] via `Arc<RwLock<T>>`
/// - Applies game transitions atomically (fallible operations run on a working copy)
/// - Detects state changes and emits [`StateChange`] events
/// - Saves a snapshot through a [`SnapshotStore`] after every committed change
///
/// # Usage
///
/// - [`read()`](Self::read) / [`snapshot()`](Self::snapshot) for reading state
/// - The named operations (`add_score`, `complete_level`, ...) for mutations
/// - [`subscribe()`](Self::subscribe) for listening to state changes
///
/// Each mutation holds the write lock from apply through persist and broadcast,
/// so snapshot writes are totally ordered.
pub struct StateManager {
    /// The game state protected by RwLock
    state: Arc<RwLock<GameState>>,

    /// Broadcast channel for emitting state change events
    state_tx: broadcast::Sender<StateChange>,

    /// Where snapshots are written, if anywhere
    store: Option<Arc<dyn SnapshotStore>>,

    metrics: Arc<Metrics>,
}

impl StateManager {
    /// Create a new StateManager with default state and no persistence
    ///
    /// # Returns
    /// A new StateManager with a broadcast channel buffer of 100 events
    pub fn new() -> Self {
        Self::from_state(GameState::default(), None)
    }

    /// Create a StateManager with default state that saves to `store`.
    ///
    /// Nothing is loaded from the store; use [`restore`](Self::restore) for that.
    pub fn with_store(store: Arc<dyn SnapshotStore>) -> Self {
        Self::from_state(GameState::default(), Some(store))
    }

    /// Restore the last saved snapshot from `store`, or start fresh if none exists.
    ///
    /// The restored state is reconciled: missing difficulty tracks are created
    /// and the achievement list is realigned with the catalog.
    pub fn restore(store: Arc<dyn SnapshotStore>) -> Result<Self> {
        let mut state = match store.load().context("Failed to load saved game")? {
            Some(state) => {
                tracing::info!(
                    "Restored saved game: difficulty={}, high_score={}, achievements={}",
                    state.difficulty,
                    state.high_score,
                    state.unlocked_achievement_count()
                );
                state
            }
            None => {
                tracing::info!("No saved game found, starting fresh");
                GameState::default()
            }
        };

        let created = state.reconcile();
        if !created.is_empty() {
            tracing::warn!("Saved game was missing level tracks for {:?}, initialized them", created);
        }

        Ok(Self::from_state(state, Some(store)))
    }

    fn from_state(state: GameState, store: Option<Arc<dyn SnapshotStore>>) -> Self {
        let (state_tx, _) = broadcast::channel(100);
        Self {
            state: Arc::new(RwLock::new(state)),
            state_tx,
            store,
            metrics: Arc::new(Metrics::new()),
        }
    }

    /// Record store activity into a shared metrics instance.
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    fn read_state(&self) -> RwLockReadGuard<'_, GameState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, GameState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Get a read-only copy of the current state
    ///
    /// This clones the entire state, so it's safe to use without holding locks.
    /// For checking individual fields, consider using `read()` with a closure.
    pub fn snapshot(&self) -> GameState {
        self.read_state().clone()
    }

    /// Execute a function with read access to the state
    ///
    /// # Example
    /// ```ignore
    /// let streak = state_manager.read(|state| state.streak);
    /// ```
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&GameState) -> R,
    {
        let state = self.read_state();
        f(&state)
    }

    /// Update the state and emit change events
    ///
    /// 1. Captures the old state
    /// 2. Applies the update function
    /// 3. Detects what changed
    /// 4. Persists the snapshot and emits events
    ///
    /// This bypasses the named operations' rules; prefer those for gameplay.
    ///
    /// # Returns
    /// A vector of StateChange events that were emitted
    pub fn update<F>(&self, update_fn: F) -> Vec<StateChange>
    where
        F: FnOnce(&mut GameState),
    {
        self.update_marked(update_fn, |_, _| {})
    }

    /// Like [`update`](Self::update), but `mark` may add operation-level
    /// events (session start/end, reset) to the detected ones.
    ///
    /// `mark` runs under the write lock and only if the state changed.
    fn update_marked<F, M>(&self, update_fn: F, mark: M) -> Vec<StateChange>
    where
        F: FnOnce(&mut GameState),
        M: FnOnce(&GameState, &mut Vec<StateChange>),
    {
        let mut state = self.write_state();
        let old_state = state.clone();

        update_fn(&mut state);

        let mut changes = detect_changes(&old_state, &state);
        if old_state != *state {
            mark(&state, &mut changes);
        }
        self.commit(&old_state, &state, &changes);
        changes
    }

    /// Apply a fallible update atomically.
    ///
    /// The update runs on a working copy which replaces the state only if it
    /// returns `Ok`. On error nothing is persisted or broadcast.
    pub fn try_update<F>(&self, update_fn: F) -> Result<Vec<StateChange>, StateError>
    where
        F: FnOnce(&mut GameState) -> Result<(), StateError>,
    {
        let mut state = self.write_state();
        let mut working = state.clone();

        update_fn(&mut working)?;

        let changes = detect_changes(&state, &working);
        let old_state = std::mem::replace(&mut *state, working);
        self.commit(&old_state, &state, &changes);
        Ok(changes)
    }

    /// Persist and broadcast a committed mutation. Called with the write lock held.
    fn commit(&self, old: &GameState, new: &GameState, changes: &[StateChange]) {
        if old == new {
            return;
        }
        self.metrics.record_state_update();

        if let Some(store) = &self.store {
            match store.save(new) {
                Ok(()) => self.metrics.record_snapshot_saved(),
                Err(e) => {
                    self.metrics.record_snapshot_error();
                    tracing::error!("Failed to save game snapshot: {:#}", e);
                }
            }
        }

        for change in changes {
            self.broadcast(change.clone());
        }
    }

    fn broadcast(&self, change: StateChange) {
        // No subscribers is fine
        match self.state_tx.send(change) {
            Ok(_) => self.metrics.record_state_broadcast(),
            Err(_) => self.metrics.record_broadcast_miss(),
        }
    }

    /// Subscribe to state change events
    ///
    /// Returns a receiver that will get notified of all future state changes.
    /// Multiple subscribers can listen simultaneously.
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.state_tx.subscribe()
    }

    // Mode & difficulty

    pub fn set_mode(&self, mode: GameMode) -> Vec<StateChange> {
        tracing::debug!("Switching mode to {}", mode);
        self.update(|state| state.mode = mode)
    }

    /// Switch difficulty. Score, streak and the level pointer are kept.
    pub fn set_difficulty(&self, difficulty: Difficulty) -> Vec<StateChange> {
        tracing::debug!("Switching difficulty to {}", difficulty);
        self.update(|state| state.difficulty = difficulty)
    }

    // Scoring

    /// Add points to the session score and raise the high score if needed.
    pub fn add_score(&self, points: u32) -> Vec<StateChange> {
        let now = Utc::now();
        self.update(|state| {
            state.score = state.score.saturating_add(points);
            state.high_score = state.high_score.max(state.score);

            if state.score >= 100 && !state.is_achievement_unlocked(achievement_ids::SCORE_100) {
                state.unlock_achievement(achievement_ids::SCORE_100, now);
            }
        })
    }

    /// Count one more correct answer in a row.
    ///
    /// Streak milestones are exact: 1 unlocks `first_word`, 5 `streak_5`,
    /// 10 `streak_10`.
    pub fn increment_streak(&self) -> Vec<StateChange> {
        let now = Utc::now();
        self.update(|state| {
            state.streak = state.streak.saturating_add(1);

            let milestone = match state.streak {
                1 => Some(achievement_ids::FIRST_WORD),
                5 => Some(achievement_ids::STREAK_5),
                10 => Some(achievement_ids::STREAK_10),
                _ => None,
            };
            if let Some(id) = milestone {
                if !state.is_achievement_unlocked(id) {
                    state.unlock_achievement(id, now);
                }
            }
        })
    }

    pub fn reset_streak(&self) -> Vec<StateChange> {
        self.update(|state| state.streak = 0)
    }

    /// Zero the session score. The high score is kept.
    pub fn reset_score(&self) -> Vec<StateChange> {
        self.update(|state| state.score = 0)
    }

    /// Begin a play session, discarding any score from the previous one.
    pub fn start_game(&self) -> Vec<StateChange> {
        self.update_marked(
            |state| {
                state.score = 0;
                state.streak = 0;
                state.is_playing = true;
            },
            |_, changes| {
                tracing::info!("Game session started");
                changes.insert(0, StateChange::SessionStarted);
            },
        )
    }

    /// End the play session.
    ///
    /// `correct_words` grows by one when the session scored anything at all.
    pub fn end_game(&self) -> Vec<StateChange> {
        let now = Utc::now();
        self.update_marked(
            |state| {
                state.is_playing = false;
                state.total_words = state.total_words.saturating_add(1);
                if state.score > 0 {
                    state.correct_words = state.correct_words.saturating_add(1);
                }

                if state.correct_words == 1
                    && !state.is_achievement_unlocked(achievement_ids::FIRST_WORD)
                {
                    state.unlock_achievement(achievement_ids::FIRST_WORD, now);
                }
            },
            |state, changes| {
                tracing::info!(
                    "Game session ended: total_words={}, correct_words={}",
                    state.total_words,
                    state.correct_words
                );
                changes.push(StateChange::SessionEnded {
                    total_words: state.total_words,
                    correct_words: state.correct_words,
                });
            },
        )
    }

    // Level progression

    /// Point subsequent [`complete_level`](Self::complete_level) calls at `level`.
    ///
    /// The caller is expected to pick an unlocked level.
    pub fn set_current_level(&self, level: u32) -> Vec<StateChange> {
        self.update(|state| state.current_level = level)
    }

    /// Progress for the active difficulty, empty if its track is missing.
    pub fn current_difficulty_progress(&self) -> Vec<LevelProgress> {
        self.read(|state| state.active_track().map(<[_]>::to_vec).unwrap_or_default())
    }

    /// Create a pristine track for `difficulty` if it has none.
    ///
    /// An existing track is never touched, whatever it contains.
    pub fn initialize_difficulty_progress(&self, difficulty: Difficulty) -> Vec<StateChange> {
        self.update(|state| {
            if state.ensure_track(difficulty) {
                tracing::info!("Initialized level track for {}", difficulty);
            }
        })
    }

    /// Complete the current level of the active track.
    ///
    /// Records the rating and the best time, and unlocks the next level.
    /// Level-count achievements use the completed count after this update.
    ///
    /// # Errors
    /// - [`StateError::InvalidStars`] for a rating outside 1..=3
    /// - [`StateError::TrackNotInitialized`] if the active difficulty has no track
    /// - [`StateError::LevelOutOfRange`] if the level pointer is outside the track
    pub fn complete_level(&self, stars: u8, time: Duration) -> Result<Vec<StateChange>, StateError> {
        if !(1..=3).contains(&stars) {
            return Err(StateError::InvalidStars(stars));
        }

        let now = Utc::now();
        let result = self.try_update(|state| {
            let difficulty = state.difficulty;
            let level = state.current_level;
            let track = state
                .track_mut(difficulty)
                .ok_or(StateError::TrackNotInitialized(difficulty))?;

            let len = track.len();
            if level == 0 || level as usize > len {
                return Err(StateError::LevelOutOfRange { level, len });
            }
            let index = level as usize - 1;

            let entry = &mut track[index];
            entry.level = level;
            entry.completed = true;
            entry.stars = stars;
            entry.best_time = Some(entry.best_time.map_or(time, |best| best.min(time)));
            entry.unlocked = true;

            if let Some(next) = track.get_mut(index + 1) {
                next.unlocked = true;
            }

            if stars == 3 && !state.is_achievement_unlocked(achievement_ids::PERFECT_LEVEL) {
                state.unlock_achievement(achievement_ids::PERFECT_LEVEL, now);
            }

            let completed = state.completed_levels(difficulty);
            if completed >= 5 && !state.is_achievement_unlocked(achievement_ids::LEVEL_5) {
                state.unlock_achievement(achievement_ids::LEVEL_5, now);
            }
            if completed >= 10 && !state.is_achievement_unlocked(achievement_ids::LEVEL_10) {
                state.unlock_achievement(achievement_ids::LEVEL_10, now);
            }
            Ok(())
        });

        match &result {
            Ok(_) => tracing::info!("Completed level with {} stars in {:?}", stars, time),
            Err(e) => tracing::warn!("Rejected level completion: {}", e),
        }
        result
    }

    /// Re-establish the unlock chain of the active track.
    ///
    /// # Errors
    /// [`StateError::TrackNotInitialized`] if the active difficulty has no track.
    pub fn fix_levels_unlock(&self) -> Result<Vec<StateChange>, StateError> {
        let changes = self.try_update(|state| {
            let difficulty = state.difficulty;
            let track = state
                .track_mut(difficulty)
                .ok_or(StateError::TrackNotInitialized(difficulty))?;
            repair_unlock_chain(track);
            Ok(())
        })?;

        if !changes.is_empty() {
            tracing::info!("Repaired level unlock chain ({} levels unlocked)", changes.len());
        }
        Ok(changes)
    }

    /// Whether the active track's unlock chain is out of step with its completions.
    pub fn needs_unlock_repair(&self) -> bool {
        self.read(|state| state.active_track().is_some_and(unlock_chain_needs_repair))
    }

    /// Repair the active track only if it needs it.
    pub fn ensure_unlock_chain(&self) -> Result<Vec<StateChange>, StateError> {
        if self.needs_unlock_repair() {
            tracing::warn!("Level unlock chain out of step, repairing");
            self.fix_levels_unlock()
        } else {
            Ok(Vec::new())
        }
    }

    /// Wipe level progress on every difficulty. Achievements and scores are kept.
    pub fn reset_levels_progress(&self) -> Vec<StateChange> {
        self.update_marked(
            |state| state.reset_levels(),
            |_, changes| {
                tracing::info!("Level progress reset");
                changes.insert(0, StateChange::ProgressReset);
            },
        )
    }

    // Achievements

    /// Unlock an achievement by id. Unknown or already unlocked ids are ignored.
    pub fn unlock_achievement(&self, id: &str) -> Vec<StateChange> {
        let now = Utc::now();
        self.update(|state| {
            if !state.unlock_achievement(id, now) {
                tracing::debug!("Achievement {} unknown or already unlocked", id);
            }
        })
    }
}

impl Default for StateManager {
    fn default() -> Self {
        Self::new()
    }
}

// Make StateManager cloneable for sharing across threads
impl Clone for StateManager {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            state_tx: self.state_tx.clone(),
            store: self.store.clone(),
            metrics: Arc::clone(&self.metrics),
        }
    }
}

/// Detect what changed between two states and generate events
fn detect_changes(old: &GameState, new: &GameState) -> Vec<StateChange> {
    let mut changes = Vec::new();

    if old.mode != new.mode {
        changes.push(StateChange::ModeChanged { mode: new.mode });
    }

    if old.difficulty != new.difficulty {
        changes.push(StateChange::DifficultyChanged {
            difficulty: new.difficulty,
        });
    }

    if old.score != new.score || old.high_score != new.high_score {
        changes.push(StateChange::ScoreChanged {
            score: new.score,
            high_score: new.high_score,
        });
    }

    if old.streak != new.streak {
        changes.push(StateChange::StreakChanged { streak: new.streak });
    }

    if old.current_level != new.current_level {
        changes.push(StateChange::CurrentLevelChanged {
            level: new.current_level,
        });
    }

    for (difficulty, new_track) in &new.levels_progress {
        let Some(old_track) = old.levels_progress.get(difficulty) else {
            changes.push(StateChange::TrackInitialized {
                difficulty: *difficulty,
            });
            continue;
        };

        for (index, level) in new_track.iter().enumerate() {
            let before = old_track.get(index);

            let completion_changed = before.is_none_or(|b| {
                !b.completed || b.stars != level.stars || b.best_time != level.best_time
            });
            if level.completed && completion_changed {
                changes.push(StateChange::LevelCompleted {
                    difficulty: *difficulty,
                    level: level.level,
                    stars: level.stars,
                    best_time: level.best_time,
                });
            }

            if level.unlocked && before.is_none_or(|b| !b.unlocked) {
                changes.push(StateChange::LevelUnlocked {
                    difficulty: *difficulty,
                    level: level.level,
                });
            }
        }
    }

    for achievement in &new.achievements {
        let was_unlocked = old.is_achievement_unlocked(&achievement.id);
        if achievement.unlocked && !was_unlocked {
            changes.push(StateChange::AchievementUnlocked {
                id: achievement.id.clone(),
            });
        }
    }

    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LEVELS_PER_TRACK, pristine_track};

    fn unlocked_flags(track: &[LevelProgress]) -> Vec<bool> {
        track.iter().map(|l| l.unlocked).collect()
    }

    #[test]
    fn test_new_state_manager() {
        let manager = StateManager::new();
        let state = manager.snapshot();

        assert!(!state.is_playing);
        assert_eq!(state.score, 0);
        assert_eq!(state.mode, GameMode::Menu);
    }

    #[test]
    fn test_update_with_change_detection() {
        let manager = StateManager::new();

        let changes = manager.update(|state| {
            state.mode = GameMode::LevelMode;
            state.streak = 3;
        });

        assert_eq!(changes.len(), 2);
        assert!(matches!(changes[0], StateChange::ModeChanged { mode: GameMode::LevelMode }));
        assert!(matches!(changes[1], StateChange::StreakChanged { streak: 3 }));
    }

    #[test]
    fn test_set_mode_keeps_score() {
        let manager = StateManager::new();
        manager.add_score(30);
        manager.increment_streak();

        manager.set_mode(GameMode::TimedChallenge);

        let state = manager.snapshot();
        assert_eq!(state.mode, GameMode::TimedChallenge);
        assert_eq!(state.score, 30);
        assert_eq!(state.streak, 1);
    }

    #[test]
    fn test_set_difficulty_keeps_session() {
        let manager = StateManager::new();
        manager.add_score(20);
        manager.set_current_level(4);

        let changes = manager.set_difficulty(Difficulty::Hard);

        assert_eq!(
            changes,
            vec![StateChange::DifficultyChanged { difficulty: Difficulty::Hard }]
        );
        let state = manager.snapshot();
        assert_eq!(state.score, 20);
        assert_eq!(state.current_level, 4);
    }

    #[test]
    fn test_add_score_tracks_high_score() {
        let manager = StateManager::new();
        manager.add_score(40);
        manager.reset_score();
        manager.add_score(10);

        let state = manager.snapshot();
        assert_eq!(state.score, 10);
        assert_eq!(state.high_score, 40);
    }

    #[test]
    fn test_start_game_resets_session() {
        let manager = StateManager::new();
        manager.add_score(50);
        manager.increment_streak();

        let changes = manager.start_game();

        assert!(changes.contains(&StateChange::SessionStarted));
        let state = manager.snapshot();
        assert!(state.is_playing);
        assert_eq!(state.score, 0);
        assert_eq!(state.streak, 0);
        assert_eq!(state.high_score, 50);
    }

    #[test]
    fn test_end_game_counts_words() {
        let manager = StateManager::new();
        manager.start_game();
        let changes = manager.end_game();

        assert!(changes.contains(&StateChange::SessionEnded {
            total_words: 1,
            correct_words: 0
        }));

        manager.start_game();
        manager.add_score(10);
        manager.end_game();

        let state = manager.snapshot();
        assert!(!state.is_playing);
        assert_eq!(state.total_words, 2);
        assert_eq!(state.correct_words, 1);
        assert!(state.is_achievement_unlocked(achievement_ids::FIRST_WORD));
    }

    #[test]
    fn test_initialize_difficulty_progress_is_idempotent() {
        let manager = StateManager::new();
        manager.update(|state| {
            state.levels_progress.shift_remove(&Difficulty::Medium);
        });

        let changes = manager.initialize_difficulty_progress(Difficulty::Medium);
        assert!(changes.contains(&StateChange::TrackInitialized {
            difficulty: Difficulty::Medium
        }));

        manager.update(|state| {
            state.track_mut(Difficulty::Medium).unwrap()[0].unlocked = false;
        });
        let changes = manager.initialize_difficulty_progress(Difficulty::Medium);
        assert!(changes.is_empty());

        let state = manager.snapshot();
        assert!(!state.track(Difficulty::Medium).unwrap()[0].unlocked);
    }

    #[test]
    fn test_current_difficulty_progress_empty_when_missing() {
        let manager = StateManager::new();
        manager.update(|state| {
            state.levels_progress.shift_remove(&Difficulty::Easy);
        });

        assert!(manager.current_difficulty_progress().is_empty());
    }

    #[test]
    fn test_complete_level_keeps_best_time() {
        let manager = StateManager::new();
        manager.set_current_level(1);

        manager.complete_level(2, Duration::from_secs(45)).unwrap();
        manager.complete_level(1, Duration::from_secs(70)).unwrap();

        let level = &manager.current_difficulty_progress()[0];
        assert_eq!(level.best_time, Some(Duration::from_secs(45)));
        assert_eq!(level.stars, 1);

        manager.complete_level(3, Duration::from_secs(20)).unwrap();
        let level = &manager.current_difficulty_progress()[0];
        assert_eq!(level.best_time, Some(Duration::from_secs(20)));
        assert_eq!(level.stars, 3);
    }

    #[test]
    fn test_complete_last_level_has_no_next() {
        let manager = StateManager::new();
        manager.set_current_level(LEVELS_PER_TRACK as u32);

        let changes = manager.complete_level(2, Duration::from_secs(40)).unwrap();

        assert!(changes.iter().any(|c| matches!(
            c,
            StateChange::LevelCompleted { level: 10, stars: 2, .. }
        )));
        let track = manager.current_difficulty_progress();
        assert_eq!(track.len(), LEVELS_PER_TRACK);
        assert!(track[9].completed && track[9].unlocked);
    }

    #[test]
    fn test_complete_level_rejects_bad_pointer() {
        let manager = StateManager::new();
        let before = manager.snapshot();

        manager.set_current_level(0);
        assert_eq!(
            manager.complete_level(1, Duration::from_secs(10)),
            Err(StateError::LevelOutOfRange { level: 0, len: 10 })
        );

        manager.set_current_level(11);
        assert_eq!(
            manager.complete_level(1, Duration::from_secs(10)),
            Err(StateError::LevelOutOfRange { level: 11, len: 10 })
        );

        let after = manager.snapshot();
        assert_eq!(before.levels_progress, after.levels_progress);
        assert_eq!(before.achievements, after.achievements);
    }

    #[test]
    fn test_complete_level_without_track() {
        let manager = StateManager::new();
        manager.update(|state| {
            state.levels_progress.shift_remove(&Difficulty::Easy);
        });

        assert_eq!(
            manager.complete_level(3, Duration::from_secs(10)),
            Err(StateError::TrackNotInitialized(Difficulty::Easy))
        );
        assert!(!manager.snapshot().is_achievement_unlocked(achievement_ids::PERFECT_LEVEL));
    }

    #[test]
    fn test_level_achievements_count_post_update() {
        let manager = StateManager::new();

        for level in 1..=4 {
            manager.set_current_level(level);
            manager.complete_level(2, Duration::from_secs(50)).unwrap();
        }
        assert!(!manager.snapshot().is_achievement_unlocked(achievement_ids::LEVEL_5));

        manager.set_current_level(5);
        let changes = manager.complete_level(2, Duration::from_secs(50)).unwrap();
        assert!(changes.contains(&StateChange::AchievementUnlocked {
            id: achievement_ids::LEVEL_5.to_string()
        }));

        for level in 6..=10 {
            manager.set_current_level(level);
            manager.complete_level(1, Duration::from_secs(90)).unwrap();
        }
        let state = manager.snapshot();
        assert!(state.is_achievement_unlocked(achievement_ids::LEVEL_10));
        assert!(!state.is_achievement_unlocked(achievement_ids::PERFECT_LEVEL));
    }

    #[test]
    fn test_level_achievements_scoped_to_active_track() {
        let manager = StateManager::new();
        for level in 1..=3 {
            manager.set_current_level(level);
            manager.complete_level(2, Duration::from_secs(50)).unwrap();
        }

        manager.set_difficulty(Difficulty::Medium);
        for level in 1..=2 {
            manager.set_current_level(level);
            manager.complete_level(2, Duration::from_secs(50)).unwrap();
        }

        assert!(!manager.snapshot().is_achievement_unlocked(achievement_ids::LEVEL_5));
    }

    #[test]
    fn test_repair_unlock_chain() {
        let mut track = pristine_track();
        track[0].unlocked = false;
        track[3].completed = true;
        track[6].unlocked = true;

        assert!(unlock_chain_needs_repair(&track));
        repair_unlock_chain(&mut track);

        assert!(!unlock_chain_needs_repair(&track));
        assert_eq!(
            unlocked_flags(&track),
            vec![true, false, false, false, true, false, true, false, false, false]
        );
    }

    #[test]
    fn test_repair_empty_track() {
        let mut track: Vec<LevelProgress> = Vec::new();
        repair_unlock_chain(&mut track);
        assert!(!unlock_chain_needs_repair(&track));
    }

    #[test]
    fn test_ensure_unlock_chain_noop_when_consistent() {
        let manager = StateManager::new();
        assert!(!manager.needs_unlock_repair());
        assert!(manager.ensure_unlock_chain().unwrap().is_empty());
    }

    #[test]
    fn test_fix_levels_unlock_without_track() {
        let manager = StateManager::new();
        manager.update(|state| {
            state.levels_progress.shift_remove(&Difficulty::Easy);
        });

        assert_eq!(
            manager.fix_levels_unlock(),
            Err(StateError::TrackNotInitialized(Difficulty::Easy))
        );
    }

    #[test]
    fn test_reset_levels_progress() {
        let manager = StateManager::new();
        manager.add_score(120);
        manager.set_current_level(1);
        manager.complete_level(3, Duration::from_secs(20)).unwrap();
        manager.set_current_level(2);

        let changes = manager.reset_levels_progress();

        assert!(changes.contains(&StateChange::ProgressReset));
        let state = manager.snapshot();
        assert_eq!(state.current_level, 1);
        assert_eq!(state.score, 120);
        assert!(state.is_achievement_unlocked(achievement_ids::PERFECT_LEVEL));
        assert!(state.is_achievement_unlocked(achievement_ids::SCORE_100));
        for difficulty in Difficulty::ALL {
            assert_eq!(state.track(difficulty).unwrap(), pristine_track().as_slice());
        }
    }

    #[test]
    fn test_reset_of_pristine_progress_emits_nothing() {
        let manager = StateManager::new();
        let mut rx = manager.subscribe();

        assert!(manager.reset_levels_progress().is_empty());
        assert!(rx.try_recv().is_err());
        assert_eq!(manager.metrics().state_updates(), 0);
    }

    #[test]
    fn test_session_markers_follow_commit_order() {
        let store = Arc::new(MemorySnapshotStore::new());
        let manager = StateManager::with_store(store.clone());
        let mut rx = manager.subscribe();

        manager.start_game();
        manager.start_game(); // already a fresh session
        manager.add_score(10);
        manager.end_game();

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        assert_eq!(
            events,
            vec![
                StateChange::SessionStarted,
                StateChange::ScoreChanged {
                    score: 10,
                    high_score: 10
                },
                StateChange::AchievementUnlocked {
                    id: achievement_ids::FIRST_WORD.to_string()
                },
                StateChange::SessionEnded {
                    total_words: 1,
                    correct_words: 1
                },
            ]
        );
        assert_eq!(store.save_count(), 3);
        assert!(!store.saved().unwrap().is_playing);
    }

    #[test]
    fn test_unlock_achievement_ignores_unknown() {
        let manager = StateManager::new();
        let changes = manager.unlock_achievement("no_such_thing");
        assert!(changes.is_empty());
    }

    #[test]
    fn test_subscribe_to_changes() {
        let manager = StateManager::new();
        let mut rx = manager.subscribe();

        manager.set_mode(GameMode::MatchMode);

        let event = rx.try_recv();
        assert!(matches!(event, Ok(StateChange::ModeChanged { mode: GameMode::MatchMode })));
    }

    #[test]
    fn test_rejected_operation_broadcasts_nothing() {
        let manager = StateManager::new();
        let mut rx = manager.subscribe();

        assert!(manager.complete_level(0, Duration::from_secs(5)).is_err());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_clone_state_manager() {
        let manager1 = StateManager::new();
        let manager2 = manager1.clone();

        manager1.add_score(10);

        assert_eq!(manager2.snapshot().score, 10);
    }

    #[test]
    fn test_metrics_count_committed_updates() {
        let manager = StateManager::new();
        manager.add_score(5);
        manager.set_mode(GameMode::Menu); // unchanged

        assert_eq!(manager.metrics().state_updates(), 1);
    }
}
