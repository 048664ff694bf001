use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Number of levels in every difficulty track.
pub const LEVELS_PER_TRACK: usize = 10;

/// Which play surface is active.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    #[default]
    Menu,
    TimedChallenge,
    LevelMode,
    MatchMode,
}

impl GameMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameMode::Menu => "menu",
            GameMode::TimedChallenge => "timed-challenge",
            GameMode::LevelMode => "level-mode",
            GameMode::MatchMode => "match-mode",
        }
    }
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Player-selected difficulty. Scopes both the word pool and the level track.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    /// Difficulty a word falls into based on its length.
    pub fn for_word_length(len: usize) -> Difficulty {
        match len {
            0..=3 => Difficulty::Easy,
            4..=5 => Difficulty::Medium,
            _ => Difficulty::Hard,
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress record for one level of one difficulty track.
///
/// Missing fields in a saved entry read as an untouched, locked level.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelProgress {
    pub level: u32,
    pub completed: bool,
    /// 0 while not completed, 1..=3 afterwards
    pub stars: u8,
    pub best_time: Option<Duration>,
    pub unlocked: bool,
}

impl LevelProgress {
    /// A fresh, incomplete level. Only level 1 starts unlocked.
    pub fn pristine(level: u32) -> Self {
        Self {
            level,
            completed: false,
            stars: 0,
            best_time: None,
            unlocked: level == 1,
        }
    }
}

/// Build a pristine track of [`LEVELS_PER_TRACK`] levels.
pub fn pristine_track() -> Vec<LevelProgress> {
    (1..=LEVELS_PER_TRACK as u32).map(LevelProgress::pristine).collect()
}

/// Achievement identifiers used by the built-in triggers.
pub mod achievement_ids {
    pub const FIRST_WORD: &str = "first_word";
    pub const STREAK_5: &str = "streak_5";
    pub const STREAK_10: &str = "streak_10";
    pub const SCORE_100: &str = "score_100";
    pub const LEVEL_5: &str = "level_5";
    pub const LEVEL_10: &str = "level_10";
    pub const PERFECT_LEVEL: &str = "perfect_level";
    pub const SPEED_MASTER: &str = "speed_master";
}

/// Catalog entry. Title, description and icon come from the catalog on
/// restore, so a saved entry only needs its id and unlock state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Achievement {
    pub id: String,
    pub title: String,
    pub description: String,
    pub icon: String,
    pub unlocked: bool,
    pub unlocked_at: Option<DateTime<Utc>>,
}

impl Achievement {
    fn locked(id: &str, title: &str, description: &str, icon: &str) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            icon: icon.to_string(),
            unlocked: false,
            unlocked_at: None,
        }
    }
}

/// The fixed achievement catalog, all locked.
pub fn achievement_catalog() -> Vec<Achievement> {
    use achievement_ids::*;

    vec![
        Achievement::locked(FIRST_WORD, "First Try", "Spell your first word", "🎯"),
        Achievement::locked(STREAK_5, "Hot Streak", "Spell 5 words in a row", "🔥"),
        Achievement::locked(STREAK_10, "Unstoppable", "Spell 10 words in a row", "⚡"),
        Achievement::locked(SCORE_100, "Century", "Score 100 points in one game", "💯"),
        Achievement::locked(LEVEL_5, "Rising Star", "Complete 5 levels", "⭐"),
        Achievement::locked(LEVEL_10, "Level Master", "Complete all 10 levels", "👑"),
        Achievement::locked(PERFECT_LEVEL, "Perfect Clear", "Earn 3 stars on a level", "✨"),
        Achievement::locked(SPEED_MASTER, "Speed King", "Spell 15 words within 60 seconds", "🚀"),
    ]
}

fn pristine_levels_progress() -> IndexMap<Difficulty, Vec<LevelProgress>> {
    Difficulty::ALL
        .iter()
        .map(|difficulty| (*difficulty, pristine_track()))
        .collect()
}

/// Single source of truth for all game state.
///
/// This is also the persisted snapshot shape. Every field has a serde default
/// so that older or partial snapshots still load.
///
/// Never mutate a shared `GameState` directly; go through
/// [`StateManager`](crate::state::StateManager), which enforces invariants,
/// emits [`StateChange`](crate::state::StateChange) events and persists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameState {
    pub mode: GameMode,
    pub difficulty: Difficulty,

    // Score & stats
    pub score: u32,
    pub high_score: u32,
    pub total_words: u32,
    pub correct_words: u32,
    pub streak: u32,

    // Level mode
    pub current_level: u32,
    pub levels_progress: IndexMap<Difficulty, Vec<LevelProgress>>,

    pub achievements: Vec<Achievement>,
    pub is_playing: bool,
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            mode: GameMode::Menu,
            difficulty: Difficulty::Easy,
            score: 0,
            high_score: 0,
            total_words: 0,
            correct_words: 0,
            streak: 0,
            current_level: 1,
            levels_progress: pristine_levels_progress(),
            achievements: achievement_catalog(),
            is_playing: false,
        }
    }
}

impl GameState {
    /// Track for a difficulty, if it has been initialized.
    pub fn track(&self, difficulty: Difficulty) -> Option<&[LevelProgress]> {
        self.levels_progress.get(&difficulty).map(Vec::as_slice)
    }

    pub fn track_mut(&mut self, difficulty: Difficulty) -> Option<&mut Vec<LevelProgress>> {
        self.levels_progress.get_mut(&difficulty)
    }

    /// Track for the active difficulty.
    pub fn active_track(&self) -> Option<&[LevelProgress]> {
        self.track(self.difficulty)
    }

    pub fn completed_levels(&self, difficulty: Difficulty) -> usize {
        self.track(difficulty)
            .map(|track| track.iter().filter(|l| l.completed).count())
            .unwrap_or(0)
    }

    pub fn total_stars(&self, difficulty: Difficulty) -> u32 {
        self.track(difficulty)
            .map(|track| track.iter().map(|l| u32::from(l.stars)).sum())
            .unwrap_or(0)
    }

    pub fn achievement(&self, id: &str) -> Option<&Achievement> {
        self.achievements.iter().find(|a| a.id == id)
    }

    pub fn is_achievement_unlocked(&self, id: &str) -> bool {
        self.achievement(id).is_some_and(|a| a.unlocked)
    }

    pub fn unlocked_achievement_count(&self) -> usize {
        self.achievements.iter().filter(|a| a.unlocked).count()
    }

    /// Unlock a catalog achievement.
    ///
    /// Returns `false` (and changes nothing) for unknown or already
    /// unlocked ids, so `unlocked_at` is written exactly once.
    pub fn unlock_achievement(&mut self, id: &str, now: DateTime<Utc>) -> bool {
        match self.achievements.iter_mut().find(|a| a.id == id) {
            Some(achievement) if !achievement.unlocked => {
                achievement.unlocked = true;
                achievement.unlocked_at = Some(now);
                true
            }
            _ => false,
        }
    }

    /// Create a pristine track for `difficulty` unless one already exists.
    ///
    /// Returns `true` if a track was created. An existing track is left
    /// untouched even if it is malformed.
    pub fn ensure_track(&mut self, difficulty: Difficulty) -> bool {
        if self.levels_progress.contains_key(&difficulty) {
            return false;
        }
        self.levels_progress.insert(difficulty, pristine_track());
        true
    }

    /// Regenerate every track and rewind the level pointer.
    pub fn reset_levels(&mut self) {
        self.levels_progress = pristine_levels_progress();
        self.current_level = 1;
    }

    /// Bring a restored snapshot up to the current shape.
    ///
    /// Missing difficulty tracks are created, level numbers are taken from
    /// each entry's position, and the achievement list is rebuilt from the
    /// catalog, keeping unlock state for known ids.
    /// Returns the difficulties whose tracks had to be created.
    pub fn reconcile(&mut self) -> Vec<Difficulty> {
        let created: Vec<Difficulty> = Difficulty::ALL
            .into_iter()
            .filter(|difficulty| self.ensure_track(*difficulty))
            .collect();
        self.levels_progress.sort_keys();

        for track in self.levels_progress.values_mut() {
            for (level, progress) in (1u32..).zip(track.iter_mut()) {
                progress.level = level;
            }
        }

        let restored = std::mem::take(&mut self.achievements);
        self.achievements = achievement_catalog()
            .into_iter()
            .map(|mut entry| {
                if let Some(saved) = restored.iter().find(|a| a.id == entry.id) {
                    entry.unlocked = saved.unlocked;
                    entry.unlocked_at = if saved.unlocked {
                        saved.unlocked_at
                    } else {
                        None
                    };
                }
                entry
            })
            .collect();

        created
    }
}
