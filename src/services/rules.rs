use crate::models::{Difficulty, GameplaySettings};
use std::time::{Duration, Instant};

/// Scoring and rating thresholds derived from the gameplay settings.
#[derive(Debug, Clone)]
pub struct GameRules {
    settings: GameplaySettings,
}

impl GameRules {
    pub fn new(settings: GameplaySettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &GameplaySettings {
        &self.settings
    }

    /// Points for one correctly spelled word.
    pub fn points_for(&self, difficulty: Difficulty) -> u32 {
        self.settings.points_for(difficulty)
    }

    /// Star rating for a level finished in `time`.
    ///
    /// Always in 1..=3.
    pub fn stars_for_time(&self, time: Duration) -> u8 {
        if time <= Duration::from_secs(self.settings.three_star_secs) {
            3
        } else if time <= Duration::from_secs(self.settings.two_star_secs) {
            2
        } else {
            1
        }
    }

    pub fn words_per_level(&self) -> u32 {
        self.settings.words_per_level
    }

    /// A timed session using the configured length.
    pub fn timed_session(&self) -> TimedSession {
        TimedSession::new(Duration::from_secs(self.settings.timed_session_secs))
    }

    /// Whether a session's correct words earn `speed_master`.
    pub fn is_speed_master(&self, session: &TimedSession) -> bool {
        session.words_within(Duration::from_secs(self.settings.speed_master_secs))
            >= self.settings.speed_master_words as usize
    }
}

impl Default for GameRules {
    fn default() -> Self {
        Self::new(GameplaySettings::default())
    }
}

/// Countdown for a timed challenge.
///
/// Correct words are recorded as offsets from the session start. The `_at`
/// variants take an explicit elapsed time; the plain ones read the clock.
#[derive(Debug, Clone)]
pub struct TimedSession {
    started: Instant,
    length: Duration,
    correct_at: Vec<Duration>,
}

impl TimedSession {
    pub fn new(length: Duration) -> Self {
        Self {
            started: Instant::now(),
            length,
            correct_at: Vec::new(),
        }
    }

    pub fn length(&self) -> Duration {
        self.length
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn remaining(&self) -> Duration {
        self.remaining_at(self.elapsed())
    }

    pub fn remaining_at(&self, elapsed: Duration) -> Duration {
        self.length.saturating_sub(elapsed)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(self.elapsed())
    }

    pub fn is_expired_at(&self, elapsed: Duration) -> bool {
        elapsed >= self.length
    }

    pub fn record_correct(&mut self) {
        let elapsed = self.elapsed();
        self.record_correct_at(elapsed);
    }

    /// Answers given after expiry are not counted.
    pub fn record_correct_at(&mut self, elapsed: Duration) {
        if !self.is_expired_at(elapsed) {
            self.correct_at.push(elapsed);
        }
    }

    pub fn correct_words(&self) -> usize {
        self.correct_at.len()
    }

    /// Correct words spelled within the first `window` of the session.
    pub fn words_within(&self, window: Duration) -> usize {
        self.correct_at.iter().filter(|at| **at <= window).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_points_by_difficulty() {
        let rules = GameRules::default();
        assert_eq!(rules.points_for(Difficulty::Easy), 10);
        assert_eq!(rules.points_for(Difficulty::Medium), 20);
        assert_eq!(rules.points_for(Difficulty::Hard), 30);
    }

    #[test]
    fn test_stars_for_time() {
        let rules = GameRules::default();
        assert_eq!(rules.stars_for_time(Duration::from_secs(12)), 3);
        assert_eq!(rules.stars_for_time(Duration::from_secs(30)), 3);
        assert_eq!(rules.stars_for_time(Duration::from_millis(30_001)), 2);
        assert_eq!(rules.stars_for_time(Duration::from_secs(60)), 2);
        assert_eq!(rules.stars_for_time(Duration::from_secs(61)), 1);
        assert_eq!(rules.stars_for_time(Duration::from_secs(600)), 1);
    }

    #[test]
    fn test_custom_thresholds() {
        let rules = GameRules::new(GameplaySettings {
            three_star_secs: 10,
            two_star_secs: 20,
            ..GameplaySettings::default()
        });
        assert_eq!(rules.stars_for_time(Duration::from_secs(15)), 2);
        assert_eq!(rules.stars_for_time(Duration::from_secs(25)), 1);
    }

    #[test]
    fn test_timed_session_countdown() {
        let session = GameRules::default().timed_session();
        assert_eq!(session.length(), Duration::from_secs(120));
        assert_eq!(session.remaining_at(Duration::from_secs(100)), Duration::from_secs(20));
        assert_eq!(session.remaining_at(Duration::from_secs(500)), Duration::ZERO);
        assert!(!session.is_expired_at(Duration::from_secs(119)));
        assert!(session.is_expired_at(Duration::from_secs(120)));
        assert!(!session.is_expired());
    }

    #[test]
    fn test_late_answers_not_counted() {
        let mut session = TimedSession::new(Duration::from_secs(120));
        session.record_correct_at(Duration::from_secs(10));
        session.record_correct_at(Duration::from_secs(121));
        assert_eq!(session.correct_words(), 1);
    }

    #[test]
    fn test_speed_master() {
        let rules = GameRules::default();
        let mut session = rules.timed_session();

        for second in 1..=14 {
            session.record_correct_at(Duration::from_secs(second * 4));
        }
        session.record_correct_at(Duration::from_secs(70));
        assert_eq!(session.correct_words(), 15);
        assert!(!rules.is_speed_master(&session));

        session.record_correct_at(Duration::from_secs(60));
        assert!(rules.is_speed_master(&session));
    }
}
