use crate::models::Difficulty;
use serde::{Deserialize, Serialize};

/// User configuration from `Spelling Config.yaml`
///
/// Every field carries a serde default so a partially written file still loads.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(rename = "Gameplay", default)]
    pub gameplay: GameplaySettings,

    #[serde(rename = "Speech", default)]
    pub speech: SpeechSettings,

    #[serde(rename = "Logging", default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameplaySettings {
    #[serde(rename = "Words Per Level", default = "default_words_per_level")]
    pub words_per_level: u32,

    #[serde(rename = "Timed Session Seconds", default = "default_timed_session_secs")]
    pub timed_session_secs: u64,

    #[serde(rename = "Match Words Per Round", default = "default_match_words")]
    pub match_words_per_round: usize,

    #[serde(rename = "Recent Word Window", default = "default_recent_window")]
    pub recent_word_window: usize,

    /// Completion time (seconds) at or under which a level earns 3 stars
    #[serde(rename = "Three Star Seconds", default = "default_three_star_secs")]
    pub three_star_secs: u64,

    /// Completion time (seconds) at or under which a level earns 2 stars
    #[serde(rename = "Two Star Seconds", default = "default_two_star_secs")]
    pub two_star_secs: u64,

    #[serde(rename = "Points Easy", default = "default_points_easy")]
    pub points_easy: u32,

    #[serde(rename = "Points Medium", default = "default_points_medium")]
    pub points_medium: u32,

    #[serde(rename = "Points Hard", default = "default_points_hard")]
    pub points_hard: u32,

    #[serde(rename = "Speed Master Words", default = "default_speed_words")]
    pub speed_master_words: u32,

    #[serde(rename = "Speed Master Seconds", default = "default_speed_secs")]
    pub speed_master_secs: u64,
}

impl Default for GameplaySettings {
    fn default() -> Self {
        Self {
            words_per_level: default_words_per_level(),
            timed_session_secs: default_timed_session_secs(),
            match_words_per_round: default_match_words(),
            recent_word_window: default_recent_window(),
            three_star_secs: default_three_star_secs(),
            two_star_secs: default_two_star_secs(),
            points_easy: default_points_easy(),
            points_medium: default_points_medium(),
            points_hard: default_points_hard(),
            speed_master_words: default_speed_words(),
            speed_master_secs: default_speed_secs(),
        }
    }
}

impl GameplaySettings {
    /// Points awarded for a correctly spelled word.
    pub fn points_for(&self, difficulty: Difficulty) -> u32 {
        match difficulty {
            Difficulty::Easy => self.points_easy,
            Difficulty::Medium => self.points_medium,
            Difficulty::Hard => self.points_hard,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechSettings {
    #[serde(rename = "Enabled", default = "default_true")]
    pub enabled: bool,

    #[serde(rename = "Program", default = "default_speech_program")]
    pub program: String,

    #[serde(rename = "Extra Args", default)]
    pub extra_args: Vec<String>,

    /// Words per minute
    #[serde(rename = "Rate", default = "default_speech_rate")]
    pub rate: u32,

    /// 0-99
    #[serde(rename = "Pitch", default = "default_speech_pitch")]
    pub pitch: u32,

    /// 0-200
    #[serde(rename = "Volume", default = "default_speech_volume")]
    pub volume: u32,

    #[serde(rename = "Timeout Seconds", default = "default_speech_timeout")]
    pub timeout_secs: u64,
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            program: default_speech_program(),
            extra_args: Vec::new(),
            rate: default_speech_rate(),
            pitch: default_speech_pitch(),
            volume: default_speech_volume(),
            timeout_secs: default_speech_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(rename = "Log Directory", default = "default_log_dir")]
    pub log_dir: String,

    #[serde(rename = "Debug Mode", default)]
    pub debug_mode: bool,

    #[serde(rename = "Console Output", default)]
    pub console_output: bool,

    /// Write the log file as JSON lines instead of plain text
    #[serde(rename = "JSON Format", default)]
    pub json_format: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
            debug_mode: false,
            console_output: false,
            json_format: false,
        }
    }
}

fn default_words_per_level() -> u32 {
    5
}

fn default_timed_session_secs() -> u64 {
    120
}

fn default_match_words() -> usize {
    9
}

fn default_recent_window() -> usize {
    5
}

fn default_three_star_secs() -> u64 {
    30
}

fn default_two_star_secs() -> u64 {
    60
}

fn default_points_easy() -> u32 {
    10
}

fn default_points_medium() -> u32 {
    20
}

fn default_points_hard() -> u32 {
    30
}

fn default_speed_words() -> u32 {
    15
}

fn default_speed_secs() -> u64 {
    60
}

fn default_true() -> bool {
    true
}

fn default_speech_program() -> String {
    "espeak".to_string()
}

fn default_speech_rate() -> u32 {
    130
}

fn default_speech_pitch() -> u32 {
    50
}

fn default_speech_volume() -> u32 {
    160
}

fn default_speech_timeout() -> u64 {
    10
}

fn default_log_dir() -> String {
    "logs".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gameplay_defaults() {
        let settings = GameplaySettings::default();
        assert_eq!(settings.words_per_level, 5);
        assert_eq!(settings.timed_session_secs, 120);
        assert_eq!(settings.match_words_per_round, 9);
        assert_eq!(settings.three_star_secs, 30);
        assert_eq!(settings.two_star_secs, 60);
    }

    #[test]
    fn test_points_for_difficulty() {
        let settings = GameplaySettings::default();
        assert_eq!(settings.points_for(Difficulty::Easy), 10);
        assert_eq!(settings.points_for(Difficulty::Medium), 20);
        assert_eq!(settings.points_for(Difficulty::Hard), 30);
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let yaml = "Gameplay:\n  Words Per Level: 8\nSpeech:\n  Enabled: false\n";
        let config: UserConfig = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(config.gameplay.words_per_level, 8);
        assert_eq!(config.gameplay.points_hard, 30);
        assert!(!config.speech.enabled);
        assert_eq!(config.speech.program, "espeak");
        assert_eq!(config.logging.log_dir, "logs");
    }
}
