// Console Controller - Text front end for the game
//
// This module contains the ConsoleController which coordinates between:
// - The terminal (any BufRead input and Write output)
// - StateManager (game progress, scoring, achievements)
// - Word repository, game rules and puzzles
// - Narrator (pronunciation on the tokio runtime)
//
// State change events are drained after each answer to announce unlocks.

use crate::models::{Difficulty, GameMode, LevelProgress, Word, achievement_ids};
use crate::services::{
    GameRules, LetterPuzzle, MatchOutcome, MatchRound, Narrator, RecentWords, SpeakOptions,
    TimedSession, WordRepository,
};
use crate::state::{StateChange, StateManager};
use anyhow::{Context, Result};
use rand::SeedableRng;
use rand::rngs::StdRng;
use regex::Regex;
use std::io::{BufRead, Write};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast::{self, error::TryRecvError};

/// Outcome of one spelling prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Answer {
    Correct,
    Wrong,
    /// The answer arrived after the timed session ran out
    TimeUp,
    Quit,
}

/// Console controller that drives the menu and every play mode
///
/// Generic over its input and output so sessions can be scripted in tests.
///
/// # Example
/// ```ignore
/// let stdin = std::io::stdin();
/// let mut controller = ConsoleController::new(
///     stdin.lock(),
///     std::io::stdout(),
///     state_manager,
///     Arc::new(BuiltinWordRepository::new()),
///     GameRules::new(user_config.gameplay.clone()),
/// )?
/// .with_narrator(narrator);
/// controller.run()?; // Blocks until the player quits or input ends
/// ```
pub struct ConsoleController<R, W> {
    input: R,
    output: W,

    /// Shared game state
    state_manager: Arc<StateManager>,

    words: Arc<dyn WordRepository>,
    rules: GameRules,

    /// Pronunciation, if speech is available
    narrator: Option<Arc<Narrator>>,

    /// Words shown recently, avoided by the next pick
    recent: RecentWords,
    rng: StdRng,

    /// State change events not yet announced
    events: broadcast::Receiver<StateChange>,

    /// Match-mode input such as `3b`
    match_pattern: Regex,
}

impl<R: BufRead, W: Write> ConsoleController<R, W> {
    /// Create a new console controller
    ///
    /// # Arguments
    /// * `input` - Where player input is read from
    /// * `output` - Where game text is written
    /// * `state_manager` - Shared game state manager
    /// * `words` - Word pool for every mode
    /// * `rules` - Scoring and rating rules
    pub fn new(
        input: R,
        output: W,
        state_manager: Arc<StateManager>,
        words: Arc<dyn WordRepository>,
        rules: GameRules,
    ) -> Result<Self> {
        let match_pattern =
            Regex::new(r"^\s*(\d+)\s*([a-zA-Z])\s*$").context("Invalid match input pattern")?;
        let events = state_manager.subscribe();
        let recent = RecentWords::new(rules.settings().recent_word_window);

        tracing::info!("Console controller initialized");

        Ok(Self {
            input,
            output,
            state_manager,
            words,
            rules,
            narrator: None,
            recent,
            rng: StdRng::from_os_rng(),
            events,
            match_pattern,
        })
    }

    pub fn with_narrator(mut self, narrator: Arc<Narrator>) -> Self {
        self.narrator = Some(narrator);
        self
    }

    /// Use a fixed random source (scrambles, word picks, match layout).
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    /// Consume the controller and hand back its output.
    pub fn into_output(self) -> W {
        self.output
    }

    /// Run the main menu until the player quits or input ends
    pub fn run(&mut self) -> Result<()> {
        self.state_manager.set_mode(GameMode::Menu);

        loop {
            self.show_menu()?;
            let Some(choice) = self.read_line()? else {
                break;
            };

            match choice.as_str() {
                "1" => self.play_timed()?,
                "2" => self.play_levels()?,
                "3" => self.play_match()?,
                "4" => self.choose_difficulty()?,
                "5" => self.show_achievements()?,
                "6" => self.confirm_reset()?,
                "q" | "Q" => break,
                "" => continue,
                other => writeln!(self.output, "Unknown choice: {}", other)?,
            }

            self.state_manager.set_mode(GameMode::Menu);
            self.announce_changes()?;
        }

        if let Some(narrator) = &self.narrator {
            narrator.stop();
        }
        writeln!(self.output, "Bye!")?;
        self.output.flush()?;
        tracing::info!("Console session finished");
        Ok(())
    }

    fn show_menu(&mut self) -> Result<()> {
        let (difficulty, score, high_score, streak) = self
            .state_manager
            .read(|s| (s.difficulty, s.score, s.high_score, s.streak));

        writeln!(self.output)?;
        writeln!(self.output, "=== SpellQuest ===")?;
        writeln!(
            self.output,
            "Difficulty: {} | Score: {} | High score: {} | Streak: {}",
            difficulty, score, high_score, streak
        )?;
        writeln!(self.output, "1) Timed challenge")?;
        writeln!(self.output, "2) Level mode")?;
        writeln!(self.output, "3) Match mode")?;
        writeln!(self.output, "4) Change difficulty")?;
        writeln!(self.output, "5) Achievements")?;
        writeln!(self.output, "6) Reset level progress")?;
        writeln!(self.output, "q) Quit")?;
        write!(self.output, "> ")?;
        Ok(())
    }

    /// Next trimmed input line, `None` at end of input
    fn read_line(&mut self) -> Result<Option<String>> {
        self.output.flush()?;

        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .context("Failed to read console input")?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    fn say(&self, text: &str, options: SpeakOptions) {
        if let Some(narrator) = &self.narrator {
            narrator.speak(text, options);
        }
    }

    fn next_word(&mut self) -> Option<Word> {
        let difficulty = self.state_manager.read(|s| s.difficulty);
        let word = self
            .words
            .random_word(difficulty, &self.recent.ids(), &mut self.rng)?;
        self.recent.push(word.id);
        Some(word)
    }

    /// Show one scrambled word and score the typed answer
    ///
    /// With a `session`, an answer typed after it expired scores nothing.
    fn ask_word(&mut self, word: &Word, session: Option<&TimedSession>) -> Result<Answer> {
        let puzzle = LetterPuzzle::new(word.clone(), &mut self.rng);
        let tiles: Vec<String> = puzzle.tiles().iter().map(char::to_string).collect();

        writeln!(self.output, "{}  {}", word.pictogram, word.translation)?;
        writeln!(self.output, "Letters: {}", tiles.join(" "))?;
        self.say(&word.text, SpeakOptions::new());

        loop {
            write!(self.output, "Spell it (? to hear again, :q to stop): ")?;
            let Some(line) = self.read_line()? else {
                return Ok(Answer::Quit);
            };

            match line.as_str() {
                "?" => {
                    self.say(&word.text, SpeakOptions::new());
                    continue;
                }
                ":q" => return Ok(Answer::Quit),
                _ => {}
            }

            if session.is_some_and(TimedSession::is_expired) {
                tracing::debug!("Answer for {:?} arrived after the session ended", word.text);
                return Ok(Answer::TimeUp);
            }

            if puzzle.answer(&line) {
                let difficulty = self.state_manager.read(|s| s.difficulty);
                let points = self.rules.points_for(difficulty);
                self.state_manager.add_score(points);
                self.state_manager.increment_streak();
                self.say(&word.text, SpeakOptions::new());

                writeln!(self.output, "Correct! +{} points", points)?;
                self.announce_changes()?;
                return Ok(Answer::Correct);
            }

            self.state_manager.reset_streak();
            writeln!(self.output, "Not quite, it was \"{}\".", word.text)?;
            return Ok(Answer::Wrong);
        }
    }

    // Timed challenge

    fn play_timed(&mut self) -> Result<()> {
        self.state_manager.set_mode(GameMode::TimedChallenge);
        self.state_manager.start_game();
        self.recent.clear();

        let mut session = self.rules.timed_session();
        writeln!(
            self.output,
            "Timed challenge: spell as many words as you can in {}s",
            session.length().as_secs()
        )?;

        while !session.is_expired() {
            let Some(word) = self.next_word() else {
                writeln!(self.output, "No words available for this difficulty")?;
                break;
            };

            writeln!(self.output)?;
            writeln!(self.output, "{}s left", session.remaining().as_secs())?;
            match self.ask_word(&word, Some(&session))? {
                Answer::Correct => session.record_correct(),
                Answer::Wrong => {}
                Answer::TimeUp | Answer::Quit => break,
            }
        }

        if session.is_expired() {
            writeln!(self.output, "Time's up!")?;
        }
        if self.rules.is_speed_master(&session) {
            self.state_manager.unlock_achievement(achievement_ids::SPEED_MASTER);
        }
        self.state_manager.end_game();

        let (score, high_score) = self.state_manager.read(|s| (s.score, s.high_score));
        writeln!(
            self.output,
            "Words spelled: {} | Score: {} | High score: {}",
            session.correct_words(),
            score,
            high_score
        )?;
        self.announce_changes()
    }

    // Level mode

    fn play_levels(&mut self) -> Result<()> {
        self.state_manager.set_mode(GameMode::LevelMode);
        let difficulty = self.state_manager.read(|s| s.difficulty);
        self.state_manager.initialize_difficulty_progress(difficulty);
        if let Err(e) = self.state_manager.ensure_unlock_chain() {
            tracing::warn!("Could not repair level unlocks: {}", e);
        }
        self.announce_changes()?;

        loop {
            self.show_track()?;
            write!(self.output, "Pick a level (Enter to go back): ")?;
            let Some(line) = self.read_line()? else {
                return Ok(());
            };
            if line.is_empty() || line == ":q" {
                return Ok(());
            }

            let Ok(level) = line.parse::<u32>() else {
                writeln!(self.output, "Not a level number: {}", line)?;
                continue;
            };

            let track = self.state_manager.current_difficulty_progress();
            let entry = level
                .checked_sub(1)
                .and_then(|index| track.get(index as usize));
            match entry {
                Some(progress) if progress.unlocked => {
                    if !self.play_level(level)? {
                        return Ok(());
                    }
                }
                Some(_) => writeln!(self.output, "Level {} is locked", level)?,
                None => writeln!(self.output, "There is no level {}", level)?,
            }
        }
    }

    fn show_track(&mut self) -> Result<()> {
        let (difficulty, track) = self
            .state_manager
            .read(|s| (s.difficulty, s.active_track().map(<[_]>::to_vec).unwrap_or_default()));

        writeln!(self.output)?;
        writeln!(self.output, "--- {} levels ---", difficulty)?;
        for progress in &track {
            writeln!(self.output, "{}", describe_level(progress))?;
        }
        Ok(())
    }

    /// Play one level. Returns false if the player stopped midway.
    fn play_level(&mut self, level: u32) -> Result<bool> {
        self.state_manager.set_current_level(level);
        self.recent.clear();

        let target = self.rules.words_per_level();
        let started = Instant::now();
        let mut correct = 0;
        writeln!(self.output, "Level {}: spell {} words", level, target)?;

        while correct < target {
            let Some(word) = self.next_word() else {
                writeln!(self.output, "No words available for this difficulty")?;
                return Ok(false);
            };

            writeln!(self.output)?;
            writeln!(self.output, "Word {}/{}", correct + 1, target)?;
            match self.ask_word(&word, None)? {
                Answer::Correct => correct += 1,
                Answer::Wrong | Answer::TimeUp => {}
                Answer::Quit => {
                    writeln!(self.output, "Level {} abandoned", level)?;
                    return Ok(false);
                }
            }
        }

        let elapsed = Duration::from_secs(started.elapsed().as_secs());
        let stars = self.rules.stars_for_time(elapsed);
        match self.state_manager.complete_level(stars, elapsed) {
            Ok(_) => writeln!(
                self.output,
                "Level {} complete in {}s: {}",
                level,
                elapsed.as_secs(),
                star_string(stars)
            )?,
            Err(e) => {
                tracing::error!("Failed to record level {}: {}", level, e);
                writeln!(self.output, "Could not record the level: {}", e)?;
            }
        }
        self.announce_changes()?;
        Ok(true)
    }

    // Match mode

    fn play_match(&mut self) -> Result<()> {
        self.state_manager.set_mode(GameMode::MatchMode);
        let difficulty = self.state_manager.read(|s| s.difficulty);
        let pool = self.words.words_for_difficulty(difficulty);
        let round_size = self.rules.settings().match_words_per_round;
        let mut round = MatchRound::new(&pool, round_size, &mut self.rng);

        if round.is_empty() {
            writeln!(self.output, "No words available for this difficulty")?;
            return Ok(());
        }

        while !round.is_complete() {
            self.show_match_board(&round)?;
            write!(self.output, "Match a word and a translation (e.g. 2c, Enter to go back): ")?;
            let Some(line) = self.read_line()? else {
                return Ok(());
            };
            if line.is_empty() || line == ":q" {
                return Ok(());
            }

            let Some((english, translation)) = self.parse_match(&line) else {
                writeln!(self.output, "Type a number and a letter, like 2c")?;
                continue;
            };

            if let Some(word) = round.english_word(english) {
                self.say(&word.text, SpeakOptions::new());
            }

            let message = match round.try_match(english, translation) {
                MatchOutcome::Matched => "Match!",
                MatchOutcome::Mismatch => "Not a pair, try again",
                MatchOutcome::AlreadyMatched => "Already matched",
                MatchOutcome::OutOfRange => "No such card",
            };
            writeln!(self.output, "{}", message)?;
        }

        writeln!(self.output, "Round complete! All {} pairs matched.", round.len())?;
        Ok(())
    }

    fn show_match_board(&mut self, round: &MatchRound) -> Result<()> {
        writeln!(self.output)?;
        for (index, (text, matched)) in round.english_cards().iter().enumerate() {
            writeln!(self.output, "{:>2}) {}{}", index + 1, text, check_mark(*matched))?;
        }
        for (index, (text, matched)) in round.translation_cards().iter().enumerate() {
            writeln!(self.output, " {}) {}{}", card_letter(index), text, check_mark(*matched))?;
        }
        Ok(())
    }

    /// Parse `3b` into zero-based (english, translation) card indices
    fn parse_match(&self, line: &str) -> Option<(usize, usize)> {
        let captures = self.match_pattern.captures(line)?;
        let english = captures[1].parse::<usize>().ok()?.checked_sub(1)?;
        let letter = captures[2].chars().next()?.to_ascii_lowercase();
        Some((english, (letter as u8 - b'a') as usize))
    }

    // Settings and progress screens

    fn choose_difficulty(&mut self) -> Result<()> {
        writeln!(self.output)?;
        for (index, difficulty) in Difficulty::ALL.iter().enumerate() {
            writeln!(self.output, "{}) {}", index + 1, difficulty)?;
        }
        write!(self.output, "Difficulty: ")?;

        let Some(line) = self.read_line()? else {
            return Ok(());
        };
        let choice = line
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|index| Difficulty::ALL.get(index).copied());

        match choice {
            Some(difficulty) => {
                self.state_manager.set_difficulty(difficulty);
                self.state_manager.initialize_difficulty_progress(difficulty);
                writeln!(self.output, "Difficulty set to {}", difficulty)?;
            }
            None => writeln!(self.output, "Difficulty unchanged")?,
        }
        Ok(())
    }

    fn show_achievements(&mut self) -> Result<()> {
        let state = self.state_manager.snapshot();

        writeln!(self.output)?;
        writeln!(
            self.output,
            "--- Achievements ({}/{}) ---",
            state.unlocked_achievement_count(),
            state.achievements.len()
        )?;
        for achievement in &state.achievements {
            let status = match achievement.unlocked_at {
                Some(at) if achievement.unlocked => format!("unlocked {}", at.format("%Y-%m-%d")),
                _ if achievement.unlocked => "unlocked".to_string(),
                _ => "locked".to_string(),
            };
            writeln!(
                self.output,
                "{} {} - {} [{}]",
                achievement.icon, achievement.title, achievement.description, status
            )?;
        }

        for difficulty in Difficulty::ALL {
            writeln!(
                self.output,
                "{}: {} levels completed, {} stars",
                difficulty,
                state.completed_levels(difficulty),
                state.total_stars(difficulty)
            )?;
        }
        Ok(())
    }

    fn confirm_reset(&mut self) -> Result<()> {
        write!(self.output, "Reset level progress on every difficulty? (y/N): ")?;
        let Some(line) = self.read_line()? else {
            return Ok(());
        };

        if line.eq_ignore_ascii_case("y") {
            self.state_manager.reset_levels_progress();
            writeln!(self.output, "Level progress reset")?;
        } else {
            writeln!(self.output, "Nothing changed")?;
        }
        Ok(())
    }

    /// Print unlock events raised since the last call
    fn announce_changes(&mut self) -> Result<()> {
        loop {
            match self.events.try_recv() {
                Ok(StateChange::AchievementUnlocked { id }) => {
                    let title = self
                        .state_manager
                        .read(|s| s.achievement(&id).map(|a| format!("{} {}", a.icon, a.title)));
                    if let Some(title) = title {
                        writeln!(self.output, "Achievement unlocked: {}", title)?;
                    }
                }
                Ok(StateChange::LevelUnlocked { difficulty, level }) if level > 1 => {
                    writeln!(self.output, "{} level {} unlocked", difficulty, level)?;
                }
                Ok(_) => {}
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::debug!("Skipped {} state events", skipped);
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => return Ok(()),
            }
        }
    }
}

fn star_string(stars: u8) -> String {
    let earned = usize::from(stars.min(3));
    format!("{}{}", "★".repeat(earned), "☆".repeat(3 - earned))
}

fn check_mark(matched: bool) -> &'static str {
    if matched { "  ✓" } else { "" }
}

fn card_letter(index: usize) -> char {
    (b'a' + (index % 26) as u8) as char
}

fn describe_level(progress: &LevelProgress) -> String {
    if !progress.unlocked {
        return format!("{:>2}. locked", progress.level);
    }
    if !progress.completed {
        return format!("{:>2}. {}", progress.level, star_string(0));
    }
    match progress.best_time {
        Some(best) => format!(
            "{:>2}. {}  best {}s",
            progress.level,
            star_string(progress.stars),
            best.as_secs()
        ),
        None => format!("{:>2}. {}", progress.level, star_string(progress.stars)),
    }
}
