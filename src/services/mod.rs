//! Services module - Gameplay logic around the state store.
//!
//! These services hold no game progress themselves; everything that must
//! survive a restart goes through [`StateManager`](crate::state::StateManager).
//! They have no dependencies on the console layer, which keeps them testable
//! in isolation.
//!
//! # Components
//!
//! - [`WordRepository`]: The word pool, with [`BuiltinWordRepository`] as the
//!   embedded list. Random picks avoid the [`RecentWords`] window.
//! - [`GameRules`]: Points per difficulty, star rating from level time, and the
//!   speed-master check over a [`TimedSession`].
//! - [`LetterPuzzle`] / [`MatchRound`]: Per-word puzzle state for level and
//!   timed play, and for match mode.
//! - [`Narrator`]: Single-slot text-to-speech playback on the tokio runtime,
//!   with [`CommandSpeechBackend`] running an external program such as `espeak`.

pub mod puzzle;
pub mod rules;
pub mod speech;
pub mod words;

pub use puzzle::{LetterPuzzle, MatchOutcome, MatchRound};
pub use rules::{GameRules, TimedSession};
pub use speech::{
    CommandSpeechBackend, Narrator, SpeakOptions, SpeechBackend, SpeechError, SpeechFuture,
    SpeechRequest,
};
pub use words::{BuiltinWordRepository, RecentWords, WordRepository, scramble};
