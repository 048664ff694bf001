//! Per-word puzzles: scrambled letter tiles and word/translation matching.

use super::words::scramble;
use crate::models::Word;
use rand::RngCore;
use rand::seq::SliceRandom;

/// Spell one word by picking its scrambled letter tiles in order.
#[derive(Debug, Clone)]
pub struct LetterPuzzle {
    word: Word,
    tiles: Vec<char>,
    /// Indices into `tiles`, in pick order
    picked: Vec<usize>,
}

impl LetterPuzzle {
    pub fn new(word: Word, rng: &mut dyn RngCore) -> Self {
        let tiles = scramble(&word.text, rng);
        Self::with_tiles(word, tiles)
    }

    /// Puzzle over a fixed tile order.
    pub fn with_tiles(word: Word, tiles: Vec<char>) -> Self {
        Self {
            word,
            tiles,
            picked: Vec::new(),
        }
    }

    pub fn word(&self) -> &Word {
        &self.word
    }

    pub fn tiles(&self) -> &[char] {
        &self.tiles
    }

    pub fn is_picked(&self, tile: usize) -> bool {
        self.picked.contains(&tile)
    }

    /// Pick a tile. Returns false for an unknown or already picked tile.
    pub fn pick(&mut self, tile: usize) -> bool {
        if tile >= self.tiles.len() || self.is_picked(tile) {
            return false;
        }
        self.picked.push(tile);
        true
    }

    /// Put back the most recently picked tile.
    pub fn undo(&mut self) -> Option<char> {
        self.picked.pop().map(|tile| self.tiles[tile])
    }

    pub fn clear(&mut self) {
        self.picked.clear();
    }

    /// The picked letters as a string.
    pub fn attempt(&self) -> String {
        self.picked.iter().map(|&tile| self.tiles[tile]).collect()
    }

    pub fn is_complete(&self) -> bool {
        self.picked.len() == self.tiles.len()
    }

    pub fn is_correct(&self) -> bool {
        self.is_complete() && self.answer(&self.attempt())
    }

    /// Check a typed answer against the word, ignoring case and surrounding space.
    pub fn answer(&self, text: &str) -> bool {
        text.trim().eq_ignore_ascii_case(&self.word.text)
    }
}

/// Result of one match attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    Matched,
    Mismatch,
    /// One of the two cards was already matched
    AlreadyMatched,
    OutOfRange,
}

/// Pair each word with its translation.
///
/// Both columns are shuffled independently; `english` and `translations`
/// hold indices into `words`.
#[derive(Debug, Clone)]
pub struct MatchRound {
    words: Vec<Word>,
    english: Vec<usize>,
    translations: Vec<usize>,
    matched: Vec<bool>,
}

impl MatchRound {
    /// Draw up to `size` words from `pool`.
    pub fn new(pool: &[Word], size: usize, rng: &mut dyn RngCore) -> Self {
        let mut words = pool.to_vec();
        words.shuffle(rng);
        words.truncate(size);

        let mut english: Vec<usize> = (0..words.len()).collect();
        let mut translations = english.clone();
        english.shuffle(rng);
        translations.shuffle(rng);

        let matched = vec![false; words.len()];
        Self {
            words,
            english,
            translations,
            matched,
        }
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// English column in display order, with each card's matched flag.
    pub fn english_cards(&self) -> Vec<(&str, bool)> {
        self.english
            .iter()
            .map(|&i| (self.words[i].text.as_str(), self.matched[i]))
            .collect()
    }

    /// Translation column in display order, with each card's matched flag.
    pub fn translation_cards(&self) -> Vec<(&str, bool)> {
        self.translations
            .iter()
            .map(|&i| (self.words[i].translation.as_str(), self.matched[i]))
            .collect()
    }

    /// Word behind an English card.
    pub fn english_word(&self, english_index: usize) -> Option<&Word> {
        self.english.get(english_index).map(|&i| &self.words[i])
    }

    pub fn try_match(&mut self, english_index: usize, translation_index: usize) -> MatchOutcome {
        let (Some(&left), Some(&right)) = (
            self.english.get(english_index),
            self.translations.get(translation_index),
        ) else {
            return MatchOutcome::OutOfRange;
        };

        if self.matched[left] || self.matched[right] {
            return MatchOutcome::AlreadyMatched;
        }
        if left != right {
            return MatchOutcome::Mismatch;
        }

        self.matched[left] = true;
        MatchOutcome::Matched
    }

    pub fn matched_count(&self) -> usize {
        self.matched.iter().filter(|m| **m).count()
    }

    pub fn is_complete(&self) -> bool {
        self.matched.iter().all(|m| *m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn word(id: u32, text: &str, translation: &str) -> Word {
        Word::new(id, text, translation, "", Category::Animals)
    }

    #[test]
    fn test_pick_and_attempt() {
        let mut puzzle = LetterPuzzle::with_tiles(word(1, "cat", "猫"), vec!['t', 'c', 'a']);

        assert!(puzzle.pick(1));
        assert!(!puzzle.pick(1));
        assert!(!puzzle.pick(7));
        assert!(puzzle.pick(2));
        assert_eq!(puzzle.attempt(), "ca");
        assert!(!puzzle.is_complete());

        assert!(puzzle.pick(0));
        assert!(puzzle.is_complete());
        assert!(puzzle.is_correct());
    }

    #[test]
    fn test_undo_and_clear() {
        let mut puzzle = LetterPuzzle::with_tiles(word(1, "cat", "猫"), vec!['t', 'c', 'a']);
        puzzle.pick(0);
        puzzle.pick(1);

        assert_eq!(puzzle.undo(), Some('c'));
        assert_eq!(puzzle.attempt(), "t");

        puzzle.clear();
        assert_eq!(puzzle.attempt(), "");
        assert_eq!(puzzle.undo(), None);
    }

    #[test]
    fn test_wrong_order_is_not_correct() {
        let mut puzzle = LetterPuzzle::with_tiles(word(1, "cat", "猫"), vec!['t', 'c', 'a']);
        puzzle.pick(0);
        puzzle.pick(1);
        puzzle.pick(2);
        assert!(puzzle.is_complete());
        assert!(!puzzle.is_correct());
    }

    #[test]
    fn test_typed_answer() {
        let mut rng = StdRng::seed_from_u64(3);
        let puzzle = LetterPuzzle::new(word(1, "Apple", "苹果"), &mut rng);
        assert!(puzzle.answer(" apple\n"));
        assert!(!puzzle.answer("appel"));
        assert_eq!(puzzle.tiles().len(), 5);
    }

    #[test]
    fn test_match_round() {
        let pool: Vec<Word> = (1..=12)
            .map(|i| word(i, &format!("w{}", i), &format!("t{}", i)))
            .collect();
        let mut rng = StdRng::seed_from_u64(5);
        let mut round = MatchRound::new(&pool, 9, &mut rng);
        assert_eq!(round.len(), 9);

        assert_eq!(round.try_match(9, 0), MatchOutcome::OutOfRange);

        let english = round.english_word(0).unwrap().clone();
        let target = round
            .translation_cards()
            .iter()
            .position(|(t, _)| *t == english.translation)
            .unwrap();
        let wrong = (target + 1) % round.len();

        assert_eq!(round.try_match(0, wrong), MatchOutcome::Mismatch);
        assert_eq!(round.try_match(0, target), MatchOutcome::Matched);
        assert_eq!(round.try_match(0, target), MatchOutcome::AlreadyMatched);
        assert_eq!(round.matched_count(), 1);
        assert!(round.english_cards()[0].1);
        assert!(!round.is_complete());
    }

    #[test]
    fn test_small_pool_round() {
        let pool = vec![word(1, "cat", "猫"), word(2, "dog", "狗")];
        let mut rng = StdRng::seed_from_u64(9);
        let mut round = MatchRound::new(&pool, 9, &mut rng);
        assert_eq!(round.len(), 2);

        for e in 0..2 {
            let text = round.english_word(e).unwrap().translation.clone();
            let t = round
                .translation_cards()
                .iter()
                .position(|(tr, _)| *tr == text)
                .unwrap();
            assert_eq!(round.try_match(e, t), MatchOutcome::Matched);
        }
        assert!(round.is_complete());
    }
}
