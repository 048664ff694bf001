//! Word repository: the read-only pool of spellable words.
//!
//! The built-in list ships with the binary. Difficulty is derived from word
//! length (see [`Difficulty::for_word_length`]), so adding a word never needs
//! a separate difficulty tag.

use crate::models::{Category, Difficulty, Word};
use rand::RngCore;
use rand::seq::{IndexedRandom, SliceRandom};
use std::collections::VecDeque;

/// Source of words for every play mode.
pub trait WordRepository: Send + Sync {
    /// Every word of the given difficulty, in repository order.
    fn words_for_difficulty(&self, difficulty: Difficulty) -> Vec<Word>;

    fn words_for_category(&self, category: Category) -> Vec<Word>;

    fn word_by_id(&self, id: u32) -> Option<Word>;

    /// Pick a word uniformly from the difficulty pool, skipping `exclude_ids`.
    ///
    /// Falls back to the whole pool when the exclusion would leave nothing.
    /// Returns `None` only if the pool itself is empty.
    fn random_word(
        &self,
        difficulty: Difficulty,
        exclude_ids: &[u32],
        rng: &mut dyn RngCore,
    ) -> Option<Word> {
        let pool = self.words_for_difficulty(difficulty);
        let available: Vec<&Word> = pool.iter().filter(|w| !exclude_ids.contains(&w.id)).collect();

        if available.is_empty() {
            pool.choose(rng).cloned()
        } else {
            available.choose(rng).map(|w| (*w).clone())
        }
    }
}

/// Letters of `text` in a uniformly random order.
pub fn scramble(text: &str, rng: &mut dyn RngCore) -> Vec<char> {
    let mut letters: Vec<char> = text.chars().collect();
    letters.shuffle(rng);
    letters
}

/// Ids of the most recently shown words, oldest first.
#[derive(Debug, Clone)]
pub struct RecentWords {
    ids: VecDeque<u32>,
    capacity: usize,
}

impl RecentWords {
    pub fn new(capacity: usize) -> Self {
        Self {
            ids: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, id: u32) {
        if self.capacity == 0 {
            return;
        }
        if self.ids.len() == self.capacity {
            self.ids.pop_front();
        }
        self.ids.push_back(id);
    }

    pub fn ids(&self) -> Vec<u32> {
        self.ids.iter().copied().collect()
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }
}

/// The embedded word list.
#[derive(Debug, Clone)]
pub struct BuiltinWordRepository {
    words: Vec<Word>,
}

impl BuiltinWordRepository {
    pub fn new() -> Self {
        Self {
            words: builtin_words(),
        }
    }

    /// Repository over a custom list.
    pub fn from_words(words: Vec<Word>) -> Self {
        Self { words }
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl Default for BuiltinWordRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl WordRepository for BuiltinWordRepository {
    fn words_for_difficulty(&self, difficulty: Difficulty) -> Vec<Word> {
        self.words
            .iter()
            .filter(|w| w.difficulty() == difficulty)
            .cloned()
            .collect()
    }

    fn words_for_category(&self, category: Category) -> Vec<Word> {
        self.words
            .iter()
            .filter(|w| w.category == category)
            .cloned()
            .collect()
    }

    fn word_by_id(&self, id: u32) -> Option<Word> {
        self.words.iter().find(|w| w.id == id).cloned()
    }
}

fn builtin_words() -> Vec<Word> {
    use Category::*;

    let entries: [(&str, &str, &str, Category); 48] = [
        // Short words
        ("hi", "你好", "👋", Greetings),
        ("yes", "是的", "✅", Greetings),
        ("cat", "猫", "🐱", Animals),
        ("dog", "狗", "🐶", Animals),
        ("sun", "太阳", "☀️", Nature),
        ("pen", "钢笔", "🖊️", Stationery),
        ("bag", "书包", "🎒", Stationery),
        ("cup", "杯子", "🥤", Classroom),
        ("red", "红色", "🔴", Colors),
        ("eat", "吃", "🍽️", Food),
        ("mom", "妈妈", "👩", Family),
        ("dad", "爸爸", "👨", Family),
        ("fox", "狐狸", "🦊", Animals),
        ("bee", "蜜蜂", "🐝", Animals),
        ("one", "一", "1️⃣", Numbers),
        ("two", "二", "2️⃣", Numbers),
        ("eye", "眼睛", "👁️", Body),
        ("ear", "耳朵", "👂", Body),
        // Four and five letters
        ("book", "书", "📚", Stationery),
        ("desk", "桌子", "🪑", Classroom),
        ("door", "门", "🚪", Classroom),
        ("fish", "鱼", "🐟", Animals),
        ("tree", "树", "🌲", Nature),
        ("moon", "月亮", "🌙", Nature),
        ("star", "星星", "⭐", Nature),
        ("cake", "蛋糕", "🎂", Food),
        ("milk", "牛奶", "🥛", Food),
        ("blue", "蓝色", "🔵", Colors),
        ("hand", "手", "✋", Body),
        ("three", "三", "3️⃣", Numbers),
        ("apple", "苹果", "🍎", Food),
        ("green", "绿色", "🟢", Colors),
        ("hello", "你好", "😊", Greetings),
        ("horse", "马", "🐴", Animals),
        ("chair", "椅子", "🪑", Classroom),
        ("ruler", "尺子", "📏", Stationery),
        // Six letters and up
        ("pencil", "铅笔", "✏️", Stationery),
        ("eraser", "橡皮", "🧽", Stationery),
        ("rabbit", "兔子", "🐰", Animals),
        ("monkey", "猴子", "🐵", Animals),
        ("orange", "橙子", "🍊", Food),
        ("banana", "香蕉", "🍌", Food),
        ("yellow", "黄色", "🟡", Colors),
        ("mother", "母亲", "👩", Family),
        ("father", "父亲", "👨", Family),
        ("window", "窗户", "🪟", Classroom),
        ("flower", "花", "🌸", Nature),
        ("notebook", "笔记本", "📓", Stationery),
    ];

    entries
        .iter()
        .enumerate()
        .map(|(index, (text, translation, pictogram, category))| {
            Word::new(index as u32 + 1, text, translation, pictogram, *category)
        })
        .collect()
}
