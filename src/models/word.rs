use super::Difficulty;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Topic a word belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Animals,
    Greetings,
    Classroom,
    Stationery,
    Family,
    Colors,
    Numbers,
    Food,
    Nature,
    Body,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Animals => "animals",
            Category::Greetings => "greetings",
            Category::Classroom => "classroom",
            Category::Stationery => "stationery",
            Category::Family => "family",
            Category::Colors => "colors",
            Category::Numbers => "numbers",
            Category::Food => "food",
            Category::Nature => "nature",
            Category::Body => "body",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A spellable word with its translation and pictogram.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Word {
    pub id: u32,
    pub text: String,
    pub translation: String,
    pub pictogram: String,
    pub category: Category,
}

impl Word {
    pub fn new(id: u32, text: &str, translation: &str, pictogram: &str, category: Category) -> Self {
        Self {
            id,
            text: text.to_string(),
            translation: translation.to_string(),
            pictogram: pictogram.to_string(),
            category,
        }
    }

    /// Difficulty derived from the number of letters.
    pub fn difficulty(&self) -> Difficulty {
        Difficulty::for_word_length(self.text.chars().count())
    }
}
