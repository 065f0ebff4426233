//! Data models for drill collections and task identities.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Consecutive correct answers needed to master a task.
pub const MASTERY_THRESHOLD: Streak = 3;

/// Count of consecutive correct answers for one task.
pub type Streak = u32;

/// Orientation in which a task is drilled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Show the prompt form, expect the answer form.
    Forward,
    /// Show the answer form, expect the prompt form.
    Backward,
    /// Grammar exercises: fill the blank in a sentence.
    Blank,
}

impl Direction {
    /// Directions drilled for every vocabulary word.
    pub const VOCABULARY: [Direction; 2] = [Direction::Forward, Direction::Backward];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Forward => "forward",
            Self::Backward => "backward",
            Self::Blank => "blank",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "forward" => Ok(Self::Forward),
            "backward" => Ok(Self::Backward),
            "blank" => Ok(Self::Blank),
            other => Err(format!("unknown direction: {}", other)),
        }
    }
}

/// Identity of a task within one collection: item id plus direction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemKey {
    pub item_id: String,
    pub direction: Direction,
}

impl ItemKey {
    pub fn new(item_id: impl Into<String>, direction: Direction) -> Self {
        Self {
            item_id: item_id.into(),
            direction,
        }
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.item_id, self.direction)
    }
}

/// Full task identity: (collection, item, direction).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskKey {
    pub collection_id: String,
    pub item_id: String,
    pub direction: Direction,
}

impl TaskKey {
    pub fn new(collection_id: impl Into<String>, item_id: impl Into<String>, direction: Direction) -> Self {
        Self {
            collection_id: collection_id.into(),
            item_id: item_id.into(),
            direction,
        }
    }

    /// The part of the key that addresses a record inside its collection.
    pub fn item_key(&self) -> ItemKey {
        ItemKey::new(self.item_id.clone(), self.direction)
    }
}

impl fmt::Display for TaskKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}_{}", self.collection_id, self.item_id, self.direction)
    }
}

/// An example sentence with its translation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Example {
    pub text: String,
    pub translation: String,
}

/// A vocabulary word.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Word {
    pub id: String,
    pub prompt: String,
    /// May list alternatives separated by `" / "`.
    pub answer: String,

    // Metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part_of_speech: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<Example>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// A fill-in-the-blank grammar exercise. The blank is marked with `___`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exercise {
    pub id: String,
    pub sentence: String,
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

/// Drillable units of a collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Content {
    Vocabulary { words: Vec<Word> },
    Grammar { exercises: Vec<Exercise> },
}

/// Which kind of content a collection holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionKind {
    Vocabulary,
    Grammar,
}

impl CollectionKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Vocabulary => "deck",
            Self::Grammar => "lesson",
        }
    }
}

/// A static, read-only deck of words or lesson of exercises.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collection {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(flatten)]
    pub content: Content,
}

impl Collection {
    pub fn vocabulary(id: impl Into<String>, name: impl Into<String>, words: Vec<Word>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            category: None,
            content: Content::Vocabulary { words },
        }
    }

    pub fn grammar(id: impl Into<String>, name: impl Into<String>, exercises: Vec<Exercise>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            category: None,
            content: Content::Grammar { exercises },
        }
    }

    pub fn kind(&self) -> CollectionKind {
        match self.content {
            Content::Vocabulary { .. } => CollectionKind::Vocabulary,
            Content::Grammar { .. } => CollectionKind::Grammar,
        }
    }

    /// Every drillable key, in collection order.
    pub fn item_keys(&self) -> Vec<ItemKey> {
        match &self.content {
            Content::Vocabulary { words } => words
                .iter()
                .flat_map(|w| Direction::VOCABULARY.iter().map(move |d| ItemKey::new(w.id.clone(), *d)))
                .collect(),
            Content::Grammar { exercises } => exercises
                .iter()
                .map(|e| ItemKey::new(e.id.clone(), Direction::Blank))
                .collect(),
        }
    }

    /// What to show and expect for a task, or `None` if the key does not
    /// belong to this collection.
    pub fn prompt(&self, key: &ItemKey) -> Option<Prompt<'_>> {
        match (&self.content, key.direction) {
            (Content::Vocabulary { words }, Direction::Forward | Direction::Backward) => {
                let word = words.iter().find(|w| w.id == key.item_id)?;
                let (question, answer) = if key.direction == Direction::Forward {
                    (word.prompt.as_str(), word.answer.as_str())
                } else {
                    (word.answer.as_str(), word.prompt.as_str())
                };
                Some(Prompt {
                    question,
                    answer,
                    hint: word.notes.as_deref(),
                    examples: &word.examples,
                })
            }
            (Content::Grammar { exercises }, Direction::Blank) => {
                let exercise = exercises.iter().find(|e| e.id == key.item_id)?;
                Some(Prompt {
                    question: exercise.sentence.as_str(),
                    answer: exercise.answer.as_str(),
                    hint: exercise.hint.as_deref(),
                    examples: &[],
                })
            }
            _ => None,
        }
    }
}

/// Display view of one task.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prompt<'a> {
    pub question: &'a str,
    pub answer: &'a str,
    pub hint: Option<&'a str>,
    pub examples: &'a [Example],
}
