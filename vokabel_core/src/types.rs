//! Core domain types for the vocabulary tutor.
//!
//! This module defines the fundamental types used throughout the system:
//! - Card keys and review state
//! - Vocabulary and grammar records
//! - Generated tutoring content (explanations, quiz items)
//! - Review events

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Card Identity and Review State
// ============================================================================

/// Composite key addressing one learner's card
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct CardKey {
    pub user_id: String,
    pub card_id: Uuid,
}

impl CardKey {
    pub fn new(user_id: impl Into<String>, card_id: Uuid) -> Self {
        Self {
            user_id: user_id.into(),
            card_id,
        }
    }
}

impl fmt::Display for CardKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.user_id, self.card_id)
    }
}

/// Spaced-repetition state embedded in every vocabulary record
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CardState {
    pub ease: f64,
    pub interval: i64,
    pub repetitions: i64,
    pub due_at: DateTime<Utc>,
}

impl CardState {
    /// Fresh state for a card added at `now`: due immediately.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            ease: crate::scheduler::INITIAL_EASE,
            interval: 0,
            repetitions: 0,
            due_at: now,
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.due_at <= now
    }
}

/// Where a card sits in its learning lifecycle
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CardPhase {
    /// Never reviewed
    New,
    /// One or two consecutive successes
    Learning,
    /// Three or more consecutive successes
    Review,
    /// Last review failed
    Lapsed,
}

// ============================================================================
// Vocabulary and Grammar Records
// ============================================================================

/// Grammatical gender of a noun
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Gender {
    #[serde(rename = "m")]
    Masculine,
    #[serde(rename = "f")]
    Feminine,
    #[serde(rename = "n")]
    Neuter,
}

impl Gender {
    /// Gender implied by a nominative definite article
    pub fn from_article(article: &str) -> Option<Self> {
        match article.trim().to_lowercase().as_str() {
            "der" => Some(Gender::Masculine),
            "die" => Some(Gender::Feminine),
            "das" => Some(Gender::Neuter),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Gender::Masculine => "m",
            Gender::Feminine => "f",
            Gender::Neuter => "n",
        }
    }
}

/// Dictionary content of a vocabulary card
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WordEntry {
    pub lemma: String,
    pub article: Option<String>,
    pub gender: Option<Gender>,
    pub plural: Option<String>,
    #[serde(default, alias = "pos")]
    pub part_of_speech: String,
    pub translation: String,
    #[serde(default)]
    pub example_de: String,
    #[serde(default)]
    pub example_en: String,
    #[serde(default)]
    pub topic: String,
    #[serde(default = "default_cefr")]
    pub cefr: String,
}

impl WordEntry {
    /// Lemma with its article, e.g. "der Tisch"
    pub fn headword(&self) -> String {
        match self.article.as_deref().map(str::trim) {
            Some(article) if !article.is_empty() => format!("{} {}", article, self.lemma),
            _ => self.lemma.clone(),
        }
    }
}

pub(crate) fn default_cefr() -> String {
    "A1".into()
}

/// A stored vocabulary card
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WordRecord {
    pub id: Uuid,
    pub user_id: String,
    #[serde(flatten)]
    pub entry: WordEntry,
    #[serde(flatten)]
    pub review: CardState,
    pub created_at: DateTime<Utc>,
}

impl WordRecord {
    pub fn key(&self) -> CardKey {
        CardKey::new(self.user_id.clone(), self.id)
    }
}

/// A stored grammar explanation
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct GrammarNote {
    pub id: Uuid,
    pub user_id: String,
    pub topic: String,
    pub note: String,
    pub examples_de: String,
    pub examples_en: String,
    pub level: String,
    pub tags: String,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Generated Content
// ============================================================================

/// Example sentence pair
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Example {
    #[serde(default)]
    pub de: String,
    #[serde(default)]
    pub en: String,
}

/// Question/answer pair used to self-check an explanation
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct QuickCheck {
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub a: String,
}

/// A grammar explanation
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Explanation {
    pub topic: String,
    pub summary: String,
    /// First row holds the headers
    #[serde(default)]
    pub rule_table: Vec<Vec<String>>,
    #[serde(default)]
    pub examples: Vec<Example>,
    #[serde(default)]
    pub quick_check: Vec<QuickCheck>,
}

/// Kind of quiz question
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QuizKind {
    /// Multiple choice
    Mcq,
    /// Free typed answer
    Type,
    /// Fill in the gap
    Cloze,
}

/// One quiz question about a card
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct QuizItem {
    #[serde(rename = "type")]
    pub kind: QuizKind,
    pub prompt: String,
    #[serde(default)]
    pub choices: Vec<String>,
    pub answer: String,
    #[serde(default)]
    pub explanation: String,
}

impl QuizItem {
    /// Whether `given` matches the expected answer, ignoring case and
    /// surrounding whitespace
    pub fn is_correct(&self, given: &str) -> bool {
        normalize_answer(given) == normalize_answer(&self.answer)
    }
}

fn normalize_answer(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

// ============================================================================
// Review Events
// ============================================================================

/// A recorded review, appended to the review log
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ReviewEvent {
    pub id: Uuid,
    pub user_id: String,
    pub card_id: Uuid,
    pub quality: u8,
    pub passed: bool,
    pub reviewed_at: DateTime<Utc>,
    pub ease: f64,
    pub interval: i64,
    pub repetitions: i64,
    pub due_at: DateTime<Utc>,
}
