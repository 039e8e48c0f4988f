//! Deck statistics over stored cards and the recent review window.

use crate::{scheduler, CardPhase, ReviewEvent, WordRecord};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Snapshot of one learner's deck
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DeckStats {
    pub total_words: usize,
    pub due_now: usize,
    pub new_cards: usize,
    pub learning: usize,
    pub review: usize,
    pub lapsed: usize,
    pub grammar_notes: usize,
    pub window_days: i64,
    pub reviews_in_window: usize,
    pub correct_in_window: usize,
}

impl DeckStats {
    /// Share of passed reviews in the window, if there were any
    pub fn accuracy(&self) -> Option<f64> {
        if self.reviews_in_window == 0 {
            None
        } else {
            Some(self.correct_in_window as f64 / self.reviews_in_window as f64)
        }
    }
}

/// Summarize `words` and the already-windowed `recent_reviews`
pub fn compute_stats(
    words: &[WordRecord],
    recent_reviews: &[ReviewEvent],
    grammar_notes: usize,
    window_days: i64,
    now: DateTime<Utc>,
) -> DeckStats {
    let mut stats = DeckStats {
        total_words: words.len(),
        grammar_notes,
        window_days,
        reviews_in_window: recent_reviews.len(),
        correct_in_window: recent_reviews.iter().filter(|r| r.passed).count(),
        ..DeckStats::default()
    };

    for word in words {
        if word.review.is_due(now) {
            stats.due_now += 1;
        }
        match scheduler::phase(&word.review) {
            CardPhase::New => stats.new_cards += 1,
            CardPhase::Learning => stats.learning += 1,
            CardPhase::Review => stats.review += 1,
            CardPhase::Lapsed => stats.lapsed += 1,
        }
    }

    tracing::debug!(
        "Stats: {} words, {} due, {} reviews in {} days",
        stats.total_words,
        stats.due_now,
        stats.reviews_in_window,
        window_days
    );
    stats
}
