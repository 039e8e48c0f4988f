//! Tutoring session logic.
//!
//! [`Tutor`] turns chat-style messages into replies. It is transport
//! agnostic: the CLI feeds it stdin lines, a chat webhook would feed it
//! message texts. Scheduling always goes through [`SchedulerParams`], the
//! tutor only reads the current state and persists what comes back.

use crate::content::{ContentOracle, QuizRequest, WordRequest};
use crate::review_log::{load_recent_reviews, JsonlReviewLog, ReviewSink};
use crate::scheduler::{format_timestamp, Quality, SchedulerParams};
use crate::stats::{compute_stats, DeckStats};
use crate::store::CardStore;
use crate::{
    CardKey, Config, Error, Explanation, GrammarNote, QuizItem, QuizKind, Result, ReviewEvent,
    TutorConfig, WordRecord,
};
use chrono::{DateTime, Utc};
use std::fmt;
use uuid::Uuid;

/// Reply sent back to the learner
#[derive(Clone, Debug, PartialEq)]
pub enum Reply {
    Text(String),
    /// A question awaiting an answer for `key`
    Quiz { key: CardKey, item: QuizItem },
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Text(text) => f.write_str(text),
            Reply::Quiz { item, .. } => {
                write!(f, "📝 {}", item.prompt)?;
                for (i, choice) in item.choices.iter().enumerate() {
                    write!(f, "\n  {}) {}", i + 1, choice)?;
                }
                Ok(())
            }
        }
    }
}

/// One due card prepared for quizzing
#[derive(Clone, Debug)]
pub struct QuizCard {
    pub word: WordRecord,
    /// `None` when no question could be generated; show the flashcard instead
    pub item: Option<QuizItem>,
}

impl QuizCard {
    pub fn key(&self) -> CardKey {
        self.word.key()
    }

    /// Plain flashcard text used when there is no question
    pub fn flashcard(&self) -> String {
        let entry = &self.word.entry;
        let mut text = format!("• {} → {}", entry.headword(), entry.translation);
        if !entry.example_de.is_empty() {
            text.push_str(&format!("\nBeispiel: {}", entry.example_de));
        }
        text
    }

    pub fn into_reply(self) -> Reply {
        match self.item {
            Some(item) => Reply::Quiz {
                key: self.word.key(),
                item,
            },
            None => Reply::Text(self.flashcard()),
        }
    }
}

/// Result of grading one answer
#[derive(Clone, Debug)]
pub struct AnswerOutcome {
    pub correct: bool,
    pub expected: String,
    pub event: ReviewEvent,
}

impl AnswerOutcome {
    pub fn feedback(&self) -> String {
        let verdict = if self.correct {
            "✅ Richtig!".to_string()
        } else {
            format!("❌ Falsch. Richtige Antwort: {}", self.expected)
        };
        format!(
            "{}\nNächste Wiederholung: {}",
            verdict,
            format_timestamp(self.event.due_at)
        )
    }
}

const HELP: &str = "👋 Hallo! Ich bin dein Vokabeltrainer.\n\n\
Befehle:\n\
• /add der Tisch | table | die Tische | Möbel\n\
• /explain Dativartikel\n\
• /quiz 5\n\
• /due\n\
• /stats";

const NOT_UNDERSTOOD: &str =
    "Ich habe dich nicht verstanden. Versuche /add, /explain, /quiz, /due, /stats.";

/// Dispatches learner requests against a store and a content oracle
pub struct Tutor<S, O> {
    store: S,
    oracle: O,
    review_log: JsonlReviewLog,
    settings: TutorConfig,
    scheduler: SchedulerParams,
}

impl<S: CardStore, O: ContentOracle> Tutor<S, O> {
    pub fn new(store: S, oracle: O, review_log: JsonlReviewLog, config: &Config) -> Self {
        Self {
            store,
            oracle,
            review_log,
            settings: config.tutor.clone(),
            scheduler: config.scheduler,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn settings(&self) -> &TutorConfig {
        &self.settings
    }

    /// Handle one chat message and produce the replies to send
    pub fn handle_message(&self, user_id: &str, text: &str, now: DateTime<Utc>) -> Vec<Reply> {
        let text = text.trim();
        let (command, args) = match text.split_once(char::is_whitespace) {
            Some((command, args)) => (command, args.trim()),
            None => (text, ""),
        };
        // Chat clients may address a bot as "/quiz@name"
        let command = command.split('@').next().unwrap_or(command);
        tracing::debug!("Message from {}: command {:?}", user_id, command);

        match command {
            "/start" | "/help" => vec![Reply::Text(HELP.into())],
            "/add" => vec![self.reply_add(user_id, args, now)],
            "/explain" => vec![self.reply_explain(user_id, args, now)],
            "/quiz" => self.reply_quiz(user_id, args, now),
            "/due" => vec![self.reply_due(user_id, now)],
            "/stats" => vec![self.reply_stats(user_id, now)],
            "" => vec![Reply::Text(NOT_UNDERSTOOD.into())],
            c if c.starts_with('/') => vec![Reply::Text(NOT_UNDERSTOOD.into())],
            _ => vec![self.reply_free_text(text)],
        }
    }

    fn reply_add(&self, user_id: &str, args: &str, now: DateTime<Utc>) -> Reply {
        match self.add_word(user_id, args, now) {
            Ok(word) => {
                let entry = &word.entry;
                let mut text = format!("✅ Hinzugefügt: {} — {}", entry.headword(), entry.translation);
                if !entry.example_de.is_empty() {
                    text.push_str(&format!("\n{}\n{}", entry.example_de, entry.example_en));
                }
                Reply::Text(text)
            }
            Err(Error::Content(e)) => Reply::Text(format!("⚠️ Wort nicht erkannt: {}", e)),
            Err(e) => Reply::Text(format!("⚠️ Konnte nicht speichern: {}", e)),
        }
    }

    fn reply_explain(&self, user_id: &str, args: &str, now: DateTime<Utc>) -> Reply {
        let topic = if args.is_empty() {
            self.settings.default_explain_topic.clone()
        } else {
            args.to_string()
        };
        match self.explain(user_id, &topic, now) {
            Ok(explanation) => Reply::Text(render_explanation(&explanation)),
            Err(e) => Reply::Text(format!("⚠️ Konnte das Thema nicht erklären: {}", e)),
        }
    }

    fn reply_quiz(&self, user_id: &str, args: &str, now: DateTime<Utc>) -> Vec<Reply> {
        let count = args
            .split_whitespace()
            .next()
            .and_then(|n| n.parse::<usize>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(self.settings.quiz_size);

        match self.quiz(user_id, count, now) {
            Ok(cards) if cards.is_empty() => vec![Reply::Text(
                "🎉 Keine fälligen Karten. /add um neue Wörter zu lernen!".into(),
            )],
            Ok(cards) => cards.into_iter().map(QuizCard::into_reply).collect(),
            Err(e) => vec![Reply::Text(format!(
                "⚠️ Konnte fällige Karten nicht laden: {}",
                e
            ))],
        }
    }

    fn reply_due(&self, user_id: &str, now: DateTime<Utc>) -> Reply {
        match self.due(user_id, now) {
            Ok(due) => Reply::Text(format!("📅 Fällig: {}", due.len())),
            Err(e) => Reply::Text(format!("⚠️ Fehler: {}", e)),
        }
    }

    fn reply_stats(&self, user_id: &str, now: DateTime<Utc>) -> Reply {
        match self.stats(user_id, now) {
            Ok(stats) => Reply::Text(render_stats(&stats)),
            Err(e) => Reply::Text(format!("⚠️ Fehler: {}", e)),
        }
    }

    fn reply_free_text(&self, text: &str) -> Reply {
        match self.oracle.generate_explanation(text) {
            Ok(explanation) => Reply::Text(explanation.summary),
            Err(e) => {
                tracing::debug!("Free text not explainable: {}", e);
                Reply::Text(NOT_UNDERSTOOD.into())
            }
        }
    }

    /// Create a card from an `/add` payload (`word | translation | plural | topic`)
    pub fn add_word(&self, user_id: &str, payload: &str, now: DateTime<Utc>) -> Result<WordRecord> {
        let request = WordRequest::parse(payload);
        let entry = self.oracle.generate_word_entry(&request)?;
        self.store.create_word(user_id, entry, now)
    }

    /// Explain a topic and keep a grammar note of it.
    ///
    /// A failure to store the note does not fail the explanation.
    pub fn explain(&self, user_id: &str, topic: &str, now: DateTime<Utc>) -> Result<Explanation> {
        let explanation = self.oracle.generate_explanation(topic)?;

        let note = GrammarNote {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            topic: explanation.topic.clone(),
            note: explanation.summary.clone(),
            examples_de: join_lines(explanation.examples.iter().map(|ex| ex.de.as_str())),
            examples_en: join_lines(explanation.examples.iter().map(|ex| ex.en.as_str())),
            level: "A1-A2".into(),
            tags: "explain".into(),
            created_at: now,
        };
        if let Err(e) = self.store.create_grammar(note) {
            tracing::warn!("Failed to store grammar note on {}: {}", explanation.topic, e);
        }

        Ok(explanation)
    }

    /// Cards due now, earliest first, capped at the configured limit
    pub fn due(&self, user_id: &str, now: DateTime<Utc>) -> Result<Vec<WordRecord>> {
        self.store.list_due(user_id, now, self.settings.due_limit)
    }

    /// Prepare up to `count` due cards for quizzing
    pub fn quiz(&self, user_id: &str, count: usize, now: DateTime<Utc>) -> Result<Vec<QuizCard>> {
        let count = count.min(self.settings.due_limit);
        let due = self.store.list_due(user_id, now, count)?;
        if due.is_empty() {
            return Ok(Vec::new());
        }
        let deck = self.store.list_words(user_id)?;

        let cards = due
            .into_iter()
            .map(|word| {
                let request = QuizRequest {
                    distractors: distractors_for(&word, &deck),
                    word: &word,
                };
                let item = match self.oracle.generate_quiz_item(&request) {
                    Ok(item) => Some(item),
                    Err(e) => {
                        tracing::warn!("No quiz item for {}: {}", word.key(), e);
                        None
                    }
                };
                QuizCard { word, item }
            })
            .collect();
        Ok(cards)
    }

    /// Grade `given` against `item` and schedule the card accordingly.
    ///
    /// Multiple-choice answers may be given as the 1-based choice number.
    pub fn answer(
        &mut self,
        key: &CardKey,
        item: &QuizItem,
        given: &str,
        now: DateTime<Utc>,
    ) -> Result<AnswerOutcome> {
        let chosen = match (item.kind, given.trim().parse::<usize>()) {
            (QuizKind::Mcq, Ok(n)) if (1..=item.choices.len()).contains(&n) => {
                item.choices[n - 1].as_str()
            }
            _ => given,
        };
        let correct = item.is_correct(chosen);
        let event = self.record_review(key, Quality::from_correct(correct).value() as i32, now)?;

        Ok(AnswerOutcome {
            correct,
            expected: item.answer.clone(),
            event,
        })
    }

    /// Apply one review of `quality` to the stored card and log it.
    ///
    /// Fails only when the card cannot be rescheduled. A review log that
    /// cannot be written is reported as a warning.
    pub fn record_review(
        &mut self,
        key: &CardKey,
        quality: i32,
        now: DateTime<Utc>,
    ) -> Result<ReviewEvent> {
        let scheduler = self.scheduler;
        let state = self.store.modify_card_state(key, |current| {
            scheduler
                .compute_next(current.ease, current.interval, current.repetitions, quality)?
                .into_state(now)
        })?;

        let quality = Quality::new(quality);
        let event = ReviewEvent {
            id: Uuid::new_v4(),
            user_id: key.user_id.clone(),
            card_id: key.card_id,
            quality: quality.value(),
            passed: quality.is_pass(),
            reviewed_at: now,
            ease: state.ease,
            interval: state.interval,
            repetitions: state.repetitions,
            due_at: state.due_at,
        };
        // The card is already rescheduled; a lost log line only affects stats
        if let Err(e) = self.review_log.append(&event) {
            tracing::warn!("Failed to log review {} of {}: {}", event.id, key, e);
        }

        tracing::info!(
            "Reviewed {} with quality {}: next in {} days",
            key,
            event.quality,
            event.interval
        );
        Ok(event)
    }

    /// Statistics for the learner's deck and recent reviews
    pub fn stats(&self, user_id: &str, now: DateTime<Utc>) -> Result<DeckStats> {
        let words = self.store.list_words(user_id)?;
        let grammar = self.store.list_grammar(user_id)?.len();
        let window = self.settings.stats_window_days;
        let reviews = load_recent_reviews(self.review_log.path(), user_id, now, window)?;
        Ok(compute_stats(&words, &reviews, grammar, window, now))
    }
}

fn join_lines<'a>(lines: impl Iterator<Item = &'a str>) -> String {
    lines.collect::<Vec<_>>().join("\n")
}

// Other cards' translations, starting at an offset derived from the card id
fn distractors_for(word: &WordRecord, deck: &[WordRecord]) -> Vec<String> {
    let others: Vec<&WordRecord> = deck.iter().filter(|w| w.id != word.id).collect();
    if others.is_empty() {
        return Vec::new();
    }
    let offset = (word.id.as_u128() % others.len() as u128) as usize;
    others[offset..]
        .iter()
        .chain(others[..offset].iter())
        .map(|w| w.entry.translation.clone())
        .collect()
}

/// Text rendering of an explanation
pub fn render_explanation(explanation: &Explanation) -> String {
    let mut lines = vec![format!("📘 {}", explanation.topic), explanation.summary.clone()];

    if let Some((headers, rows)) = explanation.rule_table.split_first() {
        lines.push(String::new());
        lines.push("Regeln:".into());
        lines.push(headers.join(" | "));
        lines.extend(rows.iter().map(|row| row.join(" | ")));
    }
    if !explanation.examples.is_empty() {
        lines.push(String::new());
        lines.push("Beispiele:".into());
        for ex in &explanation.examples {
            lines.push(format!("• {} — {}", ex.de, ex.en));
        }
    }
    if !explanation.quick_check.is_empty() {
        lines.push(String::new());
        lines.push("Quick-Check:".into());
        for qc in &explanation.quick_check {
            lines.push(format!("F: {}\nA: {}", qc.q, qc.a));
        }
    }
    lines.join("\n")
}

/// Text rendering of deck statistics
pub fn render_stats(stats: &DeckStats) -> String {
    let mut text = format!(
        "📊 Wörter: {}\nFällig: {}\nNeu: {} · Lernen: {} · Wiederholung: {} · Vergessen: {}\nGrammatik-Notizen: {}\nWiederholungen ({} Tage): {}",
        stats.total_words,
        stats.due_now,
        stats.new_cards,
        stats.learning,
        stats.review,
        stats.lapsed,
        stats.grammar_notes,
        stats.window_days,
        stats.reviews_in_window,
    );
    if let Some(accuracy) = stats.accuracy() {
        text.push_str(&format!(
            ", davon richtig: {} ({:.0}%)",
            stats.correct_in_window,
            accuracy * 100.0
        ));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{ContentError, OfflineOracle, PromptedOracle};
    use crate::review_log::read_reviews;
    use crate::store::JsonFileStore;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn tutor_with<O: ContentOracle>(
        dir: &tempfile::TempDir,
        oracle: O,
    ) -> Tutor<JsonFileStore, O> {
        crate::logging::init_test();
        Tutor::new(
            JsonFileStore::new(Config::deck_path(dir.path())),
            oracle,
            JsonlReviewLog::new(Config::review_log_path(dir.path())),
            &Config::default(),
        )
    }

    fn text(reply: &Reply) -> &str {
        match reply {
            Reply::Text(text) => text,
            other => panic!("expected text reply, got {:?}", other),
        }
    }

    #[test]
    fn test_start_lists_commands() {
        let dir = tempfile::tempdir().unwrap();
        let tutor = tutor_with(&dir, OfflineOracle);
        let replies = tutor.handle_message("anna", "/start", now());
        assert_eq!(replies.len(), 1);
        assert!(text(&replies[0]).contains("/add"));
        assert!(text(&replies[0]).contains("/quiz"));
    }

    #[test]
    fn test_add_then_due_and_stats() {
        let dir = tempfile::tempdir().unwrap();
        let tutor = tutor_with(&dir, OfflineOracle);

        let replies = tutor.handle_message("anna", "/add der Tisch | table | die Tische | Möbel", now());
        assert_eq!(text(&replies[0]), "✅ Hinzugefügt: der Tisch — table");

        let replies = tutor.handle_message("anna", "/due", now());
        assert_eq!(text(&replies[0]), "📅 Fällig: 1");

        // Another learner has an empty deck
        let replies = tutor.handle_message("ben", "/due@vokabel_bot", now());
        assert_eq!(text(&replies[0]), "📅 Fällig: 0");

        let replies = tutor.handle_message("anna", "/stats", now());
        assert!(text(&replies[0]).starts_with("📊 Wörter: 1"));
    }

    #[test]
    fn test_add_without_translation_reports_content_error() {
        let dir = tempfile::tempdir().unwrap();
        let tutor = tutor_with(&dir, OfflineOracle);

        let replies = tutor.handle_message("anna", "/add der Tisch", now());
        assert!(text(&replies[0]).starts_with("⚠️ Wort nicht erkannt"));
        assert_eq!(tutor.store().count_words("anna").unwrap(), 0);
    }

    #[test]
    fn test_explain_default_topic_stores_note() {
        let dir = tempfile::tempdir().unwrap();
        let tutor = tutor_with(&dir, OfflineOracle);

        let replies = tutor.handle_message("anna", "/explain", now());
        let reply = text(&replies[0]);
        assert!(reply.starts_with("📘 Artikel und Kasus"));
        assert!(reply.contains("Nominativ | der | die | das | die"));
        assert!(reply.contains("Quick-Check:"));

        let notes = tutor.store().list_grammar("anna").unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].tags, "explain");
        assert!(notes[0].examples_de.contains("Der Tisch ist neu."));
    }

    #[test]
    fn test_explain_unknown_topic() {
        let dir = tempfile::tempdir().unwrap();
        let tutor = tutor_with(&dir, OfflineOracle);

        let replies = tutor.handle_message("anna", "/explain Konjunktiv II", now());
        assert!(text(&replies[0]).starts_with("⚠️ Konnte das Thema nicht erklären"));
        assert!(tutor.store().list_grammar("anna").unwrap().is_empty());
    }

    #[test]
    fn test_free_text_and_unknown_commands() {
        let dir = tempfile::tempdir().unwrap();
        let tutor = tutor_with(&dir, OfflineOracle);

        let replies = tutor.handle_message("anna", "dativ", now());
        assert!(text(&replies[0]).starts_with("Im Dativ"));

        let replies = tutor.handle_message("anna", "wie geht's?", now());
        assert_eq!(text(&replies[0]), NOT_UNDERSTOOD);

        let replies = tutor.handle_message("anna", "/unknown", now());
        assert_eq!(text(&replies[0]), NOT_UNDERSTOOD);

        let replies = tutor.handle_message("anna", "   ", now());
        assert_eq!(text(&replies[0]), NOT_UNDERSTOOD);
    }

    #[test]
    fn test_quiz_with_nothing_due() {
        let dir = tempfile::tempdir().unwrap();
        let tutor = tutor_with(&dir, OfflineOracle);
        let replies = tutor.handle_message("anna", "/quiz", now());
        assert!(text(&replies[0]).starts_with("🎉"));
    }

    #[test]
    fn test_quiz_builds_multiple_choice_from_deck() {
        let dir = tempfile::tempdir().unwrap();
        let tutor = tutor_with(&dir, OfflineOracle);
        for payload in ["der Tisch | table", "der Stuhl | chair", "die Lampe | lamp"] {
            tutor.add_word("anna", payload, now()).unwrap();
        }

        let replies = tutor.handle_message("anna", "/quiz 2", now());
        assert_eq!(replies.len(), 2);
        for reply in &replies {
            match reply {
                Reply::Quiz { item, .. } => {
                    assert_eq!(item.kind, QuizKind::Mcq);
                    assert_eq!(item.choices.len(), 3);
                    assert!(reply.to_string().contains("  1) "));
                }
                other => panic!("expected quiz, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_quiz_falls_back_to_flashcard() {
        let dir = tempfile::tempdir().unwrap();
        let oracle = PromptedOracle::new(|_: &str, prompt: &str| -> std::result::Result<String, ContentError> {
            if prompt.starts_with("ADD WORD") {
                Ok(r#"{"lemma": "Tisch", "article": "der", "translation": "table",
                       "example_de": "Der Tisch ist groß."}"#
                    .into())
            } else {
                Ok("Sorry, I can't do that right now.".into())
            }
        });
        let tutor = tutor_with(&dir, oracle);
        tutor.add_word("anna", "Tisch", now()).unwrap();

        let replies = tutor.handle_message("anna", "/quiz", now());
        assert_eq!(
            text(&replies[0]),
            "• der Tisch → table\nBeispiel: Der Tisch ist groß."
        );
    }

    #[test]
    fn test_correct_answers_follow_sm2_schedule() {
        let dir = tempfile::tempdir().unwrap();
        let mut tutor = tutor_with(&dir, OfflineOracle);
        let word = tutor.add_word("anna", "der Tisch | table", now()).unwrap();
        let key = word.key();

        let mut when = now();
        let mut intervals = Vec::new();
        for _ in 0..4 {
            let cards = tutor.quiz("anna", 1, when).unwrap();
            assert_eq!(cards.len(), 1);
            let item = cards[0].item.clone().unwrap();
            let outcome = tutor.answer(&key, &item, "Table", when).unwrap();
            assert!(outcome.correct);
            intervals.push(outcome.event.interval);

            // Not due again until the interval has passed
            assert!(tutor.due("anna", when).unwrap().is_empty());
            when = outcome.event.due_at;
        }
        assert_eq!(intervals, vec![1, 6, 15, 38]);

        let state = tutor.store().get_card_state(&key).unwrap();
        assert_eq!(state.repetitions, 4);
        assert_eq!(state.due_at, when);
    }

    #[test]
    fn test_wrong_answer_lapses_from_stored_state() {
        let dir = tempfile::tempdir().unwrap();
        let mut tutor = tutor_with(&dir, OfflineOracle);
        let word = tutor.add_word("anna", "der Tisch | table", now()).unwrap();
        let key = word.key();

        for _ in 0..3 {
            tutor.record_review(&key, 4, now()).unwrap();
        }
        assert_eq!(tutor.store().get_card_state(&key).unwrap().interval, 15);

        let item = QuizItem {
            kind: QuizKind::Type,
            prompt: "Übersetze: der Tisch".into(),
            choices: vec![],
            answer: "table".into(),
            explanation: String::new(),
        };
        let outcome = tutor.answer(&key, &item, "chair", now()).unwrap();
        assert!(!outcome.correct);
        assert!(outcome.feedback().contains("Richtige Antwort: table"));
        assert!(outcome.feedback().contains("2024-01-02T00:00:00Z"));

        let state = tutor.store().get_card_state(&key).unwrap();
        assert_eq!(state.repetitions, 0);
        assert_eq!(state.interval, 1);
        assert_eq!(state.due_at, now() + Duration::days(1));
        assert!(state.ease >= crate::scheduler::MIN_EASE);
    }

    #[test]
    fn test_answer_by_choice_number() {
        let dir = tempfile::tempdir().unwrap();
        let mut tutor = tutor_with(&dir, OfflineOracle);
        let word = tutor.add_word("anna", "der Tisch | table", now()).unwrap();

        let item = QuizItem {
            kind: QuizKind::Mcq,
            prompt: "Was bedeutet 'der Tisch'?".into(),
            choices: vec!["chair".into(), "table".into()],
            answer: "table".into(),
            explanation: String::new(),
        };
        assert!(tutor.answer(&word.key(), &item, "2", now()).unwrap().correct);
        assert!(!tutor.answer(&word.key(), &item, "1", now()).unwrap().correct);
        // Out of range numbers are compared as text
        assert!(!tutor.answer(&word.key(), &item, "7", now()).unwrap().correct);
    }

    #[test]
    fn test_reviews_are_logged_and_counted() {
        let dir = tempfile::tempdir().unwrap();
        let mut tutor = tutor_with(&dir, OfflineOracle);
        let word = tutor.add_word("anna", "der Tisch | table", now()).unwrap();

        tutor.record_review(&word.key(), 5, now()).unwrap();
        tutor.record_review(&word.key(), 0, now()).unwrap();
        tutor.record_review(&word.key(), 99, now()).unwrap();

        let events = read_reviews(&Config::review_log_path(dir.path())).unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[2].quality, 5);
        assert!(!events[1].passed);

        let stats = tutor.stats("anna", now()).unwrap();
        assert_eq!(stats.reviews_in_window, 3);
        assert_eq!(stats.correct_in_window, 2);
        assert!(render_stats(&stats).contains("davon richtig: 2 (67%)"));
    }

    #[test]
    fn test_review_of_unknown_card_fails_without_logging() {
        let dir = tempfile::tempdir().unwrap();
        let mut tutor = tutor_with(&dir, OfflineOracle);
        let key = CardKey::new("anna", Uuid::new_v4());

        assert!(matches!(
            tutor.record_review(&key, 4, now()),
            Err(Error::NotFound(_))
        ));
        assert!(read_reviews(&Config::review_log_path(dir.path()))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_unwritable_review_log_does_not_fail_review() {
        let dir = tempfile::tempdir().unwrap();
        crate::logging::init_test();
        // A directory where the log file should be
        let mut tutor = Tutor::new(
            JsonFileStore::new(Config::deck_path(dir.path())),
            OfflineOracle,
            JsonlReviewLog::new(dir.path()),
            &Config::default(),
        );
        let word = tutor.add_word("anna", "der Tisch | table", now()).unwrap();

        let event = tutor.record_review(&word.key(), 4, now()).unwrap();
        assert_eq!(event.repetitions, 1);

        let state = tutor.store().get_card_state(&word.key()).unwrap();
        assert_eq!(state.repetitions, 1);
        assert_eq!(state.due_at, event.due_at);
    }

    #[test]
    fn test_stats_with_unbounded_window() {
        let dir = tempfile::tempdir().unwrap();
        crate::logging::init_test();
        let mut config = Config::default();
        config.tutor.stats_window_days = i64::MAX / 2;
        let mut tutor = Tutor::new(
            JsonFileStore::new(Config::deck_path(dir.path())),
            OfflineOracle,
            JsonlReviewLog::new(Config::review_log_path(dir.path())),
            &config,
        );
        let word = tutor.add_word("anna", "der Tisch | table", now()).unwrap();
        tutor.record_review(&word.key(), 4, now() - Duration::days(4000)).unwrap();

        let stats = tutor.stats("anna", now()).unwrap();
        assert_eq!(stats.reviews_in_window, 1);
        assert_eq!(stats.window_days, i64::MAX / 2);
    }

    #[test]
    fn test_corrupt_stored_state_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut tutor = tutor_with(&dir, OfflineOracle);
        let word = tutor.add_word("anna", "der Tisch | table", now()).unwrap();

        let mut broken = word.review.clone();
        broken.interval = -3;
        tutor.store().update_card_state(&word.key(), &broken).unwrap();

        assert!(matches!(
            tutor.record_review(&word.key(), 4, now()),
            Err(Error::InvalidState(_))
        ));
        assert_eq!(tutor.store().get_card_state(&word.key()).unwrap().interval, -3);
    }

    #[test]
    fn test_distractors_exclude_own_card() {
        let dir = tempfile::tempdir().unwrap();
        let tutor = tutor_with(&dir, OfflineOracle);
        let words: Vec<_> = ["der Tisch | table", "der Stuhl | chair", "die Lampe | lamp"]
            .iter()
            .map(|p| tutor.add_word("anna", p, now()).unwrap())
            .collect();

        let distractors = distractors_for(&words[0], &words);
        assert_eq!(distractors.len(), 2);
        assert!(!distractors.contains(&"table".to_string()));
        assert!(distractors_for(&words[0], &words[..1]).is_empty());
    }
}
