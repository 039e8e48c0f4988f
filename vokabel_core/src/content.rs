//! Tutoring content: word entries, grammar explanations and quiz items.
//!
//! Content comes from a [`ContentOracle`]. Text-generating services are
//! wrapped in [`PromptedOracle`], which sends a fixed system prompt, pulls
//! the JSON object out of the reply and validates it against strict
//! schemas. Anything missing or malformed becomes a [`ContentError`] that
//! the tutor reports back to the learner.

use crate::{
    grammar, Example, Explanation, Gender, QuickCheck, QuizItem, QuizKind, WordEntry, WordRecord,
};
use serde::Deserialize;

/// Recoverable failure to obtain usable content
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContentError {
    /// Oracle cannot produce this content at all
    #[error("content unavailable: {0}")]
    Unavailable(String),

    /// Reply held no JSON object
    #[error("no JSON object in reply: {0}")]
    NoJson(String),

    /// Reply was JSON but not of the expected shape
    #[error("malformed content: {0}")]
    Malformed(String),

    /// A required field was absent or empty
    #[error("missing field `{0}`")]
    MissingField(&'static str),
}

/// System prompt sent with every request to a text generator
pub const SYSTEM_PROMPT: &str = r#"You are a patient A1-B2 German tutor.

When asked to EXPLAIN grammar, return JSON:
{"topic": str, "summary": str, "rule_table": [[headers...], [row...]],
 "examples": [{"de": str, "en": str}], "quick_check": [{"q": str, "a": str}]}

When asked to ADD a word, normalize it to its lemma and detect article
(der/die/das), gender (m/f/n), plural, part of speech, topic and CEFR level.
Return JSON:
{"lemma": str, "article": str|null, "gender": str|null, "plural": str|null,
 "pos": str, "translation": str, "example_de": str, "example_en": str,
 "topic": str, "cefr": str}

When asked to QUIZ, return JSON:
{"type": "mcq"|"type"|"cloze", "prompt": str, "choices": [str], "answer": str,
 "explanation": str}

Keep explanations short, simple (A1-A2) and encouraging."#;

// ============================================================================
// Requests
// ============================================================================

/// A learner's `/add` request: `word | translation | plural | topic`
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WordRequest {
    pub word: String,
    pub translation: String,
    pub plural: String,
    pub topic: String,
}

impl WordRequest {
    /// Split a pipe-separated payload; missing trailing parts stay empty.
    pub fn parse(payload: &str) -> Self {
        let mut parts = payload.split('|').map(|p| p.trim().to_string());
        Self {
            word: parts.next().unwrap_or_default(),
            translation: parts.next().unwrap_or_default(),
            plural: parts.next().unwrap_or_default(),
            topic: parts.next().unwrap_or_default(),
        }
    }
}

/// Material for one quiz question
#[derive(Clone, Debug)]
pub struct QuizRequest<'a> {
    pub word: &'a WordRecord,
    /// Translations of other cards, usable as wrong choices
    pub distractors: Vec<String>,
}

/// Source of tutoring content
pub trait ContentOracle {
    fn generate_explanation(&self, topic: &str) -> Result<Explanation, ContentError>;

    fn generate_word_entry(&self, request: &WordRequest) -> Result<WordEntry, ContentError>;

    fn generate_quiz_item(&self, request: &QuizRequest<'_>) -> Result<QuizItem, ContentError>;
}

// ============================================================================
// Text generators
// ============================================================================

/// Anything that answers a (system, user) prompt pair with free text
pub trait TextGenerator {
    fn complete(&self, system: &str, prompt: &str) -> Result<String, ContentError>;
}

impl<F> TextGenerator for F
where
    F: Fn(&str, &str) -> Result<String, ContentError>,
{
    fn complete(&self, system: &str, prompt: &str) -> Result<String, ContentError> {
        self(system, prompt)
    }
}

/// Oracle backed by a text generator returning JSON-bearing replies
pub struct PromptedOracle<G> {
    generator: G,
}

impl<G: TextGenerator> PromptedOracle<G> {
    pub fn new(generator: G) -> Self {
        Self { generator }
    }

    fn ask(&self, prompt: &str) -> Result<String, ContentError> {
        tracing::debug!("Content request: {}", prompt);
        self.generator.complete(SYSTEM_PROMPT, prompt)
    }
}

impl<G: TextGenerator> ContentOracle for PromptedOracle<G> {
    fn generate_explanation(&self, topic: &str) -> Result<Explanation, ContentError> {
        let reply = self.ask(&format!("EXPLAIN -> {}. Return only the JSON object.", topic))?;
        parse_explanation(&reply, topic)
    }

    fn generate_word_entry(&self, request: &WordRequest) -> Result<WordEntry, ContentError> {
        let reply = self.ask(&format!(
            "ADD WORD -> {} | {} | {} | {}. Return only the JSON object.",
            request.word, request.translation, request.plural, request.topic
        ))?;
        parse_word_entry(&reply, request)
    }

    fn generate_quiz_item(&self, request: &QuizRequest<'_>) -> Result<QuizItem, ContentError> {
        let reply = self.ask(&format!(
            "QUIZ one MCQ about '{}' meaning '{}'. Include 4 choices with 1 correct. Return only the JSON object.",
            request.word.entry.headword(),
            request.word.entry.translation
        ))?;
        parse_quiz_item(&reply)
    }
}

// ============================================================================
// Parsing
// ============================================================================

/// Outermost `{...}` span of a reply, if any
pub fn extract_json_block(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

fn parse_block<'de, T: Deserialize<'de>>(reply: &'de str) -> Result<T, ContentError> {
    let block = extract_json_block(reply).ok_or_else(|| {
        let preview: String = reply.chars().take(80).collect();
        ContentError::NoJson(preview)
    })?;
    serde_json::from_str(block).map_err(|e| ContentError::Malformed(e.to_string()))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Split a leading definite article off a word: "der Tisch" → ("der", "Tisch")
pub fn split_article(word: &str) -> (Option<String>, String) {
    let word = word.trim();
    if let Some((head, rest)) = word.split_once(char::is_whitespace) {
        if Gender::from_article(head).is_some() && !rest.trim().is_empty() {
            return (Some(head.to_lowercase()), rest.trim().to_string());
        }
    }
    (None, word.to_string())
}

fn parse_gender(raw: &str) -> Option<Gender> {
    match raw.trim().to_lowercase().as_str() {
        "m" | "masc" | "masculine" | "maskulin" => Some(Gender::Masculine),
        "f" | "fem" | "feminine" | "feminin" => Some(Gender::Feminine),
        "n" | "neut" | "neuter" | "neutral" => Some(Gender::Neuter),
        _ => None,
    }
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RawWordEntry {
    lemma: Option<String>,
    article: Option<String>,
    gender: Option<String>,
    plural: Option<String>,
    pos: Option<String>,
    part_of_speech: Option<String>,
    translation: Option<String>,
    example_de: Option<String>,
    example_en: Option<String>,
    topic: Option<String>,
    cefr: Option<String>,
}

/// Validate a word-entry reply, filling gaps from the learner's request.
pub fn parse_word_entry(reply: &str, request: &WordRequest) -> Result<WordEntry, ContentError> {
    let raw: RawWordEntry = parse_block(reply)?;

    // The key must be present for the reply to count as a word entry at all
    let lemma = raw.lemma.ok_or(ContentError::MissingField("lemma"))?;
    let (request_article, request_lemma) = split_article(&request.word);
    let (lemma_article, lemma) = match non_empty(Some(lemma)) {
        Some(lemma) => split_article(&lemma),
        None => (request_article.clone(), request_lemma),
    };
    if lemma.is_empty() {
        return Err(ContentError::MissingField("lemma"));
    }

    let article = non_empty(raw.article)
        .map(|a| a.to_lowercase())
        .or(lemma_article)
        .or(request_article);
    let gender = raw
        .gender
        .as_deref()
        .and_then(parse_gender)
        .or_else(|| article.as_deref().and_then(Gender::from_article));

    let translation = non_empty(raw.translation)
        .or_else(|| non_empty(Some(request.translation.clone())))
        .ok_or(ContentError::MissingField("translation"))?;

    Ok(WordEntry {
        lemma,
        article,
        gender,
        plural: non_empty(raw.plural).or_else(|| non_empty(Some(request.plural.clone()))),
        part_of_speech: non_empty(raw.pos)
            .or_else(|| non_empty(raw.part_of_speech))
            .unwrap_or_default(),
        translation,
        example_de: non_empty(raw.example_de).unwrap_or_default(),
        example_en: non_empty(raw.example_en).unwrap_or_default(),
        topic: non_empty(raw.topic)
            .or_else(|| non_empty(Some(request.topic.clone())))
            .unwrap_or_default(),
        cefr: non_empty(raw.cefr).unwrap_or_else(crate::types::default_cefr),
    })
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RawExplanation {
    topic: Option<String>,
    summary: Option<String>,
    rule_table: Option<Vec<Vec<String>>>,
    examples: Option<Vec<Example>>,
    quick_check: Option<Vec<QuickCheck>>,
}

/// Validate an explanation reply; `topic` is used when the reply omits it.
pub fn parse_explanation(reply: &str, topic: &str) -> Result<Explanation, ContentError> {
    let raw: RawExplanation = parse_block(reply)?;
    let summary = non_empty(raw.summary).ok_or(ContentError::MissingField("summary"))?;

    Ok(Explanation {
        topic: non_empty(raw.topic).unwrap_or_else(|| topic.trim().to_string()),
        summary,
        rule_table: raw
            .rule_table
            .unwrap_or_default()
            .into_iter()
            .filter(|row| !row.is_empty())
            .collect(),
        examples: raw
            .examples
            .unwrap_or_default()
            .into_iter()
            .filter(|ex| !ex.de.trim().is_empty())
            .collect(),
        quick_check: raw
            .quick_check
            .unwrap_or_default()
            .into_iter()
            .filter(|qc| !qc.q.trim().is_empty())
            .collect(),
    })
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RawQuizItem {
    #[serde(rename = "type")]
    kind: Option<QuizKind>,
    prompt: Option<String>,
    choices: Option<Vec<String>>,
    answer: Option<String>,
    explanation: Option<String>,
}

/// Validate a quiz reply. Multiple-choice items need at least two choices,
/// one of which is the answer.
pub fn parse_quiz_item(reply: &str) -> Result<QuizItem, ContentError> {
    let raw: RawQuizItem = parse_block(reply)?;
    let prompt = non_empty(raw.prompt).ok_or(ContentError::MissingField("prompt"))?;
    let answer = non_empty(raw.answer).ok_or(ContentError::MissingField("answer"))?;
    let choices: Vec<String> = raw
        .choices
        .unwrap_or_default()
        .into_iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();
    let kind = raw.kind.unwrap_or(if choices.is_empty() {
        QuizKind::Type
    } else {
        QuizKind::Mcq
    });

    let item = QuizItem {
        kind,
        prompt,
        choices,
        answer,
        explanation: non_empty(raw.explanation).unwrap_or_default(),
    };

    if item.kind == QuizKind::Mcq {
        if item.choices.len() < 2 {
            return Err(ContentError::Malformed(format!(
                "multiple choice needs at least 2 choices, got {}",
                item.choices.len()
            )));
        }
        if !item.choices.iter().any(|c| item.is_correct(c)) {
            return Err(ContentError::Malformed(
                "answer is not among the choices".into(),
            ));
        }
    }
    Ok(item)
}

// ============================================================================
// Offline oracle
// ============================================================================

/// Content built from the learner's own input and the built-in grammar notes
#[derive(Clone, Copy, Debug, Default)]
pub struct OfflineOracle;

/// Wrong choices offered alongside the answer
const MAX_DISTRACTORS: usize = 3;

impl ContentOracle for OfflineOracle {
    fn generate_explanation(&self, topic: &str) -> Result<Explanation, ContentError> {
        grammar::lookup(topic).cloned().ok_or_else(|| {
            ContentError::Unavailable(format!(
                "no offline notes on '{}' (available: {})",
                topic.trim(),
                grammar::topics().join(", ")
            ))
        })
    }

    fn generate_word_entry(&self, request: &WordRequest) -> Result<WordEntry, ContentError> {
        let (article, lemma) = split_article(&request.word);
        if lemma.is_empty() {
            return Err(ContentError::MissingField("lemma"));
        }
        let translation = non_empty(Some(request.translation.clone())).ok_or_else(|| {
            ContentError::Unavailable(
                "offline mode cannot translate; use: word | translation".into(),
            )
        })?;

        Ok(WordEntry {
            gender: article.as_deref().and_then(Gender::from_article),
            part_of_speech: if article.is_some() { "noun".into() } else { String::new() },
            article,
            lemma,
            plural: non_empty(Some(request.plural.clone())),
            translation,
            example_de: String::new(),
            example_en: String::new(),
            topic: request.topic.trim().to_string(),
            cefr: crate::types::default_cefr(),
        })
    }

    fn generate_quiz_item(&self, request: &QuizRequest<'_>) -> Result<QuizItem, ContentError> {
        let entry = &request.word.entry;
        let answer = entry.translation.trim().to_string();
        if answer.is_empty() {
            return Err(ContentError::MissingField("translation"));
        }

        let mut distractors: Vec<String> = Vec::new();
        for candidate in &request.distractors {
            let candidate = candidate.trim();
            let taken = candidate.eq_ignore_ascii_case(&answer)
                || distractors.iter().any(|d| d.eq_ignore_ascii_case(candidate));
            if !candidate.is_empty() && !taken {
                distractors.push(candidate.to_string());
            }
            if distractors.len() == MAX_DISTRACTORS {
                break;
            }
        }

        if distractors.is_empty() {
            return Ok(QuizItem {
                kind: QuizKind::Type,
                prompt: format!("Übersetze: {}", entry.headword()),
                choices: Vec::new(),
                answer,
                explanation: String::new(),
            });
        }

        // Answer position derives from the card id so a card always looks the same
        let slot = (request.word.id.as_u128() % (distractors.len() as u128 + 1)) as usize;
        let mut choices = distractors;
        choices.insert(slot, answer.clone());

        Ok(QuizItem {
            kind: QuizKind::Mcq,
            prompt: format!("Was bedeutet '{}'?", entry.headword()),
            choices,
            answer,
            explanation: entry.example_de.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CardState;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn request() -> WordRequest {
        WordRequest::parse("der Tisch | table | die Tische | Möbel")
    }

    fn record(translation: &str) -> WordRecord {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        WordRecord {
            id: Uuid::new_v4(),
            user_id: "local".into(),
            entry: OfflineOracle
                .generate_word_entry(&WordRequest::parse(&format!("der Tisch | {}", translation)))
                .unwrap(),
            review: CardState::new(now),
            created_at: now,
        }
    }

    #[test]
    fn test_word_request_parse() {
        let req = request();
        assert_eq!(req.word, "der Tisch");
        assert_eq!(req.translation, "table");
        assert_eq!(req.plural, "die Tische");
        assert_eq!(req.topic, "Möbel");

        let short = WordRequest::parse(" Haus ");
        assert_eq!(short.word, "Haus");
        assert!(short.translation.is_empty() && short.topic.is_empty());
    }

    #[test]
    fn test_extract_json_block() {
        assert_eq!(
            extract_json_block("Sure! {\"a\": {\"b\": 1}} Hope it helps"),
            Some("{\"a\": {\"b\": 1}}")
        );
        assert_eq!(extract_json_block("no json here"), None);
        assert_eq!(extract_json_block("} backwards {"), None);
    }

    #[test]
    fn test_split_article() {
        assert_eq!(split_article("der Tisch"), (Some("der".into()), "Tisch".into()));
        assert_eq!(split_article("Die  Lampe"), (Some("die".into()), "Lampe".into()));
        assert_eq!(split_article("laufen"), (None, "laufen".into()));
        assert_eq!(split_article("das"), (None, "das".into()));
    }

    #[test]
    fn test_parse_full_word_entry() {
        let reply = r#"Here you go:
        {"lemma": "Tisch", "article": "der", "gender": "m", "plural": "die Tische",
         "pos": "noun", "translation": "table", "example_de": "Der Tisch ist groß.",
         "example_en": "The table is big.", "topic": "Möbel", "cefr": "A1"}"#;
        let entry = parse_word_entry(reply, &request()).unwrap();
        assert_eq!(entry.headword(), "der Tisch");
        assert_eq!(entry.gender, Some(Gender::Masculine));
        assert_eq!(entry.part_of_speech, "noun");
        assert_eq!(entry.example_de, "Der Tisch ist groß.");
    }

    #[test]
    fn test_parse_partial_word_entry_falls_back_to_request() {
        let reply = r#"{"lemma": "", "article": null, "translation": null}"#;
        let entry = parse_word_entry(reply, &request()).unwrap();
        assert_eq!(entry.lemma, "Tisch");
        assert_eq!(entry.article.as_deref(), Some("der"));
        assert_eq!(entry.gender, Some(Gender::Masculine));
        assert_eq!(entry.translation, "table");
        assert_eq!(entry.plural.as_deref(), Some("die Tische"));
        assert_eq!(entry.topic, "Möbel");
        assert_eq!(entry.cefr, "A1");
    }

    #[test]
    fn test_parse_word_entry_failures() {
        assert!(matches!(
            parse_word_entry("I could not find that word.", &request()),
            Err(ContentError::NoJson(_))
        ));
        assert_eq!(
            parse_word_entry(r#"{"text": "hello"}"#, &request()),
            Err(ContentError::MissingField("lemma"))
        );
        assert_eq!(
            parse_word_entry(r#"{"lemma": "Tisch"}"#, &WordRequest::parse("Tisch")),
            Err(ContentError::MissingField("translation"))
        );
        assert!(matches!(
            parse_word_entry(r#"{"lemma": 42}"#, &request()),
            Err(ContentError::Malformed(_))
        ));
    }

    #[test]
    fn test_parse_explanation() {
        let reply = r#"{"summary": "Dativ nach mit.", "rule_table": [["a","b"], []],
            "examples": [{"de": "mit dem Bus", "en": "by bus"}, {"de": "", "en": "x"}],
            "quick_check": [{"q": "mit ___ Bahn", "a": "der"}]}"#;
        let explanation = parse_explanation(reply, " Dativ ").unwrap();
        assert_eq!(explanation.topic, "Dativ");
        assert_eq!(explanation.rule_table.len(), 1);
        assert_eq!(explanation.examples.len(), 1);
        assert_eq!(explanation.quick_check.len(), 1);

        assert_eq!(
            parse_explanation(r#"{"topic": "Dativ"}"#, "Dativ"),
            Err(ContentError::MissingField("summary"))
        );
    }

    #[test]
    fn test_parse_quiz_item() {
        let reply = r#"{"type": "mcq", "prompt": "Was bedeutet 'der Tisch'?",
            "choices": ["chair", "Table", "lamp"], "answer": "table"}"#;
        let item = parse_quiz_item(reply).unwrap();
        assert_eq!(item.kind, QuizKind::Mcq);
        assert_eq!(item.choices.len(), 3);

        let typed = parse_quiz_item(r#"{"prompt": "Übersetze: Haus", "answer": "house"}"#).unwrap();
        assert_eq!(typed.kind, QuizKind::Type);
    }

    #[test]
    fn test_parse_quiz_item_rejects_bad_mcq() {
        assert!(matches!(
            parse_quiz_item(r#"{"type": "mcq", "prompt": "p", "choices": ["a"], "answer": "a"}"#),
            Err(ContentError::Malformed(_))
        ));
        assert!(matches!(
            parse_quiz_item(r#"{"type": "mcq", "prompt": "p", "choices": ["a", "b"], "answer": "c"}"#),
            Err(ContentError::Malformed(_))
        ));
        assert_eq!(
            parse_quiz_item(r#"{"prompt": "p"}"#),
            Err(ContentError::MissingField("answer"))
        );
        assert!(matches!(
            parse_quiz_item(r#"{"type": "essay", "prompt": "p", "answer": "a"}"#),
            Err(ContentError::Malformed(_))
        ));
    }

    #[test]
    fn test_prompted_oracle_sends_system_prompt() {
        let oracle = PromptedOracle::new(|system: &str, prompt: &str| -> Result<String, ContentError> {
            assert_eq!(system, SYSTEM_PROMPT);
            assert!(prompt.starts_with("ADD WORD -> der Tisch | table"));
            Ok(r#"{"lemma": "Tisch", "article": "der", "translation": "table"}"#.to_string())
        });
        let entry = oracle.generate_word_entry(&request()).unwrap();
        assert_eq!(entry.headword(), "der Tisch");
    }

    #[test]
    fn test_prompted_oracle_propagates_generator_failure() {
        let oracle = PromptedOracle::new(|_: &str, _: &str| -> Result<String, ContentError> {
            Err(ContentError::Unavailable("service down".into()))
        });
        assert_eq!(
            oracle.generate_explanation("Dativ"),
            Err(ContentError::Unavailable("service down".into()))
        );
    }

    #[test]
    fn test_offline_word_entry() {
        let entry = OfflineOracle.generate_word_entry(&request()).unwrap();
        assert_eq!(entry.lemma, "Tisch");
        assert_eq!(entry.gender, Some(Gender::Masculine));
        assert_eq!(entry.part_of_speech, "noun");
        assert_eq!(entry.plural.as_deref(), Some("die Tische"));

        assert!(matches!(
            OfflineOracle.generate_word_entry(&WordRequest::parse("der Tisch")),
            Err(ContentError::Unavailable(_))
        ));
        assert_eq!(
            OfflineOracle.generate_word_entry(&WordRequest::parse(" | table")),
            Err(ContentError::MissingField("lemma"))
        );
    }

    #[test]
    fn test_offline_explanation() {
        assert_eq!(
            OfflineOracle.generate_explanation("kasus").unwrap().topic,
            "Artikel und Kasus"
        );
        assert!(matches!(
            OfflineOracle.generate_explanation("Konjunktiv"),
            Err(ContentError::Unavailable(_))
        ));
    }

    #[test]
    fn test_offline_quiz_multiple_choice() {
        let word = record("table");
        let request = QuizRequest {
            word: &word,
            distractors: vec![
                "chair".into(),
                "Table".into(),
                "chair".into(),
                "lamp".into(),
                "door".into(),
                "window".into(),
            ],
        };
        let item = OfflineOracle.generate_quiz_item(&request).unwrap();
        assert_eq!(item.kind, QuizKind::Mcq);
        assert_eq!(item.choices.len(), 4);
        assert_eq!(item.choices.iter().filter(|c| item.is_correct(c)).count(), 1);

        // Same card, same question
        assert_eq!(OfflineOracle.generate_quiz_item(&request).unwrap(), item);
    }

    #[test]
    fn test_offline_quiz_without_distractors_is_typed() {
        let word = record("table");
        let item = OfflineOracle
            .generate_quiz_item(&QuizRequest {
                word: &word,
                distractors: vec![],
            })
            .unwrap();
        assert_eq!(item.kind, QuizKind::Type);
        assert_eq!(item.prompt, "Übersetze: der Tisch");
        assert!(item.is_correct("table"));
    }
}
