//! CSV export of a learner's vocabulary with review state.

use crate::scheduler::format_timestamp;
use crate::{Error, Result, WordRecord};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

const COLUMNS: [&str; 16] = [
    "id",
    "article",
    "lemma",
    "gender",
    "plural",
    "part_of_speech",
    "translation",
    "example_de",
    "example_en",
    "topic",
    "cefr",
    "ease",
    "interval",
    "repetitions",
    "due_at",
    "created_at",
];

/// A row in the CSV output
#[derive(Debug, serde::Serialize)]
struct CsvRow<'a> {
    id: String,
    article: &'a str,
    lemma: &'a str,
    gender: &'a str,
    plural: &'a str,
    part_of_speech: &'a str,
    translation: &'a str,
    example_de: &'a str,
    example_en: &'a str,
    topic: &'a str,
    cefr: &'a str,
    ease: f64,
    interval: i64,
    repetitions: i64,
    due_at: String,
    created_at: String,
}

impl<'a> From<&'a WordRecord> for CsvRow<'a> {
    fn from(word: &'a WordRecord) -> Self {
        let entry = &word.entry;
        CsvRow {
            id: word.id.to_string(),
            article: entry.article.as_deref().unwrap_or(""),
            lemma: &entry.lemma,
            gender: entry.gender.map(|g| g.code()).unwrap_or(""),
            plural: entry.plural.as_deref().unwrap_or(""),
            part_of_speech: &entry.part_of_speech,
            translation: &entry.translation,
            example_de: &entry.example_de,
            example_en: &entry.example_en,
            topic: &entry.topic,
            cefr: &entry.cefr,
            ease: word.review.ease,
            interval: word.review.interval,
            repetitions: word.review.repetitions,
            due_at: format_timestamp(word.review.due_at),
            created_at: format_timestamp(word.created_at),
        }
    }
}

/// Write `words` to `csv_path`, replacing any previous export atomically.
///
/// Returns the number of rows written. An empty deck still produces a
/// header row.
pub fn export_words_csv(words: &[WordRecord], csv_path: &Path) -> Result<usize> {
    let parent = match csv_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let temp = NamedTempFile::new_in(parent)?;
    write_words_csv(words, temp.as_file())?;
    temp.as_file().sync_all()?;
    temp.persist(csv_path).map_err(|e| Error::Io(e.error))?;

    tracing::info!("Exported {} words to {:?}", words.len(), csv_path);
    Ok(words.len())
}

/// Render the export into any writer (used for stdout).
///
/// An empty deck still produces a header row.
pub fn write_words_csv<W: Write>(words: &[WordRecord], out: W) -> Result<usize> {
    let mut writer = csv::Writer::from_writer(out);
    if words.is_empty() {
        writer.write_record(COLUMNS)?;
    }
    for word in words {
        writer.serialize(CsvRow::from(word))?;
    }
    writer.flush()?;
    Ok(words.len())
}
