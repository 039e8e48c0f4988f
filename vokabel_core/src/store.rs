//! Deck persistence with file locking.
//!
//! All records live in one JSON document. Readers take a shared lock on a
//! sidecar `.lock` file, writers hold an exclusive lock across the whole
//! load-modify-save cycle, so there is at most one writer per deck.

use crate::{
    CardKey, CardState, Error, GrammarNote, Result, WordEntry, WordRecord,
};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use uuid::Uuid;

/// Record store consumed by the tutor
pub trait CardStore {
    /// Add a new word with fresh review state due at `now`
    fn create_word(&self, user_id: &str, entry: WordEntry, now: DateTime<Utc>)
        -> Result<WordRecord>;

    fn get_word(&self, key: &CardKey) -> Result<WordRecord>;

    fn get_card_state(&self, key: &CardKey) -> Result<CardState>;

    fn update_card_state(&self, key: &CardKey, state: &CardState) -> Result<()>;

    /// Replace a card's state with `f(current)` as one read-modify-write,
    /// returning the new state
    fn modify_card_state<F>(&self, key: &CardKey, f: F) -> Result<CardState>
    where
        F: FnOnce(&CardState) -> Result<CardState>;

    /// Cards due at or before `before`, earliest first
    fn list_due(&self, user_id: &str, before: DateTime<Utc>, limit: usize)
        -> Result<Vec<WordRecord>>;

    fn list_words(&self, user_id: &str) -> Result<Vec<WordRecord>>;

    fn count_words(&self, user_id: &str) -> Result<usize>;

    fn create_grammar(&self, note: GrammarNote) -> Result<()>;

    fn list_grammar(&self, user_id: &str) -> Result<Vec<GrammarNote>>;
}

/// On-disk deck document
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Deck {
    #[serde(default)]
    pub words: Vec<WordRecord>,
    #[serde(default)]
    pub grammar: Vec<GrammarNote>,
}

impl Deck {
    fn find_word(&self, key: &CardKey) -> Option<&WordRecord> {
        self.words
            .iter()
            .find(|w| w.id == key.card_id && w.user_id == key.user_id)
    }

    fn find_word_mut(&mut self, key: &CardKey) -> Option<&mut WordRecord> {
        self.words
            .iter_mut()
            .find(|w| w.id == key.card_id && w.user_id == key.user_id)
    }

    fn read_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let mut contents = String::new();
        File::open(path)?.read_to_string(&mut contents)?;
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }

        // A damaged deck must not be replaced by an empty one on the next save
        serde_json::from_str(&contents)
            .map_err(|e| Error::Store(format!("Failed to parse deck {:?}: {}", path, e)))
    }

    fn write_to(&self, path: &Path) -> Result<()> {
        let parent = path.parent().ok_or_else(|| {
            Error::Store(format!("Deck path {:?} has no parent directory", path))
        })?;
        std::fs::create_dir_all(parent)?;

        // Unique temp file in the same directory for atomic rename
        let temp = NamedTempFile::new_in(parent)?;
        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            serde_json::to_writer(&mut writer, self)?;
            writer.flush()?;
        }
        temp.as_file().sync_all()?;
        temp.persist(path).map_err(|e| Error::Io(e.error))?;
        Ok(())
    }
}

/// JSON-document store guarded by advisory locks
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".lock");
        self.path.with_file_name(name)
    }

    fn open_lock(&self) -> Result<File> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(self.lock_path())?;
        Ok(file)
    }

    /// Load the deck under a shared lock
    pub fn load(&self) -> Result<Deck> {
        let lock = self.open_lock()?;
        lock.lock_shared()?;
        let deck = Deck::read_from(&self.path);
        lock.unlock()?;
        let deck = deck?;
        tracing::debug!(
            "Loaded deck {:?}: {} words, {} grammar notes",
            self.path,
            deck.words.len(),
            deck.grammar.len()
        );
        Ok(deck)
    }

    /// Load, modify and save the deck while holding the exclusive lock
    pub fn update<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Deck) -> Result<T>,
    {
        let lock = self.open_lock()?;
        lock.lock_exclusive()?;

        let result = Deck::read_from(&self.path).and_then(|mut deck| {
            let value = f(&mut deck)?;
            deck.write_to(&self.path)?;
            Ok(value)
        });

        // Lock is released when the file drops, unlock explicitly anyway
        lock.unlock()?;
        result
    }
}

impl CardStore for JsonFileStore {
    fn create_word(
        &self,
        user_id: &str,
        entry: WordEntry,
        now: DateTime<Utc>,
    ) -> Result<WordRecord> {
        let record = WordRecord {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            entry,
            review: CardState::new(now),
            created_at: now,
        };

        self.update(|deck| {
            deck.words.push(record.clone());
            Ok(())
        })?;

        tracing::info!("Created word {} ({})", record.key(), record.entry.lemma);
        Ok(record)
    }

    fn get_word(&self, key: &CardKey) -> Result<WordRecord> {
        self.load()?
            .find_word(key)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("card {}", key)))
    }

    fn get_card_state(&self, key: &CardKey) -> Result<CardState> {
        self.get_word(key).map(|w| w.review)
    }

    fn update_card_state(&self, key: &CardKey, state: &CardState) -> Result<()> {
        self.update(|deck| {
            let word = deck
                .find_word_mut(key)
                .ok_or_else(|| Error::NotFound(format!("card {}", key)))?;
            word.review = state.clone();
            Ok(())
        })?;
        tracing::debug!(
            "Updated {}: ease {:.2}, interval {}, repetitions {}",
            key,
            state.ease,
            state.interval,
            state.repetitions
        );
        Ok(())
    }

    fn modify_card_state<F>(&self, key: &CardKey, f: F) -> Result<CardState>
    where
        F: FnOnce(&CardState) -> Result<CardState>,
    {
        self.update(|deck| {
            let word = deck
                .find_word_mut(key)
                .ok_or_else(|| Error::NotFound(format!("card {}", key)))?;
            let state = f(&word.review)?;
            word.review = state.clone();
            Ok(state)
        })
    }

    fn list_due(
        &self,
        user_id: &str,
        before: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<WordRecord>> {
        let mut due: Vec<WordRecord> = self
            .load()?
            .words
            .into_iter()
            .filter(|w| w.user_id == user_id && w.review.is_due(before))
            .collect();
        due.sort_by(|a, b| {
            a.review
                .due_at
                .cmp(&b.review.due_at)
                .then(a.created_at.cmp(&b.created_at))
        });
        due.truncate(limit);
        Ok(due)
    }

    fn list_words(&self, user_id: &str) -> Result<Vec<WordRecord>> {
        Ok(self
            .load()?
            .words
            .into_iter()
            .filter(|w| w.user_id == user_id)
            .collect())
    }

    fn count_words(&self, user_id: &str) -> Result<usize> {
        Ok(self
            .load()?
            .words
            .iter()
            .filter(|w| w.user_id == user_id)
            .count())
    }

    fn create_grammar(&self, note: GrammarNote) -> Result<()> {
        let topic = note.topic.clone();
        self.update(|deck| {
            deck.grammar.push(note);
            Ok(())
        })?;
        tracing::info!("Stored grammar note on {}", topic);
        Ok(())
    }

    fn list_grammar(&self, user_id: &str) -> Result<Vec<GrammarNote>> {
        Ok(self
            .load()?
            .grammar
            .into_iter()
            .filter(|g| g.user_id == user_id)
            .collect())
    }
}
