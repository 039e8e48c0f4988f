//! Append-only review log.
//!
//! Every review event is appended to a JSONL (JSON Lines) file under an
//! exclusive file lock so concurrent sessions never interleave lines.

use crate::{Result, ReviewEvent};
use chrono::{DateTime, Duration, Utc};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Review sink trait for persisting review events
pub trait ReviewSink {
    fn append(&mut self, event: &ReviewEvent) -> Result<()>;
}

/// JSONL-based review sink with file locking
pub struct JsonlReviewLog {
    path: PathBuf,
}

impl JsonlReviewLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReviewSink for JsonlReviewLog {
    fn append(&mut self, event: &ReviewEvent) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.lock_exclusive()?;

        let mut writer = std::io::BufWriter::new(&file);
        let line = serde_json::to_string(event)?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        drop(writer);

        file.unlock()?;

        tracing::debug!("Logged review {} of card {}", event.id, event.card_id);
        Ok(())
    }
}

/// Read all review events from a log file
pub fn read_reviews(path: &Path) -> Result<Vec<ReviewEvent>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    file.lock_shared()?;

    let reader = BufReader::new(&file);
    let mut events = Vec::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<ReviewEvent>(&line) {
            Ok(event) => events.push(event),
            Err(e) => {
                // Keep going: one torn line must not hide the rest of the history
                tracing::warn!("Failed to parse review at line {}: {}", line_num + 1, e);
            }
        }
    }

    file.unlock()?;
    tracing::debug!("Read {} reviews from {:?}", events.len(), path);
    Ok(events)
}

/// Reviews by `user_id` within the last `days` days before `now`, newest first.
///
/// A window reaching past the representable time range has no cutoff.
pub fn load_recent_reviews(
    path: &Path,
    user_id: &str,
    now: DateTime<Utc>,
    days: i64,
) -> Result<Vec<ReviewEvent>> {
    let cutoff = Duration::try_days(days).and_then(|window| now.checked_sub_signed(window));
    if cutoff.is_none() {
        tracing::debug!("Review window of {} days has no cutoff", days);
    }
    let mut events: Vec<ReviewEvent> = read_reviews(path)?
        .into_iter()
        .filter(|e| {
            e.user_id == user_id
                && e.reviewed_at <= now
                && cutoff.map_or(true, |cutoff| e.reviewed_at >= cutoff)
        })
        .collect();
    events.sort_by(|a, b| b.reviewed_at.cmp(&a.reviewed_at));
    Ok(events)
}
