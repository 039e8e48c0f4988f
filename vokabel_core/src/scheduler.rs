//! SM-2 spaced-repetition scheduler.
//!
//! Pure arithmetic over a card's review state. Nothing here reads the clock
//! or touches storage: callers pass `now` in and persist what comes out.
//!
//! Quality ratings (0-5):
//! - 0: Complete blackout
//! - 1: Incorrect, answer recognised once shown
//! - 2: Incorrect, answer seemed easy once shown
//! - 3: Correct with serious difficulty
//! - 4: Correct after hesitation
//! - 5: Perfect recall
//!
//! Ratings of 3 and above pass. Out-of-range ratings are clamped to 0..=5.

use crate::{CardPhase, CardState, Error, Result};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Ease assigned to a freshly added card
pub const INITIAL_EASE: f64 = 2.5;

/// Ease never drops below this
pub const MIN_EASE: f64 = 1.3;

/// Interval after the first success
pub const FIRST_INTERVAL_DAYS: i64 = 1;

/// Interval after the second consecutive success
pub const SECOND_INTERVAL_DAYS: i64 = 6;

/// Default interval after a lapse
pub const LAPSE_INTERVAL_DAYS: i64 = 1;

/// Default upper bound on any interval (about a century)
pub const MAX_INTERVAL_DAYS: i64 = 36_500;

/// Review quality on the SM-2 0-5 scale
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Quality(u8);

impl Quality {
    pub const AGAIN: Quality = Quality(0);
    pub const HARD: Quality = Quality(3);
    pub const GOOD: Quality = Quality(4);
    pub const PERFECT: Quality = Quality(5);

    /// Lowest passing rating
    pub const PASS_THRESHOLD: u8 = 3;

    const MAX: u8 = 5;

    /// Build a quality from any integer, clamping into 0..=5.
    pub fn new(value: i32) -> Self {
        let clamped = value.clamp(0, Self::MAX as i32);
        if clamped != value {
            tracing::debug!("Quality {} out of range, clamped to {}", value, clamped);
        }
        Quality(clamped as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn is_pass(self) -> bool {
        self.0 >= Self::PASS_THRESHOLD
    }

    /// Quality for a binary right/wrong outcome
    pub fn from_correct(correct: bool) -> Self {
        if correct {
            Quality::GOOD
        } else {
            Quality::AGAIN
        }
    }
}

/// Review state produced by one scheduling step
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NextReview {
    pub ease: f64,
    pub interval: i64,
    pub repetitions: i64,
}

impl NextReview {
    /// Materialize into a card state due `interval` days after `now`.
    pub fn into_state(self, now: DateTime<Utc>) -> Result<CardState> {
        Ok(CardState {
            ease: self.ease,
            interval: self.interval,
            repetitions: self.repetitions,
            due_at: due_at(self.interval, now)?,
        })
    }
}

/// Tunable scheduling bounds
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerParams {
    #[serde(default = "default_lapse_interval_days")]
    pub lapse_interval_days: i64,

    #[serde(default = "default_max_interval_days")]
    pub max_interval_days: i64,
}

impl Default for SchedulerParams {
    fn default() -> Self {
        Self {
            lapse_interval_days: LAPSE_INTERVAL_DAYS,
            max_interval_days: MAX_INTERVAL_DAYS,
        }
    }
}

fn default_lapse_interval_days() -> i64 {
    LAPSE_INTERVAL_DAYS
}

fn default_max_interval_days() -> i64 {
    MAX_INTERVAL_DAYS
}

impl SchedulerParams {
    pub fn validate(&self) -> Result<()> {
        if self.lapse_interval_days < 1 {
            return Err(Error::Config(format!(
                "lapse_interval_days must be at least 1, got {}",
                self.lapse_interval_days
            )));
        }
        if self.max_interval_days < SECOND_INTERVAL_DAYS.max(self.lapse_interval_days) {
            return Err(Error::Config(format!(
                "max_interval_days must be at least {}, got {}",
                SECOND_INTERVAL_DAYS.max(self.lapse_interval_days),
                self.max_interval_days
            )));
        }
        Ok(())
    }

    /// Compute the next review state from the current one.
    ///
    /// Fails only for malformed state: non-finite or non-positive ease,
    /// negative interval, negative repetitions.
    pub fn compute_next(
        &self,
        ease: f64,
        interval: i64,
        repetitions: i64,
        quality: i32,
    ) -> Result<NextReview> {
        check_state(ease, interval, repetitions)?;
        let quality = Quality::new(quality);
        let new_ease = adjust_ease(ease, quality);

        if !quality.is_pass() {
            return Ok(NextReview {
                ease: new_ease,
                interval: self.lapse_interval_days.min(self.max_interval_days),
                repetitions: 0,
            });
        }

        let repetitions = repetitions.saturating_add(1);
        let interval = match repetitions {
            1 => FIRST_INTERVAL_DAYS,
            2 => SECOND_INTERVAL_DAYS,
            _ => grow_interval(interval, ease),
        }
        .clamp(1, self.max_interval_days);

        Ok(NextReview {
            ease: new_ease,
            interval,
            repetitions,
        })
    }
}

/// Compute the next review state with default bounds.
pub fn compute_next(ease: f64, interval: i64, repetitions: i64, quality: i32) -> Result<NextReview> {
    SchedulerParams::default().compute_next(ease, interval, repetitions, quality)
}

fn check_state(ease: f64, interval: i64, repetitions: i64) -> Result<()> {
    if !ease.is_finite() || ease <= 0.0 {
        return Err(Error::InvalidState(format!(
            "ease must be a positive number, got {}",
            ease
        )));
    }
    if interval < 0 {
        return Err(Error::InvalidState(format!(
            "interval must not be negative, got {}",
            interval
        )));
    }
    if repetitions < 0 {
        return Err(Error::InvalidState(format!(
            "repetitions must not be negative, got {}",
            repetitions
        )));
    }
    Ok(())
}

// SM-2 ease change per quality 0..=5, in hundredths:
// 100 * (0.1 - (5-q) * (0.08 + (5-q) * 0.02))
const EASE_DELTA_HUNDREDTHS: [i32; 6] = [-80, -54, -32, -14, 0, 10];

fn adjust_ease(ease: f64, quality: Quality) -> f64 {
    let delta = EASE_DELTA_HUNDREDTHS[quality.value() as usize];
    let adjusted = match delta.cmp(&0) {
        Ordering::Equal => ease,
        // Never move against the sign of the delta through float noise
        Ordering::Greater => shift_hundredths(ease, delta).max(ease),
        Ordering::Less => shift_hundredths(ease, delta).min(ease),
    };
    adjusted.max(MIN_EASE)
}

// Stored eases have two decimals; work on them as whole hundredths so
// 2.5 -> 2.36 -> 2.22 stays exact. Other values are shifted as they are.
fn shift_hundredths(ease: f64, delta: i32) -> f64 {
    let hundredths = ease * 100.0;
    if !hundredths.is_finite() {
        // Too large to scale; the delta is below the float's resolution
        return ease + f64::from(delta) / 100.0;
    }
    let whole = hundredths.round();
    let base = if (hundredths - whole).abs() < 1e-6 {
        whole
    } else {
        hundredths
    };
    (base + f64::from(delta)) / 100.0
}

// Grows with the ease held before this review. The factor is floored at
// MIN_EASE so a success never shortens the interval.
fn grow_interval(interval: i64, ease: f64) -> i64 {
    let grown = (interval as f64 * ease.max(MIN_EASE)).round();
    if grown >= i64::MAX as f64 {
        i64::MAX
    } else {
        grown as i64
    }
}

/// Timestamp `interval_days` whole days after `now`.
pub fn due_at(interval_days: i64, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    if interval_days < 0 {
        return Err(Error::InvalidState(format!(
            "interval must not be negative, got {}",
            interval_days
        )));
    }
    Duration::try_days(interval_days)
        .and_then(|delta| now.checked_add_signed(delta))
        .ok_or_else(|| {
            Error::InvalidState(format!(
                "{} days after {} is out of range",
                interval_days, now
            ))
        })
}

/// Due date `interval_days` after `now`, formatted as `YYYY-MM-DDTHH:MM:SSZ`.
pub fn next_due_date(interval_days: i64, now: DateTime<Utc>) -> Result<String> {
    due_at(interval_days, now).map(format_timestamp)
}

/// Fixed ISO-8601 rendering with second precision and a trailing `Z`
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Lifecycle phase of a card state.
///
/// Review state carries no history, so any card with zero repetitions and a
/// non-zero interval is `Lapsed`, including a new card whose first review
/// failed.
pub fn phase(state: &CardState) -> CardPhase {
    match state.repetitions {
        0 if state.interval == 0 => CardPhase::New,
        0 => CardPhase::Lapsed,
        1 | 2 => CardPhase::Learning,
        _ => CardPhase::Review,
    }
}
