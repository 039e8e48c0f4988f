#![forbid(unsafe_code)]

//! Core domain model and business logic for the Vokabel tutor.
//!
//! This crate provides:
//! - Domain types (cards, review state, words, grammar notes, quiz items)
//! - SM-2 spaced-repetition scheduling
//! - Persistence (deck store, review log, CSV export)
//! - Content generation interfaces and an offline oracle
//! - The chat-style tutor dispatcher

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod scheduler;
pub mod store;
pub mod review_log;
pub mod grammar;
pub mod content;
pub mod stats;
pub mod export;
pub mod tutor;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::{Config, TutorConfig};
pub use scheduler::{compute_next, next_due_date, NextReview, Quality, SchedulerParams};
pub use store::{CardStore, JsonFileStore};
pub use review_log::{JsonlReviewLog, ReviewSink};
pub use content::{ContentError, ContentOracle, OfflineOracle, PromptedOracle};
pub use stats::DeckStats;
pub use tutor::{Reply, Tutor};
