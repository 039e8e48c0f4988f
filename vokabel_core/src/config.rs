//! Configuration file support for Vokabel.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/vokabel/config.toml`.

use crate::scheduler::SchedulerParams;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub tutor: TutorConfig,

    #[serde(default)]
    pub scheduler: SchedulerParams,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Tutoring session defaults
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TutorConfig {
    /// Learner used when none is given on the command line
    #[serde(default = "default_user")]
    pub default_user: String,

    /// Cards per `/quiz` when no count is given
    #[serde(default = "default_quiz_size")]
    pub quiz_size: usize,

    /// Upper bound on cards considered by `/due`
    #[serde(default = "default_due_limit")]
    pub due_limit: usize,

    /// Look-back window for review statistics
    #[serde(default = "default_stats_window_days")]
    pub stats_window_days: i64,

    /// Topic used by a bare `/explain`
    #[serde(default = "default_explain_topic")]
    pub default_explain_topic: String,
}

impl Default for TutorConfig {
    fn default() -> Self {
        Self {
            default_user: default_user(),
            quiz_size: default_quiz_size(),
            due_limit: default_due_limit(),
            stats_window_days: default_stats_window_days(),
            default_explain_topic: default_explain_topic(),
        }
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| {
        std::env::var_os("HOME")
            .map(|home| PathBuf::from(home).join(".local/share"))
            .unwrap_or_else(|| PathBuf::from("."))
    });
    base.join("vokabel")
}

fn default_user() -> String {
    "local".into()
}

fn default_quiz_size() -> usize {
    5
}

fn default_due_limit() -> usize {
    100
}

fn default_stats_window_days() -> i64 {
    7
}

fn default_explain_topic() -> String {
    "Artikel und Kasus".into()
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Reject settings no session could run with
    pub fn validate(&self) -> Result<()> {
        if self.tutor.default_user.trim().is_empty() {
            return Err(Error::Config("default_user must not be empty".into()));
        }
        if self.tutor.quiz_size == 0 {
            return Err(Error::Config("quiz_size must be at least 1".into()));
        }
        if self.tutor.due_limit == 0 {
            return Err(Error::Config("due_limit must be at least 1".into()));
        }
        if self.tutor.stats_window_days < 1 {
            return Err(Error::Config(format!(
                "stats_window_days must be at least 1, got {}",
                self.tutor.stats_window_days
            )));
        }
        self.scheduler.validate()
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| {
            std::env::var_os("HOME")
                .map(|home| PathBuf::from(home).join(".config"))
                .unwrap_or_else(|| PathBuf::from("."))
        });
        base.join("vokabel").join("config.toml")
    }

    /// Render the configuration as a TOML document
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, self.to_toml()?)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    /// Path of the deck document inside a data directory
    pub fn deck_path(data_dir: &Path) -> PathBuf {
        data_dir.join("cards.json")
    }

    /// Path of the review log inside a data directory
    pub fn review_log_path(data_dir: &Path) -> PathBuf {
        data_dir.join("reviews.jsonl")
    }
}
