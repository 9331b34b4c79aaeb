use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::search::DEFAULT_HIT_RATIO;
use crate::store::{self, StoreOptions};

const MINUTES_PER_DAY: i32 = 24 * 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// SQLite database file. Defaults to the platform data dir.
    #[serde(default)]
    pub db_path: Option<PathBuf>,

    /// Directory for log files. Logs go to stderr when unset.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Accept `/search@<bot_username>` only for this name.
    #[serde(default)]
    pub bot_username: Option<String>,

    #[serde(default = "default_command_prefix")]
    pub command_prefix: char,

    /// Share of query keywords a message must carry, in (0.5, 1].
    #[serde(default = "default_hit_ratio")]
    pub hit_ratio: f64,

    /// Offset used when showing result timestamps. Default is UTC+8.
    #[serde(default = "default_utc_offset_minutes")]
    pub utc_offset_minutes: i32,

    /// Store HMAC hashes of keywords rather than the keywords themselves.
    #[serde(default = "default_hash_keywords")]
    pub hash_keywords: bool,

    /// Postings fetched per cursor round trip.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_command_prefix() -> char {
    '/'
}

fn default_hit_ratio() -> f64 {
    DEFAULT_HIT_RATIO
}

fn default_utc_offset_minutes() -> i32 {
    480
}

fn default_hash_keywords() -> bool {
    true
}

fn default_page_size() -> usize {
    64
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: None,
            log_dir: None,
            log_level: default_log_level(),
            bot_username: None,
            command_prefix: default_command_prefix(),
            hit_ratio: default_hit_ratio(),
            utc_offset_minutes: default_utc_offset_minutes(),
            hash_keywords: default_hash_keywords(),
            page_size: default_page_size(),
        }
    }
}

impl Config {
    /// Load from a JSON file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No config at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };
        let config: Config = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.hit_ratio > 0.5 && self.hit_ratio <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "hit_ratio must be in (0.5, 1], got {}",
                self.hit_ratio
            )));
        }
        if self.page_size == 0 {
            return Err(ConfigError::Invalid("page_size must be > 0".to_string()));
        }
        if self.utc_offset_minutes.abs() >= MINUTES_PER_DAY {
            return Err(ConfigError::Invalid(format!(
                "utc_offset_minutes must be within a day, got {}",
                self.utc_offset_minutes
            )));
        }
        if self.command_prefix.is_whitespace() {
            return Err(ConfigError::Invalid(
                "command_prefix must not be whitespace".to_string(),
            ));
        }
        Ok(())
    }

    pub fn db_path(&self) -> PathBuf {
        self.db_path.clone().unwrap_or_else(store::default_db_path)
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            hash_keywords: self.hash_keywords,
            page_size: self.page_size,
        }
    }

    pub fn utc_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).unwrap_or_else(|| Utc.fix())
    }
}

pub fn default_config_path() -> PathBuf {
    let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("relay-search");
    path.push("config.json");
    path
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "failed to read config: {}", e),
            ConfigError::Parse(e) => write!(f, "failed to parse config: {}", e),
            ConfigError::Invalid(msg) => write!(f, "invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Parse(e)
    }
}
