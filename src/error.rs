use std::fmt;

use crate::config::ConfigError;
use crate::store::StoreError;

/// Unified error type for the command-line entry points.
#[derive(Debug)]
pub enum AppError {
    Store(StoreError),
    Config(ConfigError),
    Other(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Store(e) => write!(f, "Store error: {}", e),
            AppError::Config(e) => write!(f, "Config error: {}", e),
            AppError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        AppError::Store(e)
    }
}

impl From<sqlite::Error> for AppError {
    fn from(e: sqlite::Error) -> Self {
        AppError::Store(StoreError::Sqlite(e))
    }
}

impl From<ConfigError> for AppError {
    fn from(e: ConfigError) -> Self {
        AppError::Config(e)
    }
}

impl From<String> for AppError {
    fn from(s: String) -> Self {
        AppError::Other(s)
    }
}
