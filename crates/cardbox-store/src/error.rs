use std::fmt;

use cardbox_core::CoreError;

#[derive(Debug)]
pub enum StoreError {
    Sqlite(rusqlite::Error),
    /// Stored rows that the core refuses (e.g. a card breaking its invariants).
    Core(CoreError),
    Config(String),
    InvalidData(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Sqlite(e) => write!(f, "SQLite error: {e}"),
            StoreError::Core(e) => write!(f, "{e}"),
            StoreError::Config(msg) => write!(f, "config error: {msg}"),
            StoreError::InvalidData(msg) => write!(f, "invalid data: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Sqlite(e) => Some(e),
            StoreError::Core(e) => Some(e),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Sqlite(e)
    }
}

impl From<CoreError> for StoreError {
    fn from(e: CoreError) -> Self {
        StoreError::Core(e)
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
