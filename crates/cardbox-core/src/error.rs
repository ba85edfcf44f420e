use std::fmt;

use uuid::Uuid;

use crate::session::SessionState;

#[derive(Debug, Clone, PartialEq)]
pub enum CoreError {
    /// Rating text that is not one of again/hard/good/easy (or 1-4).
    InvalidRating(String),
    /// A session operation was called outside the state that allows it.
    InvalidSessionState {
        operation: &'static str,
        state: SessionState,
    },
    InvalidDate(String),
    /// Persisted card data that violates the card invariants.
    InvalidCard { id: Uuid, reason: String },
    UnknownCard(Uuid),
    UnknownDeck(String),
    UnknownNote(Uuid),
    EmptyName,
    EmptyField(&'static str),
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::InvalidRating(raw) => {
                write!(f, "invalid rating '{raw}' (expected again, hard, good or easy)")
            }
            CoreError::InvalidSessionState { operation, state } => {
                write!(f, "cannot {operation} while session is {state}")
            }
            CoreError::InvalidDate(raw) => write!(f, "invalid date '{raw}'"),
            CoreError::InvalidCard { id, reason } => write!(f, "invalid card {id}: {reason}"),
            CoreError::UnknownCard(id) => write!(f, "card not found: {id}"),
            CoreError::UnknownDeck(key) => write!(f, "deck not found: {key}"),
            CoreError::UnknownNote(id) => write!(f, "note not found: {id}"),
            CoreError::EmptyName => write!(f, "name must not be empty"),
            CoreError::EmptyField(field) => write!(f, "{field} must not be empty"),
        }
    }
}

impl std::error::Error for CoreError {}

pub type Result<T> = std::result::Result<T, CoreError>;
