//! Error types for the battle engine.
//!
//! Every fallible engine operation returns [`BattleError`]. Pure combat math
//! never fails; it clamps to safe defaults instead.

use thiserror::Error;

use crate::repository::RepositoryError;

pub type Result<T> = std::result::Result<T, BattleError>;

/// Coarse classification of a [`BattleError`], stable across variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Zone, monster, character or skill is absent.
    NotFound,
    /// Caller supplied something the engine cannot accept.
    InvalidInput,
    /// The session is not in the state the operation expects.
    StateConflict,
    /// A collaborator failed; retrying may succeed.
    Transient,
}

impl ErrorKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::StateConflict => "state_conflict",
            ErrorKind::Transient => "transient",
        }
    }
}

#[derive(Debug, Error)]
pub enum BattleError {
    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("level too low for zone '{zone_id}', need level {min_level}")]
    LevelTooLow { zone_id: String, min_level: u32 },

    #[error("level too high for zone '{zone_id}', max level {max_level}")]
    LevelTooHigh { zone_id: String, max_level: u32 },

    #[error("unsupported rule operator '{0}'")]
    InvalidOperator(String),

    #[error("state conflict: {0}")]
    StateConflict(String),

    #[error("persistence failure")]
    Transient(#[source] RepositoryError),
}

impl BattleError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        BattleError::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub const fn kind(&self) -> ErrorKind {
        match self {
            BattleError::NotFound { .. } => ErrorKind::NotFound,
            BattleError::InvalidInput(_)
            | BattleError::LevelTooLow { .. }
            | BattleError::LevelTooHigh { .. }
            | BattleError::InvalidOperator(_) => ErrorKind::InvalidInput,
            BattleError::StateConflict(_) => ErrorKind::StateConflict,
            BattleError::Transient(_) => ErrorKind::Transient,
        }
    }

    /// Only collaborator failures are worth retrying unchanged.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, BattleError::Transient(_))
    }
}

impl From<RepositoryError> for BattleError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { kind, id } => BattleError::NotFound { kind, id },
            other => BattleError::Transient(other),
        }
    }
}
