//! Unified error types for the domain layer
//!
//! `DomainError` covers value-object validation, `GameError` covers the
//! rule checks a pluggable game performs on behalf of the lobby.

use thiserror::Error;

/// Unified error type for domain value objects
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Validation failed (e.g., invalid field values)
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Invalid ID format
    #[error("Invalid ID format: {0}")]
    InvalidId(String),
}

impl DomainError {
    /// Creates a validation error for value objects that cannot be built.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create an invalid ID error
    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}

/// Errors a game reports back to the lobby when a request breaks its rules.
///
/// The messages are shown to players verbatim, so they never carry internal
/// state such as faction membership.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("cannot add player as game is full")]
    GameFull,

    #[error("cannot change players after game started")]
    AlreadyStarted,

    #[error("player already joined this game")]
    AlreadyJoined,

    #[error("player is not part of this game")]
    UnknownPlayer,

    #[error("not enough players to start: {actual} of {required}")]
    NotEnoughPlayers { required: usize, actual: usize },

    #[error("too many players to start: {actual} of {max}")]
    TooManyPlayers { max: usize, actual: usize },

    #[error("players not ready to start")]
    PlayersNotReady,

    #[error("unknown game event '{0}'")]
    UnknownEvent(String),

    /// The injected shuffle did not return a permutation of the seats.
    #[error("shuffle is not a permutation of the seats")]
    InvalidShuffle,
}
