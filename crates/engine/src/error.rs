//! Engine error types.
//!
//! One enum per layer: transport failures stay local to a connection,
//! session errors describe the bounded-wait contract of a player session,
//! and hub errors are what the lobby reports back to callers and players.

use gamehub_domain::{GameError, PlayerId};
use gamehub_shared::EventChannel;
use thiserror::Error;

/// Failure on a single physical connection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("connection closed")]
    Closed,

    #[error("connection I/O error: {0}")]
    Io(String),
}

/// Errors returned by a `PlayerSession` handle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The control loop did not accept the connection in time.
    #[error("could not add connection as the session was busy")]
    AttachTimeout,

    /// The control loop did not accept the removal in time.
    #[error("could not remove connection as the session was busy")]
    DetachTimeout,

    /// The mailbox stayed full for the whole wait.
    #[error("timeout sending message(s)")]
    SendTimeout,

    #[error("missing event_channel on outbound message")]
    MissingChannelTag,

    /// The control loop did not answer a query in time.
    #[error("session did not answer in time")]
    QueryTimeout,

    /// The control loop has exited; the handle is dead.
    #[error("session has stopped")]
    Stopped,
}

/// Errors reported by the hub.
#[derive(Debug, Error)]
pub enum HubError {
    #[error("a connection is required")]
    MissingConnection,

    #[error("unknown player '{0}'")]
    UnknownPlayer(PlayerId),

    #[error("invalid game created")]
    InvalidGame,

    #[error("game id cannot be empty")]
    EmptyId,

    #[error("could not find game with id '{0}'")]
    GameNotFound(String),

    #[error("game events require a game_id")]
    MissingGameId,

    #[error("unsupported {channel} event '{kind}'")]
    UnsupportedEvent { channel: EventChannel, kind: String },

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Game(#[from] GameError),
}
