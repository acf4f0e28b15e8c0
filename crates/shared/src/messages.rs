//! WebSocket message envelope for lobby-client communication
//!
//! Every frame in either direction is one JSON object:
//!
//! ```text
//! { "type": "<string>", "event_channel": "<GLOBAL|PLAYER|GAME|PRIVATE>", "message": <any> }
//! ```
//!
//! Inbound game traffic additionally carries `game_id`.
//!
//! ## Versioning Policy
//!
//! - New channels can be added at the end (forward compatible)
//! - Unknown channels deserialize to `EventChannel::Unknown` so the server can
//!   answer with an error instead of dropping the frame

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Message `type` values understood or produced by the lobby.
pub mod kinds {
    // Player channel
    pub const CHANGE_NAME: &str = "CHANGE_NAME";
    pub const NAME_CHANGED: &str = "NAME_CHANGED";

    // Global channel
    pub const BROADCAST: &str = "BROADCAST";
    pub const GLOBAL_BROADCAST: &str = "GLOBAL_BROADCAST";
    pub const CREATE_GAME: &str = "CREATE_GAME";
    pub const LIST_GAMES: &str = "LIST_GAMES";
    pub const GAME_LIST: &str = "GAME_LIST";

    // Game channel
    pub const JOIN_GAME: &str = "JOIN_GAME";
    pub const LEAVE_GAME: &str = "LEAVE_GAME";
    pub const TOGGLE_READY: &str = "ToggleReady";
    pub const GAME_STARTED: &str = "GAME_STARTED";

    // Private channel
    pub const ERROR: &str = "ERROR";
    pub const GAME_CREATED: &str = "GAME_CREATED";
    pub const ROLE_ASSIGNED: &str = "ROLE_ASSIGNED";
}

/// Routing discriminator carried by every message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventChannel {
    /// Lobby-wide traffic (broadcasts, game creation, roster)
    Global,
    /// Session-local actions (display name)
    Player,
    /// Traffic for one specific game
    Game,
    /// Replies addressed to a single player
    Private,
    /// Any channel this build does not know
    #[serde(other)]
    Unknown,
}

impl fmt::Display for EventChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => write!(f, "GLOBAL"),
            Self::Player => write!(f, "PLAYER"),
            Self::Game => write!(f, "GAME"),
            Self::Private => write!(f, "PRIVATE"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

// =============================================================================
// Server → Player
// =============================================================================

/// A message queued for delivery to every connection of one player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageToPlayer {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_channel: Option<EventChannel>,
    #[serde(default)]
    pub message: serde_json::Value,
}

impl MessageToPlayer {
    pub fn new(channel: EventChannel, kind: impl Into<String>, message: serde_json::Value) -> Self {
        Self {
            kind: kind.into(),
            event_channel: Some(channel),
            message,
        }
    }

    /// Build a message from any serializable payload.
    pub fn with_payload<T: Serialize>(
        channel: EventChannel,
        kind: impl Into<String>,
        payload: &T,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self::new(channel, kind, serde_json::to_value(payload)?))
    }

    /// `PRIVATE` error reply explaining why `original` was rejected.
    pub fn error(error: impl fmt::Display, original: Option<String>) -> Self {
        let payload = crate::responses::ErrorPayload {
            error: error.to_string(),
            original_message: original,
        };
        Self::new(
            EventChannel::Private,
            kinds::ERROR,
            serde_json::to_value(payload).unwrap_or_default(),
        )
    }

    /// Whether the message names a deliverable channel.
    pub fn has_channel(&self) -> bool {
        matches!(self.event_channel, Some(channel) if channel != EventChannel::Unknown)
    }
}

// =============================================================================
// Player → Server
// =============================================================================

/// Errors decoding an inbound frame.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageFromPlayer {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub event_channel: Option<EventChannel>,
    /// Target game for `GAME` traffic.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_id: Option<String>,
    #[serde(default)]
    pub message: serde_json::Value,
}

impl MessageFromPlayer {
    pub fn new(channel: EventChannel, kind: impl Into<String>, message: serde_json::Value) -> Self {
        Self {
            kind: kind.into(),
            event_channel: Some(channel),
            game_id: None,
            message,
        }
    }

    pub fn parse(text: &str) -> Result<Self, EnvelopeError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Read a string argument that may be sent bare (`"message": "x"`) or
    /// keyed (`"message": {"<key>": "x"}`).
    pub fn text_arg(&self, key: &str) -> Option<&str> {
        match &self.message {
            serde_json::Value::String(s) => Some(s.as_str()),
            serde_json::Value::Object(map) => map.get(key).and_then(|v| v.as_str()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn outbound_uses_wire_field_names() {
        let msg = MessageToPlayer::new(EventChannel::Global, kinds::GAME_LIST, json!({}));
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "GAME_LIST");
        assert_eq!(value["event_channel"], "GLOBAL");
        assert_eq!(value["message"], json!({}));
    }

    #[test]
    fn unknown_channel_is_not_deliverable() {
        let mut msg = MessageToPlayer::new(EventChannel::Global, "X", json!(null));
        assert!(msg.has_channel());
        msg.event_channel = Some(EventChannel::Unknown);
        assert!(!msg.has_channel());
        msg.event_channel = None;
        assert!(!msg.has_channel());
    }

    #[test]
    fn error_reply_is_private() {
        let msg = MessageToPlayer::error("nope", Some("{}".to_string()));
        assert_eq!(msg.event_channel, Some(EventChannel::Private));
        assert_eq!(msg.kind, "ERROR");
        assert_eq!(msg.message["error"], "nope");
        assert_eq!(msg.message["original_message"], "{}");
    }

    #[test]
    fn inbound_tolerates_unknown_channels() {
        let msg = MessageFromPlayer::parse(r#"{"type":"X","event_channel":"TEAM"}"#).unwrap();
        assert_eq!(msg.event_channel, Some(EventChannel::Unknown));
    }

    #[test]
    fn inbound_without_channel_decodes() {
        let msg = MessageFromPlayer::parse(r#"{"type":"CHANGE_NAME","message":"Bob"}"#).unwrap();
        assert_eq!(msg.event_channel, None);
        assert_eq!(msg.text_arg("name"), Some("Bob"));
    }

    #[test]
    fn inbound_reads_game_id_and_keyed_args() {
        let msg = MessageFromPlayer::parse(
            r#"{"type":"JOIN_GAME","event_channel":"GAME","game_id":"abc","message":{"name":"Bob"}}"#,
        )
        .unwrap();
        assert_eq!(msg.game_id.as_deref(), Some("abc"));
        assert_eq!(msg.text_arg("name"), Some("Bob"));
        assert_eq!(msg.text_arg("other"), None);
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(
            MessageFromPlayer::parse("not json"),
            Err(EnvelopeError::Malformed(_))
        ));
    }
}
