//! Payloads carried in the `message` field of server-to-player envelopes

use gamehub_domain::{Faction, GameId, PlayerId, SeatView};
use serde::{Deserialize, Serialize};

/// `PRIVATE`/`ERROR`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub error: String,
    /// The rejected inbound frame, verbatim when available
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_message: Option<String>,
}

/// `PLAYER`/`NAME_CHANGED`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameChangedPayload {
    pub name: String,
}

/// `GLOBAL`/`GLOBAL_BROADCAST`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalBroadcastPayload {
    pub from: PlayerId,
    pub name: String,
    pub message: serde_json::Value,
}

/// `PRIVATE`/`GAME_CREATED`, also the body of `POST /games`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameCreatedPayload {
    pub id: GameId,
    pub name: String,
}

/// `PRIVATE`/`ROLE_ASSIGNED`
///
/// Fascists learn who the other fascists are; liberals only learn their own
/// faction.
#[derive(Debug, Clone, Serialize)]
pub struct RoleAssignedPayload {
    pub game_id: GameId,
    pub faction: Faction,
    pub moose: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fascists: Option<Vec<SeatView>>,
}

/// `GAME`/`GAME_STARTED`
#[derive(Debug, Clone, Serialize)]
pub struct GameStartedPayload {
    pub game_id: GameId,
    pub first_president: Option<SeatView>,
    pub players: Vec<SeatView>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_payload_omits_missing_original() {
        let payload = ErrorPayload {
            error: "bad".into(),
            original_message: None,
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value, serde_json::json!({ "error": "bad" }));
    }

    #[test]
    fn liberal_role_hides_the_roster() {
        let payload = RoleAssignedPayload {
            game_id: GameId::new(),
            faction: Faction::Liberal,
            moose: false,
            fascists: None,
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["faction"], "liberal");
        assert!(value.get("fascists").is_none());
    }
}
