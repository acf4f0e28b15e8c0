//! Roster broadcast - the `GAME_LIST` message.
//!
//! The payload maps each game id to the game's own public view. It is built
//! under the games read lock and serialized before anything is sent, so a
//! recipient sees either the state before or after a concurrent change,
//! never a mix.

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::future::join_all;
use gamehub_domain::GameId;
use gamehub_shared::{kinds, EventChannel, MessageToPlayer};

use super::Hub;
use crate::error::HubError;
use crate::games::Game;
use crate::session::PlayerSession;

fn roster_payload(
    games: &HashMap<GameId, Arc<dyn Game>>,
) -> Result<serde_json::Value, serde_json::Error> {
    let mut roster = serde_json::Map::with_capacity(games.len());
    for (id, game) in games {
        roster.insert(id.to_string(), game.public_view()?);
    }
    Ok(serde_json::Value::Object(roster))
}

impl Hub {
    /// Current roster as sent in `GAME_LIST`.
    pub async fn list_games(&self) -> Result<serde_json::Value, HubError> {
        let games = self.games.read().await;
        Ok(roster_payload(&games)?)
    }

    /// Send `GAME_LIST` to `targets`, or to the whole lobby when `targets`
    /// is empty. Returns how many sessions accepted it; a session that
    /// cannot take the message is logged and skipped.
    pub async fn broadcast_roster(&self, targets: &[PlayerSession]) -> Result<usize, HubError> {
        let roster = self.list_games().await?;
        let message = MessageToPlayer::new(EventChannel::Global, kinds::GAME_LIST, roster);

        let recipients = if targets.is_empty() {
            Self::lobby_targets(&*self.sessions.read().await)
        } else {
            targets.to_vec()
        };

        let deliveries = recipients.iter().map(|session| {
            let message = message.clone();
            async move { (session, session.send([message]).await) }
        });

        let mut delivered = 0;
        for (session, result) in join_all(deliveries).await {
            match result {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::warn!(player_id = %session.id(), error = %e, "Could not deliver game list")
                }
            }
        }

        tracing::debug!(delivered, recipients = recipients.len(), "Sent GAME_LIST");
        Ok(delivered)
    }
}
