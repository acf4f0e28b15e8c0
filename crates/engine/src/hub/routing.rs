//! Lobby traffic from players (`GLOBAL` and `GAME` channels).

use async_trait::async_trait;
use futures_util::future::join_all;
use gamehub_domain::{GameId, GameName};
use gamehub_shared::{
    kinds, EventChannel, GameCreatedPayload, GlobalBroadcastPayload, MessageFromPlayer,
    MessageToPlayer,
};

use super::Hub;
use crate::error::HubError;
use crate::session::{InboundRouter, PlayerSession};

#[async_trait]
impl InboundRouter for Hub {
    async fn route(&self, from: PlayerSession, message: MessageFromPlayer, raw: String) {
        let kind = message.kind.clone();
        let result = match message.event_channel {
            Some(EventChannel::Global) => self.global_event(&from, message).await,
            Some(EventChannel::Game) => self.game_event(&from, message).await,
            Some(channel) => Err(HubError::UnsupportedEvent { channel, kind: kind.clone() }),
            None => Err(HubError::UnsupportedEvent {
                channel: EventChannel::Unknown,
                kind: kind.clone(),
            }),
        };

        if let Err(e) = result {
            tracing::debug!(player_id = %from.id(), %kind, error = %e, "Rejected player event");
            from.reply_error(e, Some(raw)).await;
        }
    }
}

impl Hub {
    async fn global_event(
        &self,
        from: &PlayerSession,
        message: MessageFromPlayer,
    ) -> Result<(), HubError> {
        match message.kind.as_str() {
            kinds::BROADCAST => {
                let payload = GlobalBroadcastPayload {
                    from: from.id(),
                    name: from.display_name().to_string(),
                    message: message.message,
                };
                let broadcast = MessageToPlayer::with_payload(
                    EventChannel::Global,
                    kinds::GLOBAL_BROADCAST,
                    &payload,
                )?;
                let lobby = Self::lobby_targets(&*self.sessions.read().await);
                let results = join_all(lobby.iter().map(|s| s.send([broadcast.clone()]))).await;
                let failed = results.iter().filter(|r| r.is_err()).count();
                if failed > 0 {
                    tracing::warn!(player_id = %from.id(), failed, "Broadcast missed some players");
                }
                Ok(())
            }
            kinds::CREATE_GAME => {
                let name = GameName::or_default(message.text_arg("name").unwrap_or_default());
                let (id, name) = self.create_game(name).await?;
                let created = MessageToPlayer::with_payload(
                    EventChannel::Private,
                    kinds::GAME_CREATED,
                    &GameCreatedPayload { id, name },
                )?;
                from.send([created]).await?;
                Ok(())
            }
            kinds::LIST_GAMES => {
                self.broadcast_roster(std::slice::from_ref(from)).await?;
                Ok(())
            }
            other => Err(HubError::UnsupportedEvent {
                channel: EventChannel::Global,
                kind: other.to_string(),
            }),
        }
    }

    async fn game_event(
        &self,
        from: &PlayerSession,
        message: MessageFromPlayer,
    ) -> Result<(), HubError> {
        let raw_id = message
            .game_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or(HubError::MissingGameId)?;
        let game = match raw_id.parse::<GameId>() {
            Ok(id) => self.game(id).await,
            Err(_) => None,
        }
        .ok_or_else(|| HubError::GameNotFound(raw_id.to_string()))?;

        match message.kind.as_str() {
            kinds::JOIN_GAME => {
                game.add_player(from.clone()).await?;
                self.broadcast_roster(&[]).await?;
            }
            kinds::LEAVE_GAME => {
                game.remove_player(from.id()).await?;
                self.broadcast_roster(&[]).await?;
            }
            _ => game.player_event(from.clone(), message).await?,
        }
        Ok(())
    }
}
