//! Inbound reader - one task per attached connection.
//!
//! Decodes every frame and dispatches it by channel tag. `PLAYER` traffic is
//! handled against the session itself; `GLOBAL` and `GAME` traffic goes to
//! the lobby through `InboundRouter`. Anything else is answered with a
//! `PRIVATE` error.

use std::sync::{Arc, Weak};

use async_trait::async_trait;
use gamehub_domain::PlayerName;
use gamehub_shared::{kinds, EventChannel, MessageFromPlayer};
use tokio_util::sync::CancellationToken;

use super::PlayerSession;
use crate::transport::Connection;

/// Receiver of lobby-level traffic (`GLOBAL` and `GAME` channels).
#[async_trait]
pub trait InboundRouter: Send + Sync {
    /// Handle one decoded message. `raw` is the frame exactly as received,
    /// for error replies.
    async fn route(&self, from: PlayerSession, message: MessageFromPlayer, raw: String);
}

pub(super) async fn read_inbound(
    session: PlayerSession,
    connection: Arc<dyn Connection>,
    router: Weak<dyn InboundRouter>,
    cancel: CancellationToken,
) {
    let connection_id = connection.id();
    let player_id = session.id();

    loop {
        let frame = tokio::select! {
            _ = cancel.cancelled() => return,
            frame = connection.recv() => frame,
        };
        match frame {
            Ok(Some(raw)) => dispatch(&session, &router, raw).await,
            Ok(None) => {
                tracing::debug!(%player_id, %connection_id, "Connection closed by peer");
                break;
            }
            Err(e) => {
                tracing::debug!(%player_id, %connection_id, error = %e, "Connection read failed");
                break;
            }
        }
    }

    if let Err(e) = session.detach(connection_id).await {
        tracing::warn!(%player_id, %connection_id, error = %e, "Could not detach dead connection");
    }
}

async fn dispatch(session: &PlayerSession, router: &Weak<dyn InboundRouter>, raw: String) {
    let message = match MessageFromPlayer::parse(&raw) {
        Ok(message) => message,
        Err(e) => return session.reply_error(e, Some(raw)).await,
    };

    match message.event_channel {
        Some(EventChannel::Player) => player_event(session, message, raw).await,
        Some(EventChannel::Global | EventChannel::Game) => match router.upgrade() {
            Some(router) => router.route(session.clone(), message, raw).await,
            None => session.reply_error("lobby is unavailable", Some(raw)).await,
        },
        _ => {
            session
                .reply_error("missing or unknown event_channel", Some(raw))
                .await
        }
    }
}

async fn player_event(session: &PlayerSession, message: MessageFromPlayer, raw: String) {
    match message.kind.as_str() {
        kinds::CHANGE_NAME => {
            let name = match message.text_arg("name") {
                Some(name) => PlayerName::new(name).map_err(|e| e.to_string()),
                None => Err("CHANGE_NAME requires a name".to_string()),
            };
            match name {
                Ok(name) => {
                    if let Err(e) = session.rename(name).await {
                        tracing::warn!(player_id = %session.id(), error = %e, "Rename was not applied");
                    }
                }
                Err(e) => session.reply_error(e, Some(raw)).await,
            }
        }
        other => {
            session
                .reply_error(format!("unknown player event '{other}'"), Some(raw))
                .await
        }
    }
}
