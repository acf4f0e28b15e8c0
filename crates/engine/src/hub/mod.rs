//! Hub - the lobby registry.
//!
//! Two maps, each behind its own lock:
//!
//! - player id -> `PlayerSession`
//! - game id -> `Arc<dyn Game>`
//!
//! Neither lock is held across a call into a session or a game. Sessions
//! reach the hub through `InboundRouter` (see `routing`), holding it weakly.

mod eviction;
mod roster;
mod routing;

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use gamehub_domain::{ConnectionId, GameId, GameName, GameStatus, PlayerId};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::config::HubConfig;
use crate::error::{HubError, SessionError};
use crate::games::{Game, GameFactory};
use crate::session::{placeholder_name, InboundRouter, PlayerSession, SessionConfig};
use crate::transport::Connection;

pub struct Hub {
    config: HubConfig,
    sessions: RwLock<HashMap<PlayerId, PlayerSession>>,
    games: RwLock<HashMap<GameId, Arc<dyn Game>>>,
    factory: Arc<dyn GameFactory>,
    tracker: TaskTracker,
    cancel: CancellationToken,
    me: Weak<Hub>,
}

impl Hub {
    pub fn new(config: HubConfig, factory: Arc<dyn GameFactory>) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            config,
            sessions: RwLock::new(HashMap::new()),
            games: RwLock::new(HashMap::new()),
            factory,
            tracker: TaskTracker::new(),
            cancel: CancellationToken::new(),
            me: me.clone(),
        })
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    // =========================================================================
    // Players
    // =========================================================================

    /// Attach `connection` to the session for `id`, creating and starting
    /// the session first if needed. A new session takes over any seats its
    /// player id still holds and immediately receives the current
    /// `GAME_LIST`.
    pub async fn connect_session(
        &self,
        id: PlayerId,
        connection: Option<Arc<dyn Connection>>,
    ) -> Result<PlayerSession, HubError> {
        let connection = connection.ok_or(HubError::MissingConnection)?;

        // A session can retire between lookup and attach; replace it once.
        for _ in 0..2 {
            let (session, created) = self.resolve_session(id).await;
            match session.attach(connection.clone()).await {
                Ok(()) => {
                    tracing::debug!(player_id = %id, connection_id = %connection.id(), created, "Player connected");
                    if created {
                        self.rebind_seats(&session).await;
                        if let Err(e) = self.broadcast_roster(std::slice::from_ref(&session)).await {
                            tracing::error!(player_id = %id, error = %e, "Could not send game list to new player");
                        }
                    }
                    return Ok(session);
                }
                Err(SessionError::Stopped) => self.forget_session(&session).await,
                Err(e) => return Err(e.into()),
            }
        }
        Err(SessionError::Stopped.into())
    }

    /// Detach one connection from a player's session.
    pub async fn disconnect_session(
        &self,
        id: PlayerId,
        connection_id: ConnectionId,
    ) -> Result<(), HubError> {
        let session = self.session(id).await.ok_or(HubError::UnknownPlayer(id))?;
        session.detach(connection_id).await?;
        tracing::debug!(player_id = %id, %connection_id, "Player disconnected");
        Ok(())
    }

    pub async fn session(&self, id: PlayerId) -> Option<PlayerSession> {
        self.sessions.read().await.get(&id).cloned()
    }

    /// Number of sessions in the lobby, connected or not.
    pub async fn lobby_size(&self) -> usize {
        self.sessions.read().await.len()
    }

    async fn resolve_session(&self, id: PlayerId) -> (PlayerSession, bool) {
        if let Some(session) = self.sessions.read().await.get(&id) {
            if !session.is_stopped() {
                return (session.clone(), false);
            }
        }

        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get(&id) {
            if !session.is_stopped() {
                return (session.clone(), false);
            }
        }

        let router: Weak<dyn InboundRouter> = self.me.clone();
        let (session, run_loop) = PlayerSession::new(
            id,
            placeholder_name(),
            &SessionConfig::from(&self.config),
            router,
            self.tracker.clone(),
        );
        self.tracker.spawn(run_loop.run(self.config.keep_alive));
        sessions.insert(id, session.clone());
        tracing::debug!(player_id = %id, name = %session.display_name(), "Session created");
        (session, true)
    }

    /// Hand every seat held by `session`'s player id over to `session`.
    async fn rebind_seats(&self, session: &PlayerSession) {
        let games: Vec<Arc<dyn Game>> = self.games.read().await.values().cloned().collect();
        let rebound = games.iter().filter(|game| game.rebind(session)).count();
        if rebound > 0 {
            tracing::debug!(player_id = %session.id(), games = rebound, "Seats moved to new session");
        }
    }

    /// Drop `session` from the lobby if it is still the registered instance.
    async fn forget_session(&self, session: &PlayerSession) {
        let mut sessions = self.sessions.write().await;
        if sessions.get(&session.id()).is_some_and(|s| s.ptr_eq(session)) {
            sessions.remove(&session.id());
        }
    }

    fn lobby_targets(sessions: &HashMap<PlayerId, PlayerSession>) -> Vec<PlayerSession> {
        sessions.values().cloned().collect()
    }

    // =========================================================================
    // Games
    // =========================================================================

    /// Register a game under a fresh id, start its auto-start watcher and
    /// tell the lobby. The lobby hears again once the watcher has started
    /// the game.
    pub async fn add_game(&self, game: Option<Arc<dyn Game>>) -> Result<GameId, HubError> {
        let game = game.ok_or(HubError::InvalidGame)?;
        let id = GameId::new();
        game.registered(id);
        self.games.write().await.insert(id, game.clone());

        let hub = self.me.clone();
        self.tracker.spawn(async move {
            game.auto_start().await;
            let status = game.status();
            tracing::debug!(game_id = %id, %status, "Auto start finished");
            if status != GameStatus::Started {
                return;
            }
            if let Some(hub) = hub.upgrade() {
                if let Err(e) = hub.broadcast_roster(&[]).await {
                    tracing::error!(game_id = %id, error = %e, "Could not broadcast game list");
                }
            }
        });

        tracing::debug!(game_id = %id, "Game created");
        if let Err(e) = self.broadcast_roster(&[]).await {
            tracing::error!(game_id = %id, error = %e, "Could not broadcast game list");
        }
        Ok(id)
    }

    /// Build a game with the configured factory and register it.
    pub async fn create_game(&self, name: GameName) -> Result<(GameId, String), HubError> {
        let game = self.factory.create(name);
        let name = game.name();
        let id = self.add_game(Some(game)).await?;
        Ok((id, name))
    }

    /// End a game and remove it from the lobby.
    pub async fn remove_game(&self, id: &str) -> Result<(), HubError> {
        let id = id.trim();
        if id.is_empty() {
            return Err(HubError::EmptyId);
        }
        let game_id: GameId = id
            .parse()
            .map_err(|_| HubError::GameNotFound(id.to_string()))?;
        let game = self
            .games
            .write()
            .await
            .remove(&game_id)
            .ok_or_else(|| HubError::GameNotFound(id.to_string()))?;

        game.end_game().await;
        tracing::debug!(%game_id, "Game deleted");
        if let Err(e) = self.broadcast_roster(&[]).await {
            tracing::error!(%game_id, error = %e, "Could not broadcast game list");
        }
        Ok(())
    }

    pub async fn game(&self, id: GameId) -> Option<Arc<dyn Game>> {
        self.games.read().await.get(&id).cloned()
    }

    pub async fn game_count(&self) -> usize {
        self.games.read().await.len()
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Stop every session, end every game and wait for all background tasks,
    /// up to `timeout`. Returns `false` if something was still running.
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        self.cancel.cancel();

        let sessions: Vec<PlayerSession> = self.sessions.write().await.drain().map(|(_, s)| s).collect();
        let games: Vec<Arc<dyn Game>> = self.games.write().await.drain().map(|(_, g)| g).collect();
        tracing::info!(sessions = sessions.len(), games = games.len(), "Shutting down hub");

        for session in &sessions {
            session.stop();
        }
        self.tracker.close();

        let released = tokio::time::timeout(timeout, async {
            for game in &games {
                game.end_game().await;
            }
            self.tracker.wait().await;
        })
        .await
        .is_ok();

        if !released {
            tracing::warn!(?timeout, "Hub shutdown timed out");
        }
        released
    }
}
