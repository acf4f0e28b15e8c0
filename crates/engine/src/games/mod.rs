//! Game plugin port.
//!
//! The hub drives every game through `Game` and never looks at its rules.
//! Games receive player sessions as seat handles and talk to their players
//! directly through them.

mod secret_moose;

pub use secret_moose::SecretMooseGame;

use std::sync::Arc;

use async_trait::async_trait;
use gamehub_domain::{GameError, GameId, GameName, GameStatus, PlayerId};
use gamehub_shared::MessageFromPlayer;

use crate::session::PlayerSession;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Game: Send + Sync {
    /// Called once by the hub with the id the game is registered under.
    fn registered(&self, id: GameId);

    /// Seat a player. Fails when the game is full or already started.
    async fn add_player(&self, player: PlayerSession) -> Result<(), GameError>;

    /// Point an existing seat at `player`, a newer session for the same
    /// player id. Returns whether the player holds a seat here.
    fn rebind(&self, player: &PlayerSession) -> bool;

    /// Free a seat. Fails when the game no longer allows it.
    async fn remove_player(&self, player: PlayerId) -> Result<(), GameError>;

    /// Game-specific traffic from a seated player.
    async fn player_event(
        &self,
        player: PlayerSession,
        event: MessageFromPlayer,
    ) -> Result<(), GameError>;

    fn name(&self) -> String;

    fn status(&self) -> GameStatus;

    async fn start_game(&self) -> Result<(), GameError>;

    /// Move to `Finished` and release `auto_start`. Idempotent.
    async fn end_game(&self);

    /// Wait for the start signal and start the game. Returns once the game
    /// has started or ended.
    async fn auto_start(&self);

    /// The game's own public projection for the roster.
    fn public_view(&self) -> Result<serde_json::Value, serde_json::Error>;
}

/// Builds games for `CREATE_GAME` and `POST /games`.
pub trait GameFactory: Send + Sync {
    fn create(&self, name: GameName) -> Arc<dyn Game>;
}

/// Creates Secret Moose games dealt with the thread RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct SecretMooseFactory;

impl GameFactory for SecretMooseFactory {
    fn create(&self, name: GameName) -> Arc<dyn Game> {
        Arc::new(SecretMooseGame::new(name))
    }
}
