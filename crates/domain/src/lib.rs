//! Gamehub Domain - the runtime-free core of the lobby.
//!
//! - `ids` - typed identifiers for players, games and connections
//! - `value_objects` - validated names
//! - `games` - game status and the bundled rule sets
//! - `error` - domain and game-rule errors

pub mod error;
pub mod games;
pub mod ids;
pub mod value_objects;

pub use error::{DomainError, GameError};
pub use games::secret_moose::{Faction, MooseView, SeatView, SecretMoose};
pub use games::GameStatus;
pub use ids::{ConnectionId, GameId, PlayerId};
pub use value_objects::{GameName, PlayerName, DEFAULT_GAME_NAME};
