//! Value objects - Immutable objects defined by their attributes

mod names;

pub use names::{GameName, PlayerName, DEFAULT_GAME_NAME};
