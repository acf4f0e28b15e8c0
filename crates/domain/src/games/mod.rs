//! Game vocabulary shared by every pluggable game.
//!
//! The lobby never looks inside a game; it only reads the status a game
//! reports. Concrete rule sets live in submodules.

pub mod secret_moose;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a game as reported by the game itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GameStatus {
    /// Accepting players, not yet started.
    #[default]
    Created,
    /// Rules are running; the seat list is frozen.
    Started,
    /// Terminal. Hidden information may be revealed.
    Finished,
}

impl GameStatus {
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Finished)
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "Created"),
            Self::Started => write!(f, "Started"),
            Self::Finished => write!(f, "Finished"),
        }
    }
}

/// Checks that `order` is a permutation of `0..len`.
pub fn is_permutation(order: &[usize], len: usize) -> bool {
    if order.len() != len {
        return false;
    }
    let mut seen = vec![false; len];
    for &i in order {
        match seen.get_mut(i) {
            Some(slot) if !*slot => *slot = true,
            _ => return false,
        }
    }
    true
}
