//! Validated name newtypes for lobby entities
//!
//! These newtypes ensure that names are valid by construction:
//! - Non-empty
//! - Within length limits
//! - Trimmed of leading/trailing whitespace

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DomainError;

/// Maximum length for a player's display name
const MAX_PLAYER_NAME_LENGTH: usize = 64;

/// Maximum length for a game name
const MAX_GAME_NAME_LENGTH: usize = 100;

/// Name shown for games created without one.
pub const DEFAULT_GAME_NAME: &str = "Untitled";

fn validated(name: &str, what: &str, max: usize) -> Result<String, DomainError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(format!("{what} cannot be empty")));
    }
    if trimmed.chars().count() > max {
        return Err(DomainError::validation(format!(
            "{what} cannot exceed {max} characters"
        )));
    }
    Ok(trimmed.to_string())
}

// ============================================================================
// PlayerName
// ============================================================================

/// A validated player display name (non-empty, <=64 chars, trimmed)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PlayerName(String);

impl PlayerName {
    /// Create a new validated player name.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the name is empty after trimming
    /// or longer than 64 characters.
    pub fn new(name: impl Into<String>) -> Result<Self, DomainError> {
        validated(&name.into(), "Player name", MAX_PLAYER_NAME_LENGTH).map(Self)
    }

    /// Fallback used when no generated name is available.
    pub fn anonymous() -> Self {
        Self("Anonymous".to_string())
    }

    /// Returns the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for PlayerName {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<PlayerName> for String {
    fn from(name: PlayerName) -> String {
        name.0
    }
}

// ============================================================================
// GameName
// ============================================================================

/// A validated game name (non-empty, <=100 chars, trimmed)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GameName(String);

impl GameName {
    /// Create a new validated game name.
    pub fn new(name: impl Into<String>) -> Result<Self, DomainError> {
        validated(&name.into(), "Game name", MAX_GAME_NAME_LENGTH).map(Self)
    }

    /// Use the given name if it is valid, falling back to `Untitled`.
    pub fn or_default(name: impl Into<String>) -> Self {
        Self::new(name).unwrap_or_default()
    }

    /// Returns the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for GameName {
    fn default() -> Self {
        Self(DEFAULT_GAME_NAME.to_string())
    }
}

impl fmt::Display for GameName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for GameName {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<GameName> for String {
    fn from(name: GameName) -> String {
        name.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn player_name_is_trimmed() {
        let name = PlayerName::new("  Brave Moose  ").unwrap();
        assert_eq!(name.as_str(), "Brave Moose");
    }

    #[test]
    fn player_name_rejects_blank() {
        let err = PlayerName::new("   ").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Validation failed: Player name cannot be empty"
        );
    }

    #[test]
    fn player_name_rejects_long_names() {
        assert!(PlayerName::new("x".repeat(65)).is_err());
        assert!(PlayerName::new("x".repeat(64)).is_ok());
    }

    #[test]
    fn player_name_deserialization_validates() {
        let parsed: Result<PlayerName, _> = serde_json::from_str("\"\"");
        assert!(parsed.is_err());
    }

    #[test]
    fn game_name_falls_back_to_untitled() {
        assert_eq!(GameName::or_default("").as_str(), DEFAULT_GAME_NAME);
        assert_eq!(
            GameName::or_default("Lunchtime Brawl").as_str(),
            "Lunchtime Brawl"
        );
    }
}
