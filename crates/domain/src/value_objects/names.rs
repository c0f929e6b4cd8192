//! Validated name newtypes
//!
//! These newtypes ensure that names are valid by construction:
//! - Non-empty
//! - Within length limits
//! - Trimmed of leading/trailing whitespace

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DomainError;

/// Maximum length for a player's display name
const MAX_PLAYER_NAME_LENGTH: usize = 32;

/// Maximum length for a room name
const MAX_ROOM_NAME_LENGTH: usize = 64;

fn validate(raw: String, what: &str, max: usize) -> Result<String, DomainError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(format!("{} cannot be empty", what)));
    }
    if trimmed.chars().count() > max {
        return Err(DomainError::validation(format!(
            "{} cannot exceed {} characters",
            what, max
        )));
    }
    Ok(trimmed.to_string())
}

// ============================================================================
// PlayerName
// ============================================================================

/// A validated player display name (non-empty, <=32 chars, trimmed)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PlayerName(String);

impl PlayerName {
    /// Create a new validated player name.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the name is empty after trimming
    /// or longer than 32 characters.
    pub fn new(name: impl Into<String>) -> Result<Self, DomainError> {
        validate(name.into(), "Player name", MAX_PLAYER_NAME_LENGTH).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive comparison, used when the bank API addresses players by name.
    pub fn matches(&self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(other.trim())
    }
}

impl fmt::Display for PlayerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for PlayerName {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PlayerName> for String {
    fn from(value: PlayerName) -> Self {
        value.0
    }
}

// ============================================================================
// RoomName
// ============================================================================

/// A validated room name (non-empty, <=64 chars, trimmed)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomName(String);

impl RoomName {
    pub fn new(name: impl Into<String>) -> Result<Self, DomainError> {
        validate(name.into(), "Room name", MAX_ROOM_NAME_LENGTH).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for RoomName {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RoomName> for String {
    fn from(value: RoomName) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod player_name {
        use super::*;

        #[test]
        fn valid_name() {
            let name = PlayerName::new("Alice").unwrap();
            assert_eq!(name.as_str(), "Alice");
            assert_eq!(name.to_string(), "Alice");
        }

        #[test]
        fn empty_name_rejected() {
            let err = PlayerName::new("   ").unwrap_err();
            assert!(matches!(err, DomainError::Validation(_)));
            assert!(err.to_string().contains("cannot be empty"));
        }

        #[test]
        fn name_is_trimmed() {
            assert_eq!(PlayerName::new("  Bob  ").unwrap().as_str(), "Bob");
        }

        #[test]
        fn too_long_rejected() {
            assert!(PlayerName::new("a".repeat(33)).is_err());
            assert!(PlayerName::new("a".repeat(32)).is_ok());
        }

        #[test]
        fn matches_ignores_case() {
            let name = PlayerName::new("Alice").unwrap();
            assert!(name.matches(" alice "));
            assert!(!name.matches("alicia"));
        }
    }

    mod room_name {
        use super::*;

        #[test]
        fn too_long_rejected() {
            assert!(RoomName::new("r".repeat(65)).is_err());
        }

        #[test]
        fn serde_validates() {
            assert!(serde_json::from_str::<RoomName>("\"\"").is_err());
            let name: RoomName = serde_json::from_str("\" Lobby \"").unwrap();
            assert_eq!(name.as_str(), "Lobby");
        }
    }
}
