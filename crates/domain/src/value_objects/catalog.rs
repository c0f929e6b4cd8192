//! Dreams and tokens a room offers to its players.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// The selectable dreams and tokens of a room.
///
/// The actual lists are configuration data; the engine reads them from the
/// environment and falls back to [`Catalog::default`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    dreams: Vec<String>,
    tokens: Vec<String>,
}

impl Catalog {
    pub fn new(dreams: Vec<String>, tokens: Vec<String>) -> Result<Self, DomainError> {
        if dreams.is_empty() {
            return Err(DomainError::validation("Catalog needs at least one dream"));
        }
        if tokens.is_empty() {
            return Err(DomainError::validation("Catalog needs at least one token"));
        }
        let mut sorted = tokens.clone();
        sorted.sort();
        sorted.dedup();
        if sorted.len() != tokens.len() {
            return Err(DomainError::validation("Catalog tokens must be unique"));
        }
        Ok(Self { dreams, tokens })
    }

    pub fn dreams(&self) -> &[String] {
        &self.dreams
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn has_dream(&self, dream: &str) -> bool {
        self.dreams.iter().any(|d| d == dream)
    }

    pub fn has_token(&self, token: &str) -> bool {
        self.tokens.iter().any(|t| t == token)
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            dreams: ["house", "travel", "business", "charity", "education", "yacht"]
                .into_iter()
                .map(str::to_string)
                .collect(),
            tokens: ["lion", "eagle", "fox", "bear", "tiger", "wolf", "owl", "dolphin"]
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_duplicate_tokens() {
        let err = Catalog::new(vec!["house".into()], vec!["fox".into(), "fox".into()]);
        assert!(err.is_err());
    }

    #[test]
    fn rejects_empty_lists() {
        assert!(Catalog::new(vec![], vec!["fox".into()]).is_err());
        assert!(Catalog::new(vec!["house".into()], vec![]).is_err());
    }

    #[test]
    fn default_catalog_has_room_for_six_players() {
        let catalog = Catalog::default();
        assert!(catalog.tokens().len() >= 6);
        assert!(catalog.has_dream("house"));
        assert!(!catalog.has_token("dragon"));
    }
}
