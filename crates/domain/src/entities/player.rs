//! Player entity - one seat in a room.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::BankAccount;
use crate::ids::UserId;
use crate::value_objects::PlayerName;

/// A participant of exactly one room.
///
/// Clients never build players themselves; they receive them inside room
/// snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub user_id: UserId,
    pub name: PlayerName,
    pub selected_dream: Option<String>,
    pub selected_token: Option<String>,
    pub is_ready: bool,
    pub is_host: bool,
    pub position: usize,
    pub bank: BankAccount,
    pub joined_at: DateTime<Utc>,
}

impl Player {
    pub fn new(user_id: UserId, name: PlayerName, joined_at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            name,
            selected_dream: None,
            selected_token: None,
            is_ready: false,
            is_host: false,
            position: 0,
            bank: BankAccount::default(),
            joined_at,
        }
    }

    pub fn as_host(mut self) -> Self {
        self.is_host = true;
        self
    }

    /// Cash on hand; the bank balance is the player's cash.
    pub fn cash(&self) -> i64 {
        self.bank.balance
    }

    /// A player may only be ready once both a dream and a token are chosen.
    pub fn has_selections(&self) -> bool {
        self.selected_dream.is_some() && self.selected_token.is_some()
    }
}
