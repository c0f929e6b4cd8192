//! Snapshot DTOs
//!
//! A snapshot is the full state of a room (or one player's bank account) as
//! the server saw it at `revision`. Clients replace their local copy with it
//! wholesale; they never merge fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Room
// =============================================================================

/// Full room state returned by every room endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    pub id: Uuid,
    pub name: String,
    /// User id of the current host, if the room still has players
    #[serde(default)]
    pub host_id: Option<String>,
    pub players: Vec<PlayerSnapshot>,
    pub available_dreams: Vec<String>,
    pub available_tokens: Vec<String>,
    pub game_started: bool,
    pub can_start: bool,
    pub ready_count: usize,
    pub players_count: usize,
    pub max_players: usize,
    pub current_turn: usize,
    #[serde(default)]
    pub transfers: Vec<TransferRecord>,
    /// Monotonic room revision; clients drop snapshots older than the last one applied
    pub revision: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RoomSnapshot {
    /// Look up a player by user id.
    pub fn player(&self, user_id: &str) -> Option<&PlayerSnapshot> {
        self.players.iter().find(|p| p.user_id == user_id)
    }

    /// Index of the player with the given user id.
    pub fn player_index(&self, user_id: &str) -> Option<usize> {
        self.players.iter().position(|p| p.user_id == user_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSnapshot {
    pub user_id: String,
    pub name: String,
    #[serde(default)]
    pub selected_dream: Option<String>,
    #[serde(default)]
    pub selected_token: Option<String>,
    pub is_ready: bool,
    pub is_host: bool,
    pub position: usize,
    pub cash: i64,
    pub credit: i64,
    pub monthly_income: i64,
}

/// One entry of the room's append-only transfer log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRecord {
    pub id: Uuid,
    pub sender_index: usize,
    pub recipient_index: usize,
    pub amount: i64,
    #[serde(default)]
    pub description: String,
    pub timestamp: DateTime<Utc>,
}

/// Row of the room list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub id: Uuid,
    pub name: String,
    pub players_count: usize,
    pub max_players: usize,
    pub game_started: bool,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Bank
// =============================================================================

/// One player's bank account as seen by the server.
///
/// `revision` is the room revision the account was read at. Older servers did
/// not send it, so it stays optional on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankSnapshot {
    pub room_id: Uuid,
    pub player_index: usize,
    pub username: String,
    pub balance: i64,
    pub total_income: i64,
    pub total_expenses: i64,
    pub monthly_income: i64,
    pub credit: i64,
    pub max_credit: i64,
    /// Transfers this player sent or received, oldest first
    #[serde(default)]
    pub transfers: Vec<TransferRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn room_snapshot_uses_camel_case() {
        let snapshot = RoomSnapshot {
            id: Uuid::nil(),
            name: "Lobby".into(),
            host_id: Some("u1".into()),
            players: vec![],
            available_dreams: vec!["house".into()],
            available_tokens: vec!["fox".into()],
            game_started: false,
            can_start: false,
            ready_count: 0,
            players_count: 0,
            max_players: 6,
            current_turn: 0,
            transfers: vec![],
            revision: 3,
            created_at: DateTime::<Utc>::default(),
            updated_at: DateTime::<Utc>::default(),
        };
        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(value["availableTokens"], json!(["fox"]));
        assert_eq!(value["gameStarted"], json!(false));
        assert_eq!(value["revision"], json!(3));
    }

    #[test]
    fn bank_snapshot_without_revision_still_parses() {
        let raw = json!({
            "roomId": Uuid::nil(),
            "playerIndex": 0,
            "username": "Ann",
            "balance": 100,
            "totalIncome": 0,
            "totalExpenses": 0,
            "monthlyIncome": 3000,
            "credit": 0,
            "maxCredit": 30000
        });
        let snapshot: BankSnapshot = serde_json::from_value(raw).unwrap();
        assert_eq!(snapshot.revision, None);
        assert!(snapshot.transfers.is_empty());
    }
}
