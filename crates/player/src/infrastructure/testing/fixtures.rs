use chrono::{TimeZone, Utc};
use eom_shared::{BankSnapshot, PlayerSnapshot, RoomSnapshot};
use uuid::Uuid;

use crate::state::UserIdentity;

pub(crate) const ROOM_ID: Uuid = Uuid::from_u128(0x5eed_0000_0000_4000_8000_0000_0000_0001);

pub(crate) fn identity() -> UserIdentity {
    UserIdentity {
        id: "u1".to_string(),
        username: "Hana".to_string(),
    }
}

/// Lobby with Hana seated as host.
pub(crate) fn room_snapshot(revision: u64) -> RoomSnapshot {
    let at = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
    RoomSnapshot {
        id: ROOM_ID,
        name: "Evening table".to_string(),
        host_id: Some("u1".to_string()),
        players: vec![PlayerSnapshot {
            user_id: "u1".to_string(),
            name: "Hana".to_string(),
            selected_dream: None,
            selected_token: None,
            is_ready: false,
            is_host: true,
            position: 0,
            cash: 3000,
            credit: 0,
            monthly_income: 3000,
        }],
        available_dreams: vec!["house".to_string(), "travel".to_string()],
        available_tokens: vec!["lion".to_string(), "fox".to_string()],
        game_started: false,
        can_start: false,
        ready_count: 0,
        players_count: 1,
        max_players: 6,
        current_turn: 0,
        transfers: vec![],
        revision,
        created_at: at,
        updated_at: at,
    }
}

pub(crate) fn bank_snapshot(balance: i64, revision: Option<u64>) -> BankSnapshot {
    BankSnapshot {
        room_id: ROOM_ID,
        player_index: 0,
        username: "Hana".to_string(),
        balance,
        total_income: 0,
        total_expenses: 0,
        monthly_income: 3000,
        credit: 0,
        max_credit: 30_000,
        transfers: vec![],
        revision,
    }
}
