//! Domain -> wire conversions.

use eom_domain::{Player, Room, RollOutcome, Transfer, User};
use eom_shared::{
    BankSnapshot, PlayerSnapshot, RollResponse, RoomSnapshot, RoomSummary, TransferRecord,
    UserResponse,
};

pub fn room_snapshot(room: &Room) -> RoomSnapshot {
    RoomSnapshot {
        id: room.id().to_uuid(),
        name: room.name().to_string(),
        host_id: room.host().map(|p| p.user_id.to_string()),
        players: room.players().iter().map(player_snapshot).collect(),
        available_dreams: room.available_dreams().to_vec(),
        available_tokens: room.available_tokens(),
        game_started: room.game_started(),
        can_start: room.can_start(),
        ready_count: room.ready_count(),
        players_count: room.players_count(),
        max_players: room.rules().max_players,
        current_turn: room.current_turn(),
        transfers: room.transfers().iter().map(transfer_record).collect(),
        revision: room.revision(),
        created_at: room.created_at(),
        updated_at: room.updated_at(),
    }
}

fn player_snapshot(player: &Player) -> PlayerSnapshot {
    PlayerSnapshot {
        user_id: player.user_id.to_string(),
        name: player.name.to_string(),
        selected_dream: player.selected_dream.clone(),
        selected_token: player.selected_token.clone(),
        is_ready: player.is_ready,
        is_host: player.is_host,
        position: player.position,
        cash: player.cash(),
        credit: player.bank.credit,
        monthly_income: player.bank.monthly_income,
    }
}

fn transfer_record(transfer: &Transfer) -> TransferRecord {
    TransferRecord {
        id: transfer.id.to_uuid(),
        sender_index: transfer.sender_index,
        recipient_index: transfer.recipient_index,
        amount: transfer.amount,
        description: transfer.description.clone(),
        timestamp: transfer.timestamp,
    }
}

/// Bank view of one seat. Returns `None` if the seat does not exist.
pub fn bank_snapshot(room: &Room, player_index: usize) -> Option<BankSnapshot> {
    let player = room.player(player_index)?;
    let bank = &player.bank;
    Some(BankSnapshot {
        room_id: room.id().to_uuid(),
        player_index,
        username: player.name.to_string(),
        balance: bank.balance,
        total_income: bank.total_income,
        total_expenses: bank.total_expenses,
        monthly_income: bank.monthly_income,
        credit: bank.credit,
        max_credit: bank.max_credit,
        transfers: room
            .transfers()
            .iter()
            .filter(|t| t.sender_index == player_index || t.recipient_index == player_index)
            .map(transfer_record)
            .collect(),
        revision: Some(room.revision()),
    })
}

pub fn room_summary(room: &Room) -> RoomSummary {
    RoomSummary {
        id: room.id().to_uuid(),
        name: room.name().to_string(),
        players_count: room.players_count(),
        max_players: room.rules().max_players,
        game_started: room.game_started(),
        updated_at: room.updated_at(),
    }
}

pub fn roll_response(room: &Room, outcome: RollOutcome) -> RollResponse {
    RollResponse {
        player_index: outcome.player_index,
        dice: outcome.dice,
        from: outcome.from,
        to: outcome.to,
        paydays: outcome.paydays,
        room: room_snapshot(room),
    }
}

pub fn user_response(user: &User) -> UserResponse {
    UserResponse {
        id: user.id.to_string(),
        username: user.username.to_string(),
        created_at: user.created_at,
    }
}
