//! Bank use cases: balances, transfers, and credit.
//!
//! Two addressing styles exist side by side. Room routes address players by
//! seat index or user id; the bank routes address them by display name.

use std::sync::Arc;

use eom_domain::{DomainError, Room, RoomId, UserId};

use super::{RoomError, RoomWriter};
use crate::infrastructure::ports::RoomRepo;

/// A room together with the seat whose account the caller asked about.
#[derive(Debug, Clone)]
pub struct PlayerAccount {
    pub room: Room,
    pub player_index: usize,
}

pub struct BankOps {
    rooms: Arc<dyn RoomRepo>,
    writer: Arc<RoomWriter>,
}

fn seat_by_name(room: &Room, name: &str) -> Result<usize, DomainError> {
    room.player_index_by_name(name)
        .ok_or_else(|| DomainError::not_found("Player", name.trim()))
}

impl BankOps {
    pub fn new(rooms: Arc<dyn RoomRepo>, writer: Arc<RoomWriter>) -> Self {
        Self { rooms, writer }
    }

    /// Account of the player called `username` in `room_id`.
    pub async fn balance(&self, room_id: RoomId, username: &str) -> Result<PlayerAccount, RoomError> {
        let room = self
            .rooms
            .get(room_id)
            .await?
            .ok_or(RoomError::RoomNotFound(room_id))?;
        let player_index = seat_by_name(&room, username)?;
        Ok(PlayerAccount { room, player_index })
    }

    /// Move money between two seats.
    pub async fn transfer(
        &self,
        room_id: RoomId,
        sender_index: usize,
        recipient_index: usize,
        amount: i64,
        description: &str,
    ) -> Result<Room, RoomError> {
        let description = description.to_string();
        let (room, transfer) = self
            .writer
            .update(room_id, move |room, now| {
                room.transfer(sender_index, recipient_index, amount, description, now)
            })
            .await?;

        tracing::info!(
            room_id = %room_id,
            transfer_id = %transfer.id,
            from = sender_index,
            to = recipient_index,
            amount,
            "Transfer recorded"
        );
        Ok(room)
    }

    /// Move money between two players named `from` and `to`. Returns the sender's account.
    pub async fn transfer_by_name(
        &self,
        room_id: RoomId,
        from: &str,
        to: &str,
        amount: i64,
        description: &str,
    ) -> Result<PlayerAccount, RoomError> {
        let (from, to) = (from.to_string(), to.to_string());
        let description = description.to_string();
        let (room, player_index) = self
            .writer
            .update(room_id, move |room, now| {
                let sender = seat_by_name(room, &from)?;
                let recipient = seat_by_name(room, &to)?;
                room.transfer(sender, recipient, amount, description, now)?;
                Ok(sender)
            })
            .await?;

        tracing::info!(room_id = %room_id, from = player_index, amount, "Transfer recorded");
        Ok(PlayerAccount { room, player_index })
    }

    pub async fn take_credit(
        &self,
        room_id: RoomId,
        user_id: &str,
        amount: i64,
    ) -> Result<PlayerAccount, RoomError> {
        let user_id = UserId::new(user_id)?;
        let (room, player_index) = self
            .writer
            .update(room_id, move |room, now| room.take_credit(&user_id, amount, now))
            .await?;

        tracing::info!(room_id = %room_id, seat = player_index, amount, "Credit taken");
        Ok(PlayerAccount { room, player_index })
    }

    pub async fn take_credit_by_name(
        &self,
        room_id: RoomId,
        username: &str,
        amount: i64,
    ) -> Result<PlayerAccount, RoomError> {
        let username = username.to_string();
        let (room, player_index) = self
            .writer
            .update(room_id, move |room, now| {
                let seat = seat_by_name(room, &username)?;
                let user_id = room.players()[seat].user_id.clone();
                room.take_credit(&user_id, amount, now)
            })
            .await?;

        tracing::info!(room_id = %room_id, seat = player_index, amount, "Credit taken");
        Ok(PlayerAccount { room, player_index })
    }

    pub async fn payoff_credit(
        &self,
        room_id: RoomId,
        user_id: &str,
        amount: i64,
    ) -> Result<PlayerAccount, RoomError> {
        let user_id = UserId::new(user_id)?;
        let (room, player_index) = self
            .writer
            .update(room_id, move |room, now| {
                room.payoff_credit(&user_id, amount, now)
            })
            .await?;

        tracing::info!(room_id = %room_id, seat = player_index, amount, "Credit paid off");
        Ok(PlayerAccount { room, player_index })
    }
}
