//! Turn use cases.

use std::sync::Arc;

use eom_domain::{Room, RoomId, RollOutcome, UserId};

use super::{RoomError, RoomWriter};
use crate::infrastructure::ports::RandomPort;

/// Roll the die for the player whose turn it is.
pub struct RollDice {
    writer: Arc<RoomWriter>,
    random: Arc<dyn RandomPort>,
}

impl RollDice {
    pub fn new(writer: Arc<RoomWriter>, random: Arc<dyn RandomPort>) -> Self {
        Self { writer, random }
    }

    pub async fn execute(
        &self,
        room_id: RoomId,
        user_id: &str,
    ) -> Result<(Room, RollOutcome), RoomError> {
        let user_id = UserId::new(user_id)?;
        let die = self.random.roll_die();
        let (room, outcome) = self
            .writer
            .update(room_id, move |room, now| room.roll(&user_id, die, now))
            .await?;

        tracing::info!(
            room_id = %room_id,
            seat = outcome.player_index,
            dice = outcome.dice,
            to = outcome.to,
            paydays = outcome.paydays,
            "Dice rolled"
        );
        Ok((room, outcome))
    }
}
