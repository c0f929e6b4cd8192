//! Serialized load-modify-save for a single room.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use eom_domain::{DomainError, Room, RoomId};

use super::RoomError;
use crate::infrastructure::ports::{ClockPort, RoomRepo};
use crate::infrastructure::room_locks::RoomLocks;

/// Applies one domain operation to a stored room under the room's write lock.
///
/// The room is saved only if the operation bumped its revision, so idempotent
/// operations (re-joining) cost no write.
pub struct RoomWriter {
    rooms: Arc<dyn RoomRepo>,
    locks: Arc<RoomLocks>,
    clock: Arc<dyn ClockPort>,
}

impl RoomWriter {
    pub fn new(rooms: Arc<dyn RoomRepo>, locks: Arc<RoomLocks>, clock: Arc<dyn ClockPort>) -> Self {
        Self {
            rooms,
            locks,
            clock,
        }
    }

    pub async fn update<T, F>(&self, room_id: RoomId, op: F) -> Result<(Room, T), RoomError>
    where
        F: FnOnce(&mut Room, DateTime<Utc>) -> Result<T, DomainError> + Send,
        T: Send,
    {
        let _guard = self.locks.lock(room_id).await;

        let mut room = self
            .rooms
            .get(room_id)
            .await?
            .ok_or(RoomError::RoomNotFound(room_id))?;
        let before = room.revision();

        let value = op(&mut room, self.clock.now()).map_err(|e| {
            tracing::debug!(room_id = %room_id, error = %e, "Room operation rejected");
            e
        })?;

        if room.revision() != before {
            self.rooms.save(&room).await?;
            tracing::debug!(room_id = %room_id, revision = room.revision(), "Room saved");
        }
        Ok((room, value))
    }
}
