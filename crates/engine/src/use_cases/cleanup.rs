//! Idle room cleanup.

use std::sync::Arc;

use chrono::Duration;

use crate::infrastructure::ports::{ClockPort, RepoError, RoomRepo};
use crate::infrastructure::room_locks::RoomLocks;

/// Delete rooms nobody has touched for longer than a TTL.
pub struct SweepIdleRooms {
    rooms: Arc<dyn RoomRepo>,
    locks: Arc<RoomLocks>,
    clock: Arc<dyn ClockPort>,
}

impl SweepIdleRooms {
    pub fn new(rooms: Arc<dyn RoomRepo>, locks: Arc<RoomLocks>, clock: Arc<dyn ClockPort>) -> Self {
        Self {
            rooms,
            locks,
            clock,
        }
    }

    /// Returns the number of rooms deleted.
    pub async fn execute(&self, ttl: Duration) -> Result<usize, RepoError> {
        let cutoff = self.clock.now() - ttl;
        let candidates = self.rooms.list_idle_since(cutoff).await?;

        let mut deleted = 0;
        for room_id in candidates {
            let guard = self.locks.lock(room_id).await;

            // A write may have landed between listing and locking.
            let still_idle = self
                .rooms
                .get(room_id)
                .await?
                .is_some_and(|room| room.is_idle_since(cutoff));
            let removed = still_idle && self.rooms.delete(room_id).await?;
            drop(guard);

            if removed {
                self.locks.forget(room_id);
                deleted += 1;
                tracing::info!(room_id = %room_id, "Deleted idle room");
            }
        }
        Ok(deleted)
    }
}
