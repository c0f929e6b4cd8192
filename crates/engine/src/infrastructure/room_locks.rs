//! Per-room write locks.
//!
//! Every room mutation is a load-modify-save cycle. Holding the room's lock for
//! the whole cycle keeps two concurrent writers from overwriting each other.
//! Reads never take a lock.

use std::sync::Arc;

use dashmap::DashMap;
use eom_domain::RoomId;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Default)]
pub struct RoomLocks {
    locks: DashMap<RoomId, Arc<Mutex<()>>>,
}

impl RoomLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive write access to `room_id`.
    pub async fn lock(&self, room_id: RoomId) -> OwnedMutexGuard<()> {
        // Clone the Arc out so the shard guard is released before awaiting.
        let mutex = self.locks.entry(room_id).or_default().clone();
        mutex.lock_owned().await
    }

    /// Drop the lock entry of a deleted room.
    ///
    /// The entry stays while any writer holds or waits on it, otherwise a
    /// later writer would get a fresh mutex and run alongside it.
    pub fn forget(&self, room_id: RoomId) {
        self.locks
            .remove_if(&room_id, |_, mutex| Arc::strong_count(mutex) == 1);
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
