//! Session cache in local storage.
//!
//! Room and game state are wrapped as `{savedAt, data}` and only trusted for
//! [`SESSION_MAX_AGE`]; older entries are dropped on read.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use eom_shared::{RoomSnapshot, UserResponse};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::ports::outbound::{storage_keys, StorageProvider};

/// How long a saved room or game state stays valid.
pub const SESSION_MAX_AGE: Duration = Duration::hours(24);

/// Who this client plays as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIdentity {
    pub id: String,
    pub username: String,
}

impl From<UserResponse> for UserIdentity {
    fn from(user: UserResponse) -> Self {
        Self {
            id: user.id,
            username: user.username,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Saved<T> {
    saved_at: DateTime<Utc>,
    data: T,
}

#[derive(Clone)]
pub struct StateManager {
    storage: Arc<dyn StorageProvider>,
}

impl StateManager {
    pub fn new(storage: Arc<dyn StorageProvider>) -> Self {
        Self { storage }
    }

    fn save_fresh<T: Serialize>(&self, key: &str, data: &T, now: DateTime<Utc>) {
        let saved = Saved {
            saved_at: now,
            data,
        };
        match serde_json::to_string(&saved) {
            Ok(json) => self.storage.save(key, &json),
            Err(e) => tracing::warn!(key, error = %e, "Failed to serialize saved state"),
        }
    }

    fn load_fresh<T: DeserializeOwned>(&self, key: &str, now: DateTime<Utc>) -> Option<T> {
        let raw = self.storage.load(key)?;
        match serde_json::from_str::<Saved<T>>(&raw) {
            Ok(saved) if now - saved.saved_at < SESSION_MAX_AGE => Some(saved.data),
            Ok(_) => {
                tracing::debug!(key, "Saved state expired");
                None
            }
            Err(e) => {
                tracing::warn!(key, error = %e, "Discarding unreadable saved state");
                None
            }
        }
    }

    // =========================================================================
    // Room
    // =========================================================================

    pub fn save_room(&self, room: &RoomSnapshot) {
        self.save_room_at(room, Utc::now());
    }

    pub fn save_room_at(&self, room: &RoomSnapshot, now: DateTime<Utc>) {
        self.storage
            .save(storage_keys::CURRENT_ROOM_ID, &room.id.to_string());
        self.save_fresh(storage_keys::CURRENT_ROOM, room, now);
    }

    pub fn load_room(&self) -> Option<RoomSnapshot> {
        self.load_room_at(Utc::now())
    }

    /// The saved room, if it was saved less than 24 h before `now`.
    /// Expired or unreadable entries are removed.
    pub fn load_room_at(&self, now: DateTime<Utc>) -> Option<RoomSnapshot> {
        let room = self.load_fresh(storage_keys::CURRENT_ROOM, now);
        if room.is_none() {
            self.clear_room();
        }
        room
    }

    pub fn current_room_id(&self) -> Option<String> {
        self.storage.load(storage_keys::CURRENT_ROOM_ID)
    }

    pub fn clear_room(&self) {
        self.storage.remove(storage_keys::CURRENT_ROOM_ID);
        self.storage.remove(storage_keys::CURRENT_ROOM);
    }

    // =========================================================================
    // Game state
    // =========================================================================

    pub fn save_game_state<T: Serialize>(&self, state: &T) {
        self.save_fresh(storage_keys::GAME_STATE, state, Utc::now());
    }

    pub fn load_game_state<T: DeserializeOwned>(&self) -> Option<T> {
        let state = self.load_fresh(storage_keys::GAME_STATE, Utc::now());
        if state.is_none() {
            self.storage.remove(storage_keys::GAME_STATE);
        }
        state
    }

    // =========================================================================
    // User
    // =========================================================================

    pub fn save_user(&self, user: &UserIdentity) {
        match serde_json::to_string(user) {
            Ok(json) => {
                self.storage.save(storage_keys::USER, &json);
                self.storage.save(storage_keys::USER_ID, &user.id);
            }
            Err(e) => tracing::warn!(error = %e, "Failed to serialize user"),
        }
    }

    pub fn load_user(&self) -> Option<UserIdentity> {
        let raw = self.storage.load(storage_keys::USER)?;
        serde_json::from_str(&raw)
            .map_err(|e| tracing::warn!(error = %e, "Discarding unreadable user"))
            .ok()
    }

    pub fn clear_user(&self) {
        self.storage.remove(storage_keys::USER);
        self.storage.remove(storage_keys::USER_ID);
    }
}
