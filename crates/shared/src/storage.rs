//! Keys clients use in local storage.
//!
//! The browser client and the native client share these names so a saved
//! session is readable by either.

pub const CURRENT_ROOM_ID: &str = "currentRoomId";
pub const CURRENT_ROOM: &str = "currentRoom";
pub const GAME_STATE: &str = "gameState";
pub const USER: &str = "user";
pub const USER_ID: &str = "user_id";
