//! Response bodies that are not snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::snapshots::RoomSnapshot;

/// JSON body of every non-2xx response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

/// Result of a dice roll together with the room after the move.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollResponse {
    pub player_index: usize,
    pub dice: u8,
    pub from: usize,
    pub to: usize,
    pub paydays: u32,
    pub room: RoomSnapshot,
}
