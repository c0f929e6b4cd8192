//! Repository port traits for room and user storage.
//!
//! Both store backends implement the same contract, so the use cases never
//! know which one the engine was composed with.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use eom_domain::{Room, RoomId, User, UserId};

use super::error::RepoError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RoomRepo: Send + Sync {
    async fn get(&self, id: RoomId) -> Result<Option<Room>, RepoError>;
    async fn list(&self) -> Result<Vec<Room>, RepoError>;

    /// Upsert the room with its players and transfer log as one atomic write.
    async fn save(&self, room: &Room) -> Result<(), RepoError>;

    /// Returns `true` if a room was removed.
    async fn delete(&self, id: RoomId) -> Result<bool, RepoError>;

    /// Rooms whose last update happened before `cutoff`.
    async fn list_idle_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<RoomId>, RepoError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn get(&self, id: &UserId) -> Result<Option<User>, RepoError>;

    /// Case-insensitive lookup.
    async fn get_by_username(&self, username: &str) -> Result<Option<User>, RepoError>;
    async fn save(&self, user: &User) -> Result<(), RepoError>;
}
