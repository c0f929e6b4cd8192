//! Use cases - User story orchestration.
//!
//! Each module covers one area of the game. Handlers parse input, call a use
//! case, and convert the result; rule checks live in the domain.

pub mod bank;
pub mod cleanup;
pub mod game;
pub mod lobby;
pub mod room_writer;
pub mod users;

pub use bank::{BankOps, PlayerAccount};
pub use cleanup::SweepIdleRooms;
pub use game::RollDice;
pub use lobby::RoomLobby;
pub use room_writer::RoomWriter;
pub use users::{UserError, UserManagement};

use eom_domain::{DomainError, RoomId};

use crate::infrastructure::ports::RepoError;

/// Shared error type for room, game, and bank use cases.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    #[error("Room not found: {0}")]
    RoomNotFound(RoomId),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
}
