extern crate self as eom_domain;

pub mod aggregates;
pub mod common;
pub mod entities;
pub mod error;
pub mod game;
pub mod ids;
pub mod value_objects;

pub use aggregates::{Room, RoomParts};
pub use entities::{BankAccount, Player, Transfer, User};
pub use error::DomainError;
pub use game::{RollOutcome, BOARD_CELLS, DIE_FACES, PAYDAY_CELLS};
pub use ids::{RoomId, TransferId, UserId};
pub use value_objects::{Catalog, GameRules, PlayerName, RoomName};
