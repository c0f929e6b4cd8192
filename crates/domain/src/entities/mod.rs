//! Entities owned by a room.

mod bank;
mod player;
mod user;

pub use bank::{BankAccount, Transfer};
pub use player::Player;
pub use user::User;
