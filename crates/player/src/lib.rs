//! Energy of Money player client.
//!
//! REST wrappers over the engine API, plus the two state objects a client
//! keeps in sync with it: [`state::RoomState`] for the lobby and board, and
//! [`state::BankCore`] for the player's own account.

pub mod application;
pub mod config;
pub mod infrastructure;
pub mod ports;
pub mod state;
