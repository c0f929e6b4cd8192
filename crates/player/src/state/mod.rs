//! Client-side state kept in sync with the engine by polling.
//!
//! `RoomState` mirrors one room, `BankCore` mirrors the local player's bank
//! account, and `StateManager` caches both sessions in local storage.

mod bank_core;
mod error;
mod polling;
pub mod reconcile;
mod room_state;
mod state_manager;

pub use bank_core::{BankCore, BankEvent, BankState};
pub use error::SyncError;
pub use polling::{RefreshOutcome, SyncConfig};
pub use room_state::{RoomEvent, RoomState};
pub use state_manager::{StateManager, UserIdentity, SESSION_MAX_AGE};
