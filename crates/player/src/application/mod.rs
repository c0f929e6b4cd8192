//! Application layer - typed access to the engine's REST API.

pub mod api;

pub use api::{BankApi, RoomApi, UserApi};
