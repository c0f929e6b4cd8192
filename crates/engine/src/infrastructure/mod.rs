//! Infrastructure implementations.
//!
//! Contains port trait implementations for storage, time, and randomness,
//! plus configuration loading.

pub mod clock;
pub mod config;
pub mod memory_store;
pub mod ports;
pub mod room_locks;
pub mod sqlite_store;
