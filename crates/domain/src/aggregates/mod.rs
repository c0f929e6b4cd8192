//! Aggregate roots.

pub mod room;

pub use room::{Room, RoomParts};
