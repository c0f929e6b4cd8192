//! Common utility functions shared by the engine and the player.
//!
//! Pure functions only: no I/O, no clocks.

pub mod datetime;
pub mod text;

pub use datetime::parse_datetime;
pub use text::{none_if_blank, split_list};
