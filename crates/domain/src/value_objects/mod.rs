//! Validated value objects.

mod catalog;
mod names;
mod rules;

pub use catalog::Catalog;
pub use names::{PlayerName, RoomName};
pub use rules::GameRules;
