//! Ports - boundaries between client logic and the outside world.

pub mod outbound;
