//! Server startup and background workers.

mod server;
mod workers;

pub use server::{build_router, open_store, run};
pub use workers::room_sweeper;
