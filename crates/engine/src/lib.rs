//! Energy of Money Engine library.
//!
//! This crate contains all server-side code for the room and bank service.
//!
//! ## Structure
//!
//! - `use_cases/` - User story orchestration over the `Room` aggregate
//! - `infrastructure/` - External dependency implementations (ports + adapters)
//! - `api/` - HTTP entry points
//! - `app` - Application composition
//! - `run` - Server startup, background workers, and shutdown

pub mod api;
pub mod app;
pub mod infrastructure;
pub mod run;
pub mod use_cases;

pub use app::App;
