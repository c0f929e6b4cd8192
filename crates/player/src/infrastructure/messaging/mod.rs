//! In-process messaging between state objects and their observers.

pub mod event_bus;

pub use event_bus::EventBus;
