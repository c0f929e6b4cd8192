//! Outbound ports - Interfaces for external services
//!
//! These ports define the contracts that infrastructure adapters must implement,
//! allowing application services and state objects to talk to the engine and
//! to local storage without depending on concrete implementations.

pub mod raw_api_port;
pub mod storage;

pub use raw_api_port::{ApiError, RawApiPort};
pub use storage::{storage_keys, StorageProvider};

#[cfg(test)]
pub use raw_api_port::MockRawApiPort;
