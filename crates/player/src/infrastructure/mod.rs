//! Infrastructure adapters for the player client.

pub mod http_client;
pub mod messaging;
pub mod storage;

#[cfg(test)]
pub(crate) mod testing;
