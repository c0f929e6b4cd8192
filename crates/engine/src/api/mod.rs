//! API layer - HTTP entry points.

pub mod conversions;
pub mod error;
pub mod http;

pub use error::ApiError;
