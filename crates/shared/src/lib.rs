//! Energy of Money Protocol - shared types for Engine and Player communication
//!
//! This crate contains every type that crosses the HTTP boundary:
//! - Room and bank snapshots returned on each poll
//! - Request bodies for lobby, game, and bank actions
//! - The JSON error body
//! - Local storage key names used by clients
//!
//! # Design Principles
//!
//! 1. **Minimal dependencies** - only serde, serde_json, uuid, and chrono
//! 2. **No business logic** - pure data types and serialization
//! 3. **No domain IDs** - raw `uuid::Uuid` and `String` in DTOs
//! 4. **camelCase on the wire** - matches the browser client

pub mod requests;
pub mod responses;
pub mod snapshots;
pub mod storage;

pub use requests::{
    BankCreditRequest, BankTransferRequest, CreateRoomRequest, CreditRequest, JoinRoomRequest,
    ReadyRequest, RegisterUserRequest, SelectDreamRequest, SelectTokenRequest, TransferRequest,
    UserActionRequest,
};
pub use responses::{ErrorBody, RollResponse, UserResponse};
pub use snapshots::{BankSnapshot, PlayerSnapshot, RoomSnapshot, RoomSummary, TransferRecord};
