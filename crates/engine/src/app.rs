//! Application state and composition.

use std::sync::Arc;

use eom_domain::{Catalog, GameRules};

use crate::infrastructure::ports::{ClockPort, RandomPort, RoomRepo, UserRepo};
use crate::infrastructure::room_locks::RoomLocks;
use crate::use_cases::{BankOps, RollDice, RoomLobby, RoomWriter, SweepIdleRooms, UserManagement};

/// Main application state.
///
/// Passed to HTTP handlers via Axum state.
pub struct App {
    pub use_cases: UseCases,
}

/// Container for all use cases.
pub struct UseCases {
    pub lobby: RoomLobby,
    pub bank: BankOps,
    pub roll: RollDice,
    pub users: UserManagement,
    pub sweep: SweepIdleRooms,
}

impl App {
    pub fn new(
        rooms: Arc<dyn RoomRepo>,
        users: Arc<dyn UserRepo>,
        clock: Arc<dyn ClockPort>,
        random: Arc<dyn RandomPort>,
        catalog: Catalog,
        rules: GameRules,
    ) -> Self {
        // One lock table shared by every writer and the sweeper.
        let locks = Arc::new(RoomLocks::new());
        let writer = Arc::new(RoomWriter::new(rooms.clone(), locks.clone(), clock.clone()));

        let use_cases = UseCases {
            lobby: RoomLobby::new(rooms.clone(), writer.clone(), clock.clone(), catalog, rules),
            bank: BankOps::new(rooms.clone(), writer.clone()),
            roll: RollDice::new(writer, random),
            users: UserManagement::new(users, clock.clone()),
            sweep: SweepIdleRooms::new(rooms, locks, clock),
        };

        Self { use_cases }
    }
}
