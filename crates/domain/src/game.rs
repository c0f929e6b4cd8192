//! Board movement and PAYDAY detection.
//!
//! The board is a ring of [`BOARD_CELLS`] cells. Landing on or passing a
//! PAYDAY cell pays the player one month of income.

use serde::{Deserialize, Serialize};

/// Number of cells on the ring.
pub const BOARD_CELLS: usize = 24;

/// Faces on the single die rolled each turn.
pub const DIE_FACES: u8 = 6;

/// Cells that trigger a PAYDAY when crossed or landed on.
pub const PAYDAY_CELLS: [usize; 4] = [0, 6, 12, 18];

/// What happened on one roll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollOutcome {
    pub player_index: usize,
    pub dice: u8,
    pub from: usize,
    pub to: usize,
    pub paydays: u32,
}

/// Destination cell after moving `steps` from `from`.
pub fn advance(from: usize, steps: usize) -> usize {
    (from + steps) % BOARD_CELLS
}

/// Count PAYDAY cells visited by moving `steps` cells forward from `from`.
///
/// The starting cell is not counted; the destination is.
pub fn paydays_crossed(from: usize, steps: usize) -> u32 {
    (1..=steps)
        .map(|step| advance(from, step))
        .filter(|cell| PAYDAY_CELLS.contains(cell))
        .count() as u32
}

/// Clamp an injected roll into `1..=DIE_FACES`.
pub fn normalize_die(raw: u8) -> u8 {
    raw.clamp(1, DIE_FACES)
}
