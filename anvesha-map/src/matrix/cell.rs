//! Cell codes for the occupancy matrix.
//!
//! Codes form a knowledge ladder: once a cell leaves `Unknown` it stays
//! known, and a higher code always represents more specific knowledge than
//! a lower one (Exit > Obstacle > Explorer > Discovered).

use serde::{Deserialize, Serialize};

/// What an agent believes about a grid cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum CellCode {
    /// Never observed, directly or through a merge
    #[default]
    Unknown = 0,

    /// Seen and open - an agent can stand here
    Discovered = 1,

    /// Another explorer was present when the cell was last seen.
    /// Carries no more terrain knowledge than `Discovered`; merges treat
    /// the two identically.
    Explorer = 2,

    /// A static obstacle fills the cell
    Obstacle = 3,

    /// The exit. Highest code - nothing overwrites knowledge of the exit.
    Exit = 4,
}

impl CellCode {
    /// Convert from the raw stored byte
    #[inline]
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => CellCode::Discovered,
            2 => CellCode::Explorer,
            3 => CellCode::Obstacle,
            4 => CellCode::Exit,
            _ => CellCode::Unknown,
        }
    }

    /// Has the cell been observed?
    #[inline]
    pub fn is_known(self) -> bool {
        self != CellCode::Unknown
    }

    /// Is the cell believed to hold a static obstacle?
    #[inline]
    pub fn is_obstacle(self) -> bool {
        self == CellCode::Obstacle
    }

    /// Single character representation for matrix dumps
    pub fn as_char(self) -> char {
        match self {
            CellCode::Unknown => '?',
            CellCode::Discovered => '.',
            CellCode::Explorer => 'e',
            CellCode::Obstacle => '#',
            CellCode::Exit => 'X',
        }
    }
}
