//! Per-agent occupancy knowledge and the map-merge protocol.

mod cell;
mod grid;

pub use cell::CellCode;
pub use grid::{MergeOutcome, OccupancyMatrix};
