//! Frontier search over the occupancy matrix.

mod frontier;

pub use frontier::nearest_undiscovered;
