//! A* pathfinding over the agent's known grid.

mod astar;
mod node_grid;

pub use astar::{AStarPlanner, PathFailure, PathResult};
pub use node_grid::NodeGrid;
