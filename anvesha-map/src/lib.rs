//! # Anvesha-Map: Shared-Map Primitives for Cooperative Exploration
//!
//! The map/geometry layer of the Anvesha exploration engine. Each agent in
//! the swarm owns one [`OccupancyMatrix`] — its private belief about which
//! grid cells are unknown, open, obstacle, or exit — and keeps it current
//! with a per-tick visibility sweep. Matrices are exchanged between agents
//! and merged; pathfinding and frontier search run against the owner's
//! belief, never against ground truth.
//!
//! ## Coordinate Frames
//!
//! Two integer frames are in play everywhere:
//!
//! - **World frame** ([`WorldPoint`]): the host's placement frame, y grows
//!   upward.
//! - **Matrix frame** ([`MatrixCoord`]): row/column addressing, row 0 at the
//!   top.
//!
//! A single [`GridFrame`] owns the conversion (`row = height - 1 - y`,
//! `col = x`); components convert at their boundaries and never hand-roll
//! the transform.
//!
//! ## Modules
//!
//! - [`core`]: coordinate types and the frame transform
//! - [`matrix`]: the occupancy matrix and its merge protocol
//! - [`visibility`]: Bresenham ray tracing and the per-tick vision sweep
//! - [`search`]: nearest-undiscovered frontier search
//! - [`pathfinding`]: A* over a mutable per-agent node grid
//!
//! ## Data Flow
//!
//! ```text
//!   host occupants ──▶ visibility sweep ──▶ OccupancyMatrix ◀── merge ◀── peers
//!                            │                    │
//!                            ▼                    ▼
//!                       NodeGrid blocks     frontier search
//!                            │                    │
//!                            └────▶ A* planner ◀──┘
//! ```

pub mod core;
pub mod error;
pub mod matrix;
pub mod pathfinding;
pub mod search;
pub mod visibility;

pub use crate::core::{GridFrame, MatrixCoord, WorldPoint};
pub use crate::error::MapError;
pub use crate::matrix::{CellCode, MergeOutcome, OccupancyMatrix};
pub use crate::pathfinding::{AStarPlanner, NodeGrid, PathFailure, PathResult};
pub use crate::search::nearest_undiscovered;
pub use crate::visibility::{
    trace_ray, BresenhamLine, Occupant, SweepReport, TraceOutcome, WorldSensor,
};
