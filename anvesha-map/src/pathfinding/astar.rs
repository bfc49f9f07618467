//! A* search over a [`NodeGrid`].
//!
//! Standard A* with 8-connected movement and an octile heuristic. The
//! open set orders by total cost, then by insertion sequence - two equally
//! cheap frontiers always expand in the order they were pushed, so a
//! given grid and query yield one reproducible path.

use log::{debug, trace};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::core::WorldPoint;

use super::NodeGrid;

/// Why a path query failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PathFailure {
    /// Source or target outside the grid
    OutOfBounds,
    /// Target cell is not walkable
    TargetBlocked,
    /// No route exists through the known grid
    NoRoute,
    /// Maximum node expansions reached before the target
    MaxExpansionsExceeded,
}

/// Result of a path query.
///
/// `cells` runs from the cell after the source up to and including the
/// target; a failed query carries an empty path and a reason, never a
/// panic. The caller consumes one cell per tick.
#[derive(Clone, Debug)]
pub struct PathResult {
    /// Path cells, source exclusive, target inclusive
    pub cells: Vec<WorldPoint>,
    /// Total movement cost of the path
    pub cost: f32,
    /// Nodes expanded during the search
    pub expanded: usize,
    /// Failure reason, `None` on success
    pub failure: Option<PathFailure>,
}

impl PathResult {
    fn failed(failure: PathFailure, expanded: usize) -> Self {
        Self {
            cells: Vec::new(),
            cost: f32::INFINITY,
            expanded,
            failure: Some(failure),
        }
    }

    /// Did the query produce a path?
    #[inline]
    pub fn success(&self) -> bool {
        self.failure.is_none()
    }
}

struct OpenNode {
    total: f32,
    seq: u64,
    cell: WorldPoint,
    cost: f32,
}

impl PartialEq for OpenNode {
    fn eq(&self, other: &Self) -> bool {
        self.total == other.total && self.seq == other.seq
    }
}

impl Eq for OpenNode {}

impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so the BinaryHeap pops the cheapest total first; equal
        // totals pop in insertion order.
        other
            .total
            .partial_cmp(&self.total)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A* planner.
#[derive(Clone, Debug)]
pub struct AStarPlanner {
    /// Cost of a diagonal step
    pub diagonal_cost: f32,
    /// Maximum nodes to expand before giving up
    pub max_expansions: usize,
}

impl Default for AStarPlanner {
    fn default() -> Self {
        Self {
            diagonal_cost: std::f32::consts::SQRT_2,
            max_expansions: 100_000,
        }
    }
}

impl AStarPlanner {
    /// Find a path from `source` to `target` over the grid's current
    /// walkability.
    ///
    /// The source cell itself is never tested for walkability - the agent
    /// is already standing there.
    pub fn find_path(&self, grid: &NodeGrid, source: WorldPoint, target: WorldPoint) -> PathResult {
        let width = grid.width();
        let height = grid.height();
        let in_bounds = |p: WorldPoint| p.x >= 0 && p.x < width && p.y >= 0 && p.y < height;
        if !in_bounds(source) || !in_bounds(target) {
            debug!("astar: out of bounds ({} -> {})", source, target);
            return PathResult::failed(PathFailure::OutOfBounds, 0);
        }
        if !grid.is_walkable(target) {
            debug!("astar: target blocked at {}", target);
            return PathResult::failed(PathFailure::TargetBlocked, 0);
        }
        if source == target {
            return PathResult {
                cells: Vec::new(),
                cost: 0.0,
                expanded: 0,
                failure: None,
            };
        }

        let size = (width * height) as usize;
        let index = |p: WorldPoint| (p.y * width + p.x) as usize;

        let mut best_cost = vec![f32::INFINITY; size];
        let mut came_from: Vec<Option<usize>> = vec![None; size];
        let mut closed = vec![false; size];

        let mut open = BinaryHeap::new();
        let mut seq: u64 = 0;

        best_cost[index(source)] = 0.0;
        open.push(OpenNode {
            total: self.heuristic(source, target),
            seq,
            cell: source,
            cost: 0.0,
        });
        seq += 1;

        let mut expanded = 0;
        while let Some(node) = open.pop() {
            let node_idx = index(node.cell);
            if closed[node_idx] {
                continue;
            }
            closed[node_idx] = true;
            expanded += 1;

            if expanded > self.max_expansions {
                debug!("astar: gave up after {} expansions", expanded);
                return PathResult::failed(PathFailure::MaxExpansionsExceeded, expanded);
            }

            if node.cell == target {
                let cells = self.reconstruct(&came_from, node_idx, width);
                trace!(
                    "astar: {} -> {} in {} cells ({} expanded)",
                    source,
                    target,
                    cells.len(),
                    expanded
                );
                return PathResult {
                    cells,
                    cost: node.cost,
                    expanded,
                    failure: None,
                };
            }

            for (i, neighbor) in node.cell.neighbors_8().into_iter().enumerate() {
                if !grid.is_walkable(neighbor) {
                    continue;
                }
                let neighbor_idx = index(neighbor);
                if closed[neighbor_idx] {
                    continue;
                }

                // Odd indices in neighbors_8 are the diagonals.
                let step = if i % 2 == 1 { self.diagonal_cost } else { 1.0 };
                let cost = node.cost + step;
                if cost >= best_cost[neighbor_idx] {
                    continue;
                }

                best_cost[neighbor_idx] = cost;
                came_from[neighbor_idx] = Some(node_idx);
                open.push(OpenNode {
                    total: cost + self.heuristic(neighbor, target),
                    seq,
                    cell: neighbor,
                    cost,
                });
                seq += 1;
            }
        }

        debug!(
            "astar: no route {} -> {} ({} expanded)",
            source, target, expanded
        );
        PathResult::failed(PathFailure::NoRoute, expanded)
    }

    /// Octile distance - admissible for 8-connected movement
    fn heuristic(&self, from: WorldPoint, to: WorldPoint) -> f32 {
        let dx = (from.x - to.x).abs() as f32;
        let dy = (from.y - to.y).abs() as f32;
        let min = dx.min(dy);
        let max = dx.max(dy);
        min * self.diagonal_cost + (max - min)
    }

    /// Walk the parent chain back from the target, dropping the source.
    fn reconstruct(&self, came_from: &[Option<usize>], target_idx: usize, width: i32) -> Vec<WorldPoint> {
        let mut cells = Vec::new();
        let mut current = target_idx;
        while let Some(prev) = came_from[current] {
            let idx = current as i32;
            cells.push(WorldPoint::new(idx % width, idx / width));
            current = prev;
        }
        cells.reverse();
        cells
    }
}
