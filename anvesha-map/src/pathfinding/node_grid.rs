//! Per-agent walkability grid for the pathfinder.
//!
//! Two independent layers of blocking:
//!
//! - **Permanent**: a cell is unwalkable once the agent knows it holds a
//!   static obstacle. Cleared only when an obstacle is destroyed.
//! - **Transient**: a cell occupied by another agent this tick. Other
//!   agents are moving obstacles, never permanently blocking - transient
//!   marks are applied before state execution and cleared at the end of
//!   the same tick.
//!
//! Each agent maintains its own grid; there is no shared walkability
//! state between agents.

use crate::core::WorldPoint;

/// Walkability flags for every cell, addressed in the world frame.
#[derive(Clone, Debug)]
pub struct NodeGrid {
    width: i32,
    height: i32,
    blocked: Vec<bool>,
    transient: Vec<bool>,
}

impl NodeGrid {
    /// Create a grid with every cell walkable
    pub fn new(width: i32, height: i32) -> Self {
        assert!(width > 0 && height > 0, "grid must be non-empty");
        let size = (width * height) as usize;
        Self {
            width,
            height,
            blocked: vec![false; size],
            transient: vec![false; size],
        }
    }

    /// Grid width in cells
    #[inline]
    pub fn width(&self) -> i32 {
        self.width
    }

    /// Grid height in cells
    #[inline]
    pub fn height(&self) -> i32 {
        self.height
    }

    #[inline]
    fn index(&self, cell: WorldPoint) -> Option<usize> {
        if cell.x >= 0 && cell.x < self.width && cell.y >= 0 && cell.y < self.height {
            Some((cell.y * self.width + cell.x) as usize)
        } else {
            None
        }
    }

    /// Set or clear the permanent obstacle flag. Out-of-bounds is ignored.
    pub fn set_blocked(&mut self, cell: WorldPoint, blocked: bool) {
        if let Some(idx) = self.index(cell) {
            self.blocked[idx] = blocked;
        }
    }

    /// Is the cell permanently blocked?
    #[inline]
    pub fn is_blocked(&self, cell: WorldPoint) -> bool {
        self.index(cell).map(|i| self.blocked[i]).unwrap_or(true)
    }

    /// Mark a cell transiently unwalkable for the current tick
    pub fn set_transient(&mut self, cell: WorldPoint) {
        if let Some(idx) = self.index(cell) {
            self.transient[idx] = true;
        }
    }

    /// Is the cell carrying a transient mark?
    #[inline]
    pub fn is_transient(&self, cell: WorldPoint) -> bool {
        self.index(cell).map(|i| self.transient[i]).unwrap_or(false)
    }

    /// Drop every transient mark. Runs at the end of each tick.
    pub fn clear_transients(&mut self) {
        self.transient.fill(false);
    }

    /// Can the pathfinder route through this cell right now?
    ///
    /// Out of bounds counts as unwalkable.
    #[inline]
    pub fn is_walkable(&self, cell: WorldPoint) -> bool {
        match self.index(cell) {
            Some(idx) => !self.blocked[idx] && !self.transient[idx],
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocking_layers_are_independent() {
        let mut grid = NodeGrid::new(5, 5);
        let cell = WorldPoint::new(2, 2);
        assert!(grid.is_walkable(cell));

        grid.set_transient(cell);
        assert!(!grid.is_walkable(cell));
        assert!(!grid.is_blocked(cell));

        grid.clear_transients();
        assert!(grid.is_walkable(cell));

        grid.set_blocked(cell, true);
        grid.clear_transients();
        assert!(!grid.is_walkable(cell));

        grid.set_blocked(cell, false);
        assert!(grid.is_walkable(cell));
    }

    #[test]
    fn test_clear_transients_spares_obstacles() {
        let mut grid = NodeGrid::new(4, 4);
        grid.set_blocked(WorldPoint::new(1, 1), true);
        grid.set_transient(WorldPoint::new(2, 2));
        grid.set_transient(WorldPoint::new(1, 1));

        grid.clear_transients();

        assert!(!grid.is_walkable(WorldPoint::new(1, 1)));
        assert!(grid.is_walkable(WorldPoint::new(2, 2)));
        // No cell anywhere keeps a transient mark.
        for x in 0..4 {
            for y in 0..4 {
                assert!(!grid.is_transient(WorldPoint::new(x, y)));
            }
        }
    }

    #[test]
    fn test_out_of_bounds() {
        let grid = NodeGrid::new(3, 3);
        assert!(!grid.is_walkable(WorldPoint::new(-1, 0)));
        assert!(!grid.is_walkable(WorldPoint::new(0, 3)));
        assert!(grid.is_blocked(WorldPoint::new(99, 99)));
    }
}
