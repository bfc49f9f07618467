//! The occupancy matrix: one agent's private belief about the grid.
//!
//! A matrix is created once at agent initialization with every cell
//! `Unknown` and lives as long as the agent. It is mutated in place by the
//! per-tick visibility sweep and by merges from peers' snapshots; it is
//! never replaced.
//!
//! Two bookkeeping fields ride along with the cells:
//!
//! - `undiscovered`: live count of cells still `Unknown`, decremented
//!   exactly once the first time a cell transitions away from `Unknown`.
//! - `exit_world`: world-frame location of the exit, cached the first time
//!   any cell is written with [`CellCode::Exit`].

use log::trace;
use serde::{Deserialize, Serialize};

use crate::core::{GridFrame, MatrixCoord, WorldPoint};
use crate::error::MapError;

use super::CellCode;

/// What a merge changed, reported back to the caller.
///
/// Behavior needs to react to merged knowledge - in particular a merge must
/// never silently discover the exit - so the matrix reports rather than
/// acts.
#[derive(Clone, Debug, Default)]
pub struct MergeOutcome {
    /// Number of cells adopted from the peer
    pub adopted: usize,
    /// True if one of the adopted cells carried the exit code
    pub exit_adopted: bool,
    /// World locations of adopted obstacle cells, for pathfinder blocking
    pub obstacles: Vec<WorldPoint>,
}

/// A rectangular grid of cell codes owned by exactly one agent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OccupancyMatrix {
    cells: Vec<u8>,
    frame: GridFrame,
    undiscovered: usize,
    exit_world: Option<WorldPoint>,
    /// Owning agent's display name, carried for dumps
    name: String,
}

impl OccupancyMatrix {
    /// Create a matrix with every cell `Unknown`
    pub fn new(width: i32, height: i32, name: impl Into<String>) -> Self {
        let frame = GridFrame::new(width, height);
        Self {
            cells: vec![CellCode::Unknown as u8; frame.cell_count()],
            undiscovered: frame.cell_count(),
            frame,
            exit_world: None,
            name: name.into(),
        }
    }

    /// The frame shared by this matrix (dimensions + conversions)
    #[inline]
    pub fn frame(&self) -> GridFrame {
        self.frame
    }

    /// Owning agent's display name
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cell code at a matrix coordinate, or `None` out of bounds
    #[inline]
    pub fn value(&self, coord: MatrixCoord) -> Option<CellCode> {
        self.frame.index(coord).map(|i| CellCode::from_u8(self.cells[i]))
    }

    /// Cell code at a world point, or `None` out of bounds
    #[inline]
    pub fn value_world(&self, point: WorldPoint) -> Option<CellCode> {
        self.value(self.frame.matrix_from_world(point))
    }

    /// Cell code `delta` rows away, out-of-bounds sentinel included
    #[inline]
    pub fn value_row_offset(&self, coord: MatrixCoord, delta: i32) -> Option<CellCode> {
        self.value(MatrixCoord::new(coord.row + delta, coord.col))
    }

    /// Cell code `delta` columns away, out-of-bounds sentinel included
    #[inline]
    pub fn value_col_offset(&self, coord: MatrixCoord, delta: i32) -> Option<CellCode> {
        self.value(MatrixCoord::new(coord.row, coord.col + delta))
    }

    /// Cell code offset on both axes, out-of-bounds sentinel included
    #[inline]
    pub fn value_offset(&self, coord: MatrixCoord, d_row: i32, d_col: i32) -> Option<CellCode> {
        self.value(MatrixCoord::new(coord.row + d_row, coord.col + d_col))
    }

    /// Write a cell code.
    ///
    /// The first write that moves a cell away from `Unknown` decrements the
    /// undiscovered count; writing `Exit` caches the exit location. Writes
    /// outside the grid are ignored.
    pub fn set_value(&mut self, coord: MatrixCoord, code: CellCode) {
        let Some(index) = self.frame.index(coord) else {
            return;
        };
        if self.cells[index] == CellCode::Unknown as u8 && code != CellCode::Unknown {
            self.undiscovered -= 1;
        }
        self.cells[index] = code as u8;
        if code == CellCode::Exit && self.exit_world.is_none() {
            self.exit_world = Some(self.frame.world_from_matrix(coord));
        }
    }

    /// Write a cell code addressed in the world frame
    #[inline]
    pub fn set_value_world(&mut self, point: WorldPoint, code: CellCode) {
        self.set_value(self.frame.matrix_from_world(point), code);
    }

    /// Are any cells still `Unknown`?
    #[inline]
    pub fn has_undiscovered_cells(&self) -> bool {
        self.undiscovered > 0
    }

    /// Number of cells still `Unknown`
    #[inline]
    pub fn undiscovered_count(&self) -> usize {
        self.undiscovered
    }

    /// Cached world location of the exit, if any write has carried it
    #[inline]
    pub fn exit(&self) -> Option<WorldPoint> {
        self.exit_world
    }

    /// Merge a peer's snapshot into this matrix.
    ///
    /// Adopts the peer's value for every cell the peer knows and we do not
    /// (union of non-zero knowledge). Cells we already know anything about
    /// are left untouched, even when the peer has a higher code for them.
    /// Idempotent, and commutative at the cell level.
    pub fn merge(&mut self, other: &OccupancyMatrix) -> Result<MergeOutcome, MapError> {
        if self.frame != other.frame {
            return Err(MapError::DimensionMismatch {
                ours: (self.frame.width(), self.frame.height()),
                theirs: (other.frame.width(), other.frame.height()),
            });
        }

        let mut outcome = MergeOutcome::default();
        for index in 0..self.cells.len() {
            let theirs = CellCode::from_u8(other.cells[index]);
            if !theirs.is_known() || self.cells[index] != CellCode::Unknown as u8 {
                continue;
            }
            let coord = self.frame.coord_of(index);
            self.set_value(coord, theirs);
            outcome.adopted += 1;
            match theirs {
                CellCode::Exit => outcome.exit_adopted = true,
                CellCode::Obstacle => {
                    outcome.obstacles.push(self.frame.world_from_matrix(coord));
                }
                _ => {}
            }
        }

        trace!(
            "{}: merged {} cells from {} (exit_adopted={})",
            self.name,
            outcome.adopted,
            other.name,
            outcome.exit_adopted
        );
        Ok(outcome)
    }

    /// World location of the Euclidean-nearest obstacle cell, if any.
    ///
    /// Linear scan; ties resolve to the first hit in row-major order.
    pub fn nearest_obstacle(&self, from: WorldPoint) -> Option<WorldPoint> {
        let mut nearest: Option<WorldPoint> = None;
        let mut best = i32::MAX;
        for index in 0..self.cells.len() {
            if self.cells[index] != CellCode::Obstacle as u8 {
                continue;
            }
            let candidate = self.frame.world_from_matrix(self.frame.coord_of(index));
            let d = from.distance_squared(&candidate);
            if d < best {
                best = d;
                nearest = Some(candidate);
            }
        }
        nearest
    }

    /// ASCII dump of the matrix for observability.
    ///
    /// Rows print top to bottom with their world-frame y label; columns are
    /// footed with their x index.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("Agent: {}\n", self.name));
        for row in 0..self.frame.height() {
            for col in 0..self.frame.width() {
                let code = self.value(MatrixCoord::new(row, col)).unwrap_or_default();
                out.push(code.as_char());
                out.push(' ');
            }
            out.push_str(&format!(" {}\n", self.frame.height() - 1 - row));
        }
        for col in 0..self.frame.width() {
            out.push_str(&format!("{} ", col % 10));
        }
        out.push('\n');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count_unknown(m: &OccupancyMatrix) -> usize {
        let mut n = 0;
        for row in 0..m.frame().height() {
            for col in 0..m.frame().width() {
                if m.value(MatrixCoord::new(row, col)) == Some(CellCode::Unknown) {
                    n += 1;
                }
            }
        }
        n
    }

    #[test]
    fn test_undiscovered_bookkeeping() {
        let mut m = OccupancyMatrix::new(4, 3, "t");
        assert_eq!(m.undiscovered_count(), 12);
        assert!(m.has_undiscovered_cells());

        m.set_value(MatrixCoord::new(0, 0), CellCode::Discovered);
        assert_eq!(m.undiscovered_count(), 11);

        // Re-writing a known cell must not decrement again.
        m.set_value(MatrixCoord::new(0, 0), CellCode::Obstacle);
        m.set_value(MatrixCoord::new(0, 0), CellCode::Discovered);
        assert_eq!(m.undiscovered_count(), 11);
        assert_eq!(m.undiscovered_count(), count_unknown(&m));

        // Out-of-bounds writes are ignored.
        m.set_value(MatrixCoord::new(-1, 0), CellCode::Discovered);
        m.set_value(MatrixCoord::new(0, 99), CellCode::Discovered);
        assert_eq!(m.undiscovered_count(), 11);
    }

    #[test]
    fn test_exit_cache() {
        let mut m = OccupancyMatrix::new(5, 5, "t");
        assert_eq!(m.exit(), None);
        m.set_value_world(WorldPoint::new(4, 4), CellCode::Exit);
        assert_eq!(m.exit(), Some(WorldPoint::new(4, 4)));
    }

    #[test]
    fn test_offset_queries() {
        let mut m = OccupancyMatrix::new(3, 3, "t");
        m.set_value(MatrixCoord::new(1, 2), CellCode::Obstacle);

        let c = MatrixCoord::new(1, 1);
        assert_eq!(m.value_col_offset(c, 1), Some(CellCode::Obstacle));
        assert_eq!(m.value_row_offset(c, 1), Some(CellCode::Unknown));
        assert_eq!(m.value_offset(c, -1, 1), Some(CellCode::Unknown));
        // Sentinel, not a panic, past the edge.
        assert_eq!(m.value_col_offset(c, 5), None);
        assert_eq!(m.value_row_offset(MatrixCoord::new(0, 0), -1), None);
    }

    #[test]
    fn test_merge_adopts_unknown_only() {
        let mut a = OccupancyMatrix::new(4, 4, "a");
        let mut b = OccupancyMatrix::new(4, 4, "b");

        a.set_value(MatrixCoord::new(0, 0), CellCode::Discovered);
        b.set_value(MatrixCoord::new(0, 0), CellCode::Obstacle);
        b.set_value(MatrixCoord::new(2, 2), CellCode::Exit);

        let outcome = a.merge(&b).unwrap();
        // (0,0) was already known locally; only the exit cell is adopted.
        assert_eq!(outcome.adopted, 1);
        assert!(outcome.exit_adopted);
        assert_eq!(a.value(MatrixCoord::new(0, 0)), Some(CellCode::Discovered));
        assert_eq!(a.value(MatrixCoord::new(2, 2)), Some(CellCode::Exit));
    }

    #[test]
    fn test_merge_idempotent() {
        let mut a = OccupancyMatrix::new(4, 4, "a");
        let mut b = OccupancyMatrix::new(4, 4, "b");
        b.set_value(MatrixCoord::new(1, 1), CellCode::Discovered);
        b.set_value(MatrixCoord::new(3, 0), CellCode::Obstacle);

        let first = a.merge(&b).unwrap();
        assert_eq!(first.adopted, 2);
        let snapshot = a.clone();

        let second = a.merge(&b).unwrap();
        assert_eq!(second.adopted, 0);
        assert_eq!(a, snapshot);
    }

    #[test]
    fn test_merge_commutative_cell_sets() {
        let mut a = OccupancyMatrix::new(3, 3, "a");
        let mut b = OccupancyMatrix::new(3, 3, "b");
        a.set_value(MatrixCoord::new(0, 1), CellCode::Discovered);
        a.set_value(MatrixCoord::new(2, 2), CellCode::Obstacle);
        b.set_value(MatrixCoord::new(1, 0), CellCode::Exit);
        b.set_value(MatrixCoord::new(2, 1), CellCode::Discovered);

        let mut ab = a.clone();
        ab.merge(&b).unwrap();
        let mut ba = b.clone();
        ba.merge(&a).unwrap();

        for row in 0..3 {
            for col in 0..3 {
                let c = MatrixCoord::new(row, col);
                assert_eq!(ab.value(c), ba.value(c), "cell {c} differs");
            }
        }
    }

    #[test]
    fn test_merge_never_upgrades_known_cells() {
        // Known asymmetry, preserved deliberately: a cell locally known as
        // Discovered never adopts a peer's Exit code for the same cell.
        let mut a = OccupancyMatrix::new(3, 3, "a");
        let mut b = OccupancyMatrix::new(3, 3, "b");
        a.set_value(MatrixCoord::new(1, 1), CellCode::Discovered);
        b.set_value(MatrixCoord::new(1, 1), CellCode::Exit);

        let outcome = a.merge(&b).unwrap();
        assert_eq!(outcome.adopted, 0);
        assert!(!outcome.exit_adopted);
        assert_eq!(a.value(MatrixCoord::new(1, 1)), Some(CellCode::Discovered));
        assert_eq!(a.exit(), None);
    }

    #[test]
    fn test_merge_dimension_mismatch() {
        let mut a = OccupancyMatrix::new(3, 3, "a");
        let b = OccupancyMatrix::new(4, 3, "b");
        assert!(a.merge(&b).is_err());
    }

    #[test]
    fn test_nearest_obstacle() {
        let mut m = OccupancyMatrix::new(10, 10, "t");
        assert_eq!(m.nearest_obstacle(WorldPoint::new(0, 0)), None);

        m.set_value_world(WorldPoint::new(8, 8), CellCode::Obstacle);
        m.set_value_world(WorldPoint::new(2, 1), CellCode::Obstacle);
        assert_eq!(
            m.nearest_obstacle(WorldPoint::new(0, 0)),
            Some(WorldPoint::new(2, 1))
        );
        assert_eq!(
            m.nearest_obstacle(WorldPoint::new(9, 9)),
            Some(WorldPoint::new(8, 8))
        );
    }

    #[test]
    fn test_render_shape() {
        let mut m = OccupancyMatrix::new(3, 2, "probe");
        m.set_value_world(WorldPoint::new(0, 0), CellCode::Discovered);
        m.set_value_world(WorldPoint::new(2, 1), CellCode::Exit);
        let dump = m.render();
        assert!(dump.contains("probe"));
        // World y=1 is the top row; the exit sits in its last column.
        assert!(dump.contains("? ? X  1"));
        assert!(dump.contains(". ? ?  0"));
    }
}
