//! The canonical world/matrix frame transform.
//!
//! Every component that crosses a frame boundary converts through
//! [`GridFrame`]; the flip constant lives here and nowhere else.

use serde::{Deserialize, Serialize};

use super::{MatrixCoord, WorldPoint};

/// Dimensions of the grid plus the affine transform between frames.
///
/// The transform is a vertical flip:
///
/// ```text
/// row = height - 1 - y        y = height - 1 - row
/// col = x                     x = col
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridFrame {
    width: i32,
    height: i32,
}

impl GridFrame {
    /// Create a frame for a `width x height` grid
    pub fn new(width: i32, height: i32) -> Self {
        assert!(width > 0 && height > 0, "grid must be non-empty");
        Self { width, height }
    }

    /// Grid width in cells (number of columns)
    #[inline]
    pub fn width(&self) -> i32 {
        self.width
    }

    /// Grid height in cells (number of rows)
    #[inline]
    pub fn height(&self) -> i32 {
        self.height
    }

    /// Total number of cells
    #[inline]
    pub fn cell_count(&self) -> usize {
        (self.width * self.height) as usize
    }

    /// Is the world point inside the grid?
    #[inline]
    pub fn contains_world(&self, p: WorldPoint) -> bool {
        p.x >= 0 && p.x < self.width && p.y >= 0 && p.y < self.height
    }

    /// Is the matrix coordinate inside the grid?
    #[inline]
    pub fn contains_matrix(&self, c: MatrixCoord) -> bool {
        c.row >= 0 && c.row < self.height && c.col >= 0 && c.col < self.width
    }

    /// Convert world coordinates to matrix coordinates
    #[inline]
    pub fn matrix_from_world(&self, p: WorldPoint) -> MatrixCoord {
        MatrixCoord::new(self.height - 1 - p.y, p.x)
    }

    /// Convert matrix coordinates to world coordinates
    #[inline]
    pub fn world_from_matrix(&self, c: MatrixCoord) -> WorldPoint {
        WorldPoint::new(c.col, self.height - 1 - c.row)
    }

    /// Flat row-major index for a matrix coordinate, or `None` out of bounds
    #[inline]
    pub fn index(&self, c: MatrixCoord) -> Option<usize> {
        if self.contains_matrix(c) {
            Some((c.row * self.width + c.col) as usize)
        } else {
            None
        }
    }

    /// Matrix coordinate for a flat row-major index
    #[inline]
    pub fn coord_of(&self, index: usize) -> MatrixCoord {
        let index = index as i32;
        MatrixCoord::new(index / self.width, index % self.width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_world_round_trip() {
        let frame = GridFrame::new(7, 5);
        for x in 0..7 {
            for y in 0..5 {
                let p = WorldPoint::new(x, y);
                assert_eq!(frame.world_from_matrix(frame.matrix_from_world(p)), p);
            }
        }
    }

    #[test]
    fn test_matrix_round_trip() {
        let frame = GridFrame::new(4, 9);
        for row in 0..9 {
            for col in 0..4 {
                let c = MatrixCoord::new(row, col);
                assert_eq!(frame.matrix_from_world(frame.world_from_matrix(c)), c);
            }
        }
    }

    #[test]
    fn test_flip_constants() {
        let frame = GridFrame::new(15, 15);
        // World origin (bottom-left) is the bottom matrix row.
        assert_eq!(
            frame.matrix_from_world(WorldPoint::new(0, 0)),
            MatrixCoord::new(14, 0)
        );
        // Top-left world corner is matrix (0, 0).
        assert_eq!(
            frame.matrix_from_world(WorldPoint::new(0, 14)),
            MatrixCoord::new(0, 0)
        );
    }

    #[test]
    fn test_index_bounds() {
        let frame = GridFrame::new(3, 3);
        assert_eq!(frame.index(MatrixCoord::new(0, 0)), Some(0));
        assert_eq!(frame.index(MatrixCoord::new(2, 2)), Some(8));
        assert_eq!(frame.index(MatrixCoord::new(3, 0)), None);
        assert_eq!(frame.index(MatrixCoord::new(0, -1)), None);
        assert_eq!(frame.coord_of(5), MatrixCoord::new(1, 2));
    }
}
