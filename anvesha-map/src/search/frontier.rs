//! Nearest-undiscovered search over concentric square rings.
//!
//! Exploration targets are found by scanning square rings of growing
//! radius around the agent:
//!
//! ```text
//!        radius 2
//!     + + + + +
//!     +       +       ring cells only - the interior was
//!     +   @   +       covered by smaller rings
//!     +       +
//!     + + + + +
//! ```
//!
//! Within one ring, cells scan column-major and the undiscovered cell with
//! the smallest Euclidean distance to the origin wins; ties keep the first
//! hit in scan order. The first ring that yields anything stops the
//! search. Rings start at radius 2; the cell directly next to the agent is
//! the Explore state's business, not a travel target.

use log::warn;

use crate::core::{MatrixCoord, WorldPoint};
use crate::matrix::{CellCode, OccupancyMatrix};

/// Find the nearest undiscovered cell from `from`, in world coordinates.
///
/// The ring radius is bounded by the distance from the origin to the
/// farthest grid edge; past that bound every cell has been covered.
/// Callers are expected to check `has_undiscovered_cells()` first - a
/// `None` despite undiscovered cells means the bound undershot and is
/// logged as a consistency warning.
pub fn nearest_undiscovered(matrix: &OccupancyMatrix, from: WorldPoint) -> Option<WorldPoint> {
    let frame = matrix.frame();
    let origin = frame.matrix_from_world(from);

    // Distance to the farthest edge on each axis bounds the ring scan.
    let max_radius = origin
        .col
        .max(frame.width() - 1 - origin.col)
        .max(origin.row)
        .max(frame.height() - 1 - origin.row);

    for radius in 2..=max_radius {
        if let Some(found) = undiscovered_on_ring(matrix, origin, radius) {
            return Some(frame.world_from_matrix(found));
        }
    }

    if matrix.has_undiscovered_cells() {
        warn!(
            "{}: no undiscovered cell within radius {} of {} despite {} remaining",
            matrix.name(),
            max_radius,
            from,
            matrix.undiscovered_count()
        );
    }
    None
}

/// Scan one ring's perimeter for the closest undiscovered cell.
fn undiscovered_on_ring(
    matrix: &OccupancyMatrix,
    origin: MatrixCoord,
    radius: i32,
) -> Option<MatrixCoord> {
    let mut nearest: Option<MatrixCoord> = None;
    let mut nearest_distance = f32::MAX;

    for col in origin.col - radius..=origin.col + radius {
        for row in origin.row - radius..=origin.row + radius {
            // Interior cells were checked by smaller rings.
            if col != origin.col - radius
                && col != origin.col + radius
                && row != origin.row - radius
                && row != origin.row + radius
            {
                continue;
            }

            let coord = MatrixCoord::new(row, col);
            if matrix.value(coord) != Some(CellCode::Unknown) {
                continue;
            }
            let distance = origin.distance(&coord);
            if distance < nearest_distance {
                nearest = Some(coord);
                nearest_distance = distance;
            }
        }
    }

    nearest
}
