//! Visibility tracing against host-provided cell occupants.
//!
//! The tracer answers one question per ray: walking cell-by-cell from an
//! origin toward a target, is the line of sight clear, and if not, where
//! does it break? The per-tick [`sweep`] then re-traces the agent's entire
//! vision neighborhood and writes the resulting codes into its occupancy
//! matrix. Sensing is a fresh full sweep every tick, not an incremental
//! update - previously seen cells are simply reconfirmed.

use log::trace;

use crate::core::WorldPoint;
use crate::matrix::{CellCode, OccupancyMatrix};

use super::raycast::cells_between;

/// One entity occupying a grid cell, as reported by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Occupant {
    /// Another exploring agent
    Explorer,
    /// The exit
    Exit,
    /// A static obstacle
    Obstacle,
    /// Marker entity: this cell has been discovered by somebody
    Discovered,
    /// Marker entity: no agent has discovered this cell yet
    Undiscovered,
}

impl Occupant {
    /// Sighting priority when several entities share one cell.
    ///
    /// Exit > Obstacle > Undiscovered > Discovered > Explorer; an empty
    /// cell counts as discovered, since line of sight reached it.
    #[inline]
    fn priority(self) -> u8 {
        match self {
            Occupant::Exit => 5,
            Occupant::Obstacle => 4,
            Occupant::Undiscovered => 3,
            Occupant::Discovered => 2,
            Occupant::Explorer => 1,
        }
    }
}

/// Host-provided sensing surface.
///
/// The simulation host owns ground truth; the engine only ever sees it
/// through this trait. `discover_cell` is the one mutation: sighting an
/// undiscovered cell converts its marker entity in place.
pub trait WorldSensor {
    /// Entities currently occupying a cell
    fn objects_at(&self, cell: WorldPoint) -> Vec<Occupant>;

    /// Ordered enumeration of the square neighborhood of `radius` around
    /// `center`, clipped to the grid, center included
    fn neighborhood(&self, center: WorldPoint, radius: i32) -> Vec<WorldPoint>;

    /// Convert a cell's undiscovered marker into a discovered one
    fn discover_cell(&mut self, cell: WorldPoint);
}

/// Result of tracing a single ray.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TraceOutcome {
    /// Every intermediate cell was traversable
    Clear {
        /// Cells walked between origin and target, both exclusive
        traversed: Vec<WorldPoint>,
    },
    /// An obstacle interrupted the ray
    Obstructed {
        /// The cell holding the obstacle
        at: WorldPoint,
        /// Cells walked before the obstruction, origin exclusive
        traversed: Vec<WorldPoint>,
    },
}

/// Trace a ray from `origin` to `target`, stopping at the first cell that
/// holds a static obstacle.
///
/// The origin cell itself is never checked - an agent does not obstruct
/// its own sight.
pub fn trace_ray(sensor: &impl WorldSensor, origin: WorldPoint, target: WorldPoint) -> TraceOutcome {
    let mut traversed = Vec::new();
    for cell in cells_between(origin, target) {
        if cell == origin {
            continue;
        }
        let obstructed = sensor
            .objects_at(cell)
            .iter()
            .any(|o| *o == Occupant::Obstacle);
        if obstructed {
            return TraceOutcome::Obstructed { at: cell, traversed };
        }
        if cell != target {
            traversed.push(cell);
        }
    }
    TraceOutcome::Clear { traversed }
}

/// What one vision sweep saw, for the behavior layer to react to.
#[derive(Clone, Debug, Default)]
pub struct SweepReport {
    /// Cells whose rays were traced this sweep
    pub cells_traced: usize,
    /// Cells newly converted from undiscovered to discovered
    pub discovered: Vec<WorldPoint>,
    /// Obstacle cells sighted (hit by a ray or seen in the open), for
    /// pathfinder blocking
    pub obstacles: Vec<WorldPoint>,
    /// Exit location, if the exit was in view this sweep
    pub exit_seen: Option<WorldPoint>,
}

/// Re-trace the full vision neighborhood of `center` and write every
/// resulting code into `matrix`.
///
/// For each neighborhood cell a ray is cast from the center. An obstructed
/// ray writes the obstacle code at the hit cell; a clear ray writes the
/// highest-priority occupant's code at the target (an empty cell counts as
/// discovered). The neighborhood list is snapshotted up front: discovering
/// a cell swaps its marker entity, and that mutation must not perturb the
/// iteration.
pub fn sweep(
    matrix: &mut OccupancyMatrix,
    sensor: &mut impl WorldSensor,
    center: WorldPoint,
    radius: i32,
) -> SweepReport {
    let mut report = SweepReport::default();
    let cells = sensor.neighborhood(center, radius);
    report.cells_traced = cells.len();

    for target in cells {
        match trace_ray(sensor, center, target) {
            TraceOutcome::Obstructed { at, .. } => {
                matrix.set_value_world(at, CellCode::Obstacle);
                report.obstacles.push(at);
            }
            TraceOutcome::Clear { .. } => {
                let code = match best_occupant(sensor.objects_at(target)) {
                    Some(Occupant::Exit) => CellCode::Exit,
                    Some(Occupant::Obstacle) => CellCode::Obstacle,
                    Some(Occupant::Undiscovered) => {
                        sensor.discover_cell(target);
                        report.discovered.push(target);
                        CellCode::Discovered
                    }
                    Some(Occupant::Discovered) | None => CellCode::Discovered,
                    Some(Occupant::Explorer) => CellCode::Explorer,
                };
                matrix.set_value_world(target, code);
                match code {
                    CellCode::Exit => report.exit_seen = Some(target),
                    CellCode::Obstacle => report.obstacles.push(target),
                    _ => {}
                }
            }
        }
    }

    trace!(
        "{}: sweep at {} r={} traced {} cells, {} discovered",
        matrix.name(),
        center,
        radius,
        report.cells_traced,
        report.discovered.len()
    );
    report
}

fn best_occupant(occupants: Vec<Occupant>) -> Option<Occupant> {
    occupants.into_iter().max_by_key(|o| o.priority())
}
