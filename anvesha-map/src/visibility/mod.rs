//! Line-of-sight computation and the per-tick vision sweep.

mod raycast;
mod tracer;

pub use raycast::{cells_between, BresenhamLine};
pub use tracer::{sweep, trace_ray, Occupant, SweepReport, TraceOutcome, WorldSensor};
