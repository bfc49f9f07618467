//! Deterministic in-process simulation host.
//!
//! Stands in for the external simulation platform in tests and the demo
//! binary: a grid world with per-cell entities, an agent directory, and a
//! closed-loop runner that visits every agent once per tick.

mod runner;
mod world;

pub use runner::{RunSummary, SwarmRunner};
pub use world::{GridWorld, Scenario};
