//! The simulation host interface.
//!
//! The engine never touches ground truth directly. Sensing goes through
//! [`WorldSensor`] (defined in the map layer); movement, agent directory
//! queries, and world mutations go through [`ExplorationHost`]. Any host -
//! the in-process [`crate::sim::GridWorld`] or an external simulation -
//! implements both.
//!
//! Agents also publish a small amount of presence data through the host
//! (posture and exit-awareness), standing in for the agent directory of a
//! full multi-agent platform. Peers read it when marking transient
//! obstacles and when deciding whether a matrix exchange is worthwhile.

use std::fmt;

use serde::{Deserialize, Serialize};

use anvesha_map::visibility::WorldSensor;
use anvesha_map::WorldPoint;

pub use anvesha_map::visibility::Occupant;

/// Stable agent identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgentId(pub u32);

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "explorer-{}", self.0)
    }
}

/// What an agent is currently doing, as visible to peers.
///
/// `Guarding` and `Waiting` agents are parked at an obstacle on purpose;
/// peers do not treat their cells as transient obstacles when planning.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Posture {
    /// Moving around the grid
    #[default]
    Roaming,
    /// Stationed at an obstacle as its guardian
    Guarding,
    /// Parked next to an obstacle waiting for its destruction
    Waiting,
}

impl Posture {
    /// Is this agent deliberately parked?
    #[inline]
    pub fn is_stationed(self) -> bool {
        matches!(self, Posture::Guarding | Posture::Waiting)
    }
}

/// Presence data an agent publishes through the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct AgentPresence {
    /// Current posture
    pub posture: Posture,
    /// Does this agent already know where the exit is?
    pub exit_aware: bool,
}

/// One agent seen by a directory query.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AgentSighting {
    /// The agent's identity
    pub id: AgentId,
    /// The cell it currently occupies
    pub cell: WorldPoint,
    /// Its published presence
    pub presence: AgentPresence,
}

/// Host services beyond sensing.
///
/// Distance semantics: `agents_within` uses Chebyshev distance, matching
/// the square sensing neighborhoods; `radius: None` means unbounded.
pub trait ExplorationHost: WorldSensor {
    /// The cell an agent currently occupies, `None` if it has left
    fn current_cell(&self, agent: AgentId) -> Option<WorldPoint>;

    /// Move an agent to an adjacent cell. Fails (returns false) if the
    /// destination holds a static obstacle or lies outside the grid.
    fn move_to(&mut self, agent: AgentId, target: WorldPoint) -> bool;

    /// Agents within `radius` of `center` (always including any agent
    /// standing exactly on `center`)
    fn agents_within(&self, center: WorldPoint, radius: Option<i32>) -> Vec<AgentSighting>;

    /// Publish an agent's presence data
    fn set_presence(&mut self, agent: AgentId, presence: AgentPresence);

    /// Remove a destroyed obstacle from the world. Returns false if the
    /// cell held no obstacle.
    fn destroy_obstacle(&mut self, cell: WorldPoint) -> bool;

    /// Remove an agent that has finished from the simulation
    fn remove_agent(&mut self, agent: AgentId);
}
