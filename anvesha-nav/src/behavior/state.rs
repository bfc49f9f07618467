//! Behavior states.
//!
//! A closed set of states, one active per agent at all times. States
//! carry their own working data (paths, recruit sets); entering a state
//! resets that data and the driver lazily rebuilds it on the next
//! execution, which doubles as the re-plan path after a failed move.

use std::collections::BTreeSet;

use anvesha_map::WorldPoint;

use crate::host::AgentId;

/// What an agent does each tick.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BehaviorState {
    /// Default: sense, step into freshly revealed ground, or hand over to
    /// a frontier travel
    Explore,

    /// Following an A* path to the nearest undiscovered cell
    TravelFrontier {
        /// Remaining path, consumed front to back
        path: Vec<WorldPoint>,
        /// Index of the next cell to step onto
        next: usize,
    },

    /// Following a path to the cached exit
    TravelExit {
        /// Remaining path, consumed front to back
        path: Vec<WorldPoint>,
        /// Index of the next cell to step onto
        next: usize,
    },

    /// Knows of a blocking obstacle and is traveling to help clear it
    Recruiting {
        /// Remaining path toward the obstacle's rim
        path: Vec<WorldPoint>,
        /// Index of the next cell to step onto
        next: usize,
    },

    /// Stationed at the obstacle, responsible for its destruction
    ObstacleGuardian {
        /// The obstacle cell under guard
        obstacle: WorldPoint,
        /// Agents that have signed up to break (help/waiting senders);
        /// ordered so notification order is reproducible
        recruits: BTreeSet<AgentId>,
        /// Tick the guard began; after enough patience the guardian
        /// breaks the obstacle without a full quorum
        since: u64,
    },

    /// Temporary: parked until the guarded obstacle is destroyed
    WaitingForObstacleDestroy {
        /// Set by the destruction broadcast; readiness predicate
        cleared: bool,
    },
}

impl BehaviorState {
    /// Fresh travel-to-frontier state (path planned on first execution)
    pub fn travel_frontier() -> Self {
        BehaviorState::TravelFrontier {
            path: Vec::new(),
            next: 0,
        }
    }

    /// Fresh travel-to-exit state
    pub fn travel_exit() -> Self {
        BehaviorState::TravelExit {
            path: Vec::new(),
            next: 0,
        }
    }

    /// Fresh recruiting state
    pub fn recruiting() -> Self {
        BehaviorState::Recruiting {
            path: Vec::new(),
            next: 0,
        }
    }

    /// Fresh guardian state for an obstacle
    pub fn guardian(obstacle: WorldPoint, since: u64) -> Self {
        BehaviorState::ObstacleGuardian {
            obstacle,
            recruits: BTreeSet::new(),
            since,
        }
    }

    /// Fresh waiting state
    pub fn waiting() -> Self {
        BehaviorState::WaitingForObstacleDestroy { cleared: false }
    }

    /// Temporary states pause the current state instead of replacing it
    #[inline]
    pub fn is_temporary(&self) -> bool {
        matches!(self, BehaviorState::WaitingForObstacleDestroy { .. })
    }

    /// Readiness predicate for temporary states; always false otherwise
    #[inline]
    pub fn is_ready(&self) -> bool {
        matches!(
            self,
            BehaviorState::WaitingForObstacleDestroy { cleared: true }
        )
    }

    /// Drop working data so the state re-plans on its next execution
    pub fn reset(&mut self) {
        match self {
            BehaviorState::TravelFrontier { path, next }
            | BehaviorState::TravelExit { path, next }
            | BehaviorState::Recruiting { path, next } => {
                path.clear();
                *next = 0;
            }
            BehaviorState::Explore
            | BehaviorState::ObstacleGuardian { .. }
            | BehaviorState::WaitingForObstacleDestroy { .. } => {}
        }
    }

    /// State name for logging
    pub fn name(&self) -> &'static str {
        match self {
            BehaviorState::Explore => "Explore",
            BehaviorState::TravelFrontier { .. } => "TravelFrontier",
            BehaviorState::TravelExit { .. } => "TravelExit",
            BehaviorState::Recruiting { .. } => "Recruiting",
            BehaviorState::ObstacleGuardian { .. } => "ObstacleGuardian",
            BehaviorState::WaitingForObstacleDestroy { .. } => "WaitingForObstacleDestroy",
        }
    }
}

impl Default for BehaviorState {
    fn default() -> Self {
        BehaviorState::Explore
    }
}
