//! The two-slot state stack: one current state, at most one paused under
//! a temporary state.
//!
//! A blocking wait must never suspend the tick loop, so "waiting" is a
//! real state pushed on top of the task it pauses. The stack is
//! deliberately capped at depth 2: requesting a second temporary while
//! one is already active discards the active temporary rather than
//! nesting.
//!
//! Resume semantics: when the active temporary reports ready, the paused
//! state becomes current again. If it was freshly installed while paused
//! (a transition arrived mid-wait) it is reset so its next execution
//! behaves like a fresh entry; otherwise it continues untouched.

use log::debug;

use super::BehaviorState;

struct Paused {
    state: BehaviorState,
    reenter: bool,
}

/// Current + paused behavior state for one agent.
pub struct StateStack {
    current: BehaviorState,
    paused: Option<Paused>,
}

impl StateStack {
    /// New stack starting in `Explore`
    pub fn new() -> Self {
        Self {
            current: BehaviorState::default(),
            paused: None,
        }
    }

    /// The state executing this tick
    #[inline]
    pub fn current(&self) -> &BehaviorState {
        &self.current
    }

    /// Mutable access for the executing state's own bookkeeping
    #[inline]
    pub fn current_mut(&mut self) -> &mut BehaviorState {
        &mut self.current
    }

    /// Is a paused state sitting under the current one?
    #[inline]
    pub fn has_paused(&self) -> bool {
        self.paused.is_some()
    }

    /// Install a new (non-temporary) state.
    ///
    /// If a temporary state is active, the new state lands in the paused
    /// slot instead and will get a fresh entry on resume.
    pub fn set(&mut self, state: BehaviorState) {
        debug_assert!(!state.is_temporary(), "temporary states use push_temporary");
        if self.current.is_temporary() {
            debug!("deferring {} behind {}", state.name(), self.current.name());
            self.paused = Some(Paused {
                state,
                reenter: true,
            });
        } else {
            self.current = state;
        }
    }

    /// Push a temporary state on top of the current one.
    ///
    /// The current state pauses. If the current state is already
    /// temporary it is discarded instead - only one state can be paused
    /// under at a time.
    pub fn push_temporary(&mut self, temp: BehaviorState) {
        debug_assert!(temp.is_temporary(), "only temporary states may be pushed");
        if self.current.is_temporary() {
            debug!("replacing temporary {} with {}", self.current.name(), temp.name());
            self.current = temp;
        } else {
            self.paused = Some(Paused {
                state: std::mem::take(&mut self.current),
                reenter: false,
            });
            self.current = temp;
        }
    }

    /// Resume the paused state if the active temporary reports ready.
    ///
    /// Returns true when a resume happened.
    pub fn resolve_ready(&mut self) -> bool {
        if !self.current.is_ready() {
            return false;
        }
        match self.paused.take() {
            Some(paused) => {
                self.current = paused.state;
                if paused.reenter {
                    self.current.reset();
                }
                debug!("resumed {}", self.current.name());
            }
            None => {
                // A temporary with nothing underneath falls back to the
                // default state.
                self.current = BehaviorState::default();
            }
        }
        true
    }
}

impl Default for StateStack {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anvesha_map::WorldPoint;

    #[test]
    fn test_set_replaces_current() {
        let mut stack = StateStack::new();
        assert_eq!(stack.current(), &BehaviorState::Explore);

        stack.set(BehaviorState::travel_exit());
        assert_eq!(stack.current().name(), "TravelExit");
        assert!(!stack.has_paused());
    }

    #[test]
    fn test_pause_and_resume_untouched() {
        let mut stack = StateStack::new();
        stack.set(BehaviorState::TravelFrontier {
            path: vec![WorldPoint::new(1, 1)],
            next: 0,
        });

        stack.push_temporary(BehaviorState::waiting());
        assert_eq!(stack.current().name(), "WaitingForObstacleDestroy");
        assert!(stack.has_paused());

        // Not ready yet: nothing moves.
        assert!(!stack.resolve_ready());

        if let BehaviorState::WaitingForObstacleDestroy { cleared } = stack.current_mut() {
            *cleared = true;
        }
        assert!(stack.resolve_ready());

        // The paused travel resumed with its path intact.
        match stack.current() {
            BehaviorState::TravelFrontier { path, next } => {
                assert_eq!(path.len(), 1);
                assert_eq!(*next, 0);
            }
            other => panic!("expected TravelFrontier, got {}", other.name()),
        }
    }

    #[test]
    fn test_transition_while_paused_gets_fresh_entry() {
        let mut stack = StateStack::new();
        stack.set(BehaviorState::TravelFrontier {
            path: vec![WorldPoint::new(1, 1)],
            next: 1,
        });
        stack.push_temporary(BehaviorState::waiting());

        // A transition arriving mid-wait replaces the paused state.
        stack.set(BehaviorState::TravelExit {
            path: vec![WorldPoint::new(2, 2)],
            next: 1,
        });
        assert_eq!(stack.current().name(), "WaitingForObstacleDestroy");

        if let BehaviorState::WaitingForObstacleDestroy { cleared } = stack.current_mut() {
            *cleared = true;
        }
        assert!(stack.resolve_ready());

        // The replacement state resumed reset, ready for a fresh plan.
        match stack.current() {
            BehaviorState::TravelExit { path, next } => {
                assert!(path.is_empty());
                assert_eq!(*next, 0);
            }
            other => panic!("expected TravelExit, got {}", other.name()),
        }
    }

    #[test]
    fn test_second_temporary_discards_first() {
        let mut stack = StateStack::new();
        stack.set(BehaviorState::travel_frontier());
        stack.push_temporary(BehaviorState::waiting());
        stack.push_temporary(BehaviorState::WaitingForObstacleDestroy { cleared: true });

        // Depth stays 2: the first temporary is gone, the state paused
        // underneath survives.
        assert!(stack.has_paused());
        assert!(stack.resolve_ready());
        assert_eq!(stack.current().name(), "TravelFrontier");
    }

    #[test]
    fn test_ready_with_nothing_paused_falls_back() {
        let mut stack = StateStack::new();
        stack.push_temporary(BehaviorState::WaitingForObstacleDestroy { cleared: true });
        // Explore was paused underneath.
        assert!(stack.resolve_ready());
        assert_eq!(stack.current(), &BehaviorState::Explore);
    }
}
