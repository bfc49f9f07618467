//! The per-agent driver.
//!
//! One [`Explorer::tick`] runs five phases in a fixed order: vision sweep
//! plus transient obstacle marking, active state execution, inbound
//! message processing, outbound broadcast, transient clearing. The order
//! is load-bearing (see the crate docs); no phase blocks, and an agent
//! that cannot act simply no-ops until the next tick.

use std::collections::BTreeSet;

use log::{debug, info, trace, warn};

use anvesha_map::visibility::{sweep, SweepReport};
use anvesha_map::{
    nearest_undiscovered, AStarPlanner, CellCode, MatrixCoord, NodeGrid, OccupancyMatrix,
    PathResult, WorldPoint,
};

use crate::behavior::{BehaviorState, StateStack};
use crate::config::SwarmConfig;
use crate::host::{AgentId, AgentPresence, ExplorationHost, Posture};
use crate::messages::{GroupMessage, IndividualMessage, Mailbox, MessageBus, Payload};

/// Communication reach class.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AgentKind {
    /// Broadcasts within the configured communication radius
    Normal,
    /// Broadcasts to the whole grid
    Super,
}

/// One autonomous exploring agent.
pub struct Explorer {
    id: AgentId,
    kind: AgentKind,
    config: SwarmConfig,
    matrix: OccupancyMatrix,
    nodes: NodeGrid,
    planner: AStarPlanner,
    stack: StateStack,
    mailbox: Mailbox,
    bus: MessageBus,
    /// Destroyed obstacle cells - never re-blocked from stale sightings
    cleared: BTreeSet<WorldPoint>,
    /// Latched once the exit location is known, so the travel-to-exit
    /// transition fires exactly once
    exit_known: bool,
    /// Did this agent destroy an obstacle as its guardian?
    destroyed_by_me: bool,
    tick: u64,
    finished: bool,
}

impl Explorer {
    /// Create an agent at its spawn cell.
    ///
    /// The spawn cell is the one piece of the map known from the start.
    pub fn new(
        id: AgentId,
        kind: AgentKind,
        config: SwarmConfig,
        spawn: WorldPoint,
        bus: MessageBus,
        mailbox: Mailbox,
    ) -> Self {
        let mut matrix = OccupancyMatrix::new(config.grid.width, config.grid.height, id.to_string());
        matrix.set_value_world(spawn, CellCode::Discovered);
        Self {
            id,
            kind,
            matrix,
            nodes: NodeGrid::new(config.grid.width, config.grid.height),
            planner: AStarPlanner::default(),
            stack: StateStack::new(),
            mailbox,
            bus,
            cleared: BTreeSet::new(),
            exit_known: false,
            destroyed_by_me: false,
            tick: 0,
            finished: false,
            config,
        }
    }

    /// The agent's identity
    #[inline]
    pub fn id(&self) -> AgentId {
        self.id
    }

    /// The currently executing behavior state
    #[inline]
    pub fn state(&self) -> &BehaviorState {
        self.stack.current()
    }

    /// The agent's occupancy matrix
    #[inline]
    pub fn matrix(&self) -> &OccupancyMatrix {
        &self.matrix
    }

    /// The agent's pathfinding grid
    #[inline]
    pub fn nodes(&self) -> &NodeGrid {
        &self.nodes
    }

    /// Has this agent left the simulation?
    #[inline]
    pub fn finished(&self) -> bool {
        self.finished
    }

    /// Run one simulated tick.
    pub fn tick(&mut self, host: &mut impl ExplorationHost) {
        if self.finished {
            return;
        }
        let Some(position) = host.current_cell(self.id) else {
            warn!("{}: host lost track of position", self.id);
            return;
        };
        trace!("{}: tick {} at {} in {}", self.id, self.tick, position, self.state().name());

        // Phase 1: fresh full vision sweep, then transient marks for the
        // agents in view.
        let report = sweep(
            &mut self.matrix,
            host,
            position,
            self.config.agent.vision_radius,
        );
        self.absorb_sweep(&report);
        self.mark_transients(host, position);

        // Phase 2: resume a finished wait, then run the active state.
        self.stack.resolve_ready();
        self.execute_state(host, position, &report);

        // Phase 3: drain the inbox.
        self.process_messages(host);

        // Phase 4: broadcast the matrix.
        self.broadcast(host);

        // Phase 5: transient marks never outlive the tick.
        self.nodes.clear_transients();
        self.publish_presence(host);
        self.tick += 1;
    }

    // ------------------------------------------------------------------
    // Phase 1: sensing
    // ------------------------------------------------------------------

    fn absorb_sweep(&mut self, report: &SweepReport) {
        for cell in &report.obstacles {
            if !self.cleared.contains(cell) {
                self.nodes.set_blocked(*cell, true);
            }
        }
        self.note_exit_knowledge();
    }

    /// Transition to travel-to-exit the moment the exit becomes known,
    /// whether by direct sight or through a merge. Idempotent: conflicting
    /// exit signals converge here.
    fn note_exit_knowledge(&mut self) {
        let Some(exit) = self.matrix.exit() else {
            return;
        };
        if self.exit_known {
            return;
        }
        self.exit_known = true;
        match self.stack.current() {
            BehaviorState::TravelExit { .. } | BehaviorState::ObstacleGuardian { .. } => {}
            _ => {
                info!("{}: exit located at {}, heading there", self.id, exit);
                self.stack.set(BehaviorState::travel_exit());
            }
        }
    }

    fn mark_transients(&mut self, host: &impl ExplorationHost, position: WorldPoint) {
        let exit = self.matrix.exit();
        for sighting in host.agents_within(position, Some(self.config.agent.vision_radius)) {
            if sighting.id == self.id {
                continue;
            }
            // Stationed agents are part of the obstacle protocol, and the
            // exit cell must stay reachable for everyone.
            if sighting.presence.posture.is_stationed() {
                continue;
            }
            if exit == Some(sighting.cell) {
                continue;
            }
            self.nodes.set_transient(sighting.cell);
        }
    }

    // ------------------------------------------------------------------
    // Phase 2: state execution
    // ------------------------------------------------------------------

    fn execute_state(
        &mut self,
        host: &mut impl ExplorationHost,
        position: WorldPoint,
        report: &SweepReport,
    ) {
        match self.stack.current() {
            BehaviorState::Explore => self.run_explore(host, position, report),
            BehaviorState::TravelFrontier { .. } => self.run_travel_frontier(host, position),
            BehaviorState::TravelExit { .. } => self.run_travel_exit(host, position),
            BehaviorState::Recruiting { .. } => self.run_recruiting(host, position),
            BehaviorState::ObstacleGuardian { .. } => self.run_guardian(host, position),
            BehaviorState::WaitingForObstacleDestroy { .. } => {
                trace!("{}: waiting for obstacle destruction", self.id);
            }
        }
    }

    /// Default behavior: step onto ground this tick's sweep just revealed;
    /// with nothing fresh nearby, hand over to a frontier travel.
    fn run_explore(
        &mut self,
        host: &mut impl ExplorationHost,
        position: WorldPoint,
        report: &SweepReport,
    ) {
        for cell in &report.discovered {
            if *cell != position && position.is_adjacent(cell) && self.nodes.is_walkable(*cell) {
                if host.move_to(self.id, *cell) {
                    trace!("{}: stepped onto fresh cell {}", self.id, cell);
                    return;
                }
            }
        }

        if self.matrix.has_undiscovered_cells() {
            self.stack.set(BehaviorState::travel_frontier());
            self.run_travel_frontier(host, position);
        } else if self.exit_known {
            debug!("{}: map fully explored", self.id);
            self.stack.set(BehaviorState::travel_exit());
        } else {
            // A fully explored map contains the exit somewhere; reaching
            // this means a sweep misclassified it.
            warn!("{}: map fully explored but no exit known", self.id);
        }
    }

    fn run_travel_frontier(&mut self, host: &mut impl ExplorationHost, position: WorldPoint) {
        if self.path_consumed() {
            if !self.matrix.has_undiscovered_cells() {
                self.stack.set(BehaviorState::travel_exit());
                return;
            }
            let Some(target) = nearest_undiscovered(&self.matrix, position) else {
                // Consistency warning already logged by the search.
                self.stack.set(BehaviorState::Explore);
                return;
            };
            let result = self.plan(position, target);
            if !result.success() {
                debug!(
                    "{}: no path to frontier {} ({:?}), staying put",
                    self.id, target, result.failure
                );
                return;
            }
            self.install_path(result.cells);
        }
        self.step_along(host, position);
    }

    fn run_travel_exit(&mut self, host: &mut impl ExplorationHost, position: WorldPoint) {
        if self.path_consumed() {
            let Some(exit) = self.matrix.exit() else {
                warn!("{}: traveling to an exit that is not known", self.id);
                self.stack.set(BehaviorState::Explore);
                return;
            };
            if position == exit {
                if self.matrix.has_undiscovered_cells() {
                    debug!("{}: at the exit, map not finished - exploring on", self.id);
                    self.stack.set(BehaviorState::Explore);
                } else {
                    self.leave(host);
                }
                return;
            }
            let result = self.plan(position, exit);
            if !result.success() {
                // Distinguish a wall from a crowd: re-plan without the
                // transient marks before escalating to the obstacle
                // protocol.
                let mut still = self.nodes.clone();
                still.clear_transients();
                if self.planner.find_path(&still, position, exit).success() {
                    debug!("{}: exit route blocked by passing agents, waiting", self.id);
                    return;
                }
                debug!(
                    "{}: exit at {} walled off ({:?})",
                    self.id, exit, result.failure
                );
                self.on_exit_blocked(host, position);
                return;
            }
            self.install_path(result.cells);
        }
        self.step_along(host, position);
    }

    /// The route to the exit is closed. Join the obstacle-clearing
    /// protocol: guard the obstacle beside us, sign up with its guardian,
    /// or travel toward the nearest known obstacle.
    fn on_exit_blocked(&mut self, host: &mut impl ExplorationHost, position: WorldPoint) {
        if let Some(obstacle) = self.beside_obstacle(position) {
            match self.guardian_in_sight(host, position, obstacle) {
                Some(guardian) => self.sign_up_with(guardian),
                None => {
                    info!("{}: guarding obstacle at {}", self.id, obstacle);
                    self.stack.set(BehaviorState::guardian(obstacle, self.tick));
                }
            }
        } else if let Some(obstacle) = self.matrix.nearest_obstacle(position) {
            debug!("{}: recruiting toward obstacle at {}", self.id, obstacle);
            self.stack.set(BehaviorState::recruiting());
        } else {
            debug!(
                "{}: exit unreachable but no obstacle known, waiting for the map to improve",
                self.id
            );
        }
    }

    fn run_recruiting(&mut self, host: &mut impl ExplorationHost, position: WorldPoint) {
        if self.path_consumed() {
            if let Some(obstacle) = self.beside_obstacle(position) {
                match self.guardian_in_sight(host, position, obstacle) {
                    Some(guardian) => self.sign_up_with(guardian),
                    None => {
                        info!("{}: guarding obstacle at {}", self.id, obstacle);
                        self.stack.set(BehaviorState::guardian(obstacle, self.tick));
                    }
                }
                return;
            }
            let Some(obstacle) = self.matrix.nearest_obstacle(position) else {
                debug!("{}: no obstacle left to clear", self.id);
                self.stack.set(BehaviorState::travel_frontier());
                return;
            };

            // Head for the nearest reachable cell on the obstacle's rim.
            let mut rim: Vec<WorldPoint> = obstacle
                .neighbors_8()
                .into_iter()
                .filter(|c| self.nodes.is_walkable(*c))
                .collect();
            rim.sort_by_key(|c| position.distance_squared(c));
            let planned = rim.iter().find_map(|c| {
                let result = self.plan(position, *c);
                result.success().then_some(result.cells)
            });
            match planned {
                Some(cells) => self.install_path(cells),
                None => {
                    debug!("{}: obstacle rim at {} unreachable, retrying", self.id, obstacle);
                    return;
                }
            }
        }
        self.step_along(host, position);
    }

    /// Park beside the obstacle and wait for its destruction.
    fn sign_up_with(&mut self, guardian: AgentId) {
        debug!("{}: signing up with guardian {}", self.id, guardian);
        for payload in [Payload::WaitingToBreak, Payload::Help] {
            self.bus.send(IndividualMessage {
                sender: self.id,
                receiver: guardian,
                payload,
            });
        }
        self.stack.push_temporary(BehaviorState::waiting());
    }

    fn run_guardian(&mut self, host: &mut impl ExplorationHost, position: WorldPoint) {
        let BehaviorState::ObstacleGuardian {
            obstacle,
            recruits,
            since,
        } = self.stack.current()
        else {
            return;
        };
        let obstacle = *obstacle;
        let since = *since;
        let breakers = recruits.len() + 1;

        // Two guardians on one obstacle: the lower id keeps the post and
        // waves the other off.
        for sighting in host.agents_within(position, Some(self.config.agent.vision_radius)) {
            if sighting.id != self.id
                && sighting.presence.posture == Posture::Guarding
                && sighting.cell.is_adjacent(&obstacle)
                && self.id < sighting.id
            {
                debug!("{}: waving off competing guardian {}", self.id, sighting.id);
                self.bus.send(IndividualMessage {
                    sender: self.id,
                    receiver: sighting.id,
                    payload: Payload::OtherGuarding {
                        heading_to_exit: false,
                    },
                });
            }
        }

        let quorum = breakers >= self.config.coordination.required_breakers;
        let out_of_patience =
            self.tick.saturating_sub(since) >= self.config.coordination.guardian_patience;
        if quorum || out_of_patience {
            if !quorum {
                debug!("{}: patience exhausted, breaking {} alone", self.id, obstacle);
            }
            self.destroy_guarded_obstacle(host, obstacle);
        } else {
            trace!(
                "{}: holding at {} with {}/{} breakers",
                self.id,
                obstacle,
                breakers,
                self.config.coordination.required_breakers
            );
        }
    }

    fn destroy_guarded_obstacle(&mut self, host: &mut impl ExplorationHost, obstacle: WorldPoint) {
        if !host.destroy_obstacle(obstacle) {
            warn!("{}: obstacle at {} was already gone", self.id, obstacle);
        }
        info!("{}: obstacle at {} destroyed", self.id, obstacle);
        self.nodes.set_blocked(obstacle, false);
        self.matrix.set_value_world(obstacle, CellCode::Discovered);
        self.cleared.insert(obstacle);
        self.destroyed_by_me = true;

        // Everyone parked on this obstacle gets the news directly; the
        // comm-radius broadcast clears bystanders that paused on a HELP.
        let mut receivers: BTreeSet<AgentId> =
            match self.stack.current() {
                BehaviorState::ObstacleGuardian { recruits, .. } => recruits.clone(),
                _ => BTreeSet::new(),
            };
        if let Some(position) = host.current_cell(self.id) {
            for sighting in host.agents_within(position, self.comm_radius()) {
                if sighting.id != self.id {
                    receivers.insert(sighting.id);
                }
            }
        }
        self.bus.broadcast(GroupMessage {
            sender: self.id,
            receivers: receivers.into_iter().collect(),
            payload: Payload::ObstacleDestroyed(obstacle),
        });

        self.stack.set(BehaviorState::travel_exit());
    }

    /// Find an agent currently guarding `obstacle` within vision.
    fn guardian_in_sight(
        &self,
        host: &impl ExplorationHost,
        position: WorldPoint,
        obstacle: WorldPoint,
    ) -> Option<AgentId> {
        host.agents_within(position, Some(self.config.agent.vision_radius))
            .into_iter()
            .find(|s| {
                s.id != self.id
                    && s.presence.posture == Posture::Guarding
                    && s.cell.is_adjacent(&obstacle)
            })
            .map(|s| s.id)
    }

    // ------------------------------------------------------------------
    // Path following
    // ------------------------------------------------------------------

    fn path_consumed(&self) -> bool {
        match self.stack.current() {
            BehaviorState::TravelFrontier { path, next }
            | BehaviorState::TravelExit { path, next }
            | BehaviorState::Recruiting { path, next } => *next >= path.len(),
            _ => true,
        }
    }

    fn install_path(&mut self, cells: Vec<WorldPoint>) {
        if let BehaviorState::TravelFrontier { path, next }
        | BehaviorState::TravelExit { path, next }
        | BehaviorState::Recruiting { path, next } = self.stack.current_mut()
        {
            *path = cells;
            *next = 0;
        }
    }

    /// Consume one path cell: move there, or drop the path so the next
    /// tick re-plans.
    fn step_along(&mut self, host: &mut impl ExplorationHost, position: WorldPoint) {
        let target = match self.stack.current() {
            BehaviorState::TravelFrontier { path, next }
            | BehaviorState::TravelExit { path, next }
            | BehaviorState::Recruiting { path, next } => path.get(*next).copied(),
            _ => None,
        };
        let Some(target) = target else {
            return;
        };

        if host.move_to(self.id, target) {
            if let BehaviorState::TravelFrontier { next, .. }
            | BehaviorState::TravelExit { next, .. }
            | BehaviorState::Recruiting { next, .. } = self.stack.current_mut()
            {
                *next += 1;
            }
        } else {
            debug!(
                "{}: move {} -> {} refused, re-planning next tick",
                self.id, position, target
            );
            self.stack.current_mut().reset();
        }
    }

    // ------------------------------------------------------------------
    // Phase 3: inbound messages
    // ------------------------------------------------------------------

    fn process_messages(&mut self, host: &mut impl ExplorationHost) {
        for message in self.mailbox.drain() {
            if self.finished {
                break;
            }
            trace!("{}: received {} from {}", self.id, message.payload.tag(), message.sender);
            match message.payload {
                Payload::Matrix(snapshot) => self.on_matrix(&snapshot),
                Payload::Help => self.on_break_offer(message.sender, true),
                Payload::WaitingToBreak => self.on_break_offer(message.sender, false),
                Payload::ObstacleDestroyed(cell) => self.on_obstacle_destroyed(cell),
                Payload::OtherGuarding { heading_to_exit } => {
                    self.on_other_guarding(host, heading_to_exit)
                }
            }
        }
    }

    fn on_matrix(&mut self, snapshot: &OccupancyMatrix) {
        let outcome = match self.matrix.merge(snapshot) {
            Ok(outcome) => outcome,
            Err(e) => {
                // Malformed update: the protocol is best-effort, drop it.
                warn!("{}: discarding foreign matrix: {}", self.id, e);
                return;
            }
        };
        for cell in &outcome.obstacles {
            if !self.cleared.contains(cell) {
                self.nodes.set_blocked(*cell, true);
            }
        }
        if outcome.exit_adopted {
            debug!("{}: learned the exit from a merge", self.id);
        }
        self.note_exit_knowledge();
    }

    /// A peer offers to help break an obstacle (`Help`) or reports itself
    /// parked and ready (`WaitingToBreak`).
    fn on_break_offer(&mut self, sender: AgentId, is_help: bool) {
        if let BehaviorState::ObstacleGuardian { recruits, .. } = self.stack.current_mut() {
            recruits.insert(sender);
            return;
        }
        if self.stack.current().is_temporary() {
            // Already waiting; the destruction broadcast covers both of us.
            return;
        }
        if self.destroyed_by_me {
            // Stale sign-up for an obstacle this agent already broke on
            // its way out.
            self.bus.send(IndividualMessage {
                sender: self.id,
                receiver: sender,
                payload: Payload::OtherGuarding {
                    heading_to_exit: true,
                },
            });
        } else if is_help {
            // A blocked peer asked for assistance; park until the
            // destruction broadcast resolves it.
            debug!("{}: pausing on HELP from {}", self.id, sender);
            self.stack.push_temporary(BehaviorState::waiting());
        } else {
            trace!("{}: ignoring break offer from {}", self.id, sender);
        }
    }

    fn on_obstacle_destroyed(&mut self, cell: WorldPoint) {
        debug!("{}: obstacle at {} reported destroyed", self.id, cell);
        self.nodes.set_blocked(cell, false);
        self.matrix.set_value_world(cell, CellCode::Discovered);
        self.cleared.insert(cell);

        if let BehaviorState::WaitingForObstacleDestroy { cleared } = self.stack.current_mut() {
            *cleared = true;
        }
        self.stack.set(BehaviorState::travel_frontier());
    }

    fn on_other_guarding(&mut self, host: &mut impl ExplorationHost, heading_to_exit: bool) {
        if heading_to_exit {
            // The guarding agent is done here and taking the exit; so is
            // this one.
            self.leave(host);
        } else if !matches!(self.stack.current(), BehaviorState::Recruiting { .. }) {
            debug!("{}: obstacle already guarded, recruiting instead", self.id);
            self.stack.set(BehaviorState::recruiting());
        }
    }

    // ------------------------------------------------------------------
    // Phase 4: outbound broadcast
    // ------------------------------------------------------------------

    fn comm_radius(&self) -> Option<i32> {
        match self.kind {
            AgentKind::Normal => Some(self.config.agent.communication_radius),
            AgentKind::Super => None,
        }
    }

    fn broadcast(&mut self, host: &impl ExplorationHost) {
        if self.finished {
            return;
        }
        let Some(position) = host.current_cell(self.id) else {
            return;
        };

        let mut receivers = Vec::new();
        for sighting in host.agents_within(position, self.comm_radius()) {
            if sighting.id == self.id {
                continue;
            }
            // Two exit-aware agents have nothing to teach each other
            // through raw grids.
            if self.exit_known && sighting.presence.exit_aware {
                continue;
            }
            receivers.push(sighting.id);
        }
        if receivers.is_empty() {
            return;
        }

        self.bus.broadcast(GroupMessage {
            sender: self.id,
            receivers,
            payload: Payload::Matrix(Box::new(self.matrix.clone())),
        });
    }

    fn publish_presence(&mut self, host: &mut impl ExplorationHost) {
        if self.finished {
            return;
        }
        let posture = match self.stack.current() {
            BehaviorState::ObstacleGuardian { .. } => Posture::Guarding,
            BehaviorState::WaitingForObstacleDestroy { .. } => Posture::Waiting,
            _ => Posture::Roaming,
        };
        host.set_presence(
            self.id,
            AgentPresence {
                posture,
                exit_aware: self.exit_known,
            },
        );
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn plan(&self, position: WorldPoint, target: WorldPoint) -> PathResult {
        self.planner.find_path(&self.nodes, position, target)
    }

    /// Local obstacle-proximity check: the first believed-obstacle cell
    /// among the 8 neighbors, scanned through the matrix offset queries.
    fn beside_obstacle(&self, position: WorldPoint) -> Option<WorldPoint> {
        let frame = self.matrix.frame();
        let coord = frame.matrix_from_world(position);
        for d_row in -1..=1 {
            for d_col in -1..=1 {
                if d_row == 0 && d_col == 0 {
                    continue;
                }
                if self.matrix.value_offset(coord, d_row, d_col) == Some(CellCode::Obstacle) {
                    let beside = MatrixCoord::new(coord.row + d_row, coord.col + d_col);
                    return Some(frame.world_from_matrix(beside));
                }
            }
        }
        None
    }

    fn leave(&mut self, host: &mut impl ExplorationHost) {
        info!("{}: leaving the simulation at tick {}", self.id, self.tick);
        host.remove_agent(self.id);
        self.finished = true;
    }
}
