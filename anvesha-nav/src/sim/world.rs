//! The simulated grid world.
//!
//! Ground truth for tests and demos: every cell carries a discovery
//! marker entity (all cells start undiscovered), optionally an obstacle or
//! the exit, and any number of agents. Scenarios come from ASCII maps or
//! seeded random generation.
//!
//! ## ASCII maps
//!
//! One character per cell, rows top to bottom:
//!
//! ```text
//! . . . # E        .  open cell
//! . # . # .        #  obstacle
//! 0 . . . 1        E  exit
//! ```
//!
//! Digits place agents; agent ids must run contiguously from 0.
//! Whitespace between cells is ignored.

use std::collections::BTreeMap;

use log::warn;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use anvesha_map::visibility::{Occupant, WorldSensor};
use anvesha_map::{GridFrame, WorldPoint};

use crate::error::{NavError, Result};
use crate::host::{AgentId, AgentPresence, AgentSighting, ExplorationHost};

/// A scenario description: grid dimensions, static entities, agent
/// spawn cells.
#[derive(Clone, Debug)]
pub struct Scenario {
    /// Grid width in cells
    pub width: i32,
    /// Grid height in cells
    pub height: i32,
    /// Obstacle cells
    pub obstacles: Vec<WorldPoint>,
    /// Exit cell, if the map has one
    pub exit: Option<WorldPoint>,
    /// Spawn cells; index is the agent id
    pub starts: Vec<WorldPoint>,
    /// Leading agents (by id) given unbounded communication reach
    pub super_agents: usize,
}

impl Scenario {
    /// Parse an ASCII map.
    pub fn from_ascii(text: &str) -> Result<Self> {
        let rows: Vec<Vec<char>> = text
            .lines()
            .map(|line| line.chars().filter(|c| !c.is_whitespace()).collect())
            .filter(|row: &Vec<char>| !row.is_empty())
            .collect();
        if rows.is_empty() {
            return Err(NavError::Scenario("empty map".into()));
        }
        let height = rows.len() as i32;
        let width = rows[0].len() as i32;

        let mut obstacles = Vec::new();
        let mut exit = None;
        let mut numbered: Vec<(u32, WorldPoint)> = Vec::new();

        for (row_idx, row) in rows.iter().enumerate() {
            if row.len() as i32 != width {
                return Err(NavError::Scenario(format!(
                    "ragged map: row {} has {} cells, expected {}",
                    row_idx,
                    row.len(),
                    width
                )));
            }
            for (col_idx, ch) in row.iter().enumerate() {
                // Row 0 is the top of the map; world y counts from the
                // bottom.
                let cell = WorldPoint::new(col_idx as i32, height - 1 - row_idx as i32);
                match ch {
                    '.' => {}
                    '#' => obstacles.push(cell),
                    'E' => {
                        if exit.replace(cell).is_some() {
                            return Err(NavError::Scenario("more than one exit".into()));
                        }
                    }
                    d if d.is_ascii_digit() => {
                        numbered.push((d.to_digit(10).expect("ascii digit"), cell));
                    }
                    other => {
                        return Err(NavError::Scenario(format!("unknown map character '{other}'")));
                    }
                }
            }
        }

        numbered.sort_by_key(|(digit, _)| *digit);
        for (expected, (digit, _)) in numbered.iter().enumerate() {
            if *digit != expected as u32 {
                return Err(NavError::Scenario(format!(
                    "agent ids must run 0..n without gaps, found {digit}"
                )));
            }
        }
        let starts = numbered.into_iter().map(|(_, cell)| cell).collect();

        Ok(Self {
            width,
            height,
            obstacles,
            exit,
            starts,
            super_agents: 0,
        })
    }

    /// Generate a random scenario from a seed.
    ///
    /// Obstacles are sprinkled at `obstacle_density`; the exit and the
    /// spawn cells land on distinct open cells. The same seed always
    /// produces the same scenario.
    pub fn random(width: i32, height: i32, agents: usize, obstacle_density: f64, seed: u64) -> Self {
        assert!(width > 1 && height > 1, "grid too small");
        let mut rng = SmallRng::seed_from_u64(seed);

        let mut obstacles = Vec::new();
        for x in 0..width {
            for y in 0..height {
                if rng.gen_bool(obstacle_density) {
                    obstacles.push(WorldPoint::new(x, y));
                }
            }
        }

        let mut taken = obstacles.clone();
        let mut pick_open = |rng: &mut SmallRng, taken: &mut Vec<WorldPoint>| loop {
            let cell = WorldPoint::new(rng.gen_range(0..width), rng.gen_range(0..height));
            if !taken.contains(&cell) {
                taken.push(cell);
                return cell;
            }
        };

        let exit = pick_open(&mut rng, &mut taken);
        let starts = (0..agents).map(|_| pick_open(&mut rng, &mut taken)).collect();

        Self {
            width,
            height,
            obstacles,
            exit: Some(exit),
            starts,
            super_agents: 0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Marker {
    Undiscovered,
    Discovered,
}

#[derive(Clone, Copy, Debug)]
struct AgentRecord {
    cell: WorldPoint,
    presence: AgentPresence,
}

/// In-process implementation of the host interface.
#[derive(Debug)]
pub struct GridWorld {
    frame: GridFrame,
    markers: Vec<Marker>,
    obstacles: Vec<bool>,
    exit: Option<WorldPoint>,
    agents: BTreeMap<AgentId, AgentRecord>,
}

impl GridWorld {
    /// Create an empty world of the given dimensions
    pub fn new(width: i32, height: i32) -> Self {
        let frame = GridFrame::new(width, height);
        Self {
            markers: vec![Marker::Undiscovered; frame.cell_count()],
            obstacles: vec![false; frame.cell_count()],
            exit: None,
            agents: BTreeMap::new(),
            frame,
        }
    }

    /// Build a world from a scenario (agents are placed separately)
    pub fn from_scenario(scenario: &Scenario) -> Self {
        let mut world = Self::new(scenario.width, scenario.height);
        for cell in &scenario.obstacles {
            world.place_obstacle(*cell);
        }
        if let Some(exit) = scenario.exit {
            world.place_exit(exit);
        }
        world
    }

    fn index(&self, cell: WorldPoint) -> Option<usize> {
        self.frame.index(self.frame.matrix_from_world(cell))
    }

    /// Grid dimensions
    pub fn frame(&self) -> GridFrame {
        self.frame
    }

    /// The exit cell, if placed
    pub fn exit(&self) -> Option<WorldPoint> {
        self.exit
    }

    /// Put a static obstacle on a cell
    pub fn place_obstacle(&mut self, cell: WorldPoint) {
        if let Some(idx) = self.index(cell) {
            self.obstacles[idx] = true;
        }
    }

    /// Is the cell holding an obstacle?
    pub fn has_obstacle(&self, cell: WorldPoint) -> bool {
        self.index(cell).map(|i| self.obstacles[i]).unwrap_or(false)
    }

    /// Place the exit
    pub fn place_exit(&mut self, cell: WorldPoint) {
        self.exit = Some(cell);
    }

    /// Register an agent at its spawn cell
    pub fn add_agent(&mut self, agent: AgentId, cell: WorldPoint) {
        self.agents.insert(
            agent,
            AgentRecord {
                cell,
                presence: AgentPresence::default(),
            },
        );
    }

    /// Number of agents still in the world
    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }
}

impl WorldSensor for GridWorld {
    fn objects_at(&self, cell: WorldPoint) -> Vec<Occupant> {
        let Some(idx) = self.index(cell) else {
            return Vec::new();
        };
        let mut occupants = Vec::new();
        if self.exit == Some(cell) {
            occupants.push(Occupant::Exit);
        }
        if self.obstacles[idx] {
            occupants.push(Occupant::Obstacle);
        }
        occupants.push(match self.markers[idx] {
            Marker::Undiscovered => Occupant::Undiscovered,
            Marker::Discovered => Occupant::Discovered,
        });
        for record in self.agents.values() {
            if record.cell == cell {
                occupants.push(Occupant::Explorer);
            }
        }
        occupants
    }

    fn neighborhood(&self, center: WorldPoint, radius: i32) -> Vec<WorldPoint> {
        let mut cells = Vec::new();
        for x in center.x - radius..=center.x + radius {
            for y in center.y - radius..=center.y + radius {
                let cell = WorldPoint::new(x, y);
                if self.frame.contains_world(cell) {
                    cells.push(cell);
                }
            }
        }
        cells
    }

    fn discover_cell(&mut self, cell: WorldPoint) {
        if let Some(idx) = self.index(cell) {
            self.markers[idx] = Marker::Discovered;
        }
    }
}

impl ExplorationHost for GridWorld {
    fn current_cell(&self, agent: AgentId) -> Option<WorldPoint> {
        self.agents.get(&agent).map(|r| r.cell)
    }

    fn move_to(&mut self, agent: AgentId, target: WorldPoint) -> bool {
        if !self.frame.contains_world(target) || self.has_obstacle(target) {
            return false;
        }
        let Some(record) = self.agents.get_mut(&agent) else {
            warn!("move_to for unknown agent {agent}");
            return false;
        };
        if !record.cell.is_adjacent(&target) {
            warn!("{agent}: refusing non-adjacent move {} -> {}", record.cell, target);
            return false;
        }
        record.cell = target;
        true
    }

    fn agents_within(&self, center: WorldPoint, radius: Option<i32>) -> Vec<AgentSighting> {
        self.agents
            .iter()
            .filter(|(_, record)| match radius {
                Some(r) => center.chebyshev_distance(&record.cell) <= r,
                None => true,
            })
            .map(|(id, record)| AgentSighting {
                id: *id,
                cell: record.cell,
                presence: record.presence,
            })
            .collect()
    }

    fn set_presence(&mut self, agent: AgentId, presence: AgentPresence) {
        if let Some(record) = self.agents.get_mut(&agent) {
            record.presence = presence;
        }
    }

    fn destroy_obstacle(&mut self, cell: WorldPoint) -> bool {
        match self.index(cell) {
            Some(idx) if self.obstacles[idx] => {
                self.obstacles[idx] = false;
                true
            }
            _ => false,
        }
    }

    fn remove_agent(&mut self, agent: AgentId) {
        self.agents.remove(&agent);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_parsing() {
        let scenario = Scenario::from_ascii(
            "\
            . . # E\n\
            . # . .\n\
            0 . . 1\n",
        )
        .unwrap();

        assert_eq!(scenario.width, 4);
        assert_eq!(scenario.height, 3);
        // Top row is the highest world y.
        assert_eq!(scenario.exit, Some(WorldPoint::new(3, 2)));
        assert!(scenario.obstacles.contains(&WorldPoint::new(2, 2)));
        assert!(scenario.obstacles.contains(&WorldPoint::new(1, 1)));
        assert_eq!(
            scenario.starts,
            vec![WorldPoint::new(0, 0), WorldPoint::new(3, 0)]
        );
    }

    #[test]
    fn test_ascii_rejects_bad_maps() {
        assert!(Scenario::from_ascii("").is_err());
        assert!(Scenario::from_ascii(".. \n.").is_err());
        assert!(Scenario::from_ascii("E E").is_err());
        assert!(Scenario::from_ascii(". q").is_err());
        // Agent ids must be contiguous from zero.
        assert!(Scenario::from_ascii(". 1").is_err());
    }

    #[test]
    fn test_random_is_deterministic() {
        let a = Scenario::random(20, 20, 3, 0.1, 7);
        let b = Scenario::random(20, 20, 3, 0.1, 7);
        assert_eq!(a.obstacles, b.obstacles);
        assert_eq!(a.exit, b.exit);
        assert_eq!(a.starts, b.starts);

        // Exit and spawns never land on obstacles.
        let exit = a.exit.unwrap();
        assert!(!a.obstacles.contains(&exit));
        for start in &a.starts {
            assert!(!a.obstacles.contains(start));
            assert_ne!(*start, exit);
        }
    }

    #[test]
    fn test_world_occupants_and_discovery() {
        let mut world = GridWorld::new(4, 4);
        world.place_exit(WorldPoint::new(3, 3));
        world.place_obstacle(WorldPoint::new(1, 1));
        world.add_agent(AgentId(0), WorldPoint::new(0, 0));

        let at_exit = world.objects_at(WorldPoint::new(3, 3));
        assert!(at_exit.contains(&Occupant::Exit));
        assert!(at_exit.contains(&Occupant::Undiscovered));

        let at_agent = world.objects_at(WorldPoint::new(0, 0));
        assert!(at_agent.contains(&Occupant::Explorer));

        world.discover_cell(WorldPoint::new(0, 0));
        assert!(world
            .objects_at(WorldPoint::new(0, 0))
            .contains(&Occupant::Discovered));
    }

    #[test]
    fn test_moves_respect_obstacles_and_adjacency() {
        let mut world = GridWorld::new(5, 5);
        world.place_obstacle(WorldPoint::new(1, 0));
        world.add_agent(AgentId(0), WorldPoint::new(0, 0));

        assert!(!world.move_to(AgentId(0), WorldPoint::new(1, 0)));
        assert!(!world.move_to(AgentId(0), WorldPoint::new(3, 3)));
        assert!(!world.move_to(AgentId(0), WorldPoint::new(-1, 0)));
        assert!(world.move_to(AgentId(0), WorldPoint::new(1, 1)));
        assert_eq!(world.current_cell(AgentId(0)), Some(WorldPoint::new(1, 1)));

        world.destroy_obstacle(WorldPoint::new(1, 0));
        assert!(world.move_to(AgentId(0), WorldPoint::new(1, 0)));
    }

    #[test]
    fn test_agents_within_radius() {
        let mut world = GridWorld::new(10, 10);
        world.add_agent(AgentId(0), WorldPoint::new(0, 0));
        world.add_agent(AgentId(1), WorldPoint::new(3, 3));
        world.add_agent(AgentId(2), WorldPoint::new(9, 9));

        let near = world.agents_within(WorldPoint::new(0, 0), Some(3));
        let ids: Vec<_> = near.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![AgentId(0), AgentId(1)]);

        let all = world.agents_within(WorldPoint::new(0, 0), None);
        assert_eq!(all.len(), 3);
    }
}
