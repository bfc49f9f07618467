//! Closed-loop swarm runner.
//!
//! Owns the world, the agents, and the message bus, and visits every
//! agent once per tick in id order - the same scheduling contract the
//! external host provides. Used by the integration tests and the demo
//! binary.

use log::{debug, info};

use crate::config::SwarmConfig;
use crate::error::{NavError, Result};
use crate::explorer::{AgentKind, Explorer};
use crate::host::AgentId;
use crate::messages::MessageBus;

use super::{GridWorld, Scenario};

/// Outcome of a bounded run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunSummary {
    /// Ticks executed
    pub ticks: u64,
    /// Agents that finished and left
    pub finished: usize,
    /// Agents the run started with
    pub agents: usize,
}

impl RunSummary {
    /// Did every agent make it out?
    #[inline]
    pub fn complete(&self) -> bool {
        self.finished == self.agents
    }
}

/// The world, its agents, and their bus.
pub struct SwarmRunner {
    world: GridWorld,
    explorers: Vec<Explorer>,
    ticks: u64,
}

impl SwarmRunner {
    /// Assemble a runner from a scenario.
    ///
    /// The scenario's dimensions override the configured grid section;
    /// everything else comes from `config`. The scenario's first
    /// `super_agents` agents get unbounded communication reach.
    pub fn new(scenario: &Scenario, config: SwarmConfig) -> Result<Self> {
        if scenario.starts.is_empty() {
            return Err(NavError::Scenario("scenario places no agents".into()));
        }
        let mut config = config;
        config.grid.width = scenario.width;
        config.grid.height = scenario.height;

        let mut world = GridWorld::from_scenario(scenario);
        let mut bus = MessageBus::new();

        // Register every inbox before handing out bus clones, so each
        // agent can reach all the others from tick zero.
        let mailboxes: Vec<_> = (0..scenario.starts.len())
            .map(|i| bus.register(AgentId(i as u32)))
            .collect();

        let mut explorers = Vec::with_capacity(scenario.starts.len());
        for (i, (mailbox, start)) in mailboxes
            .into_iter()
            .zip(scenario.starts.iter())
            .enumerate()
        {
            let id = AgentId(i as u32);
            let kind = if i < scenario.super_agents {
                AgentKind::Super
            } else {
                AgentKind::Normal
            };
            world.add_agent(id, *start);
            explorers.push(Explorer::new(id, kind, config, *start, bus.clone(), mailbox));
        }

        Ok(Self {
            world,
            explorers,
            ticks: 0,
        })
    }

    /// Run one tick: every agent, in id order
    pub fn step(&mut self) {
        for explorer in &mut self.explorers {
            explorer.tick(&mut self.world);
        }
        self.ticks += 1;
    }

    /// Step until every agent has left or the tick cap is hit
    pub fn run(&mut self, max_ticks: u64) -> RunSummary {
        while self.ticks < max_ticks && !self.all_finished() {
            self.step();
        }
        let summary = RunSummary {
            ticks: self.ticks,
            finished: self.explorers.iter().filter(|e| e.finished()).count(),
            agents: self.explorers.len(),
        };
        if summary.complete() {
            info!("swarm finished in {} ticks", summary.ticks);
        } else {
            debug!(
                "run stopped at {} ticks with {}/{} agents finished",
                summary.ticks, summary.finished, summary.agents
            );
        }
        summary
    }

    /// Have all agents left the simulation?
    pub fn all_finished(&self) -> bool {
        self.explorers.iter().all(|e| e.finished())
    }

    /// Ticks executed so far
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// The agents, in id order
    pub fn explorers(&self) -> &[Explorer] {
        &self.explorers
    }

    /// One agent by id
    pub fn explorer(&self, id: AgentId) -> Option<&Explorer> {
        self.explorers.iter().find(|e| e.id() == id)
    }

    /// The simulated world
    pub fn world(&self) -> &GridWorld {
        &self.world
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runner_rejects_empty_scenario() {
        let scenario = Scenario {
            width: 5,
            height: 5,
            obstacles: Vec::new(),
            exit: None,
            starts: Vec::new(),
            super_agents: 0,
        };
        assert!(SwarmRunner::new(&scenario, SwarmConfig::default()).is_err());
    }

    #[test]
    fn test_scenario_dimensions_override_config() {
        let scenario = Scenario::from_ascii("0 .\n. .\n. E\n").unwrap();
        let runner = SwarmRunner::new(&scenario, SwarmConfig::default()).unwrap();
        assert_eq!(runner.world().frame().width(), 2);
        assert_eq!(runner.world().frame().height(), 3);
        assert_eq!(
            runner.explorer(AgentId(0)).unwrap().matrix().frame(),
            runner.world().frame()
        );
    }
}
