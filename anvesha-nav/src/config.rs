//! Swarm configuration, loaded from a single YAML file.
//!
//! Every field has a default, so an empty document is a valid
//! configuration. Defaults mirror the reference scenario: a 15x15 grid,
//! vision radius 1, communication radius 10.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{NavError, Result};

mod defaults {
    pub fn grid_side() -> i32 {
        15
    }
    pub fn vision_radius() -> i32 {
        1
    }
    pub fn communication_radius() -> i32 {
        10
    }
    pub fn required_breakers() -> usize {
        2
    }
    pub fn guardian_patience() -> u64 {
        50
    }
}

/// Grid dimensions section.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct GridSection {
    /// Grid width in cells
    #[serde(default = "defaults::grid_side")]
    pub width: i32,

    /// Grid height in cells
    #[serde(default = "defaults::grid_side")]
    pub height: i32,
}

impl Default for GridSection {
    fn default() -> Self {
        Self {
            width: defaults::grid_side(),
            height: defaults::grid_side(),
        }
    }
}

/// Per-agent sensing and communication section.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AgentSection {
    /// How far an agent senses per tick (square neighborhood radius)
    #[serde(default = "defaults::vision_radius")]
    pub vision_radius: i32,

    /// How far a normal agent broadcasts and receives. Super agents
    /// ignore this and reach the whole grid.
    #[serde(default = "defaults::communication_radius")]
    pub communication_radius: i32,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            vision_radius: defaults::vision_radius(),
            communication_radius: defaults::communication_radius(),
        }
    }
}

/// Obstacle-clearing protocol section.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CoordinationSection {
    /// Agents required at the obstacle (guardian included) before it
    /// breaks
    #[serde(default = "defaults::required_breakers")]
    pub required_breakers: usize,

    /// Ticks a guardian holds out for a full quorum before breaking the
    /// obstacle anyway
    #[serde(default = "defaults::guardian_patience")]
    pub guardian_patience: u64,
}

impl Default for CoordinationSection {
    fn default() -> Self {
        Self {
            required_breakers: defaults::required_breakers(),
            guardian_patience: defaults::guardian_patience(),
        }
    }
}

/// Full swarm configuration.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct SwarmConfig {
    /// Grid settings
    #[serde(default)]
    pub grid: GridSection,

    /// Agent settings
    #[serde(default)]
    pub agent: AgentSection,

    /// Coordination settings
    #[serde(default)]
    pub coordination: CoordinationSection,
}

impl SwarmConfig {
    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Parse from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: SwarmConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.grid.width <= 0 || self.grid.height <= 0 {
            return Err(NavError::Config(format!(
                "grid must be non-empty, got {}x{}",
                self.grid.width, self.grid.height
            )));
        }
        if self.agent.vision_radius < 1 {
            return Err(NavError::Config(
                "vision_radius must be at least 1".into(),
            ));
        }
        if self.coordination.required_breakers < 1 {
            return Err(NavError::Config(
                "required_breakers must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
