//! # Anvesha-Nav: Agent Behavior and Coordination
//!
//! The agent layer of the Anvesha exploration engine. Each [`Explorer`]
//! runs once per simulated tick with a fixed internal phase order:
//!
//! ```text
//! 1. vision sweep + transient obstacle marking
//! 2. active state execution (may move, plan, or request transitions)
//! 3. inbound message drain (may merge maps, may force transitions)
//! 4. outbound matrix broadcast to peers in communication range
//! 5. transient mark clearing
//! ```
//!
//! Later phases depend on earlier phases' side effects within the same
//! tick, so the order is load-bearing - an obstacle learned through a merge
//! must never be mistaken for another agent passing by.
//!
//! Agents cooperate only through messages and through what the host lets
//! them see; each owns its matrix, node grid, and state stack outright.
//! The [`sim`] module provides a deterministic in-process host for tests
//! and the demo binary.

pub mod behavior;
pub mod config;
pub mod error;
pub mod explorer;
pub mod host;
pub mod messages;
pub mod sim;

pub use behavior::{BehaviorState, StateStack};
pub use config::SwarmConfig;
pub use error::NavError;
pub use explorer::{AgentKind, Explorer};
pub use host::{AgentId, AgentPresence, AgentSighting, ExplorationHost, Posture};
pub use messages::{GroupMessage, IndividualMessage, Mailbox, MessageBus, Payload};
pub use sim::{GridWorld, RunSummary, Scenario, SwarmRunner};
