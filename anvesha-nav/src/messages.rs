//! Coordination messages and their transport.
//!
//! Messages are fire-and-forget: a sender never learns whether delivery
//! happened, and a missed matrix update is corrected by the next
//! broadcast. The transport guarantees FIFO ordering per sender-receiver
//! pair; nothing orders messages across senders.
//!
//! The [`MessageBus`] is the host-provided delivery primitive, built on
//! unbounded crossbeam channels - one inbox per registered agent. Sends
//! to unknown receivers are dropped silently, per the best-effort
//! protocol.

use std::collections::HashMap;

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::trace;

use anvesha_map::{OccupancyMatrix, WorldPoint};

use crate::host::AgentId;

/// Tagged message payload.
#[derive(Clone, Debug)]
pub enum Payload {
    /// A snapshot of the sender's occupancy matrix
    Matrix(Box<OccupancyMatrix>),
    /// The sender is blocked at an obstacle and requests assistance
    Help,
    /// The obstacle at the carried cell has been destroyed
    ObstacleDestroyed(WorldPoint),
    /// Another agent already guards the obstacle; the flag says whether
    /// that guardian is done and heading to the exit
    OtherGuarding {
        /// True once the obstacle is gone and the sender is leaving
        heading_to_exit: bool,
    },
    /// The sender is parked at the obstacle, ready to break it
    WaitingToBreak,
}

impl Payload {
    /// Short tag for logging
    pub fn tag(&self) -> &'static str {
        match self {
            Payload::Matrix(_) => "MATRIX",
            Payload::Help => "HELP",
            Payload::ObstacleDestroyed(_) => "OBSTACLE_DESTROYED",
            Payload::OtherGuarding { .. } => "OTHER_GUARDING",
            Payload::WaitingToBreak => "WAITING_TO_BREAK",
        }
    }
}

/// One sender to one receiver.
#[derive(Clone, Debug)]
pub struct IndividualMessage {
    pub sender: AgentId,
    pub receiver: AgentId,
    pub payload: Payload,
}

/// One sender to many receivers.
#[derive(Clone, Debug)]
pub struct GroupMessage {
    pub sender: AgentId,
    pub receivers: Vec<AgentId>,
    pub payload: Payload,
}

/// Receiving end of an agent's inbox.
#[derive(Debug)]
pub struct Mailbox {
    rx: Receiver<IndividualMessage>,
}

impl Mailbox {
    /// Drain every message queued since the last drain
    pub fn drain(&self) -> Vec<IndividualMessage> {
        self.rx.try_iter().collect()
    }
}

/// Reliable point-to-point and group delivery.
///
/// Cloning the bus clones the sender handles only; all clones feed the
/// same inboxes.
#[derive(Clone, Debug, Default)]
pub struct MessageBus {
    inboxes: HashMap<AgentId, Sender<IndividualMessage>>,
}

impl MessageBus {
    /// Create an empty bus
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an agent and hand back its mailbox
    pub fn register(&mut self, agent: AgentId) -> Mailbox {
        let (tx, rx) = unbounded();
        self.inboxes.insert(agent, tx);
        Mailbox { rx }
    }

    /// Deliver a point-to-point message. Unknown receivers drop silently.
    pub fn send(&self, message: IndividualMessage) {
        trace!(
            "{} -> {}: {}",
            message.sender,
            message.receiver,
            message.payload.tag()
        );
        if let Some(tx) = self.inboxes.get(&message.receiver) {
            // A receiver that disappeared mid-send is equivalent to a
            // dropped message.
            let _ = tx.send(message);
        }
    }

    /// Deliver a group message as one send per receiver
    pub fn broadcast(&self, message: GroupMessage) {
        for receiver in &message.receivers {
            self.send(IndividualMessage {
                sender: message.sender,
                receiver: *receiver,
                payload: message.payload.clone(),
            });
        }
    }
}
