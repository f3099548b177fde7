//! Topic-based event bus implementation.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use super::types::{RegistryEvent, TeleportEvent};

const DEFAULT_CAPACITY: usize = 100;

/// Topics for event routing
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum Topic {
    /// Teleport outcomes, successful or not
    Teleport,
    /// Binding changes in the location registry
    Registry,
}

/// Event wrapper that carries the topic and typed event
#[derive(Debug, Clone)]
pub enum Event {
    Teleport(TeleportEvent),
    Registry(RegistryEvent),
}

impl Event {
    pub fn topic(&self) -> Topic {
        match self {
            Event::Teleport(_) => Topic::Teleport,
            Event::Registry(_) => Topic::Registry,
        }
    }
}

impl From<TeleportEvent> for Event {
    fn from(event: TeleportEvent) -> Self {
        Event::Teleport(event)
    }
}

impl From<RegistryEvent> for Event {
    fn from(event: RegistryEvent) -> Self {
        Event::Registry(event)
    }
}

/// Topic-based event bus
///
/// Each topic owns a broadcast channel created up front, so publishing and
/// subscribing never contend on a lock. Clones share the same channels.
#[derive(Clone)]
pub struct EventBus {
    teleport: broadcast::Sender<Event>,
    registry: broadcast::Sender<Event>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            teleport: broadcast::channel(capacity).0,
            registry: broadcast::channel(capacity).0,
        }
    }

    fn sender(&self, topic: Topic) -> &broadcast::Sender<Event> {
        match topic {
            Topic::Teleport => &self.teleport,
            Topic::Registry => &self.registry,
        }
    }

    /// Publish an event to its topic. Events are best-effort.
    pub fn publish(&self, event: impl Into<Event>) {
        let event = event.into();
        let topic = event.topic();
        if self.sender(topic).send(event).is_err() {
            tracing::trace!("No subscribers for topic {:?}", topic);
        }
    }

    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.sender(topic).subscribe()
    }

    pub fn subscribe_multiple(
        &self,
        topics: &[Topic],
    ) -> HashMap<Topic, broadcast::Receiver<Event>> {
        topics
            .iter()
            .map(|&topic| (topic, self.subscribe(topic)))
            .collect()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
