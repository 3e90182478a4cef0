//! Change notifications for inventory entities
//!
//! Every committed write announces itself on the [`EventBus`] as a
//! [`ChangeEvent`]. Subscribers (the SSE endpoint, tests) receive events only
//! after the transaction that produced them has committed.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Entity class a change belongs to
///
/// Serialized names double as the SSE event names clients subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Product,
    Organization,
    Person,
    Imports,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Product => "product",
            EntityKind::Organization => "organization",
            EntityKind::Person => "person",
            EntityKind::Imports => "imports",
        }
    }
}

impl std::str::FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "product" => Ok(EntityKind::Product),
            "organization" => Ok(EntityKind::Organization),
            "person" => Ok(EntityKind::Person),
            "imports" => Ok(EntityKind::Imports),
            other => Err(format!("Unknown entity: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeAction {
    Created,
    Updated,
    Deleted,
}

/// One committed change
///
/// `id` is absent for collection-level notifications such as
/// "the import history changed".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub entity: EntityKind,
    pub action: ChangeAction,
    pub id: Option<i64>,
}

impl ChangeEvent {
    pub fn new(entity: EntityKind, action: ChangeAction, id: Option<i64>) -> Self {
        Self { entity, action, id }
    }

    pub fn created(entity: EntityKind, id: i64) -> Self {
        Self::new(entity, ChangeAction::Created, Some(id))
    }

    pub fn updated(entity: EntityKind, id: i64) -> Self {
        Self::new(entity, ChangeAction::Updated, Some(id))
    }

    pub fn deleted(entity: EntityKind, id: i64) -> Self {
        Self::new(entity, ChangeAction::Deleted, Some(id))
    }

    /// SSE event name for this change
    pub fn event_type(&self) -> &'static str {
        self.entity.as_str()
    }
}

/// Broadcast channel for committed changes
///
/// Cloning the bus shares the same channel. Slow subscribers lose the oldest
/// events once `capacity` is exceeded and see a `Lagged` error instead.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ChangeEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// ```
    /// use inventory_common::events::EventBus;
    ///
    /// let event_bus = EventBus::new(256);
    /// assert_eq!(event_bus.capacity(), 256);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: ChangeEvent,
    ) -> Result<usize, broadcast::error::SendError<ChangeEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: ChangeEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
