//! Commit-gated change notification
//!
//! Writes made inside an open transaction are staged here instead of being
//! published. Ids assigned by an uncommitted insert are not final (a rollback
//! frees them for reuse), so nothing leaves the gate until the caller has seen
//! the commit succeed.

use inventory_common::events::{ChangeAction, ChangeEvent, EntityKind, EventBus};
use tracing::debug;

/// One staged change awaiting commit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingChange {
    pub entity: EntityKind,
    pub action: ChangeAction,
    pub id: i64,
}

/// Buffer of changes made by one transaction
///
/// `release` and `discard` consume the gate, so a batch's events can be
/// published at most once.
#[derive(Debug, Default)]
pub struct CommitGate {
    pending: Vec<PendingChange>,
}

impl CommitGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&mut self, entity: EntityKind, action: ChangeAction, id: i64) {
        self.pending.push(PendingChange { entity, action, id });
    }

    pub fn pending(&self) -> &[PendingChange] {
        &self.pending
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Publish every staged change in staging order, then one collection-level
    /// "imports updated" signal. Call only after the transaction committed.
    pub fn release(self, event_bus: &EventBus) -> usize {
        let count = self.pending.len();
        for change in self.pending {
            event_bus.emit_lossy(ChangeEvent::new(change.entity, change.action, Some(change.id)));
        }
        event_bus.emit_lossy(ChangeEvent::new(EntityKind::Imports, ChangeAction::Updated, None));
        debug!(released = count, "Released staged change events");
        count
    }

    /// Drop every staged change without publishing (transaction rolled back)
    pub fn discard(self) -> usize {
        let count = self.pending.len();
        debug!(discarded = count, "Discarded staged change events");
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_release_emits_in_order_then_imports_signal() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        let mut gate = CommitGate::new();
        gate.stage(EntityKind::Organization, ChangeAction::Created, 1);
        gate.stage(EntityKind::Product, ChangeAction::Created, 10);
        assert_eq!(gate.len(), 2);

        assert_eq!(gate.release(&bus), 2);

        assert_eq!(rx.recv().await.unwrap(), ChangeEvent::created(EntityKind::Organization, 1));
        assert_eq!(rx.recv().await.unwrap(), ChangeEvent::created(EntityKind::Product, 10));
        let last = rx.recv().await.unwrap();
        assert_eq!(last.entity, EntityKind::Imports);
        assert_eq!(last.id, None);
    }

    #[test]
    fn test_discard_emits_nothing() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        let mut gate = CommitGate::new();
        gate.stage(EntityKind::Person, ChangeAction::Created, 5);
        assert_eq!(gate.discard(), 1);

        assert!(rx.try_recv().is_err());
    }
}
