use dashmap::DashMap;
use std::time::{Duration, Instant};

use crate::actor::ActorId;
use crate::coord::Location;
use crate::item::ItemKey;

/// What a pending reply will be applied to
#[derive(Debug, Clone, PartialEq)]
pub enum PendingKind {
    /// Reply text is the unit price for a new shop
    Create {
        item: ItemKey,
        sign_block: Option<Location>,
    },
    /// Reply text is a trade quantity
    Trade { item: ItemKey },
}

/// A single in-flight intent awaiting an actor's free-text reply
#[derive(Debug, Clone)]
pub struct PendingAction {
    pub kind: PendingKind,
    pub target: Location,
    pub created_at: Instant,
}

impl PendingAction {
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }
}

/// At most one pending action per actor; a newer intent silently
/// replaces an older one.
pub struct PendingActionTable {
    actions: DashMap<ActorId, PendingAction>,
}

impl PendingActionTable {
    pub fn new() -> Self {
        Self {
            actions: DashMap::new(),
        }
    }

    /// Register an intent, replacing any prior one for the same actor
    pub fn put(&self, actor: ActorId, kind: PendingKind, target: Location) {
        self.actions.insert(
            actor,
            PendingAction {
                kind,
                target,
                created_at: Instant::now(),
            },
        );
    }

    /// Consume the actor's pending action, if any. The entry is gone
    /// whether or not the caller's validation later succeeds.
    pub fn take(&self, actor: &ActorId) -> Option<PendingAction> {
        self.actions.remove(actor).map(|(_, action)| action)
    }

    /// Drop an actor's pending action without running it
    pub fn cancel(&self, actor: &ActorId) -> bool {
        self.actions.remove(actor).is_some()
    }

    pub fn contains(&self, actor: &ActorId) -> bool {
        self.actions.contains_key(actor)
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn clear(&self) {
        self.actions.clear();
    }
}

impl Default for PendingActionTable {
    fn default() -> Self {
        Self::new()
    }
}
