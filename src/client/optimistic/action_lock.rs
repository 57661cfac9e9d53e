//! # Action Lock Table
//!
//! Per-entity set of action kinds with a local mutation in flight. While a
//! kind is blocked for an id, realtime notifications of that kind for that
//! id are echoes of the local mutation and must not be applied again.
//!
//! Inserts are special: an optimistic insert is keyed by a provisional id the
//! backend never sees, so the echo arrives under an id the table does not
//! know. Any outstanding insert therefore blocks notifications for every id
//! without an entry of its own. This is coarse; with several concurrent
//! inserts it also swallows unrelated legitimate inserts.

use crate::shared::event::ActionKind;
use crate::shared::shopping::EntityId;
use std::collections::{HashMap, HashSet};

/// In-flight local actions, keyed by entity id
#[derive(Debug, Default, Clone)]
pub struct ActionLockTable {
    blocked: HashMap<EntityId, HashSet<ActionKind>>,
}

impl ActionLockTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `kind` as in flight for `id`
    pub fn block_action(&mut self, id: EntityId, kind: ActionKind) {
        self.blocked.entry(id).or_default().insert(kind);
    }

    /// Clear `kind` for `id`; the entry goes away with its last kind
    pub fn release_action(&mut self, id: EntityId, kind: ActionKind) {
        if let Some(kinds) = self.blocked.get_mut(&id) {
            kinds.remove(&kind);
            if kinds.is_empty() {
                self.blocked.remove(&id);
            }
        }
    }

    /// Whether any id has `kind` in flight
    pub fn has_action(&self, kind: ActionKind) -> bool {
        self.blocked.values().any(|kinds| kinds.contains(&kind))
    }

    /// Whether a notification of `kind` for `id` must be ignored
    pub fn is_action_blocked(&self, id: EntityId, kind: ActionKind) -> bool {
        match self.blocked.get(&id) {
            Some(kinds) => kinds.contains(&kind),
            None => self.has_action(ActionKind::Insert),
        }
    }

    /// Kinds in flight for `id`
    pub fn blocked_kinds(&self, id: EntityId) -> Vec<ActionKind> {
        let mut kinds: Vec<ActionKind> = self
            .blocked
            .get(&id)
            .map(|kinds| kinds.iter().copied().collect())
            .unwrap_or_default();
        kinds.sort_by_key(|kind| kind.to_string());
        kinds
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.blocked.contains_key(&id)
    }

    /// Number of ids with at least one action in flight
    pub fn len(&self) -> usize {
        self.blocked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocked.is_empty()
    }
}
