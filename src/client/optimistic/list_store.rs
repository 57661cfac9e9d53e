//! # Optimistic List Store
//!
//! Ordered, id-unique mirror of a server collection. Every mutation
//! publishes a fresh snapshot on a `watch` channel so views re-render
//! without polling.

use super::{Entity, EntityPatch};
use crate::shared::shopping::EntityId;
use thiserror::Error;
use tokio::sync::watch;

/// Store errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("invalid entity: {0}")]
    InvalidEntity(String),
}

/// Ordered collection of entities, at most one per id
#[derive(Debug)]
pub struct OptimisticListStore<T: Entity> {
    items: Vec<T>,
    snapshots: watch::Sender<Vec<T>>,
}

impl<T: Entity> Default for OptimisticListStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> OptimisticListStore<T> {
    pub fn new() -> Self {
        let (snapshots, _) = watch::channel(Vec::new());
        Self {
            items: Vec::new(),
            snapshots,
        }
    }

    /// Receiver of every published snapshot
    pub fn subscribe(&self) -> watch::Receiver<Vec<T>> {
        self.snapshots.subscribe()
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Entity with `id` and its position
    pub fn get_item(&self, id: impl Into<Option<EntityId>>) -> Option<(usize, &T)> {
        let index = self.get_item_index(id)?;
        self.items.get(index).map(|item| (index, item))
    }

    /// Position of the entity with `id`
    pub fn get_item_index(&self, id: impl Into<Option<EntityId>>) -> Option<usize> {
        let id = id.into()?;
        self.items.iter().position(|item| item.id() == id)
    }

    /// Insert or merge `patch`, returning the position it ended up at.
    ///
    /// - No entity with the patch id and no `index`: appended as-is.
    /// - No entity with the patch id, `index` given: inserted there, or,
    ///   with `overwrite`, replaces whatever sits at `index`.
    /// - Entity found: the stored value is the existing entity with the
    ///   patch fields laid over it, placed at `index` (or where it was).
    pub fn upsert_item(
        &mut self,
        patch: Option<EntityPatch>,
        index: Option<usize>,
        overwrite: bool,
    ) -> Result<usize, StoreError> {
        let patch =
            patch.ok_or_else(|| StoreError::InvalidEntity("no entity supplied".to_string()))?;
        let found = self.get_item_index(patch.id());
        let merged: T = patch.merge_into(found.map(|i| &self.items[i]))?;

        let position = match (found, index) {
            (Some(current), target) => {
                let target = target.unwrap_or(current);
                if target == current {
                    self.items[current] = merged;
                    current
                } else {
                    self.items.remove(current);
                    let target = target.min(self.items.len());
                    self.items.insert(target, merged);
                    target
                }
            }
            (None, Some(target)) if overwrite && target < self.items.len() => {
                self.items[target] = merged;
                target
            }
            (None, Some(target)) => {
                let target = target.min(self.items.len());
                self.items.insert(target, merged);
                target
            }
            (None, None) => {
                self.items.push(merged);
                self.items.len() - 1
            }
        };

        self.publish();
        Ok(position)
    }

    /// Upsert a complete entity
    pub fn upsert_entity(
        &mut self,
        entity: &T,
        index: Option<usize>,
        overwrite: bool,
    ) -> Result<usize, StoreError> {
        let patch = EntityPatch::from_entity(entity)?;
        self.upsert_item(Some(patch), index, overwrite)
    }

    /// Remove the entity with `id`, if present
    pub fn delete_item(&mut self, id: impl Into<Option<EntityId>>) -> Option<T> {
        let index = self.get_item_index(id)?;
        let removed = self.items.remove(index);
        self.publish();
        Some(removed)
    }

    /// Replace the whole sequence with an authoritative one.
    ///
    /// Later duplicates of an id are dropped.
    pub fn replace_all(&mut self, items: Vec<T>) {
        let mut seen = std::collections::HashSet::with_capacity(items.len());
        self.items = items
            .into_iter()
            .filter(|item| seen.insert(item.id()))
            .collect();
        self.publish();
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.items.clone());
    }
}
