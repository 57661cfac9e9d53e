//! Optimistic local state
//!
//! The client applies its own mutations immediately and reconciles with the
//! backend afterwards. This module holds the ordered entity store and the
//! table of actions in flight.

pub mod action_lock;
pub mod list_store;

pub use action_lock::ActionLockTable;
pub use list_store::{OptimisticListStore, StoreError};

use crate::shared::event::HasId;
use crate::shared::shopping::EntityId;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

/// Anything an [`OptimisticListStore`] can hold
pub trait Entity: HasId + Clone + Serialize + DeserializeOwned + Send + Sync + 'static {}

impl<T> Entity for T where T: HasId + Clone + Serialize + DeserializeOwned + Send + Sync + 'static {}

/// Partial entity: an id plus any subset of fields.
///
/// Applied with shallow merge semantics; each supplied top-level field
/// replaces the stored one, nested objects included.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityPatch {
    id: EntityId,
    fields: Map<String, Value>,
}

impl EntityPatch {
    pub fn new(id: EntityId) -> Self {
        Self {
            id,
            fields: Map::new(),
        }
    }

    /// Set one field
    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    /// Set `field` only when `value` is present
    pub fn set_some<V: Into<Value>>(self, field: &str, value: Option<V>) -> Self {
        match value {
            Some(value) => self.set(field, value),
            None => self,
        }
    }

    /// Every field of a complete entity
    pub fn from_entity<T: Serialize + HasId>(entity: &T) -> Result<Self, StoreError> {
        let value = serde_json::to_value(entity)
            .map_err(|e| StoreError::InvalidEntity(e.to_string()))?;
        Self::from_value(value)
    }

    /// JSON object with an integer `id` field
    pub fn from_value(value: Value) -> Result<Self, StoreError> {
        let Value::Object(mut fields) = value else {
            return Err(StoreError::InvalidEntity(
                "entity is not a JSON object".to_string(),
            ));
        };
        let id = fields
            .remove("id")
            .and_then(|id| id.as_i64())
            .ok_or_else(|| StoreError::InvalidEntity("entity has no integer id".to_string()))?;
        Ok(Self { id, fields })
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Lay the patch over `base` (or over nothing) and decode the result
    pub fn merge_into<T: Entity>(self, base: Option<&T>) -> Result<T, StoreError> {
        let mut merged = match base {
            Some(base) => match serde_json::to_value(base) {
                Ok(Value::Object(map)) => map,
                Ok(_) => {
                    return Err(StoreError::InvalidEntity(
                        "stored entity is not a JSON object".to_string(),
                    ))
                }
                Err(e) => return Err(StoreError::InvalidEntity(e.to_string())),
            },
            None => Map::new(),
        };
        merged.extend(self.fields);
        merged.insert("id".to_string(), Value::from(self.id));
        serde_json::from_value(Value::Object(merged))
            .map_err(|e| StoreError::InvalidEntity(e.to_string()))
    }
}
