//! Realtime Change Notifications
//!
//! Row-level change notifications pushed by the backend, and the classifier
//! that decides whether a notification is an insert, an update or a delete.
//!
//! A notification is a `(record, old_record)` pair where either side may be
//! absent. The transport hands notifications over as [`RawChange`] (untyped
//! JSON); [`RawChange::decode`] is the single step that turns them into typed
//! rows.

use crate::shared::error::SharedError;
use crate::shared::shopping::{
    EntityId, RecordId, ShoppingList, ShoppingListChange, ShoppingListDesc, ShoppingListDetails,
    ShoppingListRow,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Kind of operation affecting one entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Insert,
    Update,
    Delete,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActionKind::Insert => "insert",
            ActionKind::Update => "update",
            ActionKind::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// Both sides of a change notification were absent
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("change notification carries neither a record nor an old record")]
pub struct InvalidChangePayload;

/// Anything carrying a row id
pub trait HasId {
    fn id(&self) -> EntityId;
}

impl HasId for RecordId {
    fn id(&self) -> EntityId {
        self.id
    }
}

impl HasId for ShoppingListRow {
    fn id(&self) -> EntityId {
        self.id
    }
}

impl HasId for ShoppingListChange {
    fn id(&self) -> EntityId {
        self.id
    }
}

impl HasId for ShoppingList {
    fn id(&self) -> EntityId {
        self.id
    }
}

impl HasId for ShoppingListDesc {
    fn id(&self) -> EntityId {
        self.id
    }
}

impl HasId for ShoppingListDetails {
    fn id(&self) -> EntityId {
        self.id
    }
}

impl HasId for serde_json::Value {
    /// Ids that are missing or not integers read as 0, which no row uses
    fn id(&self) -> EntityId {
        self.get("id").and_then(|v| v.as_i64()).unwrap_or_default()
    }
}

/// A row-level change notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeNotification<R, O> {
    /// Row after the change; absent for deletes
    #[serde(default)]
    pub record: Option<R>,
    /// Row before the change; absent for inserts
    #[serde(default)]
    pub old_record: Option<O>,
    /// Commit timestamp reported by the backend
    #[serde(default)]
    pub commit_timestamp: Option<String>,
}

/// Untyped notification as delivered by a transport
pub type RawChange = ChangeNotification<serde_json::Value, serde_json::Value>;

impl<R, O> ChangeNotification<R, O> {
    pub fn insert(record: R) -> Self {
        Self {
            record: Some(record),
            old_record: None,
            commit_timestamp: None,
        }
    }

    pub fn update(record: R, old_record: O) -> Self {
        Self {
            record: Some(record),
            old_record: Some(old_record),
            commit_timestamp: None,
        }
    }

    pub fn delete(old_record: O) -> Self {
        Self {
            record: None,
            old_record: Some(old_record),
            commit_timestamp: None,
        }
    }

    pub fn with_commit_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.commit_timestamp = Some(timestamp.into());
        self
    }
}

impl<R: HasId, O: HasId> ChangeNotification<R, O> {
    /// Id the change applies to: the new record's, else the old record's
    pub fn entity_id(&self) -> Option<EntityId> {
        self.record
            .as_ref()
            .map(HasId::id)
            .or_else(|| self.old_record.as_ref().map(HasId::id))
    }
}

impl RawChange {
    /// Decode both sides into typed rows.
    ///
    /// `null` and empty objects both count as an absent side; some feeds send
    /// `{}` as the old record of an insert.
    pub fn decode<R, O>(self) -> Result<ChangeNotification<R, O>, SharedError>
    where
        R: DeserializeOwned,
        O: DeserializeOwned,
    {
        Ok(ChangeNotification {
            record: decode_side(self.record)?,
            old_record: decode_side(self.old_record)?,
            commit_timestamp: self.commit_timestamp,
        })
    }
}

fn decode_side<T: DeserializeOwned>(
    value: Option<serde_json::Value>,
) -> Result<Option<T>, SharedError> {
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::Object(map)) if map.is_empty() => Ok(None),
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
    }
}

/// Classify a notification by which of its sides are present
pub fn classify<R, O>(
    notification: &ChangeNotification<R, O>,
) -> Result<ActionKind, InvalidChangePayload> {
    match (&notification.record, &notification.old_record) {
        (Some(_), None) => Ok(ActionKind::Insert),
        (Some(_), Some(_)) => Ok(ActionKind::Update),
        (None, Some(_)) => Ok(ActionKind::Delete),
        (None, None) => Err(InvalidChangePayload),
    }
}
