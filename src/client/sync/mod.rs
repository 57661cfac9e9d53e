//! # Shopping List Synchronisation
//!
//! Reconcilers keep a client-side copy of a server collection in step with
//! the backend. Local mutations are applied optimistically and confirmed or
//! rolled back once the backend answers; realtime notifications from other
//! clients are folded in unless a local action for the same entity is still
//! in flight.
//!
//! Two reconcilers are provided:
//!
//! - [`ShoppingListSync`]: the items of one shopping list
//! - [`ShoppingListsSync`]: the collection of shopping lists
//!
//! Both share the engine in [`reconciler`].

pub mod reconciler;
pub mod shopping_list;
pub mod shopping_lists;

pub use reconciler::{ChangeSource, Reconciler, Rollback, SyncState};
pub use shopping_list::{AddItem, ShoppingListSync, UpdateItem};
pub use shopping_lists::{ShoppingListsSync, UpdateList};

use crate::client::optimistic::StoreError;
use crate::client::realtime::RealtimeError;
use crate::shared::error::{NetworkError, SharedError};
use crate::shared::event::InvalidChangePayload;
use crate::shared::shopping::EntityId;
use thiserror::Error;

/// Errors returned by reconciler operations
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SyncError {
    /// Input rejected before any state was touched
    #[error("Validation error in field '{field}': {message}")]
    Validation { field: String, message: String },

    /// The operation targeted an entity the store does not hold
    #[error("{what} {id} not found")]
    NotFound { what: &'static str, id: EntityId },

    /// The backend call failed; the optimistic change was rolled back
    #[error("backend call failed: {0}")]
    Network(NetworkError),

    #[error("invalid entity: {0}")]
    InvalidEntity(String),

    #[error("{0}")]
    InvalidChangePayload(#[from] InvalidChangePayload),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("subscription failed: {0}")]
    Subscription(String),
}

impl SyncError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        SyncError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Backend error kind, if this is a backend failure
    pub fn network_kind(&self) -> Option<NetworkError> {
        match self {
            SyncError::Network(kind) => Some(*kind),
            _ => None,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, SyncError::Validation { .. })
    }
}

impl From<NetworkError> for SyncError {
    fn from(kind: NetworkError) -> Self {
        SyncError::Network(kind)
    }
}

impl From<StoreError> for SyncError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidEntity(message) => SyncError::InvalidEntity(message),
        }
    }
}

impl From<SharedError> for SyncError {
    fn from(err: SharedError) -> Self {
        match err {
            SharedError::ValidationError { field, message } => {
                SyncError::Validation { field, message }
            }
            SharedError::SerializationError { message } => SyncError::Serialization(message),
        }
    }
}

impl From<RealtimeError> for SyncError {
    fn from(err: RealtimeError) -> Self {
        SyncError::Subscription(err.to_string())
    }
}

/// Result of a [`refresh`](ShoppingListSync::refresh)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The fetched collection replaced the local one
    Applied,
    /// A local action was in flight; the fetched collection was discarded
    Deferred,
}

/// Reject names that are empty once trimmed
pub(crate) fn validate_name(name: &str) -> Result<(), SyncError> {
    if name.trim().is_empty() {
        return Err(SyncError::validation("name", "Name must not be empty"));
    }
    Ok(())
}
