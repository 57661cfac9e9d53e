//! Shared Module
//!
//! Platform-agnostic value types: the shopping DTOs, realtime change
//! notifications and their classifier, error kinds and configuration.
//! Everything here is plain data and serializes with serde.

/// Shopping list DTOs and helpers
pub mod shopping;

/// Realtime change notifications and classification
pub mod event;

/// Shared error types
pub mod error;

/// Application configuration
pub mod config;

/// Re-export commonly used types for convenience
pub use config::{AppConfig, AppConfigBuilder, ConfigError};
pub use error::{NetworkError, RpcResult, SharedError};
pub use event::{classify, ActionKind, ChangeNotification, HasId, InvalidChangePayload, RawChange};
pub use shopping::{
    group_products_by_category, parse_list_id, Category, CategoryWithProducts, EntityId,
    ShoppingList, ShoppingListChange, ShoppingListDetails, ShoppingListRow, UnitEnum,
};
