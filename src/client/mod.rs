//! Client Module
//!
//! Stateful, async client-side machinery: the RPC transport, the remote
//! facade over the backend's stored procedures, realtime subscriptions and
//! the reconcilers that keep local list state in step with all of it.
//!
//! # Architecture
//!
//! - **`config`** - Runtime configuration (backend URL, keys, env overrides)
//! - **`remote`** - HTTP transport for stored procedure calls (`http` feature)
//! - **`api`** - `ShoppingListApi`, one method per stored procedure
//! - **`realtime`** - Channel subscriptions and the in-process hub
//! - **`optimistic`** - Ordered entity store and action lock table
//! - **`sync`** - Reconcilers for list items and for the list collection
//!
//! # Module Structure
//!
//! ```text
//! client/
//! ├── mod.rs         - Module exports and documentation
//! ├── config.rs      - Configuration with env overrides
//! ├── remote.rs      - RPC transport
//! ├── api.rs         - Remote facade trait and RPC implementation
//! ├── realtime.rs    - Realtime subscriptions
//! ├── optimistic/    - Store, lock table, entity patches
//! └── sync/          - Reconciliation engine and reconcilers
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use basket_sync::client::{
//!     Config, LocalRealtimeHub, RemoteClient, RpcShoppingListApi, ShoppingListsSync,
//! };
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load_default()?;
//! let api = Arc::new(RpcShoppingListApi::new(RemoteClient::new(config.clone())?));
//! let hub = Arc::new(LocalRealtimeHub::new(config.channel_buffer()));
//!
//! let lists = ShoppingListsSync::new(api, hub, &config);
//! lists.refresh().await?;
//! lists.listen_for_changes().await?;
//! let created = lists.create_list("Weekend").await?;
//! println!("created list {}", created.id);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod optimistic;
pub mod realtime;
pub mod sync;

#[cfg(feature = "http")]
pub mod remote;

pub use api::ShoppingListApi;
#[cfg(feature = "http")]
pub use api::RpcShoppingListApi;
pub use config::Config;
pub use optimistic::{ActionLockTable, Entity, EntityPatch, OptimisticListStore, StoreError};
pub use realtime::{
    shopping_list_channel_name, ChannelSubscriptions, LocalRealtimeHub, RealtimeError,
    RealtimeTransport, TableFilter, SHOPPING_LISTS_CHANNEL,
};
#[cfg(feature = "http")]
pub use remote::RemoteClient;
pub use sync::{
    AddItem, RefreshOutcome, ShoppingListSync, ShoppingListsSync, SyncError, UpdateItem,
    UpdateList,
};
