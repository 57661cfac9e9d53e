//! Basket Sync - Main Library
//!
//! Client-side state for a shared shopping list application. Lists and their
//! items live on a remote backend that exposes stored procedures and pushes
//! row-level change notifications; this library keeps a local mirror of that
//! state that reacts instantly to the user and stays consistent with every
//! other client.
//!
//! # Overview
//!
//! - Optimistic mutations: applied locally at once, confirmed or rolled back
//!   when the backend answers
//! - Realtime reconciliation: changes from other clients are folded in,
//!   echoes of in-flight local actions are suppressed
//! - Reactive snapshots: every change to a list publishes a new snapshot on a
//!   `tokio::sync::watch` channel
//!
//! # Module Structure
//!
//! - **`shared`** - Platform-agnostic value types
//!   - Shopping DTOs and RPC parameters
//!   - Change notifications and their classifier
//!   - Error kinds and configuration
//!
//! - **`client`** - Async client machinery
//!   - RPC transport and the remote facade (`http` feature)
//!   - Realtime subscriptions
//!   - Optimistic store, action lock table and reconcilers
//!
//! # Feature Flags
//!
//! - **`http`** (default) - `reqwest`-based RPC transport and the
//!   `basket-watch` binary
//!
//! # Concurrency
//!
//! Reconcilers are shared as `Arc`s and may be driven from any task. Store
//! and lock table are guarded by one short-lived mutex that is never held
//! across an `.await`; ordering between a local mutation and a realtime
//! notification for the same entity is decided by the action lock table.
//!
//! # Error Handling
//!
//! - `NetworkError` - closed set of backend failure kinds
//! - `SharedError` - validation and serialization failures of value types
//! - `SyncError` - everything a reconciler operation can return

/// Shared types and data structures
pub mod shared;

/// Client-side transport, realtime and reconciliation
pub mod client;
