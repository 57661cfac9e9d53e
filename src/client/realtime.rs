//! # Realtime Channels
//!
//! Boundary to the backend's row-change feed, plus the client-side bookkeeping
//! of which channels are subscribed.
//!
//! ## Components
//!
//! - **`RealtimeTransport`**: subscribe/unsubscribe by channel name, yielding a
//!   stream of [`RawChange`] notifications
//! - **`ChannelSubscriptions`**: at most one live subscription per channel
//!   name; re-subscribing disposes the previous one first
//! - **`LocalRealtimeHub`**: in-process transport over tokio broadcast
//!   channels, used for tests and local demos
//!
//! ## Usage
//!
//! ```rust,no_run
//! use basket_sync::client::realtime::{ChannelSubscriptions, LocalRealtimeHub, TableFilter};
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let hub = Arc::new(LocalRealtimeHub::new(64));
//! let subscriptions = ChannelSubscriptions::new(hub.clone());
//! subscriptions
//!     .listen("shopping-lists", TableFilter::table("shopping_lists"), |change| async move {
//!         println!("{:?}", change);
//!     })
//!     .await
//!     .unwrap();
//! # }
//! ```

use crate::shared::event::RawChange;
use crate::shared::shopping::EntityId;
use async_trait::async_trait;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use uuid::Uuid;

/// Channel carrying changes to the collection of lists
pub const SHOPPING_LISTS_CHANNEL: &str = "shopping-lists";
/// Table holding list summaries
pub const SHOPPING_LISTS_TABLE: &str = "shopping_lists";
/// Table holding the items of every list
pub const SHOPPING_LIST_ITEMS_TABLE: &str = "products_in_shopping_list";

/// Channel carrying item changes of one list
pub fn shopping_list_channel_name(list_id: EntityId) -> String {
    format!("shopping-list-{}", list_id)
}

/// Stream of notifications for one subscribed channel
pub type ChangeStream = BoxStream<'static, RawChange>;

/// Realtime errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RealtimeError {
    #[error("could not subscribe to channel {channel}: {message}")]
    Subscribe { channel: String, message: String },
    #[error("could not unsubscribe from channel {channel}: {message}")]
    Unsubscribe { channel: String, message: String },
}

/// Which table rows a subscription listens to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableFilter {
    pub schema: String,
    pub table: String,
    /// Row filter in `column=eq.value` form
    pub filter: Option<String>,
}

impl TableFilter {
    /// All rows of a table in the `public` schema
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            schema: "public".to_string(),
            table: table.into(),
            filter: None,
        }
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }
}

/// Source of row-change notifications
#[async_trait]
pub trait RealtimeTransport: Send + Sync {
    /// Open `channel` and start receiving notifications for `filter`
    async fn subscribe(
        &self,
        channel: &str,
        filter: &TableFilter,
    ) -> Result<ChangeStream, RealtimeError>;

    /// Close `channel`; its stream ends
    async fn unsubscribe(&self, channel: &str) -> Result<(), RealtimeError>;

    /// Names of the channels currently open
    async fn active_channels(&self) -> Vec<String>;
}

/// Handle of one live channel subscription
#[derive(Debug)]
pub struct Subscription {
    id: Uuid,
    channel: String,
    task: JoinHandle<()>,
}

impl Subscription {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn channel_name(&self) -> &str {
        &self.channel
    }

    /// Whether the event loop is still consuming notifications
    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }
}

/// Live subscriptions owned by one reconciler, keyed by channel name
pub struct ChannelSubscriptions {
    transport: Arc<dyn RealtimeTransport>,
    active: Mutex<HashMap<String, Subscription>>,
}

impl ChannelSubscriptions {
    pub fn new(transport: Arc<dyn RealtimeTransport>) -> Self {
        Self {
            transport,
            active: Mutex::new(HashMap::new()),
        }
    }

    /// Subscribe `channel` and feed every notification to `handler`.
    ///
    /// An existing subscription for the same name is disposed first. The
    /// handler runs on a spawned task, one notification at a time; it is
    /// expected to deal with its own errors.
    pub async fn listen<F, Fut>(
        &self,
        channel: &str,
        filter: TableFilter,
        handler: F,
    ) -> Result<Uuid, RealtimeError>
    where
        F: Fn(RawChange) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut active = self.active.lock().await;

        if let Some(previous) = active.remove(channel) {
            tracing::debug!(channel, "replacing existing subscription");
            self.close(previous).await;
        }

        let mut stream = self.transport.subscribe(channel, &filter).await?;
        let channel_name = channel.to_string();
        let task = tokio::spawn(async move {
            while let Some(change) = stream.next().await {
                handler(change).await;
            }
            tracing::debug!(channel = %channel_name, "change stream ended");
        });

        let id = Uuid::new_v4();
        active.insert(
            channel.to_string(),
            Subscription {
                id,
                channel: channel.to_string(),
                task,
            },
        );
        tracing::info!(channel, table = %filter.table, subscription = %id, "subscribed");
        Ok(id)
    }

    /// Dispose the subscription for `channel`, if any
    pub async fn unsubscribe(&self, channel: &str) {
        let previous = self.active.lock().await.remove(channel);
        if let Some(subscription) = previous {
            self.close(subscription).await;
        }
    }

    /// Dispose every subscription. Failures are logged, never returned.
    pub async fn unsubscribe_all(&self) {
        let drained: Vec<Subscription> = self.active.lock().await.drain().map(|(_, s)| s).collect();
        for subscription in drained {
            self.close(subscription).await;
        }
    }

    /// Channel names with a live subscription
    pub async fn channels(&self) -> Vec<String> {
        let active = self.active.lock().await;
        let mut names: Vec<String> = active
            .values()
            .filter(|s| s.is_active())
            .map(|s| s.channel.clone())
            .collect();
        names.sort();
        names
    }

    pub async fn is_subscribed(&self, channel: &str) -> bool {
        self.active
            .lock()
            .await
            .get(channel)
            .map(Subscription::is_active)
            .unwrap_or(false)
    }

    async fn close(&self, subscription: Subscription) {
        subscription.task.abort();
        if let Err(e) = self.transport.unsubscribe(&subscription.channel).await {
            tracing::error!(channel = %subscription.channel, error = %e, "unsubscribe failed");
        } else {
            tracing::info!(channel = %subscription.channel, subscription = %subscription.id, "unsubscribed");
        }
    }
}

impl Drop for ChannelSubscriptions {
    fn drop(&mut self) {
        for subscription in self.active.get_mut().values() {
            subscription.task.abort();
        }
    }
}

/// In-process realtime transport.
///
/// Each channel is a tokio broadcast channel; [`LocalRealtimeHub::publish`]
/// plays the role of the backend emitting a row change.
#[derive(Debug)]
pub struct LocalRealtimeHub {
    buffer: usize,
    channels: RwLock<HashMap<String, broadcast::Sender<RawChange>>>,
}

impl LocalRealtimeHub {
    pub fn new(buffer: usize) -> Self {
        Self {
            buffer: buffer.max(1),
            channels: RwLock::new(HashMap::new()),
        }
    }

    /// Deliver `change` to the subscribers of `channel`; returns how many got it
    pub async fn publish(&self, channel: &str, change: RawChange) -> usize {
        let channels = self.channels.read().await;
        match channels.get(channel) {
            Some(sender) => sender.send(change).unwrap_or(0),
            None => {
                tracing::debug!(channel, "publish on channel without subscribers");
                0
            }
        }
    }
}

impl Default for LocalRealtimeHub {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl RealtimeTransport for LocalRealtimeHub {
    async fn subscribe(
        &self,
        channel: &str,
        _filter: &TableFilter,
    ) -> Result<ChangeStream, RealtimeError> {
        let mut channels = self.channels.write().await;
        let sender = channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(self.buffer).0);
        let channel_name = channel.to_string();

        let stream = BroadcastStream::new(sender.subscribe()).filter_map(move |item| {
            let change = match item {
                Ok(change) => Some(change),
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    tracing::warn!(channel = %channel_name, skipped, "subscriber lagged");
                    None
                }
            };
            futures_util::future::ready(change)
        });
        Ok(stream.boxed())
    }

    async fn unsubscribe(&self, channel: &str) -> Result<(), RealtimeError> {
        self.channels.write().await.remove(channel);
        Ok(())
    }

    async fn active_channels(&self) -> Vec<String> {
        let mut names: Vec<String> = self.channels.read().await.keys().cloned().collect();
        names.sort();
        names
    }
}
