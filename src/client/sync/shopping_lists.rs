//! Collection of shopping lists
//!
//! [`ShoppingListsSync`] mirrors every list the user can see, newest first.

use super::reconciler::{
    replace_provisional, spawn_refresh_loop, ChangeSource, Reconciler, Rollback,
};
use super::{validate_name, RefreshOutcome, SyncError};
use crate::client::api::ShoppingListApi;
use crate::client::config::Config;
use crate::client::optimistic::EntityPatch;
use crate::client::realtime::{
    ChannelSubscriptions, RealtimeTransport, TableFilter, SHOPPING_LISTS_CHANNEL,
    SHOPPING_LISTS_TABLE,
};
use crate::shared::event::ActionKind;
use crate::shared::shopping::{
    CreateShoppingListParameters, EntityId, ShoppingList, ShoppingListChange,
    UpdateShoppingListParameters,
};
use async_trait::async_trait;
use chrono::{DateTime, Local, Utc};
use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use uuid::Uuid;

/// Date format of list dates, e.g. `24.12.2025`
pub const LIST_DATE_FORMAT: &str = "%d.%m.%Y";

/// Changed fields of a list; `None` leaves a field alone
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateList {
    pub id: EntityId,
    pub name: Option<String>,
    pub date: Option<String>,
}

/// Reconciler for the collection of shopping lists
pub struct ShoppingListsSync {
    api: Arc<dyn ShoppingListApi>,
    engine: Reconciler<ShoppingList>,
    subscriptions: ChannelSubscriptions,
    refresh_interval: Duration,
}

impl ShoppingListsSync {
    pub fn new(
        api: Arc<dyn ShoppingListApi>,
        transport: Arc<dyn RealtimeTransport>,
        config: &Config,
    ) -> Arc<Self> {
        Arc::new(Self {
            api,
            engine: Reconciler::new("shopping_lists"),
            subscriptions: ChannelSubscriptions::new(transport),
            refresh_interval: config.refresh_interval(),
        })
    }

    pub fn lists(&self) -> Vec<ShoppingList> {
        self.engine.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<ShoppingList>> {
        self.engine.subscribe()
    }

    pub fn get(&self, id: EntityId) -> Option<ShoppingList> {
        self.engine.get(id)
    }

    pub fn is_loading(&self) -> bool {
        self.engine.is_loading()
    }

    pub fn last_error(&self) -> Option<SyncError> {
        self.engine.last_error()
    }

    pub fn has_pending_actions(&self) -> bool {
        self.engine.has_pending_actions()
    }

    pub fn is_action_blocked(&self, id: EntityId, kind: ActionKind) -> bool {
        self.engine.is_action_blocked(id, kind)
    }

    /// Reload every list, newest first
    pub async fn refresh(&self) -> Result<RefreshOutcome, SyncError> {
        let fetch = async {
            self.api.get_shopping_lists().await.map(|mut lists| {
                sort_newest_first(&mut lists);
                lists
            })
        };
        self.engine.refresh_with(fetch).await
    }

    /// Subscribe to list changes, replacing any earlier subscription
    pub async fn listen_for_changes(self: &Arc<Self>) -> Result<Uuid, SyncError> {
        let weak = Arc::downgrade(self);
        let id = self
            .subscriptions
            .listen(
                SHOPPING_LISTS_CHANNEL,
                TableFilter::table(SHOPPING_LISTS_TABLE),
                move |change| {
                    let weak = weak.clone();
                    async move {
                        if let Some(sync) = weak.upgrade() {
                            sync.engine.apply_change(sync.as_ref(), change).await;
                        }
                    }
                },
            )
            .await?;
        Ok(id)
    }

    pub async fn channels(&self) -> Vec<String> {
        self.subscriptions.channels().await
    }

    pub fn spawn_auto_refresh(self: &Arc<Self>) {
        let task = spawn_refresh_loop(
            Arc::downgrade(self),
            self.refresh_interval,
            |sync: Arc<Self>| async move { sync.refresh().await },
        );
        self.engine.track_task(task);
    }

    pub async fn dispose(&self) {
        self.engine.shutdown();
        self.subscriptions.unsubscribe_all().await;
    }

    /// Create a list dated today; it shows up first right away
    pub async fn create_list(&self, name: &str) -> Result<ShoppingList, SyncError> {
        validate_name(name)?;

        let now = Utc::now();
        let provisional = self.engine.next_provisional_id();
        let date = now.with_timezone(&Local).format(LIST_DATE_FORMAT).to_string();
        let placeholder = ShoppingList {
            id: provisional,
            created_at: now.to_rfc3339(),
            name: name.to_string(),
            date: date.clone(),
            product_amount: 0,
        };
        let request = CreateShoppingListParameters {
            name: name.to_string(),
            date,
        };

        self.engine
            .run_mutation(
                provisional,
                ActionKind::Insert,
                |store| {
                    store.upsert_entity(&placeholder, Some(0), false)?;
                    Ok(Rollback::Remove(provisional))
                },
                self.api.create_shopping_list(request),
                |store, list| replace_provisional(store, provisional, list).map(|_| ()),
            )
            .await
    }

    pub async fn update_list(&self, params: UpdateList) -> Result<ShoppingList, SyncError> {
        if let Some(name) = &params.name {
            validate_name(name)?;
        }

        let id = params.id;
        let patch = EntityPatch::new(id)
            .set_some("name", params.name.clone())
            .set_some("date", params.date.clone());
        let request = UpdateShoppingListParameters {
            id,
            name: params.name,
            date: params.date,
        };

        self.engine
            .run_mutation(
                id,
                ActionKind::Update,
                |store| {
                    let rollback = Rollback::capture(store, id, "list")?;
                    store.upsert_item(Some(patch), None, false)?;
                    Ok(rollback)
                },
                self.api.update_shopping_list(request),
                |store, list| store.upsert_entity(list, None, true).map(|_| ()),
            )
            .await
    }

    pub async fn delete_list(&self, id: EntityId) -> Result<EntityId, SyncError> {
        self.engine
            .run_mutation(
                id,
                ActionKind::Delete,
                |store| {
                    let rollback = Rollback::capture(store, id, "list")?;
                    store.delete_item(id);
                    Ok(rollback)
                },
                self.api.delete_shopping_list(id),
                |_, _| Ok(()),
            )
            .await
    }
}

#[async_trait]
impl ChangeSource for ShoppingListsSync {
    type Entity = ShoppingList;
    type Row = ShoppingListChange;

    fn placeholder(&self, row: &ShoppingListChange) -> Result<ShoppingList, SyncError> {
        Ok(ShoppingList {
            id: row.id,
            created_at: row
                .created_at
                .clone()
                .unwrap_or_else(|| Utc::now().to_rfc3339()),
            name: row.name.clone().unwrap_or_default(),
            date: row.date.clone().unwrap_or_default(),
            product_amount: row.product_amount.unwrap_or_default(),
        })
    }

    fn placeholder_index(&self) -> Option<usize> {
        Some(0)
    }

    fn patch(&self, row: &ShoppingListChange) -> EntityPatch {
        EntityPatch::new(row.id)
            .set_some("name", row.name.clone())
            .set_some("date", row.date.clone())
            .set_some("product_amount", row.product_amount)
    }

    async fn fetch(&self, id: EntityId) -> Result<EntityPatch, SyncError> {
        let desc = self.api.get_shopping_list_desc(id).await?;
        Ok(EntityPatch::from_entity(&desc)?)
    }
}

/// Sort by `created_at`, newest first. Timestamps that do not parse sort
/// after the ones that do, in their given order.
pub fn sort_newest_first(lists: &mut [ShoppingList]) {
    lists.sort_by(|a, b| {
        let parsed_a = DateTime::parse_from_rfc3339(&a.created_at).ok();
        let parsed_b = DateTime::parse_from_rfc3339(&b.created_at).ok();
        match (parsed_a, parsed_b) {
            (Some(a), Some(b)) => b.cmp(&a),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    });
}
