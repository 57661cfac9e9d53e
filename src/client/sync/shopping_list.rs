//! Items of one shopping list
//!
//! [`ShoppingListSync`] mirrors the products on a single list. Besides the
//! items it keeps the category catalogue, which realtime rows only reference
//! by id.

use super::reconciler::{
    replace_provisional, spawn_refresh_loop, ChangeSource, Reconciler, Rollback,
};
use super::{validate_name, RefreshOutcome, SyncError};
use crate::client::api::ShoppingListApi;
use crate::client::config::Config;
use crate::client::optimistic::EntityPatch;
use crate::client::realtime::{
    shopping_list_channel_name, ChannelSubscriptions, RealtimeTransport, TableFilter,
    SHOPPING_LIST_ITEMS_TABLE,
};
use crate::shared::error::SharedError;
use crate::shared::event::ActionKind;
use crate::shared::shopping::{
    group_products_by_category, AddToShoppingListParameters, Category, CategoryWithProducts,
    EntityId, Product, ShoppingListDetails, ShoppingListRow, UnitEnum,
    UpdateInShoppingListParameters,
};
use async_trait::async_trait;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::watch;
use uuid::Uuid;

/// Name shown for an item announced by realtime before its details arrive
pub const PLACEHOLDER_PRODUCT_NAME: &str = "Produkt";

/// A product to put on the list
#[derive(Debug, Clone, PartialEq)]
pub struct AddItem {
    pub name: String,
    pub quantity: f64,
    pub unit: UnitEnum,
    pub category_id: EntityId,
}

/// Changed fields of an item; `None` leaves a field alone
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateItem {
    pub id: EntityId,
    pub name: Option<String>,
    pub quantity: Option<f64>,
    pub unit: Option<UnitEnum>,
    pub category_id: Option<EntityId>,
}

/// Reconciler for the items of one shopping list
pub struct ShoppingListSync {
    list_id: EntityId,
    api: Arc<dyn ShoppingListApi>,
    engine: Reconciler<ShoppingListDetails>,
    categories: RwLock<Vec<Category>>,
    subscriptions: ChannelSubscriptions,
    refresh_interval: Duration,
}

impl ShoppingListSync {
    pub fn new(
        list_id: EntityId,
        api: Arc<dyn ShoppingListApi>,
        transport: Arc<dyn RealtimeTransport>,
        config: &Config,
    ) -> Arc<Self> {
        Arc::new(Self {
            list_id,
            api,
            engine: Reconciler::new("shopping_list"),
            categories: RwLock::new(Vec::new()),
            subscriptions: ChannelSubscriptions::new(transport),
            refresh_interval: config.refresh_interval(),
        })
    }

    pub fn list_id(&self) -> EntityId {
        self.list_id
    }

    /// Realtime channel carrying this list's item changes
    pub fn channel_name(&self) -> String {
        shopping_list_channel_name(self.list_id)
    }

    // --- state ---

    pub fn items(&self) -> Vec<ShoppingListDetails> {
        self.engine.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<ShoppingListDetails>> {
        self.engine.subscribe()
    }

    pub fn get(&self, id: EntityId) -> Option<ShoppingListDetails> {
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

    pub fn categories(&self) -> Vec<Category> {
        self.categories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_categories(&self, categories: Vec<Category>) {
        *self.categories.write().unwrap_or_else(PoisonError::into_inner) = categories;
    }

    /// Current items grouped under the known categories
    pub fn categories_with_products(&self) -> Vec<CategoryWithProducts> {
        group_products_by_category(&self.engine.snapshot(), &self.categories())
    }

    /// Category for `id`, else the first known one, else a bare placeholder
    fn resolve_category(&self, id: Option<EntityId>) -> Category {
        let categories = self.categories.read().unwrap_or_else(PoisonError::into_inner);
        id.and_then(|id| categories.iter().find(|c| c.id == id))
            .or_else(|| categories.first())
            .cloned()
            .unwrap_or_else(|| Category::placeholder(id.unwrap_or_default()))
    }

    // --- fetching and realtime ---

    /// Reload categories and items from the backend.
    ///
    /// A failed category fetch keeps the previous catalogue.
    pub async fn refresh(&self) -> Result<RefreshOutcome, SyncError> {
        match self.api.get_categories().await {
            Ok(categories) => self.set_categories(categories),
            Err(e) => {
                tracing::warn!(list_id = self.list_id, error = %e, "could not load categories")
            }
        }
        self.engine
            .refresh_with(self.api.get_shopping_list(self.list_id))
            .await
    }

    /// Subscribe to item changes of this list, replacing any earlier
    /// subscription on the same channel
    pub async fn listen_for_changes(self: &Arc<Self>) -> Result<Uuid, SyncError> {
        let weak = Arc::downgrade(self);
        let filter = TableFilter::table(SHOPPING_LIST_ITEMS_TABLE)
            .with_filter(format!("shopping_list_id=eq.{}", self.list_id));

        let id = self
            .subscriptions
            .listen(&self.channel_name(), filter, move |change| {
                let weak = weak.clone();
                async move {
                    if let Some(sync) = weak.upgrade() {
                        sync.engine.apply_change(sync.as_ref(), change).await;
                    }
                }
            })
            .await?;
        Ok(id)
    }

    /// Channels this reconciler is subscribed to
    pub async fn channels(&self) -> Vec<String> {
        self.subscriptions.channels().await
    }

    /// Refresh every `refresh_interval_secs` until disposed
    pub fn spawn_auto_refresh(self: &Arc<Self>) {
        let task = spawn_refresh_loop(
            Arc::downgrade(self),
            self.refresh_interval,
            |sync: Arc<Self>| async move { sync.refresh().await },
        );
        self.engine.track_task(task);
    }

    /// Unsubscribe everything and stop background work
    pub async fn dispose(&self) {
        self.engine.shutdown();
        self.subscriptions.unsubscribe_all().await;
    }

    // --- local mutations ---

    /// Flip `in_cart` of one item
    pub async fn toggle_in_cart(&self, id: EntityId) -> Result<ShoppingListDetails, SyncError> {
        self.engine
            .run_mutation(
                id,
                ActionKind::Update,
                |store| {
                    let rollback = Rollback::capture(store, id, "item")?;
                    let in_cart = store
                        .get_item(id)
                        .map(|(_, item)| item.in_cart)
                        .unwrap_or_default();
                    store.upsert_item(
                        Some(EntityPatch::new(id).set("in_cart", !in_cart)),
                        None,
                        false,
                    )?;
                    Ok(rollback)
                },
                self.api.toggle_product_in_cart(id),
                |store, item| store.upsert_entity(item, None, true).map(|_| ()),
            )
            .await
    }

    /// Put a new product at the top of the list
    pub async fn add_item(&self, params: AddItem) -> Result<ShoppingListDetails, SyncError> {
        validate_name(&params.name)?;

        let now = chrono::Utc::now();
        let provisional = self.engine.next_provisional_id();
        let placeholder = ShoppingListDetails {
            id: provisional,
            created_at: now.to_rfc3339(),
            quantity: params.quantity,
            unit: params.unit,
            name: params.name.clone(),
            in_cart: false,
            category: self.resolve_category(Some(params.category_id)),
        };
        let request = AddToShoppingListParameters {
            shopping_list_id: self.list_id,
            product_unit: params.unit,
            product_quantity: params.quantity,
            product_name: params.name,
            category_id: params.category_id,
        };

        self.engine
            .run_mutation(
                provisional,
                ActionKind::Insert,
                |store| {
                    store.upsert_entity(&placeholder, Some(0), false)?;
                    Ok(Rollback::Remove(provisional))
                },
                self.api.add_to_shopping_list(request),
                |store, item| replace_provisional(store, provisional, item).map(|_| ()),
            )
            .await
    }

    pub async fn update_item(&self, params: UpdateItem) -> Result<ShoppingListDetails, SyncError> {
        if let Some(name) = &params.name {
            validate_name(name)?;
        }

        let id = params.id;
        let category = match params.category_id {
            Some(category_id) => Some(
                serde_json::to_value(self.resolve_category(Some(category_id)))
                    .map_err(SharedError::from)?,
            ),
            None => None,
        };
        let patch = EntityPatch::new(id)
            .set_some("name", params.name.clone())
            .set_some("quantity", params.quantity)
            .set_some("unit", params.unit.map(|unit| unit.as_str()))
            .set_some("category", category);
        let request = UpdateInShoppingListParameters {
            id,
            shopping_list_id: self.list_id,
            unit: params.unit,
            quantity: params.quantity,
            name: params.name,
            category_id: params.category_id,
        };

        self.engine
            .run_mutation(
                id,
                ActionKind::Update,
                |store| {
                    let rollback = Rollback::capture(store, id, "item")?;
                    store.upsert_item(Some(patch), None, false)?;
                    Ok(rollback)
                },
                self.api.update_in_shopping_list(request),
                |store, item| store.upsert_entity(item, None, true).map(|_| ()),
            )
            .await
    }

    pub async fn delete_item(&self, id: EntityId) -> Result<EntityId, SyncError> {
        self.engine
            .run_mutation(
                id,
                ActionKind::Delete,
                |store| {
                    let rollback = Rollback::capture(store, id, "item")?;
                    store.delete_item(id);
                    Ok(rollback)
                },
                self.api.delete_from_shopping_list(id),
                |_, _| Ok(()),
            )
            .await
    }

    /// Catalogue products matching `name`
    pub async fn product_suggestions(&self, name: &str) -> Result<Vec<Product>, SyncError> {
        Ok(self.api.get_product_suggestion(name).await?)
    }
}

#[async_trait]
impl ChangeSource for ShoppingListSync {
    type Entity = ShoppingListDetails;
    type Row = ShoppingListRow;

    fn placeholder(&self, row: &ShoppingListRow) -> Result<ShoppingListDetails, SyncError> {
        Ok(ShoppingListDetails {
            id: row.id,
            created_at: chrono::Utc::now().to_rfc3339(),
            quantity: row.quantity.unwrap_or_default(),
            unit: UnitEnum::Gram,
            name: PLACEHOLDER_PRODUCT_NAME.to_string(),
            in_cart: row.in_cart.unwrap_or(false),
            category: self.resolve_category(row.category_id),
        })
    }

    fn patch(&self, row: &ShoppingListRow) -> EntityPatch {
        let category = row
            .category_id
            .map(|id| self.resolve_category(Some(id)))
            .and_then(|category| serde_json::to_value(category).ok());
        EntityPatch::new(row.id)
            .set_some("quantity", row.quantity)
            .set_some("in_cart", row.in_cart)
            .set_some("category", category)
    }

    async fn fetch(&self, id: EntityId) -> Result<EntityPatch, SyncError> {
        let item = self.api.get_shopping_list_product(id).await?;
        Ok(EntityPatch::from_entity(&item)?)
    }
}
