//! In-memory stand-in for the backend's stored procedures
//!
//! Holds lists, items and categories like the real database would and
//! records every procedure call. Tests can make a procedure fail with a
//! given [`NetworkError`] or hold its calls until released, which keeps
//! optimistic state observable while a request is in flight.

use async_trait::async_trait;
use basket_sync::client::ShoppingListApi;
use basket_sync::shared::shopping::{
    AddToShoppingListParameters, Category, CreateShoppingListParameters, EntityId, Product,
    ShoppingList, ShoppingListDesc, ShoppingListDetails, UpdateInShoppingListParameters,
    UpdateShoppingListParameters,
};
use basket_sync::shared::{NetworkError, RpcResult};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use tokio::sync::watch;

#[derive(Default)]
struct BackendData {
    next_id: EntityId,
    lists: Vec<ShoppingList>,
    items: Vec<(EntityId, ShoppingListDetails)>,
    categories: Vec<Category>,
    products: Vec<Product>,
    failures: HashMap<&'static str, NetworkError>,
    calls: Vec<&'static str>,
}

pub struct FakeBackend {
    data: Mutex<BackendData>,
    held: watch::Sender<HashSet<&'static str>>,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            data: Mutex::new(BackendData {
                next_id: 1000,
                ..BackendData::default()
            }),
            held: watch::channel(HashSet::new()).0,
        }
    }

    pub fn with_categories(self, categories: Vec<Category>) -> Self {
        self.data.lock().unwrap().categories = categories;
        self
    }

    pub fn with_items(self, list_id: EntityId, items: Vec<ShoppingListDetails>) -> Self {
        self.data
            .lock()
            .unwrap()
            .items
            .extend(items.into_iter().map(|item| (list_id, item)));
        self
    }

    pub fn with_lists(self, lists: Vec<ShoppingList>) -> Self {
        self.data.lock().unwrap().lists = lists;
        self
    }

    pub fn with_products(self, products: Vec<Product>) -> Self {
        self.data.lock().unwrap().products = products;
        self
    }

    /// Make every later call of `procedure` fail with `error`
    pub fn fail(&self, procedure: &'static str, error: NetworkError) {
        self.data.lock().unwrap().failures.insert(procedure, error);
    }

    pub fn clear_failures(&self) {
        self.data.lock().unwrap().failures.clear();
    }

    /// Hold calls of `procedure` at their start until released
    pub fn hold(&self, procedure: &'static str) {
        self.held.send_modify(|held| {
            held.insert(procedure);
        });
    }

    pub fn release(&self, procedure: &'static str) {
        self.held.send_modify(|held| {
            held.remove(procedure);
        });
    }

    /// Procedure names in call order
    pub fn calls(&self) -> Vec<&'static str> {
        self.data.lock().unwrap().calls.clone()
    }

    pub fn call_count(&self, procedure: &str) -> usize {
        self.calls().iter().filter(|name| **name == procedure).count()
    }

    /// Change an item behind the clients' backs, as another user would
    pub fn edit_item(&self, id: EntityId, edit: impl FnOnce(&mut ShoppingListDetails)) {
        let mut data = self.data.lock().unwrap();
        if let Some((_, item)) = data.items.iter_mut().find(|(_, item)| item.id == id) {
            edit(item);
        }
    }

    pub fn insert_item(&self, list_id: EntityId, item: ShoppingListDetails) {
        self.data.lock().unwrap().items.push((list_id, item));
    }

    pub fn insert_list(&self, list: ShoppingList) {
        self.data.lock().unwrap().lists.push(list);
    }

    async fn enter(&self, procedure: &'static str) -> RpcResult<()> {
        self.data.lock().unwrap().calls.push(procedure);
        let mut held = self.held.subscribe();
        let _ = held.wait_for(|held| !held.contains(procedure)).await;
        match self.data.lock().unwrap().failures.get(procedure) {
            Some(error) => Err(*error),
            None => Ok(()),
        }
    }

    fn category_or_placeholder(data: &BackendData, id: EntityId) -> Category {
        data.categories
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .unwrap_or_else(|| Category::placeholder(id))
    }
}

#[async_trait]
impl ShoppingListApi for FakeBackend {
    async fn get_shopping_list(&self, list_id: EntityId) -> RpcResult<Vec<ShoppingListDetails>> {
        self.enter("get_shopping_list").await?;
        let data = self.data.lock().unwrap();
        Ok(data
            .items
            .iter()
            .filter(|(list, _)| *list == list_id)
            .map(|(_, item)| item.clone())
            .collect())
    }

    async fn get_shopping_list_product(&self, item_id: EntityId) -> RpcResult<ShoppingListDetails> {
        self.enter("get_shopping_list_product").await?;
        let data = self.data.lock().unwrap();
        data.items
            .iter()
            .find(|(_, item)| item.id == item_id)
            .map(|(_, item)| item.clone())
            .ok_or(NetworkError::NotFound)
    }

    async fn toggle_product_in_cart(&self, item_id: EntityId) -> RpcResult<ShoppingListDetails> {
        self.enter("toggle_product_in_cart").await?;
        let mut data = self.data.lock().unwrap();
        let (_, item) = data
            .items
            .iter_mut()
            .find(|(_, item)| item.id == item_id)
            .ok_or(NetworkError::NotFound)?;
        item.in_cart = !item.in_cart;
        Ok(item.clone())
    }

    async fn add_to_shopping_list(
        &self,
        params: AddToShoppingListParameters,
    ) -> RpcResult<ShoppingListDetails> {
        self.enter("add_product_to_shopping_list").await?;
        let mut data = self.data.lock().unwrap();
        data.next_id += 1;
        let item = ShoppingListDetails {
            id: data.next_id,
            created_at: "2025-06-01T12:00:00Z".to_string(),
            quantity: params.product_quantity,
            unit: params.product_unit,
            name: params.product_name,
            in_cart: false,
            category: Self::category_or_placeholder(&data, params.category_id),
        };
        data.items.push((params.shopping_list_id, item.clone()));
        Ok(item)
    }

    async fn update_in_shopping_list(
        &self,
        params: UpdateInShoppingListParameters,
    ) -> RpcResult<ShoppingListDetails> {
        self.enter("update_in_shopping_list").await?;
        let mut data = self.data.lock().unwrap();
        let category = params
            .category_id
            .map(|id| Self::category_or_placeholder(&data, id));
        let (_, item) = data
            .items
            .iter_mut()
            .find(|(_, item)| item.id == params.id)
            .ok_or(NetworkError::NotFound)?;
        if let Some(name) = params.name {
            item.name = name;
        }
        if let Some(quantity) = params.quantity {
            item.quantity = quantity;
        }
        if let Some(unit) = params.unit {
            item.unit = unit;
        }
        if let Some(category) = category {
            item.category = category;
        }
        Ok(item.clone())
    }

    async fn delete_from_shopping_list(&self, item_id: EntityId) -> RpcResult<EntityId> {
        self.enter("delete_from_shopping_list").await?;
        let mut data = self.data.lock().unwrap();
        let before = data.items.len();
        data.items.retain(|(_, item)| item.id != item_id);
        if data.items.len() == before {
            return Err(NetworkError::NotFound);
        }
        Ok(item_id)
    }

    async fn get_shopping_lists(&self) -> RpcResult<Vec<ShoppingList>> {
        self.enter("get_shopping_lists").await?;
        Ok(self.data.lock().unwrap().lists.clone())
    }

    async fn get_shopping_list_desc(&self, list_id: EntityId) -> RpcResult<ShoppingListDesc> {
        self.enter("get_shopping_list_desc").await?;
        let data = self.data.lock().unwrap();
        data.lists
            .iter()
            .find(|list| list.id == list_id)
            .map(|list| ShoppingListDesc {
                id: list.id,
                created_at: list.created_at.clone(),
                name: list.name.clone(),
                date: list.date.clone(),
            })
            .ok_or(NetworkError::NotFound)
    }

    async fn create_shopping_list(
        &self,
        params: CreateShoppingListParameters,
    ) -> RpcResult<ShoppingList> {
        self.enter("create_shopping_list").await?;
        let mut data = self.data.lock().unwrap();
        data.next_id += 1;
        let list = ShoppingList {
            id: data.next_id,
            created_at: chrono::Utc::now().to_rfc3339(),
            name: params.name,
            date: params.date,
            product_amount: 0,
        };
        data.lists.push(list.clone());
        Ok(list)
    }

    async fn update_shopping_list(
        &self,
        params: UpdateShoppingListParameters,
    ) -> RpcResult<ShoppingList> {
        self.enter("update_shopping_list").await?;
        let mut data = self.data.lock().unwrap();
        let list = data
            .lists
            .iter_mut()
            .find(|list| list.id == params.id)
            .ok_or(NetworkError::NotFound)?;
        if let Some(name) = params.name {
            list.name = name;
        }
        if let Some(date) = params.date {
            list.date = date;
        }
        Ok(list.clone())
    }

    async fn delete_shopping_list(&self, list_id: EntityId) -> RpcResult<EntityId> {
        self.enter("delete_shopping_list").await?;
        let mut data = self.data.lock().unwrap();
        let before = data.lists.len();
        data.lists.retain(|list| list.id != list_id);
        if data.lists.len() == before {
            return Err(NetworkError::NotFound);
        }
        Ok(list_id)
    }

    async fn get_categories(&self) -> RpcResult<Vec<Category>> {
        self.enter("get_categories").await?;
        Ok(self.data.lock().unwrap().categories.clone())
    }

    async fn get_product_suggestion(&self, name: &str) -> RpcResult<Vec<Product>> {
        self.enter("get_product_suggestion").await?;
        let needle = name.to_lowercase();
        Ok(self
            .data
            .lock()
            .unwrap()
            .products
            .iter()
            .filter(|product| product.name.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }
}
