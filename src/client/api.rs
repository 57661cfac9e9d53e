//! Shopping List API
//!
//! The remote facade: one async method per backend stored procedure, each
//! returning either the decoded value or a [`NetworkError`] kind.
//!
//! Reconcilers only talk to the [`ShoppingListApi`] trait, so tests and
//! alternative transports can stand in for [`RpcShoppingListApi`].

use crate::shared::error::RpcResult;
use crate::shared::shopping::{
    AddToShoppingListParameters, Category, CreateShoppingListParameters, EntityId, Product,
    ShoppingList, ShoppingListDesc, ShoppingListDetails, UpdateInShoppingListParameters,
    UpdateShoppingListParameters,
};
use async_trait::async_trait;

/// Backend operations used by the shopping list reconcilers
#[async_trait]
pub trait ShoppingListApi: Send + Sync {
    /// All items of one list
    async fn get_shopping_list(&self, list_id: EntityId) -> RpcResult<Vec<ShoppingListDetails>>;

    /// One item with its joined product and category data
    async fn get_shopping_list_product(&self, item_id: EntityId) -> RpcResult<ShoppingListDetails>;

    /// Flip `in_cart` and return the updated item
    async fn toggle_product_in_cart(&self, item_id: EntityId) -> RpcResult<ShoppingListDetails>;

    async fn add_to_shopping_list(
        &self,
        params: AddToShoppingListParameters,
    ) -> RpcResult<ShoppingListDetails>;

    async fn update_in_shopping_list(
        &self,
        params: UpdateInShoppingListParameters,
    ) -> RpcResult<ShoppingListDetails>;

    /// Remove an item; returns the removed id
    async fn delete_from_shopping_list(&self, item_id: EntityId) -> RpcResult<EntityId>;

    /// Every list visible to the user, in backend order
    async fn get_shopping_lists(&self) -> RpcResult<Vec<ShoppingList>>;

    /// Header of one list
    async fn get_shopping_list_desc(&self, list_id: EntityId) -> RpcResult<ShoppingListDesc>;

    async fn create_shopping_list(
        &self,
        params: CreateShoppingListParameters,
    ) -> RpcResult<ShoppingList>;

    async fn update_shopping_list(
        &self,
        params: UpdateShoppingListParameters,
    ) -> RpcResult<ShoppingList>;

    /// Remove a list; returns the removed id
    async fn delete_shopping_list(&self, list_id: EntityId) -> RpcResult<EntityId>;

    async fn get_categories(&self) -> RpcResult<Vec<Category>>;

    /// Catalogue products whose name matches `name`
    async fn get_product_suggestion(&self, name: &str) -> RpcResult<Vec<Product>>;
}

#[cfg(feature = "http")]
pub use rpc::RpcShoppingListApi;

#[cfg(feature = "http")]
mod rpc {
    use super::*;
    use crate::client::remote::RemoteClient;
    use crate::shared::shopping::{
        ProductInShoppingListParameters, ProductSuggestionParameters, RecordId,
        ShoppingListIdParameters, ShoppingListParameters,
    };

    /// [`ShoppingListApi`] backed by stored procedures over HTTP
    #[derive(Debug, Clone)]
    pub struct RpcShoppingListApi {
        remote: RemoteClient,
    }

    impl RpcShoppingListApi {
        pub fn new(remote: RemoteClient) -> Self {
            Self { remote }
        }
    }

    fn no_params() -> serde_json::Map<String, serde_json::Value> {
        serde_json::Map::new()
    }

    #[async_trait]
    impl ShoppingListApi for RpcShoppingListApi {
        async fn get_shopping_list(
            &self,
            list_id: EntityId,
        ) -> RpcResult<Vec<ShoppingListDetails>> {
            self.remote
                .call(
                    "get_shopping_list",
                    &ShoppingListParameters {
                        shopping_list_id: list_id,
                    },
                )
                .await
        }

        async fn get_shopping_list_product(
            &self,
            item_id: EntityId,
        ) -> RpcResult<ShoppingListDetails> {
            self.remote
                .call(
                    "get_shopping_list_product",
                    &ProductInShoppingListParameters {
                        product_in_shopping_list_id: item_id,
                    },
                )
                .await
        }

        async fn toggle_product_in_cart(
            &self,
            item_id: EntityId,
        ) -> RpcResult<ShoppingListDetails> {
            self.remote
                .call(
                    "toggle_product_in_cart",
                    &ProductInShoppingListParameters {
                        product_in_shopping_list_id: item_id,
                    },
                )
                .await
        }

        async fn add_to_shopping_list(
            &self,
            params: AddToShoppingListParameters,
        ) -> RpcResult<ShoppingListDetails> {
            self.remote
                .call("add_product_to_shopping_list", &params)
                .await
        }

        async fn update_in_shopping_list(
            &self,
            params: UpdateInShoppingListParameters,
        ) -> RpcResult<ShoppingListDetails> {
            self.remote.call("update_in_shopping_list", &params).await
        }

        async fn delete_from_shopping_list(&self, item_id: EntityId) -> RpcResult<EntityId> {
            let deleted: RecordId = self
                .remote
                .call(
                    "delete_from_shopping_list",
                    &ProductInShoppingListParameters {
                        product_in_shopping_list_id: item_id,
                    },
                )
                .await?;
            Ok(deleted.id)
        }

        async fn get_shopping_lists(&self) -> RpcResult<Vec<ShoppingList>> {
            self.remote.call("get_shopping_lists", &no_params()).await
        }

        async fn get_shopping_list_desc(&self, list_id: EntityId) -> RpcResult<ShoppingListDesc> {
            self.remote
                .call(
                    "get_shopping_list_desc",
                    &ShoppingListIdParameters { id: list_id },
                )
                .await
        }

        async fn create_shopping_list(
            &self,
            params: CreateShoppingListParameters,
        ) -> RpcResult<ShoppingList> {
            self.remote.call("create_shopping_list", &params).await
        }

        async fn update_shopping_list(
            &self,
            params: UpdateShoppingListParameters,
        ) -> RpcResult<ShoppingList> {
            self.remote.call("update_shopping_list", &params).await
        }

        async fn delete_shopping_list(&self, list_id: EntityId) -> RpcResult<EntityId> {
            let deleted: RecordId = self
                .remote
                .call(
                    "delete_shopping_list",
                    &ShoppingListIdParameters { id: list_id },
                )
                .await?;
            Ok(deleted.id)
        }

        async fn get_categories(&self) -> RpcResult<Vec<Category>> {
            self.remote.call("get_categories", &no_params()).await
        }

        async fn get_product_suggestion(&self, name: &str) -> RpcResult<Vec<Product>> {
            self.remote
                .call(
                    "get_product_suggestion",
                    &ProductSuggestionParameters {
                        name: name.to_string(),
                    },
                )
                .await
        }
    }
}
