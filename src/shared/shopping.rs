//! Shopping Domain Types
//!
//! Plain value records exchanged with the backend. Everything crossing the
//! remote boundary is decoded into these types first; the sync layer never
//! sees raw payloads beyond a single explicit decode step.

use crate::shared::error::SharedError;
use serde::{Deserialize, Serialize};

/// Backend-assigned (or provisional) row identifier
pub type EntityId = i64;

/// Unit a product quantity is expressed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnitEnum {
    Meter,
    Centimeter,
    Milliliter,
    Liter,
    Kilogram,
    Gram,
    Quantity,
    Pack,
}

impl UnitEnum {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Meter => "METER",
            Self::Centimeter => "CENTIMETER",
            Self::Milliliter => "MILLILITER",
            Self::Liter => "LITER",
            Self::Kilogram => "KILOGRAM",
            Self::Gram => "GRAM",
            Self::Quantity => "QUANTITY",
            Self::Pack => "PACK",
        }
    }
}

/// Product category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: EntityId,
    pub created_at: String,
    pub name: String,
    pub color: String,
}

impl Category {
    /// Stand-in used when a row references a category the client has not loaded
    pub fn placeholder(id: EntityId) -> Self {
        Self {
            id,
            created_at: String::new(),
            name: String::new(),
            color: String::new(),
        }
    }
}

/// Summary of one shopping list, as shown in the collection view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShoppingList {
    pub id: EntityId,
    pub created_at: String,
    pub name: String,
    pub date: String,
    #[serde(default)]
    pub product_amount: i64,
}

/// Header of a single shopping list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShoppingListDesc {
    pub id: EntityId,
    pub created_at: String,
    pub name: String,
    pub date: String,
}

/// One product placed on a shopping list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShoppingListDetails {
    pub id: EntityId,
    pub created_at: String,
    pub quantity: f64,
    pub unit: UnitEnum,
    pub name: String,
    pub in_cart: bool,
    pub category: Category,
}

/// Products of one category, ready for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryWithProducts {
    pub category: Category,
    pub products: Vec<ShoppingListDetails>,
}

/// Catalogue product, used for name suggestions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: EntityId,
    pub created_at: String,
    pub name: String,
    pub unit: UnitEnum,
}

/// Row of the list-items table as carried by realtime notifications.
///
/// Realtime payloads only carry the table's own columns, so everything but
/// the id is optional and the joined product/category data is absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShoppingListRow {
    pub id: EntityId,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub product_id: Option<EntityId>,
    #[serde(default)]
    pub in_cart: Option<bool>,
    #[serde(default)]
    pub category_id: Option<EntityId>,
    #[serde(default)]
    pub shopping_list_id: Option<EntityId>,
}

/// Row of the lists table as carried by realtime notifications
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShoppingListChange {
    pub id: EntityId,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub product_amount: Option<i64>,
}

/// Bare id record, the shape of `old_record` for most tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordId {
    pub id: EntityId,
}

// --- RPC parameters ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShoppingListParameters {
    pub shopping_list_id: EntityId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShoppingListIdParameters {
    pub id: EntityId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductInShoppingListParameters {
    pub product_in_shopping_list_id: EntityId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSuggestionParameters {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddToShoppingListParameters {
    pub shopping_list_id: EntityId,
    pub product_unit: UnitEnum,
    pub product_quantity: f64,
    pub product_name: String,
    pub category_id: EntityId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateInShoppingListParameters {
    pub id: EntityId,
    pub shopping_list_id: EntityId,
    pub unit: Option<UnitEnum>,
    pub quantity: Option<f64>,
    pub name: Option<String>,
    pub category_id: Option<EntityId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateShoppingListParameters {
    pub name: String,
    pub date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateShoppingListParameters {
    pub id: EntityId,
    pub name: Option<String>,
    pub date: Option<String>,
}

/// Group products under their categories.
///
/// Categories keep the order they were given in and empty ones are left out.
/// Within a category, products not yet in the cart come first.
pub fn group_products_by_category(
    products: &[ShoppingListDetails],
    categories: &[Category],
) -> Vec<CategoryWithProducts> {
    categories
        .iter()
        .filter_map(|category| {
            let mut in_category: Vec<ShoppingListDetails> = products
                .iter()
                .filter(|p| p.category.id == category.id)
                .cloned()
                .collect();
            if in_category.is_empty() {
                return None;
            }
            // stable: keeps server order within each in_cart group
            in_category.sort_by_key(|p| p.in_cart);
            Some(CategoryWithProducts {
                category: category.clone(),
                products: in_category,
            })
        })
        .collect()
}

/// Parse a list id taken from a route segment
pub fn parse_list_id(raw: &str) -> Result<EntityId, SharedError> {
    raw.trim().parse::<EntityId>().map_err(|_| {
        SharedError::validation(
            "list_id",
            format!("Invalid list ID. Is not a number. Actual value: {}", raw),
        )
    })
}
