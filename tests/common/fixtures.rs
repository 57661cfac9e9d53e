//! Entity fixtures, configuration and polling helpers

use basket_sync::client::Config;
use basket_sync::shared::config::AppConfig;
use basket_sync::shared::{Category, EntityId, ShoppingList, ShoppingListDetails, UnitEnum};
use std::time::Duration;

/// Install a test-writer subscriber once per process; later calls are no-ops
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("basket_sync=debug")),
        )
        .with_test_writer()
        .try_init();
}

/// Configuration pointing at `backend_url`
pub fn config_for(backend_url: &str) -> Config {
    Config::with_builder(
        AppConfig::builder()
            .backend_url(backend_url)
            .api_key("test-anon-key")
            .refresh_interval_secs(60)
            .request_timeout_secs(5),
    )
    .expect("valid test config")
}

pub fn test_config() -> Config {
    config_for("http://localhost:54321")
}

pub fn category(id: EntityId, name: &str) -> Category {
    Category {
        id,
        created_at: "2025-01-01T00:00:00Z".to_string(),
        name: name.to_string(),
        color: "#4caf50".to_string(),
    }
}

pub fn item(id: EntityId, name: &str, category: &Category) -> ShoppingListDetails {
    ShoppingListDetails {
        id,
        created_at: "2025-01-02T00:00:00Z".to_string(),
        quantity: 1.0,
        unit: UnitEnum::Quantity,
        name: name.to_string(),
        in_cart: false,
        category: category.clone(),
    }
}

pub fn list(id: EntityId, name: &str, created_at: &str) -> ShoppingList {
    ShoppingList {
        id,
        created_at: created_at.to_string(),
        name: name.to_string(),
        date: "01.01.2025".to_string(),
        product_amount: 0,
    }
}

/// Poll `condition` until it holds; panics after two seconds
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    let waited = tokio::time::timeout(Duration::from_secs(2), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(waited.is_ok(), "condition not reached within two seconds");
}
