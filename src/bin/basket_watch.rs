/*!
 * basket-watch
 *
 * Prints the user's shopping lists, or the items of one list grouped by
 * category, and prints them again after every periodic refresh.
 *
 * Usage: basket-watch [LIST_ID] [--once]
 *
 * Configuration is read from `<config dir>/basket-sync/config.toml` when it
 * exists, with `BASKET_BACKEND_URL`, `BASKET_API_KEY` and
 * `BASKET_ACCESS_TOKEN` taking precedence.
 */

use basket_sync::client::{
    Config, LocalRealtimeHub, RemoteClient, RpcShoppingListApi, ShoppingListApi,
    ShoppingListSync, ShoppingListsSync,
};
use basket_sync::shared::{parse_list_id, CategoryWithProducts, ShoppingList};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&env_filter))
        .with_writer(std::io::stderr)
        .init();

    let mut list_id = None;
    let mut once = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--once" => once = true,
            raw => list_id = Some(parse_list_id(raw)?),
        }
    }

    let config = Config::load_default()?;
    tracing::info!(backend = config.backend_url(), "starting");

    let api: Arc<dyn ShoppingListApi> =
        Arc::new(RpcShoppingListApi::new(RemoteClient::new(config.clone())?));
    let hub = Arc::new(LocalRealtimeHub::new(config.channel_buffer()));

    match list_id {
        Some(list_id) => {
            let sync = ShoppingListSync::new(list_id, api, hub, &config);
            sync.refresh().await?;
            print_items(list_id, &sync.categories_with_products());
            if once {
                return Ok(());
            }

            sync.spawn_auto_refresh();
            let mut snapshots = sync.subscribe();
            loop {
                tokio::select! {
                    changed = snapshots.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        snapshots.borrow_and_update();
                        print_items(list_id, &sync.categories_with_products());
                    }
                    _ = tokio::signal::ctrl_c() => break,
                }
            }
            sync.dispose().await;
        }
        None => {
            let sync = ShoppingListsSync::new(api, hub, &config);
            sync.refresh().await?;
            print_lists(&sync.lists());
            if once {
                return Ok(());
            }

            sync.spawn_auto_refresh();
            let mut snapshots = sync.subscribe();
            loop {
                tokio::select! {
                    changed = snapshots.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let lists = snapshots.borrow_and_update().clone();
                        print_lists(&lists);
                    }
                    _ = tokio::signal::ctrl_c() => break,
                }
            }
            sync.dispose().await;
        }
    }

    tracing::info!("stopped");
    Ok(())
}

fn print_lists(lists: &[ShoppingList]) {
    println!("{} list(s)", lists.len());
    for list in lists {
        println!(
            "  #{:<6} {:<30} {:>10}  {} item(s)",
            list.id, list.name, list.date, list.product_amount
        );
    }
}

fn print_items(list_id: i64, groups: &[CategoryWithProducts]) {
    println!("list #{}", list_id);
    for group in groups {
        println!("  {}", group.category.name);
        for item in &group.products {
            let mark = if item.in_cart { "x" } else { " " };
            println!(
                "    [{}] {} ({} {})",
                mark,
                item.name,
                item.quantity,
                item.unit.as_str()
            );
        }
    }
}
