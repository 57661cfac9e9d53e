//! RPC transport tests against a mock HTTP backend

use crate::common::*;
use crate::{assert_err, assert_ids, assert_ok};
use basket_sync::client::{
    Config, LocalRealtimeHub, RemoteClient, RpcShoppingListApi, ShoppingListApi,
    ShoppingListsSync, SyncError,
};
use basket_sync::shared::shopping::CreateShoppingListParameters;
use basket_sync::shared::NetworkError;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn api_for(config: Config) -> RpcShoppingListApi {
    RpcShoppingListApi::new(assert_ok!(RemoteClient::new(config)))
}

fn list_json(id: i64, name: &str, created_at: &str) -> serde_json::Value {
    json!({
        "id": id,
        "created_at": created_at,
        "name": name,
        "date": "01.01.2025",
        "product_amount": 2
    })
}

#[tokio::test]
async fn test_call_sends_credentials_and_decodes_result() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/get_shopping_lists"))
        .and(header("apikey", "test-anon-key"))
        .and(header("Authorization", "Bearer test-anon-key"))
        .and(header("Content-Type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            list_json(1, "Groceries", "2025-01-01T08:00:00Z")
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let api = api_for(config_for(&server.uri()));
    let lists = assert_ok!(api.get_shopping_lists().await);

    assert_eq!(lists.len(), 1);
    assert_eq!(lists[0].name, "Groceries");
    assert_eq!(lists[0].product_amount, 2);
}

#[tokio::test]
async fn test_access_token_replaces_api_key_as_bearer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/get_categories"))
        .and(header("apikey", "test-anon-key"))
        .and(header("Authorization", "Bearer user-session-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = config_for(&server.uri());
    config.set_access_token(Some("user-session-token".to_string()));

    let categories = assert_ok!(api_for(config).get_categories().await);
    assert!(categories.is_empty());
}

#[tokio::test]
async fn test_procedure_parameters_are_sent_as_json_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/get_shopping_list"))
        .and(body_json(json!({ "shopping_list_id": 7 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": 1,
            "created_at": "2025-01-02T00:00:00Z",
            "quantity": 2.5,
            "unit": "KILOGRAM",
            "name": "potatoes",
            "in_cart": false,
            "category": {
                "id": 10,
                "created_at": "2025-01-01T00:00:00Z",
                "name": "Vegetables",
                "color": "#8bc34a"
            }
        }])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/create_shopping_list"))
        .and(body_json(json!({ "name": "Weekend", "date": "04.07.2025" })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(list_json(9, "Weekend", "2025-07-04T10:00:00Z")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let api = api_for(config_for(&server.uri()));

    let items = assert_ok!(api.get_shopping_list(7).await);
    assert_eq!(items[0].category.name, "Vegetables");
    assert_eq!(items[0].quantity, 2.5);

    let created = assert_ok!(
        api.create_shopping_list(CreateShoppingListParameters {
            name: "Weekend".to_string(),
            date: "04.07.2025".to_string(),
        })
        .await
    );
    assert_eq!(created.id, 9);
}

#[tokio::test]
async fn test_delete_returns_removed_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/delete_from_shopping_list"))
        .and(body_json(json!({ "product_in_shopping_list_id": 12 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 12 })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/delete_shopping_list"))
        .and(body_json(json!({ "id": 3 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 3 })))
        .mount(&server)
        .await;

    let api = api_for(config_for(&server.uri()));
    assert_eq!(assert_ok!(api.delete_from_shopping_list(12).await), 12);
    assert_eq!(assert_ok!(api.delete_shopping_list(3).await), 3);
}

#[tokio::test]
async fn test_failed_statuses_map_to_error_kinds() {
    let cases = [
        (401, NetworkError::Unauthorized),
        (404, NetworkError::NotFound),
        (408, NetworkError::RequestTimeout),
        (409, NetworkError::Conflict),
        (413, NetworkError::PayloadTooLarge),
        (500, NetworkError::ServerError),
        (503, NetworkError::ServerError),
        (400, NetworkError::Unknown),
        (429, NetworkError::Unknown),
    ];

    for (status, expected) in cases {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/rpc/get_shopping_list_desc"))
            .respond_with(ResponseTemplate::new(status).set_body_string("{\"message\":\"nope\"}"))
            .mount(&server)
            .await;

        let api = api_for(config_for(&server.uri()));
        assert_eq!(
            api.get_shopping_list_desc(1).await,
            Err(expected),
            "status {}",
            status
        );
    }
}

#[tokio::test]
async fn test_undecodable_body_is_a_serialization_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/toggle_product_in_cart"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "not-a-number" })))
        .mount(&server)
        .await;

    let api = api_for(config_for(&server.uri()));
    assert_eq!(
        api.toggle_product_in_cart(1).await,
        Err(NetworkError::Serialization)
    );
}

#[tokio::test]
async fn test_unreachable_backend_is_unknown() {
    let port = {
        let listener = assert_ok!(std::net::TcpListener::bind("127.0.0.1:0"));
        assert_ok!(listener.local_addr()).port()
    };

    let api = api_for(config_for(&format!("http://127.0.0.1:{}", port)));
    assert_eq!(api.get_categories().await, Err(NetworkError::Unknown));
}

#[tokio::test]
async fn test_reconciler_over_http_rolls_back_rejected_create() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/get_shopping_lists"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            list_json(1, "Groceries", "2025-01-01T08:00:00Z"),
            list_json(2, "Party", "2025-03-01T08:00:00Z")
        ])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/create_shopping_list"))
        .respond_with(ResponseTemplate::new(409))
        .expect(1)
        .mount(&server)
        .await;

    let config = config_for(&server.uri());
    let api = Arc::new(api_for(config.clone()));
    let hub = Arc::new(LocalRealtimeHub::default());
    let sync = ShoppingListsSync::new(api, hub, &config);

    assert_ok!(sync.refresh().await);
    assert_ids!(sync.lists(), [2, 1]);

    assert_err!(
        sync.create_list("Weekend").await,
        SyncError::Network(NetworkError::Conflict)
    );
    assert_ids!(sync.lists(), [2, 1]);
}
