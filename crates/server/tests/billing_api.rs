//! Billing service routes.

mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use boxoffice_core::{
    testing::MemoryQueue, Config, MessageQueue, NewOrder, OrderConsumer, OrderStatus, OrderStore,
    SqliteOrderStore,
};
use boxoffice_server::api::billing_router;
use boxoffice_server::state::BillingState;
use rust_decimal::Decimal;
use serde_json::json;

use common::{billing_app, fast_consumer_config, fixtures, send, wait_until};

fn order_for(user_id: i64, quantity: i64) -> NewOrder {
    NewOrder::from_purchase(
        &fixtures::purchase(user_id, 1, Decimal::new(1250, 2), quantity),
        OrderStatus::Processing,
    )
}

#[tokio::test]
async fn test_health_without_consumer() {
    let (router, _) = billing_app();

    let response = send(&router, "GET", "/health", None).await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["service"], "billing-app");
    assert!(response.body.get("consumer").is_none());
}

#[tokio::test]
async fn test_list_and_get_orders() {
    let (router, store) = billing_app();
    let first = store.create(order_for(1, 2)).unwrap();
    store.create(order_for(2, 1)).unwrap();

    let response = send(&router, "GET", "/api/orders", None).await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body.as_array().unwrap().len(), 2);

    let response = send(&router, "GET", &format!("/api/orders/{}", first.id), None).await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["user_id"], 1);
    assert_eq!(response.body["quantity"], 2);
    assert_eq!(response.body["price"], json!(12.5));
    assert_eq!(response.body["total_amount"], json!(25.0));
    assert_eq!(response.body["status"], "processing");
    assert!(response.body["created_at"].is_string());
}

#[tokio::test]
async fn test_list_orders_paginated() {
    let (router, store) = billing_app();
    for _ in 0..5 {
        store.create(order_for(1, 1)).unwrap();
    }

    let response = send(&router, "GET", "/api/orders?limit=2&offset=3", None).await;
    assert_status!(response, StatusCode::OK);
    let ids: Vec<i64> = response
        .body
        .as_array()
        .unwrap()
        .iter()
        .map(|order| order["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![4, 5]);
}

#[tokio::test]
async fn test_missing_order() {
    let (router, _) = billing_app();

    let response = send(&router, "GET", "/api/orders/31", None).await;
    assert_status!(response, StatusCode::NOT_FOUND);
    assert_eq!(response.body["error"], "Order not found");

    let response = send(&router, "GET", "/api/orders/thirty-one", None).await;
    assert_status!(response, StatusCode::NOT_FOUND);
    assert_eq!(response.body["error"], "Order not found");
}

#[tokio::test]
async fn test_orders_by_user() {
    let (router, store) = billing_app();
    store.create(order_for(1, 1)).unwrap();
    store.create(order_for(2, 1)).unwrap();
    store.create(order_for(1, 3)).unwrap();

    let response = send(&router, "GET", "/api/orders/user/1", None).await;
    assert_status!(response, StatusCode::OK);
    let orders = response.body.as_array().unwrap();
    assert_eq!(orders.len(), 2);
    assert!(orders.iter().all(|order| order["user_id"] == 1));

    let response = send(&router, "GET", "/api/orders/user/9", None).await;
    assert_status!(response, StatusCode::OK);
    assert!(response.body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_update_status() {
    let (router, store) = billing_app();
    let order = store.create(order_for(1, 1)).unwrap();
    let path = format!("/api/orders/{}/status", order.id);

    let response = send(&router, "PUT", &path, Some(json!({"status": "completed"}))).await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["status"], "completed");
    assert_eq!(
        store.get(order.id).unwrap().unwrap().status,
        OrderStatus::Completed
    );
}

#[tokio::test]
async fn test_update_status_validation() {
    let (router, store) = billing_app();
    let order = store.create(order_for(1, 1)).unwrap();
    let path = format!("/api/orders/{}/status", order.id);

    let response = send(&router, "PUT", &path, Some(json!({}))).await;
    assert_status!(response, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "Status is required");

    let response = send(&router, "PUT", &path, Some(json!({"status": "shipped"}))).await;
    assert_status!(response, StatusCode::BAD_REQUEST);

    let response = send(
        &router,
        "PUT",
        "/api/orders/404/status",
        Some(json!({"status": "failed"})),
    )
    .await;
    assert_status!(response, StatusCode::NOT_FOUND);
    assert_eq!(response.body["error"], "Order not found");

    assert_eq!(
        store.get(order.id).unwrap().unwrap().status,
        OrderStatus::Processing
    );
}

#[tokio::test]
async fn test_consumer_feeds_the_api() {
    let store = Arc::new(SqliteOrderStore::in_memory().unwrap());
    let queue = MemoryQueue::new();
    let consumer = Arc::new(OrderConsumer::new(
        fast_consumer_config(),
        Arc::new(queue.clone()) as Arc<dyn MessageQueue>,
        Arc::clone(&store) as Arc<dyn OrderStore>,
    ));
    consumer.start().await;

    let router = billing_router(Arc::new(BillingState::new(
        Config::default(),
        Arc::clone(&store) as Arc<dyn OrderStore>,
        Some(Arc::clone(&consumer)),
    )));

    let message = fixtures::purchase(7, 3, Decimal::new(1000, 2), 3);
    queue.push_raw(message.to_bytes().unwrap());
    queue.push_raw(b"definitely not json".to_vec());

    let probe = queue.clone();
    assert!(wait_until(|| probe.acked().len() == 1 && probe.dead_letters().len() == 1).await);

    let response = send(&router, "GET", "/api/orders/user/7", None).await;
    assert_status!(response, StatusCode::OK);
    let orders = response.body.as_array().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["total_amount"], json!(30.0));
    assert_eq!(orders[0]["status"], "processing");

    let response = send(&router, "GET", "/health", None).await;
    assert_eq!(response.body["consumer"]["running"], true);

    consumer.stop().await;
    let response = send(&router, "GET", "/health", None).await;
    assert_eq!(response.body["consumer"]["running"], false);
}
