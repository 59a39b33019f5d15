//! End-to-end order placement: gateway → inventory → queue → billing.

mod common;

use axum::http::StatusCode;
use boxoffice_core::{OrderFilter, OrderStatus, OrderStore, PurchaseMessage};
use rust_decimal::Decimal;
use serde_json::json;

use common::{wait_until, GatewayFixture, GatewayOptions};

#[tokio::test]
async fn test_order_is_queued_and_persisted() {
    let fixture = GatewayFixture::new().await;
    let movie = fixture.add_movie("Alien", Decimal::new(1000, 2), 5);
    let consumer = fixture.start_consumer().await;

    let response = fixture
        .post(
            "/api/orders",
            json!({"user_id": 1, "movie_id": movie.id, "quantity": 3}),
        )
        .await;

    assert_status!(response, StatusCode::ACCEPTED);
    assert_eq!(
        response.body["message"],
        "Order received and queued for processing"
    );
    assert_eq!(response.body["order_data"]["movie_title"], "Alien");
    assert_eq!(response.body["order_data"]["total_amount"], json!(30.0));
    assert_eq!(fixture.stock(movie.id), 2);

    let orders = fixture.orders.clone();
    assert!(
        wait_until(|| orders.count(&OrderFilter::new()).unwrap() == 1).await,
        "Order was not persisted"
    );

    let order = &fixture.orders.list(&OrderFilter::new()).unwrap()[0];
    assert_eq!(order.user_id, 1);
    assert_eq!(order.quantity, 3);
    assert_eq!(order.total_amount, Decimal::new(3000, 2));
    assert_eq!(order.status, OrderStatus::Processing);

    // Read back through the gateway proxy
    let fetched = fixture.get(&format!("/api/orders/{}", order.id)).await;
    assert_status!(fetched, StatusCode::OK);
    assert_eq!(fetched.body["movie_title"], "Alien");
    assert_eq!(fetched.body["quantity"], 3);
    assert_eq!(fetched.body["total_amount"], json!(30.0));
    assert_eq!(fetched.body["status"], "processing");

    consumer.stop().await;
}

#[tokio::test]
async fn test_published_message_snapshots_price() {
    let fixture = GatewayFixture::new().await;
    let movie = fixture.add_movie("Heat", Decimal::new(750, 2), 4);

    let response = fixture
        .post(
            "/api/orders",
            json!({"user_id": 9, "movie_id": movie.id, "quantity": 2}),
        )
        .await;
    assert_status!(response, StatusCode::ACCEPTED);

    let published = fixture.queue.published();
    assert_eq!(published.len(), 1);
    let message = PurchaseMessage::from_slice(&published[0]).unwrap();
    assert_eq!(message.user_id, 9);
    assert_eq!(message.price, Decimal::new(750, 2));
    assert_eq!(message.total_amount, Decimal::new(1500, 2));
    assert!(message.check().is_ok());
}

#[tokio::test]
async fn test_insufficient_stock_leaves_stock_unchanged() {
    let fixture = GatewayFixture::new().await;
    let movie = fixture.add_movie("Alien", Decimal::new(1000, 2), 2);

    let response = fixture
        .post(
            "/api/orders",
            json!({"user_id": 1, "movie_id": movie.id, "quantity": 3}),
        )
        .await;

    assert_status!(response, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "Insufficient stock");
    assert_eq!(fixture.stock(movie.id), 2);
    assert!(fixture.queue.published().is_empty());
}

#[tokio::test]
async fn test_concurrent_orders_for_last_copy() {
    let fixture = GatewayFixture::new().await;
    let movie = fixture.add_movie("Alien", Decimal::new(1000, 2), 1);
    let body = json!({"user_id": 1, "movie_id": movie.id, "quantity": 1});

    let (first, second) = tokio::join!(
        fixture.post("/api/orders", body.clone()),
        fixture.post("/api/orders", body.clone())
    );

    let mut statuses = vec![first.status, second.status];
    statuses.sort();
    assert_eq!(statuses, vec![StatusCode::ACCEPTED, StatusCode::BAD_REQUEST]);
    assert_eq!(fixture.stock(movie.id), 0);
    assert_eq!(fixture.queue.published().len(), 1);
}

#[tokio::test]
async fn test_queue_down_keeps_stock_decremented() {
    let fixture = GatewayFixture::new().await;
    let movie = fixture.add_movie("Alien", Decimal::new(1000, 2), 5);
    fixture.queue.fail_publishes(true);

    let response = fixture
        .post(
            "/api/orders",
            json!({"user_id": 1, "movie_id": movie.id, "quantity": 2}),
        )
        .await;

    assert_status!(response, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.body["error"], "Failed to queue order");
    assert_eq!(fixture.stock(movie.id), 3);
}

#[tokio::test]
async fn test_queue_down_with_compensation_restores_stock() {
    let fixture = GatewayFixture::with_options(GatewayOptions {
        compensate: true,
        ..Default::default()
    })
    .await;
    let movie = fixture.add_movie("Alien", Decimal::new(1000, 2), 5);
    fixture.queue.fail_publishes(true);

    let response = fixture
        .post(
            "/api/orders",
            json!({"user_id": 1, "movie_id": movie.id, "quantity": 2}),
        )
        .await;

    assert_status!(response, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.body["error"], "Failed to queue order");
    assert_eq!(fixture.stock(movie.id), 5);
}

#[tokio::test]
async fn test_unknown_movie() {
    let fixture = GatewayFixture::new().await;

    let response = fixture
        .post(
            "/api/orders",
            json!({"user_id": 1, "movie_id": 4242, "quantity": 1}),
        )
        .await;

    assert_status!(response, StatusCode::NOT_FOUND);
    assert_eq!(response.body["error"], "Movie not found");
}

#[tokio::test]
async fn test_missing_fields() {
    let fixture = GatewayFixture::new().await;

    let response = fixture
        .post("/api/orders", json!({"user_id": 1, "movie_id": 1}))
        .await;
    assert_status!(response, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "Missing required fields");

    let response = fixture.post_raw("/api/orders", "{not json").await;
    assert_status!(response, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "Missing required fields");
}

#[tokio::test]
async fn test_non_positive_quantity_rejected() {
    let fixture = GatewayFixture::new().await;
    let movie = fixture.add_movie("Alien", Decimal::new(1000, 2), 5);

    let response = fixture
        .post(
            "/api/orders",
            json!({"user_id": 1, "movie_id": movie.id, "quantity": 0}),
        )
        .await;

    assert_status!(response, StatusCode::BAD_REQUEST);
    assert_eq!(fixture.stock(movie.id), 5);
    assert!(fixture.queue.published().is_empty());
}

#[tokio::test]
async fn test_overflowing_total_is_rejected_without_reserving() {
    let fixture = GatewayFixture::new().await;
    let movie = fixture.add_movie(
        "Priceless",
        Decimal::from_i128_with_scale(100_000_000_000_000_000_000, 0),
        1_000_000_000_000,
    );

    let response = fixture
        .post(
            "/api/orders",
            json!({"user_id": 1, "movie_id": movie.id, "quantity": 1_000_000_000}),
        )
        .await;

    assert_status!(response, StatusCode::BAD_REQUEST);
    assert_eq!(fixture.stock(movie.id), 1_000_000_000_000);
    assert!(fixture.queue.published().is_empty());
}

#[tokio::test]
async fn test_inventory_unreachable() {
    let fixture = GatewayFixture::with_options(GatewayOptions {
        inventory_down: true,
        ..Default::default()
    })
    .await;

    let response = fixture
        .post(
            "/api/orders",
            json!({"user_id": 1, "movie_id": 1, "quantity": 1}),
        )
        .await;

    assert_status!(response, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.body["error"], "Failed to reduce stock");
    assert!(fixture.queue.published().is_empty());
}

#[tokio::test]
async fn test_orders_for_user_through_gateway() {
    let fixture = GatewayFixture::new().await;
    let movie = fixture.add_movie("Alien", Decimal::new(500, 2), 10);
    let consumer = fixture.start_consumer().await;

    for (user_id, quantity) in [(1, 1), (2, 2), (1, 3)] {
        let response = fixture
            .post(
                "/api/orders",
                json!({"user_id": user_id, "movie_id": movie.id, "quantity": quantity}),
            )
            .await;
        assert_status!(response, StatusCode::ACCEPTED);
    }

    let orders = fixture.orders.clone();
    assert!(wait_until(|| orders.count(&OrderFilter::new()).unwrap() == 3).await);

    let response = fixture.get("/api/orders/user/1").await;
    assert_status!(response, StatusCode::OK);
    let list = response.body.as_array().unwrap();
    assert_eq!(list.len(), 2);
    assert!(list.iter().all(|order| order["user_id"] == 1));
    assert_eq!(fixture.stock(movie.id), 4);

    consumer.stop().await;
}
