//! Order lifecycle tests.
//!
//! Orders are immutable snapshots of the submitted lines and totals; the
//! cart empties as part of the same transaction.

#![allow(clippy::indexing_slicing)]

use std::str::FromStr;

use axum::http::{Method, StatusCode};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::{Value, json};

use bazaar_integration_tests::{
    create_product, deliver_order, place_order, register_admin, register_user, request, send,
    test_app, unique_email,
};

fn decimal_field(body: &Value, field: &str) -> Decimal {
    Decimal::from_str(body[field].as_str().expect("decimal field is a string"))
        .expect("decimal field parses")
}

fn delivered_at(order: &Value) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(order["deliveredAt"].as_str().expect("deliveredAt present"))
        .expect("deliveredAt parses")
        .with_timezone(&Utc)
}

#[tokio::test]
#[ignore = "Requires a running PostgreSQL database"]
async fn test_checkout_empties_cart_and_stores_totals_verbatim() {
    let (app, pool) = test_app().await;
    let (_admin_id, admin_token) = register_admin(&app, &pool, &unique_email("order-admin")).await;
    let product_id = create_product(&app, &admin_token, "Checkout widget", "40.00").await;
    let (user_id, token) = register_user(&app, &unique_email("checkout")).await;

    let (status, _cart) = send(
        &app,
        request(
            Method::POST,
            "/users/cart",
            Some(&token),
            Some(&json!({ "productId": product_id, "qty": 2 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, order) = send(
        &app,
        request(
            Method::POST,
            "/orders",
            Some(&token),
            Some(&json!({
                "orderItems": [{
                    "product": product_id,
                    "name": "Checkout widget",
                    "qty": 2,
                    "images": ["/images/first.jpg", "/images/second.jpg"],
                    "price": "40.00",
                }],
                "shippingAddress": {
                    "address": "1 Test Lane",
                    "city": "Testville",
                    "postalCode": "00000",
                    "country": "Testland",
                },
                "paymentMethod": "PayPal",
                "itemsPrice": "80.00",
                "taxPrice": "12.00",
                "shippingPrice": "4.50",
                "totalPrice": "96.50",
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "order create failed: {order}");

    // Totals are stored as submitted, never recomputed server-side.
    assert_eq!(order["user"].as_i64(), Some(user_id));
    assert_eq!(decimal_field(&order, "itemsPrice"), Decimal::new(8000, 2));
    assert_eq!(decimal_field(&order, "taxPrice"), Decimal::new(1200, 2));
    assert_eq!(decimal_field(&order, "shippingPrice"), Decimal::new(450, 2));
    assert_eq!(decimal_field(&order, "totalPrice"), Decimal::new(9650, 2));
    assert_eq!(order["isDelivered"].as_bool(), Some(false));

    let items = order["orderItems"].as_array().expect("order has items");
    let item = items.first().expect("one snapshotted line");
    assert_eq!(items.len(), 1);
    assert_eq!(item["qty"].as_i64(), Some(2));
    // The snapshot keeps the first image of a multi-image submission.
    assert_eq!(item["image"].as_str(), Some("/images/first.jpg"));

    let (status, cart) = send(&app, request(Method::GET, "/users/cart", Some(&token), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart.as_array().map(std::vec::Vec::len), Some(0));
}

#[tokio::test]
#[ignore = "Requires a running PostgreSQL database"]
async fn test_checkout_with_no_items_is_rejected() {
    let (app, _pool) = test_app().await;
    let (_user_id, token) = register_user(&app, &unique_email("empty-checkout")).await;

    let (status, body) = send(
        &app,
        request(
            Method::POST,
            "/orders",
            Some(&token),
            Some(&json!({
                "orderItems": [],
                "shippingAddress": {
                    "address": "1 Test Lane",
                    "city": "Testville",
                    "postalCode": "00000",
                    "country": "Testland",
                },
                "paymentMethod": "PayPal",
                "itemsPrice": "0.00",
                "taxPrice": "0.00",
                "shippingPrice": "0.00",
                "totalPrice": "0.00",
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"].as_str(), Some("No order items"));
}

#[tokio::test]
#[ignore = "Requires a running PostgreSQL database"]
async fn test_redelivery_overwrites_the_delivered_timestamp() {
    let (app, pool) = test_app().await;
    let (_admin_id, admin_token) =
        register_admin(&app, &pool, &unique_email("deliver-admin")).await;
    let product_id = create_product(&app, &admin_token, "Delivered widget", "20.00").await;
    let (_user_id, token) = register_user(&app, &unique_email("deliveree")).await;
    let order_id = place_order(&app, &token, product_id, "20.00").await;

    let first = deliver_order(&app, &admin_token, order_id).await;
    assert_eq!(first["isDelivered"].as_bool(), Some(true));

    // Backdate the stored timestamp so the overwrite is observable even when
    // both calls land within clock resolution.
    sqlx::query("UPDATE orders SET delivered_at = delivered_at - interval '1 hour' WHERE id = $1")
        .bind(order_id)
        .execute(&pool)
        .await
        .expect("backdate succeeds");

    let second = deliver_order(&app, &admin_token, order_id).await;
    assert_eq!(second["isDelivered"].as_bool(), Some(true));
    assert!(
        delivered_at(&second) >= delivered_at(&first),
        "redelivery did not refresh the timestamp"
    );

    let stored: DateTime<Utc> =
        sqlx::query_scalar("SELECT delivered_at FROM orders WHERE id = $1")
            .bind(order_id)
            .fetch_one(&pool)
            .await
            .expect("order row exists");
    assert!(
        stored >= delivered_at(&first),
        "stored timestamp still backdated: {stored}"
    );
}

#[tokio::test]
#[ignore = "Requires a running PostgreSQL database"]
async fn test_orders_are_hidden_from_non_owners() {
    let (app, pool) = test_app().await;
    let (_admin_id, admin_token) = register_admin(&app, &pool, &unique_email("show-admin")).await;
    let product_id = create_product(&app, &admin_token, "Private widget", "15.00").await;
    let owner_email = unique_email("owner");
    let (_owner_id, owner_token) = register_user(&app, &owner_email).await;
    let (_other_id, other_token) = register_user(&app, &unique_email("other")).await;
    let order_id = place_order(&app, &owner_token, product_id, "15.00").await;

    let path = format!("/orders/{order_id}");

    // A stranger gets the same response as for an absent order.
    let (status, body) = send(&app, request(Method::GET, &path, Some(&other_token), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"].as_str(), Some("Order not found"));

    let (status, body) = send(&app, request(Method::GET, &path, Some(&owner_token), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"].as_i64(), Some(order_id));
    assert_eq!(body["user"]["email"].as_str(), Some(owner_email.as_str()));

    // Admins see any order, with the owner projection joined on.
    let (status, body) = send(&app, request(Method::GET, &path, Some(&admin_token), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["name"].as_str(), Some("Integration Tester"));
}

#[tokio::test]
#[ignore = "Requires a running PostgreSQL database"]
async fn test_my_orders_lists_only_the_callers() {
    let (app, pool) = test_app().await;
    let (_admin_id, admin_token) = register_admin(&app, &pool, &unique_email("mine-admin")).await;
    let product_id = create_product(&app, &admin_token, "Listed widget", "6.00").await;
    let (user_id, token) = register_user(&app, &unique_email("mine")).await;

    place_order(&app, &token, product_id, "6.00").await;
    place_order(&app, &token, product_id, "6.00").await;

    let (status, body) = send(
        &app,
        request(Method::GET, "/orders/myorders", Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let orders = body.as_array().expect("myorders is an array");
    assert_eq!(orders.len(), 2);
    assert!(
        orders
            .iter()
            .all(|order| order["user"].as_i64() == Some(user_id))
    );
}
