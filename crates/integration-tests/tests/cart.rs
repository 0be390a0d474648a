//! Cart ledger tests.
//!
//! The cart stores (product, quantity) pairs only; every response joins the
//! lines against the current catalog.

#![allow(clippy::indexing_slicing)]

use axum::http::{Method, StatusCode};
use serde_json::{Value, json};

use bazaar_integration_tests::{
    create_product, register_admin, register_user, request, send, test_app, unique_email,
};

fn line_for(cart: &Value, product_id: i64) -> Option<&Value> {
    cart.as_array()
        .expect("cart is an array")
        .iter()
        .find(|line| line["product"].as_i64() == Some(product_id))
}

#[tokio::test]
#[ignore = "Requires a running PostgreSQL database"]
async fn test_adding_same_product_twice_sums_into_one_line() {
    let (app, pool) = test_app().await;
    let (_admin_id, admin_token) = register_admin(&app, &pool, &unique_email("cart-admin")).await;
    let product_id = create_product(&app, &admin_token, "Cart widget", "19.99").await;
    let (_user_id, token) = register_user(&app, &unique_email("cart-sum")).await;

    let add = |qty: i64| {
        request(
            Method::POST,
            "/users/cart",
            Some(&token),
            Some(&json!({ "productId": product_id, "qty": qty })),
        )
    };

    let (status, _cart) = send(&app, add(2)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, cart) = send(&app, add(3)).await;
    assert_eq!(status, StatusCode::OK);

    let line = line_for(&cart, product_id).expect("one line for the product");
    assert_eq!(line["quantity"].as_i64(), Some(5));
    assert_eq!(line["name"].as_str(), Some("Cart widget"));
    assert_eq!(line["price"].as_str(), Some("19.99"));
    assert_eq!(
        cart.as_array()
            .expect("cart is an array")
            .iter()
            .filter(|l| l["product"].as_i64() == Some(product_id))
            .count(),
        1
    );
}

#[tokio::test]
#[ignore = "Requires a running PostgreSQL database"]
async fn test_add_rejects_non_positive_quantities() {
    let (app, pool) = test_app().await;
    let (_admin_id, admin_token) = register_admin(&app, &pool, &unique_email("cart-admin")).await;
    let product_id = create_product(&app, &admin_token, "Guarded widget", "5.00").await;
    let (_user_id, token) = register_user(&app, &unique_email("cart-guard")).await;

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

    for qty in [0, -1] {
        let (status, body) = send(
            &app,
            request(
                Method::POST,
                "/users/cart",
                Some(&token),
                Some(&json!({ "productId": product_id, "qty": qty })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"].as_str(), Some("Quantity must be at least 1"));
    }

    // The rejected requests must not have touched the existing line.
    let (status, cart) = send(&app, request(Method::GET, "/users/cart", Some(&token), None)).await;
    assert_eq!(status, StatusCode::OK);
    let line = line_for(&cart, product_id).expect("line survived the rejected adds");
    assert_eq!(line["quantity"].as_i64(), Some(2));
}

#[tokio::test]
#[ignore = "Requires a running PostgreSQL database"]
async fn test_setting_quantity_to_zero_removes_the_line() {
    let (app, pool) = test_app().await;
    let (_admin_id, admin_token) = register_admin(&app, &pool, &unique_email("cart-admin")).await;
    let product_id = create_product(&app, &admin_token, "Removable widget", "7.50").await;
    let (_user_id, token) = register_user(&app, &unique_email("cart-zero")).await;

    let (status, _cart) = send(
        &app,
        request(
            Method::POST,
            "/users/cart",
            Some(&token),
            Some(&json!({ "productId": product_id, "qty": 4 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, cart) = send(
        &app,
        request(
            Method::PUT,
            &format!("/users/cart/{product_id}"),
            Some(&token),
            Some(&json!({ "qty": 0 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(line_for(&cart, product_id).is_none());
}

#[tokio::test]
#[ignore = "Requires a running PostgreSQL database"]
async fn test_set_quantity_replaces_the_stored_value() {
    let (app, pool) = test_app().await;
    let (_admin_id, admin_token) = register_admin(&app, &pool, &unique_email("cart-admin")).await;
    let product_id = create_product(&app, &admin_token, "Resized widget", "3.25").await;
    let (_user_id, token) = register_user(&app, &unique_email("cart-set")).await;

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

    let (status, cart) = send(
        &app,
        request(
            Method::PUT,
            &format!("/users/cart/{product_id}"),
            Some(&token),
            Some(&json!({ "qty": 7 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let line = line_for(&cart, product_id).expect("line still present");
    assert_eq!(line["quantity"].as_i64(), Some(7));
}

#[tokio::test]
#[ignore = "Requires a running PostgreSQL database"]
async fn test_removing_an_absent_line_is_a_noop() {
    let (app, pool) = test_app().await;
    let (_admin_id, admin_token) = register_admin(&app, &pool, &unique_email("cart-admin")).await;
    let kept = create_product(&app, &admin_token, "Kept widget", "1.00").await;
    let never_added = create_product(&app, &admin_token, "Never-added widget", "2.00").await;
    let (_user_id, token) = register_user(&app, &unique_email("cart-noop")).await;

    let (status, _cart) = send(
        &app,
        request(
            Method::POST,
            "/users/cart",
            Some(&token),
            Some(&json!({ "productId": kept, "qty": 1 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, cart) = send(
        &app,
        request(
            Method::DELETE,
            &format!("/users/cart/{never_added}"),
            Some(&token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(line_for(&cart, kept).is_some());
}

#[tokio::test]
#[ignore = "Requires a running PostgreSQL database"]
async fn test_deleted_product_leaves_a_stale_line() {
    let (app, pool) = test_app().await;
    let (_admin_id, admin_token) = register_admin(&app, &pool, &unique_email("cart-admin")).await;
    let product_id = create_product(&app, &admin_token, "Doomed widget", "9.99").await;
    let (_user_id, token) = register_user(&app, &unique_email("cart-stale")).await;

    let (status, _cart) = send(
        &app,
        request(
            Method::POST,
            "/users/cart",
            Some(&token),
            Some(&json!({ "productId": product_id, "qty": 1 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _body) = send(
        &app,
        request(
            Method::DELETE,
            &format!("/products/{product_id}"),
            Some(&admin_token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // The line survives with null catalog fields so the client can flag it.
    let (status, cart) = send(&app, request(Method::GET, "/users/cart", Some(&token), None)).await;
    assert_eq!(status, StatusCode::OK);
    let line = line_for(&cart, product_id).expect("stale line still listed");
    assert!(line["name"].is_null());
    assert!(line["price"].is_null());
}
