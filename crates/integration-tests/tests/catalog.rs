//! Catalog listing and review tests.

#![allow(clippy::indexing_slicing)]

use std::str::FromStr;

use axum::http::{Method, StatusCode};
use rust_decimal::Decimal;
use serde_json::{Value, json};

use bazaar_integration_tests::{
    create_product, deliver_order, place_order, register_admin, register_user, request, send,
    test_app, unique_email,
};

fn review_body(rating: i64, comment: &str) -> Value {
    json!({ "rating": rating, "comment": comment })
}

#[tokio::test]
#[ignore = "Requires a running PostgreSQL database"]
async fn test_review_gated_on_delivery_and_uniqueness() {
    let (app, pool) = test_app().await;
    let (_admin_id, admin_token) = register_admin(&app, &pool, &unique_email("review-admin")).await;
    let product_id = create_product(&app, &admin_token, "Reviewable widget", "12.00").await;
    let (_user_id, token) = register_user(&app, &unique_email("reviewer")).await;

    let review_path = format!("/products/{product_id}/reviews");
    let submit = || {
        request(
            Method::POST,
            &review_path,
            Some(&token),
            Some(&review_body(5, "Works great")),
        )
    };

    // No purchase at all.
    let (status, body) = send(&app, submit()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"].as_str(),
        Some("Product must be purchased and delivered before it can be reviewed")
    );

    // Purchased but not yet delivered.
    let order_id = place_order(&app, &token, product_id, "12.00").await;
    let (status, _body) = send(&app, submit()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Delivered: the review goes through exactly once.
    deliver_order(&app, &admin_token, order_id).await;
    let (status, review) = send(&app, submit()).await;
    assert_eq!(status, StatusCode::CREATED, "review failed: {review}");
    assert_eq!(review["rating"].as_i64(), Some(5));
    assert_eq!(review["comment"].as_str(), Some("Works great"));

    let (status, body) = send(&app, submit()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"].as_str(), Some("Product already reviewed"));
}

#[tokio::test]
#[ignore = "Requires a running PostgreSQL database"]
async fn test_reviews_recompute_product_aggregates() {
    let (app, pool) = test_app().await;
    let (_admin_id, admin_token) = register_admin(&app, &pool, &unique_email("agg-admin")).await;
    let product_id = create_product(&app, &admin_token, "Rated widget", "30.00").await;

    for (email, rating) in [("agg-first", 5), ("agg-second", 4)] {
        let (_user_id, token) = register_user(&app, &unique_email(email)).await;
        let order_id = place_order(&app, &token, product_id, "30.00").await;
        deliver_order(&app, &admin_token, order_id).await;

        let (status, body) = send(
            &app,
            request(
                Method::POST,
                &format!("/products/{product_id}/reviews"),
                Some(&token),
                Some(&review_body(rating, "Aggregate check")),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "review failed: {body}");
    }

    let (status, detail) = send(
        &app,
        request(Method::GET, &format!("/products/{product_id}"), None, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["numReviews"].as_i64(), Some(2));
    assert_eq!(
        Decimal::from_str(detail["rating"].as_str().expect("rating is a string"))
            .expect("rating parses"),
        Decimal::new(45, 1)
    );
    assert_eq!(
        detail["reviews"].as_array().map(std::vec::Vec::len),
        Some(2)
    );
}

#[tokio::test]
#[ignore = "Requires a running PostgreSQL database"]
async fn test_updating_a_review_recomputes_the_mean() {
    let (app, pool) = test_app().await;
    let (_admin_id, admin_token) = register_admin(&app, &pool, &unique_email("upd-admin")).await;
    let product_id = create_product(&app, &admin_token, "Re-rated widget", "8.00").await;
    let (_user_id, token) = register_user(&app, &unique_email("re-rater")).await;

    let order_id = place_order(&app, &token, product_id, "8.00").await;
    deliver_order(&app, &admin_token, order_id).await;

    let review_path = format!("/products/{product_id}/reviews");
    let (status, _body) = send(
        &app,
        request(
            Method::POST,
            &review_path,
            Some(&token),
            Some(&review_body(5, "First impression")),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, updated) = send(
        &app,
        request(
            Method::PUT,
            &review_path,
            Some(&token),
            Some(&review_body(2, "Broke after a week")),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["rating"].as_i64(), Some(2));

    let (status, detail) = send(
        &app,
        request(Method::GET, &format!("/products/{product_id}"), None, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["numReviews"].as_i64(), Some(1));
    assert_eq!(
        Decimal::from_str(detail["rating"].as_str().expect("rating is a string"))
            .expect("rating parses"),
        Decimal::from(2)
    );
}

#[tokio::test]
#[ignore = "Requires a running PostgreSQL database"]
async fn test_out_of_range_ratings_are_rejected() {
    let (app, pool) = test_app().await;
    let (_admin_id, admin_token) = register_admin(&app, &pool, &unique_email("range-admin")).await;
    let product_id = create_product(&app, &admin_token, "Range widget", "4.00").await;
    let (_user_id, token) = register_user(&app, &unique_email("range-user")).await;

    for rating in [0, 6] {
        let (status, body) = send(
            &app,
            request(
                Method::POST,
                &format!("/products/{product_id}/reviews"),
                Some(&token),
                Some(&review_body(rating, "Out of range")),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["message"].as_str(),
            Some("Rating must be between 1 and 5")
        );
    }
}

#[tokio::test]
#[ignore = "Requires a running PostgreSQL database"]
async fn test_listing_sorted_by_price_is_non_decreasing() {
    let (app, pool) = test_app().await;
    let (_admin_id, admin_token) = register_admin(&app, &pool, &unique_email("sort-admin")).await;

    for price in ["55.00", "5.00", "25.00"] {
        create_product(&app, &admin_token, "Sortable widget", price).await;
    }

    let (status, body) = send(
        &app,
        request(Method::GET, "/products?sort=price", None, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let prices: Vec<Decimal> = body["products"]
        .as_array()
        .expect("listing has a products array")
        .iter()
        .map(|p| {
            Decimal::from_str(p["price"].as_str().expect("price is a string"))
                .expect("price parses")
        })
        .collect();
    assert!(!prices.is_empty());
    assert!(
        prices.windows(2).all(|pair| pair[0] <= pair[1]),
        "prices out of order: {prices:?}"
    );
}

#[tokio::test]
#[ignore = "Requires a running PostgreSQL database"]
async fn test_keyword_filter_matches_created_product() {
    let (app, pool) = test_app().await;
    let (_admin_id, admin_token) = register_admin(&app, &pool, &unique_email("kw-admin")).await;

    let marker = unique_email("kw").replace("@test.invalid", "");
    let name = format!("Widget {marker}");
    let product_id = create_product(&app, &admin_token, &name, "14.00").await;

    let (status, body) = send(
        &app,
        request(Method::GET, &format!("/products?keyword={marker}"), None, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let found = body["products"]
        .as_array()
        .expect("listing has a products array")
        .iter()
        .any(|p| p["id"].as_i64() == Some(product_id));
    assert!(found, "keyword search missed the product: {body}");
}
