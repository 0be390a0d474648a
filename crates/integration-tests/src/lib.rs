//! Shared harness for the live-database integration tests.
//!
//! Tests mount the real router as an in-process tower service, so every
//! request exercises routing, extractors, handlers, and SQL end to end
//! without binding a socket. Everything here needs a reachable `PostgreSQL`
//! instance; point `BAZAAR_TEST_DATABASE_URL` (or `DATABASE_URL`) at a
//! disposable database and run the suite with `cargo test -- --ignored`.
//!
//! Tests create their own users and products and scope every assertion to
//! the ids they created, so the suite tolerates a shared, already-populated
//! database and can run concurrently.

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::missing_panics_doc, clippy::indexing_slicing)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use secrecy::SecretString;
use serde_json::{Value, json};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;
use url::Url;

use bazaar_api::config::{ApiConfig, MediaConfig};
use bazaar_api::state::AppState;

/// Connect to the test database and bring its schema up to date.
pub async fn test_pool() -> PgPool {
    let url = std::env::var("BAZAAR_TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .expect("BAZAAR_TEST_DATABASE_URL or DATABASE_URL must point at a test database");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .expect("failed to connect to the test database");

    sqlx::migrate!("../api/migrations")
        .run(&pool)
        .await
        .expect("failed to run migrations");

    pool
}

/// The full API router plus the pool backing it.
pub async fn test_app() -> (Router, PgPool) {
    let pool = test_pool().await;
    let state = AppState::new(test_config(), pool.clone());

    (bazaar_api::routes::routes().with_state(state), pool)
}

/// Config for in-process tests.
///
/// The media endpoint points at a reserved domain; no test goes through the
/// upload path, the value only has to satisfy construction.
fn test_config() -> ApiConfig {
    ApiConfig {
        database_url: SecretString::from("postgres://unused"),
        host: "127.0.0.1".parse().expect("valid bind address"),
        port: 0,
        jwt_secret: SecretString::from("kX9#mP2$vL8@qR4!wN7&zT1*eH5^cJ3%"),
        media: MediaConfig {
            upload_url: Url::parse("http://media.invalid/upload").expect("valid media url"),
            api_key: SecretString::from("kM4$tQ8@wZ2#rX6!nB9&vC1*pL5^dF3%"),
        },
        sentry_dsn: None,
        sentry_environment: None,
        sentry_traces_sample_rate: 0.0,
    }
}

static EMAIL_SEQ: AtomicU64 = AtomicU64::new(0);

/// An email address no other test (or test run) has used.
#[must_use]
pub fn unique_email(prefix: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before the unix epoch")
        .as_nanos();
    let seq = EMAIL_SEQ.fetch_add(1, Ordering::Relaxed);

    format!("{prefix}-{nanos}-{seq}@test.invalid")
}

/// Build a request, attaching a bearer token and JSON body when given.
#[must_use]
pub fn request(
    method: Method,
    path: &str,
    token: Option<&str>,
    body: Option<&Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(path);

    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    let body = match body {
        Some(value) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(serde_json::to_vec(value).expect("failed to encode request body"))
        }
        None => Body::empty(),
    };

    builder.body(body).expect("failed to build request")
}

/// Drive a request through the router and decode the JSON response.
pub async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.expect("infallible service");
    let status = response.status();

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("response body was not JSON")
    };

    (status, body)
}

/// Register a fresh user and return its id and bearer token.
pub async fn register_user(app: &Router, email: &str) -> (i64, String) {
    let (status, body) = send(
        app,
        request(
            Method::POST,
            "/users",
            None,
            Some(&json!({
                "name": "Integration Tester",
                "email": email,
                "password": "correct-horse-battery",
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "registration failed: {body}");

    let id = body["id"].as_i64().expect("registration response has an id");
    let token = body["token"]
        .as_str()
        .expect("registration response has a token")
        .to_owned();

    (id, token)
}

/// Promote a user to admin directly in the database.
///
/// Tokens resolve against the live user row, so an existing token picks up
/// the flag immediately.
pub async fn promote_to_admin(pool: &PgPool, user_id: i64) {
    sqlx::query("UPDATE users SET is_admin = TRUE WHERE id = $1")
        .bind(user_id)
        .execute(pool)
        .await
        .expect("failed to promote user");
}

/// Register a fresh admin and return its id and bearer token.
pub async fn register_admin(app: &Router, pool: &PgPool, email: &str) -> (i64, String) {
    let (id, token) = register_user(app, email).await;
    promote_to_admin(pool, id).await;

    (id, token)
}

/// Create a product through the admin endpoints and return its id.
///
/// Mirrors the admin console flow: create a placeholder, then fill it in
/// with a full-field update.
pub async fn create_product(app: &Router, admin_token: &str, name: &str, price: &str) -> i64 {
    let (status, body) = send(
        app,
        request(Method::POST, "/products", Some(admin_token), None),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "product create failed: {body}");
    let id = body["id"].as_i64().expect("product has an id");

    let (status, body) = send(
        app,
        request(
            Method::PUT,
            &format!("/products/{id}"),
            Some(admin_token),
            Some(&json!({
                "name": name,
                "price": price,
                "description": "An integration test product",
                "brand": "Acme",
                "category": "Testing",
                "countInStock": 10,
                "images": ["/images/sample.jpg"],
                "tags": [],
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "product update failed: {body}");

    id
}

/// Place a single-line order and return its id.
pub async fn place_order(app: &Router, token: &str, product_id: i64, price: &str) -> i64 {
    let (status, body) = send(
        app,
        request(
            Method::POST,
            "/orders",
            Some(token),
            Some(&json!({
                "orderItems": [{
                    "product": product_id,
                    "name": "Ordered product",
                    "qty": 1,
                    "image": "/images/sample.jpg",
                    "price": price,
                }],
                "shippingAddress": {
                    "address": "1 Test Lane",
                    "city": "Testville",
                    "postalCode": "00000",
                    "country": "Testland",
                },
                "paymentMethod": "PayPal",
                "itemsPrice": price,
                "taxPrice": "0.00",
                "shippingPrice": "0.00",
                "totalPrice": price,
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "order create failed: {body}");

    body["id"].as_i64().expect("order has an id")
}

/// Mark an order delivered as admin and return the updated order.
pub async fn deliver_order(app: &Router, admin_token: &str, order_id: i64) -> Value {
    let (status, body) = send(
        app,
        request(
            Method::PUT,
            &format!("/orders/{order_id}/deliver"),
            Some(admin_token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "deliver failed: {body}");

    body
}
