//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                      - Liveness check
//! GET  /health/ready                - Readiness check (pings the database)
//!
//! # Users & Auth
//! POST /users/login                 - Login, returns user + bearer token
//! POST /users                       - Register, returns user + bearer token
//! GET  /users/profile               - Current user (auth)
//! GET  /users                       - List users (admin)
//! GET  /users/{id}                  - Get user (admin)
//! PUT  /users/{id}                  - Update name/email/admin flag (admin)
//! DELETE /users/{id}                - Delete user (admin, not self)
//!
//! # Cart (auth)
//! GET  /users/cart                  - Read cart joined against the catalog
//! POST /users/cart                  - Add line / increment existing line
//! PUT  /users/cart/{productId}      - Set quantity (<= 0 removes)
//! DELETE /users/cart/{productId}    - Remove line
//! GET  /users/can-review/{productId} - Review eligibility + existing review
//!
//! # Products
//! GET  /products                    - Paginated/filtered/sorted listing
//! GET  /products/admin              - Full unpaginated listing (admin)
//! GET  /products/{id}               - Product detail with reviews
//! POST /products                    - Create placeholder product (admin)
//! PUT  /products/{id}               - Full-field update (admin)
//! DELETE /products/{id}             - Hard delete (admin)
//! POST /products/{id}/reviews       - Create review (auth, purchase-gated)
//! PUT  /products/{id}/reviews       - Update own review (auth)
//!
//! # Orders
//! POST /orders                      - Create order from cart snapshot (auth)
//! GET  /orders/myorders             - Caller's orders (auth)
//! GET  /orders/{id}                 - Order detail, owner or admin
//! GET  /orders                      - All orders (admin)
//! PUT  /orders/{id}/deliver         - Mark delivered (admin)
//!
//! # Upload
//! POST /upload                      - Multipart image upload to media host (admin)
//! ```

pub mod cart;
pub mod orders;
pub mod products;
pub mod upload;
pub mod users;

use std::str::FromStr;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::error::AppError;
use crate::state::AppState;

/// Create the user and cart routes router.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(users::register).get(users::list))
        .route("/login", post(users::login))
        .route("/profile", get(users::profile))
        .route("/cart", get(cart::read).post(cart::add))
        .route(
            "/cart/{productId}",
            put(cart::set_quantity).delete(cart::remove),
        )
        .route("/can-review/{productId}", get(cart::can_review))
        .route(
            "/{id}",
            get(users::show).put(users::update).delete(users::destroy),
        )
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index).post(products::create))
        .route("/admin", get(products::index_admin))
        .route(
            "/{id}",
            get(products::show)
                .put(products::update)
                .delete(products::destroy),
        )
        .route(
            "/{id}/reviews",
            post(products::create_review).put(products::update_review),
        )
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(orders::create).get(orders::index))
        .route("/myorders", get(orders::mine))
        .route("/{id}", get(orders::show))
        .route("/{id}/deliver", put(orders::deliver))
}

/// Create all API routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/users", user_routes())
        .nest("/products", product_routes())
        .nest("/orders", order_routes())
        .route("/upload", post(upload::upload))
}

/// Parse a path segment into a typed identifier.
///
/// A malformed identifier is indistinguishable from a missing document: both
/// yield a not-found response, never a server error.
pub(crate) fn parse_id<T: FromStr>(raw: &str, resource: &str) -> Result<T, AppError> {
    raw.parse()
        .map_err(|_| AppError::NotFound(resource.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bazaar_core::ProductId;

    use super::*;

    #[test]
    fn test_parse_id_valid() {
        let id: ProductId = parse_id("42", "Product").unwrap();
        assert_eq!(id, ProductId::new(42));
    }

    #[test]
    fn test_parse_id_malformed_is_not_found() {
        let result: Result<ProductId, _> = parse_id("64a1b2c3d4e5", "Product");
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
