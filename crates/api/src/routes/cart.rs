//! Cart route handlers.
//!
//! Every mutation responds with the re-read cart so the client never has to
//! reconstruct state locally. Lines whose product has been deleted come back
//! with null name/price/image.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use bazaar_core::ProductId;

use crate::db::carts::CartRepository;
use crate::db::orders::OrderRepository;
use crate::db::products::ProductRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::cart::QuantityUpdate;
use crate::models::{CartLine, Review};
use crate::routes::parse_id;
use crate::state::AppState;

/// Add-to-cart request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddRequest {
    pub product_id: ProductId,
    #[serde(default = "default_qty")]
    pub qty: i32,
}

const fn default_qty() -> i32 {
    1
}

/// Quantity update request body.
#[derive(Debug, Deserialize)]
pub struct QuantityRequest {
    pub qty: i32,
}

/// Review eligibility for a product.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CanReviewResponse {
    /// Whether the caller has a delivered order containing the product.
    pub can_review: bool,
    /// The caller's existing review, if any.
    pub review: Option<Review>,
}

/// `GET /users/cart`
#[instrument(skip_all)]
pub async fn read(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
) -> Result<Json<Vec<CartLine>>> {
    let cart = CartRepository::new(state.pool()).read(user.id).await?;
    Ok(Json(cart))
}

/// `POST /users/cart`
///
/// Adds a line, or increments the quantity of an existing one. Only the
/// quantity update endpoint carries remove-on-zero semantics; a non-positive
/// add quantity is rejected outright.
#[instrument(skip(user, state), fields(user_id = %user.id))]
pub async fn add(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Json(body): Json<AddRequest>,
) -> Result<Json<Vec<CartLine>>> {
    if body.qty < 1 {
        return Err(AppError::BadRequest(
            "Quantity must be at least 1".to_string(),
        ));
    }

    let carts = CartRepository::new(state.pool());
    carts.add(user.id, body.product_id, body.qty).await?;

    Ok(Json(carts.read(user.id).await?))
}

/// `PUT /users/cart/{productId}`
///
/// Replaces the line's quantity; zero or below removes it. Updating an absent
/// line is a no-op returning the unchanged cart.
#[instrument(skip(user, state), fields(user_id = %user.id))]
pub async fn set_quantity(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Path(product_id): Path<String>,
    Json(body): Json<QuantityRequest>,
) -> Result<Json<Vec<CartLine>>> {
    let product_id: ProductId = parse_id(&product_id, "Product")?;
    let carts = CartRepository::new(state.pool());

    match QuantityUpdate::from_requested(body.qty) {
        QuantityUpdate::Set(qty) => carts.set_quantity(user.id, product_id, qty).await?,
        QuantityUpdate::Remove => carts.remove(user.id, product_id).await?,
    }

    Ok(Json(carts.read(user.id).await?))
}

/// `DELETE /users/cart/{productId}`
///
/// Removing a nonexistent line is a no-op returning the unchanged cart.
#[instrument(skip(user, state), fields(user_id = %user.id))]
pub async fn remove(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> Result<Json<Vec<CartLine>>> {
    let product_id: ProductId = parse_id(&product_id, "Product")?;
    let carts = CartRepository::new(state.pool());

    carts.remove(user.id, product_id).await?;

    Ok(Json(carts.read(user.id).await?))
}

/// `GET /users/can-review/{productId}`
///
/// Reports the purchase-then-delivery eligibility alongside the caller's
/// existing review, so the client can offer create vs. edit.
#[instrument(skip(user, state), fields(user_id = %user.id))]
pub async fn can_review(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> Result<Json<CanReviewResponse>> {
    let product_id: ProductId = parse_id(&product_id, "Product")?;

    let can_review = OrderRepository::new(state.pool())
        .has_delivered_order_with(user.id, product_id)
        .await?;
    let review = ProductRepository::new(state.pool())
        .get_review(product_id, user.id)
        .await?;

    Ok(Json(CanReviewResponse { can_review, review }))
}
