//! Order route handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use bazaar_core::OrderId;

use crate::db::orders::{OrderRepository, OrderTotals, OrderWithUser};
use crate::error::{AppError, Result};
use crate::middleware::{RequireAdmin, RequireAuth};
use crate::models::order::{Order, OrderItem, ShippingAddress, SubmittedItem};
use crate::routes::parse_id;
use crate::state::AppState;

/// Checkout request body.
///
/// Price totals are accepted as submitted; see the repository docs for the
/// trust boundary this implies.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub order_items: Vec<SubmittedItem>,
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    pub items_price: Decimal,
    pub tax_price: Decimal,
    pub shipping_price: Decimal,
    pub total_price: Decimal,
}

/// An order with its line items.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    #[serde(flatten)]
    pub order: Order,
    pub order_items: Vec<OrderItem>,
}

/// Minimal owner projection joined onto order reads.
#[derive(Debug, Serialize)]
pub struct OrderOwner {
    pub name: String,
    pub email: String,
}

/// An order with line items and its owner, for the detail page.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub order_items: Vec<OrderItem>,
    /// `None` when the owning user has since been deleted.
    pub user: Option<OrderOwner>,
}

/// An order with its owner, for the admin order table.
#[derive(Debug, Serialize)]
pub struct OrderSummary {
    #[serde(flatten)]
    pub order: Order,
    pub user: Option<OrderOwner>,
}

fn owner_of(row: &OrderWithUser) -> Option<OrderOwner> {
    match (&row.user_name, &row.user_email) {
        (Some(name), Some(email)) => Some(OrderOwner {
            name: name.clone(),
            email: email.clone(),
        }),
        _ => None,
    }
}

/// `POST /orders`
///
/// Snapshots the submitted lines into an immutable order and clears the
/// caller's cart, in one transaction.
#[instrument(skip(user, state, body), fields(user_id = %user.id))]
pub async fn create(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Json(body): Json<CreateOrderRequest>,
) -> Result<impl IntoResponse> {
    if body.order_items.is_empty() {
        return Err(AppError::BadRequest("No order items".to_string()));
    }

    let items: Vec<OrderItem> = body
        .order_items
        .into_iter()
        .map(SubmittedItem::into_snapshot)
        .collect();

    let totals = OrderTotals {
        items_price: body.items_price,
        tax_price: body.tax_price,
        shipping_price: body.shipping_price,
        total_price: body.total_price,
    };

    let order = OrderRepository::new(state.pool())
        .create(
            user.id,
            &items,
            &body.shipping_address,
            &body.payment_method,
            totals,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(OrderResponse {
            order,
            order_items: items,
        }),
    ))
}

/// `GET /orders/myorders`
#[instrument(skip_all)]
pub async fn mine(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
) -> Result<Json<Vec<Order>>> {
    let orders = OrderRepository::new(state.pool()).list_mine(user.id).await?;
    Ok(Json(orders))
}

/// `GET /orders/{id}`
///
/// Restricted to the order's owner or an admin. Non-owners get the same
/// not-found as a genuinely absent order, so order ids can't be probed.
#[instrument(skip(user, state), fields(user_id = %user.id))]
pub async fn show(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<OrderDetail>> {
    let id: OrderId = parse_id(&id, "Order")?;
    let orders = OrderRepository::new(state.pool());

    let row = orders
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order".to_string()))?;

    if row.order.user != user.id && !user.is_admin {
        return Err(AppError::NotFound("Order".to_string()));
    }

    let order_items = orders.list_items(id).await?;
    let owner = owner_of(&row);

    Ok(Json(OrderDetail {
        order: row.order,
        order_items,
        user: owner,
    }))
}

/// `GET /orders`
#[instrument(skip_all)]
pub async fn index(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<OrderSummary>>> {
    let rows = OrderRepository::new(state.pool()).list_all().await?;

    let orders = rows
        .into_iter()
        .map(|row| {
            let user = owner_of(&row);
            OrderSummary {
                order: row.order,
                user,
            }
        })
        .collect();

    Ok(Json(orders))
}

/// `PUT /orders/{id}/deliver`
///
/// Re-delivering an already-delivered order succeeds and overwrites the
/// delivered timestamp; there is no state-machine guard.
#[instrument(skip(state, _admin))]
pub async fn deliver(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Order>> {
    let id: OrderId = parse_id(&id, "Order")?;

    let order = OrderRepository::new(state.pool())
        .mark_delivered(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order".to_string()))?;

    Ok(Json(order))
}
