//! Order models.
//!
//! Orders are immutable snapshots: item fields are copied from the submitted
//! cart at creation time and deliberately decoupled from later catalog
//! changes. Price totals are stored as submitted by the client - a documented
//! trust boundary, not a server-side recomputation.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bazaar_core::{OrderId, ProductId, UserId};

/// A placed order.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub user: UserId,
    #[sqlx(flatten)]
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    pub items_price: Decimal,
    pub tax_price: Decimal,
    pub shipping_price: Decimal,
    pub total_price: Decimal,
    pub is_paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
    /// `NotDelivered -> Delivered`, one-directional, admin-triggered.
    pub is_delivered: bool,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Shipping destination captured at checkout.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
}

/// An order line snapshot.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product: ProductId,
    pub name: String,
    pub qty: i32,
    pub image: String,
    pub price: Decimal,
}

/// A cart line as submitted at checkout, before snapshotting.
///
/// Clients may send either a multi-image list or a legacy single-image field;
/// [`SubmittedItem::into_snapshot`] prefers the first list element and falls
/// back to the single field.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedItem {
    pub product: ProductId,
    pub name: String,
    pub qty: i32,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub image: Option<String>,
    pub price: Decimal,
}

impl SubmittedItem {
    /// Re-shape the submitted line into the minimal immutable snapshot.
    #[must_use]
    pub fn into_snapshot(self) -> OrderItem {
        let image = self
            .images
            .into_iter()
            .next()
            .or(self.image)
            .unwrap_or_default();

        OrderItem {
            product: self.product,
            name: self.name,
            qty: self.qty,
            image,
            price: self.price,
        }
    }
}
