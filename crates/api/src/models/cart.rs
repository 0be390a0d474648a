//! Cart ledger model.

use rust_decimal::Decimal;
use serde::Serialize;

use bazaar_core::ProductId;

/// A single cart line joined against the current catalog.
///
/// Cart lines reference products by identity only. `name`, `price`, and
/// `image` are the *current* catalog values resolved at read time, not
/// snapshots - all three are absent when the product has been deleted, which
/// the client detects to flag the line as stale and block checkout.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    /// Product reference; the sole stored identity of the line.
    pub product: ProductId,
    /// Stored quantity, always >= 1.
    pub quantity: i32,
    /// Current product name, if the product still exists.
    pub name: Option<String>,
    /// Current product price, if the product still exists.
    pub price: Option<Decimal>,
    /// First image of the product, if any.
    pub image: Option<String>,
}

/// Decide what a quantity update means for a cart line.
///
/// An update to zero or below removes the entry; anything else replaces the
/// stored quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityUpdate {
    /// Replace the stored quantity with this value.
    Set(i32),
    /// Remove the line entirely.
    Remove,
}

impl QuantityUpdate {
    /// Classify a requested quantity.
    #[must_use]
    pub const fn from_requested(qty: i32) -> Self {
        if qty <= 0 { Self::Remove } else { Self::Set(qty) }
    }
}
