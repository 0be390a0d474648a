//! Order repository.
//!
//! Order creation and the cart clear run in one transaction: a crash between
//! the two can no longer leave an order placed with the cart intact.

use rust_decimal::Decimal;
use sqlx::PgPool;

use bazaar_core::{OrderId, ProductId, UserId};

use super::RepositoryError;
use crate::models::order::{Order, OrderItem, ShippingAddress};

const ORDER_COLUMNS: &str = r#"id, user_id AS "user", address, city, postal_code, country,
    payment_method, items_price, tax_price, shipping_price, total_price,
    is_paid, paid_at, is_delivered, delivered_at, created_at"#;

// Qualified variant for queries that join against users.
const ORDER_COLUMNS_QUALIFIED: &str = r#"o.id, o.user_id AS "user", o.address, o.city,
    o.postal_code, o.country, o.payment_method, o.items_price, o.tax_price,
    o.shipping_price, o.total_price, o.is_paid, o.paid_at, o.is_delivered,
    o.delivered_at, o.created_at"#;

/// Price totals submitted by the client at checkout.
///
/// Accepted verbatim; the server does not recompute them from catalog prices.
#[derive(Debug, Clone, Copy)]
pub struct OrderTotals {
    pub items_price: Decimal,
    pub tax_price: Decimal,
    pub shipping_price: Decimal,
    pub total_price: Decimal,
}

/// An order joined with a minimal projection of its owner.
///
/// The owner is `None` when the user has since been deleted - orders outlive
/// their users.
#[derive(Debug, sqlx::FromRow)]
pub struct OrderWithUser {
    #[sqlx(flatten)]
    pub order: Order,
    pub user_name: Option<String>,
    pub user_email: Option<String>,
}

/// Repository for order operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Persist an order snapshot and clear the purchaser's cart atomically.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any statement fails; the
    /// transaction rolls back and neither the order nor the cart changes.
    pub async fn create(
        &self,
        user_id: UserId,
        items: &[OrderItem],
        shipping_address: &ShippingAddress,
        payment_method: &str,
        totals: OrderTotals,
    ) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let order = sqlx::query_as::<_, Order>(&format!(
            "INSERT INTO orders (user_id, address, city, postal_code, country, payment_method,
                                 items_price, tax_price, shipping_price, total_price)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(user_id)
        .bind(&shipping_address.address)
        .bind(&shipping_address.city)
        .bind(&shipping_address.postal_code)
        .bind(&shipping_address.country)
        .bind(payment_method)
        .bind(totals.items_price)
        .bind(totals.tax_price)
        .bind(totals.shipping_price)
        .bind(totals.total_price)
        .fetch_one(&mut *tx)
        .await?;

        for item in items {
            sqlx::query(
                "INSERT INTO order_items (order_id, product_id, name, qty, image, price)
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(order.id)
            .bind(item.product)
            .bind(&item.name)
            .bind(item.qty)
            .bind(&item.image)
            .bind(item.price)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(order)
    }

    /// Get an order with its owner's name and email for display.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<OrderWithUser>, RepositoryError> {
        let order = sqlx::query_as::<_, OrderWithUser>(&format!(
            "SELECT {ORDER_COLUMNS_QUALIFIED}, u.name AS user_name, u.email AS user_email
             FROM orders o
             LEFT JOIN users u ON u.id = o.user_id
             WHERE o.id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(order)
    }

    /// Line items of an order, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_items(&self, id: OrderId) -> Result<Vec<OrderItem>, RepositoryError> {
        let items = sqlx::query_as::<_, OrderItem>(
            "SELECT product_id AS product, name, qty, image, price
             FROM order_items WHERE order_id = $1 ORDER BY id ASC",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        Ok(items)
    }

    /// The caller's own orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_mine(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(orders)
    }

    /// All orders with a minimal user projection, newest first. Admin only.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<OrderWithUser>, RepositoryError> {
        let orders = sqlx::query_as::<_, OrderWithUser>(&format!(
            "SELECT {ORDER_COLUMNS_QUALIFIED}, u.name AS user_name, u.email AS user_email
             FROM orders o
             LEFT JOIN users u ON u.id = o.user_id
             ORDER BY o.created_at DESC"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(orders)
    }

    /// Transition an order to delivered.
    ///
    /// Deliberately unguarded: re-marking an already-delivered order succeeds
    /// and overwrites `delivered_at`. Returns `None` if the order doesn't
    /// exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn mark_delivered(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "UPDATE orders SET is_delivered = TRUE, delivered_at = now()
             WHERE id = $1
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(order)
    }

    /// Whether the user has at least one delivered order containing the
    /// product - the review-eligibility precondition.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn has_delivered_order_with(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<bool, RepositoryError> {
        let eligible: bool = sqlx::query_scalar(
            "SELECT EXISTS (
                 SELECT 1
                 FROM orders o
                 JOIN order_items oi ON oi.order_id = o.id
                 WHERE o.user_id = $1 AND oi.product_id = $2 AND o.is_delivered
             )",
        )
        .bind(user_id)
        .bind(product_id)
        .fetch_one(self.pool)
        .await?;

        Ok(eligible)
    }
}
