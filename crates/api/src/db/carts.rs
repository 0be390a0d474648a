//! Cart ledger repository.
//!
//! The cart is an owned map keyed by (`user_id`, `product_id`) - mutations are
//! single-statement upserts/deletes, so concurrent edits from the same user
//! are last-write-wins at the row level with no application-level merge.

use sqlx::PgPool;

use bazaar_core::{ProductId, UserId};

use super::RepositoryError;
use crate::models::CartLine;

/// Repository for cart ledger operations.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Add a product to the cart, incrementing the quantity of an existing line.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn add(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO cart_items (user_id, product_id, quantity)
             VALUES ($1, $2, $3)
             ON CONFLICT (user_id, product_id)
             DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity",
        )
        .bind(user_id)
        .bind(product_id)
        .bind(quantity)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Replace the quantity of an existing line.
    ///
    /// Updating an absent line is a no-op; callers that want remove-on-zero
    /// semantics decide between this and [`Self::remove`] up front.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn set_quantity(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE cart_items SET quantity = $3
             WHERE user_id = $1 AND product_id = $2",
        )
        .bind(user_id)
        .bind(product_id)
        .bind(quantity)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Remove a line from the cart.
    ///
    /// Removing a nonexistent line is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn remove(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND product_id = $2")
            .bind(user_id)
            .bind(product_id)
            .execute(self.pool)
            .await?;

        Ok(())
    }

    /// Read the cart, joining every line against the current catalog.
    ///
    /// Product fields are `NULL` (and so `None`) for lines whose product has
    /// been deleted - deliberately surfaced to the caller rather than
    /// filtered out.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn read(&self, user_id: UserId) -> Result<Vec<CartLine>, RepositoryError> {
        let lines = sqlx::query_as::<_, CartLine>(
            "SELECT ci.product_id AS product,
                    ci.quantity,
                    p.name,
                    p.price,
                    p.images[1] AS image
             FROM cart_items ci
             LEFT JOIN products p ON p.id = ci.product_id
             WHERE ci.user_id = $1
             ORDER BY ci.created_at ASC",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(lines)
    }
}
