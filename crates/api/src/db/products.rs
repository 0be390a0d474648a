//! Product catalog and review repository.

use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};

use bazaar_core::{ProductId, UserId};

use super::{RepositoryError, conflict_on_unique};
use crate::models::product::{Product, Review, UpdateProduct, mean_rating};

/// Fixed page size for the public product listing.
pub const PAGE_SIZE: i64 = 9;

const PRODUCT_COLUMNS: &str = r#"id, name, brand, category, description, price, count_in_stock,
    images, tags, rating, num_reviews, user_id AS "user", created_at, updated_at"#;

const REVIEW_COLUMNS: &str =
    r#"id, product_id, user_id AS "user", name, rating, comment, created_at, updated_at"#;

/// Sort order for the product listing.
///
/// Anything other than the two recognized price sorts falls back to the
/// default rating-descending order with name ascending as the tie-break, so
/// equal ratings list deterministically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    /// `sort=price`
    PriceAsc,
    /// `sort=-price`
    PriceDesc,
    /// Default: rating descending, name ascending among ties.
    #[default]
    Rating,
}

impl SortKey {
    /// Parse the `sort` query parameter.
    #[must_use]
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("price") => Self::PriceAsc,
            Some("-price") => Self::PriceDesc,
            _ => Self::Rating,
        }
    }

    /// The ORDER BY clause for this sort.
    #[must_use]
    pub const fn order_clause(self) -> &'static str {
        match self {
            Self::PriceAsc => "price ASC, id ASC",
            Self::PriceDesc => "price DESC, id ASC",
            Self::Rating => "rating DESC, name ASC",
        }
    }
}

/// Filters for the paginated product listing.
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    /// Case-insensitive substring match across name, description, and tags.
    pub keyword: Option<String>,
    /// Exact-match category.
    pub category: Option<String>,
    /// Exact-match brand.
    pub brand: Option<String>,
    /// Sort order.
    pub sort: SortKey,
    /// 1-based page number.
    pub page: i64,
}

/// A page of products plus the total page count over the filtered set.
#[derive(Debug)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub page: i64,
    pub pages: i64,
}

/// Total page count for a filtered row count.
#[must_use]
pub const fn total_pages(count: i64, page_size: i64) -> i64 {
    // `i64::div_ceil` is unstable on this toolchain; this matches its semantics.
    let d = count / page_size;
    let r = count % page_size;
    if (r > 0 && page_size > 0) || (r < 0 && page_size < 0) {
        d + 1
    } else {
        d
    }
}

/// Clamp a requested page number to at least 1.
#[must_use]
pub const fn normalize_page(page: i64) -> i64 {
    if page < 1 { 1 } else { page }
}

/// Repository for product catalog operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Paginated, filterable, sortable product listing.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(&self, filter: &ListFilter) -> Result<ProductPage, RepositoryError> {
        let page = normalize_page(filter.page);

        // Total count over the full filtered set
        let mut count_query = QueryBuilder::new("SELECT COUNT(*) FROM products");
        push_filters(&mut count_query, filter);
        let count: i64 = count_query
            .build_query_scalar()
            .fetch_one(self.pool)
            .await?;

        let mut query = QueryBuilder::new(format!("SELECT {PRODUCT_COLUMNS} FROM products"));
        push_filters(&mut query, filter);
        query.push(" ORDER BY ");
        query.push(filter.sort.order_clause());
        query.push(" LIMIT ");
        query.push_bind(PAGE_SIZE);
        query.push(" OFFSET ");
        query.push_bind((page - 1) * PAGE_SIZE);

        let products = query.build_query_as::<Product>().fetch_all(self.pool).await?;

        Ok(ProductPage {
            products,
            page,
            pages: total_pages(count, PAGE_SIZE),
        })
    }

    /// Full unpaginated listing for the admin console.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<Product>, RepositoryError> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY id ASC"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(products)
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(product)
    }

    /// Insert a placeholder product owned by the given admin.
    ///
    /// The caller edits the placeholder afterwards via the full-field update.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn create_placeholder(&self, owner: UserId) -> Result<Product, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "INSERT INTO products (name, brand, category, description, price, count_in_stock, user_id)
             VALUES ('Sample name', 'Sample brand', 'Sample category', 'Sample description', 0, 0, $1)
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(owner)
        .fetch_one(self.pool)
        .await?;

        Ok(product)
    }

    /// Full-field overwrite of every editable product field.
    ///
    /// Returns `None` if the product doesn't exist. Review aggregates and
    /// ownership are not editable.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn update(
        &self,
        id: ProductId,
        changes: &UpdateProduct,
    ) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "UPDATE products
             SET name = $2, price = $3, description = $4, brand = $5, category = $6,
                 count_in_stock = $7, images = $8, tags = $9, updated_at = now()
             WHERE id = $1
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id)
        .bind(&changes.name)
        .bind(changes.price)
        .bind(&changes.description)
        .bind(&changes.brand)
        .bind(&changes.category)
        .bind(changes.count_in_stock)
        .bind(&changes.images)
        .bind(&changes.tags)
        .fetch_optional(self.pool)
        .await?;

        Ok(product)
    }

    /// Hard delete a product.
    ///
    /// Reviews cascade; order snapshots and cart lines keep their dangling
    /// references by design.
    ///
    /// # Returns
    ///
    /// Returns `true` if the product was deleted, `false` if it didn't exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// All reviews of a product, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_reviews(&self, product_id: ProductId) -> Result<Vec<Review>, RepositoryError> {
        let reviews = sqlx::query_as::<_, Review>(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE product_id = $1 ORDER BY created_at ASC"
        ))
        .bind(product_id)
        .fetch_all(self.pool)
        .await?;

        Ok(reviews)
    }

    /// The caller's review of a product, if any.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_review(
        &self,
        product_id: ProductId,
        user_id: UserId,
    ) -> Result<Option<Review>, RepositoryError> {
        let review = sqlx::query_as::<_, Review>(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE product_id = $1 AND user_id = $2"
        ))
        .bind(product_id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(review)
    }

    /// Append a review and recompute the product's aggregates, atomically.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the caller already reviewed the
    /// product (unique index on (`product_id`, `user_id`) backs the
    /// handler-level lookup against the check-then-act race).
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create_review(
        &self,
        product_id: ProductId,
        user_id: UserId,
        reviewer_name: &str,
        rating: i32,
        comment: &str,
    ) -> Result<Review, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let review = sqlx::query_as::<_, Review>(&format!(
            "INSERT INTO reviews (product_id, user_id, name, rating, comment)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {REVIEW_COLUMNS}"
        ))
        .bind(product_id)
        .bind(user_id)
        .bind(reviewer_name)
        .bind(rating)
        .bind(comment)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| conflict_on_unique(e, "product already reviewed"))?;

        refresh_aggregates(&mut tx, product_id).await?;
        tx.commit().await?;

        Ok(review)
    }

    /// Rewrite the caller's existing review and recompute aggregates.
    ///
    /// Returns `None` if the caller has no review of this product. Eligibility
    /// is not re-checked - the review's prior existence already implies it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn update_review(
        &self,
        product_id: ProductId,
        user_id: UserId,
        rating: i32,
        comment: &str,
    ) -> Result<Option<Review>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let review = sqlx::query_as::<_, Review>(&format!(
            "UPDATE reviews
             SET rating = $3, comment = $4, updated_at = now()
             WHERE product_id = $1 AND user_id = $2
             RETURNING {REVIEW_COLUMNS}"
        ))
        .bind(product_id)
        .bind(user_id)
        .bind(rating)
        .bind(comment)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(review) = review else {
            return Ok(None);
        };

        refresh_aggregates(&mut tx, product_id).await?;
        tx.commit().await?;

        Ok(Some(review))
    }
}

/// Recompute a product's denormalized rating mean and review count.
async fn refresh_aggregates(
    tx: &mut Transaction<'_, Postgres>,
    product_id: ProductId,
) -> Result<(), RepositoryError> {
    let ratings: Vec<i32> =
        sqlx::query_scalar("SELECT rating FROM reviews WHERE product_id = $1")
            .bind(product_id)
            .fetch_all(&mut **tx)
            .await?;

    let num_reviews = i32::try_from(ratings.len())
        .map_err(|_| RepositoryError::DataCorruption("review count overflow".to_owned()))?;

    sqlx::query("UPDATE products SET rating = $2, num_reviews = $3, updated_at = now() WHERE id = $1")
        .bind(product_id)
        .bind(mean_rating(&ratings))
        .bind(num_reviews)
        .execute(&mut **tx)
        .await?;

    Ok(())
}

/// Append the WHERE clause shared by the count and page queries.
fn push_filters(query: &mut QueryBuilder<'_, Postgres>, filter: &ListFilter) {
    query.push(" WHERE TRUE");

    if let Some(keyword) = filter.keyword.as_deref().filter(|k| !k.is_empty()) {
        let pattern = format!("%{}%", escape_like(keyword));
        query.push(" AND (name ILIKE ");
        query.push_bind(pattern.clone());
        query.push(" OR description ILIKE ");
        query.push_bind(pattern.clone());
        query.push(" OR EXISTS (SELECT 1 FROM unnest(tags) AS tag WHERE tag ILIKE ");
        query.push_bind(pattern);
        query.push("))");
    }

    if let Some(category) = filter.category.as_deref().filter(|c| !c.is_empty()) {
        query.push(" AND category = ");
        query.push_bind(category.to_owned());
    }

    if let Some(brand) = filter.brand.as_deref().filter(|b| !b.is_empty()) {
        query.push(" AND brand = ");
        query.push_bind(brand.to_owned());
    }
}

/// Escape LIKE metacharacters so user keywords match literally.
fn escape_like(keyword: &str) -> String {
    keyword
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
