//! Product and review models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use bazaar_core::{ProductId, ReviewId, UserId};

/// A catalog product.
///
/// `rating` and `num_reviews` are denormalized aggregates recomputed on every
/// review write (see [`mean_rating`]).
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub brand: String,
    pub category: String,
    pub description: String,
    pub price: Decimal,
    pub count_in_stock: i32,
    pub images: Vec<String>,
    pub tags: Vec<String>,
    /// Mean of all review ratings, zero when unreviewed.
    pub rating: Decimal,
    pub num_reviews: i32,
    /// Admin who created the product; null for legacy records.
    pub user: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A product review.
///
/// At most one review exists per (product, user) pair. The reviewer name is
/// denormalized at write time so renames don't rewrite history.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: ReviewId,
    #[serde(skip_serializing)]
    pub product_id: ProductId,
    pub user: UserId,
    pub name: String,
    pub rating: i32,
    pub comment: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Full-field replacement payload for `PUT /products/:id`.
///
/// Every editable field must be supplied - there are no partial-patch
/// semantics. Aggregates and ownership are never client-editable.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProduct {
    pub name: String,
    pub price: Decimal,
    pub description: String,
    pub brand: String,
    pub category: String,
    pub count_in_stock: i32,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Arithmetic mean of review ratings, rounded to two decimal places.
///
/// Returns zero for an empty slice (an unreviewed product has rating 0).
#[must_use]
pub fn mean_rating(ratings: &[i32]) -> Decimal {
    if ratings.is_empty() {
        return Decimal::ZERO;
    }

    let sum: Decimal = ratings.iter().map(|&r| Decimal::from(r)).sum();
    let count = Decimal::from(ratings.len() as u64);
    (sum / count).round_dp(2)
}

/// Whether a submitted rating is within the allowed 1-5 range.
#[must_use]
pub const fn rating_in_range(rating: i32) -> bool {
    matches!(rating, 1..=5)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_rating_empty() {
        assert_eq!(mean_rating(&[]), Decimal::ZERO);
    }

    #[test]
    fn test_mean_rating_single() {
        assert_eq!(mean_rating(&[4]), Decimal::from(4));
    }

    #[test]
    fn test_mean_rating_exact() {
        assert_eq!(mean_rating(&[1, 5]), Decimal::from(3));
        assert_eq!(mean_rating(&[2, 4, 3]), Decimal::from(3));
    }

    #[test]
    fn test_mean_rating_rounds_to_two_places() {
        // (5 + 4 + 4) / 3 = 4.333...
        let mean = mean_rating(&[5, 4, 4]);
        assert_eq!(mean.to_string(), "4.33");
    }

    #[test]
    fn test_rating_in_range() {
        assert!(rating_in_range(1));
        assert!(rating_in_range(5));
        assert!(!rating_in_range(0));
        assert!(!rating_in_range(6));
        assert!(!rating_in_range(-1));
    }
}
