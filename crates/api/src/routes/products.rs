//! Product catalog route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;

use bazaar_core::ProductId;

use crate::db::RepositoryError;
use crate::db::orders::OrderRepository;
use crate::db::products::{ListFilter, ProductRepository, SortKey};
use crate::error::{AppError, Result};
use crate::middleware::{RequireAdmin, RequireAuth};
use crate::models::product::{Product, Review, UpdateProduct, rating_in_range};
use crate::routes::parse_id;
use crate::state::AppState;

/// Query parameters for the public product listing.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub keyword: Option<String>,
    pub category: Option<String>,
    pub brand: Option<String>,
    pub sort: Option<String>,
    #[serde(default)]
    pub page_number: Option<i64>,
}

impl ListQuery {
    fn into_filter(self) -> ListFilter {
        ListFilter {
            keyword: self.keyword,
            category: self.category,
            brand: self.brand,
            sort: SortKey::parse(self.sort.as_deref()),
            page: self.page_number.unwrap_or(1),
        }
    }
}

/// Paginated listing response.
#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub products: Vec<Product>,
    pub page: i64,
    pub pages: i64,
}

/// A product with its reviews, for the detail page.
#[derive(Debug, Serialize)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    pub reviews: Vec<Review>,
}

/// Review create/update request body.
#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub rating: i32,
    pub comment: String,
}

/// `GET /products?keyword=&category=&brand=&sort=&pageNumber=`
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResponse>> {
    let page = ProductRepository::new(state.pool())
        .list(&query.into_filter())
        .await?;

    Ok(Json(ListResponse {
        products: page.products,
        page: page.page,
        pages: page.pages,
    }))
}

/// `GET /products/admin`
#[instrument(skip_all)]
pub async fn index_admin(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<Product>>> {
    let products = ProductRepository::new(state.pool()).list_all().await?;
    Ok(Json(products))
}

/// `GET /products/{id}`
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProductDetail>> {
    let id: ProductId = parse_id(&id, "Product")?;
    let products = ProductRepository::new(state.pool());

    let product = products
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;
    let reviews = products.list_reviews(id).await?;

    Ok(Json(ProductDetail { product, reviews }))
}

/// `POST /products`
///
/// Creates a placeholder owned by the calling admin; the client follows up
/// with a full-field update from the edit form.
#[instrument(skip(admin, state), fields(admin_id = %admin.id))]
pub async fn create(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<impl IntoResponse> {
    let product = ProductRepository::new(state.pool())
        .create_placeholder(admin.id)
        .await?;

    Ok((StatusCode::CREATED, Json(product)))
}

/// `PUT /products/{id}`
#[instrument(skip(state, body, _admin))]
pub async fn update(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UpdateProduct>,
) -> Result<Json<Product>> {
    let id: ProductId = parse_id(&id, "Product")?;

    let product = ProductRepository::new(state.pool())
        .update(id, &body)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

    Ok(Json(product))
}

/// `DELETE /products/{id}`
#[instrument(skip(state, _admin))]
pub async fn destroy(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    let id: ProductId = parse_id(&id, "Product")?;

    let deleted = ProductRepository::new(state.pool()).delete(id).await?;
    if !deleted {
        return Err(AppError::NotFound("Product".to_string()));
    }

    Ok(Json(json!({ "message": "Product removed" })))
}

/// `POST /products/{id}/reviews`
///
/// Purchase-gated: the caller needs at least one delivered order containing
/// the product, and at most one review per (product, user) pair exists.
#[instrument(skip(user, state, body), fields(user_id = %user.id))]
pub async fn create_review(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ReviewRequest>,
) -> Result<impl IntoResponse> {
    let id: ProductId = parse_id(&id, "Product")?;
    validate_rating(body.rating)?;

    let products = ProductRepository::new(state.pool());
    products
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

    let eligible = OrderRepository::new(state.pool())
        .has_delivered_order_with(user.id, id)
        .await?;
    if !eligible {
        return Err(AppError::BadRequest(
            "Product must be purchased and delivered before it can be reviewed".to_string(),
        ));
    }

    if products.get_review(id, user.id).await?.is_some() {
        return Err(AppError::BadRequest("Product already reviewed".to_string()));
    }

    let review = products
        .create_review(id, user.id, &user.name, body.rating, &body.comment)
        .await
        .map_err(|e| match e {
            // Two simultaneous submissions can both pass the lookup above;
            // the unique index catches the loser.
            RepositoryError::Conflict(_) => {
                AppError::BadRequest("Product already reviewed".to_string())
            }
            other => AppError::Database(other),
        })?;

    Ok((StatusCode::CREATED, Json(review)))
}

/// `PUT /products/{id}/reviews`
///
/// Rewrites the caller's existing review. Eligibility is not re-checked; the
/// review's prior existence already implies it.
#[instrument(skip(user, state, body), fields(user_id = %user.id))]
pub async fn update_review(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ReviewRequest>,
) -> Result<Json<Review>> {
    let id: ProductId = parse_id(&id, "Product")?;
    validate_rating(body.rating)?;

    let review = ProductRepository::new(state.pool())
        .update_review(id, user.id, body.rating, &body.comment)
        .await?
        .ok_or_else(|| AppError::NotFound("Review".to_string()))?;

    Ok(Json(review))
}

fn validate_rating(rating: i32) -> Result<()> {
    if !rating_in_range(rating) {
        return Err(AppError::BadRequest(
            "Rating must be between 1 and 5".to_string(),
        ));
    }
    Ok(())
}
