use axum::{
    extract::{Path, Query, State},
    response::Response,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::{
    auth::AuthUser,
    entities::{product, review},
    errors::ApiError,
    handlers::common::{created_response, paginated, validate_input, PaginationParams},
    services::products::{CreateProductRequest, ProductDetail, ProductFilter, UpdateProductRequest},
    ApiResponse, ApiResult, AppState,
};

pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products).post(create_product))
        .route(
            "/products/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/products/:id/reviews", get(list_product_reviews))
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProductQuery {
    pub category_id: Option<String>,
    pub search: Option<String>,
    /// Honoured for admins only.
    pub include_inactive: Option<bool>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

fn sees_inactive(user: &Option<AuthUser>, requested: bool) -> bool {
    requested && user.as_ref().is_some_and(AuthUser::is_admin)
}

pub async fn list_products(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Query(query): Query<ProductQuery>,
) -> Result<Response, ApiError> {
    let (page, per_page) = state.page_bounds(&PaginationParams {
        page: query.page,
        per_page: query.per_page,
    });
    let filter = ProductFilter {
        category_id: query.category_id,
        search: query.search,
        include_inactive: sees_inactive(&user, query.include_inactive.unwrap_or(false)),
    };
    let (products, total) = state.services.products.list(filter, page, per_page).await?;
    Ok(paginated(products, total, page, per_page))
}

pub async fn get_product(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<ProductDetail> {
    let detail = state
        .services
        .products
        .get(&id, sees_inactive(&user, true))
        .await?;
    Ok(Json(ApiResponse::success(detail)))
}

pub async fn create_product(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateProductRequest>,
) -> Result<Response, ApiError> {
    user.require_admin()?;
    validate_input(&payload)?;
    let created = state.services.products.create(payload).await?;
    Ok(created_response(created))
}

pub async fn update_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(payload): Json<UpdateProductRequest>,
) -> ApiResult<product::Model> {
    user.require_admin()?;
    validate_input(&payload)?;
    let updated = state.services.products.update(&id, payload).await?;
    Ok(Json(ApiResponse::success(updated)))
}

/// Deactivates the product; order history keeps pointing at it.
pub async fn delete_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<product::Model> {
    user.require_admin()?;
    let product = state.services.products.deactivate(&id).await?;
    Ok(Json(ApiResponse::with_message(product, "Product deactivated")))
}

pub async fn list_product_reviews(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Vec<review::Model>> {
    let reviews = state.services.reviews.list_for_product(&id).await?;
    Ok(Json(ApiResponse::success(reviews)))
}
