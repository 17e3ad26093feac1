use axum::{
    extract::{Path, State},
    response::Response,
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{json, Value};

use crate::{
    auth::AuthUser,
    entities::cart_detail,
    errors::ApiError,
    handlers::common::{created_response, no_content_response, validate_input},
    services::cart::{AddCartDetailRequest, CartItem, CartView, UpdateCartDetailRequest},
    ApiResponse, ApiResult, AppState,
};

pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/carts", get(my_cart))
        .route("/carts/:id", get(get_cart))
        .route("/cart_details", post(add_cart_detail))
        .route(
            "/cart_details/:id",
            put(update_cart_detail).delete(remove_cart_detail),
        )
        .route(
            "/cart_details/cart/:cart_id",
            get(list_cart_details).delete(clear_cart),
        )
}

/// The caller's cart, created on first visit.
pub async fn my_cart(State(state): State<AppState>, user: AuthUser) -> ApiResult<CartView> {
    let customer_id = user.require_customer()?;
    let cart = state.services.cart.get_or_create_cart(customer_id).await?;
    let view = state.services.cart.get_cart(&cart.id, customer_id).await?;
    Ok(Json(ApiResponse::success(view)))
}

pub async fn get_cart(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<CartView> {
    let customer_id = user.require_customer()?;
    let view = state.services.cart.get_cart(&id, customer_id).await?;
    Ok(Json(ApiResponse::success(view)))
}

pub async fn add_cart_detail(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<AddCartDetailRequest>,
) -> Result<Response, ApiError> {
    let customer_id = user.require_customer()?;
    validate_input(&payload)?;
    let detail = state.services.cart.add_detail(customer_id, payload).await?;
    Ok(created_response(detail))
}

/// Quantity 0 removes the line and answers with `null` data.
pub async fn update_cart_detail(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(payload): Json<UpdateCartDetailRequest>,
) -> ApiResult<Option<cart_detail::Model>> {
    let customer_id = user.require_customer()?;
    validate_input(&payload)?;
    let detail = state
        .services
        .cart
        .update_detail(customer_id, &id, payload)
        .await?;
    Ok(Json(ApiResponse::success(detail)))
}

pub async fn remove_cart_detail(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let customer_id = user.require_customer()?;
    state.services.cart.remove_detail(customer_id, &id).await?;
    Ok(no_content_response())
}

pub async fn list_cart_details(
    State(state): State<AppState>,
    user: AuthUser,
    Path(cart_id): Path<String>,
) -> ApiResult<Vec<CartItem>> {
    let customer_id = user.require_customer()?;
    let items = state.services.cart.list_details(&cart_id, customer_id).await?;
    Ok(Json(ApiResponse::success(items)))
}

pub async fn clear_cart(
    State(state): State<AppState>,
    user: AuthUser,
    Path(cart_id): Path<String>,
) -> ApiResult<Value> {
    let customer_id = user.require_customer()?;
    let removed = state.services.cart.clear(customer_id, &cart_id).await?;
    Ok(Json(ApiResponse::success(json!({ "removed": removed }))))
}
