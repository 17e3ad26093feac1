use axum::{
    extract::{Path, Query, State},
    response::Response,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::{
    auth::AuthUser,
    entities::{
        order::{self, OrderStatus},
        order_detail,
    },
    errors::ApiError,
    handlers::common::{created_response, paginated, validate_input, PaginationParams},
    services::orders::{CheckoutInput, OrderWithDetails, UpdateStatusRequest},
    ApiResponse, ApiResult, AppState,
};

pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list_orders).post(checkout))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/status", put(update_order_status))
        .route("/orders/:id/cancel", post(cancel_order))
        .route("/order_details/order/:order_id", get(list_order_details))
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OrderQuery {
    /// Staff only.
    pub status: Option<OrderStatus>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

/// Customers get their own orders; staff get every order.
pub async fn list_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<OrderQuery>,
) -> Result<Response, ApiError> {
    let (page, per_page) = state.page_bounds(&PaginationParams {
        page: query.page,
        per_page: query.per_page,
    });
    let (orders, total) = if user.is_staff() {
        state
            .services
            .orders
            .list_all(query.status, page, per_page)
            .await?
    } else {
        state
            .services
            .orders
            .list_for_customer(&user.user_id, page, per_page)
            .await?
    };
    Ok(paginated(orders, total, page, per_page))
}

/// Places an order from the caller's cart.
pub async fn checkout(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CheckoutInput>,
) -> Result<Response, ApiError> {
    let customer_id = user.require_customer()?;
    validate_input(&payload)?;
    let order = state.services.orders.checkout(customer_id, payload).await?;
    Ok(created_response(order))
}

pub async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<OrderWithDetails> {
    let order = state.services.orders.get_order(&id, &user).await?;
    Ok(Json(ApiResponse::success(order)))
}

pub async fn update_order_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(payload): Json<UpdateStatusRequest>,
) -> ApiResult<order::Model> {
    user.require_staff()?;
    let order = state
        .services
        .orders
        .update_status(&id, payload.status, &user)
        .await?;
    Ok(Json(ApiResponse::success(order)))
}

pub async fn cancel_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<order::Model> {
    let order = if user.is_staff() {
        state
            .services
            .orders
            .update_status(&id, OrderStatus::Cancelled, &user)
            .await?
    } else {
        state.services.orders.cancel(&id, &user.user_id).await?
    };
    Ok(Json(ApiResponse::success(order)))
}

pub async fn list_order_details(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<String>,
) -> ApiResult<Vec<order_detail::Model>> {
    let details = state.services.orders.list_details(&order_id, &user).await?;
    Ok(Json(ApiResponse::success(details)))
}
