use axum::{
    extract::{Path, Query, State},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

use crate::{
    auth::AuthUser,
    entities::customer_notification,
    errors::ApiError,
    handlers::common::{paginated, PaginationParams},
    ApiResponse, ApiResult, AppState,
};

pub fn notification_routes() -> Router<AppState> {
    Router::new()
        .route("/notifications", get(list_notifications))
        .route("/notifications/unread_count", get(unread_count))
        .route("/notifications/read_all", post(mark_all_read))
        .route("/notifications/:id/read", post(mark_read))
}

pub async fn list_notifications(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<PaginationParams>,
) -> Result<Response, ApiError> {
    let customer_id = user.require_customer()?;
    let (page, per_page) = state.page_bounds(&params);
    let (items, total) = state
        .services
        .notifications
        .list_for_customer(customer_id, page, per_page)
        .await?;
    Ok(paginated(items, total, page, per_page))
}

pub async fn unread_count(State(state): State<AppState>, user: AuthUser) -> ApiResult<Value> {
    let customer_id = user.require_customer()?;
    let count = state.services.notifications.unread_count(customer_id).await?;
    Ok(Json(ApiResponse::success(json!({ "unread": count }))))
}

pub async fn mark_read(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<customer_notification::Model> {
    let customer_id = user.require_customer()?;
    let delivery = state.services.notifications.mark_read(customer_id, &id).await?;
    Ok(Json(ApiResponse::success(delivery)))
}

pub async fn mark_all_read(State(state): State<AppState>, user: AuthUser) -> ApiResult<Value> {
    let customer_id = user.require_customer()?;
    let updated = state.services.notifications.mark_all_read(customer_id).await?;
    Ok(Json(ApiResponse::success(json!({ "updated": updated }))))
}
