use axum::{
    extract::{Path, State},
    response::Response,
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::{
    auth::AuthUser,
    entities::product,
    errors::ApiError,
    handlers::common::{created_response, no_content_response, validate_input},
    services::{favorites::FavoriteState, reviews::CreateReviewRequest},
    ApiResponse, ApiResult, AppState,
};

pub fn review_routes() -> Router<AppState> {
    Router::new()
        .route("/reviews", post(create_review))
        .route("/reviews/:id", delete(delete_review))
        .route("/favorites", get(list_favorites))
        .route("/favorites/toggle", post(toggle_favorite))
}

pub async fn create_review(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateReviewRequest>,
) -> Result<Response, ApiError> {
    let customer_id = user.require_customer()?;
    validate_input(&payload)?;
    let review = state.services.reviews.create(customer_id, payload).await?;
    Ok(created_response(review))
}

pub async fn delete_review(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    state.services.reviews.delete(&id, &user).await?;
    Ok(no_content_response())
}

pub async fn list_favorites(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Vec<product::Model>> {
    let customer_id = user.require_customer()?;
    let favorites = state.services.favorites.list(customer_id).await?;
    Ok(Json(ApiResponse::success(favorites)))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToggleFavoriteRequest {
    pub product_id: String,
}

pub async fn toggle_favorite(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<ToggleFavoriteRequest>,
) -> ApiResult<FavoriteState> {
    let customer_id = user.require_customer()?;
    let favorite = state
        .services
        .favorites
        .toggle(customer_id, &payload.product_id)
        .await?;
    Ok(Json(ApiResponse::success(favorite)))
}
