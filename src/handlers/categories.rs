use axum::{
    extract::{Path, State},
    response::Response,
    routing::get,
    Json, Router,
};

use crate::{
    auth::AuthUser,
    entities::category,
    errors::ApiError,
    handlers::common::{created_response, no_content_response, validate_input},
    services::categories::CategoryInput,
    ApiResponse, ApiResult, AppState,
};

pub fn category_routes() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list_categories).post(create_category))
        .route(
            "/categories/:id",
            get(get_category).put(update_category).delete(delete_category),
        )
}

pub async fn list_categories(State(state): State<AppState>) -> ApiResult<Vec<category::Model>> {
    let categories = state.services.categories.list().await?;
    Ok(Json(ApiResponse::success(categories)))
}

pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<category::Model> {
    let category = state.services.categories.get(&id).await?;
    Ok(Json(ApiResponse::success(category)))
}

pub async fn create_category(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CategoryInput>,
) -> Result<Response, ApiError> {
    user.require_admin()?;
    validate_input(&payload)?;
    let created = state.services.categories.create(payload).await?;
    Ok(created_response(created))
}

pub async fn update_category(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(payload): Json<CategoryInput>,
) -> ApiResult<category::Model> {
    user.require_admin()?;
    validate_input(&payload)?;
    let updated = state.services.categories.update(&id, payload).await?;
    Ok(Json(ApiResponse::success(updated)))
}

pub async fn delete_category(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    user.require_admin()?;
    state.services.categories.delete(&id).await?;
    Ok(no_content_response())
}
