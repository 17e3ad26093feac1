use axum::{
    extract::State,
    routing::{get, put},
    Json, Router,
};

use crate::{
    auth::AuthUser,
    entities::store_setting,
    handlers::common::validate_input,
    services::store::{StoreInfo, UpdateStoreSettings},
    ApiResponse, ApiResult, AppState,
};

pub fn store_routes() -> Router<AppState> {
    Router::new()
        .route("/store", get(get_store))
        .route("/store/settings", put(update_settings))
}

pub async fn get_store(State(state): State<AppState>) -> ApiResult<StoreInfo> {
    let info = state.services.store.get_store().await?;
    Ok(Json(ApiResponse::success(info)))
}

pub async fn update_settings(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<UpdateStoreSettings>,
) -> ApiResult<store_setting::Model> {
    user.require_admin()?;
    validate_input(&payload)?;
    let settings = state.services.store.update_settings(payload).await?;
    Ok(Json(ApiResponse::success(settings)))
}
