use axum::{extract::State, response::Response, routing::post, Json, Router};
use tracing::info;

use crate::{
    auth::{AuthUser, CreateStaffRequest, LoginRequest, RegisterRequest, TokenResponse},
    errors::ApiError,
    handlers::common::{created_response, validate_input},
    ApiResponse, ApiResult, AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/admin/staff", post(create_staff))
}

/// Customer sign-up; answers with a token so the app is signed in at once.
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Response, ApiError> {
    validate_input(&payload)?;
    let token = state.auth.register_customer(payload).await?;
    Ok(created_response(token))
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<TokenResponse> {
    validate_input(&payload)?;
    let token = state.auth.login(payload).await?;
    Ok(Json(ApiResponse::success(token)))
}

pub async fn create_staff(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateStaffRequest>,
) -> Result<Response, ApiError> {
    user.require_admin()?;
    validate_input(&payload)?;
    let staff = state.auth.create_staff(payload).await?;
    info!(admin_id = %user.user_id, staff_id = %staff.id, "Staff account added");
    Ok(created_response(staff))
}
