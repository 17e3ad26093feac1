use axum::{
    extract::{Query, State},
    response::Response,
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;

use crate::{
    auth::AuthUser,
    entities::event,
    errors::ApiError,
    handlers::common::{created_response, validate_input},
    services::promotions::CreateEventRequest,
    ApiResponse, ApiResult, AppState,
};

pub fn event_routes() -> Router<AppState> {
    Router::new().route("/events", get(list_events).post(create_event))
}

#[derive(Debug, Default, Deserialize)]
pub struct EventQuery {
    /// `?all=true` lists past and upcoming events too.
    #[serde(default)]
    pub all: bool,
}

pub async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<EventQuery>,
) -> ApiResult<Vec<event::Model>> {
    let events = if query.all {
        state.services.promotions.list_all().await?
    } else {
        state.services.promotions.list_active(Utc::now()).await?
    };
    Ok(Json(ApiResponse::success(events)))
}

pub async fn create_event(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateEventRequest>,
) -> Result<Response, ApiError> {
    user.require_admin()?;
    validate_input(&payload)?;
    let created = state.services.promotions.create(payload).await?;
    Ok(created_response(created))
}
