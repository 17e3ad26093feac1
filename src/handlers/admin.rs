use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::{Duration, NaiveDate, Utc};
use serde::Deserialize;

use crate::{
    auth::AuthUser,
    entities::revenue_statistic,
    services::statistics::{store_day, Dashboard, ProductSales},
    ApiResponse, ApiResult, AppState,
};

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/dashboard", get(dashboard))
        .route("/admin/statistics/products", get(product_statistics))
        .route("/admin/statistics/revenue", get(revenue_statistics))
}

pub async fn dashboard(State(state): State<AppState>, user: AuthUser) -> ApiResult<Dashboard> {
    user.require_admin()?;
    let dashboard = state.services.statistics.dashboard().await?;
    Ok(Json(ApiResponse::success(dashboard)))
}

#[derive(Debug, Deserialize)]
pub struct ProductStatsQuery {
    #[serde(default = "default_limit")]
    pub limit: u64,
}

fn default_limit() -> u64 {
    10
}

pub async fn product_statistics(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ProductStatsQuery>,
) -> ApiResult<Vec<ProductSales>> {
    user.require_admin()?;
    let rows = state.services.statistics.product_statistics(query.limit).await?;
    Ok(Json(ApiResponse::success(rows)))
}

/// Defaults to the last 30 days, store time.
#[derive(Debug, Default, Deserialize)]
pub struct RevenueQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

pub async fn revenue_statistics(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<RevenueQuery>,
) -> ApiResult<Vec<revenue_statistic::Model>> {
    user.require_admin()?;
    let to = query.to.unwrap_or_else(|| store_day(Utc::now()));
    let from = query.from.unwrap_or(to - Duration::days(29));
    let rows = state
        .services
        .statistics
        .revenue_statistics(from, to)
        .await?;
    Ok(Json(ApiResponse::success(rows)))
}
