//! Storefront API library
//!
//! Backend for the storefront mobile app: catalog, carts, orders,
//! notifications, promotions, admin statistics and ZaloPay payments, plus
//! the typed client the app talks to it through.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod client;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod ids;
pub mod middleware_helpers;
pub mod migrator;
pub mod services;
pub mod tracing;
pub mod zalopay;

use axum::{extract::FromRef, extract::State, response::Json, routing::get, Router};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use http::{header, HeaderName, Method};
use tower_http::{
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
};

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: Arc<config::AppConfig>,
    pub event_sender: events::EventSender,
    pub auth: Arc<auth::AuthService>,
    pub services: handlers::AppServices,
}

impl FromRef<AppState> for Arc<auth::AuthService> {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}

impl AppState {
    /// Wires every service over one connection and event channel.
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: config::AppConfig,
        event_sender: events::EventSender,
    ) -> Result<Self, errors::ServiceError> {
        let auth = Arc::new(auth::AuthService::new(
            auth::AuthConfig::new(
                config.jwt_secret.clone(),
                std::time::Duration::from_secs(config.jwt_expiration as u64),
            ),
            db.clone(),
            event_sender.clone(),
        ));
        let gateway = zalopay::ZaloPayGateway::new(config.zalopay.clone())?;
        let services = handlers::AppServices::new(db.clone(), event_sender.clone(), Arc::new(gateway));

        Ok(Self {
            db,
            config: Arc::new(config),
            event_sender,
            auth,
            services,
        })
    }

    /// Page and page size for list endpoints, clamped to the configured bounds.
    pub fn page_bounds(&self, params: &handlers::common::PaginationParams) -> (u64, u64) {
        let per_page = params
            .per_page
            .unwrap_or(self.config.api_default_page_size)
            .clamp(1, self.config.api_max_page_size.max(1));
        (params.page.unwrap_or(1).max(1), per_page)
    }
}

/// Success envelope of every JSON endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResponseMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::success(data)
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
    pub total_pages: u64,
}

impl<T> PaginatedResponse<T> {
    pub fn new(items: Vec<T>, total: u64, page: u64, per_page: u64) -> Self {
        let total_pages = if per_page == 0 { 0 } else { total.div_ceil(per_page) };
        Self {
            items,
            total,
            page,
            per_page,
            total_pages,
        }
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ApiError>;

/// Full application router: `/api/v1` routes plus the HTTP middleware stack.
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);
    let body_limit = state.config.max_body_size;

    Router::new()
        .nest("/api/v1", handlers::api_v1_routes())
        .route("/health", get(health_check))
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(cors)
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id_middleware,
        ))
        .layer(crate::tracing::configure_http_tracing())
}

fn cors_layer(config: &config::AppConfig) -> CorsLayer {
    if config.should_allow_permissive_cors() {
        return CorsLayer::permissive();
    }
    let origins: Vec<http::HeaderValue> = config
        .cors_allowed_origins
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| origin.parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static(middleware_helpers::REQUEST_ID_HEADER),
        ])
        .allow_credentials(config.cors_allow_credentials)
}

pub(crate) async fn health_check(
    State(state): State<AppState>,
) -> ApiResult<Value> {
    let db_status = match db::check_connection(&state.db).await {
        Ok(()) => "healthy",
        Err(_) => "unhealthy",
    };

    let health = json!({
        "status": db_status,
        "service": "storefront-api",
        "version": env!("CARGO_PKG_VERSION"),
        "checks": {
            "database": db_status,
            "zalopay": if state.config.zalopay.is_configured() { "configured" } else { "disabled" },
        },
        "timestamp": Utc::now().to_rfc3339(),
    });

    Ok(Json(ApiResponse::success(health)))
}
