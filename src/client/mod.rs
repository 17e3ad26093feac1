//! Typed HTTP client for the storefront API.
//!
//! [`StorefrontClient`] mirrors the route table one method per endpoint and
//! unwraps the `ApiResponse` envelope, so callers only see the payload or a
//! [`ClientError`]. Requests are sent once; there are no retries.

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::auth::{LoginRequest, RegisterRequest, TokenResponse};
use crate::entities::{
    cart_detail, category, customer_notification, event, order, order_detail, product,
    review, revenue_statistic, store_setting,
};
use crate::errors::ErrorResponse;
use crate::handlers::{
    common::PaginationParams, orders::OrderQuery, products::ProductQuery,
    reviews::ToggleFavoriteRequest,
};
use crate::services::{
    cart::{AddCartDetailRequest, CartItem, CartView, UpdateCartDetailRequest},
    categories::CategoryInput,
    favorites::FavoriteState,
    notifications::NotificationView,
    orders::{CheckoutInput, OrderWithDetails, UpdateStatusRequest},
    payments::{CreatePaymentRequest, PaymentSession, PaymentStatusView, QueryPaymentRequest},
    products::{CreateProductRequest, ProductDetail, UpdateProductRequest},
    promotions::CreateEventRequest,
    reviews::CreateReviewRequest,
    statistics::{Dashboard, ProductSales},
    store::{StoreInfo, UpdateStoreSettings},
};
use crate::{ApiResponse, PaginatedResponse};

mod poller;

pub use poller::{PaymentPoller, PaymentStatusSource, PollOutcome};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const API_PREFIX: &str = "/api/v1";

#[derive(Debug, Error)]
pub enum ClientError {
    /// Missing, expired or rejected token.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("API error ({status}): {message}")]
    Api { status: StatusCode, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl ClientError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Unauthorized(_) => Some(StatusCode::UNAUTHORIZED),
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Http(err) => err.status(),
            ClientError::Decode(_) => None,
        }
    }
}

/// Data shown on the customer home screen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HomeScreen {
    pub store: StoreInfo,
    pub categories: Vec<category::Model>,
    pub products: Vec<product::Model>,
    pub events: Vec<event::Model>,
}

/// Data shown on the admin landing page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminOverview {
    pub dashboard: Dashboard,
    pub top_products: Vec<ProductSales>,
    pub pending_orders: Vec<order::Model>,
}

#[derive(Debug, Deserialize)]
struct UnreadCount {
    unread: u64,
}

#[derive(Debug, Deserialize)]
struct UpdatedCount {
    updated: u64,
}

#[derive(Debug, Deserialize)]
struct RemovedCount {
    removed: u64,
}

#[derive(Clone)]
pub struct StorefrontClient {
    base_url: String,
    http: Client,
    token: Option<String>,
}

impl std::fmt::Debug for StorefrontClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorefrontClient")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish_non_exhaustive()
    }
}

impl StorefrontClient {
    /// Client whose requests give up after [`DEFAULT_REQUEST_TIMEOUT`].
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = Client::builder()
            .timeout(DEFAULT_REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self::with_http(base_url, http)
    }

    pub fn with_http(base_url: impl Into<String>, http: Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            http,
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .http
            .request(method, format!("{}{}{}", self.base_url, API_PREFIX, path));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ClientError> {
        let response = check(builder.send().await?).await?;
        let envelope: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))?;
        envelope
            .data
            .ok_or_else(|| ClientError::Decode("response carried no data".to_string()))
    }

    async fn send_empty(&self, builder: RequestBuilder) -> Result<(), ClientError> {
        check(builder.send().await?).await?;
        Ok(())
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.send(self.request(Method::GET, path)).await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        self.send(self.request(Method::POST, path).json(body)).await
    }

    async fn put<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        self.send(self.request(Method::PUT, path).json(body)).await
    }

    // auth

    /// Registers a customer and keeps the returned token for later calls.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn register(&mut self, request: &RegisterRequest) -> Result<TokenResponse, ClientError> {
        let token: TokenResponse = self.post("/auth/register", request).await?;
        self.token = Some(token.access_token.clone());
        Ok(token)
    }

    /// Signs in and keeps the returned token for later calls.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn login(&mut self, request: &LoginRequest) -> Result<TokenResponse, ClientError> {
        let token: TokenResponse = self.post("/auth/login", request).await?;
        debug!(role = %token.role, "Signed in");
        self.token = Some(token.access_token.clone());
        Ok(token)
    }

    pub fn logout(&mut self) {
        self.token = None;
    }

    // catalog

    pub async fn categories(&self) -> Result<Vec<category::Model>, ClientError> {
        self.get("/categories").await
    }

    pub async fn category(&self, id: &str) -> Result<category::Model, ClientError> {
        self.get(&format!("/categories/{}", id)).await
    }

    pub async fn create_category(&self, input: &CategoryInput) -> Result<category::Model, ClientError> {
        self.post("/categories", input).await
    }

    pub async fn update_category(
        &self,
        id: &str,
        input: &CategoryInput,
    ) -> Result<category::Model, ClientError> {
        self.put(&format!("/categories/{}", id), input).await
    }

    pub async fn delete_category(&self, id: &str) -> Result<(), ClientError> {
        self.send_empty(self.request(Method::DELETE, &format!("/categories/{}", id)))
            .await
    }

    pub async fn products(
        &self,
        query: &ProductQuery,
    ) -> Result<PaginatedResponse<product::Model>, ClientError> {
        self.send(self.request(Method::GET, "/products").query(query))
            .await
    }

    pub async fn product(&self, id: &str) -> Result<ProductDetail, ClientError> {
        self.get(&format!("/products/{}", id)).await
    }

    pub async fn create_product(
        &self,
        request: &CreateProductRequest,
    ) -> Result<product::Model, ClientError> {
        self.post("/products", request).await
    }

    pub async fn update_product(
        &self,
        id: &str,
        request: &UpdateProductRequest,
    ) -> Result<product::Model, ClientError> {
        self.put(&format!("/products/{}", id), request).await
    }

    /// Soft delete; the product is returned with `is_active = false`.
    pub async fn delete_product(&self, id: &str) -> Result<product::Model, ClientError> {
        self.send(self.request(Method::DELETE, &format!("/products/{}", id)))
            .await
    }

    // reviews and favorites

    pub async fn product_reviews(&self, product_id: &str) -> Result<Vec<review::Model>, ClientError> {
        self.get(&format!("/products/{}/reviews", product_id)).await
    }

    pub async fn create_review(&self, request: &CreateReviewRequest) -> Result<review::Model, ClientError> {
        self.post("/reviews", request).await
    }

    pub async fn delete_review(&self, id: &str) -> Result<(), ClientError> {
        self.send_empty(self.request(Method::DELETE, &format!("/reviews/{}", id)))
            .await
    }

    pub async fn favorites(&self) -> Result<Vec<product::Model>, ClientError> {
        self.get("/favorites").await
    }

    pub async fn toggle_favorite(&self, product_id: &str) -> Result<FavoriteState, ClientError> {
        let body = ToggleFavoriteRequest {
            product_id: product_id.to_string(),
        };
        self.post("/favorites/toggle", &body).await
    }

    // carts

    pub async fn my_cart(&self) -> Result<CartView, ClientError> {
        self.get("/carts").await
    }

    pub async fn cart(&self, cart_id: &str) -> Result<CartView, ClientError> {
        self.get(&format!("/carts/{}", cart_id)).await
    }

    pub async fn add_cart_detail(
        &self,
        request: &AddCartDetailRequest,
    ) -> Result<cart_detail::Model, ClientError> {
        self.post("/cart_details", request).await
    }

    /// `Ok(None)` when quantity 0 removed the line.
    pub async fn update_cart_detail(
        &self,
        detail_id: &str,
        quantity: i32,
    ) -> Result<Option<cart_detail::Model>, ClientError> {
        let body = UpdateCartDetailRequest { quantity };
        let response = check(
            self.request(Method::PUT, &format!("/cart_details/{}", detail_id))
                .json(&body)
                .send()
                .await?,
        )
        .await?;
        let envelope: ApiResponse<cart_detail::Model> = response
            .json()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))?;
        Ok(envelope.data)
    }

    pub async fn remove_cart_detail(&self, detail_id: &str) -> Result<(), ClientError> {
        self.send_empty(self.request(Method::DELETE, &format!("/cart_details/{}", detail_id)))
            .await
    }

    pub async fn cart_details(&self, cart_id: &str) -> Result<Vec<CartItem>, ClientError> {
        self.get(&format!("/cart_details/cart/{}", cart_id)).await
    }

    /// Returns how many lines were removed.
    pub async fn clear_cart(&self, cart_id: &str) -> Result<u64, ClientError> {
        let removed: RemovedCount = self
            .send(self.request(Method::DELETE, &format!("/cart_details/cart/{}", cart_id)))
            .await?;
        Ok(removed.removed)
    }

    // orders

    pub async fn checkout(&self, input: &CheckoutInput) -> Result<OrderWithDetails, ClientError> {
        self.post("/orders", input).await
    }

    pub async fn orders(
        &self,
        query: &OrderQuery,
    ) -> Result<PaginatedResponse<order::Model>, ClientError> {
        self.send(self.request(Method::GET, "/orders").query(query))
            .await
    }

    pub async fn order(&self, id: &str) -> Result<OrderWithDetails, ClientError> {
        self.get(&format!("/orders/{}", id)).await
    }

    pub async fn update_order_status(
        &self,
        id: &str,
        status: order::OrderStatus,
    ) -> Result<order::Model, ClientError> {
        self.put(&format!("/orders/{}/status", id), &UpdateStatusRequest { status })
            .await
    }

    pub async fn cancel_order(&self, id: &str) -> Result<order::Model, ClientError> {
        self.send(self.request(Method::POST, &format!("/orders/{}/cancel", id)))
            .await
    }

    pub async fn order_details(&self, order_id: &str) -> Result<Vec<order_detail::Model>, ClientError> {
        self.get(&format!("/order_details/order/{}", order_id)).await
    }

    // notifications

    pub async fn notifications(
        &self,
        params: &PaginationParams,
    ) -> Result<PaginatedResponse<NotificationView>, ClientError> {
        self.send(self.request(Method::GET, "/notifications").query(params))
            .await
    }

    pub async fn unread_notifications(&self) -> Result<u64, ClientError> {
        let count: UnreadCount = self.get("/notifications/unread_count").await?;
        Ok(count.unread)
    }

    pub async fn mark_notification_read(
        &self,
        delivery_id: &str,
    ) -> Result<customer_notification::Model, ClientError> {
        self.send(self.request(Method::POST, &format!("/notifications/{}/read", delivery_id)))
            .await
    }

    pub async fn mark_all_notifications_read(&self) -> Result<u64, ClientError> {
        let updated: UpdatedCount = self
            .send(self.request(Method::POST, "/notifications/read_all"))
            .await?;
        Ok(updated.updated)
    }

    // events and store

    /// Running events, or every event when `all` is set.
    pub async fn events(&self, all: bool) -> Result<Vec<event::Model>, ClientError> {
        self.send(self.request(Method::GET, "/events").query(&[("all", all)]))
            .await
    }

    pub async fn create_event(&self, request: &CreateEventRequest) -> Result<event::Model, ClientError> {
        self.post("/events", request).await
    }

    pub async fn store(&self) -> Result<StoreInfo, ClientError> {
        self.get("/store").await
    }

    pub async fn update_store_settings(
        &self,
        request: &UpdateStoreSettings,
    ) -> Result<store_setting::Model, ClientError> {
        self.put("/store/settings", request).await
    }

    // admin

    pub async fn dashboard(&self) -> Result<Dashboard, ClientError> {
        self.get("/admin/dashboard").await
    }

    pub async fn product_statistics(&self, limit: u64) -> Result<Vec<ProductSales>, ClientError> {
        self.send(
            self.request(Method::GET, "/admin/statistics/products")
                .query(&[("limit", limit)]),
        )
        .await
    }

    pub async fn revenue_statistics(
        &self,
        from: chrono::NaiveDate,
        to: chrono::NaiveDate,
    ) -> Result<Vec<revenue_statistic::Model>, ClientError> {
        self.send(
            self.request(Method::GET, "/admin/statistics/revenue")
                .query(&[("from", from.to_string()), ("to", to.to_string())]),
        )
        .await
    }

    // payments

    pub async fn create_zalopay_payment(&self, order_id: &str) -> Result<PaymentSession, ClientError> {
        let body = CreatePaymentRequest {
            order_id: order_id.to_string(),
        };
        self.post("/payments/zalopay/create", &body).await
    }

    pub async fn query_zalopay_payment(
        &self,
        app_trans_id: &str,
    ) -> Result<PaymentStatusView, ClientError> {
        let body = QueryPaymentRequest {
            app_trans_id: app_trans_id.to_string(),
        };
        self.post("/payments/zalopay/query", &body).await
    }

    // screens

    /// Loads everything the home screen shows; fails if any call fails.
    pub async fn home_screen(&self) -> Result<HomeScreen, ClientError> {
        let first_page = ProductQuery {
            page: Some(1),
            ..Default::default()
        };
        let (store, categories, products, events) = tokio::try_join!(
            self.store(),
            self.categories(),
            self.products(&first_page),
            self.events(false),
        )?;
        Ok(HomeScreen {
            store,
            categories,
            products: products.items,
            events,
        })
    }

    pub async fn admin_overview(&self) -> Result<AdminOverview, ClientError> {
        let pending = OrderQuery {
            status: Some(order::OrderStatus::Pending),
            ..Default::default()
        };
        let (dashboard, top_products, pending_orders) = tokio::try_join!(
            self.dashboard(),
            self.product_statistics(5),
            self.orders(&pending),
        )?;
        Ok(AdminOverview {
            dashboard,
            top_products,
            pending_orders: pending_orders.items,
        })
    }
}

/// Maps non-2xx responses onto [`ClientError`].
async fn check(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|err| err.message)
        .or_else(|_| {
            serde_json::from_str::<Value>(&body).map(|v| {
                v.get("message")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string()
            })
        })
        .ok()
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_string());

    debug!(status = %status, message = %message, "API call failed");
    if status == StatusCode::UNAUTHORIZED {
        Err(ClientError::Unauthorized(message))
    } else {
        Err(ClientError::Api { status, message })
    }
}
