pub mod admin;
pub mod auth;
pub mod carts;
pub mod categories;
pub mod common;
pub mod events;
pub mod notifications;
pub mod orders;
pub mod payments;
pub mod products;
pub mod reviews;
pub mod store;

use axum::{routing::get, Router};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::{
    events::EventSender,
    services::{
        cart::CartService, categories::CategoryService, favorites::FavoriteService,
        notifications::NotificationService, orders::OrderService, payments::PaymentService,
        products::ProductService, promotions::PromotionService, reviews::ReviewService,
        statistics::StatisticsService, store::StoreService,
    },
    zalopay::ZaloPayGateway,
    AppState,
};

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub categories: Arc<CategoryService>,
    pub products: Arc<ProductService>,
    pub reviews: Arc<ReviewService>,
    pub favorites: Arc<FavoriteService>,
    pub cart: Arc<CartService>,
    pub orders: Arc<OrderService>,
    pub payments: Arc<PaymentService>,
    pub notifications: Arc<NotificationService>,
    pub promotions: Arc<PromotionService>,
    pub store: Arc<StoreService>,
    pub statistics: Arc<StatisticsService>,
}

impl AppServices {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: EventSender,
        gateway: Arc<ZaloPayGateway>,
    ) -> Self {
        let orders = OrderService::new(db.clone(), event_sender.clone());
        let payments = PaymentService::new(
            db.clone(),
            gateway,
            orders.clone(),
            event_sender.clone(),
        );

        Self {
            categories: Arc::new(CategoryService::new(db.clone(), event_sender.clone())),
            products: Arc::new(ProductService::new(db.clone(), event_sender.clone())),
            reviews: Arc::new(ReviewService::new(db.clone(), event_sender.clone())),
            favorites: Arc::new(FavoriteService::new(db.clone())),
            cart: Arc::new(CartService::new(db.clone(), event_sender.clone())),
            orders: Arc::new(orders),
            payments: Arc::new(payments),
            notifications: Arc::new(NotificationService::new(db.clone())),
            promotions: Arc::new(PromotionService::new(db.clone(), event_sender.clone())),
            store: Arc::new(StoreService::new(db.clone(), event_sender)),
            statistics: Arc::new(StatisticsService::new(db)),
        }
    }
}

/// Everything served under `/api/v1`.
pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(crate::health_check))
        .merge(auth::auth_routes())
        .merge(categories::category_routes())
        .merge(products::product_routes())
        .merge(reviews::review_routes())
        .merge(carts::cart_routes())
        .merge(orders::order_routes())
        .merge(notifications::notification_routes())
        .merge(events::event_routes())
        .merge(store::store_routes())
        .merge(admin::admin_routes())
        .merge(payments::payment_routes())
}
