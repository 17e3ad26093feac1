#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Method, Request, StatusCode},
    response::Response,
    Router,
};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use storefront_api::{
    auth::{AccountType, CreateStaffRequest, LoginRequest, RegisterRequest},
    build_router,
    config::AppConfig,
    db::{self, DbConfig},
    entities::{category, product},
    events::{self, Event},
    services::{categories::CategoryInput, products::CreateProductRequest},
    AppState,
};
use tokio::sync::{mpsc, Mutex};
use tower::ServiceExt;

pub const JWT_SECRET: &str =
    "integration_test_secret_that_is_definitely_longer_than_sixty_four_characters_0123";
pub const ZALOPAY_APP_ID: i64 = 2553;
pub const ZALOPAY_KEY1: &str = "PcY4iZIKFCIdgZvA6ueMcMHHUbRLYjPL";
pub const ZALOPAY_KEY2: &str = "kLtgPl8HHhfvMuDHPwKfgfsY4Ydm9eIz";

pub const ADMIN_EMAIL: &str = "admin@storefront.test";
pub const STAFF_EMAIL: &str = "staff@storefront.test";
pub const PASSWORD: &str = "correct-horse-battery";

/// Application harness backed by a private in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub customer_id: String,
    pub customer_token: String,
    pub staff_token: String,
    pub admin_token: String,
    events: Mutex<mpsc::Receiver<Event>>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    /// Same as [`TestApp::new`] with the ZaloPay gateway pointed at `endpoint`.
    pub async fn with_zalopay(endpoint: &str) -> Self {
        let mut cfg = test_config();
        cfg.zalopay.app_id = ZALOPAY_APP_ID;
        cfg.zalopay.key1 = ZALOPAY_KEY1.to_string();
        cfg.zalopay.key2 = ZALOPAY_KEY2.to_string();
        cfg.zalopay.endpoint = endpoint.to_string();
        cfg.zalopay.callback_url = Some("https://shop.test/api/v1/payments/zalopay/callback".into());
        Self::with_config(cfg).await
    }

    pub async fn with_config(cfg: AppConfig) -> Self {
        let pool = db::establish_connection_with_config(&DbConfig::in_memory())
            .await
            .expect("in-memory database");
        db::run_migrations(&pool).await.expect("migrations");

        let (event_sender, event_rx) = events::channel(1024);
        let state = AppState::new(Arc::new(pool), cfg, event_sender).expect("app state");

        let customer = state
            .auth
            .register_customer(RegisterRequest {
                name: "Nguyen Van A".into(),
                email: "customer@storefront.test".into(),
                password: PASSWORD.into(),
                phone: Some("0901234567".into()),
                address: Some("1 Le Loi, District 1".into()),
            })
            .await
            .expect("seed customer");

        state
            .auth
            .create_staff(CreateStaffRequest {
                name: "Tran Thi B".into(),
                email: STAFF_EMAIL.into(),
                password: PASSWORD.into(),
                phone: None,
                store_id: None,
            })
            .await
            .expect("seed staff");
        let staff = state
            .auth
            .login(LoginRequest {
                email: STAFF_EMAIL.into(),
                password: PASSWORD.into(),
                account_type: AccountType::Staff,
            })
            .await
            .expect("staff login");

        state
            .auth
            .ensure_admin(ADMIN_EMAIL, "Root", PASSWORD)
            .await
            .expect("seed admin");
        let admin = state
            .auth
            .login(LoginRequest {
                email: ADMIN_EMAIL.into(),
                password: PASSWORD.into(),
                account_type: AccountType::Admin,
            })
            .await
            .expect("admin login");

        let router = build_router(state.clone());

        Self {
            router,
            state,
            customer_id: customer.user_id,
            customer_token: customer.access_token,
            staff_token: staff.access_token,
            admin_token: admin.access_token,
            events: Mutex::new(event_rx),
        }
    }

    /// Registers another customer and returns `(id, token)`.
    pub async fn register_customer(&self, name: &str, email: &str) -> (String, String) {
        let token = self
            .state
            .auth
            .register_customer(RegisterRequest {
                name: name.into(),
                email: email.into(),
                password: PASSWORD.into(),
                phone: None,
                address: None,
            })
            .await
            .expect("register customer");
        (token.user_id, token.access_token)
    }

    /// Serves the router on an ephemeral local port and returns its base URL.
    pub async fn serve(&self) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("local addr");
        let router = self.router.clone();
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("test server");
        });
        format!("http://{}", addr)
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(serde_json::to_vec(&json).expect("serialize request body"))
            }
            None => Body::empty(),
        };
        let request = builder.body(body).expect("build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Posts `body` as is, for payloads that are not valid JSON.
    pub async fn post_raw(&self, uri: &str, body: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("build request");
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request");
        let status = response.status();
        (status, response_json(response).await)
    }

    /// Sends a request and decodes the JSON body (`Value::Null` when empty).
    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> (StatusCode, Value) {
        let response = self.request(method, uri, body, token).await;
        let status = response.status();
        (status, response_json(response).await)
    }

    pub async fn as_customer(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.call(method, uri, body, Some(&self.customer_token)).await
    }

    pub async fn as_staff(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.call(method, uri, body, Some(&self.staff_token)).await
    }

    pub async fn as_admin(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.call(method, uri, body, Some(&self.admin_token)).await
    }

    pub async fn seed_category(&self, name: &str) -> category::Model {
        self.state
            .services
            .categories
            .create(CategoryInput {
                name: name.into(),
                description: None,
            })
            .await
            .expect("seed category")
    }

    pub async fn seed_product(&self, name: &str, price: Decimal, stock: i32) -> product::Model {
        self.state
            .services
            .products
            .create(CreateProductRequest {
                category_id: None,
                name: name.into(),
                description: Some(format!("{} for tests", name)),
                price,
                stock_quantity: stock,
                image_url: None,
            })
            .await
            .expect("seed product")
    }

    /// Puts `quantity` of a product into the seeded customer's cart.
    pub async fn add_to_cart(&self, product_id: &str, quantity: i32) -> String {
        let (status, cart) = self.as_customer(Method::GET, "/api/v1/carts", None).await;
        assert_eq!(status, StatusCode::OK, "{}", cart);
        let cart_id = cart["data"]["cart"]["id"].as_str().expect("cart id").to_string();

        let (status, body) = self
            .as_customer(
                Method::POST,
                "/api/v1/cart_details",
                Some(json!({
                    "cart_id": cart_id,
                    "product_id": product_id,
                    "quantity": quantity,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        cart_id
    }

    /// Checks out the seeded customer's cart and returns the order JSON.
    pub async fn checkout(&self, payment_method: &str) -> Value {
        let (status, body) = self
            .as_customer(
                Method::POST,
                "/api/v1/orders",
                Some(json!({
                    "shipping_address": "1 Le Loi, District 1, HCMC",
                    "phone": "0901234567",
                    "payment_method": payment_method,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["data"].clone()
    }

    pub async fn product_stock(&self, product_id: &str) -> i32 {
        self.state
            .services
            .products
            .find(product_id)
            .await
            .expect("product")
            .stock_quantity
    }

    /// Events emitted so far that have not been drained yet.
    pub async fn drain_events(&self) -> Vec<Event> {
        let mut rx = self.events.lock().await;
        let mut drained = Vec::new();
        while let Ok(event) = rx.try_recv() {
            drained.push(event);
        }
        drained
    }
}

pub fn test_config() -> AppConfig {
    let mut cfg = AppConfig::new(
        "sqlite::memory:".to_string(),
        JWT_SECRET.to_string(),
        3600,
        "127.0.0.1".to_string(),
        18_080,
        "development".to_string(),
    );
    cfg.auto_migrate = true;
    cfg
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).expect("json response")
}

pub fn money(value: &Value) -> Decimal {
    match value {
        Value::String(s) => s.parse().expect("decimal string"),
        Value::Number(n) => n.to_string().parse().expect("decimal number"),
        other => panic!("not a money value: {}", other),
    }
}
