mod common;

use std::time::Duration;

use assert_matches::assert_matches;
use common::{TestApp, ADMIN_EMAIL, PASSWORD};
use reqwest::StatusCode;
use rust_decimal_macros::dec;
use serde_json::json;
use storefront_api::{
    auth::{AccountType, LoginRequest, RegisterRequest},
    client::{ClientError, PaymentPoller, PollOutcome, StorefrontClient},
    entities::order::{OrderStatus, PaymentMethod},
    services::{cart::AddCartDetailRequest, orders::CheckoutInput},
};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn login(email: &str, account_type: AccountType) -> LoginRequest {
    LoginRequest {
        email: email.to_string(),
        password: PASSWORD.to_string(),
        account_type,
    }
}

fn checkout_input(payment_method: PaymentMethod) -> CheckoutInput {
    CheckoutInput {
        shipping_address: "25 Tran Hung Dao, Hoan Kiem".to_string(),
        phone: "0912345678".to_string(),
        note: None,
        payment_method,
    }
}

#[tokio::test]
async fn customer_journey_through_the_client() {
    let app = TestApp::new().await;
    let product = app.seed_product("Backpack", dec!(350000), 4).await;
    let mut client = StorefrontClient::new(app.serve().await);

    let token = client
        .login(&login("customer@storefront.test", AccountType::Customer))
        .await
        .unwrap();
    assert_eq!(token.user_id, app.customer_id);
    assert_eq!(client.token(), Some(token.access_token.as_str()));

    let home = client.home_screen().await.unwrap();
    assert!(home.store.settings.is_open);
    assert_eq!(home.products.len(), 1);
    assert_eq!(home.products[0].id, product.id);

    let cart = client.my_cart().await.unwrap();
    client
        .add_cart_detail(&AddCartDetailRequest {
            cart_id: cart.cart.id.clone(),
            product_id: product.id.clone(),
            quantity: 2,
        })
        .await
        .unwrap();
    let cart = client.cart(&cart.cart.id).await.unwrap();
    assert_eq!(cart.totals.subtotal, dec!(700000));
    assert_eq!(cart.totals.shipping_fee, dec!(0));

    let order = client.checkout(&checkout_input(PaymentMethod::Cod)).await.unwrap();
    assert_eq!(order.order.total, dec!(700000));
    assert_eq!(order.details.len(), 1);
    assert!(client.my_cart().await.unwrap().items.is_empty());

    let cancelled = client.cancel_order(&order.order.id).await.unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);

    let err = client.cancel_order(&order.order.id).await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));

    assert!(client.unread_notifications().await.unwrap() >= 2);
    let updated = client.mark_all_notifications_read().await.unwrap();
    assert!(updated >= 2);
    assert_eq!(client.unread_notifications().await.unwrap(), 0);

    client.logout();
    assert_matches!(client.my_cart().await, Err(ClientError::Unauthorized(_)));
}

#[tokio::test]
async fn admin_overview_loads_in_one_go() {
    let app = TestApp::new().await;
    let product = app.seed_product("Kettle", dec!(450000), 6).await;
    app.add_to_cart(&product.id, 1).await;
    app.checkout("cod").await;

    let mut admin = StorefrontClient::new(app.serve().await);
    admin.login(&login(ADMIN_EMAIL, AccountType::Admin)).await.unwrap();

    let overview = admin.admin_overview().await.unwrap();
    assert_eq!(overview.dashboard.order_count, 1);
    assert_eq!(overview.dashboard.pending_order_count, 1);
    assert_eq!(overview.pending_orders.len(), 1);
    assert!(overview.top_products.is_empty());
}

#[tokio::test]
async fn api_errors_carry_status_and_message() {
    let app = TestApp::new().await;
    let mut client = StorefrontClient::new(app.serve().await);

    let err = client
        .register(&RegisterRequest {
            name: "Duplicate".into(),
            email: "customer@storefront.test".into(),
            password: PASSWORD.into(),
            phone: None,
            address: None,
        })
        .await
        .unwrap_err();
    match err {
        ClientError::Api { status, message } => {
            assert_eq!(status, StatusCode::CONFLICT);
            assert!(message.contains("customer@storefront.test"), "{}", message);
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert!(client.token().is_none());

    let err = client
        .login(&LoginRequest {
            email: "customer@storefront.test".into(),
            password: "wrong password".into(),
            account_type: AccountType::Customer,
        })
        .await
        .unwrap_err();
    assert_matches!(err, ClientError::Unauthorized(_));
}

#[tokio::test]
async fn bearer_token_is_sent_once_set() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/notifications/unread_count"))
        .and(header("authorization", "Bearer token-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": { "unread": 7 },
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/notifications/unread_count"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": "Unauthorized",
            "message": "Missing bearer token",
            "timestamp": "2024-01-01T00:00:00Z",
        })))
        .with_priority(10)
        .mount(&server)
        .await;

    let client = StorefrontClient::new(server.uri());
    match client.unread_notifications().await {
        Err(ClientError::Unauthorized(message)) => assert_eq!(message, "Missing bearer token"),
        other => panic!("unexpected result {:?}", other),
    }

    let client = client.with_token("token-123");
    assert_eq!(client.unread_notifications().await.unwrap(), 7);
}

#[tokio::test]
async fn unstructured_error_bodies_fall_back_to_reason() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/categories"))
        .respond_with(ResponseTemplate::new(502).set_body_string("upstream down"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/events"))
        .respond_with(
            ResponseTemplate::new(429).set_body_json(json!({ "message": "slow down" })),
        )
        .mount(&server)
        .await;

    let client = StorefrontClient::new(server.uri());
    match client.categories().await.unwrap_err() {
        ClientError::Api { status, message } => {
            assert_eq!(status, StatusCode::BAD_GATEWAY);
            assert_eq!(message, "Bad Gateway");
        }
        other => panic!("unexpected error {:?}", other),
    }
    match client.events(false).await.unwrap_err() {
        ClientError::Api { status, message } => {
            assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
            assert_eq!(message, "slow down");
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[tokio::test]
async fn one_failing_call_fails_the_home_screen() {
    let app = TestApp::new().await;
    let base = app.serve().await;

    assert!(StorefrontClient::new(base).home_screen().await.is_ok());

    let proxy = MockServer::start().await;
    for (route, data) in [
        ("/api/v1/categories", json!([])),
        ("/api/v1/events", json!([])),
        (
            "/api/v1/products",
            json!({ "items": [], "total": 0, "page": 1, "per_page": 20, "total_pages": 0 }),
        ),
    ] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "success": true, "data": data })),
            )
            .mount(&proxy)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/api/v1/store"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({
            "error": "Service Unavailable",
            "message": "maintenance",
            "timestamp": "2024-01-01T00:00:00Z",
        })))
        .mount(&proxy)
        .await;

    let err = StorefrontClient::new(proxy.uri()).home_screen().await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::SERVICE_UNAVAILABLE));
}

#[tokio::test]
async fn poller_waits_for_the_gateway_to_settle() {
    let gateway = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/create"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "return_code": 1,
            "return_message": "Giao dịch thành công",
            "order_url": "https://qcgateway.zalopay.vn/openinapp?order=abc",
            "zp_trans_token": "AC1e2Yz3xWg",
        })))
        .mount(&gateway)
        .await;
    Mock::given(method("POST"))
        .and(path("/v2/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "return_code": 3,
            "return_message": "Giao dịch đang xử lý",
            "is_processing": true,
        })))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&gateway)
        .await;
    Mock::given(method("POST"))
        .and(path("/v2/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "return_code": 1,
            "return_message": "Giao dịch thành công",
            "is_processing": false,
            "amount": 900000,
            "zp_trans_id": 240118000000555_i64,
        })))
        .mount(&gateway)
        .await;

    let app = TestApp::with_zalopay(&format!("{}/v2", gateway.uri())).await;
    let product = app.seed_product("Blender", dec!(900000), 2).await;
    let mut client = StorefrontClient::new(app.serve().await);
    client
        .login(&login("customer@storefront.test", AccountType::Customer))
        .await
        .unwrap();

    let cart = client.my_cart().await.unwrap();
    client
        .add_cart_detail(&AddCartDetailRequest {
            cart_id: cart.cart.id,
            product_id: product.id.clone(),
            quantity: 1,
        })
        .await
        .unwrap();
    let order = client
        .checkout(&checkout_input(PaymentMethod::Zalopay))
        .await
        .unwrap();
    let session = client.create_zalopay_payment(&order.order.id).await.unwrap();
    assert_eq!(session.amount, 900000);

    let poller = PaymentPoller::new(
        client.clone(),
        Duration::from_millis(50),
        Duration::from_secs(10),
    );
    let outcome = poller
        .poll(&session.app_trans_id, std::future::pending::<()>())
        .await;
    assert_eq!(outcome, PollOutcome::Paid);

    let paid = client.order(&order.order.id).await.unwrap();
    assert_eq!(paid.order.zp_trans_id.as_deref(), Some("240118000000555"));
}
