mod common;

use axum::http::{Method, StatusCode};
use common::{money, TestApp, ZALOPAY_APP_ID, ZALOPAY_KEY1, ZALOPAY_KEY2};
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use storefront_api::zalopay::mac;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

/// Checks the `mac` form field of a create request against key1.
struct SignedCreate;

impl wiremock::Match for SignedCreate {
    fn matches(&self, request: &Request) -> bool {
        let form: std::collections::HashMap<String, String> =
            url::form_urlencoded::parse(&request.body).into_owned().collect();
        let field = |name: &str| form.get(name).cloned().unwrap_or_default();
        let input = format!(
            "{}|{}|{}|{}|{}|{}|{}",
            field("app_id"),
            field("app_trans_id"),
            field("app_user"),
            field("amount"),
            field("app_time"),
            field("embed_data"),
            field("item"),
        );
        mac::verify(ZALOPAY_KEY1, &input, &field("mac"))
    }
}

async fn gateway() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/create"))
        .and(SignedCreate)
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "return_code": 1,
            "return_message": "Giao dịch thành công",
            "sub_return_code": 1,
            "order_url": "https://qcgateway.zalopay.vn/openinapp?order=eyJ6cHRyYW5zdG9rZW4iOiJ",
            "zp_trans_token": "AC1e2Yz3xWg",
            "qr_code": "00020101021226520010vn.zalopay",
        })))
        .mount(&server)
        .await;
    server
}

async fn zalopay_order(app: &TestApp) -> (String, Value) {
    let product = app.seed_product("Smart watch", dec!(1490000), 5).await;
    app.add_to_cart(&product.id, 1).await;
    let order = app.checkout("zalopay").await;
    (order["id"].as_str().unwrap().to_string(), order)
}

async fn open_session(app: &TestApp, order_id: &str) -> Value {
    let (status, body) = app
        .as_customer(
            Method::POST,
            "/api/v1/payments/zalopay/create",
            Some(json!({ "order_id": order_id })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    body["data"].clone()
}

fn signed_callback(data: &Value) -> Value {
    let data = data.to_string();
    json!({ "data": data, "mac": mac::sign(ZALOPAY_KEY2, &data), "type": 1 })
}

#[tokio::test]
async fn create_opens_a_signed_session() {
    let server = gateway().await;
    let app = TestApp::with_zalopay(&format!("{}/v2", server.uri())).await;
    let (order_id, order) = zalopay_order(&app).await;

    let session = open_session(&app, &order_id).await;

    assert_eq!(session["order_id"], order_id.as_str());
    assert_eq!(session["amount"], 1_490_000);
    assert_eq!(session["zp_trans_token"], "AC1e2Yz3xWg");
    assert_eq!(session["poll_interval_secs"], 5);
    assert_eq!(session["expires_in_secs"], 900);
    let app_trans_id = session["app_trans_id"].as_str().unwrap();
    assert!(app_trans_id.contains(&format!("_{}_", order_id)), "{}", app_trans_id);
    assert_eq!(money(&order["total"]), dec!(1490000));

    let (_, stored) = app
        .as_customer(Method::GET, &format!("/api/v1/orders/{}", order_id), None)
        .await;
    assert_eq!(stored["data"]["app_trans_id"], app_trans_id);
}

#[tokio::test]
async fn create_rejects_orders_that_cannot_be_paid() {
    let server = gateway().await;
    let app = TestApp::with_zalopay(&format!("{}/v2", server.uri())).await;

    let product = app.seed_product("Socks", dec!(50000), 5).await;
    app.add_to_cart(&product.id, 1).await;
    let cod = app.checkout("cod").await;
    let (status, _) = app
        .as_customer(
            Method::POST,
            "/api/v1/payments/zalopay/create",
            Some(json!({ "order_id": cod["id"] })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (order_id, _) = zalopay_order(&app).await;
    let (_, stranger) = app.register_customer("Ly K", "ly.k@storefront.test").await;
    let (status, _) = app
        .call(
            Method::POST,
            "/api/v1/payments/zalopay/create",
            Some(json!({ "order_id": order_id })),
            Some(&stranger),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn gateway_rejection_surfaces_as_payment_required() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/create"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "return_code": 2,
            "return_message": "Giao dịch thất bại",
            "sub_return_code": -68,
            "sub_return_message": "Mã giao dịch bị trùng",
        })))
        .mount(&server)
        .await;
    let app = TestApp::with_zalopay(&format!("{}/v2", server.uri())).await;
    let (order_id, _) = zalopay_order(&app).await;

    let (status, body) = app
        .as_customer(
            Method::POST,
            "/api/v1/payments/zalopay/create",
            Some(json!({ "order_id": order_id })),
        )
        .await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert!(body["message"].as_str().unwrap().contains("trùng"));
}

#[tokio::test]
async fn payments_are_unavailable_without_credentials() {
    let app = TestApp::new().await;
    let (order_id, _) = zalopay_order(&app).await;

    let (status, _) = app
        .as_customer(
            Method::POST,
            "/api/v1/payments/zalopay/create",
            Some(json!({ "order_id": order_id })),
        )
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (status, body) = app
        .call(
            Method::POST,
            "/api/v1/payments/zalopay/callback",
            Some(json!({ "data": "{}", "mac": "00", "type": 1 })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["return_code"], 0);
}

#[tokio::test]
async fn query_marks_the_order_paid() {
    let server = gateway().await;
    Mock::given(method("POST"))
        .and(path("/v2/query"))
        .and(body_string_contains(format!("app_id={}", ZALOPAY_APP_ID)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "return_code": 1,
            "return_message": "Giao dịch thành công",
            "is_processing": false,
            "amount": 1490000,
            "zp_trans_id": 240118000000123_i64,
        })))
        .mount(&server)
        .await;
    let app = TestApp::with_zalopay(&format!("{}/v2", server.uri())).await;
    let (order_id, _) = zalopay_order(&app).await;
    let session = open_session(&app, &order_id).await;
    let app_trans_id = session["app_trans_id"].as_str().unwrap();

    let (status, body) = app
        .as_customer(
            Method::POST,
            "/api/v1/payments/zalopay/query",
            Some(json!({ "app_trans_id": app_trans_id })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["status"], "paid");
    assert_eq!(body["data"]["zp_trans_id"], "240118000000123");

    let (_, order) = app
        .as_customer(Method::GET, &format!("/api/v1/orders/{}", order_id), None)
        .await;
    assert_eq!(order["data"]["payment_status"], "paid");
    assert_eq!(order["data"]["zp_trans_id"], "240118000000123");

    // Paid orders do not get a second session.
    let (status, _) = app
        .as_customer(
            Method::POST,
            "/api/v1/payments/zalopay/create",
            Some(json!({ "order_id": order_id })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn pending_query_leaves_the_order_unpaid() {
    let server = gateway().await;
    Mock::given(method("POST"))
        .and(path("/v2/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "return_code": 3,
            "return_message": "Giao dịch chưa được thực hiện",
            "is_processing": true,
        })))
        .mount(&server)
        .await;
    let app = TestApp::with_zalopay(&format!("{}/v2", server.uri())).await;
    let (order_id, _) = zalopay_order(&app).await;
    let session = open_session(&app, &order_id).await;

    let (_, body) = app
        .as_customer(
            Method::POST,
            "/api/v1/payments/zalopay/query",
            Some(json!({ "app_trans_id": session["app_trans_id"] })),
        )
        .await;
    assert_eq!(body["data"]["status"], "pending");

    let (_, order) = app
        .as_customer(Method::GET, &format!("/api/v1/orders/{}", order_id), None)
        .await;
    assert_eq!(order["data"]["payment_status"], "unpaid");
}

#[tokio::test]
async fn callback_confirms_payment_once() {
    let server = gateway().await;
    let app = TestApp::with_zalopay(&format!("{}/v2", server.uri())).await;
    let (order_id, _) = zalopay_order(&app).await;
    let session = open_session(&app, &order_id).await;

    let data = json!({
        "app_id": ZALOPAY_APP_ID,
        "app_trans_id": session["app_trans_id"],
        "app_time": 1_705_555_200_000_i64,
        "app_user": app.customer_id,
        "amount": 1_490_000,
        "embed_data": "{}",
        "item": "[]",
        "zp_trans_id": 240118000000777_i64,
        "server_time": 1_705_555_260_000_i64,
        "channel": 38,
    });

    let (status, reply) = app
        .call(
            Method::POST,
            "/api/v1/payments/zalopay/callback",
            Some(signed_callback(&data)),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply["return_code"], 1, "{}", reply);

    let (_, order) = app
        .as_customer(Method::GET, &format!("/api/v1/orders/{}", order_id), None)
        .await;
    assert_eq!(order["data"]["payment_status"], "paid");
    assert_eq!(order["data"]["zp_trans_id"], "240118000000777");

    // The gateway may deliver the same callback again.
    let (_, reply) = app
        .call(
            Method::POST,
            "/api/v1/payments/zalopay/callback",
            Some(signed_callback(&data)),
            None,
        )
        .await;
    assert_eq!(reply["return_code"], 1);

    let (_, list) = app
        .as_customer(Method::GET, "/api/v1/notifications", None)
        .await;
    let payment_notes = list["data"]["items"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|n| {
            n["message"]
                .as_str()
                .unwrap_or_default()
                .starts_with("Payment for order")
        })
        .count();
    assert_eq!(payment_notes, 1);
}

#[tokio::test]
async fn callback_rejects_forged_or_mismatched_payloads() {
    let server = gateway().await;
    let app = TestApp::with_zalopay(&format!("{}/v2", server.uri())).await;
    let (order_id, _) = zalopay_order(&app).await;
    let session = open_session(&app, &order_id).await;

    let data = json!({
        "app_trans_id": session["app_trans_id"],
        "amount": 1_490_000,
        "zp_trans_id": 1,
    })
    .to_string();
    let forged = json!({ "data": data, "mac": mac::sign("not-key2", &data), "type": 1 });
    let (_, reply) = app
        .call(Method::POST, "/api/v1/payments/zalopay/callback", Some(forged), None)
        .await;
    assert_eq!(reply["return_code"], -1);

    let short = json!({
        "app_trans_id": session["app_trans_id"],
        "amount": 1_000,
        "zp_trans_id": 2,
    });
    let (_, reply) = app
        .call(
            Method::POST,
            "/api/v1/payments/zalopay/callback",
            Some(signed_callback(&short)),
            None,
        )
        .await;
    assert_eq!(reply["return_code"], 0);

    let unknown = json!({ "app_trans_id": "240101_nope_000000", "amount": 1, "zp_trans_id": 3 });
    let (_, reply) = app
        .call(
            Method::POST,
            "/api/v1/payments/zalopay/callback",
            Some(signed_callback(&unknown)),
            None,
        )
        .await;
    assert_eq!(reply["return_code"], 0);

    let (_, order) = app
        .as_customer(Method::GET, &format!("/api/v1/orders/{}", order_id), None)
        .await;
    assert_eq!(order["data"]["payment_status"], "unpaid");
}

#[tokio::test]
async fn callback_for_an_earlier_session_still_pays() {
    let server = gateway().await;
    let app = TestApp::with_zalopay(&format!("{}/v2", server.uri())).await;
    let (order_id, _) = zalopay_order(&app).await;

    let first = open_session(&app, &order_id).await;
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let second = open_session(&app, &order_id).await;
    assert_ne!(first["app_trans_id"], second["app_trans_id"]);

    // The customer paid the QR code shown by the first session.
    let data = json!({
        "app_trans_id": first["app_trans_id"],
        "amount": 1_490_000,
        "zp_trans_id": 240118000000888_i64,
    });
    let (status, reply) = app
        .call(
            Method::POST,
            "/api/v1/payments/zalopay/callback",
            Some(signed_callback(&data)),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply["return_code"], 1, "{}", reply);

    let (_, order) = app
        .as_customer(Method::GET, &format!("/api/v1/orders/{}", order_id), None)
        .await;
    assert_eq!(order["data"]["payment_status"], "paid");
    assert_eq!(order["data"]["zp_trans_id"], "240118000000888");

    // The embedded order id does not bypass the amount check.
    let (other_id, _) = zalopay_order(&app).await;
    let short = json!({
        "app_trans_id": format!("240101_{}_000001", other_id),
        "amount": 10,
        "zp_trans_id": 5,
    });
    let (_, reply) = app
        .call(
            Method::POST,
            "/api/v1/payments/zalopay/callback",
            Some(signed_callback(&short)),
            None,
        )
        .await;
    assert_eq!(reply["return_code"], 0);

    let (_, order) = app
        .as_customer(Method::GET, &format!("/api/v1/orders/{}", other_id), None)
        .await;
    assert_eq!(order["data"]["payment_status"], "unpaid");
}

#[tokio::test]
async fn malformed_callback_asks_the_gateway_to_retry() {
    let server = gateway().await;
    let app = TestApp::with_zalopay(&format!("{}/v2", server.uri())).await;

    for body in ["not json", "{\"data\": 42}", ""] {
        let (status, reply) = app
            .post_raw("/api/v1/payments/zalopay/callback", body)
            .await;
        assert_eq!(status, StatusCode::OK, "{:?}", body);
        assert_eq!(reply["return_code"], 0, "{:?}", body);
    }
}
