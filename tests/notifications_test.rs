mod common;

use axum::http::{Method, StatusCode};
use chrono::{Duration, Utc};
use common::TestApp;
use rust_decimal_macros::dec;
use serde_json::json;
use storefront_api::events::Event;

#[tokio::test]
async fn order_updates_notify_the_customer() {
    let app = TestApp::new().await;
    let product = app.seed_product("Fan", dec!(400000), 5).await;
    // Creating the product already told every customer about it.
    let (_, before) = app
        .as_customer(Method::GET, "/api/v1/notifications/unread_count", None)
        .await;
    let baseline = before["data"]["unread"].as_u64().unwrap();

    app.add_to_cart(&product.id, 1).await;
    let order = app.checkout("cod").await;
    let order_id = order["id"].as_str().unwrap();
    app.as_staff(
        Method::PUT,
        &format!("/api/v1/orders/{}/status", order_id),
        Some(json!({ "status": "confirmed" })),
    )
    .await;

    let (_, after) = app
        .as_customer(Method::GET, "/api/v1/notifications/unread_count", None)
        .await;
    assert_eq!(after["data"]["unread"].as_u64().unwrap(), baseline + 2);

    let (status, list) = app
        .as_customer(Method::GET, "/api/v1/notifications?per_page=10", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let newest = &list["data"]["items"][0];
    assert_eq!(newest["kind"], "order");
    assert_eq!(newest["reference_id"], order_id);
    assert_eq!(newest["is_read"], false);
}

#[tokio::test]
async fn marking_read_is_per_customer_and_idempotent() {
    let app = TestApp::new().await;
    app.seed_product("Announced", dec!(10000), 1).await;
    let (_, other) = app.register_customer("Bui H", "bui.h@storefront.test").await;

    let (_, list) = app.as_customer(Method::GET, "/api/v1/notifications", None).await;
    let delivery_id = list["data"]["items"][0]["id"].as_str().unwrap().to_string();
    let path = format!("/api/v1/notifications/{}/read", delivery_id);

    let (status, _) = app.call(Method::POST, &path, None, Some(&other)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app.as_customer(Method::POST, &path, None).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["is_read"], true);
    let read_at = body["data"]["read_at"].clone();
    assert!(read_at.is_string());

    let (_, again) = app.as_customer(Method::POST, &path, None).await;
    assert_eq!(again["data"]["read_at"], read_at);

    let (_, count) = app
        .as_customer(Method::GET, "/api/v1/notifications/unread_count", None)
        .await;
    assert_eq!(count["data"]["unread"], 0);
}

#[tokio::test]
async fn events_fan_out_to_every_customer() {
    let app = TestApp::new().await;
    let (_, second) = app.register_customer("Ngo I", "ngo.i@storefront.test").await;
    app.drain_events().await;

    let (status, body) = app
        .as_admin(
            Method::POST,
            "/api/v1/events",
            Some(json!({
                "title": "Black Friday",
                "description": "Everything 20% off",
                "discount_percent": 20,
                "starts_at": (Utc::now() + Duration::days(1)).to_rfc3339(),
                "ends_at": (Utc::now() + Duration::days(3)).to_rfc3339(),
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);

    for token in [app.customer_token.as_str(), second.as_str()] {
        let (_, list) = app
            .call(Method::GET, "/api/v1/notifications", None, Some(token))
            .await;
        assert_eq!(list["data"]["items"][0]["kind"], "event");
        assert_eq!(list["data"]["items"][0]["title"], "Black Friday");
        assert!(list["data"]["items"][0]["message"]
            .as_str()
            .unwrap()
            .starts_with("20% off until"));
    }

    let events = app.drain_events().await;
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::NotificationFannedOut { recipients: 2, .. })));

    // Not running yet, so only `?all=true` lists it.
    let (_, active) = app.call(Method::GET, "/api/v1/events", None, None).await;
    assert!(active["data"].as_array().unwrap().is_empty());
    let (_, all) = app.call(Method::GET, "/api/v1/events?all=true", None, None).await;
    assert_eq!(all["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn event_window_and_permissions_are_checked() {
    let app = TestApp::new().await;
    let now = Utc::now();
    let backwards = json!({
        "title": "Broken",
        "discount_percent": 10,
        "starts_at": (now + Duration::days(2)).to_rfc3339(),
        "ends_at": now.to_rfc3339(),
    });

    let (status, _) = app
        .as_admin(Method::POST, "/api/v1/events", Some(backwards.clone()))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .as_customer(Method::POST, "/api/v1/events", Some(backwards))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn read_all_clears_the_badge() {
    let app = TestApp::new().await;
    app.seed_product("One", dec!(10000), 1).await;
    app.seed_product("Two", dec!(10000), 1).await;

    let (status, body) = app
        .as_customer(Method::POST, "/api/v1/notifications/read_all", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["updated"], 2);

    let (_, count) = app
        .as_customer(Method::GET, "/api/v1/notifications/unread_count", None)
        .await;
    assert_eq!(count["data"]["unread"], 0);
}
