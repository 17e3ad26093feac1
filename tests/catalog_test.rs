mod common;

use axum::http::{Method, StatusCode};
use common::{money, TestApp};
use rust_decimal_macros::dec;
use serde_json::json;

#[tokio::test]
async fn admins_manage_categories() {
    let app = TestApp::new().await;
    let payload = json!({ "name": "Phones", "description": "Smartphones" });

    let (status, _) = app
        .as_customer(Method::POST, "/api/v1/categories", Some(payload.clone()))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .as_admin(Method::POST, "/api/v1/categories", Some(payload))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .as_admin(
            Method::PUT,
            &format!("/api/v1/categories/{}", id),
            Some(json!({ "name": "Mobile phones" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["name"], "Mobile phones");

    let (status, body) = app.call(Method::GET, "/api/v1/categories", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, _) = app
        .as_admin(Method::DELETE, &format!("/api/v1/categories/{}", id), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app
        .call(Method::GET, &format!("/api/v1/categories/{}", id), None, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn category_in_use_cannot_be_deleted() {
    let app = TestApp::new().await;
    let category = app.seed_category("Laptops").await;

    let (status, body) = app
        .as_admin(
            Method::POST,
            "/api/v1/products",
            Some(json!({
                "category_id": category.id,
                "name": "ThinkPad X1",
                "price": "32000000",
                "stock_quantity": 3,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);

    let (status, _) = app
        .as_admin(Method::DELETE, &format!("/api/v1/categories/{}", category.id), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn product_listing_filters_and_paginates() {
    let app = TestApp::new().await;
    let phones = app.seed_category("Phones").await;
    for i in 0..5 {
        app.state
            .services
            .products
            .create(storefront_api::services::products::CreateProductRequest {
                category_id: Some(phones.id.clone()),
                name: format!("Galaxy S{}", 20 + i),
                description: None,
                price: dec!(15000000),
                stock_quantity: 10,
                image_url: None,
            })
            .await
            .unwrap();
    }
    app.seed_product("Charger", dec!(250000), 50).await;

    let (status, body) = app
        .call(Method::GET, "/api/v1/products?per_page=2&page=2", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 6);
    assert_eq!(body["data"]["total_pages"], 3);
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 2);

    let (_, body) = app
        .call(
            Method::GET,
            &format!("/api/v1/products?category_id={}", phones.id),
            None,
            None,
        )
        .await;
    assert_eq!(body["data"]["total"], 5);

    let (_, body) = app
        .call(Method::GET, "/api/v1/products?search=GALAXY%20s2", None, None)
        .await;
    assert_eq!(body["data"]["total"], 5);

    let (_, body) = app
        .call(Method::GET, "/api/v1/products?search=charger", None, None)
        .await;
    assert_eq!(body["data"]["total"], 1);
}

#[tokio::test]
async fn deactivated_products_are_hidden_from_customers() {
    let app = TestApp::new().await;
    let product = app.seed_product("Old model", dec!(100000), 1).await;

    let (status, body) = app
        .as_admin(Method::DELETE, &format!("/api/v1/products/{}", product.id), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["is_active"], false);

    let (status, _) = app
        .call(Method::GET, &format!("/api/v1/products/{}", product.id), None, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = app.call(Method::GET, "/api/v1/products", None, None).await;
    assert_eq!(body["data"]["total"], 0);

    // include_inactive is ignored for customers and honoured for admins.
    let (_, body) = app
        .as_customer(Method::GET, "/api/v1/products?include_inactive=true", None)
        .await;
    assert_eq!(body["data"]["total"], 0);
    let (_, body) = app
        .as_admin(Method::GET, "/api/v1/products?include_inactive=true", None)
        .await;
    assert_eq!(body["data"]["total"], 1);
}

#[tokio::test]
async fn product_update_changes_price() {
    let app = TestApp::new().await;
    let product = app.seed_product("Headphones", dec!(990000), 4).await;

    let (status, body) = app
        .as_admin(
            Method::PUT,
            &format!("/api/v1/products/{}", product.id),
            Some(json!({ "price": "890000", "stock_quantity": 8 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(money(&body["data"]["price"]), dec!(890000));
    assert_eq!(body["data"]["stock_quantity"], 8);
}

#[tokio::test]
async fn reviews_feed_the_product_rating() {
    let app = TestApp::new().await;
    let product = app.seed_product("Keyboard", dec!(1200000), 5).await;
    let (_, other_token) = app.register_customer("Hoang E", "hoang.e@storefront.test").await;

    let (status, body) = app
        .as_customer(
            Method::POST,
            "/api/v1/reviews",
            Some(json!({ "product_id": product.id, "rating": 5, "comment": "Great" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let review_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .call(
            Method::POST,
            "/api/v1/reviews",
            Some(json!({ "product_id": product.id, "rating": 2 })),
            Some(&other_token),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = app
        .as_customer(
            Method::POST,
            "/api/v1/reviews",
            Some(json!({ "product_id": product.id, "rating": 6 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = app
        .call(Method::GET, &format!("/api/v1/products/{}", product.id), None, None)
        .await;
    assert_eq!(body["data"]["review_count"], 2);
    assert_eq!(body["data"]["average_rating"], 3.5);

    let (_, body) = app
        .call(
            Method::GET,
            &format!("/api/v1/products/{}/reviews", product.id),
            None,
            None,
        )
        .await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    // Someone else's review.
    let (status, _) = app
        .call(
            Method::DELETE,
            &format!("/api/v1/reviews/{}", review_id),
            None,
            Some(&other_token),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .as_admin(Method::DELETE, &format!("/api/v1/reviews/{}", review_id), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn favorites_toggle_on_and_off() {
    let app = TestApp::new().await;
    let product = app.seed_product("Mouse", dec!(350000), 9).await;
    let toggle = json!({ "product_id": product.id });

    let (status, body) = app
        .as_customer(Method::POST, "/api/v1/favorites/toggle", Some(toggle.clone()))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["is_favorite"], true);

    let (_, body) = app.as_customer(Method::GET, "/api/v1/favorites", None).await;
    assert_eq!(body["data"][0]["id"], product.id.as_str());

    let (_, body) = app
        .as_customer(Method::POST, "/api/v1/favorites/toggle", Some(toggle))
        .await;
    assert_eq!(body["data"]["is_favorite"], false);

    let (_, body) = app.as_customer(Method::GET, "/api/v1/favorites", None).await;
    assert!(body["data"].as_array().unwrap().is_empty());

    let (status, _) = app
        .as_customer(
            Method::POST,
            "/api/v1/favorites/toggle",
            Some(json!({ "product_id": "missing1" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
