mod common;

use reqwest::{Client, StatusCode};
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde_json::json;

use rust_lavka::entities::product;
use common::{register_and_login, spawn_app};

async fn add_to_cart(client: &Client, base_url: &str, token: &str, product_id: i32, quantity: u32) {
    let response = client
        .post(format!("{}/api/cart/items", base_url))
        .bearer_auth(token)
        .json(&json!({ "product_id": product_id, "quantity": quantity }))
        .send()
        .await
        .expect("Failed to send add request");
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_create_order_freezes_total_and_clears_cart() {
    let app = spawn_app().await;
    let client = Client::new();
    let token = register_and_login(&client, &app.base_url, "shopper").await;

    // Product 1 is the seeded Classic T-Shirt at 20.00.
    add_to_cart(&client, &app.base_url, &token, 1, 2).await;

    let response = client
        .post(format!("{}/api/orders", app.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send create order request");
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = response
        .json::<serde_json::Value>()
        .await
        .expect("Failed to parse order response JSON");

    let total = body["total_amount"].as_f64().expect("total_amount missing");
    assert!((total - 40.0).abs() < 1e-6);

    let items = body["order_items"]
        .as_array()
        .expect("Expected order_items array");
    assert_eq!(items.len(), 1);
    let price_at_order = items[0]["price_at_order"]
        .as_f64()
        .expect("price_at_order missing");
    assert!((price_at_order - 20.0).abs() < 1e-6);
    assert_eq!(items[0]["quantity"].as_u64(), Some(2));

    // The cart was consumed by the order.
    let cart = client
        .get(format!("{}/api/cart", app.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send get cart request");
    assert_eq!(cart.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_order_on_empty_cart_fails() {
    let app = spawn_app().await;
    let client = Client::new();
    let token = register_and_login(&client, &app.base_url, "shopper").await;

    let response = client
        .post(format!("{}/api/orders", app.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send create order request");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response
        .json::<serde_json::Value>()
        .await
        .expect("Failed to parse error JSON");
    assert_eq!(body["error"].as_str(), Some("Cart is empty"));
}

#[tokio::test]
async fn test_order_total_survives_price_change() {
    let app = spawn_app().await;
    let client = Client::new();
    let token = register_and_login(&client, &app.base_url, "shopper").await;

    add_to_cart(&client, &app.base_url, &token, 1, 2).await;

    let created = client
        .post(format!("{}/api/orders", app.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send create order request");
    assert_eq!(created.status(), StatusCode::CREATED);

    let order_id = created
        .json::<serde_json::Value>()
        .await
        .expect("Failed to parse order response JSON")["id"]
        .as_i64()
        .expect("Order id missing");

    // Reprice the product behind the order's back.
    let product = product::Entity::find_by_id(1)
        .one(&*app.db)
        .await
        .expect("Failed to load product")
        .expect("Seeded product missing");
    let mut product: product::ActiveModel = product.into();
    product.price = Set(99.0);
    product
        .update(&*app.db)
        .await
        .expect("Failed to update product price");

    let fetched = client
        .get(format!("{}/api/orders/{}", app.base_url, order_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send get order request");
    assert_eq!(fetched.status(), StatusCode::OK);

    let body = fetched
        .json::<serde_json::Value>()
        .await
        .expect("Failed to parse order response JSON");

    let total = body["total_amount"].as_f64().expect("total_amount missing");
    assert!((total - 40.0).abs() < 1e-6);
    let price_at_order = body["order_items"][0]["price_at_order"]
        .as_f64()
        .expect("price_at_order missing");
    assert!((price_at_order - 20.0).abs() < 1e-6);
}

#[tokio::test]
async fn test_orders_are_scoped_per_user() {
    let app = spawn_app().await;
    let client = Client::new();
    let owner = register_and_login(&client, &app.base_url, "owner").await;
    let intruder = register_and_login(&client, &app.base_url, "intruder").await;

    add_to_cart(&client, &app.base_url, &owner, 1, 1).await;

    let created = client
        .post(format!("{}/api/orders", app.base_url))
        .bearer_auth(&owner)
        .send()
        .await
        .expect("Failed to send create order request");
    assert_eq!(created.status(), StatusCode::CREATED);

    let order_id = created
        .json::<serde_json::Value>()
        .await
        .expect("Failed to parse order response JSON")["id"]
        .as_i64()
        .expect("Order id missing");

    // The other user sees no orders at all ...
    let listing = client
        .get(format!("{}/api/orders", app.base_url))
        .bearer_auth(&intruder)
        .send()
        .await
        .expect("Failed to send list orders request");
    assert_eq!(listing.status(), StatusCode::OK);
    let body = listing
        .json::<serde_json::Value>()
        .await
        .expect("Failed to parse orders JSON");
    assert_eq!(body.as_array().map(|orders| orders.len()), Some(0));

    // ... and cannot fetch the owner's order by id.
    let response = client
        .get(format!("{}/api/orders/{}", app.base_url, order_id))
        .bearer_auth(&intruder)
        .send()
        .await
        .expect("Failed to send get order request");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_orders_returns_each_placed_order() {
    let app = spawn_app().await;
    let client = Client::new();
    let token = register_and_login(&client, &app.base_url, "shopper").await;

    add_to_cart(&client, &app.base_url, &token, 1, 1).await;
    let first = client
        .post(format!("{}/api/orders", app.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send create order request");
    assert_eq!(first.status(), StatusCode::CREATED);

    add_to_cart(&client, &app.base_url, &token, 2, 3).await;
    let second = client
        .post(format!("{}/api/orders", app.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send create order request");
    assert_eq!(second.status(), StatusCode::CREATED);

    let listing = client
        .get(format!("{}/api/orders", app.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send list orders request");
    assert_eq!(listing.status(), StatusCode::OK);

    let body = listing
        .json::<serde_json::Value>()
        .await
        .expect("Failed to parse orders JSON");
    let orders = body.as_array().expect("Expected an orders array");
    assert_eq!(orders.len(), 2);

    // Seeded Denim Jeans cost 50.00, so the second order totals 150.00.
    let second_total = orders[1]["total_amount"]
        .as_f64()
        .expect("total_amount missing");
    assert!((second_total - 150.0).abs() < 1e-6);
}
