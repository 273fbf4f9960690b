#![allow(dead_code)]

use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::sync::Arc;

use rust_lavka::api::create_api_router;
use rust_lavka::entities::{seed_products, setup_schema};

pub struct TestApp {
    pub base_url: String,
    pub db: Arc<DatabaseConnection>,
}

//Fresh in-memory database and an in-process server on an ephemeral port for
//every test. The pool is capped at one connection so every request sees the
//same in-memory database.
pub async fn spawn_app() -> TestApp {
    std::env::set_var("SECRET", "integration-test-secret");

    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1);

    let db = Database::connect(options)
        .await
        .expect("Failed to open in-memory database");
    setup_schema(&db).await;

    let db = Arc::new(db);
    seed_products(&db).await.expect("Failed to seed products");

    let app = create_api_router(db.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Failed to read local addr");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Test server error");
    });

    TestApp {
        base_url: format!("http://{}", addr),
        db,
    }
}

pub async fn register_and_login(
    client: &reqwest::Client,
    base_url: &str,
    username: &str,
) -> String {
    let payload = serde_json::json!({
        "username": username,
        "password": "Secret15"
    });

    let response = client
        .post(format!("{}/api/register", base_url))
        .json(&payload)
        .send()
        .await
        .expect("Failed to send register request");
    assert_eq!(response.status(), reqwest::StatusCode::CREATED);

    let response = client
        .post(format!("{}/api/login", base_url))
        .json(&payload)
        .send()
        .await
        .expect("Failed to send login request");
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    let body = response
        .json::<serde_json::Value>()
        .await
        .expect("Failed to parse login response JSON");

    body["access_token"]
        .as_str()
        .expect("Token not found in login response")
        .to_string()
}
