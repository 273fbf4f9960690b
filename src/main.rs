use sea_orm::{Database, DatabaseConnection};
use std::sync::Arc;

use rust_lavka::api::create_api_router;
use rust_lavka::entities::{seed_products, setup_schema};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    dotenvy::dotenv().ok();

    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let db: DatabaseConnection = Database::connect(&database_url)
        .await
        .expect("Failed to connect to database");
    setup_schema(&db).await;

    let shared_db = Arc::new(db);

    seed_products(&shared_db)
        .await
        .expect("Failed to seed product catalog");

    let app = create_api_router(shared_db);

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("Failed to bind listener");
    tracing::info!("Running at {}", bind_addr);
    axum::serve(listener, app).await.expect("Server error");
}
