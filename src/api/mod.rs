pub mod public;
pub mod user;

use axum::{response::IntoResponse, routing::get, Json, Router};
use sea_orm::DatabaseConnection;
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use public::public_api_router;
use user::user_api_router;

pub fn create_api_router(shared_db: Arc<DatabaseConnection>) -> Router {
    let api = public_api_router(shared_db.clone()).merge(user_api_router(shared_db.clone()));

    Router::new()
        .route("/", get(health_check))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
}

async fn health_check() -> impl IntoResponse {
    Json(json!({
        "message": "Welcome to the e-commerce API with authentication!"
    }))
}
