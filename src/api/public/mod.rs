pub mod auth;
pub mod product;

use axum::Router;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

use auth::auth_router;
use product::product_router;

pub fn public_api_router(db: Arc<DatabaseConnection>) -> Router {
    let auth_router = auth_router(db.clone());
    let product_router = product_router(db.clone());

    Router::new().merge(auth_router).merge(product_router)
}
