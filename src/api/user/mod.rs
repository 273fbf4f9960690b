pub mod cart;
pub mod order;
pub mod profile;

use axum::{middleware::from_fn_with_state, Router};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::middleware::auth::auth_middleware;
use cart::cart_router;
use order::order_router;
use profile::profile_router;

pub fn user_api_router(db: Arc<DatabaseConnection>) -> Router {
    Router::new()
        .merge(cart_router(db.clone()))
        .merge(order_router(db.clone()))
        .merge(profile_router(db.clone()))
        .layer(from_fn_with_state(db.clone(), auth_middleware))
}
