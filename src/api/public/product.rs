use axum::{extract::Extension, response::IntoResponse, routing::get, Json, Router};
use sea_orm::{DatabaseConnection, EntityTrait, QueryOrder};
use std::sync::Arc;

use crate::entities::product::{self, Entity as ProductEntity};
use crate::error::ApiError;

pub fn product_router(db: Arc<DatabaseConnection>) -> Router {
    Router::new()
        .route("/products", get(get_products))
        .layer(Extension(db))
}

async fn get_products(
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> Result<impl IntoResponse, ApiError> {
    let products = ProductEntity::find()
        .order_by_asc(product::Column::Id)
        .all(&*db)
        .await?;

    Ok(Json(products))
}
