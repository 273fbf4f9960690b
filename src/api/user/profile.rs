use axum::{extract::Extension, response::IntoResponse, routing::get, Json, Router};
use sea_orm::{DatabaseConnection, EntityTrait};
use serde_json::json;
use std::sync::Arc;

use crate::entities::user::Entity as UserEntity;
use crate::error::ApiError;
use crate::middleware::auth::Claims;

pub fn profile_router(db: Arc<DatabaseConnection>) -> Router {
    Router::new()
        .route("/users/me", get(get_current_user))
        .layer(Extension(db))
}

async fn get_current_user(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let user = UserEntity::find_by_id(claims.user_id)
        .one(&*db)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(json!({
        "id": user.id,
        "username": user.username
    })))
}
