use argon2::{
    password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
    Argon2,
};
use axum::{
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use crate::entities::user::{self, Entity as UserEntity};
use crate::error::ApiError;
use crate::middleware::auth::generate_token;

pub fn auth_router(db: Arc<DatabaseConnection>) -> Router {
    Router::new()
        .route("/register", post(register_user))
        .route("/login", post(login))
        .layer(Extension(db))
}

async fn register_user(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<UserCredentials>,
) -> Result<impl IntoResponse, ApiError> {
    let txn = db.begin().await?;

    let existing = UserEntity::find()
        .filter(user::Column::Username.eq(&*payload.username))
        .one(&txn)
        .await?;
    if existing.is_some() {
        return Err(ApiError::Conflict(
            "Username already registered".to_string(),
        ));
    }

    let password = hash_password(&payload.password).map_err(|err| {
        ApiError::Internal(sea_orm::DbErr::Custom(format!(
            "failed to hash password: {err}"
        )))
    })?;

    let new_user = user::ActiveModel {
        username: Set(payload.username),
        password: Set(password),
        ..Default::default()
    };

    let created = new_user.insert(&txn).await?;
    txn.commit().await?;

    tracing::info!(user_id = created.id, "registered new user");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "id": created.id,
            "username": created.username
        })),
    ))
}

async fn login(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<UserCredentials>,
) -> Result<impl IntoResponse, ApiError> {
    let result = UserEntity::find()
        .filter(user::Column::Username.eq(&*payload.username))
        .one(&*db)
        .await?;

    //Same message for an unknown user and a bad password.
    let user = result.ok_or_else(|| {
        ApiError::Unauthorized("Incorrect username or password".to_string())
    })?;

    user.check_hash(&payload.password)
        .map_err(|_| ApiError::Unauthorized("Incorrect username or password".to_string()))?;

    let token = generate_token(user.id)?;

    Ok(Json(TokenResponse {
        access_token: token,
        token_type: "bearer".to_string(),
    }))
}

fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)?
        .to_string();

    Ok(password_hash)
}

#[derive(Deserialize, Clone, Debug)]
struct UserCredentials {
    username: String,
    password: String,
}

#[derive(Serialize)]
struct TokenResponse {
    access_token: String,
    token_type: String,
}
