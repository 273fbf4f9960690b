use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sea_orm::{DatabaseConnection, EntityTrait};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::entities::user::Entity as UserEntity;
use crate::error::ApiError;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i32,
    pub exp: usize,
}

//Gates every /api user route. Inserts Claims into request extensions for
//the handlers downstream.
pub async fn auth_middleware(
    State(db): State<Arc<DatabaseConnection>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok());

    let token = match auth_header.and_then(|h| h.strip_prefix("Bearer ")) {
        Some(token) => token,
        None => {
            return Err(ApiError::Unauthorized(
                "Missing or malformed authorization header".to_string(),
            ));
        }
    };

    let claims = validate_token(&db, token).await?;
    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

pub fn generate_token(user_id: i32) -> Result<String, ApiError> {
    let exp = Utc::now()
        .checked_add_signed(Duration::hours(24))
        .ok_or_else(|| {
            ApiError::Internal(sea_orm::DbErr::Custom("token expiry overflow".to_string()))
        })?
        .timestamp() as usize;

    let claims = Claims { user_id, exp };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(get_secret_key().as_bytes()),
    )
    .map_err(|err| ApiError::Internal(sea_orm::DbErr::Custom(err.to_string())))
}

pub async fn validate_token(db: &DatabaseConnection, token: &str) -> Result<Claims, ApiError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(get_secret_key().as_bytes()),
        &validation,
    )
    .map_err(|_| ApiError::Unauthorized("Invalid or expired token".to_string()))?;

    let claims = token_data.claims;

    //The token may outlive its user; reject claims for a deleted account.
    match UserEntity::find_by_id(claims.user_id).one(db).await? {
        Some(_) => Ok(claims),
        None => Err(ApiError::Unauthorized(
            "Invalid or expired token".to_string(),
        )),
    }
}

fn get_secret_key() -> String {
    dotenvy::dotenv().ok();
    std::env::var("SECRET").expect("SECRET not found in .env file")
}
